use std::sync::Arc;

use supportdesk_agent::llm::{LlmClient, LlmError};
use supportdesk_agent::prompt::{load_system_prompt, PromptError};
use supportdesk_agent::{support_registry, AgentRuntime, OpenAiCompatibleClient, SupportService};
use supportdesk_core::config::{AppConfig, ConfigError, LoadOptions};
use supportdesk_core::DummyDataset;
use supportdesk_db::{
    connect_with_config, migrations, DbPool, SqlConversationRepository, SqlTicketRepository,
    TicketRepository,
};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub db_pool: DbPool,
    pub service: Arc<SupportService>,
    pub tickets: Arc<dyn TicketRepository>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("llm client setup failed: {0}")]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Prompt(#[from] PromptError),
}

pub async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config).await
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let llm = Arc::new(OpenAiCompatibleClient::from_config(&config.llm)?);
    info!(
        event_name = "system.bootstrap.llm_configured",
        correlation_id = "bootstrap",
        model = %llm.model(),
        endpoint = %llm.endpoint(),
        "llm client configured"
    );
    assemble(config, llm).await
}

/// Wires stores, tools and the agent around the given model client.
pub async fn assemble(
    config: AppConfig,
    llm: Arc<dyn LlmClient>,
) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let db_pool = connect_with_config(&config.database).await.map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    let instructions = load_system_prompt(config.llm.system_prompt_path.as_deref())?;
    let tickets: Arc<dyn TicketRepository> = Arc::new(SqlTicketRepository::new(db_pool.clone()));
    let conversations = Arc::new(SqlConversationRepository::new(db_pool.clone()));
    let tools = support_registry(
        tickets.clone(),
        DummyDataset::fixture(),
        config.tools.customer_id_policy(),
    );
    let runtime = AgentRuntime::new(llm, tools, instructions).with_config(&config.llm);
    let service = Arc::new(SupportService::new(Arc::new(runtime), conversations));

    Ok(Application { config, db_pool, service, tickets })
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use supportdesk_agent::llm::{Completion, ScriptedLlmClient};
    use supportdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions};

    use crate::bootstrap::{assemble, bootstrap, BootstrapError};

    #[tokio::test]
    async fn bootstrap_fails_fast_without_database_url() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("   ".to_string()),
                llm_api_key: Some("test-key".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let error = result.err().expect("error");
        assert!(matches!(error, BootstrapError::Config(_)));
        assert!(error.to_string().contains("database.url"), "{error}");
    }

    #[tokio::test]
    async fn bootstrap_connects_migrates_and_registers_tools() {
        let dir = tempfile::tempdir().expect("temp dir");
        let database_url = format!("sqlite://{}?mode=rwc", dir.path().join("support.db").display());
        let app = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url),
                llm_api_key: Some("test-key".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await
        .expect("bootstrap should succeed with valid overrides");

        assert_eq!(app.service.runtime().tools().len(), 6);
        assert!(app.tickets.list().await.expect("list").is_empty());
        app.db_pool.close().await;
    }

    #[tokio::test]
    async fn missing_prompt_file_stops_startup() {
        let mut config = AppConfig::default();
        config.database.url = "sqlite::memory:".to_string();
        config.database.max_connections = 1;
        config.llm.system_prompt_path = Some("/nonexistent/support-prompt.md".into());

        let llm = Arc::new(ScriptedLlmClient::new([Ok(Completion::text("unused"))]));
        let result = assemble(config, llm).await;

        assert!(matches!(result, Err(BootstrapError::Prompt(_))));
    }
}
