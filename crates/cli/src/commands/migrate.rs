use supportdesk_core::config::{AppConfig, LoadOptions};
use supportdesk_db::{connect_with_config, migrations};

use crate::commands::{current_thread_runtime, CommandResult, Setup};

const COMMAND: &str = "migrate";

pub fn run() -> CommandResult {
    match apply(LoadOptions::default()) {
        Ok(()) => CommandResult::success(COMMAND, "applied pending migrations"),
        Err(setup) => setup.into_result(COMMAND),
    }
}

fn apply(options: LoadOptions) -> Result<(), Setup> {
    let config = AppConfig::load(options)
        .map_err(|error| Setup::config(format!("configuration issue: {error}")))?;
    let runtime = current_thread_runtime()?;

    runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| Setup::database(error.to_string()))?;
        migrations::run_pending(&pool).await.map_err(|error| Setup::migration(error.to_string()))?;
        pool.close().await;
        Ok(())
    })
}
