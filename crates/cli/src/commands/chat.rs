//! Interactive support session on the terminal.
//!
//! Answers go to stdout; logs go to stderr so they never interleave with
//! the conversation.

use std::io;
use std::sync::Arc;

use supportdesk_agent::prompt::load_system_prompt;
use supportdesk_agent::{
    support_registry, AgentRuntime, AskRequest, ChatMessage, OpenAiCompatibleClient, SupportService,
};
use supportdesk_core::config::{AppConfig, LoadOptions, LoggingConfig};
use supportdesk_core::{ApplicationError, ConversationId, CustomerId, DomainError, DummyDataset};
use supportdesk_db::{
    connect_with_config, migrations, SqlConversationRepository, SqlTicketRepository, TicketRepository,
};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::commands::{current_thread_runtime, CommandResult, Setup};

const COMMAND: &str = "chat";
pub const PROMPT: &str = "Ask (or 'exit'): ";

#[derive(Clone, Copy, Debug)]
pub struct ChatOptions {
    pub customer_id: i64,
    pub log_turns: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReplSummary {
    pub answered: usize,
    pub failed: usize,
}

pub enum ChatSession {
    Logged {
        service: SupportService,
        customer_id: CustomerId,
        conversation_id: ConversationId,
    },
    /// Keeps history in memory only; nothing reaches the conversation log.
    Ephemeral {
        runtime: Arc<AgentRuntime>,
        customer_id: CustomerId,
        history: Vec<ChatMessage>,
    },
}

impl ChatSession {
    pub async fn logged(service: SupportService, customer_id: CustomerId) -> Result<Self, ApplicationError> {
        let conversation_id = service.start_conversation(customer_id).await?;
        Ok(Self::Logged { service, customer_id, conversation_id })
    }

    pub fn ephemeral(runtime: Arc<AgentRuntime>, customer_id: CustomerId) -> Self {
        Self::Ephemeral { runtime, customer_id, history: Vec::new() }
    }

    pub fn conversation_id(&self) -> Option<ConversationId> {
        match self {
            Self::Logged { conversation_id, .. } => Some(*conversation_id),
            Self::Ephemeral { .. } => None,
        }
    }

    pub async fn ask(&mut self, question: &str, turn: usize) -> Result<String, ApplicationError> {
        match self {
            Self::Logged { service, customer_id, conversation_id } => {
                let response = service
                    .ask(AskRequest {
                        customer_id: *customer_id,
                        question: question.to_string(),
                        conversation_id: Some(*conversation_id),
                        correlation_id: format!("repl-{}-{turn}", conversation_id.0),
                    })
                    .await?;
                Ok(response.answer)
            }
            Self::Ephemeral { runtime, customer_id, history } => {
                let question = question.trim();
                if question.is_empty() {
                    return Err(DomainError::InvalidQuestion("question must not be empty".to_string()).into());
                }
                let answer = runtime.answer(*customer_id, history.as_slice(), question).await?;
                history.push(ChatMessage::user(question));
                history.push(ChatMessage::assistant(answer.text.clone()));
                Ok(answer.text)
            }
        }
    }
}

fn is_exit(line: &str) -> bool {
    line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit")
}

async fn say<W: AsyncWrite + Unpin>(output: &mut W, text: &str) -> io::Result<()> {
    output.write_all(text.as_bytes()).await?;
    output.flush().await
}

/// Reads questions until `exit`, `quit` or end of input. A failed turn is
/// reported and the session carries on.
pub async fn run_repl<R, W>(session: &mut ChatSession, mut input: R, mut output: W) -> io::Result<ReplSummary>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut summary = ReplSummary::default();
    let banner = match session.conversation_id() {
        Some(id) => format!("Support agent ready (conversation {id}).\n"),
        None => "Support agent ready (not logged).\n".to_string(),
    };
    say(&mut output, &banner).await?;

    let mut line = String::new();
    loop {
        say(&mut output, PROMPT).await?;

        line.clear();
        if input.read_line(&mut line).await? == 0 {
            say(&mut output, "\n").await?;
            break;
        }

        let question = line.trim();
        if is_exit(question) {
            break;
        }
        if question.is_empty() {
            continue;
        }

        let turn = summary.answered + summary.failed + 1;
        let reply = match session.ask(question, turn).await {
            Ok(answer) => {
                summary.answered += 1;
                format!("\nAgent: {answer}\n\n")
            }
            Err(error) => {
                summary.failed += 1;
                format!("\nError: {error}\n\n")
            }
        };
        say(&mut output, &reply).await?;
    }

    say(&mut output, "Goodbye.\n").await?;
    Ok(summary)
}

pub fn run(options: ChatOptions) -> CommandResult {
    match start(options) {
        Ok(_) => CommandResult::text(0, ""),
        Err(setup) => setup.into_result(COMMAND),
    }
}

fn start(options: ChatOptions) -> Result<ReplSummary, Setup> {
    let config = AppConfig::load(LoadOptions::default())
        .map_err(|error| Setup::config(format!("configuration issue: {error}")))?;
    init_logging(&config.logging);
    let runtime = current_thread_runtime()?;

    runtime.block_on(async {
        let pool = connect_with_config(&config.database)
            .await
            .map_err(|error| Setup::database(error.to_string()))?;
        migrations::run_pending(&pool).await.map_err(|error| Setup::migration(error.to_string()))?;

        let agent = Arc::new(build_agent(&config, Arc::new(SqlTicketRepository::new(pool.clone())))?);
        let customer_id = CustomerId(options.customer_id);
        let mut session = if options.log_turns {
            let conversations = Arc::new(SqlConversationRepository::new(pool.clone()));
            ChatSession::logged(SupportService::new(agent, conversations), customer_id)
                .await
                .map_err(|error| Setup::database(error.to_string()))?
        } else {
            ChatSession::ephemeral(agent, customer_id)
        };

        let summary = run_repl(&mut session, BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
            .map_err(|error| Setup::runtime(format!("terminal i/o failed: {error}")))?;

        tracing::info!(
            event_name = "cli.chat.finished",
            correlation_id = "repl",
            answered = summary.answered,
            failed = summary.failed,
            "chat session finished"
        );
        pool.close().await;
        Ok(summary)
    })
}

fn build_agent(config: &AppConfig, tickets: Arc<dyn TicketRepository>) -> Result<AgentRuntime, Setup> {
    let llm = OpenAiCompatibleClient::from_config(&config.llm).map_err(|error| Setup::config(error.to_string()))?;
    let instructions = load_system_prompt(config.llm.system_prompt_path.as_deref())
        .map_err(|error| Setup::config(error.to_string()))?;
    let tools = support_registry(tickets, DummyDataset::fixture(), config.tools.customer_id_policy());
    Ok(AgentRuntime::new(Arc::new(llm), tools, instructions).with_config(&config.llm))
}

fn init_logging(logging: &LoggingConfig) {
    use supportdesk_core::config::LogFormat::*;

    let filter = EnvFilter::try_new(&logging.level).unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter).with_writer(io::stderr);

    // A subscriber may already be installed when embedded in tests.
    let _ = match logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}
