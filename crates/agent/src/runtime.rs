use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use supportdesk_core::config::LlmConfig;
use supportdesk_core::{ApplicationError, CustomerId};
use thiserror::Error;
use tracing::{debug, warn};

use crate::conversation::request_messages;
use crate::llm::{ChatMessage, LlmClient, LlmError};
use crate::prompt::render_instructions;
use crate::tools::ToolRegistry;

pub const DEFAULT_MAX_TOOL_ROUNDS: u32 = 6;
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(210);

#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error("agent turn timed out after {0:?}")]
    Timeout(Duration),
    #[error("model kept requesting tools after {0} rounds")]
    ToolRoundsExhausted(u32),
    #[error("model returned an empty answer")]
    EmptyAnswer,
}

impl From<AgentError> for ApplicationError {
    fn from(error: AgentError) -> Self {
        ApplicationError::Upstream(error.to_string())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ToolInvocation {
    pub name: String,
    pub arguments: Value,
    pub output: String,
    pub failed: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct AgentAnswer {
    pub text: String,
    pub tool_invocations: Vec<ToolInvocation>,
}

/// Drives one question through the model, dispatching tool calls until the
/// model produces a final text answer.
pub struct AgentRuntime {
    llm: Arc<dyn LlmClient>,
    tools: ToolRegistry,
    instructions: String,
    max_tool_rounds: u32,
    turn_timeout: Duration,
}

impl AgentRuntime {
    pub fn new(llm: Arc<dyn LlmClient>, tools: ToolRegistry, instructions: impl Into<String>) -> Self {
        Self {
            llm,
            tools,
            instructions: instructions.into(),
            max_tool_rounds: DEFAULT_MAX_TOOL_ROUNDS,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
        }
    }

    pub fn with_limits(mut self, max_tool_rounds: u32, turn_timeout: Duration) -> Self {
        self.max_tool_rounds = max_tool_rounds;
        self.turn_timeout = turn_timeout;
        self
    }

    pub fn with_config(self, config: &LlmConfig) -> Self {
        self.with_limits(config.max_tool_rounds, config.turn_timeout())
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// `history` holds prior turns of the same conversation, oldest first.
    /// Tool side effects that finished before a failure or timeout are kept.
    pub async fn answer(
        &self,
        customer_id: CustomerId,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<AgentAnswer, AgentError> {
        let limit = self.turn_timeout;
        tokio::time::timeout(limit, self.run_turn(customer_id, history, question))
            .await
            .map_err(|_| AgentError::Timeout(limit))?
    }

    async fn run_turn(
        &self,
        customer_id: CustomerId,
        history: &[ChatMessage],
        question: &str,
    ) -> Result<AgentAnswer, AgentError> {
        let instructions = render_instructions(&self.instructions, customer_id, self.tools.names());
        let mut messages = request_messages(instructions, history, question);
        let definitions = self.tools.definitions();
        let mut invocations = Vec::new();
        let mut rounds = 0_u32;

        loop {
            let completion = self.llm.complete(&messages, &definitions).await?;

            if completion.tool_calls.is_empty() {
                let text = completion.content.as_deref().map(str::trim).unwrap_or_default();
                if text.is_empty() {
                    warn!(event_name = "agent.turn.empty_answer", rounds, "model returned no text");
                    return Err(AgentError::EmptyAnswer);
                }
                return Ok(AgentAnswer { text: text.to_string(), tool_invocations: invocations });
            }

            if rounds >= self.max_tool_rounds {
                warn!(
                    event_name = "agent.turn.rounds_exhausted",
                    max_tool_rounds = self.max_tool_rounds,
                    "model exceeded tool round limit"
                );
                return Err(AgentError::ToolRoundsExhausted(self.max_tool_rounds));
            }
            rounds += 1;

            let calls = completion.tool_calls;
            messages.push(ChatMessage::assistant_tool_calls(completion.content, calls.clone()));

            for call in calls {
                debug!(event_name = "agent.tool.dispatch", tool = %call.name, round = rounds, "dispatching tool call");
                let output = self.tools.dispatch(&call).await;
                messages.push(ChatMessage::tool_result(call.id.clone(), output.text.clone()));
                invocations.push(ToolInvocation {
                    name: call.name,
                    arguments: call.arguments,
                    output: output.text,
                    failed: output.failed,
                });
            }
        }
    }
}
