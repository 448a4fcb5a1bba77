use std::collections::BTreeMap;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use supportdesk_core::DomainError;
use supportdesk_db::RepositoryError;
use thiserror::Error;
use tracing::{debug, warn};

use crate::llm::{ToolCall, ToolDefinition};

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("ticket store unavailable: {0}")]
    Store(#[from] RepositoryError),
}

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    /// JSON schema of the arguments object.
    fn parameters(&self) -> Value;
    async fn execute(&self, input: Value) -> Result<String, ToolError>;
}

/// Text handed back to the model for a single tool call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ToolOutput {
    pub text: String,
    pub failed: bool,
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.parameters(),
            })
            .collect()
    }

    /// Runs a model-requested call. Failures become text for the model
    /// instead of aborting the turn.
    pub async fn dispatch(&self, call: &ToolCall) -> ToolOutput {
        let Some(tool) = self.tools.get(&call.name) else {
            warn!(event_name = "agent.tool.unknown", tool = %call.name, "model requested unknown tool");
            return ToolOutput {
                text: format!(
                    "Error: unknown tool `{}`. Available tools: {}.",
                    call.name,
                    self.names().join(", ")
                ),
                failed: true,
            };
        };

        match tool.execute(call.arguments.clone()).await {
            Ok(text) => {
                debug!(event_name = "agent.tool.completed", tool = %call.name, "tool call completed");
                ToolOutput { text, failed: false }
            }
            Err(error) => {
                warn!(event_name = "agent.tool.failed", tool = %call.name, error = %error, "tool call failed");
                ToolOutput { text: failure_text(&error), failed: true }
            }
        }
    }
}

fn failure_text(error: &ToolError) -> String {
    match error {
        ToolError::Store(_) => format!(
            "Error: {error}. The ticket store cannot be reached right now; tell the customer to try again later."
        ),
        ToolError::InvalidArguments(_) | ToolError::Domain(_) => format!("Error: {error}."),
    }
}

pub(crate) fn parse_arguments<T: DeserializeOwned>(input: Value) -> Result<T, ToolError> {
    serde_json::from_value(input).map_err(|error| ToolError::InvalidArguments(error.to_string()))
}

/// Accepts integers sent as JSON numbers, integral floats or numeric strings.
pub(crate) fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let parsed = match &value {
        Value::Number(number) => number.as_i64().or_else(|| number.as_f64().and_then(whole_f64_to_i64)),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    };
    parsed.ok_or_else(|| serde::de::Error::custom(format!("expected an integer, got {value}")))
}

// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive.
fn whole_f64_to_i64(value: f64) -> Option<i64> {
    let in_range = value >= i64::MIN as f64 && value < i64::MAX as f64;
    (in_range && value.fract() == 0.0).then_some(value as i64)
}
