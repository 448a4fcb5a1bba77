//! OpenAI-compatible `chat/completions` client with function calling.
//!
//! The default endpoint is Gemini's OpenAI compatibility layer, but any
//! provider speaking the same wire format works.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use supportdesk_core::config::LlmConfig;
use tracing::{debug, warn};

use crate::llm::{ChatMessage, Completion, LlmClient, LlmError, MessageRole, ToolCall, ToolDefinition};

const RETRY_BASE_DELAY_MS: u64 = 250;

pub struct OpenAiCompatibleClient {
    http: Client,
    endpoint: String,
    api_key: SecretString,
    model: String,
    max_retries: u32,
}

impl OpenAiCompatibleClient {
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| LlmError::Configuration("llm.api_key is not set".to_string()))?;
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|error| LlmError::Configuration(format!("failed to build http client: {error}")))?;

        Ok(Self {
            http,
            endpoint: completions_endpoint(&config.base_url),
            api_key,
            model: config.model.clone(),
            max_retries: config.max_retries,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, body: &Value) -> Result<String, Attempt> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| {
                let retryable = error.is_timeout() || error.is_connect() || error.is_request();
                Attempt { error: LlmError::Transport(error.to_string()), retryable }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|error| Attempt {
            error: LlmError::Transport(error.to_string()),
            retryable: true,
        })?;

        if status.is_success() {
            return Ok(text);
        }

        Err(Attempt {
            error: LlmError::Status { status: status.as_u16(), body: truncate(&text, 512) },
            retryable: is_retryable_status(status),
        })
    }
}

struct Attempt {
    error: LlmError,
    retryable: bool,
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolDefinition],
    ) -> Result<Completion, LlmError> {
        let body = request_body(&self.model, messages, tools);
        let mut attempt = 0_u32;

        loop {
            debug!(
                event_name = "agent.llm.request",
                model = %self.model,
                attempt,
                messages = messages.len(),
                "sending chat completion request"
            );

            match self.send_once(&body).await {
                Ok(text) => return parse_completion(&text),
                Err(failed) if failed.retryable && attempt < self.max_retries => {
                    warn!(
                        event_name = "agent.llm.retry",
                        attempt,
                        error = %failed.error,
                        "retrying chat completion request"
                    );
                    tokio::time::sleep(retry_delay(attempt)).await;
                    attempt += 1;
                }
                Err(failed) => return Err(failed.error),
            }
        }
    }
}

fn completions_endpoint(base_url: &str) -> String {
    format!("{}/chat/completions", base_url.trim_end_matches('/'))
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

fn retry_delay(attempt: u32) -> Duration {
    Duration::from_millis(RETRY_BASE_DELAY_MS.saturating_mul(1_u64 << attempt.min(6)))
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut truncated: String = text.chars().take(max_chars).collect();
    truncated.push_str("...");
    truncated
}

pub(crate) fn request_body(model: &str, messages: &[ChatMessage], tools: &[ToolDefinition]) -> Value {
    let mut body = Map::new();
    body.insert("model".to_string(), Value::String(model.to_string()));
    body.insert("messages".to_string(), Value::Array(messages.iter().map(wire_message).collect()));

    if !tools.is_empty() {
        let tools = tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    }
                })
            })
            .collect();
        body.insert("tools".to_string(), Value::Array(tools));
        body.insert("tool_choice".to_string(), Value::String("auto".to_string()));
    }

    Value::Object(body)
}

fn wire_message(message: &ChatMessage) -> Value {
    let mut wire = Map::new();
    wire.insert("role".to_string(), Value::String(message.role.as_str().to_string()));
    wire.insert(
        "content".to_string(),
        message.content.clone().map(Value::String).unwrap_or(Value::Null),
    );

    if message.role == MessageRole::Assistant && !message.tool_calls.is_empty() {
        let calls = message
            .tool_calls
            .iter()
            .map(|call| {
                json!({
                    "id": call.id,
                    "type": "function",
                    "function": {
                        "name": call.name,
                        "arguments": call.arguments.to_string(),
                    }
                })
            })
            .collect();
        wire.insert("tool_calls".to_string(), Value::Array(calls));
    }

    if let Some(id) = &message.tool_call_id {
        wire.insert("tool_call_id".to_string(), Value::String(id.clone()));
    }

    Value::Object(wire)
}

#[derive(Debug, Deserialize)]
struct WireResponse {
    #[serde(default)]
    choices: Vec<WireChoice>,
}

#[derive(Debug, Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<WireToolCall>>,
}

#[derive(Debug, Deserialize)]
struct WireToolCall {
    #[serde(default)]
    id: Option<String>,
    function: WireFunction,
}

#[derive(Debug, Deserialize)]
struct WireFunction {
    name: String,
    #[serde(default)]
    arguments: Option<String>,
}

pub(crate) fn parse_completion(body: &str) -> Result<Completion, LlmError> {
    let response: WireResponse = serde_json::from_str(body)
        .map_err(|error| LlmError::MalformedResponse(format!("invalid json: {error}")))?;
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse("response contained no choices".to_string()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .enumerate()
        .map(|(index, call)| ToolCall {
            id: call.id.filter(|id| !id.is_empty()).unwrap_or_else(|| format!("call_{index}")),
            name: call.function.name,
            arguments: parse_arguments(call.function.arguments.as_deref()),
        })
        .collect();

    Ok(Completion { content: choice.message.content, tool_calls })
}

// Unparseable arguments are passed through as a string so the tool can
// report the problem back to the model.
fn parse_arguments(raw: Option<&str>) -> Value {
    match raw.map(str::trim) {
        None | Some("") => Value::Object(Map::new()),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{completions_endpoint, parse_completion, request_body, retry_delay, truncate};
    use crate::llm::{ChatMessage, LlmError, ToolCall, ToolDefinition};
    use std::time::Duration;

    #[test]
    fn endpoint_joins_base_url_without_double_slash() {
        assert_eq!(
            completions_endpoint("https://generativelanguage.googleapis.com/v1beta/openai/"),
            "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
        );
        assert_eq!(completions_endpoint("http://localhost:9000/v1"), "http://localhost:9000/v1/chat/completions");
    }

    #[test]
    fn parses_plain_text_answer() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hello there"}}]}"#;
        let completion = parse_completion(body).expect("parse");

        assert_eq!(completion.content.as_deref(), Some("Hello there"));
        assert!(completion.tool_calls.is_empty());
    }

    #[test]
    fn parses_tool_calls_and_fills_missing_ids() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":null,"tool_calls":[
            {"id":"abc","type":"function","function":{"name":"search_dummy_by_ticket_id","arguments":"{\"ticket_id\":5}"}},
            {"type":"function","function":{"name":"search_dummy_by_status","arguments":"not json"}}
        ]}}]}"#;
        let completion = parse_completion(body).expect("parse");

        assert_eq!(completion.content, None);
        assert_eq!(completion.tool_calls.len(), 2);
        assert_eq!(completion.tool_calls[0].id, "abc");
        assert_eq!(completion.tool_calls[0].arguments, json!({"ticket_id": 5}));
        assert_eq!(completion.tool_calls[1].id, "call_1");
        assert_eq!(completion.tool_calls[1].arguments, json!("not json"));
    }

    #[test]
    fn empty_choices_are_malformed() {
        let error = parse_completion(r#"{"choices":[]}"#).expect_err("no choices");
        assert!(matches!(error, LlmError::MalformedResponse(_)));

        let error = parse_completion("<html>").expect_err("not json");
        assert!(matches!(error, LlmError::MalformedResponse(_)));
    }

    #[test]
    fn request_body_encodes_tool_round_trip_messages() {
        let call = ToolCall {
            id: "call_0".to_string(),
            name: "search_ticket".to_string(),
            arguments: json!({"question": "refund"}),
        };
        let messages = vec![
            ChatMessage::system("instructions"),
            ChatMessage::user("refund?"),
            ChatMessage::assistant_tool_calls(None, vec![call]),
            ChatMessage::tool_result("call_0", "No similar ticket found."),
        ];
        let tools = vec![ToolDefinition {
            name: "search_ticket".to_string(),
            description: "Search saved tickets".to_string(),
            parameters: json!({"type": "object"}),
        }];

        let body = request_body("gemini-2.0-flash", &messages, &tools);

        assert_eq!(body["model"], "gemini-2.0-flash");
        assert_eq!(body["messages"][2]["content"], serde_json::Value::Null);
        assert_eq!(body["messages"][2]["tool_calls"][0]["function"]["arguments"], r#"{"question":"refund"}"#);
        assert_eq!(body["messages"][3]["role"], "tool");
        assert_eq!(body["messages"][3]["tool_call_id"], "call_0");
        assert_eq!(body["tools"][0]["function"]["name"], "search_ticket");
    }

    #[test]
    fn request_body_omits_tools_when_none_registered() {
        let body = request_body("m", &[ChatMessage::user("hi")], &[]);
        assert!(body.get("tools").is_none());
        assert!(body["messages"][0].get("tool_calls").is_none());
    }

    #[test]
    fn retry_delay_grows_and_truncate_marks_cut() {
        assert_eq!(retry_delay(0), Duration::from_millis(250));
        assert_eq!(retry_delay(2), Duration::from_millis(1000));
        assert_eq!(truncate("abcdef", 3), "abc...");
        assert_eq!(truncate("abc", 3), "abc");
    }
}
