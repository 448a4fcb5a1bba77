//! Support agent: the LLM client, the tool layer it can call, and the
//! service that records every answered question in the conversation log.
//!
//! The model only chooses which tool to call and phrases the answer. Ticket
//! ids, lookups and persistence are decided by the tools and the stores.

pub mod conversation;
pub mod llm;
pub mod openai;
pub mod prompt;
pub mod runtime;
pub mod service;
pub mod support_tools;
pub mod tools;

pub use llm::{ChatMessage, Completion, LlmClient, LlmError, ScriptedLlmClient, ToolCall};
pub use openai::OpenAiCompatibleClient;
pub use runtime::{AgentAnswer, AgentError, AgentRuntime, ToolInvocation};
pub use service::{AskRequest, AskResponse, SupportService};
pub use support_tools::support_registry;
pub use tools::{Tool, ToolError, ToolRegistry};
