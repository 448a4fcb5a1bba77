use std::sync::Arc;

use serde::Serialize;
use supportdesk_core::{ApplicationError, ConversationId, CustomerId, DomainError};
use supportdesk_db::ConversationRepository;
use tracing::{info, warn};

use crate::conversation::history_messages;
use crate::runtime::{AgentRuntime, ToolInvocation};

#[derive(Clone, Debug)]
pub struct AskRequest {
    pub customer_id: CustomerId,
    pub question: String,
    pub conversation_id: Option<ConversationId>,
    pub correlation_id: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AskResponse {
    pub customer_id: CustomerId,
    pub conversation_id: ConversationId,
    pub question: String,
    pub answer: String,
    #[serde(skip)]
    pub tool_invocations: Vec<ToolInvocation>,
}

/// Question in, answer out, with the exchange recorded in the
/// conversation log.
pub struct SupportService {
    runtime: Arc<AgentRuntime>,
    conversations: Arc<dyn ConversationRepository>,
}

impl SupportService {
    pub fn new(runtime: Arc<AgentRuntime>, conversations: Arc<dyn ConversationRepository>) -> Self {
        Self { runtime, conversations }
    }

    pub fn runtime(&self) -> &AgentRuntime {
        &self.runtime
    }

    pub async fn start_conversation(&self, customer_id: CustomerId) -> Result<ConversationId, ApplicationError> {
        let conversation = self.conversations.start_conversation(customer_id).await?;
        info!(
            event_name = "support.conversation.started",
            customer_id = customer_id.0,
            conversation_id = conversation.id.0,
            "conversation started"
        );
        Ok(conversation.id)
    }

    /// Both turns are appended together, and only after the agent answers;
    /// a failed turn leaves the log untouched. A supplied conversation must
    /// belong to the asking customer.
    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse, ApplicationError> {
        let question = request.question.trim();
        if question.is_empty() {
            return Err(DomainError::InvalidQuestion("question must not be empty".to_string()).into());
        }

        let conversation_id = match request.conversation_id {
            Some(id) => {
                let conversation = self
                    .conversations
                    .find_conversation(id)
                    .await?
                    .ok_or(ApplicationError::UnknownConversation(id))?;
                // Reported as unknown so callers cannot probe other customers' ids.
                if conversation.customer_id != request.customer_id {
                    warn!(
                        event_name = "support.ask.conversation_mismatch",
                        correlation_id = %request.correlation_id,
                        customer_id = request.customer_id.0,
                        conversation_id = id.0,
                        "conversation belongs to another customer"
                    );
                    return Err(ApplicationError::UnknownConversation(id));
                }
                id
            }
            None => self.start_conversation(request.customer_id).await?,
        };

        let turns = self.conversations.list_turns(conversation_id).await?;
        let history = history_messages(&turns);

        let answer = match self.runtime.answer(request.customer_id, &history, question).await {
            Ok(answer) => answer,
            Err(error) => {
                warn!(
                    event_name = "support.ask.failed",
                    correlation_id = %request.correlation_id,
                    customer_id = request.customer_id.0,
                    conversation_id = conversation_id.0,
                    error = %error,
                    "agent turn failed"
                );
                return Err(error.into());
            }
        };

        self.conversations
            .append_exchange(conversation_id, request.customer_id, question, &answer.text)
            .await?;

        info!(
            event_name = "support.ask.answered",
            correlation_id = %request.correlation_id,
            customer_id = request.customer_id.0,
            conversation_id = conversation_id.0,
            tool_calls = answer.tool_invocations.len(),
            "question answered"
        );

        Ok(AskResponse {
            customer_id: request.customer_id,
            conversation_id,
            question: question.to_string(),
            answer: answer.text,
            tool_invocations: answer.tool_invocations,
        })
    }
}
