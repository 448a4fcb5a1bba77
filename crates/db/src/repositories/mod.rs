use async_trait::async_trait;
use thiserror::Error;

use supportdesk_core::domain::conversation::{ChatHistory, ChatRole, Conversation, ConversationId};
use supportdesk_core::domain::customer::CustomerId;
use supportdesk_core::domain::ticket::{NewTicket, Ticket};
use supportdesk_core::errors::ApplicationError;
use supportdesk_core::lookup::Lookup;

pub mod conversation;
pub mod memory;
pub mod ticket;

pub use conversation::SqlConversationRepository;
pub use memory::{InMemoryConversationRepository, InMemoryTicketRepository};
pub use ticket::SqlTicketRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("conversation {0} does not exist")]
    UnknownConversation(ConversationId),
    #[error("decode error: {0}")]
    Decode(String),
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::UnknownConversation(id) => Self::UnknownConversation(id),
            RepositoryError::Database(error) => Self::StoreUnavailable(error.to_string()),
            RepositoryError::Decode(message) => Self::StoreUnavailable(message),
        }
    }
}

#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Inserts the ticket and returns it with the id the store assigned.
    async fn save(&self, ticket: NewTicket) -> Result<Ticket, RepositoryError>;

    /// First ticket, by ascending id, whose question contains `text`
    /// ignoring case.
    async fn search_by_question_substring(
        &self,
        text: &str,
    ) -> Result<Lookup<Ticket>, RepositoryError>;

    async fn list(&self) -> Result<Vec<Ticket>, RepositoryError>;
}

#[async_trait]
pub trait ConversationRepository: Send + Sync {
    async fn start_conversation(
        &self,
        customer_id: CustomerId,
    ) -> Result<Conversation, RepositoryError>;

    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError>;

    /// Fails with `UnknownConversation` and writes nothing when `conversation_id`
    /// has not been started.
    async fn append_turn(
        &self,
        conversation_id: ConversationId,
        customer_id: CustomerId,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatHistory, RepositoryError>;

    /// Appends a user turn and the assistant's reply as one unit: either
    /// both rows are written or neither is.
    async fn append_exchange(
        &self,
        conversation_id: ConversationId,
        customer_id: CustomerId,
        question: &str,
        answer: &str,
    ) -> Result<(ChatHistory, ChatHistory), RepositoryError>;

    async fn list_turns(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ChatHistory>, RepositoryError>;
}
