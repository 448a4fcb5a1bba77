use tokio::sync::RwLock;

use supportdesk_core::domain::conversation::{
    ChatHistory, ChatHistoryId, ChatRole, Conversation, ConversationId,
};
use supportdesk_core::domain::customer::CustomerId;
use supportdesk_core::domain::ticket::{NewTicket, Ticket, TicketId};
use supportdesk_core::lookup::Lookup;

use super::{ConversationRepository, RepositoryError, TicketRepository};

/// Ticket store kept in process memory. Ids start at 1 and follow insertion
/// order, matching the SQL store's tie-break.
#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: RwLock<Vec<Ticket>>,
}

#[async_trait::async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn save(&self, ticket: NewTicket) -> Result<Ticket, RepositoryError> {
        let mut tickets = self.tickets.write().await;
        let id = TicketId(tickets.len() as i64 + 1);
        let stored = ticket.into_ticket(id);
        tickets.push(stored.clone());
        Ok(stored)
    }

    async fn search_by_question_substring(
        &self,
        text: &str,
    ) -> Result<Lookup<Ticket>, RepositoryError> {
        let tickets = self.tickets.read().await;
        Ok(tickets.iter().find(|ticket| ticket.question_contains(text)).cloned().into())
    }

    async fn list(&self) -> Result<Vec<Ticket>, RepositoryError> {
        Ok(self.tickets.read().await.clone())
    }
}

#[derive(Default)]
struct ConversationLog {
    conversations: Vec<Conversation>,
    turns: Vec<ChatHistory>,
}

impl ConversationLog {
    fn ensure_started(&self, conversation_id: ConversationId) -> Result<(), RepositoryError> {
        if self.conversations.iter().any(|conversation| conversation.id == conversation_id) {
            Ok(())
        } else {
            Err(RepositoryError::UnknownConversation(conversation_id))
        }
    }

    fn push_turn(
        &mut self,
        conversation_id: ConversationId,
        customer_id: CustomerId,
        role: ChatRole,
        content: &str,
    ) -> ChatHistory {
        let turn = ChatHistory {
            id: ChatHistoryId(self.turns.len() as i64 + 1),
            conversation_id,
            customer_id,
            role,
            content: content.to_string(),
        };
        self.turns.push(turn.clone());
        turn
    }
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    log: RwLock<ConversationLog>,
}

#[async_trait::async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn start_conversation(
        &self,
        customer_id: CustomerId,
    ) -> Result<Conversation, RepositoryError> {
        let mut log = self.log.write().await;
        let conversation = Conversation {
            id: ConversationId(log.conversations.len() as i64 + 1),
            customer_id,
        };
        log.conversations.push(conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let log = self.log.read().await;
        Ok(log.conversations.iter().find(|conversation| conversation.id == id).cloned())
    }

    async fn append_turn(
        &self,
        conversation_id: ConversationId,
        customer_id: CustomerId,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatHistory, RepositoryError> {
        let mut log = self.log.write().await;
        log.ensure_started(conversation_id)?;
        Ok(log.push_turn(conversation_id, customer_id, role, content))
    }

    async fn append_exchange(
        &self,
        conversation_id: ConversationId,
        customer_id: CustomerId,
        question: &str,
        answer: &str,
    ) -> Result<(ChatHistory, ChatHistory), RepositoryError> {
        let mut log = self.log.write().await;
        log.ensure_started(conversation_id)?;
        let user = log.push_turn(conversation_id, customer_id, ChatRole::User, question);
        let assistant = log.push_turn(conversation_id, customer_id, ChatRole::Assistant, answer);
        Ok((user, assistant))
    }

    async fn list_turns(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ChatHistory>, RepositoryError> {
        let log = self.log.read().await;
        Ok(log.turns.iter().filter(|turn| turn.conversation_id == conversation_id).cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use supportdesk_core::domain::conversation::{ChatRole, ConversationId};
    use supportdesk_core::domain::customer::CustomerId;
    use supportdesk_core::domain::ticket::NewTicket;

    use crate::repositories::{
        ConversationRepository, InMemoryConversationRepository, InMemoryTicketRepository,
        RepositoryError, TicketRepository,
    };

    #[tokio::test]
    async fn in_memory_ticket_search_follows_insertion_order() {
        let repo = InMemoryTicketRepository::default();
        let ticket = NewTicket::new(CustomerId(3), "Can I pay by card?", "Yes.", "billing")
            .expect("valid ticket");
        let saved = repo.save(ticket).await.expect("save");

        let found = repo.search_by_question_substring("PAY BY").await.expect("search");

        assert_eq!(found.found(), Some(saved));
        assert!(!repo.search_by_question_substring("refund").await.expect("search").is_found());
    }

    #[tokio::test]
    async fn in_memory_conversation_enforces_reference() {
        let repo = InMemoryConversationRepository::default();
        let conversation = repo.start_conversation(CustomerId(7)).await.expect("start");

        repo.append_turn(conversation.id, CustomerId(7), ChatRole::User, "hi").await.expect("user");
        let orphan = repo.append_turn(ConversationId(5), CustomerId(7), ChatRole::User, "hi").await;

        assert!(matches!(orphan, Err(RepositoryError::UnknownConversation(_))));
        assert_eq!(repo.list_turns(conversation.id).await.expect("list").len(), 1);

        let orphan_exchange = repo.append_exchange(ConversationId(5), CustomerId(7), "q", "a").await;
        assert!(matches!(orphan_exchange, Err(RepositoryError::UnknownConversation(_))));
        assert_eq!(repo.list_turns(ConversationId(5)).await.expect("list").len(), 0);
    }
}
