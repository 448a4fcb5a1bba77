use sqlx::{Row, Sqlite, Transaction};

use supportdesk_core::domain::conversation::{
    ChatHistory, ChatHistoryId, ChatRole, Conversation, ConversationId,
};
use supportdesk_core::domain::customer::CustomerId;

use super::{ConversationRepository, RepositoryError};
use crate::DbPool;

pub struct SqlConversationRepository {
    pool: DbPool,
}

impl SqlConversationRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> Result<ChatHistory, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let conversation_id: i64 =
        row.try_get("conversation_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_id: i64 =
        row.try_get("customer_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let role: String = row.try_get("role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let content: String =
        row.try_get("content").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ChatHistory {
        id: ChatHistoryId(id),
        conversation_id: ConversationId(conversation_id),
        customer_id: CustomerId(customer_id),
        role: role.parse::<ChatRole>().map_err(|e| RepositoryError::Decode(e.to_string()))?,
        content,
    })
}

async fn conversation_exists(
    tx: &mut Transaction<'_, Sqlite>,
    conversation_id: ConversationId,
) -> Result<bool, RepositoryError> {
    let exists: Option<i64> = sqlx::query_scalar("SELECT id FROM conversations WHERE id = ?")
        .bind(conversation_id.0)
        .fetch_optional(&mut **tx)
        .await?;
    Ok(exists.is_some())
}

async fn insert_turn(
    tx: &mut Transaction<'_, Sqlite>,
    conversation_id: ConversationId,
    customer_id: CustomerId,
    role: ChatRole,
    content: &str,
) -> Result<ChatHistory, RepositoryError> {
    let result = sqlx::query(
        "INSERT INTO chat_history (conversation_id, customer_id, role, content)
         VALUES (?, ?, ?, ?)",
    )
    .bind(conversation_id.0)
    .bind(customer_id.0)
    .bind(role.as_str())
    .bind(content)
    .execute(&mut **tx)
    .await?;

    Ok(ChatHistory {
        id: ChatHistoryId(result.last_insert_rowid()),
        conversation_id,
        customer_id,
        role,
        content: content.to_string(),
    })
}

#[async_trait::async_trait]
impl ConversationRepository for SqlConversationRepository {
    async fn start_conversation(
        &self,
        customer_id: CustomerId,
    ) -> Result<Conversation, RepositoryError> {
        let result = sqlx::query("INSERT INTO conversations (customer_id) VALUES (?)")
            .bind(customer_id.0)
            .execute(&self.pool)
            .await?;

        Ok(Conversation { id: ConversationId(result.last_insert_rowid()), customer_id })
    }

    async fn find_conversation(
        &self,
        id: ConversationId,
    ) -> Result<Option<Conversation>, RepositoryError> {
        let row = sqlx::query("SELECT id, customer_id FROM conversations WHERE id = ?")
            .bind(id.0)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(ref r) => {
                let customer_id: i64 = r
                    .try_get("customer_id")
                    .map_err(|e| RepositoryError::Decode(e.to_string()))?;
                Ok(Some(Conversation { id, customer_id: CustomerId(customer_id) }))
            }
            None => Ok(None),
        }
    }

    async fn append_turn(
        &self,
        conversation_id: ConversationId,
        customer_id: CustomerId,
        role: ChatRole,
        content: &str,
    ) -> Result<ChatHistory, RepositoryError> {
        let mut tx = self.pool.begin().await?;
        if !conversation_exists(&mut tx, conversation_id).await? {
            tx.rollback().await?;
            return Err(RepositoryError::UnknownConversation(conversation_id));
        }

        let turn = insert_turn(&mut tx, conversation_id, customer_id, role, content).await?;
        tx.commit().await?;
        Ok(turn)
    }

    async fn append_exchange(
        &self,
        conversation_id: ConversationId,
        customer_id: CustomerId,
        question: &str,
        answer: &str,
    ) -> Result<(ChatHistory, ChatHistory), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        if !conversation_exists(&mut tx, conversation_id).await? {
            tx.rollback().await?;
            return Err(RepositoryError::UnknownConversation(conversation_id));
        }

        // Dropping `tx` on an early return rolls back the user turn.
        let user = insert_turn(&mut tx, conversation_id, customer_id, ChatRole::User, question).await?;
        let assistant =
            insert_turn(&mut tx, conversation_id, customer_id, ChatRole::Assistant, answer).await?;
        tx.commit().await?;
        Ok((user, assistant))
    }

    async fn list_turns(
        &self,
        conversation_id: ConversationId,
    ) -> Result<Vec<ChatHistory>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, conversation_id, customer_id, role, content
             FROM chat_history WHERE conversation_id = ? ORDER BY id ASC",
        )
        .bind(conversation_id.0)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_turn).collect::<Result<Vec<_>, _>>()
    }
}

#[cfg(test)]
mod tests {
    use supportdesk_core::domain::conversation::{ChatRole, ConversationId};
    use supportdesk_core::domain::customer::CustomerId;

    use super::SqlConversationRepository;
    use crate::repositories::{ConversationRepository, RepositoryError};
    use crate::{connect_with_settings, migrations};

    async fn repo() -> (SqlConversationRepository, crate::DbPool) {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        (SqlConversationRepository::new(pool.clone()), pool)
    }

    #[tokio::test]
    async fn turns_are_listed_in_append_order() {
        let (repo, pool) = repo().await;
        let conversation = repo.start_conversation(CustomerId(7)).await.expect("start");

        repo.append_turn(conversation.id, CustomerId(7), ChatRole::User, "Where is my order?")
            .await
            .expect("user turn");
        repo.append_turn(conversation.id, CustomerId(7), ChatRole::Assistant, "It shipped today.")
            .await
            .expect("assistant turn");

        let turns = repo.list_turns(conversation.id).await.expect("list");
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].role, ChatRole::User);
        assert_eq!(turns[1].role, ChatRole::Assistant);
        assert!(turns.iter().all(|turn| turn.conversation_id == conversation.id));
        pool.close().await;
    }

    #[tokio::test]
    async fn turns_do_not_leak_between_conversations() {
        let (repo, pool) = repo().await;
        let first = repo.start_conversation(CustomerId(1)).await.expect("start first");
        let second = repo.start_conversation(CustomerId(2)).await.expect("start second");

        repo.append_turn(first.id, CustomerId(1), ChatRole::User, "hello").await.expect("append");

        assert_eq!(repo.list_turns(first.id).await.expect("list").len(), 1);
        assert!(repo.list_turns(second.id).await.expect("list").is_empty());
        assert_eq!(
            repo.find_conversation(second.id).await.expect("find").map(|c| c.customer_id),
            Some(CustomerId(2))
        );
        pool.close().await;
    }

    #[tokio::test]
    async fn append_to_unknown_conversation_writes_nothing() {
        let (repo, pool) = repo().await;

        let result =
            repo.append_turn(ConversationId(99), CustomerId(7), ChatRole::User, "orphan").await;

        assert!(matches!(result, Err(RepositoryError::UnknownConversation(ConversationId(99)))));
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chat_history")
            .fetch_one(&pool)
            .await
            .expect("count rows");
        assert_eq!(count, 0);
        pool.close().await;
    }

    #[tokio::test]
    async fn exchange_is_written_whole_or_not_at_all() {
        let (repo, pool) = repo().await;
        let conversation = repo.start_conversation(CustomerId(7)).await.expect("start");

        let (user, assistant) = repo
            .append_exchange(conversation.id, CustomerId(7), "Is the store open?", "Until 6pm.")
            .await
            .expect("first exchange");
        assert_eq!((user.role, assistant.role), (ChatRole::User, ChatRole::Assistant));

        sqlx::query(
            "CREATE TRIGGER reject_assistant BEFORE INSERT ON chat_history
             WHEN NEW.role = 'assistant'
             BEGIN SELECT RAISE(ABORT, 'assistant turn rejected'); END",
        )
        .execute(&pool)
        .await
        .expect("create trigger");

        let result =
            repo.append_exchange(conversation.id, CustomerId(7), "And on Sunday?", "Closed.").await;

        assert!(matches!(result, Err(RepositoryError::Database(_))));
        let turns = repo.list_turns(conversation.id).await.expect("list");
        let contents: Vec<&str> = turns.iter().map(|turn| turn.content.as_str()).collect();
        assert_eq!(contents, vec!["Is the store open?", "Until 6pm."]);
        pool.close().await;
    }
}
