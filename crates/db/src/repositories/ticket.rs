use sqlx::Row;

use supportdesk_core::domain::customer::CustomerId;
use supportdesk_core::domain::ticket::{NewTicket, Ticket, TicketId};
use supportdesk_core::lookup::Lookup;

use super::{RepositoryError, TicketRepository};
use crate::DbPool;

pub struct SqlTicketRepository {
    pool: DbPool,
}

impl SqlTicketRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn row_to_ticket(row: &sqlx::sqlite::SqliteRow) -> Result<Ticket, RepositoryError> {
    let id: i64 = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let customer_id: i64 =
        row.try_get("customer_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let question: String =
        row.try_get("question").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let answer: String =
        row.try_get("answer").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let category: String =
        row.try_get("category").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(Ticket { id: TicketId(id), customer_id: CustomerId(customer_id), question, answer, category })
}

#[async_trait::async_trait]
impl TicketRepository for SqlTicketRepository {
    async fn save(&self, ticket: NewTicket) -> Result<Ticket, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO tickets (customer_id, question, answer, category) VALUES (?, ?, ?, ?)",
        )
        .bind(ticket.customer_id().0)
        .bind(ticket.question())
        .bind(ticket.answer())
        .bind(ticket.category())
        .execute(&self.pool)
        .await?;

        Ok(ticket.into_ticket(TicketId(result.last_insert_rowid())))
    }

    async fn search_by_question_substring(
        &self,
        text: &str,
    ) -> Result<Lookup<Ticket>, RepositoryError> {
        // SQLite's lower() and LIKE only fold ASCII, so matching happens here.
        for ticket in self.list().await? {
            if ticket.question_contains(text) {
                return Ok(Lookup::Found(ticket));
            }
        }
        Ok(Lookup::NotFound)
    }

    async fn list(&self) -> Result<Vec<Ticket>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT id, customer_id, question, answer, category FROM tickets ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_ticket).collect::<Result<Vec<_>, _>>()
    }
}
