use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::customer::CustomerId;
use crate::errors::DomainError;

pub const MAX_CATEGORY_LEN: usize = 50;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TicketId(pub i64);

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A stored support question and the answer given for it.
///
/// Tickets are append-only: the id is assigned by the store on insert and the
/// row is never updated or deleted afterwards.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub customer_id: CustomerId,
    pub question: String,
    pub answer: String,
    pub category: String,
}

impl Ticket {
    /// Substring match on the question, ignoring case for any script.
    pub fn question_contains(&self, text: &str) -> bool {
        self.question.to_lowercase().contains(&text.to_lowercase())
    }
}

/// Validated input for a ticket insert. Construction is the only place the
/// required-field rules are checked.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewTicket {
    customer_id: CustomerId,
    question: String,
    answer: String,
    category: String,
}

impl NewTicket {
    pub fn new(
        customer_id: CustomerId,
        question: impl Into<String>,
        answer: impl Into<String>,
        category: impl Into<String>,
    ) -> Result<Self, DomainError> {
        let question = required("question", question.into())?;
        let answer = required("answer", answer.into())?;
        let category = required("category", category.into())?;

        if category.chars().count() > MAX_CATEGORY_LEN {
            return Err(DomainError::InvalidTicket(format!(
                "category must be at most {MAX_CATEGORY_LEN} characters"
            )));
        }

        Ok(Self { customer_id, question, answer, category })
    }

    pub fn customer_id(&self) -> CustomerId {
        self.customer_id
    }

    pub fn question(&self) -> &str {
        &self.question
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn into_ticket(self, id: TicketId) -> Ticket {
        Ticket {
            id,
            customer_id: self.customer_id,
            question: self.question,
            answer: self.answer,
            category: self.category,
        }
    }
}

fn required(field: &str, value: String) -> Result<String, DomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(DomainError::InvalidTicket(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{NewTicket, TicketId, MAX_CATEGORY_LEN};
    use crate::domain::customer::CustomerId;
    use crate::errors::DomainError;

    #[test]
    fn new_ticket_trims_and_keeps_fields() {
        let ticket = NewTicket::new(CustomerId(7), "  Where is my invoice? ", "Billing tab", "billing")
            .expect("valid ticket");

        assert_eq!(ticket.question(), "Where is my invoice?");
        let stored = ticket.into_ticket(TicketId(3));
        assert_eq!(stored.id, TicketId(3));
        assert_eq!(stored.customer_id, CustomerId(7));
        assert_eq!(stored.category, "billing");
    }

    #[test]
    fn blank_answer_is_rejected() {
        let error = NewTicket::new(CustomerId(1), "question", "   ", "general")
            .expect_err("blank answer must fail");

        assert_eq!(error, DomainError::InvalidTicket("answer is required".to_string()));
    }

    #[test]
    fn overlong_category_is_rejected() {
        let category = "x".repeat(MAX_CATEGORY_LEN + 1);
        let result = NewTicket::new(CustomerId(1), "question", "answer", category);

        assert!(matches!(result, Err(DomainError::InvalidTicket(message)) if message.contains("category")));
    }

    #[test]
    fn question_match_folds_non_ascii_case() {
        let ticket = NewTicket::new(CustomerId(4), "ÉTAT du compte bloqué", "Contact support.", "account")
            .expect("valid ticket")
            .into_ticket(TicketId(1));

        assert!(ticket.question_contains("état"));
        assert!(ticket.question_contains("COMPTE BLOQUÉ"));
        assert!(!ticket.question_contains("facture"));
    }
}
