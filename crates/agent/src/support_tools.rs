//! The six support tools the model can call: two backed by the ticket store
//! and four read-only queries over the demo dataset.
//!
//! Every tool answers with a short human-readable string. Structured
//! results stay structured until the `render_*` functions here.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use supportdesk_core::{
    CustomerId, CustomerIdPolicy, DummyDataset, DummyTicket, Lookup, NewTicket, Ticket,
};
use supportdesk_db::TicketRepository;
use tracing::info;

use crate::tools::{lenient_i64, parse_arguments, Tool, ToolError, ToolRegistry};

pub const SAVE_TICKET: &str = "save_ticket";
pub const SEARCH_TICKET: &str = "search_ticket";
pub const SEARCH_DUMMY_BY_STATUS: &str = "search_dummy_by_status";
pub const SEARCH_DUMMY_BY_CUSTOMER: &str = "search_dummy_by_customer";
pub const SEARCH_DUMMY_BY_CUSTOMER_ID: &str = "search_dummy_by_customer_id";
pub const SEARCH_DUMMY_BY_TICKET_ID: &str = "search_dummy_by_ticket_id";

/// Registry holding all six support tools.
pub fn support_registry(
    tickets: Arc<dyn TicketRepository>,
    dataset: DummyDataset,
    customer_id_policy: CustomerIdPolicy,
) -> ToolRegistry {
    let mut registry = ToolRegistry::default();
    registry.register(SaveTicketTool::new(tickets.clone()));
    registry.register(SearchTicketTool::new(tickets));
    registry.register(SearchDummyByStatusTool::new(dataset));
    registry.register(SearchDummyByCustomerTool::new(dataset));
    registry.register(SearchDummyByCustomerIdTool::new(dataset, customer_id_policy));
    registry.register(SearchDummyByTicketIdTool::new(dataset));
    registry
}

pub fn render_saved(ticket: &Ticket) -> String {
    format!("Ticket saved with ID {}", ticket.id)
}

pub fn render_search(result: &Lookup<Ticket>) -> String {
    match result {
        Lookup::Found(ticket) => format!("Found: {}", ticket.answer),
        Lookup::NotFound => "No similar ticket found.".to_string(),
    }
}

pub fn render_dummy_line(ticket: &DummyTicket) -> String {
    format!(
        "{} (ID:{}): {} -> {} [{}]",
        ticket.customer_name, ticket.customer_id, ticket.question, ticket.answer, ticket.status
    )
}

pub fn render_dummy_detail(ticket: &DummyTicket) -> String {
    format!(
        "Ticket #{} - {} (CID: {}) | {} -> {} [{}]",
        ticket.id,
        ticket.customer_name,
        ticket.customer_id,
        ticket.question,
        ticket.answer,
        ticket.status
    )
}

fn render_dummy_list(tickets: &[&DummyTicket], empty: impl FnOnce() -> String) -> String {
    if tickets.is_empty() {
        return empty();
    }
    tickets.iter().map(|ticket| render_dummy_line(ticket)).collect::<Vec<_>>().join("\n")
}

pub struct SaveTicketTool {
    tickets: Arc<dyn TicketRepository>,
}

impl SaveTicketTool {
    pub fn new(tickets: Arc<dyn TicketRepository>) -> Self {
        Self { tickets }
    }
}

#[derive(Debug, Deserialize)]
struct SaveTicketArgs {
    #[serde(deserialize_with = "lenient_i64")]
    customer_id: i64,
    question: String,
    answer: String,
    category: String,
}

#[async_trait]
impl Tool for SaveTicketTool {
    fn name(&self) -> &'static str {
        SAVE_TICKET
    }

    fn description(&self) -> &'static str {
        "Save a new support ticket (question, answer and category) for a customer in the ticket database."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "customer_id": {"type": "integer", "description": "Numeric customer id"},
                "question": {"type": "string", "description": "The customer's question"},
                "answer": {"type": "string", "description": "The answer given to the customer"},
                "category": {"type": "string", "description": "Short category label, at most 50 characters"}
            },
            "required": ["customer_id", "question", "answer", "category"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String, ToolError> {
        let args: SaveTicketArgs = parse_arguments(input)?;
        let ticket = NewTicket::new(CustomerId(args.customer_id), args.question, args.answer, args.category)?;
        let saved = self.tickets.save(ticket).await?;

        info!(
            event_name = "agent.tool.ticket_saved",
            ticket_id = saved.id.0,
            customer_id = saved.customer_id.0,
            "ticket saved"
        );
        Ok(render_saved(&saved))
    }
}

pub struct SearchTicketTool {
    tickets: Arc<dyn TicketRepository>,
}

impl SearchTicketTool {
    pub fn new(tickets: Arc<dyn TicketRepository>) -> Self {
        Self { tickets }
    }
}

#[derive(Debug, Deserialize)]
struct SearchTicketArgs {
    question: String,
}

#[async_trait]
impl Tool for SearchTicketTool {
    fn name(&self) -> &'static str {
        SEARCH_TICKET
    }

    fn description(&self) -> &'static str {
        "Search saved tickets whose question contains the given text (case-insensitive) and return the stored answer."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "question": {"type": "string", "description": "Text to look for inside stored questions"}
            },
            "required": ["question"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String, ToolError> {
        let args: SearchTicketArgs = parse_arguments(input)?;
        let text = args.question.trim();
        if text.is_empty() {
            return Err(ToolError::InvalidArguments("question text to search for is empty".to_string()));
        }

        let result = self.tickets.search_by_question_substring(text).await?;
        Ok(render_search(&result))
    }
}

pub struct SearchDummyByStatusTool {
    dataset: DummyDataset,
}

impl SearchDummyByStatusTool {
    pub fn new(dataset: DummyDataset) -> Self {
        Self { dataset }
    }
}

#[derive(Debug, Deserialize)]
struct StatusArgs {
    status: String,
}

#[async_trait]
impl Tool for SearchDummyByStatusTool {
    fn name(&self) -> &'static str {
        SEARCH_DUMMY_BY_STATUS
    }

    fn description(&self) -> &'static str {
        "Search demo tickets by status (resolved, pending, confirmed)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "status": {"type": "string", "enum": ["resolved", "pending", "confirmed"]}
            },
            "required": ["status"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String, ToolError> {
        let args: StatusArgs = parse_arguments(input)?;
        let found = self.dataset.by_status(&args.status);
        Ok(render_dummy_list(&found, || format!("No tickets with status {}.", args.status)))
    }
}

pub struct SearchDummyByCustomerTool {
    dataset: DummyDataset,
}

impl SearchDummyByCustomerTool {
    pub fn new(dataset: DummyDataset) -> Self {
        Self { dataset }
    }
}

#[derive(Debug, Deserialize)]
struct CustomerNameArgs {
    name: String,
}

#[async_trait]
impl Tool for SearchDummyByCustomerTool {
    fn name(&self) -> &'static str {
        SEARCH_DUMMY_BY_CUSTOMER
    }

    fn description(&self) -> &'static str {
        "Search demo tickets by customer name (e.g. Ali Khan)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "name": {"type": "string", "description": "Full customer name"}
            },
            "required": ["name"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String, ToolError> {
        let args: CustomerNameArgs = parse_arguments(input)?;
        let found = self.dataset.by_customer_name(&args.name);
        Ok(render_dummy_list(&found, || format!("No tickets for {}.", args.name)))
    }
}

pub struct SearchDummyByCustomerIdTool {
    dataset: DummyDataset,
    policy: CustomerIdPolicy,
}

impl SearchDummyByCustomerIdTool {
    pub fn new(dataset: DummyDataset, policy: CustomerIdPolicy) -> Self {
        Self { dataset, policy }
    }
}

#[derive(Debug, Deserialize)]
struct CustomerIdArgs {
    #[serde(deserialize_with = "lenient_i64")]
    customer_id: i64,
}

#[async_trait]
impl Tool for SearchDummyByCustomerIdTool {
    fn name(&self) -> &'static str {
        SEARCH_DUMMY_BY_CUSTOMER_ID
    }

    fn description(&self) -> &'static str {
        "Search demo tickets by numeric customer ID (e.g. 101)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "customer_id": {"type": "integer"}
            },
            "required": ["customer_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String, ToolError> {
        let args: CustomerIdArgs = parse_arguments(input)?;
        let found = self.dataset.by_customer_id(CustomerId(args.customer_id), self.policy);
        Ok(render_dummy_list(&found, || format!("No tickets for customer ID {}.", args.customer_id)))
    }
}

pub struct SearchDummyByTicketIdTool {
    dataset: DummyDataset,
}

impl SearchDummyByTicketIdTool {
    pub fn new(dataset: DummyDataset) -> Self {
        Self { dataset }
    }
}

#[derive(Debug, Deserialize)]
struct TicketIdArgs {
    #[serde(deserialize_with = "lenient_i64")]
    ticket_id: i64,
}

#[async_trait]
impl Tool for SearchDummyByTicketIdTool {
    fn name(&self) -> &'static str {
        SEARCH_DUMMY_BY_TICKET_ID
    }

    fn description(&self) -> &'static str {
        "Look up a single demo ticket by its ticket ID (1-10)."
    }

    fn parameters(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticket_id": {"type": "integer"}
            },
            "required": ["ticket_id"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String, ToolError> {
        let args: TicketIdArgs = parse_arguments(input)?;
        let found = u32::try_from(args.ticket_id)
            .map(|id| self.dataset.by_ticket_id(id))
            .unwrap_or(Lookup::NotFound);

        Ok(match found {
            Lookup::Found(ticket) => render_dummy_detail(ticket),
            Lookup::NotFound => format!("No ticket with ID {}.", args.ticket_id),
        })
    }
}
