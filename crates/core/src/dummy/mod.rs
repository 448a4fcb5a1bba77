//! Fixed demo dataset of ten support tickets.
//!
//! The fixture is compiled into the binary, never persisted and never
//! mutated. It is independent of the ticket store so that the demo tools
//! answer the same way regardless of database state.

mod fixture;
mod policy;

use std::fmt;

use serde::Serialize;

use crate::domain::customer::CustomerId;
use crate::lookup::Lookup;

pub use policy::CustomerIdPolicy;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DummyStatus {
    Confirmed,
    Pending,
    Resolved,
}

impl DummyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Pending => "pending",
            Self::Resolved => "resolved",
        }
    }
}

impl fmt::Display for DummyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct DummyTicket {
    pub id: u32,
    pub customer_name: &'static str,
    pub customer_id: CustomerId,
    pub question: &'static str,
    pub answer: &'static str,
    pub category: &'static str,
    pub status: DummyStatus,
}

/// Read-only view over the fixture. Every query is pure and returns tickets
/// in fixture order.
#[derive(Clone, Copy, Debug)]
pub struct DummyDataset {
    tickets: &'static [DummyTicket],
}

impl Default for DummyDataset {
    fn default() -> Self {
        Self::fixture()
    }
}

impl DummyDataset {
    pub fn fixture() -> Self {
        Self { tickets: fixture::TICKETS }
    }

    pub fn all(&self) -> &'static [DummyTicket] {
        self.tickets
    }

    /// Case-insensitive exact match. Unknown statuses simply match nothing.
    pub fn by_status(&self, status: &str) -> Vec<&'static DummyTicket> {
        let wanted = status.trim();
        self.tickets.iter().filter(|ticket| ticket.status.as_str().eq_ignore_ascii_case(wanted)).collect()
    }

    pub fn by_customer_name(&self, name: &str) -> Vec<&'static DummyTicket> {
        let wanted = name.trim().to_lowercase();
        self.tickets.iter().filter(|ticket| ticket.customer_name.to_lowercase() == wanted).collect()
    }

    pub fn by_customer_id(
        &self,
        customer_id: CustomerId,
        policy: CustomerIdPolicy,
    ) -> Vec<&'static DummyTicket> {
        let wanted = policy.normalize(customer_id);
        self.tickets.iter().filter(|ticket| ticket.customer_id == wanted).collect()
    }

    pub fn by_ticket_id(&self, ticket_id: u32) -> Lookup<&'static DummyTicket> {
        self.tickets.iter().find(|ticket| ticket.id == ticket_id).into()
    }
}
