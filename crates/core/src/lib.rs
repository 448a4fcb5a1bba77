pub mod config;
pub mod domain;
pub mod dummy;
pub mod errors;
pub mod lookup;

pub use domain::conversation::{ChatHistory, ChatRole, Conversation, ConversationId};
pub use domain::customer::CustomerId;
pub use domain::ticket::{NewTicket, Ticket, TicketId};
pub use dummy::{CustomerIdPolicy, DummyDataset, DummyStatus, DummyTicket};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use lookup::Lookup;
