pub mod conversation;
pub mod customer;
pub mod ticket;
