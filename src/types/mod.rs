//! Shared data structures for the ticket lifecycle engine
//!
//! This module defines the core types used across the crate:
//! - Ticket, TicketUpdate and their enums (owned by the ticket store)
//! - Reference data returned by the external directories (customers, orders,
//!   teams, agents), which the engine only reads

mod ticket;
mod reference;

pub use ticket::*;
pub use reference::*;
