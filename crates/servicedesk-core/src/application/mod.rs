//! Application layer
//!
//! Orchestrates use cases and coordinates domain objects.

pub mod commands;
pub mod dto;
pub mod locks;
pub mod store;

pub use commands::{TeamService, TicketService};
pub use dto::*;
pub use locks::{KeyGuard, KeyedLocks, TeamLocks, TicketLocks};
pub use store::{Pagination, TicketStore};
