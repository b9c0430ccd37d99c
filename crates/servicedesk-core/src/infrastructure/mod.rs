//! Infrastructure layer
//!
//! Concrete adapters for the outbound ports.

pub mod clock;
pub mod persistence;

pub use clock::{FixedClock, SystemClock};
pub use persistence::{
    InMemoryCategoryRepository, InMemoryTeamRepository, InMemoryTicketRepository, NoOpEventPublisher,
    RecordingEventPublisher,
};
