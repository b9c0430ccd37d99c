//! Outbound ports (Repository traits)
//!
//! Hexagonal architecture: these are the interfaces that infrastructure must implement.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::application::dto::{Page, PageRequest, TicketFilter};
use crate::domain::aggregates::{Team, Ticket};
use crate::domain::value_objects::{Category, TicketId};
use crate::domain::DomainEvent;

/// Ticket storage port
#[async_trait]
pub trait TicketRepository: Send + Sync {
    /// Find ticket by ID
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError>;

    /// Matching tickets, newest first, one page at a time
    async fn list(&self, filter: &TicketFilter, page: PageRequest) -> Result<Page<Ticket>, RepositoryError>;

    /// Every matching ticket, newest first
    async fn find_all(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, RepositoryError>;

    /// Store a brand-new ticket; fails with `Conflict` if the id is taken
    async fn insert(&self, ticket: &Ticket) -> Result<(), RepositoryError>;

    /// Replace an existing ticket; fails with `NotFound` if it was never inserted
    async fn update(&self, ticket: &Ticket) -> Result<(), RepositoryError>;

    /// Reserve the next id of the per-year sequence
    async fn next_id(&self, year: i32) -> Result<TicketId, RepositoryError>;

    /// Number of tickets whose category snapshot has this id
    async fn count_by_category(&self, category_id: &str) -> Result<usize, RepositoryError>;
}

/// Category catalog port
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Category>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Category>, RepositoryError>;
    async fn save(&self, category: &Category) -> Result<(), RepositoryError>;
    async fn delete(&self, id: &str) -> Result<(), RepositoryError>;
}

/// Team storage port
#[async_trait]
pub trait TeamRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<Team>, RepositoryError>;
    async fn list(&self) -> Result<Vec<Team>, RepositoryError>;
    async fn save(&self, team: &Team) -> Result<(), RepositoryError>;
}

/// Event publisher port
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish domain events
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError>;
}

/// Time source. Injected so deadlines and breach checks are testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Repository error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("storage error: {0}")]
    Storage(String),
}
