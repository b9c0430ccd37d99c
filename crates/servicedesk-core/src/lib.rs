//! OpenSASE Service Desk Core
//!
//! Ticket lifecycle, SLA tracking and ticket storage for an IT service desk,
//! following Domain-Driven Design (DDD) with a hexagonal layout.
//!
//! ## Architecture
//!
//! - **Domain Layer**: Ticket and team aggregates, value objects, domain events,
//!   lifecycle/SLA/analytics services
//! - **Application Layer**: Use case orchestration, DTOs, per-ticket locks,
//!   the client-side ticket store
//! - **Ports Layer**: Use case traits and repository/clock/publisher interfaces
//! - **Infrastructure Layer**: In-memory repositories and clocks
//!
//! ## Key Aggregates
//!
//! - **Ticket**: Status machine with an append-only history, comments,
//!   attachments, SLA deadlines and a satisfaction rating
//! - **Team**: Support group with a leader and members

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;
pub mod ports;

// Re-exports for convenience
pub use application::{
    CreateTicketCommand, Page, PageRequest, Pagination, TeamService, TicketFilter, TicketService, TicketStore,
};
pub use config::{ConfigError, DeskConfig};
pub use domain::aggregates::{
    Attachment, AttachmentDraft, Comment, Satisfaction, StatusChange, Team, TeamMember, TeamRole, Ticket,
};
pub use domain::events::{DomainEvent, TeamEvent, TicketEvent};
pub use domain::services::{
    AgentPerformance, LifecycleEngine, ResolvedAtPolicy, SlaConfig, SlaDeadlines, SlaPolicyTable, TicketAnalytics,
    TransitionPolicy,
};
pub use domain::value_objects::{ActorId, Category, CategorySnapshot, Channel, Priority, TicketId, TicketStatus};
pub use error::{DeskError, DeskResult};
pub use ports::inbound::{TeamUseCases, TicketUseCases};
pub use ports::outbound::{CategoryRepository, Clock, EventPublisher, RepositoryError, TeamRepository, TicketRepository};
