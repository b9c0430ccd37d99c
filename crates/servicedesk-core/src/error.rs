//! Error types for the service desk core

use thiserror::Error;

use crate::domain::aggregates::{TeamError, TicketError};
use crate::domain::services::SlaError;
use crate::domain::value_objects::TicketStatus;
use crate::ports::outbound::RepositoryError;

/// Error returned by every use case
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeskError {
    /// Referenced ticket, category, team or SLA record is absent
    #[error("not found: {0}")]
    NotFound(String),

    /// Source status is terminal or the move is not in the transition table
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },

    /// Requested status equals the current one
    #[error("no-op transition: ticket is already {0}")]
    NoOpTransition(TicketStatus),

    /// Operation not allowed in the ticket's current state
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// Missing or inconsistent SLA configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Malformed caller input
    #[error("validation error: {0}")]
    Validation(String),

    /// Category still referenced by tickets
    #[error("category {0} is referenced by existing tickets")]
    CategoryInUse(String),

    /// Storage failure
    #[error("repository error: {0}")]
    Repository(String),
}

/// Result type for the service desk core
pub type DeskResult<T> = Result<T, DeskError>;

impl From<TicketError> for DeskError {
    fn from(err: TicketError) -> Self {
        match err {
            TicketError::InvalidTransition { from, to } => Self::InvalidTransition { from, to },
            TicketError::NoOpTransition(status) => Self::NoOpTransition(status),
            TicketError::InvalidState(msg) => Self::InvalidState(msg),
            TicketError::InvalidRating(_) | TicketError::EmptyComment => Self::Validation(err.to_string()),
        }
    }
}

impl From<SlaError> for DeskError {
    fn from(err: SlaError) -> Self {
        Self::Configuration(err.to_string())
    }
}

impl From<TeamError> for DeskError {
    fn from(err: TeamError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<RepositoryError> for DeskError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound(what) => Self::NotFound(what),
            other => Self::Repository(other.to_string()),
        }
    }
}
