//! Aggregates module

pub mod ticket;
pub mod team;

pub use ticket::{
    Attachment, AttachmentDraft, Comment, Satisfaction, StatusChange, Ticket, TicketDraft, TicketError,
};
pub use team::{Team, TeamError, TeamMember, TeamRole};
