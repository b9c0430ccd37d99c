//! Domain Events
//!
//! Raised by aggregates, drained by the application layer after a successful
//! save and handed to the `EventPublisher` (notifications, audit feeds).

use chrono::{DateTime, Utc};

use crate::domain::aggregates::team::TeamRole;
use crate::domain::value_objects::{ActorId, Priority, TicketId, TicketStatus};

#[derive(Clone, Debug)]
pub enum DomainEvent {
    Ticket(TicketEvent),
    Team(TeamEvent),
}

#[derive(Clone, Debug)]
pub enum TicketEvent {
    Created {
        ticket_id: TicketId,
        priority: Priority,
        requester_id: ActorId,
        created_at: DateTime<Utc>,
    },

    StatusChanged {
        ticket_id: TicketId,
        from: TicketStatus,
        to: TicketStatus,
        changed_by: ActorId,
        changed_at: DateTime<Utc>,
    },

    CommentAdded {
        ticket_id: TicketId,
        comment_id: String,
        is_internal: bool,
    },

    AttachmentAdded {
        ticket_id: TicketId,
        attachment_id: String,
    },

    Assigned {
        ticket_id: TicketId,
        assignee_id: ActorId,
        assigned_by: ActorId,
    },

    TeamAssigned {
        ticket_id: TicketId,
        team_id: String,
        assigned_by: ActorId,
    },

    CategoryChanged {
        ticket_id: TicketId,
        from: String,
        to: String,
        changed_by: ActorId,
    },

    Rated {
        ticket_id: TicketId,
        rating: u8,
    },

    SlaBreached {
        ticket_id: TicketId,
        deadline: DateTime<Utc>,
    },
}

#[derive(Clone, Debug)]
pub enum TeamEvent {
    Created { team_id: String, name: String },
    MemberAdded { team_id: String, user_id: ActorId, role: TeamRole },
    MemberRemoved { team_id: String, user_id: ActorId },
    RoleChanged { team_id: String, user_id: ActorId, role: TeamRole },
}

impl DomainEvent {
    /// Id of the aggregate that raised the event
    pub fn aggregate_id(&self) -> &str {
        match self {
            DomainEvent::Ticket(e) => match e {
                TicketEvent::Created { ticket_id, .. }
                | TicketEvent::StatusChanged { ticket_id, .. }
                | TicketEvent::CommentAdded { ticket_id, .. }
                | TicketEvent::AttachmentAdded { ticket_id, .. }
                | TicketEvent::Assigned { ticket_id, .. }
                | TicketEvent::TeamAssigned { ticket_id, .. }
                | TicketEvent::CategoryChanged { ticket_id, .. }
                | TicketEvent::Rated { ticket_id, .. }
                | TicketEvent::SlaBreached { ticket_id, .. } => ticket_id.as_str(),
            },
            DomainEvent::Team(e) => match e {
                TeamEvent::Created { team_id, .. }
                | TeamEvent::MemberAdded { team_id, .. }
                | TeamEvent::MemberRemoved { team_id, .. }
                | TeamEvent::RoleChanged { team_id, .. } => team_id,
            },
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            DomainEvent::Ticket(e) => match e {
                TicketEvent::Created { .. } => "ticket.created",
                TicketEvent::StatusChanged { .. } => "ticket.status_changed",
                TicketEvent::CommentAdded { .. } => "ticket.comment_added",
                TicketEvent::AttachmentAdded { .. } => "ticket.attachment_added",
                TicketEvent::Assigned { .. } => "ticket.assigned",
                TicketEvent::TeamAssigned { .. } => "ticket.team_assigned",
                TicketEvent::CategoryChanged { .. } => "ticket.category_changed",
                TicketEvent::Rated { .. } => "ticket.rated",
                TicketEvent::SlaBreached { .. } => "ticket.sla_breached",
            },
            DomainEvent::Team(e) => match e {
                TeamEvent::Created { .. } => "team.created",
                TeamEvent::MemberAdded { .. } => "team.member_added",
                TeamEvent::MemberRemoved { .. } => "team.member_removed",
                TeamEvent::RoleChanged { .. } => "team.role_changed",
            },
        }
    }
}
