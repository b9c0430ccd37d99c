//! Ticket Aggregate
//!
//! A ticket owns its comments, status history and attachments; all of them
//! are append-only and only change through the methods below.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::events::{DomainEvent, TicketEvent};
use crate::domain::services::lifecycle::ResolvedAtPolicy;
use crate::domain::services::sla::{is_breached, SlaDeadlines};
use crate::domain::value_objects::{
    generate_id, ActorId, CategorySnapshot, Channel, Priority, TicketId, TicketStatus,
};

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;

/// Ticket aggregate root
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Ticket {
    id: TicketId,
    title: String,
    description: String,
    status: TicketStatus,
    priority: Priority,
    category: CategorySnapshot,
    #[serde(default)]
    channel: Channel,
    requester_id: ActorId,
    #[serde(default)]
    assignee_id: Option<ActorId>,
    #[serde(default)]
    team_id: Option<String>,
    #[serde(default)]
    attachments: Vec<Attachment>,
    #[serde(default)]
    comments: Vec<Comment>,
    #[serde(default)]
    status_history: Vec<StatusChange>,
    sla: SlaDeadlines,
    #[serde(default)]
    sla_breached: bool,
    #[serde(default)]
    satisfaction: Option<Satisfaction>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default)]
    resolved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    closed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

/// Caller-supplied part of a new ticket.
#[derive(Clone, Debug)]
pub struct TicketDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub category: CategorySnapshot,
    pub channel: Channel,
    pub requester_id: ActorId,
}

impl Ticket {
    /// Create a ticket in `new` with empty logs.
    pub fn create(id: TicketId, draft: TicketDraft, sla: SlaDeadlines, now: DateTime<Utc>) -> Self {
        let mut ticket = Self {
            id: id.clone(),
            title: draft.title,
            description: draft.description,
            status: TicketStatus::New,
            priority: draft.priority,
            category: draft.category,
            channel: draft.channel,
            requester_id: draft.requester_id.clone(),
            assignee_id: None,
            team_id: None,
            attachments: vec![],
            comments: vec![],
            status_history: vec![],
            sla,
            sla_breached: false,
            satisfaction: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
            closed_at: None,
            events: vec![],
        };

        ticket.raise_event(DomainEvent::Ticket(TicketEvent::Created {
            ticket_id: id,
            priority: draft.priority,
            requester_id: draft.requester_id,
            created_at: now,
        }));

        ticket
    }

    // =========================================================================
    // Getters
    // =========================================================================

    pub fn id(&self) -> &TicketId { &self.id }
    pub fn title(&self) -> &str { &self.title }
    pub fn description(&self) -> &str { &self.description }
    pub fn status(&self) -> TicketStatus { self.status }
    pub fn priority(&self) -> Priority { self.priority }
    pub fn category(&self) -> &CategorySnapshot { &self.category }
    pub fn channel(&self) -> Channel { self.channel }
    pub fn requester_id(&self) -> &ActorId { &self.requester_id }
    pub fn assignee_id(&self) -> Option<&ActorId> { self.assignee_id.as_ref() }
    pub fn team_id(&self) -> Option<&str> { self.team_id.as_deref() }
    pub fn attachments(&self) -> &[Attachment] { &self.attachments }
    pub fn comments(&self) -> &[Comment] { &self.comments }
    pub fn status_history(&self) -> &[StatusChange] { &self.status_history }
    pub fn sla_deadlines(&self) -> &SlaDeadlines { &self.sla }
    pub fn sla_response_deadline(&self) -> DateTime<Utc> { self.sla.response }
    pub fn sla_resolution_deadline(&self) -> DateTime<Utc> { self.sla.resolution }
    pub fn sla_breached(&self) -> bool { self.sla_breached }
    pub fn satisfaction(&self) -> Option<&Satisfaction> { self.satisfaction.as_ref() }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }
    pub fn resolved_at(&self) -> Option<DateTime<Utc>> { self.resolved_at }
    pub fn closed_at(&self) -> Option<DateTime<Utc>> { self.closed_at }
    pub fn is_terminal(&self) -> bool { self.status.is_terminal() }

    /// Comments visible to the requester.
    pub fn public_comments(&self) -> impl Iterator<Item = &Comment> {
        self.comments.iter().filter(|c| !c.is_internal)
    }

    // =========================================================================
    // Business Operations
    // =========================================================================

    /// Apply an already-validated transition. Only the lifecycle engine calls
    /// this; see `LifecycleEngine::apply_transition`.
    pub(crate) fn record_transition(
        &mut self,
        to: TicketStatus,
        actor: ActorId,
        comment: Option<String>,
        now: DateTime<Utc>,
        resolved_at_policy: ResolvedAtPolicy,
    ) -> StatusChange {
        let from = self.status;
        let change = StatusChange {
            id: generate_id("sh"),
            ticket_id: self.id.clone(),
            previous_status: from,
            new_status: to,
            changed_by: actor.clone(),
            changed_at: now,
            comment,
        };

        self.status_history.push(change.clone());
        self.status = to;
        self.touch(now);

        match to {
            TicketStatus::Resolved => {
                if self.resolved_at.is_none() || resolved_at_policy == ResolvedAtPolicy::OverwriteOnReenter {
                    self.resolved_at = Some(now);
                }
            }
            TicketStatus::Closed if self.closed_at.is_none() => {
                self.closed_at = Some(now);
            }
            _ => {}
        }

        let was_breached = self.sla_breached;
        self.refresh_sla(now);

        self.raise_event(DomainEvent::Ticket(TicketEvent::StatusChanged {
            ticket_id: self.id.clone(),
            from,
            to,
            changed_by: actor,
            changed_at: now,
        }));

        if self.sla_breached && !was_breached {
            self.raise_event(DomainEvent::Ticket(TicketEvent::SlaBreached {
                ticket_id: self.id.clone(),
                deadline: self.sla.resolution,
            }));
        }

        change
    }

    /// Append a comment. Never changes the status.
    pub fn add_comment(
        &mut self,
        author_id: ActorId,
        content: impl Into<String>,
        is_internal: bool,
        now: DateTime<Utc>,
    ) -> Result<Comment, TicketError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(TicketError::EmptyComment);
        }

        let comment = Comment {
            id: generate_id("cmt"),
            ticket_id: self.id.clone(),
            author_id,
            content,
            is_internal,
            created_at: now,
        };

        self.comments.push(comment.clone());
        self.touch(now);

        self.raise_event(DomainEvent::Ticket(TicketEvent::CommentAdded {
            ticket_id: self.id.clone(),
            comment_id: comment.id.clone(),
            is_internal,
        }));

        Ok(comment)
    }

    pub fn add_attachment(&mut self, draft: AttachmentDraft, uploaded_by: ActorId, now: DateTime<Utc>) -> Attachment {
        let attachment = Attachment {
            id: generate_id("att"),
            filename: draft.filename,
            url: draft.url,
            file_size: draft.file_size,
            mime_type: draft.mime_type,
            uploaded_at: now,
            uploaded_by: Some(uploaded_by),
        };

        self.attachments.push(attachment.clone());
        self.touch(now);

        self.raise_event(DomainEvent::Ticket(TicketEvent::AttachmentAdded {
            ticket_id: self.id.clone(),
            attachment_id: attachment.id.clone(),
        }));

        attachment
    }

    /// Hand the ticket to an agent. Status is left alone.
    pub fn assign(&mut self, assignee_id: ActorId, assigned_by: ActorId, now: DateTime<Utc>) -> Result<(), TicketError> {
        self.ensure_not_terminal("assign")?;

        self.assignee_id = Some(assignee_id.clone());
        self.touch(now);

        self.raise_event(DomainEvent::Ticket(TicketEvent::Assigned {
            ticket_id: self.id.clone(),
            assignee_id,
            assigned_by,
        }));

        Ok(())
    }

    pub fn assign_team(&mut self, team_id: impl Into<String>, assigned_by: ActorId, now: DateTime<Utc>) -> Result<(), TicketError> {
        self.ensure_not_terminal("assign a team to")?;

        let team_id = team_id.into();
        self.team_id = Some(team_id.clone());
        self.touch(now);

        self.raise_event(DomainEvent::Ticket(TicketEvent::TeamAssigned {
            ticket_id: self.id.clone(),
            team_id,
            assigned_by,
        }));

        Ok(())
    }

    pub fn change_category(&mut self, category: CategorySnapshot, changed_by: ActorId, now: DateTime<Utc>) -> Result<(), TicketError> {
        self.ensure_not_terminal("recategorize")?;

        let previous = std::mem::replace(&mut self.category, category);
        self.touch(now);

        self.raise_event(DomainEvent::Ticket(TicketEvent::CategoryChanged {
            ticket_id: self.id.clone(),
            from: previous.id,
            to: self.category.id.clone(),
            changed_by,
        }));

        Ok(())
    }

    /// Record the requester's rating. Allowed once, in `resolved`/`closed`.
    pub fn submit_satisfaction(&mut self, rating: u8, comment: Option<String>, now: DateTime<Utc>) -> Result<(), TicketError> {
        if !self.status.is_resolved() {
            return Err(TicketError::InvalidState(format!(
                "ticket {} is {}, only resolved or closed tickets can be rated",
                self.id, self.status
            )));
        }
        if self.satisfaction.is_some() {
            return Err(TicketError::InvalidState(format!("ticket {} was already rated", self.id)));
        }
        if !(MIN_RATING..=MAX_RATING).contains(&rating) {
            return Err(TicketError::InvalidRating(rating));
        }

        self.satisfaction = Some(Satisfaction { rating, comment, rated_at: now });
        self.touch(now);

        self.raise_event(DomainEvent::Ticket(TicketEvent::Rated {
            ticket_id: self.id.clone(),
            rating,
        }));

        Ok(())
    }

    /// Recompute the breach flag. The reference time is `resolved_at`, else
    /// `closed_at`, else `now`.
    pub fn refresh_sla(&mut self, now: DateTime<Utc>) -> bool {
        self.sla_breached = is_breached(self.sla.resolution, self.sla_reference_time(now));
        self.sla_breached
    }

    pub fn sla_reference_time(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        self.resolved_at.or(self.closed_at).unwrap_or(now)
    }

    /// True when every history entry starts where the previous one ended and
    /// the last one ends at the current status.
    pub fn history_is_consistent(&self) -> bool {
        let mut expected = TicketStatus::New;
        for change in &self.status_history {
            if change.previous_status != expected {
                return false;
            }
            expected = change.new_status;
        }
        expected == self.status
    }

    // =========================================================================
    // Private
    // =========================================================================

    fn ensure_not_terminal(&self, action: &str) -> Result<(), TicketError> {
        if self.status.is_terminal() {
            return Err(TicketError::InvalidState(format!(
                "cannot {} ticket {} in terminal status {}",
                action, self.id, self.status
            )));
        }
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> {
        std::mem::take(&mut self.events)
    }

    fn raise_event(&mut self, event: DomainEvent) {
        self.events.push(event);
    }

    fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now;
    }
}

// =============================================================================
// Supporting Types
// =============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub ticket_id: TicketId,
    pub author_id: ActorId,
    pub content: String,
    pub is_internal: bool,
    pub created_at: DateTime<Utc>,
}

/// One entry of the status history chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChange {
    pub id: String,
    pub ticket_id: TicketId,
    pub previous_status: TicketStatus,
    pub new_status: TicketStatus,
    pub changed_by: ActorId,
    pub changed_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub filename: String,
    pub url: String,
    pub file_size: u64,
    pub mime_type: String,
    pub uploaded_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_by: Option<ActorId>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentDraft {
    pub filename: String,
    pub url: String,
    pub file_size: u64,
    pub mime_type: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Satisfaction {
    pub rating: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub rated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TicketError {
    #[error("cannot move ticket from {from} to {to}")]
    InvalidTransition { from: TicketStatus, to: TicketStatus },

    #[error("ticket is already {0}")]
    NoOpTransition(TicketStatus),

    #[error("{0}")]
    InvalidState(String),

    #[error("rating {0} is outside 1..=5")]
    InvalidRating(u8),

    #[error("comment content cannot be empty")]
    EmptyComment,
}
