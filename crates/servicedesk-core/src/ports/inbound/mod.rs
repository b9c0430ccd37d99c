//! Inbound ports (Use case traits)
//!
//! Hexagonal architecture: application service interfaces. Every mutating
//! operation names its actor explicitly; there is no ambient current user.

use async_trait::async_trait;

use crate::application::dto::*;
use crate::domain::aggregates::{AttachmentDraft, Comment, Team, TeamRole, Ticket};
use crate::domain::services::{AgentPerformance, TicketAnalytics};
use crate::domain::value_objects::{ActorId, Category, TicketId, TicketStatus};

pub use crate::error::{DeskError, DeskResult};

/// Ticket lifecycle use cases
#[async_trait]
pub trait TicketUseCases: Send + Sync {
    /// Open a ticket in `new` with SLA deadlines computed from its priority
    async fn create_ticket(&self, command: CreateTicketCommand) -> DeskResult<Ticket>;

    /// Get ticket by ID, breach flag evaluated now
    async fn get_ticket(&self, id: &TicketId) -> DeskResult<Ticket>;

    /// Filtered, paginated list, newest first
    async fn list_tickets(&self, filter: &TicketFilter, page: PageRequest) -> DeskResult<Page<Ticket>>;

    /// Move a ticket to a new status
    async fn transition_status(
        &self,
        id: &TicketId,
        new_status: TicketStatus,
        actor: &ActorId,
        comment: Option<String>,
    ) -> DeskResult<Ticket>;

    /// Append a comment
    async fn add_comment(
        &self,
        id: &TicketId,
        author: &ActorId,
        content: String,
        is_internal: bool,
    ) -> DeskResult<Comment>;

    /// Record the requester's rating of a resolved or closed ticket
    async fn submit_satisfaction(&self, id: &TicketId, rating: u8, comment: Option<String>) -> DeskResult<()>;

    /// Hand the ticket to an agent
    async fn assign_ticket(&self, id: &TicketId, assignee: &ActorId, actor: &ActorId) -> DeskResult<Ticket>;

    /// Hand the ticket to a team
    async fn assign_team(&self, id: &TicketId, team_id: &str, actor: &ActorId) -> DeskResult<Ticket>;

    /// Replace the category snapshot
    async fn change_category(&self, id: &TicketId, category_id: &str, actor: &ActorId) -> DeskResult<Ticket>;

    /// Append an attachment record
    async fn add_attachment(&self, id: &TicketId, draft: AttachmentDraft, uploader: &ActorId) -> DeskResult<Ticket>;

    /// Category catalog
    async fn list_categories(&self) -> DeskResult<Vec<Category>>;

    /// Remove an unreferenced category
    async fn delete_category(&self, category_id: &str) -> DeskResult<()>;

    /// Dashboard summary over all tickets
    async fn ticket_analytics(&self) -> DeskResult<TicketAnalytics>;

    /// Per-agent workload and outcomes
    async fn agent_performance(&self) -> DeskResult<Vec<AgentPerformance>>;
}

/// Team management use cases
#[async_trait]
pub trait TeamUseCases: Send + Sync {
    async fn create_team(&self, name: String, description: Option<String>) -> DeskResult<Team>;
    async fn get_team(&self, id: &str) -> DeskResult<Team>;
    async fn list_teams(&self) -> DeskResult<Vec<Team>>;
    async fn add_member(&self, team_id: &str, user_id: &ActorId, role: TeamRole) -> DeskResult<Team>;
    async fn remove_member(&self, team_id: &str, user_id: &ActorId) -> DeskResult<Team>;
    async fn change_member_role(&self, team_id: &str, user_id: &ActorId, role: TeamRole) -> DeskResult<Team>;
}
