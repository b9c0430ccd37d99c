//! Command handlers
//!
//! Application services that orchestrate use cases. Every write to a ticket
//! runs load, apply, save under that ticket's lock. Category deletion takes
//! the catalog lock exclusively; anything that attaches a category to a
//! ticket holds it shared.

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::application::dto::*;
use crate::application::locks::{TeamLocks, TicketLocks};
use crate::config::{ConfigError, DeskConfig};
use crate::domain::aggregates::{AttachmentDraft, Comment, Team, TeamRole, Ticket, TicketDraft};
use crate::domain::services::{AgentPerformance, AnalyticsService, LifecycleEngine, SlaPolicyTable, TicketAnalytics};
use crate::domain::value_objects::{generate_id, ActorId, Category, TicketId, TicketStatus, FALLBACK_CATEGORY_ID};
use crate::domain::DomainEvent;
use crate::error::{DeskError, DeskResult};
use crate::ports::inbound::{TeamUseCases, TicketUseCases};
use crate::ports::outbound::{CategoryRepository, Clock, EventPublisher, TeamRepository, TicketRepository};

const DEFAULT_MAX_PAGE_SIZE: usize = 100;

/// Hand events to the publisher. The aggregate is already saved, so a
/// failure here is logged rather than returned.
async fn publish_events(publisher: &dyn EventPublisher, events: Vec<DomainEvent>) {
    if events.is_empty() {
        return;
    }
    let count = events.len();
    if let Err(e) = publisher.publish(events).await {
        warn!(error = %e, count, "failed to publish domain events");
    }
}

/// Ticket application service
pub struct TicketService {
    tickets: Arc<dyn TicketRepository>,
    categories: Arc<dyn CategoryRepository>,
    teams: Arc<dyn TeamRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    sla: SlaPolicyTable,
    lifecycle: LifecycleEngine,
    fallback_category: Category,
    max_page_size: usize,
    locks: TicketLocks,
    catalog: RwLock<()>,
}

impl TicketService {
    pub fn new(
        tickets: Arc<dyn TicketRepository>,
        categories: Arc<dyn CategoryRepository>,
        teams: Arc<dyn TeamRepository>,
        event_publisher: Arc<dyn EventPublisher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let fallback_category = Category::defaults()
            .into_iter()
            .find(|c| c.id == FALLBACK_CATEGORY_ID)
            .unwrap_or_else(|| Category::new(FALLBACK_CATEGORY_ID, "Other"));

        Self {
            tickets,
            categories,
            teams,
            event_publisher,
            clock,
            sla: SlaPolicyTable::default(),
            lifecycle: LifecycleEngine::default(),
            fallback_category,
            max_page_size: DEFAULT_MAX_PAGE_SIZE,
            locks: TicketLocks::new(),
            catalog: RwLock::new(()),
        }
    }

    /// Apply SLA table, lifecycle rules, fallback category and page limit
    /// from a validated config.
    pub fn with_config(self, config: &DeskConfig) -> Result<Self, ConfigError> {
        Ok(self
            .with_sla(config.sla_table()?)
            .with_lifecycle(config.lifecycle_engine())
            .with_fallback_category(config.fallback_category()?)
            .with_max_page_size(config.pagination.max_page_size))
    }

    pub fn with_sla(mut self, sla: SlaPolicyTable) -> Self {
        self.sla = sla;
        self
    }

    pub fn with_lifecycle(mut self, lifecycle: LifecycleEngine) -> Self {
        self.lifecycle = lifecycle;
        self
    }

    pub fn with_fallback_category(mut self, category: Category) -> Self {
        self.fallback_category = category;
        self
    }

    pub fn with_max_page_size(mut self, max_page_size: usize) -> Self {
        self.max_page_size = max_page_size.max(1);
        self
    }

    pub fn sla_table(&self) -> &SlaPolicyTable {
        &self.sla
    }

    pub fn lifecycle(&self) -> &LifecycleEngine {
        &self.lifecycle
    }

    /// Per-ticket locks. Shared with the store so a mutation and its
    /// re-fetch can be held together.
    pub fn locks(&self) -> &TicketLocks {
        &self.locks
    }

    async fn load(&self, id: &TicketId) -> DeskResult<Ticket> {
        self.tickets
            .find_by_id(id)
            .await?
            .ok_or_else(|| DeskError::NotFound(format!("ticket {}", id)))
    }

    async fn resolve_category(&self, category_id: Option<&str>) -> DeskResult<Category> {
        let Some(category_id) = category_id else {
            return Ok(self.fallback_category.clone());
        };

        match self.categories.find_by_id(category_id).await? {
            Some(category) => Ok(category),
            None => {
                warn!(
                    category_id,
                    fallback = %self.fallback_category.id,
                    "unknown category, using fallback"
                );
                Ok(self.fallback_category.clone())
            }
        }
    }

    /// Lock, load, apply `op`, save, publish. The caller must not already
    /// hold the ticket's lock; see [`TicketService::mutate_locked`].
    async fn mutate<T, F>(&self, id: &TicketId, op: F) -> DeskResult<(Ticket, T)>
    where
        T: Send,
        F: FnOnce(&mut Ticket, &LifecycleEngine, DateTime<Utc>) -> DeskResult<T> + Send,
    {
        let _guard = self.locks.acquire(id).await;
        self.mutate_locked(id, op).await
    }

    /// Same as `mutate` for callers already holding the ticket's lock.
    pub(crate) async fn mutate_locked<T, F>(&self, id: &TicketId, op: F) -> DeskResult<(Ticket, T)>
    where
        T: Send,
        F: FnOnce(&mut Ticket, &LifecycleEngine, DateTime<Utc>) -> DeskResult<T> + Send,
    {
        let mut ticket = self.load(id).await?;
        let now = self.clock.now();

        let output = op(&mut ticket, &self.lifecycle, now)?;
        ticket.refresh_sla(now);

        let events = ticket.take_events();
        self.tickets.update(&ticket).await?;
        publish_events(self.event_publisher.as_ref(), events).await;

        Ok((ticket, output))
    }

    /// Read without taking the ticket's lock.
    pub(crate) async fn read(&self, id: &TicketId) -> DeskResult<Ticket> {
        let mut ticket = self.load(id).await?;
        ticket.refresh_sla(self.clock.now());
        Ok(ticket)
    }

    pub(crate) async fn transition_locked(
        &self,
        id: &TicketId,
        new_status: TicketStatus,
        actor: &ActorId,
        comment: Option<String>,
    ) -> DeskResult<Ticket> {
        let (ticket, change) = self
            .mutate_locked(id, |ticket, lifecycle, now| {
                Ok(lifecycle.apply_transition(ticket, new_status, actor, comment, now)?)
            })
            .await?;

        info!(
            ticket_id = %id,
            from = %change.previous_status,
            to = %change.new_status,
            actor = %actor,
            sla_breached = ticket.sla_breached(),
            "ticket status changed"
        );
        Ok(ticket)
    }

    pub(crate) async fn add_comment_locked(
        &self,
        id: &TicketId,
        author: &ActorId,
        content: String,
        is_internal: bool,
    ) -> DeskResult<Comment> {
        let (_, comment) = self
            .mutate_locked(id, |ticket, _, now| {
                Ok(ticket.add_comment(author.clone(), content, is_internal, now)?)
            })
            .await?;

        debug!(ticket_id = %id, comment_id = %comment.id, is_internal, "comment added");
        Ok(comment)
    }

    pub(crate) async fn submit_satisfaction_locked(
        &self,
        id: &TicketId,
        rating: u8,
        comment: Option<String>,
    ) -> DeskResult<()> {
        self.mutate_locked(id, |ticket, _, now| Ok(ticket.submit_satisfaction(rating, comment, now)?))
            .await?;

        info!(ticket_id = %id, rating, "satisfaction recorded");
        Ok(())
    }

    pub(crate) async fn assign_ticket_locked(&self, id: &TicketId, assignee: &ActorId, actor: &ActorId) -> DeskResult<Ticket> {
        let (ticket, _) = self
            .mutate_locked(id, |ticket, _, now| Ok(ticket.assign(assignee.clone(), actor.clone(), now)?))
            .await?;

        info!(ticket_id = %id, assignee = %assignee, actor = %actor, "ticket assigned");
        Ok(ticket)
    }

    pub(crate) async fn assign_team_locked(&self, id: &TicketId, team_id: &str, actor: &ActorId) -> DeskResult<Ticket> {
        if self.teams.find_by_id(team_id).await?.is_none() {
            return Err(DeskError::NotFound(format!("team {}", team_id)));
        }

        let (ticket, _) = self
            .mutate_locked(id, |ticket, _, now| Ok(ticket.assign_team(team_id, actor.clone(), now)?))
            .await?;

        info!(ticket_id = %id, team_id, actor = %actor, "ticket assigned to team");
        Ok(ticket)
    }
}

#[async_trait]
impl TicketUseCases for TicketService {
    async fn create_ticket(&self, command: CreateTicketCommand) -> DeskResult<Ticket> {
        if command.title.trim().is_empty() {
            return Err(DeskError::Validation("title must not be empty".into()));
        }

        let _catalog = self.catalog.read().await;
        let category = self.resolve_category(command.category_id.as_deref()).await?;
        let now = self.clock.now();

        // Resolve deadlines before reserving an id so a configuration error
        // does not burn a sequence number.
        let sla = self.sla.deadlines_or_fallback(command.priority, now)?;
        let id = self.tickets.next_id(now.year()).await?;

        let draft = TicketDraft {
            title: command.title,
            description: command.description,
            priority: command.priority,
            category: category.snapshot(),
            channel: command.channel,
            requester_id: command.requester_id,
        };
        let mut ticket = Ticket::create(id, draft, sla, now);

        let events = ticket.take_events();
        self.tickets.insert(&ticket).await?;
        publish_events(self.event_publisher.as_ref(), events).await;

        info!(
            ticket_id = %ticket.id(),
            priority = %ticket.priority(),
            category = %ticket.category().id,
            requester = %ticket.requester_id(),
            "ticket created"
        );
        Ok(ticket)
    }

    async fn get_ticket(&self, id: &TicketId) -> DeskResult<Ticket> {
        debug!(ticket_id = %id, "get ticket");
        self.read(id).await
    }

    async fn list_tickets(&self, filter: &TicketFilter, page: PageRequest) -> DeskResult<Page<Ticket>> {
        let page = page.normalized(self.max_page_size);
        let now = self.clock.now();

        let result = self.tickets.list(filter, page).await?;
        debug!(total = result.total, page = result.page, page_size = result.page_size, "list tickets");

        Ok(result.map(|mut ticket| {
            ticket.refresh_sla(now);
            ticket
        }))
    }

    async fn transition_status(
        &self,
        id: &TicketId,
        new_status: TicketStatus,
        actor: &ActorId,
        comment: Option<String>,
    ) -> DeskResult<Ticket> {
        let _guard = self.locks.acquire(id).await;
        self.transition_locked(id, new_status, actor, comment).await
    }

    async fn add_comment(&self, id: &TicketId, author: &ActorId, content: String, is_internal: bool) -> DeskResult<Comment> {
        let _guard = self.locks.acquire(id).await;
        self.add_comment_locked(id, author, content, is_internal).await
    }

    async fn submit_satisfaction(&self, id: &TicketId, rating: u8, comment: Option<String>) -> DeskResult<()> {
        let _guard = self.locks.acquire(id).await;
        self.submit_satisfaction_locked(id, rating, comment).await
    }

    async fn assign_ticket(&self, id: &TicketId, assignee: &ActorId, actor: &ActorId) -> DeskResult<Ticket> {
        let _guard = self.locks.acquire(id).await;
        self.assign_ticket_locked(id, assignee, actor).await
    }

    async fn assign_team(&self, id: &TicketId, team_id: &str, actor: &ActorId) -> DeskResult<Ticket> {
        let _guard = self.locks.acquire(id).await;
        self.assign_team_locked(id, team_id, actor).await
    }

    async fn change_category(&self, id: &TicketId, category_id: &str, actor: &ActorId) -> DeskResult<Ticket> {
        let _catalog = self.catalog.read().await;
        let category = self
            .categories
            .find_by_id(category_id)
            .await?
            .ok_or_else(|| DeskError::NotFound(format!("category {}", category_id)))?;

        let (ticket, _) = self
            .mutate(id, |ticket, _, now| Ok(ticket.change_category(category.snapshot(), actor.clone(), now)?))
            .await?;

        info!(ticket_id = %id, category_id, actor = %actor, "ticket category changed");
        Ok(ticket)
    }

    async fn add_attachment(&self, id: &TicketId, draft: AttachmentDraft, uploader: &ActorId) -> DeskResult<Ticket> {
        if draft.filename.trim().is_empty() {
            return Err(DeskError::Validation("attachment filename must not be empty".into()));
        }

        let (ticket, attachment) = self
            .mutate(id, |ticket, _, now| Ok(ticket.add_attachment(draft, uploader.clone(), now)))
            .await?;

        debug!(ticket_id = %id, attachment_id = %attachment.id, filename = %attachment.filename, "attachment added");
        Ok(ticket)
    }

    async fn list_categories(&self) -> DeskResult<Vec<Category>> {
        Ok(self.categories.list().await?)
    }

    async fn delete_category(&self, category_id: &str) -> DeskResult<()> {
        if category_id == self.fallback_category.id {
            return Err(DeskError::Validation(format!(
                "category {} is the fallback category and cannot be deleted",
                category_id
            )));
        }

        // No ticket can pick up the category between the count and the delete.
        let _catalog = self.catalog.write().await;
        if self.categories.find_by_id(category_id).await?.is_none() {
            return Err(DeskError::NotFound(format!("category {}", category_id)));
        }
        if self.tickets.count_by_category(category_id).await? > 0 {
            return Err(DeskError::CategoryInUse(category_id.to_string()));
        }

        self.categories.delete(category_id).await?;
        info!(category_id, "category deleted");
        Ok(())
    }

    async fn ticket_analytics(&self) -> DeskResult<TicketAnalytics> {
        let tickets = self.tickets.find_all(&TicketFilter::default()).await?;
        Ok(AnalyticsService::summarize(&tickets, self.clock.now()))
    }

    async fn agent_performance(&self) -> DeskResult<Vec<AgentPerformance>> {
        let tickets = self.tickets.find_all(&TicketFilter::default()).await?;
        Ok(AnalyticsService::agent_performance(&tickets))
    }
}

/// Team application service
pub struct TeamService {
    teams: Arc<dyn TeamRepository>,
    event_publisher: Arc<dyn EventPublisher>,
    clock: Arc<dyn Clock>,
    locks: TeamLocks,
}

impl TeamService {
    pub fn new(teams: Arc<dyn TeamRepository>, event_publisher: Arc<dyn EventPublisher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            teams,
            event_publisher,
            clock,
            locks: TeamLocks::new(),
        }
    }

    /// Per-team locks held across load, change and save.
    pub fn locks(&self) -> &TeamLocks {
        &self.locks
    }

    async fn load(&self, id: &str) -> DeskResult<Team> {
        self.teams
            .find_by_id(id)
            .await?
            .ok_or_else(|| DeskError::NotFound(format!("team {}", id)))
    }

    async fn save(&self, mut team: Team) -> DeskResult<Team> {
        let events = team.take_events();
        self.teams.save(&team).await?;
        publish_events(self.event_publisher.as_ref(), events).await;
        Ok(team)
    }
}

#[async_trait]
impl TeamUseCases for TeamService {
    async fn create_team(&self, name: String, description: Option<String>) -> DeskResult<Team> {
        if name.trim().is_empty() {
            return Err(DeskError::Validation("team name must not be empty".into()));
        }

        let team = Team::create(generate_id("team"), name, description, self.clock.now());
        info!(team_id = %team.id(), name = %team.name(), "team created");
        self.save(team).await
    }

    async fn get_team(&self, id: &str) -> DeskResult<Team> {
        self.load(id).await
    }

    async fn list_teams(&self) -> DeskResult<Vec<Team>> {
        Ok(self.teams.list().await?)
    }

    async fn add_member(&self, team_id: &str, user_id: &ActorId, role: TeamRole) -> DeskResult<Team> {
        let _guard = self.locks.acquire(&team_id.to_string()).await;
        let mut team = self.load(team_id).await?;
        team.add_member(user_id.clone(), role, self.clock.now())?;
        info!(team_id, user_id = %user_id, ?role, "team member added");
        self.save(team).await
    }

    async fn remove_member(&self, team_id: &str, user_id: &ActorId) -> DeskResult<Team> {
        let _guard = self.locks.acquire(&team_id.to_string()).await;
        let mut team = self.load(team_id).await?;
        team.remove_member(user_id)?;
        info!(team_id, user_id = %user_id, "team member removed");
        self.save(team).await
    }

    async fn change_member_role(&self, team_id: &str, user_id: &ActorId, role: TeamRole) -> DeskResult<Team> {
        let _guard = self.locks.acquire(&team_id.to_string()).await;
        let mut team = self.load(team_id).await?;
        team.change_role(user_id, role)?;
        self.save(team).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::services::{ResolvedAtPolicy, SlaConfig};
    use crate::domain::value_objects::Priority;
    use crate::infrastructure::clock::FixedClock;
    use crate::infrastructure::persistence::{
        InMemoryCategoryRepository, InMemoryTeamRepository, InMemoryTicketRepository, RecordingEventPublisher,
    };
    use crate::ports::outbound::RepositoryError;
    use chrono::{Duration, TimeZone};
    use std::sync::atomic::{AtomicBool, Ordering};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 2, 8, 0, 0).unwrap()
    }

    struct Harness {
        service: TicketService,
        teams: TeamService,
        clock: Arc<FixedClock>,
        events: Arc<RecordingEventPublisher>,
    }

    fn harness() -> Harness {
        let clock = Arc::new(FixedClock::new(t0()));
        let events = Arc::new(RecordingEventPublisher::new());
        let team_repo = Arc::new(InMemoryTeamRepository::new());

        let service = TicketService::new(
            Arc::new(InMemoryTicketRepository::new()),
            Arc::new(InMemoryCategoryRepository::with_defaults()),
            team_repo.clone(),
            events.clone(),
            clock.clone(),
        );
        let teams = TeamService::new(team_repo, events.clone(), clock.clone());

        Harness { service, teams, clock, events }
    }

    fn wifi_ticket(priority: Priority) -> CreateTicketCommand {
        CreateTicketCommand::new(
            "Cannot connect to campus WiFi",
            "Laptop keeps dropping the eduroam connection",
            priority,
            Some("cat-001".into()),
            "user-001",
        )
    }

    fn staff() -> ActorId {
        ActorId::new("staff-001")
    }

    #[tokio::test]
    async fn test_create_ticket() {
        let h = harness();
        let ticket = h.service.create_ticket(wifi_ticket(Priority::Urgent)).await.unwrap();

        assert_eq!(ticket.id().as_str(), "TKT-2026-0001");
        assert_eq!(ticket.status(), TicketStatus::New);
        assert_eq!(ticket.category().name, "Network");
        assert_eq!(ticket.sla_response_deadline(), t0() + Duration::hours(1));
        assert_eq!(ticket.sla_resolution_deadline(), t0() + Duration::hours(4));
        assert_eq!(h.events.event_types(), vec!["ticket.created"]);

        let second = h.service.create_ticket(wifi_ticket(Priority::Low)).await.unwrap();
        assert_eq!(second.id().as_str(), "TKT-2026-0002");
    }

    #[tokio::test]
    async fn test_create_ticket_unknown_category_falls_back() {
        let h = harness();
        let mut command = wifi_ticket(Priority::Medium);
        command.category_id = Some("cat-404".into());

        let ticket = h.service.create_ticket(command).await.unwrap();
        assert_eq!(ticket.category().id, FALLBACK_CATEGORY_ID);
        assert_eq!(ticket.category().name, "Other");
    }

    #[tokio::test]
    async fn test_create_ticket_without_policy_is_configuration_error() {
        let h = harness();
        let sla = SlaPolicyTable::new(SlaConfig::defaults().into_iter().filter(|c| c.priority != Priority::Low)).unwrap();
        let service = h.service.with_sla(sla);

        let err = service.create_ticket(wifi_ticket(Priority::Low)).await.unwrap_err();
        assert!(matches!(err, DeskError::Configuration(_)));

        // No sequence number was consumed
        let ticket = service.create_ticket(wifi_ticket(Priority::High)).await.unwrap();
        assert_eq!(ticket.id().as_str(), "TKT-2026-0001");
    }

    #[tokio::test]
    async fn test_create_ticket_rejects_blank_title() {
        let h = harness();
        let mut command = wifi_ticket(Priority::Medium);
        command.title = "   ".into();

        assert!(matches!(h.service.create_ticket(command).await, Err(DeskError::Validation(_))));
    }

    #[tokio::test]
    async fn test_transition_persists_and_publishes() {
        let h = harness();
        let ticket = h.service.create_ticket(wifi_ticket(Priority::High)).await.unwrap();
        h.events.clear();

        h.clock.advance(Duration::hours(1));
        h.service
            .transition_status(ticket.id(), TicketStatus::InProgress, &staff(), None)
            .await
            .unwrap();
        h.clock.advance(Duration::hours(2));
        let resolved = h.service
            .transition_status(ticket.id(), TicketStatus::Resolved, &staff(), Some("Reset profile".into()))
            .await
            .unwrap();

        assert_eq!(resolved.resolved_at(), Some(t0() + Duration::hours(3)));
        assert_eq!(resolved.status_history().len(), 2);
        assert!(!resolved.sla_breached());

        let stored = h.service.get_ticket(ticket.id()).await.unwrap();
        assert_eq!(stored.status(), TicketStatus::Resolved);
        assert_eq!(
            h.events.event_types(),
            vec!["ticket.status_changed", "ticket.status_changed"]
        );
    }

    #[tokio::test]
    async fn test_noop_transition_leaves_ticket_unchanged() {
        let h = harness();
        let ticket = h.service.create_ticket(wifi_ticket(Priority::High)).await.unwrap();

        let err = h.service
            .transition_status(ticket.id(), TicketStatus::New, &staff(), None)
            .await
            .unwrap_err();
        assert_eq!(err, DeskError::NoOpTransition(TicketStatus::New));

        let stored = h.service.get_ticket(ticket.id()).await.unwrap();
        assert!(stored.status_history().is_empty());
        assert_eq!(stored.updated_at(), ticket.updated_at());
    }

    #[tokio::test]
    async fn test_transition_unknown_ticket() {
        let h = harness();
        let err = h.service
            .transition_status(&TicketId::new(2026, 99), TicketStatus::Assigned, &staff(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DeskError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_get_ticket_refreshes_breach_flag() {
        let h = harness();
        let ticket = h.service.create_ticket(wifi_ticket(Priority::Urgent)).await.unwrap();
        assert!(!ticket.sla_breached());

        h.clock.advance(Duration::hours(5));
        let stored = h.service.get_ticket(ticket.id()).await.unwrap();
        assert!(stored.sla_breached());
    }

    #[tokio::test]
    async fn test_add_comment_keeps_status() {
        let h = harness();
        let ticket = h.service.create_ticket(wifi_ticket(Priority::Medium)).await.unwrap();

        let comment = h.service
            .add_comment(ticket.id(), &staff(), "Checking the access point".into(), true)
            .await
            .unwrap();
        assert!(comment.is_internal);

        let stored = h.service.get_ticket(ticket.id()).await.unwrap();
        assert_eq!(stored.status(), TicketStatus::New);
        assert_eq!(stored.comments().len(), 1);

        let err = h.service.add_comment(ticket.id(), &staff(), "  ".into(), false).await.unwrap_err();
        assert!(matches!(err, DeskError::Validation(_)));
    }

    #[tokio::test]
    async fn test_satisfaction_rules() {
        let h = harness();
        let ticket = h.service.create_ticket(wifi_ticket(Priority::Medium)).await.unwrap();

        let err = h.service.submit_satisfaction(ticket.id(), 5, None).await.unwrap_err();
        assert!(matches!(err, DeskError::InvalidState(_)));

        h.service
            .transition_status(ticket.id(), TicketStatus::Resolved, &staff(), None)
            .await
            .unwrap();

        let err = h.service.submit_satisfaction(ticket.id(), 9, None).await.unwrap_err();
        assert!(matches!(err, DeskError::Validation(_)));

        h.service.submit_satisfaction(ticket.id(), 4, Some("Quick fix".into())).await.unwrap();
        let err = h.service.submit_satisfaction(ticket.id(), 5, None).await.unwrap_err();
        assert!(matches!(err, DeskError::InvalidState(_)));

        let stored = h.service.get_ticket(ticket.id()).await.unwrap();
        assert_eq!(stored.satisfaction().map(|s| s.rating), Some(4));
    }

    #[tokio::test]
    async fn test_assignment_and_team() {
        let h = harness();
        let ticket = h.service.create_ticket(wifi_ticket(Priority::Medium)).await.unwrap();

        let assigned = h.service.assign_ticket(ticket.id(), &staff(), &ActorId::new("lead-001")).await.unwrap();
        assert_eq!(assigned.assignee_id(), Some(&staff()));
        assert_eq!(assigned.status(), TicketStatus::New);
        assert!(assigned.status_history().is_empty());

        let err = h.service.assign_team(ticket.id(), "team-missing", &staff()).await.unwrap_err();
        assert!(matches!(err, DeskError::NotFound(_)));

        let team = h.teams.create_team("Network Ops".into(), None).await.unwrap();
        let updated = h.service.assign_team(ticket.id(), team.id(), &staff()).await.unwrap();
        assert_eq!(updated.team_id(), Some(team.id()));
    }

    #[tokio::test]
    async fn test_assign_rejected_on_terminal_ticket() {
        let h = harness();
        let ticket = h.service.create_ticket(wifi_ticket(Priority::Medium)).await.unwrap();
        h.service
            .transition_status(ticket.id(), TicketStatus::Cancelled, &staff(), None)
            .await
            .unwrap();

        let err = h.service.assign_ticket(ticket.id(), &staff(), &staff()).await.unwrap_err();
        assert!(matches!(err, DeskError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_change_category_and_attachment() {
        let h = harness();
        let ticket = h.service.create_ticket(wifi_ticket(Priority::Medium)).await.unwrap();

        let updated = h.service.change_category(ticket.id(), "cat-005", &staff()).await.unwrap();
        assert_eq!(updated.category().name, "Email");

        let err = h.service.change_category(ticket.id(), "cat-404", &staff()).await.unwrap_err();
        assert!(matches!(err, DeskError::NotFound(_)));

        let draft = AttachmentDraft {
            filename: "screenshot.png".into(),
            url: "https://files.example.edu/screenshot.png".into(),
            file_size: 20_480,
            mime_type: "image/png".into(),
        };
        let updated = h.service.add_attachment(ticket.id(), draft, &ActorId::new("user-001")).await.unwrap();
        assert_eq!(updated.attachments().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_category() {
        let h = harness();
        h.service.create_ticket(wifi_ticket(Priority::Medium)).await.unwrap();

        assert_eq!(
            h.service.delete_category("cat-001").await.unwrap_err(),
            DeskError::CategoryInUse("cat-001".into())
        );
        assert!(matches!(h.service.delete_category(FALLBACK_CATEGORY_ID).await, Err(DeskError::Validation(_))));
        assert!(matches!(h.service.delete_category("cat-404").await, Err(DeskError::NotFound(_))));

        h.service.delete_category("cat-007").await.unwrap();
        let remaining = h.service.list_categories().await.unwrap();
        assert_eq!(remaining.len(), 7);
    }

    #[tokio::test]
    async fn test_list_clamps_page_size() {
        let h = harness();
        let service = h.service.with_max_page_size(2);
        for _ in 0..3 {
            service.create_ticket(wifi_ticket(Priority::Low)).await.unwrap();
            h.clock.advance(Duration::minutes(1));
        }

        let page = service.list_tickets(&TicketFilter::default(), PageRequest::new(0, 50)).await.unwrap();
        assert_eq!(page.page, 1);
        assert_eq!(page.page_size, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.total_pages, 2);
    }

    #[tokio::test]
    async fn test_analytics() {
        let h = harness();
        let ticket = h.service.create_ticket(wifi_ticket(Priority::High)).await.unwrap();
        h.service.create_ticket(wifi_ticket(Priority::Low)).await.unwrap();

        h.service.assign_ticket(ticket.id(), &staff(), &staff()).await.unwrap();
        h.clock.advance(Duration::hours(2));
        h.service
            .transition_status(ticket.id(), TicketStatus::Resolved, &staff(), None)
            .await
            .unwrap();

        let analytics = h.service.ticket_analytics().await.unwrap();
        assert_eq!(analytics.total, 2);
        assert_eq!(analytics.open, 1);
        assert_eq!(analytics.finished, 1);

        let agents = h.service.agent_performance().await.unwrap();
        assert_eq!(agents.len(), 1);
        assert_eq!(agents[0].resolved, 1);
    }

    #[tokio::test]
    async fn test_with_config_applies_overwrite_policy() {
        let h = harness();
        let mut config = DeskConfig::default();
        config.lifecycle.resolved_at_policy = ResolvedAtPolicy::OverwriteOnReenter;
        let service = h.service.with_config(&config).unwrap();

        let ticket = service.create_ticket(wifi_ticket(Priority::Medium)).await.unwrap();
        service.transition_status(ticket.id(), TicketStatus::Resolved, &staff(), None).await.unwrap();
        h.clock.advance(Duration::hours(1));
        service.transition_status(ticket.id(), TicketStatus::InProgress, &staff(), None).await.unwrap();
        h.clock.advance(Duration::hours(1));
        let ticket = service.transition_status(ticket.id(), TicketStatus::Resolved, &staff(), None).await.unwrap();

        assert_eq!(ticket.resolved_at(), Some(t0() + Duration::hours(2)));
    }

    /// Category lookups that pause once, long enough for another task to
    /// run in between.
    struct SlowFirstLookup {
        inner: InMemoryCategoryRepository,
        paused: AtomicBool,
    }

    #[async_trait]
    impl CategoryRepository for SlowFirstLookup {
        async fn find_by_id(&self, id: &str) -> Result<Option<Category>, RepositoryError> {
            if !self.paused.swap(true, Ordering::SeqCst) {
                tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            }
            self.inner.find_by_id(id).await
        }

        async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
            self.inner.list().await
        }

        async fn save(&self, category: &Category) -> Result<(), RepositoryError> {
            self.inner.save(category).await
        }

        async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
            self.inner.delete(id).await
        }
    }

    /// Team lookups that yield before answering.
    struct YieldingTeams(InMemoryTeamRepository);

    #[async_trait]
    impl TeamRepository for YieldingTeams {
        async fn find_by_id(&self, id: &str) -> Result<Option<Team>, RepositoryError> {
            tokio::task::yield_now().await;
            self.0.find_by_id(id).await
        }

        async fn list(&self) -> Result<Vec<Team>, RepositoryError> {
            self.0.list().await
        }

        async fn save(&self, team: &Team) -> Result<(), RepositoryError> {
            tokio::task::yield_now().await;
            self.0.save(team).await
        }
    }

    #[tokio::test]
    async fn test_delete_category_waits_for_pending_creation() {
        let clock = Arc::new(FixedClock::new(t0()));
        let service = Arc::new(TicketService::new(
            Arc::new(InMemoryTicketRepository::new()),
            Arc::new(SlowFirstLookup {
                inner: InMemoryCategoryRepository::with_defaults(),
                paused: AtomicBool::new(false),
            }),
            Arc::new(InMemoryTeamRepository::new()),
            Arc::new(RecordingEventPublisher::new()),
            clock,
        ));

        let mut command = wifi_ticket(Priority::Low);
        command.category_id = Some("cat-007".into());
        let creating = {
            let service = service.clone();
            tokio::spawn(async move { service.create_ticket(command).await })
        };
        // Let the creation resolve cat-007 and stall inside the lookup.
        tokio::task::yield_now().await;

        let err = service.delete_category("cat-007").await.unwrap_err();
        assert_eq!(err, DeskError::CategoryInUse("cat-007".into()));

        let ticket = creating.await.unwrap().unwrap();
        assert_eq!(ticket.category().id, "cat-007");
        assert!(service.list_categories().await.unwrap().iter().any(|c| c.id == "cat-007"));
    }

    #[tokio::test]
    async fn test_concurrent_member_additions_are_all_kept() {
        let clock = Arc::new(FixedClock::new(t0()));
        let teams = Arc::new(TeamService::new(
            Arc::new(YieldingTeams(InMemoryTeamRepository::new())),
            Arc::new(RecordingEventPublisher::new()),
            clock,
        ));
        let team = teams.create_team("Field Support".into(), None).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|n| {
                let teams = teams.clone();
                let team_id = team.id().to_string();
                tokio::spawn(async move {
                    teams
                        .add_member(&team_id, &ActorId::new(format!("staff-{:03}", n)), TeamRole::Member)
                        .await
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = teams.get_team(team.id()).await.unwrap();
        assert_eq!(stored.member_count(), 16);
        assert!(teams.locks().is_empty());
    }

    #[tokio::test]
    async fn test_missing_tickets_leave_no_locks_behind() {
        let h = harness();
        for seq in 1..=200 {
            let err = h.service
                .transition_status(&TicketId::new(2026, seq), TicketStatus::Assigned, &staff(), None)
                .await
                .unwrap_err();
            assert!(matches!(err, DeskError::NotFound(_)));
        }
        assert!(h.service.locks().is_empty());
    }

    #[tokio::test]
    async fn test_create_ticket_past_calendar_end_is_configuration_error() {
        let h = harness();
        h.clock.set(DateTime::<Utc>::MAX_UTC);

        let err = h.service.create_ticket(wifi_ticket(Priority::Urgent)).await.unwrap_err();
        assert!(matches!(err, DeskError::Configuration(_)));
    }

    #[tokio::test]
    async fn test_team_membership() {
        let h = harness();
        let team = h.teams.create_team("Service Desk".into(), Some("Tier 1".into())).await.unwrap();
        let lead = ActorId::new("staff-010");

        h.teams.add_member(team.id(), &lead, TeamRole::Member).await.unwrap();
        let team = h.teams.change_member_role(team.id(), &lead, TeamRole::Leader).await.unwrap();
        assert_eq!(team.leader().map(|m| &m.user_id), Some(&lead));

        let err = h.teams.add_member(team.id(), &lead, TeamRole::Member).await.unwrap_err();
        assert!(matches!(err, DeskError::Validation(_)));

        let team = h.teams.remove_member(team.id(), &lead).await.unwrap();
        assert_eq!(team.member_count(), 0);
        assert_eq!(h.teams.list_teams().await.unwrap().len(), 1);
        assert!(matches!(h.teams.get_team("team-missing").await, Err(DeskError::NotFound(_))));
    }
}
