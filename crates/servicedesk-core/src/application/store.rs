//! Ticket store
//!
//! Client-side cache over [`TicketService`]: the current page, its
//! pagination, the ticket being viewed and the active filter. Mutations and
//! the re-fetch that follows them hold the ticket's lock together.

use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use tracing::error;

use crate::application::commands::TicketService;
use crate::application::dto::{CreateTicketCommand, Page, PageRequest, TicketFilter};
use crate::domain::aggregates::{Comment, Ticket};
use crate::domain::value_objects::{ActorId, TicketId, TicketStatus};
use crate::error::DeskResult;
use crate::ports::inbound::TicketUseCases;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
    pub total_pages: usize,
}

#[derive(Default)]
struct StoreState {
    tickets: Vec<Ticket>,
    pagination: Pagination,
    current: Option<Ticket>,
    filter: TicketFilter,
}

impl StoreState {
    /// Swap a fresh copy into the cached page and the current ticket.
    fn replace(&mut self, ticket: &Ticket) {
        if let Some(cached) = self.tickets.iter_mut().find(|t| t.id() == ticket.id()) {
            *cached = ticket.clone();
        }
        if self.current.as_ref().is_some_and(|t| t.id() == ticket.id()) {
            self.current = Some(ticket.clone());
        }
    }
}

fn logged<T>(action: &str, result: DeskResult<T>) -> DeskResult<T> {
    if let Err(e) = &result {
        error!(action, error = %e, "ticket store action failed");
    }
    result
}

pub struct TicketStore {
    service: Arc<TicketService>,
    default_page_size: usize,
    state: RwLock<StoreState>,
}

impl TicketStore {
    pub fn new(service: Arc<TicketService>, default_page_size: usize) -> Self {
        let default_page_size = default_page_size.max(1);
        Self {
            service,
            default_page_size,
            state: RwLock::new(StoreState {
                pagination: Pagination {
                    page: 1,
                    page_size: default_page_size,
                    ..Default::default()
                },
                ..Default::default()
            }),
        }
    }

    // =========================================================================
    // Views
    // =========================================================================

    pub fn tickets(&self) -> Vec<Ticket> {
        self.state.read().tickets.clone()
    }

    pub fn current_ticket(&self) -> Option<Ticket> {
        self.state.read().current.clone()
    }

    pub fn pagination(&self) -> Pagination {
        self.state.read().pagination
    }

    pub fn filter(&self) -> TicketFilter {
        self.state.read().filter.clone()
    }

    /// Tickets on the cached page.
    pub fn ticket_count(&self) -> usize {
        self.state.read().tickets.len()
    }

    /// Matching tickets across all pages, as of the last fetch.
    pub fn total_count(&self) -> usize {
        self.state.read().pagination.total
    }

    pub fn new_tickets(&self) -> Vec<Ticket> {
        self.cached_where(|status| status == TicketStatus::New)
    }

    pub fn open_tickets(&self) -> Vec<Ticket> {
        self.cached_where(|status| status.is_open())
    }

    pub fn resolved_tickets(&self) -> Vec<Ticket> {
        self.cached_where(|status| status.is_resolved())
    }

    fn cached_where(&self, pred: impl Fn(TicketStatus) -> bool) -> Vec<Ticket> {
        self.state
            .read()
            .tickets
            .iter()
            .filter(|t| pred(t.status()))
            .cloned()
            .collect()
    }

    // =========================================================================
    // Actions
    // =========================================================================

    /// Fetch a page with the active filter. `None` re-fetches the current page.
    pub async fn fetch_tickets(&self, page: Option<usize>) -> DeskResult<Page<Ticket>> {
        let (filter, request) = {
            let state = self.state.read();
            let page = page.unwrap_or(state.pagination.page);
            (state.filter.clone(), PageRequest::new(page, state.pagination.page_size))
        };

        let result = logged("fetch_tickets", self.service.list_tickets(&filter, request).await)?;

        let mut state = self.state.write();
        state.tickets = result.items.clone();
        state.pagination = Pagination {
            page: result.page,
            page_size: result.page_size,
            total: result.total,
            total_pages: result.total_pages,
        };
        Ok(result)
    }

    pub async fn fetch_ticket(&self, id: &TicketId) -> DeskResult<Ticket> {
        let ticket = logged("fetch_ticket", self.service.get_ticket(id).await)?;
        let mut state = self.state.write();
        state.replace(&ticket);
        state.current = Some(ticket.clone());
        Ok(ticket)
    }

    /// Create a ticket. The cache only picks it up when it matches the
    /// active filter; it lands on top of page 1 since lists are newest first.
    pub async fn create_ticket(&self, command: CreateTicketCommand) -> DeskResult<Ticket> {
        let ticket = logged("create_ticket", self.service.create_ticket(command).await)?;

        let mut state = self.state.write();
        if !state.filter.matches(&ticket) {
            return Ok(ticket);
        }

        let page_size = state.pagination.page_size.max(1);
        state.pagination.total += 1;
        state.pagination.total_pages = state.pagination.total.div_ceil(page_size);
        if state.pagination.page == 1 {
            state.tickets.insert(0, ticket.clone());
            state.tickets.truncate(page_size);
        }
        Ok(ticket)
    }

    pub async fn update_status(
        &self,
        id: &TicketId,
        status: TicketStatus,
        actor: &ActorId,
        comment: Option<String>,
    ) -> DeskResult<Ticket> {
        let _guard = self.service.locks().acquire(id).await;
        let ticket = logged(
            "update_status",
            self.service.transition_locked(id, status, actor, comment).await,
        )?;
        self.state.write().replace(&ticket);
        Ok(ticket)
    }

    pub async fn assign_ticket(&self, id: &TicketId, assignee: &ActorId, actor: &ActorId) -> DeskResult<Ticket> {
        let _guard = self.service.locks().acquire(id).await;
        let ticket = logged(
            "assign_ticket",
            self.service.assign_ticket_locked(id, assignee, actor).await,
        )?;
        self.state.write().replace(&ticket);
        Ok(ticket)
    }

    pub async fn assign_team(&self, id: &TicketId, team_id: &str, actor: &ActorId) -> DeskResult<Ticket> {
        let _guard = self.service.locks().acquire(id).await;
        let ticket = logged("assign_team", self.service.assign_team_locked(id, team_id, actor).await)?;
        self.state.write().replace(&ticket);
        Ok(ticket)
    }

    /// Add a comment, then re-fetch the ticket before releasing its lock.
    pub async fn add_comment(
        &self,
        id: &TicketId,
        author: &ActorId,
        content: String,
        is_internal: bool,
    ) -> DeskResult<Comment> {
        let _guard = self.service.locks().acquire(id).await;
        let comment = logged(
            "add_comment",
            self.service.add_comment_locked(id, author, content, is_internal).await,
        )?;
        let ticket = logged("add_comment", self.service.read(id).await)?;
        self.state.write().replace(&ticket);
        Ok(comment)
    }

    pub async fn submit_satisfaction(&self, id: &TicketId, rating: u8, comment: Option<String>) -> DeskResult<Ticket> {
        let _guard = self.service.locks().acquire(id).await;
        logged(
            "submit_satisfaction",
            self.service.submit_satisfaction_locked(id, rating, comment).await,
        )?;
        let ticket = logged("submit_satisfaction", self.service.read(id).await)?;
        self.state.write().replace(&ticket);
        Ok(ticket)
    }

    /// Overlay `filter` on the active one and reload from page 1.
    pub async fn set_filter(&self, filter: TicketFilter) -> DeskResult<Page<Ticket>> {
        {
            let mut state = self.state.write();
            state.filter = state.filter.merge(&filter);
            state.pagination.page = 1;
        }
        self.fetch_tickets(Some(1)).await
    }

    pub async fn clear_filter(&self) -> DeskResult<Page<Ticket>> {
        {
            let mut state = self.state.write();
            state.filter = TicketFilter::default();
            state.pagination.page = 1;
            state.pagination.page_size = self.default_page_size;
        }
        self.fetch_tickets(Some(1)).await
    }
}
