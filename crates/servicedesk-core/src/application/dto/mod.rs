//! Data Transfer Objects (DTOs)
//!
//! Commands, filters and pages crossing the use-case boundary.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::aggregates::Ticket;
use crate::domain::value_objects::{ActorId, Channel, Priority, TicketStatus};

// =============================================================================
// Ticket Commands
// =============================================================================

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateTicketCommand {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    /// Unknown or missing ids fall back to the catalog's fallback category.
    #[serde(default)]
    pub category_id: Option<String>,
    pub requester_id: ActorId,
    #[serde(default)]
    pub channel: Channel,
}

impl CreateTicketCommand {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        priority: Priority,
        category_id: Option<String>,
        requester_id: impl Into<ActorId>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            priority,
            category_id,
            requester_id: requester_id.into(),
            channel: Channel::Web,
        }
    }
}

// =============================================================================
// Queries
// =============================================================================

/// Ticket list filter. Empty sets and `None` fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketFilter {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub statuses: Vec<TicketStatus>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub priorities: Vec<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keyword: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requester_id: Option<ActorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<ActorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub team_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_from: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_to: Option<DateTime<Utc>>,
}

impl TicketFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = TicketStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    pub fn with_priorities(mut self, priorities: impl IntoIterator<Item = Priority>) -> Self {
        self.priorities = priorities.into_iter().collect();
        self
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn requested_by(mut self, requester_id: impl Into<ActorId>) -> Self {
        self.requester_id = Some(requester_id.into());
        self
    }

    pub fn assigned_to(mut self, assignee_id: impl Into<ActorId>) -> Self {
        self.assignee_id = Some(assignee_id.into());
        self
    }

    pub fn for_team(mut self, team_id: impl Into<String>) -> Self {
        self.team_id = Some(team_id.into());
        self
    }

    pub fn in_category(mut self, category_id: impl Into<String>) -> Self {
        self.category_id = Some(category_id.into());
        self
    }

    pub fn created_between(mut self, from: Option<DateTime<Utc>>, to: Option<DateTime<Utc>>) -> Self {
        self.created_from = from;
        self.created_to = to;
        self
    }

    /// Overlay `other` on top of `self`: fields set in `other` win.
    pub fn merge(&self, other: &TicketFilter) -> TicketFilter {
        TicketFilter {
            statuses: if other.statuses.is_empty() { self.statuses.clone() } else { other.statuses.clone() },
            priorities: if other.priorities.is_empty() { self.priorities.clone() } else { other.priorities.clone() },
            keyword: other.keyword.clone().or_else(|| self.keyword.clone()),
            requester_id: other.requester_id.clone().or_else(|| self.requester_id.clone()),
            assignee_id: other.assignee_id.clone().or_else(|| self.assignee_id.clone()),
            team_id: other.team_id.clone().or_else(|| self.team_id.clone()),
            category_id: other.category_id.clone().or_else(|| self.category_id.clone()),
            created_from: other.created_from.or(self.created_from),
            created_to: other.created_to.or(self.created_to),
        }
    }

    pub fn matches(&self, ticket: &Ticket) -> bool {
        if !self.statuses.is_empty() && !self.statuses.contains(&ticket.status()) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&ticket.priority()) {
            return false;
        }
        if let Some(keyword) = self.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()) {
            let keyword = keyword.to_lowercase();
            if !ticket.title().to_lowercase().contains(&keyword)
                && !ticket.description().to_lowercase().contains(&keyword)
            {
                return false;
            }
        }
        if let Some(requester) = &self.requester_id {
            if ticket.requester_id() != requester {
                return false;
            }
        }
        if let Some(assignee) = &self.assignee_id {
            if ticket.assignee_id() != Some(assignee) {
                return false;
            }
        }
        if let Some(team) = &self.team_id {
            if ticket.team_id() != Some(team.as_str()) {
                return false;
            }
        }
        if let Some(category) = &self.category_id {
            if &ticket.category().id != category {
                return false;
            }
        }
        if self.created_from.is_some_and(|from| ticket.created_at() < from) {
            return false;
        }
        if self.created_to.is_some_and(|to| ticket.created_at() > to) {
            return false;
        }
        true
    }
}

/// 1-indexed page request
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// Page numbers below 1 become 1; sizes are clamped to `1..=max_page_size`.
    pub fn normalized(self, max_page_size: usize) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, max_page_size.max(1)),
        }
    }

    pub fn offset(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, page_size: 10 }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

impl<T> Page<T> {
    /// Slice `items` like `items[start..start + page_size]`; a page past the
    /// end is empty rather than an error.
    pub fn paginate(items: Vec<T>, request: PageRequest) -> Self {
        let total = items.len();
        let page_size = request.page_size.max(1);
        let items = items
            .into_iter()
            .skip(request.offset())
            .take(page_size)
            .collect();

        Self {
            items,
            total,
            page: request.page,
            page_size,
            total_pages: total.div_ceil(page_size),
        }
    }

    pub fn empty(request: PageRequest) -> Self {
        Self::paginate(Vec::new(), request)
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            total_pages: self.total_pages,
        }
    }
}
