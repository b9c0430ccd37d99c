//! In-memory repository implementations
//!
//! Records are stored whole and replaced atomically, so a reader sees a
//! ticket either before or after a write, never in between.

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::application::dto::{Page, PageRequest, TicketFilter};
use crate::domain::aggregates::{Team, Ticket};
use crate::domain::value_objects::{Category, TicketId};
use crate::domain::DomainEvent;
use crate::ports::outbound::{CategoryRepository, EventPublisher, RepositoryError, TeamRepository, TicketRepository};

/// In-memory ticket repository
#[derive(Default)]
pub struct InMemoryTicketRepository {
    tickets: DashMap<TicketId, Ticket>,
    sequences: Mutex<HashMap<i32, u32>>,
}

impl InMemoryTicketRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load previously exported tickets. Sequences continue after the highest
    /// id seen for each year.
    pub fn from_tickets(tickets: impl IntoIterator<Item = Ticket>) -> Self {
        let repo = Self::new();
        {
            let mut sequences = repo.sequences.lock();
            for ticket in tickets {
                if let Some((year, seq)) = ticket.id().parts() {
                    let current = sequences.entry(year).or_insert(0);
                    *current = (*current).max(seq);
                }
                repo.tickets.insert(ticket.id().clone(), ticket);
            }
        }
        repo
    }

    /// Every stored ticket ordered by id.
    pub fn export(&self) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self.tickets.iter().map(|entry| entry.value().clone()).collect();
        tickets.sort_by(|a, b| a.id().cmp(b.id()));
        tickets
    }

    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    fn matching(&self, filter: &TicketFilter) -> Vec<Ticket> {
        let mut tickets: Vec<Ticket> = self
            .tickets
            .iter()
            .filter(|entry| filter.matches(entry.value()))
            .map(|entry| entry.value().clone())
            .collect();

        tickets.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(a.id()))
        });
        tickets
    }
}

#[async_trait]
impl TicketRepository for InMemoryTicketRepository {
    async fn find_by_id(&self, id: &TicketId) -> Result<Option<Ticket>, RepositoryError> {
        Ok(self.tickets.get(id).map(|entry| entry.value().clone()))
    }

    async fn list(&self, filter: &TicketFilter, page: PageRequest) -> Result<Page<Ticket>, RepositoryError> {
        Ok(Page::paginate(self.matching(filter), page))
    }

    async fn find_all(&self, filter: &TicketFilter) -> Result<Vec<Ticket>, RepositoryError> {
        Ok(self.matching(filter))
    }

    async fn insert(&self, ticket: &Ticket) -> Result<(), RepositoryError> {
        use dashmap::mapref::entry::Entry;

        match self.tickets.entry(ticket.id().clone()) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict(format!("ticket {} already exists", ticket.id()))),
            Entry::Vacant(slot) => {
                slot.insert(ticket.clone());
                Ok(())
            }
        }
    }

    async fn update(&self, ticket: &Ticket) -> Result<(), RepositoryError> {
        match self.tickets.get_mut(ticket.id()) {
            Some(mut entry) => {
                *entry = ticket.clone();
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("ticket {}", ticket.id()))),
        }
    }

    async fn next_id(&self, year: i32) -> Result<TicketId, RepositoryError> {
        let mut sequences = self.sequences.lock();
        let seq = sequences.entry(year).or_insert(0);
        *seq = seq
            .checked_add(1)
            .ok_or_else(|| RepositoryError::Storage(format!("ticket sequence for {} exhausted", year)))?;
        Ok(TicketId::new(year, *seq))
    }

    async fn count_by_category(&self, category_id: &str) -> Result<usize, RepositoryError> {
        Ok(self
            .tickets
            .iter()
            .filter(|entry| entry.value().category().id == category_id)
            .count())
    }
}

/// In-memory category catalog
#[derive(Default)]
pub struct InMemoryCategoryRepository {
    categories: DashMap<String, Category>,
}

impl InMemoryCategoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_catalog(catalog: impl IntoIterator<Item = Category>) -> Self {
        let repo = Self::new();
        for category in catalog {
            repo.categories.insert(category.id.clone(), category);
        }
        repo
    }

    pub fn with_defaults() -> Self {
        Self::with_catalog(Category::defaults())
    }
}

#[async_trait]
impl CategoryRepository for InMemoryCategoryRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Category>, RepositoryError> {
        Ok(self.categories.get(id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Category>, RepositoryError> {
        let mut categories: Vec<Category> = self.categories.iter().map(|entry| entry.value().clone()).collect();
        categories.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(categories)
    }

    async fn save(&self, category: &Category) -> Result<(), RepositoryError> {
        self.categories.insert(category.id.clone(), category.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        self.categories
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("category {}", id)))
    }
}

/// In-memory team repository
#[derive(Default)]
pub struct InMemoryTeamRepository {
    teams: DashMap<String, Team>,
}

impl InMemoryTeamRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_teams(teams: impl IntoIterator<Item = Team>) -> Self {
        let repo = Self::new();
        for team in teams {
            repo.teams.insert(team.id().to_string(), team);
        }
        repo
    }

    pub fn export(&self) -> Vec<Team> {
        let mut teams: Vec<Team> = self.teams.iter().map(|entry| entry.value().clone()).collect();
        teams.sort_by(|a, b| a.id().cmp(b.id()));
        teams
    }
}

#[async_trait]
impl TeamRepository for InMemoryTeamRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<Team>, RepositoryError> {
        Ok(self.teams.get(id).map(|entry| entry.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Team>, RepositoryError> {
        let mut teams: Vec<Team> = self.teams.iter().map(|entry| entry.value().clone()).collect();
        teams.sort_by(|a, b| a.name().cmp(b.name()).then_with(|| a.id().cmp(b.id())));
        Ok(teams)
    }

    async fn save(&self, team: &Team) -> Result<(), RepositoryError> {
        self.teams.insert(team.id().to_string(), team.clone());
        Ok(())
    }
}

/// No-op event publisher
#[derive(Default)]
pub struct NoOpEventPublisher;

#[async_trait]
impl EventPublisher for NoOpEventPublisher {
    async fn publish(&self, _events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        Ok(())
    }
}

/// Keeps every published event in memory.
#[derive(Default)]
pub struct RecordingEventPublisher {
    events: Mutex<Vec<DomainEvent>>,
}

impl RecordingEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DomainEvent> {
        self.events.lock().clone()
    }

    pub fn event_types(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(DomainEvent::event_type).collect()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

#[async_trait]
impl EventPublisher for RecordingEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), RepositoryError> {
        self.events.lock().extend(events);
        Ok(())
    }
}
