#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;

use servicedesk_core::infrastructure::{
    FixedClock, InMemoryCategoryRepository, InMemoryTeamRepository, InMemoryTicketRepository, RecordingEventPublisher,
};
use servicedesk_core::{ActorId, CreateTicketCommand, Priority, TicketService};

pub struct Desk {
    pub service: Arc<TicketService>,
    pub categories: Arc<InMemoryCategoryRepository>,
    pub clock: Arc<FixedClock>,
    pub events: Arc<RecordingEventPublisher>,
}

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 9, 1, 9, 0, 0).unwrap()
}

pub fn desk() -> Desk {
    desk_with(|service| service)
}

pub fn desk_with(configure: impl FnOnce(TicketService) -> TicketService) -> Desk {
    let clock = Arc::new(FixedClock::new(start()));
    let events = Arc::new(RecordingEventPublisher::new());
    let categories = Arc::new(InMemoryCategoryRepository::with_defaults());
    let service = TicketService::new(
        Arc::new(InMemoryTicketRepository::new()),
        categories.clone(),
        Arc::new(InMemoryTeamRepository::new()),
        events.clone(),
        clock.clone(),
    );

    Desk {
        service: Arc::new(configure(service)),
        categories,
        clock,
        events,
    }
}

pub fn new_ticket(title: &str, priority: Priority) -> CreateTicketCommand {
    CreateTicketCommand::new(title, "Reported at the front desk", priority, Some("cat-002".into()), "user-100")
}

pub fn agent() -> ActorId {
    ActorId::new("staff-100")
}
