mod common;

use chrono::Duration;
use std::sync::Arc;

use common::{agent, desk, desk_with, new_ticket, start};
use servicedesk_core::{
    ActorId, CategoryRepository, DeskError, PageRequest, Priority, SlaConfig, SlaPolicyTable, TicketFilter, TicketStatus, TicketUseCases,
};

#[tokio::test]
async fn urgent_deadlines_follow_the_policy_exactly() {
    let desk = desk_with(|service| {
        service.with_sla(
            SlaPolicyTable::new([SlaConfig::new("sla-urgent", Priority::Urgent, 1, 4)]).unwrap(),
        )
    });

    let ticket = desk.service.create_ticket(new_ticket("Core switch down", Priority::Urgent)).await.unwrap();
    assert_eq!(ticket.created_at(), start());
    assert_eq!(ticket.sla_response_deadline(), start() + Duration::hours(1));
    assert_eq!(ticket.sla_resolution_deadline(), start() + Duration::hours(4));

    let err = desk.service.create_ticket(new_ticket("Mouse", Priority::Low)).await.unwrap_err();
    assert!(matches!(err, DeskError::Configuration(_)));
}

#[tokio::test]
async fn second_page_of_two_over_five_tickets() {
    let desk = desk();
    let mut created = Vec::new();
    for n in 0..5 {
        let ticket = desk
            .service
            .create_ticket(new_ticket(&format!("Ticket {}", n), Priority::Medium))
            .await
            .unwrap();
        created.push(ticket.id().clone());
        desk.clock.advance(Duration::minutes(5));
    }
    // Newest first
    created.reverse();

    let page = desk
        .service
        .list_tickets(&TicketFilter::default(), PageRequest::new(2, 2))
        .await
        .unwrap();

    let ids: Vec<_> = page.items.iter().map(|t| t.id().clone()).collect();
    assert_eq!(ids, vec![created[2].clone(), created[3].clone()]);
    assert_eq!(page.total, 5);
    assert_eq!(page.total_pages, 3);

    let past_end = desk
        .service
        .list_tickets(&TicketFilter::default(), PageRequest::new(9, 2))
        .await
        .unwrap();
    assert!(past_end.items.is_empty());
    assert_eq!(past_end.total, 5);
}

#[tokio::test]
async fn list_filters_combine() {
    let desk = desk();
    let wifi = desk.service.create_ticket(new_ticket("WiFi drops in library", Priority::High)).await.unwrap();
    desk.service.create_ticket(new_ticket("Printer toner", Priority::Low)).await.unwrap();
    desk.service.assign_ticket(wifi.id(), &agent(), &agent()).await.unwrap();

    let filter = TicketFilter::new()
        .with_keyword("wifi")
        .with_priorities([Priority::High, Priority::Urgent])
        .assigned_to(agent());
    let page = desk.service.list_tickets(&filter, PageRequest::default()).await.unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.items[0].id(), wifi.id());

    let by_status = TicketFilter::new().with_statuses([TicketStatus::Resolved]);
    assert_eq!(desk.service.list_tickets(&by_status, PageRequest::default()).await.unwrap().total, 0);
}

#[tokio::test]
async fn catalog_edits_do_not_rewrite_existing_tickets() {
    let desk = desk();
    let ticket = desk.service.create_ticket(new_ticket("Dock not charging", Priority::Medium)).await.unwrap();
    assert_eq!(ticket.category().name, "Hardware");

    let mut renamed = desk.categories.find_by_id("cat-002").await.unwrap().unwrap();
    renamed.name = "Devices & Peripherals".into();
    renamed.description = Some("Laptops, docks and printers".into());
    desk.categories.save(&renamed).await.unwrap();

    let stored = desk.service.get_ticket(ticket.id()).await.unwrap();
    assert_eq!(stored.category(), ticket.category());
    assert_eq!(stored.category().name, "Hardware");

    let listed = desk
        .service
        .list_tickets(&TicketFilter::default(), PageRequest::new(1, 10))
        .await
        .unwrap();
    assert_eq!(listed.items[0].category().name, "Hardware");

    let later = desk.service.create_ticket(new_ticket("Second dock", Priority::Medium)).await.unwrap();
    assert_eq!(later.category().name, "Devices & Peripherals");
}

#[tokio::test]
async fn satisfaction_only_once_after_resolution() {
    let desk = desk();
    let ticket = desk.service.create_ticket(new_ticket("Password reset", Priority::Medium)).await.unwrap();

    assert!(matches!(
        desk.service.submit_satisfaction(ticket.id(), 5, None).await,
        Err(DeskError::InvalidState(_))
    ));

    desk.service.transition_status(ticket.id(), TicketStatus::Resolved, &agent(), None).await.unwrap();
    desk.service.submit_satisfaction(ticket.id(), 5, Some("Thanks".into())).await.unwrap();
    assert!(matches!(
        desk.service.submit_satisfaction(ticket.id(), 3, None).await,
        Err(DeskError::InvalidState(_))
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transitions_on_one_ticket_keep_the_chain() {
    let desk = desk();
    let ticket = desk.service.create_ticket(new_ticket("Shared drive slow", Priority::High)).await.unwrap();

    let targets = [
        TicketStatus::Assigned,
        TicketStatus::InProgress,
        TicketStatus::PendingUser,
        TicketStatus::InProgress,
        TicketStatus::Assigned,
        TicketStatus::PendingUser,
        TicketStatus::InProgress,
        TicketStatus::Assigned,
    ];

    let mut handles = Vec::new();
    for (n, target) in targets.into_iter().cycle().take(32).enumerate() {
        let service = Arc::clone(&desk.service);
        let id = ticket.id().clone();
        handles.push(tokio::spawn(async move {
            let actor = ActorId::new(format!("staff-{:03}", n));
            service.transition_status(&id, target, &actor, None).await.is_ok()
        }));
    }

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap() {
            succeeded += 1;
        }
    }

    let stored = desk.service.get_ticket(ticket.id()).await.unwrap();
    assert!(succeeded > 0);
    assert_eq!(stored.status_history().len(), succeeded);
    assert!(stored.history_is_consistent());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_comments_are_all_kept() {
    let desk = desk();
    let ticket = desk.service.create_ticket(new_ticket("Teams audio", Priority::Medium)).await.unwrap();

    let handles: Vec<_> = (0..20)
        .map(|n| {
            let service = Arc::clone(&desk.service);
            let id = ticket.id().clone();
            tokio::spawn(async move {
                service
                    .add_comment(&id, &ActorId::new("user-100"), format!("update {}", n), n % 2 == 0)
                    .await
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let stored = desk.service.get_ticket(ticket.id()).await.unwrap();
    assert_eq!(stored.comments().len(), 20);
    assert_eq!(stored.public_comments().count(), 10);
    assert_eq!(stored.status(), TicketStatus::New);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn ticket_ids_are_unique_under_concurrent_creation() {
    let desk = desk();

    let handles: Vec<_> = (0..25)
        .map(|n| {
            let service = Arc::clone(&desk.service);
            tokio::spawn(async move { service.create_ticket(new_ticket(&format!("Bulk {}", n), Priority::Low)).await })
        })
        .collect();

    let mut ids = Vec::new();
    for handle in handles {
        ids.push(handle.await.unwrap().unwrap().id().clone());
    }
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 25);
    assert_eq!(ids.last().map(|id| id.as_str()), Some("TKT-2026-0025"));
}
