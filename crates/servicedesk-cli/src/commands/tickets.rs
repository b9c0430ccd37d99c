//! Ticket commands

use anyhow::Result;
use colored::Colorize;

use servicedesk_core::{ActorId, CreateTicketCommand, PageRequest, TicketFilter, TicketId, TicketUseCases};

use super::Context;
use crate::Commands;

pub async fn handle(command: Commands, ctx: &Context) -> Result<()> {
    let service = &ctx.desk.service;

    match command {
        Commands::Create {
            title,
            description,
            priority,
            category,
            requester,
            channel,
        } => {
            let mut request = CreateTicketCommand::new(title, description, priority, category, requester);
            request.channel = channel.into();

            let ticket = service.create_ticket(request).await?;
            ctx.desk.save()?;
            eprintln!("{} {}", "Created".green(), ticket.id());
            ctx.format.print(&ticket)?;
        }
        Commands::Show { id } => {
            let ticket = service.get_ticket(&TicketId::from_string(id)).await?;
            ctx.format.print(&ticket)?;
        }
        Commands::List {
            status,
            priority,
            keyword,
            requester,
            assignee,
            team,
            category,
            page,
            page_size,
        } => {
            let mut filter = TicketFilter::new().with_statuses(status).with_priorities(priority);
            filter.keyword = keyword;
            filter.requester_id = requester.map(ActorId::new);
            filter.assignee_id = assignee.map(ActorId::new);
            filter.team_id = team;
            filter.category_id = category;

            let page_size = page_size.unwrap_or(ctx.desk.config.pagination.default_page_size);
            let result = service.list_tickets(&filter, PageRequest::new(page, page_size)).await?;
            ctx.format.print(&result)?;
        }
        Commands::Transition { id, status, comment } => {
            let ticket = service
                .transition_status(&TicketId::from_string(id), status, &ctx.actor, comment)
                .await?;
            ctx.desk.save()?;
            eprintln!("{} {} is now {}", "Updated".green(), ticket.id(), ticket.status());
            if ticket.sla_breached() {
                eprintln!("{}", "Resolution deadline was missed".yellow());
            }
            ctx.format.print(&ticket)?;
        }
        Commands::Comment { id, text, internal } => {
            let comment = service
                .add_comment(&TicketId::from_string(id), &ctx.actor, text, internal)
                .await?;
            ctx.desk.save()?;
            ctx.format.print(&comment)?;
        }
        Commands::Assign { id, agent, team } => {
            if agent.is_none() && team.is_none() {
                anyhow::bail!("nothing to assign: pass --agent and/or --team");
            }
            let id = TicketId::from_string(id);

            let mut ticket = None;
            if let Some(agent) = agent {
                ticket = Some(service.assign_ticket(&id, &ActorId::new(agent), &ctx.actor).await?);
            }
            if let Some(team) = team {
                ticket = Some(service.assign_team(&id, &team, &ctx.actor).await?);
            }
            ctx.desk.save()?;

            if let Some(ticket) = ticket {
                ctx.format.print(&ticket)?;
            }
        }
        Commands::Rate { id, rating, comment } => {
            let id = TicketId::from_string(id);
            service.submit_satisfaction(&id, rating, comment).await?;
            ctx.desk.save()?;
            eprintln!("{} {} rated {}/5", "Recorded".green(), id, rating);
        }
        Commands::Init { .. } | Commands::Stats { .. } | Commands::Sla | Commands::Team { .. } => {
            anyhow::bail!("not a ticket command")
        }
    }
    Ok(())
}
