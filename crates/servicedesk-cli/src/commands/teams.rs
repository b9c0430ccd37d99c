//! Team commands

use anyhow::Result;
use colored::Colorize;

use servicedesk_core::{ActorId, TeamRole, TeamUseCases};

use super::Context;
use crate::TeamCommands;

pub async fn handle(action: TeamCommands, ctx: &Context) -> Result<()> {
    let teams = &ctx.desk.team_service;

    match action {
        TeamCommands::List => {
            let list = teams.list_teams().await?;
            ctx.format.print(&list)?;
        }
        TeamCommands::Create { name, description } => {
            let team = teams.create_team(name, description).await?;
            ctx.desk.save()?;
            eprintln!("{} team {}", "Created".green(), team.id());
            ctx.format.print(&team)?;
        }
        TeamCommands::AddMember { team, user, leader } => {
            let role = if leader { TeamRole::Leader } else { TeamRole::Member };
            let team = teams.add_member(&team, &ActorId::new(user), role).await?;
            ctx.desk.save()?;
            ctx.format.print(&team)?;
        }
        TeamCommands::RemoveMember { team, user } => {
            let team = teams.remove_member(&team, &ActorId::new(user)).await?;
            ctx.desk.save()?;
            ctx.format.print(&team)?;
        }
    }
    Ok(())
}
