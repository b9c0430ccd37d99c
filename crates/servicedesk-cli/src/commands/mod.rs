//! CLI Commands

pub mod init;
pub mod reports;
pub mod teams;
pub mod tickets;

use anyhow::Result;
use servicedesk_core::ActorId;

use crate::data::Desk;
use crate::output::OutputFormat;
use crate::{Cli, Commands};

/// Everything a handler needs: the opened desk, the acting user and the
/// output format.
pub struct Context {
    pub desk: Desk,
    pub actor: ActorId,
    pub format: OutputFormat,
}

pub async fn run(cli: Cli) -> Result<()> {
    if let Commands::Init { force } = cli.command {
        return init::handle(&cli.data, cli.config.as_deref(), force);
    }

    let config = crate::config::load(cli.config.as_deref())?;
    let ctx = Context {
        desk: Desk::open(&cli.data, config)?,
        actor: ActorId::new(cli.actor),
        format: cli.format,
    };

    dispatch(cli.command, &ctx).await
}

async fn dispatch(command: Commands, ctx: &Context) -> Result<()> {
    match command {
        Commands::Init { .. } => anyhow::bail!("init runs before the data file is opened"),
        Commands::Team { action } => teams::handle(action, ctx).await,
        Commands::Stats { agents } => reports::stats(ctx, agents).await,
        Commands::Sla => reports::sla(ctx),
        command => tickets::handle(command, ctx).await,
    }
}
