//! Analytics and SLA commands

use anyhow::Result;

use servicedesk_core::{SlaConfig, TicketUseCases};

use super::Context;

pub async fn stats(ctx: &Context, agents: bool) -> Result<()> {
    if agents {
        let performance = ctx.desk.service.agent_performance().await?;
        ctx.format.print(&performance)
    } else {
        let analytics = ctx.desk.service.ticket_analytics().await?;
        ctx.format.print(&analytics)
    }
}

/// Active policies, most urgent first.
pub fn sla(ctx: &Context) -> Result<()> {
    let policies: Vec<SlaConfig> = ctx.desk.service.sla_table().policies().into_iter().cloned().collect();
    ctx.format.print(&policies)
}
