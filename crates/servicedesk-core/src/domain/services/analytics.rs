//! Ticket analytics domain service
//!
//! Read-only aggregation over a set of tickets for dashboards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use crate::domain::aggregates::Ticket;
use crate::domain::value_objects::{Priority, TicketStatus};

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TicketAnalytics {
    pub total: usize,
    pub open: usize,
    pub finished: usize,
    pub by_status: BTreeMap<TicketStatus, usize>,
    pub by_priority: BTreeMap<Priority, usize>,
    pub by_category: Vec<CategoryCount>,
    pub breached: usize,
    /// Mean hours from creation to first resolution.
    pub average_resolution_hours: Option<f64>,
    /// Share of resolved/closed tickets that met the resolution deadline.
    pub sla_compliance_rate: Option<f64>,
    pub average_satisfaction: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: usize,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgentPerformance {
    pub agent_id: String,
    pub assigned: usize,
    pub resolved: usize,
    pub average_resolution_hours: Option<f64>,
    pub average_satisfaction: Option<f64>,
}

pub struct AnalyticsService;

impl AnalyticsService {
    /// Summarize `tickets`; breach flags are evaluated at `now`.
    pub fn summarize(tickets: &[Ticket], now: DateTime<Utc>) -> TicketAnalytics {
        let mut summary = TicketAnalytics {
            total: tickets.len(),
            ..Default::default()
        };
        let mut categories: HashMap<&str, usize> = HashMap::new();
        let mut compliant = 0usize;

        for ticket in tickets {
            *summary.by_status.entry(ticket.status()).or_default() += 1;
            *summary.by_priority.entry(ticket.priority()).or_default() += 1;
            *categories.entry(ticket.category().name.as_str()).or_default() += 1;

            if ticket.status().is_open() {
                summary.open += 1;
            }

            let breached = crate::domain::services::sla::is_breached(
                ticket.sla_resolution_deadline(),
                ticket.sla_reference_time(now),
            );
            if breached {
                summary.breached += 1;
            }
            if ticket.status().is_resolved() {
                summary.finished += 1;
                if !breached {
                    compliant += 1;
                }
            }
        }

        summary.by_category = categories
            .into_iter()
            .map(|(category, count)| CategoryCount { category: category.to_string(), count })
            .collect();
        summary
            .by_category
            .sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.category.cmp(&b.category)));

        summary.average_resolution_hours = mean(tickets.iter().filter_map(resolution_hours));
        summary.average_satisfaction = mean(
            tickets
                .iter()
                .filter_map(|t| t.satisfaction().map(|s| f64::from(s.rating))),
        );
        if summary.finished > 0 {
            summary.sla_compliance_rate = Some(compliant as f64 / summary.finished as f64);
        }

        summary
    }

    /// Per-assignee workload and outcomes, busiest agent first.
    pub fn agent_performance(tickets: &[Ticket]) -> Vec<AgentPerformance> {
        let mut by_agent: HashMap<&str, Vec<&Ticket>> = HashMap::new();
        for ticket in tickets {
            if let Some(agent) = ticket.assignee_id() {
                by_agent.entry(agent.as_str()).or_default().push(ticket);
            }
        }

        let mut performance: Vec<_> = by_agent
            .into_iter()
            .map(|(agent_id, assigned)| AgentPerformance {
                agent_id: agent_id.to_string(),
                assigned: assigned.len(),
                resolved: assigned.iter().filter(|t| t.status().is_resolved()).count(),
                average_resolution_hours: mean(assigned.iter().copied().filter_map(resolution_hours)),
                average_satisfaction: mean(
                    assigned
                        .iter()
                        .filter_map(|t| t.satisfaction().map(|s| f64::from(s.rating))),
                ),
            })
            .collect();

        performance.sort_by(|a, b| b.resolved.cmp(&a.resolved).then_with(|| a.agent_id.cmp(&b.agent_id)));
        performance
    }
}

fn resolution_hours(ticket: &Ticket) -> Option<f64> {
    ticket
        .resolved_at()
        .map(|resolved| (resolved - ticket.created_at()).num_minutes() as f64 / 60.0)
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}
