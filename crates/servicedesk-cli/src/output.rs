//! Output formatting

use anyhow::Result;
use clap::ValueEnum;
use serde::Serialize;
use tabled::builder::Builder;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use servicedesk_core::{AgentPerformance, Comment, Page, SlaConfig, Team, Ticket, TicketAnalytics};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

/// Human-readable rendering used by `--format table`.
pub trait TableView {
    fn render_table(&self) -> String;
}

impl OutputFormat {
    pub fn print<T: Serialize + TableView>(&self, data: &T) -> Result<()> {
        match self {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(data)?),
            OutputFormat::Table => println!("{}", data.render_table()),
        }
        Ok(())
    }
}

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Tabled)]
struct TicketRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Title")]
    title: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Category")]
    category: String,
    #[tabled(rename = "Assignee")]
    assignee: String,
    #[tabled(rename = "Resolve By")]
    resolve_by: String,
    #[tabled(rename = "SLA")]
    sla: String,
}

impl From<&Ticket> for TicketRow {
    fn from(ticket: &Ticket) -> Self {
        Self {
            id: ticket.id().to_string(),
            title: truncate(ticket.title(), 40),
            status: ticket.status().to_string(),
            priority: ticket.priority().to_string(),
            category: ticket.category().name.clone(),
            assignee: ticket.assignee_id().map(ToString::to_string).unwrap_or_else(|| "-".into()),
            resolve_by: ticket.sla_resolution_deadline().format(TIME_FORMAT).to_string(),
            sla: if ticket.sla_breached() { "BREACHED".into() } else { "ok".into() },
        }
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

fn key_value_table(rows: Vec<(String, String)>) -> String {
    let mut builder = Builder::default();
    for (key, value) in rows {
        builder.push_record([key, value]);
    }
    builder.build().with(Style::modern()).to_string()
}

fn optional<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".into())
}

impl TableView for Ticket {
    fn render_table(&self) -> String {
        let mut rows = vec![
            ("ID".to_string(), self.id().to_string()),
            ("Title".into(), self.title().to_string()),
            ("Status".into(), self.status().to_string()),
            ("Priority".into(), self.priority().to_string()),
            ("Category".into(), self.category().name.clone()),
            ("Requester".into(), self.requester_id().to_string()),
            ("Assignee".into(), optional(self.assignee_id())),
            ("Team".into(), optional(self.team_id())),
            ("Created".into(), self.created_at().format(TIME_FORMAT).to_string()),
            ("Respond By".into(), self.sla_response_deadline().format(TIME_FORMAT).to_string()),
            ("Resolve By".into(), self.sla_resolution_deadline().format(TIME_FORMAT).to_string()),
            ("SLA Breached".into(), self.sla_breached().to_string()),
            ("Resolved".into(), optional(self.resolved_at().map(|t| t.format(TIME_FORMAT)))),
            ("Closed".into(), optional(self.closed_at().map(|t| t.format(TIME_FORMAT)))),
        ];
        if let Some(rating) = self.satisfaction() {
            rows.push(("Satisfaction".into(), format!("{}/5", rating.rating)));
        }

        let mut out = key_value_table(rows);

        if !self.status_history().is_empty() {
            let mut history = Builder::default();
            history.push_record(["When", "From", "To", "By", "Comment"]);
            for change in self.status_history() {
                history.push_record([
                    change.changed_at.format(TIME_FORMAT).to_string(),
                    change.previous_status.to_string(),
                    change.new_status.to_string(),
                    change.changed_by.to_string(),
                    change.comment.clone().unwrap_or_default(),
                ]);
            }
            out.push_str("\n\nHistory\n");
            out.push_str(&history.build().with(Style::modern()).to_string());
        }

        if !self.comments().is_empty() {
            out.push_str("\n\nComments\n");
            out.push_str(&comment_table(self.comments()));
        }

        out
    }
}

fn comment_table(comments: &[Comment]) -> String {
    let mut builder = Builder::default();
    builder.push_record(["When", "Author", "Visibility", "Content"]);
    for comment in comments {
        builder.push_record([
            comment.created_at.format(TIME_FORMAT).to_string(),
            comment.author_id.to_string(),
            if comment.is_internal { "internal".into() } else { "public".into() },
            truncate(&comment.content, 60),
        ]);
    }
    builder.build().with(Style::modern()).to_string()
}

impl TableView for Comment {
    fn render_table(&self) -> String {
        comment_table(std::slice::from_ref(self))
    }
}

impl TableView for Page<Ticket> {
    fn render_table(&self) -> String {
        let rows: Vec<TicketRow> = self.items.iter().map(TicketRow::from).collect();
        format!(
            "{}\npage {}/{} ({} tickets)",
            Table::new(rows).with(Style::modern()),
            self.page,
            self.total_pages.max(1),
            self.total
        )
    }
}

impl TableView for TicketAnalytics {
    fn render_table(&self) -> String {
        let mut rows = vec![
            ("Total".to_string(), self.total.to_string()),
            ("Open".into(), self.open.to_string()),
            ("Resolved/Closed".into(), self.finished.to_string()),
            ("SLA Breached".into(), self.breached.to_string()),
            (
                "SLA Compliance".into(),
                optional(self.sla_compliance_rate.map(|r| format!("{:.1}%", r * 100.0))),
            ),
            (
                "Avg Resolution".into(),
                optional(self.average_resolution_hours.map(|h| format!("{:.1}h", h))),
            ),
            (
                "Avg Satisfaction".into(),
                optional(self.average_satisfaction.map(|s| format!("{:.2}", s))),
            ),
        ];
        for (status, count) in &self.by_status {
            rows.push((format!("status: {}", status), count.to_string()));
        }
        for (priority, count) in &self.by_priority {
            rows.push((format!("priority: {}", priority), count.to_string()));
        }
        for entry in &self.by_category {
            rows.push((format!("category: {}", entry.category), entry.count.to_string()));
        }
        key_value_table(rows)
    }
}

#[derive(Tabled)]
struct AgentRow {
    #[tabled(rename = "Agent")]
    agent: String,
    #[tabled(rename = "Assigned")]
    assigned: usize,
    #[tabled(rename = "Resolved")]
    resolved: usize,
    #[tabled(rename = "Avg Resolution")]
    average_resolution: String,
    #[tabled(rename = "Avg Satisfaction")]
    average_satisfaction: String,
}

impl TableView for Vec<AgentPerformance> {
    fn render_table(&self) -> String {
        let rows: Vec<AgentRow> = self
            .iter()
            .map(|a| AgentRow {
                agent: a.agent_id.clone(),
                assigned: a.assigned,
                resolved: a.resolved,
                average_resolution: optional(a.average_resolution_hours.map(|h| format!("{:.1}h", h))),
                average_satisfaction: optional(a.average_satisfaction.map(|s| format!("{:.2}", s))),
            })
            .collect();
        Table::new(rows).with(Style::modern()).to_string()
    }
}

#[derive(Tabled)]
struct SlaRow {
    #[tabled(rename = "Priority")]
    priority: String,
    #[tabled(rename = "Respond Within")]
    response: String,
    #[tabled(rename = "Resolve Within")]
    resolution: String,
    #[tabled(rename = "Description")]
    description: String,
}

impl TableView for Vec<SlaConfig> {
    fn render_table(&self) -> String {
        let rows: Vec<SlaRow> = self
            .iter()
            .map(|c| SlaRow {
                priority: c.priority.to_string(),
                response: format!("{}h", c.response_time_hours),
                resolution: format!("{}h", c.resolution_time_hours),
                description: c.description.clone().unwrap_or_default(),
            })
            .collect();
        Table::new(rows).with(Style::modern()).to_string()
    }
}

#[derive(Tabled)]
struct TeamRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Leader")]
    leader: String,
    #[tabled(rename = "Members")]
    members: usize,
}

impl From<&Team> for TeamRow {
    fn from(team: &Team) -> Self {
        Self {
            id: team.id().to_string(),
            name: team.name().to_string(),
            leader: optional(team.leader().map(|m| m.user_id.to_string())),
            members: team.member_count(),
        }
    }
}

impl TableView for Team {
    fn render_table(&self) -> String {
        Table::new([TeamRow::from(self)]).with(Style::modern()).to_string()
    }
}

impl TableView for Vec<Team> {
    fn render_table(&self) -> String {
        let rows: Vec<TeamRow> = self.iter().map(TeamRow::from).collect();
        Table::new(rows).with(Style::modern()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_long_titles() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long ticket title", 10).chars().count(), 10);
    }

    #[test]
    fn test_sla_table_lists_every_priority() {
        let table = SlaConfig::defaults().render_table();
        for priority in ["urgent", "high", "medium", "low"] {
            assert!(table.contains(priority));
        }
    }
}
