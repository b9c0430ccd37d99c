//! Ticket lifecycle engine
//!
//! The only component allowed to change a ticket's status. Allowed moves live
//! in an explicit table so a policy can be audited and tightened without
//! touching the transition code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::domain::aggregates::ticket::{StatusChange, Ticket, TicketError};
use crate::domain::value_objects::{ActorId, TicketStatus};

/// Allowed status transitions, `from -> {to}`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionPolicy {
    edges: HashMap<TicketStatus, HashSet<TicketStatus>>,
}

impl TransitionPolicy {
    /// Any non-terminal status may move to any other status. Terminal
    /// statuses have no outbound edges.
    pub fn liberal() -> Self {
        let edges = TicketStatus::ALL
            .iter()
            .flat_map(|from| TicketStatus::ALL.iter().map(move |to| (*from, *to)));
        Self::from_edges(edges)
    }

    /// Build a table from explicit edges. Self-loops and edges leaving a
    /// terminal status are dropped.
    pub fn from_edges(edges: impl IntoIterator<Item = (TicketStatus, TicketStatus)>) -> Self {
        let mut table: HashMap<TicketStatus, HashSet<TicketStatus>> = HashMap::new();
        for (from, to) in edges {
            if from == to || from.is_terminal() {
                continue;
            }
            table.entry(from).or_default().insert(to);
        }
        Self { edges: table }
    }

    pub fn allows(&self, from: TicketStatus, to: TicketStatus) -> bool {
        self.edges.get(&from).is_some_and(|targets| targets.contains(&to))
    }

    /// Reachable statuses from `from`, in lifecycle order.
    pub fn targets(&self, from: TicketStatus) -> Vec<TicketStatus> {
        let mut targets: Vec<_> = self
            .edges
            .get(&from)
            .map(|t| t.iter().copied().collect())
            .unwrap_or_default();
        targets.sort();
        targets
    }

    /// Validate a move. Terminal sources are rejected first, then no-op
    /// moves, then edges missing from the table.
    pub fn check(&self, from: TicketStatus, to: TicketStatus) -> Result<(), TicketError> {
        if from.is_terminal() {
            return Err(TicketError::InvalidTransition { from, to });
        }
        if from == to {
            return Err(TicketError::NoOpTransition(from));
        }
        if !self.allows(from, to) {
            return Err(TicketError::InvalidTransition { from, to });
        }
        Ok(())
    }
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self::liberal()
    }
}

/// What happens to `resolved_at` when a reopened ticket is resolved again.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedAtPolicy {
    /// First resolution time is kept forever.
    #[default]
    KeepFirst,
    /// Every entry into `resolved` stamps a fresh time.
    OverwriteOnReenter,
}

/// Validates and applies status transitions.
#[derive(Clone, Debug, Default)]
pub struct LifecycleEngine {
    policy: TransitionPolicy,
    resolved_at: ResolvedAtPolicy,
}

impl LifecycleEngine {
    pub fn new(policy: TransitionPolicy, resolved_at: ResolvedAtPolicy) -> Self {
        Self { policy, resolved_at }
    }

    pub fn policy(&self) -> &TransitionPolicy {
        &self.policy
    }

    pub fn resolved_at_policy(&self) -> ResolvedAtPolicy {
        self.resolved_at
    }

    /// Move `ticket` to `to`. Either the whole transition (status, history
    /// entry, timestamps, breach flag) is applied or nothing is.
    pub fn apply_transition(
        &self,
        ticket: &mut Ticket,
        to: TicketStatus,
        actor: &ActorId,
        comment: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<StatusChange, TicketError> {
        self.policy.check(ticket.status(), to)?;
        Ok(ticket.record_transition(to, actor.clone(), comment, now, self.resolved_at))
    }
}
