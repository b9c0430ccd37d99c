//! SLA policy table
//!
//! Maps a priority to its response/resolution budgets and turns a creation
//! timestamp into deadlines. Budgets are plain wall-clock hours: weekends and
//! holidays count like any other hour.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::domain::value_objects::Priority;

/// One SLA record. At most one active record may exist per priority.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaConfig {
    pub id: String,
    pub priority: Priority,
    pub response_time_hours: u32,
    pub resolution_time_hours: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default = "active_by_default")]
    pub is_active: bool,
}

fn active_by_default() -> bool {
    true
}

impl SlaConfig {
    pub fn new(id: impl Into<String>, priority: Priority, response_time_hours: u32, resolution_time_hours: u32) -> Self {
        Self {
            id: id.into(),
            priority,
            response_time_hours,
            resolution_time_hours,
            description: None,
            is_active: true,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }

    pub fn defaults() -> Vec<SlaConfig> {
        vec![
            SlaConfig::new("sla-001", Priority::Urgent, 1, 4)
                .with_description("Urgent priority - Critical issues requiring immediate attention"),
            SlaConfig::new("sla-002", Priority::High, 4, 8)
                .with_description("High priority - Important issues that need quick resolution"),
            SlaConfig::new("sla-003", Priority::Medium, 8, 24)
                .with_description("Medium priority - Standard issues with normal handling time"),
            SlaConfig::new("sla-004", Priority::Low, 24, 72)
                .with_description("Low priority - Non-urgent issues that can be handled when time permits"),
        ]
    }
}

/// Deadlines fixed at ticket creation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlaDeadlines {
    pub response: DateTime<Utc>,
    pub resolution: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlaError {
    #[error("no active SLA policy for priority {0}")]
    MissingPolicy(Priority),

    #[error("more than one active SLA policy for priority {0}")]
    DuplicatePolicy(Priority),

    #[error("SLA policy {0} resolves before it responds")]
    InvalidHours(String),

    #[error("SLA policy {0} exceeds the {MAX_BUDGET_HOURS} hour budget limit")]
    BudgetTooLarge(String),

    #[error("SLA policy {0} puts a deadline out of range")]
    DeadlineOutOfRange(String),
}

/// Upper bound for a single budget: ten years.
pub const MAX_BUDGET_HOURS: u32 = 24 * 365 * 10;

/// Active SLA records keyed by priority.
#[derive(Clone, Debug)]
pub struct SlaPolicyTable {
    policies: HashMap<Priority, SlaConfig>,
    fallback: Option<Priority>,
}

impl SlaPolicyTable {
    /// Build the table from raw records. Inactive records are skipped.
    pub fn new(configs: impl IntoIterator<Item = SlaConfig>) -> Result<Self, SlaError> {
        let mut policies = HashMap::new();

        for config in configs.into_iter().filter(|c| c.is_active) {
            if config.resolution_time_hours < config.response_time_hours {
                return Err(SlaError::InvalidHours(config.id));
            }
            if config.resolution_time_hours > MAX_BUDGET_HOURS {
                return Err(SlaError::BudgetTooLarge(config.id));
            }
            if policies.contains_key(&config.priority) {
                return Err(SlaError::DuplicatePolicy(config.priority));
            }
            policies.insert(config.priority, config);
        }

        Ok(Self { policies, fallback: None })
    }

    /// Priority whose policy is used when the requested one has none.
    pub fn with_fallback(mut self, priority: Priority) -> Result<Self, SlaError> {
        if !self.policies.contains_key(&priority) {
            return Err(SlaError::MissingPolicy(priority));
        }
        self.fallback = Some(priority);
        Ok(self)
    }

    pub fn fallback(&self) -> Option<Priority> {
        self.fallback
    }

    pub fn policy_for(&self, priority: Priority) -> Option<&SlaConfig> {
        self.policies.get(&priority)
    }

    /// Active policies, most urgent first.
    pub fn policies(&self) -> Vec<&SlaConfig> {
        let mut all: Vec<_> = self.policies.values().collect();
        all.sort_by(|a, b| b.priority.cmp(&a.priority));
        all
    }

    pub fn deadlines_for(&self, priority: Priority, created_at: DateTime<Utc>) -> Result<SlaDeadlines, SlaError> {
        let policy = self
            .policy_for(priority)
            .ok_or(SlaError::MissingPolicy(priority))?;
        Self::compute(policy, created_at)
    }

    /// Like [`deadlines_for`](Self::deadlines_for) but falls back to the
    /// fallback priority's policy before failing.
    pub fn deadlines_or_fallback(&self, priority: Priority, created_at: DateTime<Utc>) -> Result<SlaDeadlines, SlaError> {
        match self.deadlines_for(priority, created_at) {
            Err(err @ SlaError::MissingPolicy(_)) => {
                let fallback = self.fallback.ok_or(err)?;
                tracing::warn!(
                    priority = %priority,
                    fallback = %fallback,
                    "no SLA policy for priority, using fallback policy"
                );
                self.deadlines_for(fallback, created_at)
            }
            other => other,
        }
    }

    fn compute(policy: &SlaConfig, created_at: DateTime<Utc>) -> Result<SlaDeadlines, SlaError> {
        let offset = |hours: u32| {
            created_at
                .checked_add_signed(Duration::hours(i64::from(hours)))
                .ok_or_else(|| SlaError::DeadlineOutOfRange(policy.id.clone()))
        };

        Ok(SlaDeadlines {
            response: offset(policy.response_time_hours)?,
            resolution: offset(policy.resolution_time_hours)?,
        })
    }
}

impl Default for SlaPolicyTable {
    fn default() -> Self {
        let policies = SlaConfig::defaults()
            .into_iter()
            .map(|config| (config.priority, config))
            .collect();
        Self {
            policies,
            fallback: Some(Priority::Medium),
        }
    }
}

/// Breach check against the resolution deadline. `reference` is the
/// resolution/closure time when known, otherwise the current time.
pub fn is_breached(resolution_deadline: DateTime<Utc>, reference: DateTime<Utc>) -> bool {
    reference > resolution_deadline
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn created() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_urgent_deadlines() {
        let table = SlaPolicyTable::new(SlaConfig::defaults()).unwrap();
        let deadlines = table.deadlines_for(Priority::Urgent, created()).unwrap();

        assert_eq!(deadlines.response, created() + Duration::hours(1));
        assert_eq!(deadlines.resolution, created() + Duration::hours(4));
    }

    #[test]
    fn test_deadlines_ignore_weekends() {
        // Friday 2026-01-16 17:00 + 72h lands on Monday 17:00.
        let friday = Utc.with_ymd_and_hms(2026, 1, 16, 17, 0, 0).unwrap();
        let table = SlaPolicyTable::default();
        let deadlines = table.deadlines_for(Priority::Low, friday).unwrap();

        assert_eq!(deadlines.resolution, Utc.with_ymd_and_hms(2026, 1, 19, 17, 0, 0).unwrap());
    }

    #[test]
    fn test_missing_policy() {
        let table = SlaPolicyTable::new(vec![SlaConfig::new("sla-1", Priority::High, 4, 8)]).unwrap();

        assert_eq!(
            table.deadlines_for(Priority::Low, created()),
            Err(SlaError::MissingPolicy(Priority::Low))
        );
        assert_eq!(
            table.deadlines_or_fallback(Priority::Low, created()),
            Err(SlaError::MissingPolicy(Priority::Low))
        );
    }

    #[test]
    fn test_fallback_policy() {
        let table = SlaPolicyTable::new(vec![SlaConfig::new("sla-1", Priority::High, 4, 8)])
            .unwrap()
            .with_fallback(Priority::High)
            .unwrap();

        let deadlines = table.deadlines_or_fallback(Priority::Low, created()).unwrap();
        assert_eq!(deadlines.resolution, created() + Duration::hours(8));
    }

    #[test]
    fn test_fallback_requires_policy() {
        let table = SlaPolicyTable::new(vec![SlaConfig::new("sla-1", Priority::High, 4, 8)]).unwrap();
        assert!(matches!(
            table.with_fallback(Priority::Medium),
            Err(SlaError::MissingPolicy(Priority::Medium))
        ));
    }

    #[test]
    fn test_duplicate_active_policy_rejected() {
        let configs = vec![
            SlaConfig::new("a", Priority::High, 4, 8),
            SlaConfig::new("b", Priority::High, 2, 6),
        ];
        assert_eq!(
            SlaPolicyTable::new(configs).unwrap_err(),
            SlaError::DuplicatePolicy(Priority::High)
        );
    }

    #[test]
    fn test_inactive_policy_ignored() {
        let configs = vec![
            SlaConfig::new("old", Priority::High, 2, 6).inactive(),
            SlaConfig::new("new", Priority::High, 4, 8),
        ];
        let table = SlaPolicyTable::new(configs).unwrap();
        assert_eq!(table.policy_for(Priority::High).unwrap().id, "new");
    }

    #[test]
    fn test_invalid_hours_rejected() {
        let configs = vec![SlaConfig::new("bad", Priority::Low, 10, 5)];
        assert!(matches!(SlaPolicyTable::new(configs), Err(SlaError::InvalidHours(_))));
    }

    #[test]
    fn test_oversized_budget_rejected() {
        let configs = vec![SlaConfig::new("huge", Priority::Medium, 1, u32::MAX)];
        assert_eq!(
            SlaPolicyTable::new(configs).unwrap_err(),
            SlaError::BudgetTooLarge("huge".into())
        );

        let at_limit = vec![SlaConfig::new("decade", Priority::Medium, 1, MAX_BUDGET_HOURS)];
        assert!(SlaPolicyTable::new(at_limit).is_ok());
    }

    #[test]
    fn test_deadline_past_calendar_end_is_an_error() {
        let table = SlaPolicyTable::default();
        let err = table
            .deadlines_or_fallback(Priority::Low, DateTime::<Utc>::MAX_UTC)
            .unwrap_err();
        assert_eq!(err, SlaError::DeadlineOutOfRange("sla-004".into()));
    }

    #[test]
    fn test_policies_ordered_by_urgency() {
        let table = SlaPolicyTable::default();
        let order: Vec<_> = table.policies().iter().map(|p| p.priority).collect();
        assert_eq!(order, vec![Priority::Urgent, Priority::High, Priority::Medium, Priority::Low]);
    }

    #[test]
    fn test_breach_is_strict() {
        let deadline = created();
        assert!(!is_breached(deadline, deadline));
        assert!(is_breached(deadline, deadline + Duration::seconds(1)));
    }
}
