//! Domain services module

pub mod analytics;
pub mod lifecycle;
pub mod sla;

pub use analytics::{AgentPerformance, AnalyticsService, CategoryCount, TicketAnalytics};
pub use lifecycle::{LifecycleEngine, ResolvedAtPolicy, TransitionPolicy};
pub use sla::{SlaConfig, SlaDeadlines, SlaError, SlaPolicyTable, MAX_BUDGET_HOURS};
