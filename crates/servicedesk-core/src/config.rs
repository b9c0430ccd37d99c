//! Service desk configuration
//!
//! Defaults reproduce a fresh installation: four SLA tiers, the eight-entry
//! category catalog with "Other" as fallback, set-once `resolved_at`, and the
//! liberal transition table.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::domain::services::{LifecycleEngine, ResolvedAtPolicy, SlaConfig, SlaError, SlaPolicyTable, TransitionPolicy};
use crate::domain::value_objects::{Category, Priority, TicketStatus, FALLBACK_CATEGORY_ID};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeskConfig {
    pub sla: SlaSettings,
    pub lifecycle: LifecycleSettings,
    pub categories: CategorySettings,
    pub pagination: PaginationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlaSettings {
    pub policies: Vec<SlaConfig>,
    /// Priority whose policy covers priorities that have none.
    pub fallback_priority: Option<Priority>,
}

impl Default for SlaSettings {
    fn default() -> Self {
        Self {
            policies: SlaConfig::defaults(),
            fallback_priority: Some(Priority::Medium),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LifecycleSettings {
    pub resolved_at_policy: ResolvedAtPolicy,
    /// Explicit transition table. `None` keeps the liberal any-to-any table.
    pub transitions: Option<Vec<TransitionEdge>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionEdge {
    pub from: TicketStatus,
    pub to: Vec<TicketStatus>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategorySettings {
    pub catalog: Vec<Category>,
    pub fallback_id: String,
}

impl Default for CategorySettings {
    fn default() -> Self {
        Self {
            catalog: Category::defaults(),
            fallback_id: FALLBACK_CATEGORY_ID.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationSettings {
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for PaginationSettings {
    fn default() -> Self {
        Self {
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self {
            sla: SlaSettings::default(),
            lifecycle: LifecycleSettings::default(),
            categories: CategorySettings::default(),
            pagination: PaginationSettings::default(),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SLA configuration: {0}")]
    Sla(#[from] SlaError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl DeskConfig {
    /// Load from a `.json` file, or TOML for any other extension.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json_str(&content)?,
            _ => Self::from_toml_str(&content)?,
        };
        tracing::debug!(path = %path.display(), "loaded service desk config");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let pagination = &self.pagination;
        if pagination.max_page_size == 0 {
            return Err(ConfigError::Invalid("max_page_size must be at least 1".into()));
        }
        if pagination.default_page_size == 0 || pagination.default_page_size > pagination.max_page_size {
            return Err(ConfigError::Invalid(format!(
                "default_page_size must be within 1..={}",
                pagination.max_page_size
            )));
        }

        self.sla_table()?;
        self.fallback_category()?;

        for category in &self.categories.catalog {
            let Some(parent_id) = &category.parent_id else { continue };
            let parent = self
                .categories
                .catalog
                .iter()
                .find(|c| &c.id == parent_id)
                .ok_or_else(|| ConfigError::Invalid(format!("category {} has unknown parent {}", category.id, parent_id)))?;
            if parent.parent_id.is_some() {
                return Err(ConfigError::Invalid(format!(
                    "category {} is nested more than one level deep",
                    category.id
                )));
            }
        }

        Ok(())
    }

    pub fn sla_table(&self) -> Result<SlaPolicyTable, ConfigError> {
        let table = SlaPolicyTable::new(self.sla.policies.iter().cloned())?;
        Ok(match self.sla.fallback_priority {
            Some(priority) => table.with_fallback(priority)?,
            None => table,
        })
    }

    pub fn transition_policy(&self) -> TransitionPolicy {
        match &self.lifecycle.transitions {
            Some(edges) => TransitionPolicy::from_edges(
                edges
                    .iter()
                    .flat_map(|edge| edge.to.iter().map(move |to| (edge.from, *to))),
            ),
            None => TransitionPolicy::liberal(),
        }
    }

    pub fn lifecycle_engine(&self) -> LifecycleEngine {
        LifecycleEngine::new(self.transition_policy(), self.lifecycle.resolved_at_policy)
    }

    pub fn fallback_category(&self) -> Result<Category, ConfigError> {
        self.categories
            .catalog
            .iter()
            .find(|c| c.id == self.categories.fallback_id)
            .cloned()
            .ok_or_else(|| {
                ConfigError::Invalid(format!(
                    "fallback category {} is not in the catalog",
                    self.categories.fallback_id
                ))
            })
    }
}
