//! Ticket categories
//!
//! The catalog owns `Category` records. Tickets embed a `CategorySnapshot`
//! taken when the category was assigned, so later catalog edits leave
//! historical tickets untouched.

use serde::{Deserialize, Serialize};

/// Catalog entry; at most one level of parenting.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl Category {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: None,
            parent_id: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn snapshot(&self) -> CategorySnapshot {
        CategorySnapshot {
            id: self.id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            parent_id: self.parent_id.clone(),
        }
    }

    /// Catalog shipped with a fresh installation. `cat-008` is the fallback.
    pub fn defaults() -> Vec<Category> {
        vec![
            Category::new("cat-001", "Network").with_description("Network connectivity issues"),
            Category::new("cat-002", "Hardware").with_description("Hardware problems and repairs"),
            Category::new("cat-003", "Software").with_description("Software installation and issues"),
            Category::new("cat-004", "Account").with_description("Account access and permissions"),
            Category::new("cat-005", "Email").with_description("Email system issues"),
            Category::new("cat-006", "Printing").with_description("Printer and printing issues"),
            Category::new("cat-007", "Security").with_description("Security concerns and incidents"),
            Category::new(FALLBACK_CATEGORY_ID, "Other").with_description("Other IT related issues"),
        ]
    }
}

pub const FALLBACK_CATEGORY_ID: &str = "cat-008";

/// Denormalized copy of a category embedded in a ticket.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategorySnapshot {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
}

impl From<&Category> for CategorySnapshot {
    fn from(category: &Category) -> Self {
        category.snapshot()
    }
}
