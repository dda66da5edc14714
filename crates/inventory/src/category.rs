use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError, DomainResult, Entity};

const MAX_NAME_LEN: usize = 100;

/// Catalog category. Items reference exactly one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    /// Opaque icon token chosen by the UI.
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Entity for Category {
    type Id = CategoryId;

    fn id(&self) -> CategoryId {
        self.id
    }
}

/// Input for creating a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl NewCategory {
    /// Validate and build the category record.
    pub fn into_category(self, id: CategoryId, now: DateTime<Utc>) -> DomainResult<Category> {
        Ok(Category {
            id,
            name: validate_name(&self.name)?,
            description: non_blank(self.description),
            icon: non_blank(self.icon),
            created_at: now,
        })
    }
}

/// Partial update of a category; `None` leaves a field unchanged and an empty
/// string clears an optional one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon: Option<String>,
}

impl CategoryPatch {
    pub fn apply_to(&self, category: &Category) -> DomainResult<Category> {
        let mut updated = category.clone();
        if let Some(name) = &self.name {
            updated.name = validate_name(name)?;
        }
        if let Some(description) = &self.description {
            updated.description = non_blank(Some(description.clone()));
        }
        if let Some(icon) = &self.icon {
            updated.icon = non_blank(Some(icon.clone()));
        }
        Ok(updated)
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("category name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "category name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
