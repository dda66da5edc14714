use chrono::{DateTime, Utc};
use core::str::FromStr;
use serde::{Deserialize, Serialize};

use stockroom_core::{CategoryId, DomainError, DomainResult, Entity, ItemId};

use crate::category::non_blank;
use crate::code::InternalCode;

const MAX_NAME_LEN: usize = 200;

/// Lifecycle status of a physical asset. Does not affect stock arithmetic.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Available,
    #[serde(rename = "in-use", alias = "in_use")]
    InUse,
    Maintenance,
    Discarded,
}

impl ItemStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Available => "available",
            ItemStatus::InUse => "in-use",
            ItemStatus::Maintenance => "maintenance",
            ItemStatus::Discarded => "discarded",
        }
    }
}

impl core::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemStatus {
    type Err = DomainError;

    /// Accepts `in_use`, `in-use` and `in use` spellings, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        match normalized.as_str() {
            "available" => Ok(ItemStatus::Available),
            "in_use" => Ok(ItemStatus::InUse),
            "maintenance" => Ok(ItemStatus::Maintenance),
            "discarded" => Ok(ItemStatus::Discarded),
            _ => Err(DomainError::validation(format!(
                "status must be one of: available, in-use, maintenance, discarded (got '{s}')"
            ))),
        }
    }
}

/// Catalog item with its ledger-maintained stock.
///
/// `current_stock` is written only by the stock ledger (opening stock at creation
/// and movements afterwards); direct edits go through [`ItemPatch`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub internal_code: InternalCode,
    pub name: String,
    pub description: Option<String>,
    pub category_id: CategoryId,
    pub serial_number: Option<String>,
    pub current_stock: i64,
    pub min_stock: i64,
    pub status: ItemStatus,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Item {
    /// Stock at or below the advisory threshold.
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock
    }
}

impl Entity for Item {
    type Id = ItemId;

    fn id(&self) -> ItemId {
        self.id
    }
}

/// Input for creating an item. The internal code is allocated by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub category_id: CategoryId,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub status: ItemStatus,
    #[serde(default)]
    pub location: Option<String>,
    /// Opening stock, recorded as the item's first inflow movement when positive.
    #[serde(default)]
    pub initial_stock: i64,
}

impl NewItem {
    pub fn new(name: impl Into<String>, category_id: CategoryId) -> Self {
        Self {
            name: name.into(),
            description: None,
            category_id,
            serial_number: None,
            min_stock: 0,
            status: ItemStatus::Available,
            location: None,
            initial_stock: 0,
        }
    }

    /// Check the input without consuming it (used before a code is allocated).
    pub fn validate(&self) -> DomainResult<()> {
        validate_name(&self.name)?;
        ensure_non_negative("min_stock", self.min_stock)?;
        ensure_non_negative("initial_stock", self.initial_stock)?;
        Ok(())
    }

    /// Build the item record for an allocated code.
    pub fn into_item(self, id: ItemId, internal_code: InternalCode, now: DateTime<Utc>) -> DomainResult<Item> {
        self.validate()?;
        Ok(Item {
            id,
            internal_code,
            name: validate_name(&self.name)?,
            description: non_blank(self.description),
            category_id: self.category_id,
            serial_number: non_blank(self.serial_number),
            current_stock: self.initial_stock,
            min_stock: self.min_stock,
            status: self.status,
            location: non_blank(self.location),
            created_at: now,
            updated_at: now,
        })
    }
}

/// Direct edit of an item's descriptive fields. Stock is not editable here.
///
/// `None` leaves a field unchanged; an empty string clears an optional text field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category_id: Option<CategoryId>,
    #[serde(default)]
    pub serial_number: Option<String>,
    #[serde(default)]
    pub min_stock: Option<i64>,
    #[serde(default)]
    pub status: Option<ItemStatus>,
    #[serde(default)]
    pub location: Option<String>,
}

impl ItemPatch {
    pub fn apply_to(&self, item: &Item, now: DateTime<Utc>) -> DomainResult<Item> {
        let mut updated = item.clone();
        if let Some(name) = &self.name {
            updated.name = validate_name(name)?;
        }
        if let Some(description) = &self.description {
            updated.description = non_blank(Some(description.clone()));
        }
        if let Some(category_id) = self.category_id {
            updated.category_id = category_id;
        }
        if let Some(serial_number) = &self.serial_number {
            updated.serial_number = non_blank(Some(serial_number.clone()));
        }
        if let Some(min_stock) = self.min_stock {
            ensure_non_negative("min_stock", min_stock)?;
            updated.min_stock = min_stock;
        }
        if let Some(status) = self.status {
            updated.status = status;
        }
        if let Some(location) = &self.location {
            updated.location = non_blank(Some(location.clone()));
        }
        updated.updated_at = now;
        Ok(updated)
    }
}

fn validate_name(name: &str) -> DomainResult<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(DomainError::validation("name cannot be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::validation(format!(
            "name cannot exceed {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name.to_string())
}

fn ensure_non_negative(field: &str, value: i64) -> DomainResult<()> {
    if value < 0 {
        return Err(DomainError::validation(format!("{field} cannot be negative")));
    }
    Ok(())
}
