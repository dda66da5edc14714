use std::sync::Arc;

use chrono::{DateTime, Utc};
use thiserror::Error;

use stockroom_core::{CategoryId, DomainError, ItemId, UserId};
use stockroom_inventory::{Category, Item, ItemPatch, Movement, MovementRequest, NewItem};

/// Store operation error.
///
/// Infrastructure failures (`Unavailable`, `Corrupt`) sit next to the outcomes of
/// decisions the store has to make inside its own lock scope (`Domain`, e.g. an
/// outflow that exceeds the locked stock).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// Unique key clash or a delete blocked by a referencing row.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Retryable infrastructure failure; nothing was written.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Persisted data does not decode into a valid domain record.
    #[error("corrupt record: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Everything the store needs to create an item; the internal code is allocated
/// inside the store, in the same atomic unit as the insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemDraft {
    pub id: ItemId,
    pub new_item: NewItem,
    /// Actor credited with the opening-stock movement.
    pub created_by: UserId,
    pub created_at: DateTime<Utc>,
    /// Observation recorded on the opening-stock movement.
    pub opening_note: String,
}

/// Result of an item creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedItem {
    pub item: Item,
    /// Inflow accounting for the opening stock (absent when it is zero).
    pub opening: Option<Movement>,
}

/// Filter for the movement log.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct MovementQuery {
    pub item_id: Option<ItemId>,
    pub limit: Option<usize>,
}

/// Catalog + ledger persistence boundary.
///
/// Implementations must guarantee:
/// - code allocation and item insert are one atomic unit; codes per year are
///   unique and contiguous (a failed insert does not consume a code)
/// - `record_movement` reads the item's stock in the same lock scope/transaction
///   that writes the movement and the new stock; both writes land or neither does
/// - movements on the same item are serialized, different items do not contend
/// - movements are never updated or deleted
/// - an item with movements cannot be deleted, nor a category with items
#[async_trait::async_trait]
pub trait InventoryStore: Send + Sync {
    async fn insert_category(&self, category: Category) -> StoreResult<Category>;

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>>;

    /// All categories ordered by name.
    async fn list_categories(&self) -> StoreResult<Vec<Category>>;

    /// Replace an existing category (name stays unique).
    async fn update_category(&self, category: Category) -> StoreResult<Category>;

    async fn delete_category(&self, id: CategoryId) -> StoreResult<()>;

    /// Allocate the next internal code for the draft's year and insert the item
    /// together with its opening movement.
    async fn create_item(&self, draft: ItemDraft) -> StoreResult<CreatedItem>;

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>>;

    /// All items ordered by internal code.
    async fn list_items(&self) -> StoreResult<Vec<Item>>;

    /// Apply a descriptive edit under the item's lock. Never touches stock.
    async fn update_item(&self, id: ItemId, patch: &ItemPatch, at: DateTime<Utc>) -> StoreResult<Item>;

    async fn delete_item(&self, id: ItemId) -> StoreResult<()>;

    /// Decide and persist one movement atomically.
    async fn record_movement(&self, request: &MovementRequest, at: DateTime<Utc>) -> StoreResult<Movement>;

    /// Movement log, newest first.
    async fn list_movements(&self, query: MovementQuery) -> StoreResult<Vec<Movement>>;

    /// One item's movement chain in sequence order.
    async fn item_movements(&self, id: ItemId) -> StoreResult<Vec<Movement>>;

    /// Items whose stock is at or below their minimum, ordered by internal code.
    async fn low_stock(&self) -> StoreResult<Vec<Item>> {
        Ok(self
            .list_items()
            .await?
            .into_iter()
            .filter(Item::is_low_stock)
            .collect())
    }
}

#[async_trait::async_trait]
impl<S> InventoryStore for Arc<S>
where
    S: InventoryStore + ?Sized,
{
    async fn insert_category(&self, category: Category) -> StoreResult<Category> {
        (**self).insert_category(category).await
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        (**self).get_category(id).await
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        (**self).list_categories().await
    }

    async fn update_category(&self, category: Category) -> StoreResult<Category> {
        (**self).update_category(category).await
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        (**self).delete_category(id).await
    }

    async fn create_item(&self, draft: ItemDraft) -> StoreResult<CreatedItem> {
        (**self).create_item(draft).await
    }

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        (**self).get_item(id).await
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        (**self).list_items().await
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch, at: DateTime<Utc>) -> StoreResult<Item> {
        (**self).update_item(id, patch, at).await
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        (**self).delete_item(id).await
    }

    async fn record_movement(&self, request: &MovementRequest, at: DateTime<Utc>) -> StoreResult<Movement> {
        (**self).record_movement(request, at).await
    }

    async fn list_movements(&self, query: MovementQuery) -> StoreResult<Vec<Movement>> {
        (**self).list_movements(query).await
    }

    async fn item_movements(&self, id: ItemId) -> StoreResult<Vec<Movement>> {
        (**self).item_movements(id).await
    }

    async fn low_stock(&self) -> StoreResult<Vec<Item>> {
        (**self).low_stock().await
    }
}
