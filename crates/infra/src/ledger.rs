//! Stock ledger service.
//!
//! `StockLedger` is the only component that changes an item's stock or creates
//! movements. It validates requests, stamps them with the clock, delegates the
//! atomic decide-and-write step to the [`InventoryStore`] and maps store failures
//! into the [`LedgerError`] taxonomy.
//!
//! ```text
//! request
//!   ↓
//! 1. Validate input (no IO)
//!   ↓
//! 2. Store call, bounded by `operation_timeout`
//!      lock item -> plan stock change -> write movement + stock -> commit
//!   ↓
//! 3. Map errors, log outcome
//! ```

use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use stockroom_core::{CategoryId, DomainError, ItemId, UserId};
use stockroom_inventory::csv::{write_catalog, ExportRow};
use stockroom_inventory::{
    replay, Category, CategoryPatch, Item, ItemPatch, Movement, MovementRequest, NewCategory, NewItem,
};

use crate::config::LedgerConfig;
use crate::reconciler::{BatchReconciler, ImportReport};
use crate::store::{InventoryStore, ItemDraft, MovementQuery, StoreError, StoreResult};

/// Observation on the inflow that records an item's opening stock.
pub const OPENING_STOCK_NOTE: &str = "Opening stock";

/// Ledger-level error taxonomy.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Malformed input (deterministic, not retryable).
    #[error("validation failed: {0}")]
    Validation(String),

    /// An outflow asked for more units than the item holds. Never clamped.
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },

    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate unique key, or delete of a referenced record.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Store unreachable, timed out or aborted the transaction; nothing was written.
    #[error("storage temporarily unavailable: {0}")]
    TransientStorage(String),

    /// Persisted state breaks a ledger invariant (e.g. a broken movement chain).
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl LedgerError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::TransientStorage(_))
    }
}

impl From<DomainError> for LedgerError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::Validation(msg) => LedgerError::Validation(msg),
            DomainError::InvalidId(msg) => LedgerError::Validation(msg),
            DomainError::InsufficientStock { available, requested } => {
                LedgerError::InsufficientStock { available, requested }
            }
            DomainError::InvariantViolation(msg) => LedgerError::InvariantViolation(msg),
        }
    }
}

impl From<StoreError> for LedgerError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::Domain(err) => err.into(),
            StoreError::NotFound { entity } => LedgerError::NotFound(entity.to_string()),
            StoreError::Conflict(msg) => LedgerError::Conflict(msg),
            StoreError::Unavailable(msg) => LedgerError::TransientStorage(msg),
            StoreError::Corrupt(msg) => LedgerError::InvariantViolation(msg),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Result of re-deriving an item's stock from its movement chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StockAudit {
    pub item_id: ItemId,
    pub current_stock: i64,
    pub derived_stock: i64,
    pub movement_count: usize,
    pub consistent: bool,
}

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

/// Stock ledger over an [`InventoryStore`].
#[derive(Clone)]
pub struct StockLedger<S> {
    store: S,
    config: LedgerConfig,
    clock: Clock,
}

impl<S> std::fmt::Debug for StockLedger<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StockLedger")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl<S> StockLedger<S>
where
    S: InventoryStore,
{
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self::with_clock(store, config, Utc::now)
    }

    /// Use `clock` for every timestamp the ledger stamps.
    pub fn with_clock<C>(store: S, config: LedgerConfig, clock: C) -> Self
    where
        C: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        Self {
            store,
            config,
            clock: Arc::new(clock),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    /// Await a store call, giving up after `operation_timeout`.
    ///
    /// Dropping the store future on timeout drops its open transaction, which
    /// rolls it back.
    async fn bounded<T, F>(&self, operation: &'static str, call: F) -> LedgerResult<T>
    where
        F: Future<Output = StoreResult<T>>,
    {
        match tokio::time::timeout(self.config.operation_timeout, call).await {
            Ok(result) => result.map_err(LedgerError::from),
            Err(_) => {
                warn!(
                    operation,
                    timeout_ms = self.config.operation_timeout.as_millis() as u64,
                    "store call timed out"
                );
                Err(LedgerError::TransientStorage(format!(
                    "{operation} timed out after {:?}",
                    self.config.operation_timeout
                )))
            }
        }
    }

    // Categories

    #[instrument(skip(self, input), fields(name = %input.name), err)]
    pub async fn create_category(&self, input: NewCategory) -> LedgerResult<Category> {
        let category = input.into_category(CategoryId::new(), self.now())?;
        let category = self
            .bounded("insert_category", self.store.insert_category(category))
            .await?;
        info!(category_id = %category.id, "category created");
        Ok(category)
    }

    pub async fn get_category(&self, id: CategoryId) -> LedgerResult<Category> {
        self.bounded("get_category", self.store.get_category(id))
            .await?
            .ok_or_else(|| LedgerError::NotFound("category".to_string()))
    }

    pub async fn list_categories(&self) -> LedgerResult<Vec<Category>> {
        self.bounded("list_categories", self.store.list_categories()).await
    }

    #[instrument(skip(self, patch), fields(category_id = %id), err)]
    pub async fn update_category(&self, id: CategoryId, patch: &CategoryPatch) -> LedgerResult<Category> {
        let current = self.get_category(id).await?;
        let updated = patch.apply_to(&current)?;
        self.bounded("update_category", self.store.update_category(updated))
            .await
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    pub async fn delete_category(&self, id: CategoryId) -> LedgerResult<()> {
        self.bounded("delete_category", self.store.delete_category(id))
            .await?;
        info!(category_id = %id, "category deleted");
        Ok(())
    }

    // Items

    /// Create an item; a positive opening stock becomes its first inflow.
    #[instrument(skip(self, input), fields(actor = %actor, category_id = %input.category_id), err)]
    pub async fn create_item(&self, actor: UserId, input: NewItem) -> LedgerResult<Item> {
        self.create_item_noted(actor, input, OPENING_STOCK_NOTE).await
    }

    pub(crate) async fn create_item_noted(&self, actor: UserId, input: NewItem, note: &str) -> LedgerResult<Item> {
        input.validate()?;
        let draft = ItemDraft {
            id: ItemId::new(),
            new_item: input,
            created_by: actor,
            created_at: self.now(),
            opening_note: note.to_string(),
        };
        let created = self.bounded("create_item", self.store.create_item(draft)).await?;
        info!(
            item_id = %created.item.id,
            internal_code = %created.item.internal_code,
            opening_stock = created.item.current_stock,
            "item created"
        );
        Ok(created.item)
    }

    pub async fn get_item(&self, id: ItemId) -> LedgerResult<Item> {
        self.bounded("get_item", self.store.get_item(id))
            .await?
            .ok_or_else(|| LedgerError::NotFound("item".to_string()))
    }

    /// All items ordered by internal code.
    pub async fn list_items(&self) -> LedgerResult<Vec<Item>> {
        self.bounded("list_items", self.store.list_items()).await
    }

    /// Edit descriptive fields. Stock only changes through movements.
    #[instrument(skip(self, patch), fields(item_id = %id), err)]
    pub async fn update_item(&self, id: ItemId, patch: &ItemPatch) -> LedgerResult<Item> {
        let now = self.now();
        self.bounded("update_item", self.store.update_item(id, patch, now))
            .await
    }

    /// Delete an item that has never moved stock. Items with history are
    /// archived by setting their status to `discarded` instead.
    #[instrument(skip(self), fields(item_id = %id), err)]
    pub async fn delete_item(&self, id: ItemId) -> LedgerResult<()> {
        self.bounded("delete_item", self.store.delete_item(id)).await?;
        info!(item_id = %id, "item deleted");
        Ok(())
    }

    // Movements

    /// Record one stock movement.
    ///
    /// Returns the movement with its before/after snapshot. An outflow larger
    /// than the current stock fails with `InsufficientStock` and writes nothing.
    #[instrument(
        skip(self, request),
        fields(item_id = %request.item_id, user_id = %request.user_id, kind = %request.kind, quantity = request.quantity)
    )]
    pub async fn record_movement(&self, request: &MovementRequest) -> LedgerResult<Movement> {
        request.validate()?;
        let at = self.now();
        match self
            .bounded("record_movement", self.store.record_movement(request, at))
            .await
        {
            Ok(movement) => {
                info!(
                    movement_id = %movement.id,
                    previous_stock = movement.previous_stock,
                    new_stock = movement.new_stock,
                    "movement recorded"
                );
                Ok(movement)
            }
            Err(err @ LedgerError::InsufficientStock { available, requested }) => {
                warn!(available, requested, "outflow rejected");
                Err(err)
            }
            Err(err) => {
                warn!(error = %err, "movement failed");
                Err(err)
            }
        }
    }

    /// Movement log, newest first, optionally for one item.
    pub async fn list_movements(&self, item_id: Option<ItemId>, limit: Option<usize>) -> LedgerResult<Vec<Movement>> {
        if let Some(id) = item_id {
            self.get_item(id).await?;
        }
        self.bounded("list_movements", self.store.list_movements(MovementQuery { item_id, limit }))
            .await
    }

    /// Items at or below their minimum stock.
    pub async fn low_stock(&self) -> LedgerResult<Vec<Item>> {
        self.bounded("low_stock", self.store.low_stock()).await
    }

    /// Replay an item's movements from zero and compare with its stored stock.
    ///
    /// A chain that cannot be replayed (gap, bad snapshot) is an
    /// `InvariantViolation`; a chain that replays to a different number comes
    /// back as `consistent: false`.
    #[instrument(skip(self), fields(item_id = %id), err)]
    pub async fn audit_item(&self, id: ItemId) -> LedgerResult<StockAudit> {
        let item = self.get_item(id).await?;
        let movements = self
            .bounded("item_movements", self.store.item_movements(id))
            .await?;
        let derived_stock = replay(&movements)?;

        let audit = StockAudit {
            item_id: id,
            current_stock: item.current_stock,
            derived_stock,
            movement_count: movements.len(),
            consistent: derived_stock == item.current_stock,
        };
        if !audit.consistent {
            warn!(
                current_stock = audit.current_stock,
                derived_stock = audit.derived_stock,
                "stock does not match movement history"
            );
        }
        Ok(audit)
    }

    // CSV

    /// Render the catalog as CSV, ordered by internal code.
    pub async fn export_catalog(&self) -> LedgerResult<String> {
        let categories = self.list_categories().await?;
        let items = self.list_items().await?;

        let rows = items.iter().map(|item| ExportRow {
            item,
            category_name: categories
                .iter()
                .find(|c| c.id == item.category_id)
                .map(|c| c.name.as_str())
                .unwrap_or(""),
        });
        let csv = write_catalog(rows);
        info!(item_count = items.len(), "catalog exported");
        Ok(csv)
    }

    /// Import a CSV batch into `category_id`. See [`BatchReconciler`].
    pub async fn import_batch(&self, actor: UserId, raw: &str, category_id: CategoryId) -> LedgerResult<ImportReport> {
        BatchReconciler::new(self).import(actor, raw, category_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_errors_map_onto_ledger_taxonomy() {
        assert_eq!(
            LedgerError::from(DomainError::insufficient_stock(0, 1)),
            LedgerError::InsufficientStock {
                available: 0,
                requested: 1
            }
        );
        assert!(matches!(
            LedgerError::from(DomainError::invalid_id("x")),
            LedgerError::Validation(_)
        ));
    }

    #[test]
    fn store_errors_map_onto_ledger_taxonomy() {
        assert_eq!(
            LedgerError::from(StoreError::not_found("item")),
            LedgerError::NotFound("item".to_string())
        );
        let transient = LedgerError::from(StoreError::Unavailable("pool timed out".to_string()));
        assert!(transient.is_retryable());
        assert!(matches!(
            LedgerError::from(StoreError::Corrupt("bad row".to_string())),
            LedgerError::InvariantViolation(_)
        ));
        assert!(!LedgerError::Conflict("dup".to_string()).is_retryable());
    }
}
