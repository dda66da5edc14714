//! Postgres-backed inventory store.
//!
//! Every write runs in a transaction. The item row is locked (`FOR UPDATE`)
//! before its stock is read, so a movement's decision and its writes see the
//! same stock; the per-year code counter row is locked by its upsert, so code
//! allocation is serialized per year and rolled back together with a failed
//! insert.
//!
//! ## Error Mapping
//!
//! | SQLx Error | PostgreSQL Error Code | StoreError |
//! |------------|----------------------|------------|
//! | Database (unique violation) | `23505` | `Conflict` |
//! | Database (foreign key violation) | `23503` | `Conflict` |
//! | Database (check constraint violation) | `23514` | `Corrupt` |
//! | Database (serialization failure / deadlock) | `40001` / `40P01` | `Unavailable` |
//! | Database (other) | Any other | `Unavailable` |
//! | PoolClosed / PoolTimedOut / Io / Tls | N/A | `Unavailable` |
//! | ColumnDecode / Decode | N/A | `Corrupt` |

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use tracing::instrument;

use stockroom_core::{CategoryId, ItemId, MovementId, UserId};
use stockroom_inventory::{
    Category, InternalCode, Item, ItemPatch, ItemStatus, Movement, MovementRequest, MovementType, StockChange,
};

use super::r#trait::{CreatedItem, InventoryStore, ItemDraft, MovementQuery, StoreError, StoreResult};

const MIGRATION: &str = include_str!("../../migrations/0001_inventory.sql");

const CATEGORY_COLUMNS: &str = "id, name, description, icon, created_at";

const ITEM_COLUMNS: &str = "id, code_year, code_sequence, name, description, category_id, serial_number, \
     current_stock, min_stock, status, location, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, item_id, user_id, kind, quantity, previous_stock, new_stock, sequence, \
     destination, observation, created_at";

/// Postgres-backed inventory store.
///
/// Uses an SQLx connection pool, so it is cheap to clone and `Send + Sync`.
#[derive(Debug, Clone)]
pub struct PostgresInventoryStore {
    pool: Arc<PgPool>,
}

impl PostgresInventoryStore {
    /// Create a store on an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool: Arc::new(pool) }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the schema if it does not exist yet.
    #[instrument(skip(self), err)]
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::raw_sql(MIGRATION)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    async fn begin(&self) -> StoreResult<Transaction<'static, Postgres>> {
        self.pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_transaction", e))
    }
}

async fn commit(tx: Transaction<'_, Postgres>) -> StoreResult<()> {
    tx.commit()
        .await
        .map_err(|e| map_sqlx_error("commit_transaction", e))
}

async fn category_exists(tx: &mut Transaction<'_, Postgres>, id: CategoryId) -> StoreResult<bool> {
    // FOR SHARE keeps the category from being deleted until the item lands.
    let row = sqlx::query("SELECT 1 FROM categories WHERE id = $1 FOR SHARE")
        .bind(id.as_uuid())
        .fetch_optional(&mut **tx)
        .await
        .map_err(|e| map_sqlx_error("category_exists", e))?;
    Ok(row.is_some())
}

/// Lock an item row and return it with its movement count.
async fn lock_item(tx: &mut Transaction<'_, Postgres>, id: ItemId) -> StoreResult<Option<(Item, u64)>> {
    let row = sqlx::query(&format!(
        "SELECT {ITEM_COLUMNS}, movement_count FROM items WHERE id = $1 FOR UPDATE"
    ))
    .bind(id.as_uuid())
    .fetch_optional(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("lock_item", e))?;

    match row {
        Some(row) => {
            let count: i64 = row
                .try_get("movement_count")
                .map_err(|e| map_sqlx_error("lock_item", e))?;
            let count = u64::try_from(count)
                .map_err(|_| StoreError::Corrupt(format!("item {id} has a negative movement count")))?;
            Ok(Some((item_from_row(&row)?, count)))
        }
        None => Ok(None),
    }
}

async fn insert_movement(tx: &mut Transaction<'_, Postgres>, movement: &Movement) -> StoreResult<()> {
    sqlx::query(
        r#"
        INSERT INTO movements (
            id, item_id, user_id, kind, quantity, previous_stock, new_stock,
            sequence, destination, observation, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(movement.id.as_uuid())
    .bind(movement.item_id.as_uuid())
    .bind(movement.user_id.as_uuid())
    .bind(movement.kind.as_str())
    .bind(movement.quantity)
    .bind(movement.previous_stock)
    .bind(movement.new_stock)
    .bind(movement.sequence as i64)
    .bind(&movement.destination)
    .bind(&movement.observation)
    .bind(movement.created_at)
    .execute(&mut **tx)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;
    Ok(())
}

#[async_trait::async_trait]
impl InventoryStore for PostgresInventoryStore {
    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn insert_category(&self, category: Category) -> StoreResult<Category> {
        sqlx::query("INSERT INTO categories (id, name, description, icon, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(&category.description)
            .bind(&category.icon)
            .bind(category.created_at)
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("category '{}' already exists", category.name))
                } else {
                    map_sqlx_error("insert_category", e)
                }
            })?;
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let row = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_category", e))?;
        row.as_ref().map(category_from_row).transpose()
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let rows = sqlx::query(&format!("SELECT {CATEGORY_COLUMNS} FROM categories ORDER BY lower(name)"))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_categories", e))?;
        rows.iter().map(category_from_row).collect()
    }

    #[instrument(skip(self, category), fields(category_id = %category.id), err)]
    async fn update_category(&self, category: Category) -> StoreResult<Category> {
        let result = sqlx::query("UPDATE categories SET name = $2, description = $3, icon = $4 WHERE id = $1")
            .bind(category.id.as_uuid())
            .bind(&category.name)
            .bind(&category.description)
            .bind(&category.icon)
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    StoreError::Conflict(format!("category '{}' already exists", category.name))
                } else {
                    map_sqlx_error("update_category", e)
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category"));
        }
        Ok(category)
    }

    #[instrument(skip(self), fields(category_id = %id), err)]
    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM categories WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&*self.pool)
            .await
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    StoreError::Conflict("category still has items".to_string())
                } else {
                    map_sqlx_error("delete_category", e)
                }
            })?;
        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("category"));
        }
        Ok(())
    }

    #[instrument(skip(self, draft), fields(item_id = %draft.id, category_id = %draft.new_item.category_id), err)]
    async fn create_item(&self, draft: ItemDraft) -> StoreResult<CreatedItem> {
        draft.new_item.validate()?;
        let mut tx = self.begin().await?;

        if !category_exists(&mut tx, draft.new_item.category_id).await? {
            return Err(StoreError::not_found("category"));
        }

        // The upsert holds the counter row lock until commit; a rollback releases
        // the code again.
        let year = draft.created_at.year();
        let row = sqlx::query(
            r#"
            INSERT INTO item_code_counters (year, last_sequence)
            VALUES ($1, 1)
            ON CONFLICT (year) DO UPDATE SET last_sequence = item_code_counters.last_sequence + 1
            RETURNING last_sequence
            "#,
        )
        .bind(year)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("allocate_code", e))?;
        let sequence: i32 = row
            .try_get("last_sequence")
            .map_err(|e| map_sqlx_error("allocate_code", e))?;
        let sequence = u32::try_from(sequence)
            .map_err(|_| StoreError::Corrupt(format!("code counter for {year} is negative")))?;
        let code = InternalCode::new(year, sequence)?;

        let item = draft.new_item.into_item(draft.id, code, draft.created_at)?;
        let opening = Movement::opening(&item, draft.created_by, &draft.opening_note);

        sqlx::query(&format!(
            "INSERT INTO items ({ITEM_COLUMNS}, movement_count) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)"
        ))
        .bind(item.id.as_uuid())
        .bind(code.year())
        .bind(code.sequence() as i32)
        .bind(&item.name)
        .bind(&item.description)
        .bind(item.category_id.as_uuid())
        .bind(&item.serial_number)
        .bind(item.current_stock)
        .bind(item.min_stock)
        .bind(item.status.as_str())
        .bind(&item.location)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(i64::from(opening.is_some()))
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("insert_item", e))?;

        if let Some(movement) = &opening {
            insert_movement(&mut tx, movement).await?;
        }

        commit(tx).await?;
        Ok(CreatedItem { item, opening })
    }

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let row = sqlx::query(&format!("SELECT {ITEM_COLUMNS} FROM items WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_item", e))?;
        row.as_ref().map(item_from_row).transpose()
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items ORDER BY code_year, code_sequence"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_items", e))?;
        rows.iter().map(item_from_row).collect()
    }

    #[instrument(skip(self, patch), fields(item_id = %id), err)]
    async fn update_item(&self, id: ItemId, patch: &ItemPatch, at: DateTime<Utc>) -> StoreResult<Item> {
        let mut tx = self.begin().await?;
        if let Some(category_id) = patch.category_id {
            if !category_exists(&mut tx, category_id).await? {
                return Err(StoreError::not_found("category"));
            }
        }

        let (item, _) = lock_item(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::not_found("item"))?;
        let updated = patch.apply_to(&item, at)?;

        sqlx::query(
            r#"
            UPDATE items
            SET name = $2, description = $3, category_id = $4, serial_number = $5,
                min_stock = $6, status = $7, location = $8, updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(updated.id.as_uuid())
        .bind(&updated.name)
        .bind(&updated.description)
        .bind(updated.category_id.as_uuid())
        .bind(&updated.serial_number)
        .bind(updated.min_stock)
        .bind(updated.status.as_str())
        .bind(&updated.location)
        .bind(updated.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_item", e))?;

        commit(tx).await?;
        Ok(updated)
    }

    #[instrument(skip(self), fields(item_id = %id), err)]
    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        let mut tx = self.begin().await?;
        let (item, movement_count) = lock_item(&mut tx, id)
            .await?
            .ok_or_else(|| StoreError::not_found("item"))?;
        if movement_count > 0 {
            return Err(StoreError::Conflict(format!(
                "item {} has {movement_count} recorded movements",
                item.internal_code
            )));
        }

        sqlx::query("DELETE FROM items WHERE id = $1")
            .bind(id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| map_sqlx_error("delete_item", e))?;
        commit(tx).await
    }

    #[instrument(
        skip(self, request),
        fields(item_id = %request.item_id, kind = %request.kind, quantity = request.quantity),
        err
    )]
    async fn record_movement(&self, request: &MovementRequest, at: DateTime<Utc>) -> StoreResult<Movement> {
        let mut tx = self.begin().await?;
        let (item, movement_count) = lock_item(&mut tx, request.item_id)
            .await?
            .ok_or_else(|| StoreError::not_found("item"))?;

        // Dropping `tx` on an early return rolls it back.
        let change = StockChange::plan(item.current_stock, request.kind, request.quantity)?;
        let movement = Movement::record(request, change, movement_count + 1, at);
        insert_movement(&mut tx, &movement).await?;

        sqlx::query(
            "UPDATE items SET current_stock = $2, movement_count = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(item.id.as_uuid())
        .bind(change.new_stock)
        .bind(movement.sequence as i64)
        .bind(at)
        .execute(&mut *tx)
        .await
        .map_err(|e| map_sqlx_error("update_stock", e))?;

        commit(tx).await?;
        Ok(movement)
    }

    async fn list_movements(&self, query: MovementQuery) -> StoreResult<Vec<Movement>> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements \
             WHERE ($1::uuid IS NULL OR item_id = $1) \
             ORDER BY log_position DESC \
             LIMIT $2"
        ))
        .bind(query.item_id.map(|id| *id.as_uuid()))
        .bind(query.limit.map(|limit| i64::try_from(limit).unwrap_or(i64::MAX)))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;
        rows.iter().map(movement_from_row).collect()
    }

    async fn item_movements(&self, id: ItemId) -> StoreResult<Vec<Movement>> {
        let rows = sqlx::query(&format!(
            "SELECT {MOVEMENT_COLUMNS} FROM movements WHERE item_id = $1 ORDER BY sequence ASC"
        ))
        .bind(id.as_uuid())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("item_movements", e))?;
        rows.iter().map(movement_from_row).collect()
    }

    async fn low_stock(&self) -> StoreResult<Vec<Item>> {
        let rows = sqlx::query(&format!(
            "SELECT {ITEM_COLUMNS} FROM items WHERE current_stock <= min_stock ORDER BY code_year, code_sequence"
        ))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("low_stock", e))?;
        rows.iter().map(item_from_row).collect()
    }
}

// Row mapping

fn category_from_row(row: &PgRow) -> StoreResult<Category> {
    let read = |e| map_sqlx_error("read_category", e);
    Ok(Category {
        id: CategoryId::from_uuid(row.try_get("id").map_err(read)?),
        name: row.try_get("name").map_err(read)?,
        description: row.try_get("description").map_err(read)?,
        icon: row.try_get("icon").map_err(read)?,
        created_at: row.try_get("created_at").map_err(read)?,
    })
}

fn item_from_row(row: &PgRow) -> StoreResult<Item> {
    let read = |e| map_sqlx_error("read_item", e);
    let id = ItemId::from_uuid(row.try_get("id").map_err(read)?);

    let year: i32 = row.try_get("code_year").map_err(read)?;
    let sequence: i32 = row.try_get("code_sequence").map_err(read)?;
    let internal_code = u32::try_from(sequence)
        .ok()
        .and_then(|sequence| InternalCode::new(year, sequence).ok())
        .ok_or_else(|| StoreError::Corrupt(format!("item {id} has invalid code {year}-{sequence}")))?;

    let status: String = row.try_get("status").map_err(read)?;
    let status: ItemStatus = status
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("item {id} has unknown status '{status}'")))?;

    Ok(Item {
        id,
        internal_code,
        name: row.try_get("name").map_err(read)?,
        description: row.try_get("description").map_err(read)?,
        category_id: CategoryId::from_uuid(row.try_get("category_id").map_err(read)?),
        serial_number: row.try_get("serial_number").map_err(read)?,
        current_stock: row.try_get("current_stock").map_err(read)?,
        min_stock: row.try_get("min_stock").map_err(read)?,
        status,
        location: row.try_get("location").map_err(read)?,
        created_at: row.try_get("created_at").map_err(read)?,
        updated_at: row.try_get("updated_at").map_err(read)?,
    })
}

fn movement_from_row(row: &PgRow) -> StoreResult<Movement> {
    let read = |e| map_sqlx_error("read_movement", e);
    let id = MovementId::from_uuid(row.try_get("id").map_err(read)?);

    let kind: String = row.try_get("kind").map_err(read)?;
    let kind: MovementType = kind
        .parse()
        .map_err(|_| StoreError::Corrupt(format!("movement {id} has unknown type '{kind}'")))?;
    let sequence: i64 = row.try_get("sequence").map_err(read)?;
    let sequence = u64::try_from(sequence)
        .map_err(|_| StoreError::Corrupt(format!("movement {id} has negative sequence")))?;

    Ok(Movement {
        id,
        item_id: ItemId::from_uuid(row.try_get("item_id").map_err(read)?),
        user_id: UserId::from_uuid(row.try_get("user_id").map_err(read)?),
        kind,
        quantity: row.try_get("quantity").map_err(read)?,
        previous_stock: row.try_get("previous_stock").map_err(read)?,
        new_stock: row.try_get("new_stock").map_err(read)?,
        sequence,
        destination: row.try_get("destination").map_err(read)?,
        observation: row.try_get("observation").map_err(read)?,
        created_at: row.try_get("created_at").map_err(read)?,
    })
}

/// Map SQLx errors to StoreError.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") | Some("23503") => StoreError::Conflict(msg),
                Some("23514") => StoreError::Corrupt(msg),
                _ => StoreError::Unavailable(msg),
            }
        }
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::Decode(_) | sqlx::Error::ColumnNotFound(_) => {
            StoreError::Corrupt(format!("undecodable row in {}: {}", operation, err))
        }
        sqlx::Error::RowNotFound => StoreError::not_found("row"),
        _ => StoreError::Unavailable(format!("sqlx error in {}: {}", operation, err)),
    }
}

fn has_code(err: &sqlx::Error, expected: &str) -> bool {
    if let sqlx::Error::Database(db_err) = err {
        if let Some(code) = db_err.code() {
            return code.as_ref() == expected;
        }
    }
    false
}

/// Check if an error is a unique constraint violation.
fn is_unique_violation(err: &sqlx::Error) -> bool {
    has_code(err, "23505")
}

fn is_foreign_key_violation(err: &sqlx::Error) -> bool {
    has_code(err, "23503")
}

#[cfg(test)]
mod tests {
    //! The `#[ignore]`d tests need a scratch database:
    //! `DATABASE_URL=postgres://... cargo test -p stockroom-infra -- --ignored`

    use std::collections::HashSet;

    use stockroom_inventory::{NewCategory, NewItem};

    use super::*;
    use crate::config::LedgerConfig;
    use crate::ledger::{LedgerError, StockLedger};

    type Ledger = StockLedger<PostgresInventoryStore>;

    async fn connect() -> Option<Ledger> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let store = PostgresInventoryStore::connect(&url, 20).await.expect("connect");
        store.migrate().await.expect("migrate");
        Some(StockLedger::new(store, LedgerConfig::default()))
    }

    async fn category(ledger: &Ledger, prefix: &str) -> CategoryId {
        ledger
            .create_category(NewCategory {
                name: format!("{prefix} {}", CategoryId::new()),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    #[test]
    fn driver_errors_map_onto_store_errors() {
        assert!(matches!(
            map_sqlx_error("get_item", sqlx::Error::RowNotFound),
            StoreError::NotFound { entity: "row" }
        ));
        assert!(matches!(
            map_sqlx_error("begin_transaction", sqlx::Error::PoolTimedOut),
            StoreError::Unavailable(_)
        ));
        assert!(matches!(
            map_sqlx_error("list_items", sqlx::Error::ColumnNotFound("status".to_string())),
            StoreError::Corrupt(_)
        ));
        assert!(!is_unique_violation(&sqlx::Error::PoolClosed));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "needs DATABASE_URL"]
    async fn concurrent_creations_get_distinct_codes() {
        let Some(ledger) = connect().await else { return };
        let ledger = Arc::new(ledger);
        let category_id = category(&ledger, "Laptops").await;

        let mut handles = Vec::new();
        for i in 0..30 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let mut new_item = NewItem::new(format!("Laptop {i}"), category_id);
                new_item.initial_stock = 1;
                ledger.create_item(UserId::new(), new_item).await
            }));
        }

        let mut codes = HashSet::new();
        for handle in handles {
            let item = handle.await.unwrap().unwrap();
            assert!(codes.insert(item.internal_code), "duplicate code {}", item.internal_code);
            assert_eq!(ledger.audit_item(item.id).await.unwrap().derived_stock, 1);
        }
        assert_eq!(codes.len(), 30);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    #[ignore = "needs DATABASE_URL"]
    async fn concurrent_outflows_never_oversell() {
        let Some(ledger) = connect().await else { return };
        let ledger = Arc::new(ledger);
        let category_id = category(&ledger, "Consumables").await;
        let mut new_item = NewItem::new("Toner", category_id);
        new_item.initial_stock = 10;
        let toner_id = ledger.create_item(UserId::new(), new_item).await.unwrap().id;

        let mut handles = Vec::new();
        for _ in 0..30 {
            let ledger = ledger.clone();
            handles.push(tokio::spawn(async move {
                let request = MovementRequest::new(toner_id, UserId::new(), MovementType::Outflow, 1);
                ledger.record_movement(&request).await
            }));
        }

        let mut accepted = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => accepted += 1,
                Err(LedgerError::InsufficientStock { available: 0, requested: 1 }) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }

        assert_eq!(accepted, 10);
        let audit = ledger.audit_item(toner_id).await.unwrap();
        assert_eq!(audit.current_stock, 0);
        assert!(audit.consistent);
        assert_eq!(audit.movement_count, 11);
    }

    #[tokio::test]
    #[ignore = "needs DATABASE_URL"]
    async fn movement_rows_cannot_be_rewritten() {
        let Some(ledger) = connect().await else { return };
        let category_id = category(&ledger, "Cables").await;
        let mut new_item = NewItem::new("HDMI", category_id);
        new_item.initial_stock = 3;
        let item = ledger.create_item(UserId::new(), new_item).await.unwrap();
        let opening = ledger.list_movements(Some(item.id), None).await.unwrap();

        let err = sqlx::query("UPDATE movements SET observation = 'edited' WHERE id = $1")
            .bind(opening[0].id.as_uuid())
            .execute(&*ledger.store().pool)
            .await
            .unwrap_err();
        assert!(matches!(map_sqlx_error("update_movement", err), StoreError::Corrupt(_)));

        let err = ledger.delete_item(item.id).await.unwrap_err();
        assert!(matches!(err, LedgerError::Conflict(_)));
    }
}
