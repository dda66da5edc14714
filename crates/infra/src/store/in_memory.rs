use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

use chrono::{DateTime, Datelike, Utc};

use stockroom_core::{CategoryId, Entity, ItemId};
use stockroom_inventory::{Category, InternalCode, Item, ItemPatch, Movement, MovementRequest, StockChange};

use super::r#trait::{CreatedItem, InventoryStore, ItemDraft, MovementQuery, StoreError, StoreResult};

#[derive(Debug)]
struct ItemSlot {
    item: Item,
    movement_count: u64,
    /// Set when the item is deleted while a writer still holds the slot.
    removed: bool,
}

/// In-memory inventory store.
///
/// Intended for tests/dev. Locks are always taken in the order
/// `categories -> items -> item slot -> code counters -> movements`.
/// Each item has its own slot mutex, so movements on different items only meet
/// at the (brief) append to the shared log.
#[derive(Debug, Default)]
pub struct InMemoryInventoryStore {
    categories: RwLock<HashMap<CategoryId, Category>>,
    items: RwLock<HashMap<ItemId, Arc<Mutex<ItemSlot>>>>,
    code_counters: Mutex<HashMap<i32, u32>>,
    movements: RwLock<Vec<Movement>>,
}

fn poisoned<T>(_: T) -> StoreError {
    StoreError::Unavailable("lock poisoned".to_string())
}

impl InMemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn name_taken(categories: &HashMap<CategoryId, Category>, name: &str, except: Option<CategoryId>) -> bool {
        let wanted = name.to_lowercase();
        categories
            .values()
            .any(|c| Some(c.id) != except && c.name.to_lowercase() == wanted)
    }

    fn slot(&self, id: ItemId) -> StoreResult<Option<Arc<Mutex<ItemSlot>>>> {
        let items = self.items.read().map_err(poisoned)?;
        Ok(items.get(&id).cloned())
    }

    fn insert_category_sync(&self, category: Category) -> StoreResult<Category> {
        let mut categories = self.categories.write().map_err(poisoned)?;
        if Self::name_taken(&categories, &category.name, None) {
            return Err(StoreError::Conflict(format!("category '{}' already exists", category.name)));
        }
        categories.insert(category.id(), category.clone());
        Ok(category)
    }

    fn update_category_sync(&self, category: Category) -> StoreResult<Category> {
        let mut categories = self.categories.write().map_err(poisoned)?;
        if !categories.contains_key(&category.id) {
            return Err(StoreError::not_found("category"));
        }
        if Self::name_taken(&categories, &category.name, Some(category.id)) {
            return Err(StoreError::Conflict(format!("category '{}' already exists", category.name)));
        }
        categories.insert(category.id(), category.clone());
        Ok(category)
    }

    fn delete_category_sync(&self, id: CategoryId) -> StoreResult<()> {
        let mut categories = self.categories.write().map_err(poisoned)?;
        if !categories.contains_key(&id) {
            return Err(StoreError::not_found("category"));
        }
        let items = self.items.read().map_err(poisoned)?;
        for slot in items.values() {
            let slot = slot.lock().map_err(poisoned)?;
            if slot.item.category_id == id {
                return Err(StoreError::Conflict("category still has items".to_string()));
            }
        }
        categories.remove(&id);
        Ok(())
    }

    fn create_item_sync(&self, draft: ItemDraft) -> StoreResult<CreatedItem> {
        let categories = self.categories.read().map_err(poisoned)?;
        if !categories.contains_key(&draft.new_item.category_id) {
            return Err(StoreError::not_found("category"));
        }
        draft.new_item.validate()?;

        let mut items = self.items.write().map_err(poisoned)?;
        if items.contains_key(&draft.id) {
            return Err(StoreError::Conflict(format!("item {} already exists", draft.id)));
        }

        let mut counters = self.code_counters.lock().map_err(poisoned)?;
        let year = draft.created_at.year();
        let code = match counters.get(&year) {
            Some(last) => InternalCode::new(year, *last)?.next()?,
            None => InternalCode::first(year)?,
        };

        let item = draft.new_item.into_item(draft.id, code, draft.created_at)?;
        let opening = Movement::opening(&item, draft.created_by, &draft.opening_note);

        let mut movements = self.movements.write().map_err(poisoned)?;

        // Nothing below can fail: the code is consumed only together with the insert.
        counters.insert(year, code.sequence());
        if let Some(movement) = &opening {
            movements.push(movement.clone());
        }
        items.insert(
            item.id(),
            Arc::new(Mutex::new(ItemSlot {
                item: item.clone(),
                movement_count: u64::from(opening.is_some()),
                removed: false,
            })),
        );

        Ok(CreatedItem { item, opening })
    }

    fn update_item_sync(&self, id: ItemId, patch: &ItemPatch, at: DateTime<Utc>) -> StoreResult<Item> {
        let categories = self.categories.read().map_err(poisoned)?;
        if let Some(category_id) = patch.category_id {
            if !categories.contains_key(&category_id) {
                return Err(StoreError::not_found("category"));
            }
        }

        let slot = self.slot(id)?.ok_or_else(|| StoreError::not_found("item"))?;
        let mut slot = slot.lock().map_err(poisoned)?;
        if slot.removed {
            return Err(StoreError::not_found("item"));
        }
        let updated = patch.apply_to(&slot.item, at)?;
        slot.item = updated.clone();
        Ok(updated)
    }

    fn delete_item_sync(&self, id: ItemId) -> StoreResult<()> {
        let mut items = self.items.write().map_err(poisoned)?;
        let slot = items.get(&id).cloned().ok_or_else(|| StoreError::not_found("item"))?;
        let mut slot = slot.lock().map_err(poisoned)?;
        if slot.movement_count > 0 {
            return Err(StoreError::Conflict(format!(
                "item {} has {} recorded movements",
                slot.item.internal_code, slot.movement_count
            )));
        }
        slot.removed = true;
        items.remove(&id);
        Ok(())
    }

    fn record_movement_sync(&self, request: &MovementRequest, at: DateTime<Utc>) -> StoreResult<Movement> {
        let slot = self
            .slot(request.item_id)?
            .ok_or_else(|| StoreError::not_found("item"))?;
        let mut slot = slot.lock().map_err(poisoned)?;
        if slot.removed {
            return Err(StoreError::not_found("item"));
        }

        let change = StockChange::plan(slot.item.current_stock, request.kind, request.quantity)?;
        let movement = Movement::record(request, change, slot.movement_count + 1, at);

        self.movements.write().map_err(poisoned)?.push(movement.clone());
        slot.item.current_stock = change.new_stock;
        slot.item.updated_at = at;
        slot.movement_count += 1;

        Ok(movement)
    }
}

#[async_trait::async_trait]
impl InventoryStore for InMemoryInventoryStore {
    async fn insert_category(&self, category: Category) -> StoreResult<Category> {
        self.insert_category_sync(category)
    }

    async fn get_category(&self, id: CategoryId) -> StoreResult<Option<Category>> {
        let categories = self.categories.read().map_err(poisoned)?;
        Ok(categories.get(&id).cloned())
    }

    async fn list_categories(&self) -> StoreResult<Vec<Category>> {
        let categories = self.categories.read().map_err(poisoned)?;
        let mut out: Vec<Category> = categories.values().cloned().collect();
        out.sort_by(|a, b| a.name.to_lowercase().cmp(&b.name.to_lowercase()));
        Ok(out)
    }

    async fn update_category(&self, category: Category) -> StoreResult<Category> {
        self.update_category_sync(category)
    }

    async fn delete_category(&self, id: CategoryId) -> StoreResult<()> {
        self.delete_category_sync(id)
    }

    async fn create_item(&self, draft: ItemDraft) -> StoreResult<CreatedItem> {
        self.create_item_sync(draft)
    }

    async fn get_item(&self, id: ItemId) -> StoreResult<Option<Item>> {
        let Some(slot) = self.slot(id)? else {
            return Ok(None);
        };
        let slot = slot.lock().map_err(poisoned)?;
        Ok((!slot.removed).then(|| slot.item.clone()))
    }

    async fn list_items(&self) -> StoreResult<Vec<Item>> {
        let items = self.items.read().map_err(poisoned)?;
        let mut out = Vec::with_capacity(items.len());
        for slot in items.values() {
            out.push(slot.lock().map_err(poisoned)?.item.clone());
        }
        out.sort_by_key(|item| item.internal_code);
        Ok(out)
    }

    async fn update_item(&self, id: ItemId, patch: &ItemPatch, at: DateTime<Utc>) -> StoreResult<Item> {
        self.update_item_sync(id, patch, at)
    }

    async fn delete_item(&self, id: ItemId) -> StoreResult<()> {
        self.delete_item_sync(id)
    }

    async fn record_movement(&self, request: &MovementRequest, at: DateTime<Utc>) -> StoreResult<Movement> {
        self.record_movement_sync(request, at)
    }

    async fn list_movements(&self, query: MovementQuery) -> StoreResult<Vec<Movement>> {
        let movements = self.movements.read().map_err(poisoned)?;
        Ok(movements
            .iter()
            .rev()
            .filter(|m| query.item_id.is_none_or(|id| m.item_id == id))
            .take(query.limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn item_movements(&self, id: ItemId) -> StoreResult<Vec<Movement>> {
        let movements = self.movements.read().map_err(poisoned)?;
        let mut out: Vec<Movement> = movements.iter().filter(|m| m.item_id == id).cloned().collect();
        out.sort_by_key(|m| m.sequence);
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use stockroom_core::{DomainError, UserId};
    use stockroom_inventory::{MovementType, NewCategory, NewItem};

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap()
            .block_on(fut)
    }

    fn category(store: &InMemoryInventoryStore, name: &str) -> Category {
        let category = NewCategory {
            name: name.to_string(),
            ..Default::default()
        }
        .into_category(CategoryId::new(), Utc::now())
        .unwrap();
        block_on(store.insert_category(category)).unwrap()
    }

    fn draft(category_id: CategoryId, stock: i64) -> ItemDraft {
        let mut new_item = NewItem::new("Keyboard", category_id);
        new_item.initial_stock = stock;
        ItemDraft {
            id: ItemId::new(),
            new_item,
            created_by: UserId::new(),
            created_at: Utc::now(),
            opening_note: "Opening stock".to_string(),
        }
    }

    #[test]
    fn category_names_are_unique_ignoring_case() {
        let store = InMemoryInventoryStore::new();
        category(&store, "Peripherals");
        let dup = NewCategory {
            name: "PERIPHERALS".to_string(),
            ..Default::default()
        }
        .into_category(CategoryId::new(), Utc::now())
        .unwrap();
        assert!(matches!(
            block_on(store.insert_category(dup)),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn create_item_allocates_sequential_codes() {
        let store = InMemoryInventoryStore::new();
        let cat = category(&store, "Network");
        let first = block_on(store.create_item(draft(cat.id, 0))).unwrap();
        let second = block_on(store.create_item(draft(cat.id, 4))).unwrap();

        assert_eq!(first.item.internal_code.sequence(), 1);
        assert_eq!(second.item.internal_code.sequence(), 2);
        assert!(first.opening.is_none());
        assert_eq!(second.opening.as_ref().map(|m| m.new_stock), Some(4));
    }

    #[test]
    fn failed_insert_does_not_consume_a_code() {
        let store = InMemoryInventoryStore::new();
        let cat = category(&store, "Network");
        let mut bad = draft(cat.id, 0);
        bad.new_item.name = "   ".to_string();
        assert!(matches!(
            block_on(store.create_item(bad)),
            Err(StoreError::Domain(DomainError::Validation(_)))
        ));

        let created = block_on(store.create_item(draft(cat.id, 0))).unwrap();
        assert_eq!(created.item.internal_code.sequence(), 1);
    }

    #[test]
    fn unknown_category_is_not_found() {
        let store = InMemoryInventoryStore::new();
        assert!(matches!(
            block_on(store.create_item(draft(CategoryId::new(), 0))),
            Err(StoreError::NotFound { entity: "category" })
        ));
    }

    #[test]
    fn movement_updates_stock_and_sequence() {
        let store = InMemoryInventoryStore::new();
        let cat = category(&store, "Network");
        let created = block_on(store.create_item(draft(cat.id, 5))).unwrap();
        let req = MovementRequest::new(created.item.id, UserId::new(), MovementType::Outflow, 2);

        let movement = block_on(store.record_movement(&req, Utc::now())).unwrap();
        assert_eq!((movement.previous_stock, movement.new_stock, movement.sequence), (5, 3, 2));

        let item = block_on(store.get_item(created.item.id)).unwrap().unwrap();
        assert_eq!(item.current_stock, 3);
    }

    #[test]
    fn rejected_outflow_writes_nothing() {
        let store = InMemoryInventoryStore::new();
        let cat = category(&store, "Network");
        let created = block_on(store.create_item(draft(cat.id, 1))).unwrap();
        let req = MovementRequest::new(created.item.id, UserId::new(), MovementType::Outflow, 2);

        let err = block_on(store.record_movement(&req, Utc::now())).unwrap_err();
        assert!(matches!(
            err,
            StoreError::Domain(DomainError::InsufficientStock { available: 1, requested: 2 })
        ));
        assert_eq!(block_on(store.item_movements(created.item.id)).unwrap().len(), 1);
    }

    #[test]
    fn delete_is_restricted_by_references() {
        let store = InMemoryInventoryStore::new();
        let cat = category(&store, "Network");
        let stocked = block_on(store.create_item(draft(cat.id, 2))).unwrap();
        let empty = block_on(store.create_item(draft(cat.id, 0))).unwrap();

        assert!(matches!(
            block_on(store.delete_item(stocked.item.id)),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            block_on(store.delete_category(cat.id)),
            Err(StoreError::Conflict(_))
        ));

        block_on(store.delete_item(empty.item.id)).unwrap();
        assert!(block_on(store.get_item(empty.item.id)).unwrap().is_none());
    }

    #[test]
    fn movement_log_is_newest_first() {
        let store = InMemoryInventoryStore::new();
        let cat = category(&store, "Network");
        let created = block_on(store.create_item(draft(cat.id, 10))).unwrap();
        for qty in [1, 2, 3] {
            let req = MovementRequest::new(created.item.id, UserId::new(), MovementType::Outflow, qty);
            block_on(store.record_movement(&req, Utc::now())).unwrap();
        }

        let log = block_on(store.list_movements(MovementQuery {
            item_id: Some(created.item.id),
            limit: Some(2),
        }))
        .unwrap();
        let sequences: Vec<u64> = log.iter().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![4, 3]);
    }
}
