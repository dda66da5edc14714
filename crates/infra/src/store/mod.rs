//! Catalog and movement persistence boundary.
//!
//! The ledger talks to storage only through [`InventoryStore`]. Both backends
//! decide a stock change inside the same lock scope (or transaction) that writes
//! it, so two writers can never act on the same stale stock.

pub mod in_memory;
pub mod postgres;
pub mod r#trait;

pub use in_memory::InMemoryInventoryStore;
pub use postgres::PostgresInventoryStore;
pub use r#trait::{CreatedItem, InventoryStore, ItemDraft, MovementQuery, StoreError, StoreResult};
