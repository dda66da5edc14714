//! Infrastructure layer: persistence backends, ledger services and configuration.
//!
//! - `store`: the [`InventoryStore`](store::InventoryStore) boundary with in-memory
//!   and Postgres backends
//! - `ledger`: [`StockLedger`](ledger::StockLedger), the only writer of stock
//! - `reconciler`: CSV batch import into the ledger
//! - `config`: environment-driven settings

pub mod config;
pub mod ledger;
pub mod reconciler;
pub mod store;


pub use config::{ConfigError, LedgerConfig};
pub use ledger::{LedgerError, LedgerResult, StockAudit, StockLedger};
pub use reconciler::{BatchReconciler, ImportReport};
pub use store::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, StoreError};
