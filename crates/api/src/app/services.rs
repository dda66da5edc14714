use std::sync::Arc;

use anyhow::Context;

use stockroom_infra::{InMemoryInventoryStore, InventoryStore, PostgresInventoryStore, StockLedger};

use crate::config::ApiConfig;

/// Store behind the ledger, chosen at startup.
pub type DynStore = Arc<dyn InventoryStore>;

pub type Ledger = StockLedger<DynStore>;

/// Shared per-process services handed to every handler.
pub struct AppServices {
    pub ledger: Ledger,
}

impl AppServices {
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// In-memory wiring (dev/test).
    pub fn in_memory(config: &ApiConfig) -> Self {
        let store: DynStore = Arc::new(InMemoryInventoryStore::new());
        Self::new(StockLedger::new(store, config.ledger.clone()))
    }
}

pub async fn build_services(config: &ApiConfig) -> anyhow::Result<AppServices> {
    let Some(database_url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; using in-memory store (data is lost on restart)");
        return Ok(AppServices::in_memory(config));
    };

    let store = PostgresInventoryStore::connect(database_url, config.db_max_connections)
        .await
        .context("failed to connect to Postgres")?;
    store.migrate().await.context("failed to apply schema")?;
    tracing::info!(max_connections = config.db_max_connections, "using Postgres store");

    let store: DynStore = Arc::new(store);
    Ok(AppServices::new(StockLedger::new(store, config.ledger.clone())))
}
