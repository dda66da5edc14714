//! CSV batch import.
//!
//! Each data row becomes one item creation through the ledger. Rows are
//! independent: a bad row is reported as `"Line N: <reason>"` and the batch
//! carries on. Rows are created one at a time, each in its own atomic store
//! call, so an item is never half-created.

use serde::Serialize;
use tracing::{info, instrument, warn};

use stockroom_core::{CategoryId, UserId};
use stockroom_inventory::csv::{read_records, ImportLayout, ImportRow};

use crate::ledger::{LedgerError, LedgerResult, StockLedger};
use crate::store::InventoryStore;

/// Observation on the inflow that records an imported item's stock.
pub const IMPORT_NOTE: &str = "CSV import";

/// Tally of a batch import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    pub success_count: usize,
    pub errors: Vec<String>,
    /// Column layout the header was read as (`export`, `template`, `fallback`).
    pub layout: &'static str,
}

/// Maps CSV rows onto item creations.
#[derive(Debug)]
pub struct BatchReconciler<'a, S> {
    ledger: &'a StockLedger<S>,
}

impl<'a, S> BatchReconciler<'a, S>
where
    S: InventoryStore,
{
    pub fn new(ledger: &'a StockLedger<S>) -> Self {
        Self { ledger }
    }

    /// Import `raw` into `category_id`, crediting `actor` with the opening stock.
    ///
    /// Fails as a whole only before any row is processed: unknown category
    /// (`NotFound`) or no data rows (`Validation`). A transient store failure
    /// while creating a row is reported against that row like any other.
    #[instrument(skip(self, raw), fields(actor = %actor, category_id = %category_id, bytes = raw.len()), err)]
    pub async fn import(&self, actor: UserId, raw: &str, category_id: CategoryId) -> LedgerResult<ImportReport> {
        self.ledger.get_category(category_id).await?;

        let mut records = read_records(raw).into_iter();
        let header = records
            .next()
            .ok_or_else(|| LedgerError::Validation("file is empty".to_string()))?;
        let data: Vec<_> = records.collect();
        if data.is_empty() {
            return Err(LedgerError::Validation("file has no data rows".to_string()));
        }

        let layout = ImportLayout::detect(&header);
        let mut report = ImportReport {
            success_count: 0,
            errors: Vec::new(),
            layout: layout.label(),
        };

        for record in &data {
            let row = match ImportRow::extract(&layout, record) {
                Ok(row) => row,
                Err(err) => {
                    report.errors.push(format!("Line {}: {err}", record.line));
                    continue;
                }
            };

            let line = row.line;
            match self
                .ledger
                .create_item_noted(actor, row.into_new_item(category_id), IMPORT_NOTE)
                .await
            {
                Ok(_) => report.success_count += 1,
                Err(err) => {
                    if err.is_retryable() {
                        warn!(line, error = %err, "import row hit a transient store failure");
                    }
                    report.errors.push(format!("Line {line}: {err}"));
                }
            }
        }

        info!(
            layout = report.layout,
            rows = data.len(),
            success_count = report.success_count,
            error_count = report.errors.len(),
            "batch import finished"
        );
        Ok(report)
    }
}
