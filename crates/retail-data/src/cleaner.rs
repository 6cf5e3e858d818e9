//! Row-level validity filter.

use retail_core::models::Transaction;
use serde::Serialize;
use tracing::debug;

/// Counts describing what the cleaner removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningAudit {
    pub input_rows: usize,
    /// Rows dropped because `quantity < 1`.
    pub removed_quantity: usize,
    /// Rows with a valid quantity dropped because `unit_price <= 0`.
    pub removed_price: usize,
    pub retained: usize,
}

impl CleaningAudit {
    pub fn removed(&self) -> usize {
        self.removed_quantity + self.removed_price
    }
}

/// Output of [`clean`]: the retained rows in source order plus the audit.
#[derive(Debug, Clone)]
pub struct CleanedTable {
    pub records: Vec<Transaction>,
    pub audit: CleaningAudit,
}

/// A row is analysable when it sold at least one unit at a positive price.
pub fn is_valid(t: &Transaction) -> bool {
    t.quantity >= 1 && t.unit_price > 0.0
}

/// Keep only rows with `quantity >= 1` and `unit_price > 0`.
///
/// Order is preserved. Returns and cancellations (negative quantities) and
/// free or adjustment lines (non-positive prices) are dropped and counted.
pub fn clean(transactions: Vec<Transaction>) -> CleanedTable {
    let mut audit = CleaningAudit {
        input_rows: transactions.len(),
        ..Default::default()
    };

    let records: Vec<Transaction> = transactions
        .into_iter()
        .filter(|t| {
            if t.quantity < 1 {
                audit.removed_quantity += 1;
                false
            } else if t.unit_price.is_nan() || t.unit_price <= 0.0 {
                audit.removed_price += 1;
                false
            } else {
                true
            }
        })
        .collect();
    audit.retained = records.len();

    debug!(
        "Cleaning kept {} of {} rows ({} bad quantity, {} bad price)",
        audit.retained, audit.input_rows, audit.removed_quantity, audit.removed_price
    );

    CleanedTable { records, audit }
}
