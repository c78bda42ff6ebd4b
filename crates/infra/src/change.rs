use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillsync_core::{ProductCode, SaleId};
use tillsync_inventory::StockMovement;
use tillsync_products::Product;
use tillsync_sales::SalesRecord;

/// Row-level change on one of the three ledger tables.
///
/// Insert/update variants carry the full row after the change so consumers
/// can treat them as upserts; delete variants carry only the key. Movement
/// rows are append-only, so they only ever appear as inserts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "table", content = "row")]
pub enum RowChange {
    ProductInserted(Product),
    ProductUpdated(Product),
    ProductDeleted(ProductCode),
    MovementInserted(StockMovement),
    SaleInserted(SalesRecord),
    SaleUpdated(SalesRecord),
    SaleDeleted(SaleId),
}

/// A committed row change, stamped with its position in commit order.
///
/// `seq` is global across tables and monotonically increasing: all writes
/// of one transaction get consecutive numbers and no later transaction's
/// writes interleave with them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub seq: u64,
    pub committed_at: DateTime<Utc>,
    pub change: RowChange,
}

impl ChangeEvent {
    /// Product code the change belongs to, when the variant carries one.
    pub fn product_code(&self) -> Option<&ProductCode> {
        match &self.change {
            RowChange::ProductInserted(p) | RowChange::ProductUpdated(p) => Some(p.code()),
            RowChange::ProductDeleted(code) => Some(code),
            RowChange::MovementInserted(m) => Some(m.product_code()),
            RowChange::SaleInserted(s) | RowChange::SaleUpdated(s) => Some(s.product_code()),
            RowChange::SaleDeleted(_) => None,
        }
    }
}
