use serde::{Deserialize, Serialize};

use tillsync_core::{ProductCode, SaleId};
use tillsync_products::Product;
use tillsync_sales::SalesRecord;

/// Incremental state update delivered to one connected client.
///
/// Insert and update both arrive as the full row (`ProductChanged` /
/// `SaleVisible`), so clients can treat them as upserts; removals carry
/// only the key. `SaleVisible` is already filtered for the receiving
/// connection's role; `SaleRemoved` is not filtered because a client never
/// holds a record it was not allowed to see.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "update", content = "data")]
pub enum ClientUpdate {
    ProductChanged(Product),
    ProductRemoved(ProductCode),
    SaleVisible(SalesRecord),
    SaleRemoved(SaleId),
    /// The connection fell behind and its deltas were dropped; the client
    /// must fetch a full snapshot via `SyncHub::resync` before resuming.
    Resync,
}
