//! Client-side mirror of the ledger plus the dashboard aggregates
//! derived from it.

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;

use tillsync_core::{ProductCode, SaleId};
use tillsync_products::Product;
use tillsync_sales::SalesRecord;

use crate::hub::SyncSnapshot;
use crate::update::ClientUpdate;

/// Rolling sale counters shown on the dashboard.
///
/// "Today" buckets by the client's local calendar date, not UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DashboardStats {
    pub total_sales: u64,
    pub total_amount: u64,
    pub today_sales: u64,
    pub today_amount: u64,
}

/// In-memory replica one client maintains from a snapshot plus the
/// incremental update feed.
///
/// All updates are upserts or key-removals, so applying a delta that was
/// already folded into the snapshot converges to the same state. The
/// aggregates are adjusted incrementally on every apply; an upsert first
/// backs out the amounts of the replaced record.
#[derive(Debug)]
pub struct ClientState {
    products: HashMap<ProductCode, Product>,
    sales: HashMap<SaleId, SalesRecord>,
    stats: DashboardStats,
    offset: FixedOffset,
    today: NaiveDate,
}

impl ClientState {
    pub fn new(offset: FixedOffset) -> Self {
        let today = Utc::now().with_timezone(&offset).date_naive();
        Self::anchored(offset, today)
    }

    /// Like `new`, but with an explicit "today". The client re-anchors at
    /// local midnight by rebuilding its state from a fresh snapshot.
    pub fn anchored(offset: FixedOffset, today: NaiveDate) -> Self {
        Self {
            products: HashMap::new(),
            sales: HashMap::new(),
            stats: DashboardStats::default(),
            offset,
            today,
        }
    }

    /// Replace the replica with a full snapshot and recompute the stats.
    pub fn load(&mut self, snapshot: SyncSnapshot) {
        self.products = snapshot
            .products
            .into_iter()
            .map(|p| (p.code().clone(), p))
            .collect();
        self.sales = snapshot.sales.into_iter().map(|s| (s.id(), s)).collect();
        self.stats = DashboardStats::default();
        let records: Vec<SalesRecord> = self.sales.values().cloned().collect();
        for sale in &records {
            self.credit(sale);
        }
    }

    /// Fold one incremental update into the replica.
    ///
    /// Returns true when the update is a resync signal, meaning the caller
    /// must fetch a fresh snapshot and `load` it before continuing.
    pub fn apply(&mut self, update: &ClientUpdate) -> bool {
        match update {
            ClientUpdate::ProductChanged(product) => {
                self.products.insert(product.code().clone(), product.clone());
            }
            ClientUpdate::ProductRemoved(code) => {
                self.products.remove(code);
            }
            ClientUpdate::SaleVisible(sale) => {
                if let Some(old) = self.sales.insert(sale.id(), sale.clone()) {
                    self.debit(&old);
                }
                let sale = sale.clone();
                self.credit(&sale);
            }
            ClientUpdate::SaleRemoved(id) => {
                if let Some(old) = self.sales.remove(id) {
                    self.debit(&old);
                }
            }
            ClientUpdate::Resync => return true,
        }
        false
    }

    pub fn stats(&self) -> DashboardStats {
        self.stats
    }

    pub fn product(&self, code: &ProductCode) -> Option<&Product> {
        self.products.get(code)
    }

    pub fn sale(&self, id: SaleId) -> Option<&SalesRecord> {
        self.sales.get(&id)
    }

    pub fn product_count(&self) -> usize {
        self.products.len()
    }

    pub fn sale_count(&self) -> usize {
        self.sales.len()
    }

    /// Products below their minimum stock level.
    pub fn low_stock_products(&self) -> Vec<&Product> {
        self.products
            .values()
            .filter(|p| p.is_below_min_stock())
            .collect()
    }

    fn credit(&mut self, sale: &SalesRecord) {
        self.stats.total_sales += 1;
        self.stats.total_amount = self.stats.total_amount.saturating_add(sale.total_amount());
        if self.is_today(sale.timestamp()) {
            self.stats.today_sales += 1;
            self.stats.today_amount = self.stats.today_amount.saturating_add(sale.total_amount());
        }
    }

    fn debit(&mut self, sale: &SalesRecord) {
        self.stats.total_sales = self.stats.total_sales.saturating_sub(1);
        self.stats.total_amount = self.stats.total_amount.saturating_sub(sale.total_amount());
        if self.is_today(sale.timestamp()) {
            self.stats.today_sales = self.stats.today_sales.saturating_sub(1);
            self.stats.today_amount = self.stats.today_amount.saturating_sub(sale.total_amount());
        }
    }

    fn is_today(&self, timestamp: DateTime<Utc>) -> bool {
        timestamp.with_timezone(&self.offset).date_naive() == self.today
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    use tillsync_core::UserId;
    use tillsync_sales::PaymentMethod;

    fn code(s: &str) -> ProductCode {
        ProductCode::new(s).unwrap()
    }

    fn product(s: &str, stock: i64, min: i64) -> Product {
        Product::new(code(s), format!("{s} name"), stock, min, 100, 150).unwrap()
    }

    fn sale_at(quantity: i64, unit_price: u64, timestamp: DateTime<Utc>) -> SalesRecord {
        SalesRecord::new(
            SaleId::new(),
            code("P1"),
            "Box of 20",
            quantity,
            unit_price,
            "walk-in",
            PaymentMethod::Cash,
            UserId::new(),
            timestamp,
        )
        .unwrap()
    }

    fn lagos() -> FixedOffset {
        FixedOffset::east_opt(3600).unwrap()
    }

    fn noon_today() -> (NaiveDate, DateTime<Utc>) {
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let noon = Utc.with_ymd_and_hms(2026, 3, 14, 12, 0, 0).unwrap();
        (today, noon)
    }

    #[test]
    fn load_recomputes_stats_from_snapshot() {
        let (today, noon) = noon_today();
        let mut state = ClientState::anchored(lagos(), today);
        state.load(SyncSnapshot {
            products: vec![product("P1", 10, 2)],
            sales: vec![sale_at(2, 150, noon), sale_at(1, 150, noon - Duration::days(1))],
        });

        assert_eq!(state.product_count(), 1);
        assert_eq!(state.sale_count(), 2);
        let stats = state.stats();
        assert_eq!(stats.total_sales, 2);
        assert_eq!(stats.total_amount, 450);
        assert_eq!(stats.today_sales, 1);
        assert_eq!(stats.today_amount, 300);
    }

    #[test]
    fn sale_upsert_backs_out_the_replaced_amounts() {
        let (today, noon) = noon_today();
        let mut state = ClientState::anchored(lagos(), today);

        let original = sale_at(2, 150, noon);
        state.apply(&ClientUpdate::SaleVisible(original.clone()));
        assert_eq!(state.stats().total_amount, 300);

        let edited = original.with_quantity_and_price(5, 150).unwrap();
        state.apply(&ClientUpdate::SaleVisible(edited));
        let stats = state.stats();
        assert_eq!(stats.total_sales, 1);
        assert_eq!(stats.total_amount, 750);
        assert_eq!(stats.today_amount, 750);
    }

    #[test]
    fn sale_removal_subtracts_and_unknown_removal_is_ignored() {
        let (today, noon) = noon_today();
        let mut state = ClientState::anchored(lagos(), today);

        let sale = sale_at(2, 150, noon);
        state.apply(&ClientUpdate::SaleVisible(sale.clone()));
        state.apply(&ClientUpdate::SaleRemoved(sale.id()));
        assert_eq!(state.stats(), DashboardStats::default());

        // Removal of a record this client never held must not underflow.
        state.apply(&ClientUpdate::SaleRemoved(SaleId::new()));
        assert_eq!(state.stats(), DashboardStats::default());
    }

    #[test]
    fn today_buckets_by_local_date_not_utc() {
        // 23:30 UTC on the 13th is already the 14th at UTC+1.
        let today = NaiveDate::from_ymd_opt(2026, 3, 14).unwrap();
        let late = Utc.with_ymd_and_hms(2026, 3, 13, 23, 30, 0).unwrap();
        let mut state = ClientState::anchored(lagos(), today);

        state.apply(&ClientUpdate::SaleVisible(sale_at(1, 150, late)));
        let stats = state.stats();
        assert_eq!(stats.total_sales, 1);
        assert_eq!(stats.today_sales, 1);
    }

    #[test]
    fn duplicate_delta_after_snapshot_converges() {
        let (today, noon) = noon_today();
        let mut state = ClientState::anchored(lagos(), today);
        let sale = sale_at(2, 150, noon);

        // Snapshot already contains the sale; the queued delta replays it.
        state.load(SyncSnapshot {
            products: vec![product("P1", 10, 2)],
            sales: vec![sale.clone()],
        });
        state.apply(&ClientUpdate::SaleVisible(sale.clone()));

        assert_eq!(state.sale_count(), 1);
        assert_eq!(state.stats().total_sales, 1);
        assert_eq!(state.stats().total_amount, 300);
    }

    #[test]
    fn product_updates_track_low_stock() {
        let (today, _) = noon_today();
        let mut state = ClientState::anchored(lagos(), today);

        state.apply(&ClientUpdate::ProductChanged(product("P1", 10, 2)));
        assert!(state.low_stock_products().is_empty());

        state.apply(&ClientUpdate::ProductChanged(product("P1", 1, 2)));
        assert_eq!(state.low_stock_products().len(), 1);

        state.apply(&ClientUpdate::ProductRemoved(code("P1")));
        assert_eq!(state.product_count(), 0);
    }

    #[test]
    fn resync_signal_asks_for_a_snapshot() {
        let (today, _) = noon_today();
        let mut state = ClientState::anchored(lagos(), today);
        assert!(state.apply(&ClientUpdate::Resync));
    }
}
