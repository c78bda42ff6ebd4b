//! In-memory ledger store.
//!
//! Intended for tests/dev and the reference deployment. Row locking is
//! real (one mutex per product code), so the executor's serialization and
//! conflict behavior can be exercised with actual thread contention; the
//! `hold_product_lock` hook lets tests force a conflict deterministically.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, TryLockError, mpsc};
use std::time::{Duration, Instant};

use chrono::Utc;

use tillsync_core::{LedgerError, LedgerResult, ProductCode, SaleId};
use tillsync_inventory::StockMovement;
use tillsync_products::Product;
use tillsync_sales::SalesRecord;

use crate::change::{ChangeEvent, RowChange};
use crate::feed::{ChangeFeed, ChangeSubscription};
use crate::store::{LedgerStore, StockTxn, TxnReader, TxnWrite};

const DEFAULT_LOCK_DEADLINE: Duration = Duration::from_millis(200);

#[derive(Debug, Default)]
struct Tables {
    products: HashMap<ProductCode, Product>,
    sales: HashMap<SaleId, SalesRecord>,
    movements: Vec<StockMovement>,
    next_seq: u64,
}

/// In-memory transactional row store with per-product row locks.
#[derive(Debug)]
pub struct MemoryLedgerStore {
    tables: RwLock<Tables>,
    row_locks: Mutex<HashMap<ProductCode, Arc<Mutex<()>>>>,
    feed: ChangeFeed,
    lock_deadline: Duration,
}

impl Default for MemoryLedgerStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryLedgerStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            row_locks: Mutex::new(HashMap::new()),
            feed: ChangeFeed::new(),
            lock_deadline: DEFAULT_LOCK_DEADLINE,
        }
    }

    /// Override how long `with_product_lock` waits for a contended row
    /// before failing with `TransactionConflict`.
    pub fn with_lock_deadline(mut self, deadline: Duration) -> Self {
        self.lock_deadline = deadline;
        self
    }

    fn row_lock(&self, code: &ProductCode) -> Result<Arc<Mutex<()>>, LedgerError> {
        let mut locks = self
            .row_locks
            .lock()
            .map_err(|_| LedgerError::unavailable("row lock registry poisoned"))?;
        Ok(locks.entry(code.clone()).or_default().clone())
    }

    /// Spin on `try_lock` until the deadline; a timeout is a retryable
    /// conflict, not a definitive failure.
    fn acquire<'a>(
        &self,
        lock: &'a Mutex<()>,
        code: &ProductCode,
    ) -> Result<MutexGuard<'a, ()>, LedgerError> {
        let deadline = Instant::now() + self.lock_deadline;
        loop {
            match lock.try_lock() {
                Ok(guard) => return Ok(guard),
                Err(TryLockError::WouldBlock) => {
                    if Instant::now() >= deadline {
                        tracing::warn!(product = %code, "row lock wait timed out; surfacing conflict");
                        return Err(LedgerError::conflict(format!(
                            "lock wait timed out for product {code}"
                        )));
                    }
                    std::thread::sleep(Duration::from_micros(50));
                }
                Err(TryLockError::Poisoned(_)) => {
                    return Err(LedgerError::unavailable("product row lock poisoned"));
                }
            }
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, LedgerError> {
        self.tables
            .read()
            .map_err(|_| LedgerError::unavailable("store tables poisoned"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, LedgerError> {
        self.tables
            .write()
            .map_err(|_| LedgerError::unavailable("store tables poisoned"))
    }

    /// Commit staged writes atomically and publish their change events.
    ///
    /// Validates every write before applying any, so a rejected
    /// transaction leaves the tables untouched. Events are published while
    /// the table lock is still held, which makes feed order equal commit
    /// order across concurrent transactions.
    fn commit(&self, code: &ProductCode, writes: Vec<TxnWrite>) -> Result<(), LedgerError> {
        if writes.is_empty() {
            return Ok(());
        }

        let mut tables = self.write()?;

        for write in &writes {
            match write {
                TxnWrite::SetStock(_) => {
                    if !tables.products.contains_key(code) {
                        return Err(LedgerError::ProductNotFound(code.clone()));
                    }
                }
                TxnWrite::InsertSale(record) => {
                    if tables.sales.contains_key(&record.id()) {
                        return Err(LedgerError::conflict(format!(
                            "sale {} already exists",
                            record.id()
                        )));
                    }
                }
                TxnWrite::UpdateSale(record) => {
                    if !tables.sales.contains_key(&record.id()) {
                        return Err(LedgerError::SaleNotFound);
                    }
                }
                TxnWrite::DeleteSale(id) => {
                    if !tables.sales.contains_key(id) {
                        return Err(LedgerError::SaleNotFound);
                    }
                }
                TxnWrite::InsertMovement(_) => {}
            }
        }

        let committed_at = Utc::now();
        for write in writes {
            let change = match write {
                TxnWrite::SetStock(new_stock) => {
                    // Presence checked above; with_current_stock rejects
                    // anything the txn should not have staged.
                    let current = tables
                        .products
                        .get(code)
                        .ok_or_else(|| LedgerError::ProductNotFound(code.clone()))?;
                    let updated = current.with_current_stock(new_stock)?;
                    tables.products.insert(code.clone(), updated.clone());
                    RowChange::ProductUpdated(updated)
                }
                TxnWrite::InsertSale(record) => {
                    tables.sales.insert(record.id(), record.clone());
                    RowChange::SaleInserted(record)
                }
                TxnWrite::UpdateSale(record) => {
                    tables.sales.insert(record.id(), record.clone());
                    RowChange::SaleUpdated(record)
                }
                TxnWrite::DeleteSale(id) => {
                    tables.sales.remove(&id);
                    RowChange::SaleDeleted(id)
                }
                TxnWrite::InsertMovement(movement) => {
                    tables.movements.push(movement.clone());
                    RowChange::MovementInserted(movement)
                }
            };

            tables.next_seq += 1;
            self.feed.publish(ChangeEvent {
                seq: tables.next_seq,
                committed_at,
                change,
            });
        }

        Ok(())
    }

    /// Test hook: hold the row lock for `code` until the returned guard is
    /// dropped, forcing concurrent transactions into the conflict path.
    pub fn hold_product_lock(&self, code: &ProductCode) -> Result<HeldLock, LedgerError> {
        let lock = self.row_lock(code)?;
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let (ack_tx, ack_rx) = mpsc::channel::<()>();

        std::thread::spawn(move || {
            let _guard = match lock.lock() {
                Ok(guard) => guard,
                Err(poisoned) => poisoned.into_inner(),
            };
            let _ = ack_tx.send(());
            // Parked here until the HeldLock is dropped.
            let _ = release_rx.recv();
        });

        ack_rx
            .recv()
            .map_err(|_| LedgerError::unavailable("lock holder thread died"))?;
        Ok(HeldLock {
            _release: release_tx,
        })
    }
}

/// Guard returned by `MemoryLedgerStore::hold_product_lock`; dropping it
/// releases the row lock.
#[derive(Debug)]
pub struct HeldLock {
    _release: mpsc::Sender<()>,
}

impl TxnReader for MemoryLedgerStore {
    fn read_sale(&self, id: SaleId) -> Option<SalesRecord> {
        self.read().ok()?.sales.get(&id).cloned()
    }
}

impl LedgerStore for MemoryLedgerStore {
    fn with_product_lock<T>(
        &self,
        code: &ProductCode,
        body: impl FnOnce(&mut StockTxn<'_>) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let row_lock = self.row_lock(code)?;
        let _guard = self.acquire(&row_lock, code)?;

        let product = self.get_product(code)?;
        let mut txn = StockTxn::new(product, self);
        let out = body(&mut txn)?;
        self.commit(code, txn.into_writes())?;
        Ok(out)
    }

    fn get_product(&self, code: &ProductCode) -> LedgerResult<Product> {
        self.read()?
            .products
            .get(code)
            .cloned()
            .ok_or_else(|| LedgerError::ProductNotFound(code.clone()))
    }

    fn get_sale(&self, id: SaleId) -> LedgerResult<SalesRecord> {
        self.read()?
            .sales
            .get(&id)
            .cloned()
            .ok_or(LedgerError::SaleNotFound)
    }

    fn list_products(&self) -> LedgerResult<Vec<Product>> {
        let mut products: Vec<Product> = self.read()?.products.values().cloned().collect();
        products.sort_by(|a, b| a.code().as_str().cmp(b.code().as_str()));
        Ok(products)
    }

    fn list_sales(&self) -> LedgerResult<Vec<SalesRecord>> {
        let mut sales: Vec<SalesRecord> = self.read()?.sales.values().cloned().collect();
        sales.sort_by_key(|s| s.timestamp());
        Ok(sales)
    }

    fn list_movements(&self) -> LedgerResult<Vec<StockMovement>> {
        Ok(self.read()?.movements.clone())
    }

    fn insert_product(&self, product: Product) -> LedgerResult<()> {
        let mut tables = self.write()?;
        if tables.products.contains_key(product.code()) {
            return Err(LedgerError::validation(format!(
                "product {} already exists",
                product.code()
            )));
        }
        tables.products.insert(product.code().clone(), product.clone());
        tables.next_seq += 1;
        self.feed.publish(ChangeEvent {
            seq: tables.next_seq,
            committed_at: Utc::now(),
            change: RowChange::ProductInserted(product),
        });
        Ok(())
    }

    fn remove_product(&self, code: &ProductCode) -> LedgerResult<()> {
        let row_lock = self.row_lock(code)?;
        let _guard = self.acquire(&row_lock, code)?;

        let mut tables = self.write()?;
        if tables.products.remove(code).is_none() {
            return Err(LedgerError::ProductNotFound(code.clone()));
        }
        tables.next_seq += 1;
        self.feed.publish(ChangeEvent {
            seq: tables.next_seq,
            committed_at: Utc::now(),
            change: RowChange::ProductDeleted(code.clone()),
        });
        Ok(())
    }

    fn subscribe_changes(&self) -> ChangeSubscription {
        self.feed.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tillsync_core::UserId;
    use tillsync_inventory::MovementType;
    use tillsync_sales::PaymentMethod;

    fn code(s: &str) -> ProductCode {
        ProductCode::new(s).unwrap()
    }

    fn seeded(stock: i64) -> MemoryLedgerStore {
        let store = MemoryLedgerStore::new();
        store
            .insert_product(Product::new(code("P1"), "Box of 20", stock, 2, 100, 150).unwrap())
            .unwrap();
        store
    }

    fn sale(quantity: i64) -> SalesRecord {
        SalesRecord::new(
            SaleId::new(),
            code("P1"),
            "Box of 20",
            quantity,
            150,
            "walk-in",
            PaymentMethod::Cash,
            UserId::new(),
            Utc::now(),
        )
        .unwrap()
    }

    #[test]
    fn failed_body_leaves_no_writes_and_no_events() {
        let store = seeded(10);
        let sub = store.subscribe_changes();

        let err = store
            .with_product_lock(&code("P1"), |txn| {
                txn.set_stock(5)?;
                txn.insert_sale(sale(5));
                Err::<(), _>(LedgerError::validation("boom"))
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));

        assert_eq!(store.get_product(&code("P1")).unwrap().current_stock(), 10);
        assert!(store.list_sales().unwrap().is_empty());
        assert!(sub.try_recv().is_err());
    }

    #[test]
    fn commit_publishes_writes_in_order_with_increasing_seq() {
        let store = seeded(10);
        let sub = store.subscribe_changes();
        let record = sale(4);

        store
            .with_product_lock(&code("P1"), |txn| {
                txn.insert_sale(record.clone());
                txn.insert_movement(StockMovement::out_for_sale(
                    code("P1"),
                    record.id(),
                    4,
                    false,
                    record.user_id(),
                    record.timestamp(),
                ));
                txn.set_stock(6)?;
                Ok(())
            })
            .unwrap();

        let first = sub.try_recv().unwrap();
        let second = sub.try_recv().unwrap();
        let third = sub.try_recv().unwrap();
        assert!(matches!(first.change, RowChange::SaleInserted(_)));
        assert!(matches!(second.change, RowChange::MovementInserted(_)));
        assert!(matches!(third.change, RowChange::ProductUpdated(_)));
        assert!(first.seq < second.seq && second.seq < third.seq);
    }

    #[test]
    fn held_lock_turns_into_transaction_conflict() {
        let store = seeded(10).with_lock_deadline(Duration::from_millis(20));
        let held = store.hold_product_lock(&code("P1")).unwrap();

        let err = store
            .with_product_lock(&code("P1"), |_txn| Ok(()))
            .unwrap_err();
        assert!(err.is_retryable());

        drop(held);
        store.with_product_lock(&code("P1"), |_txn| Ok(())).unwrap();
    }

    #[test]
    fn unknown_product_fails_before_running_the_body() {
        let store = MemoryLedgerStore::new();
        let err = store
            .with_product_lock(&code("NOPE"), |_txn| -> Result<(), LedgerError> {
                panic!("body must not run for a missing product")
            })
            .unwrap_err();
        assert!(matches!(err, LedgerError::ProductNotFound(_)));
    }

    #[test]
    fn apply_movement_adjusts_stock_and_records_the_movement() {
        let store = seeded(10);

        store
            .apply_movement(StockMovement::external(
                code("P1"),
                MovementType::In,
                40,
                Some(90),
                "GRN-1021",
                None,
                UserId::new(),
                Utc::now(),
            ))
            .unwrap();
        assert_eq!(store.get_product(&code("P1")).unwrap().current_stock(), 50);
        assert_eq!(store.list_movements().unwrap().len(), 1);

        let err = store
            .apply_movement(StockMovement::external(
                code("P1"),
                MovementType::Out,
                60,
                None,
                "DMG-3",
                None,
                UserId::new(),
                Utc::now(),
            ))
            .unwrap_err();
        assert!(matches!(err, LedgerError::Validation(_)));
        // Rejected movement writes nothing.
        assert_eq!(store.get_product(&code("P1")).unwrap().current_stock(), 50);
        assert_eq!(store.list_movements().unwrap().len(), 1);
    }

    #[test]
    fn remove_product_emits_a_delete_event() {
        let store = seeded(10);
        let sub = store.subscribe_changes();

        store.remove_product(&code("P1")).unwrap();
        let event = sub.try_recv().unwrap();
        assert!(matches!(event.change, RowChange::ProductDeleted(_)));
        assert!(matches!(
            store.get_product(&code("P1")),
            Err(LedgerError::ProductNotFound(_))
        ));
    }

    #[test]
    fn concurrent_transactions_on_one_product_are_serialized() {
        let store = Arc::new(seeded(100));
        let threads: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    store
                        .with_product_lock(&code("P1"), |txn| {
                            let next = txn.product().current_stock() - 1;
                            txn.set_stock(next)
                        })
                        .unwrap();
                })
            })
            .collect();
        for t in threads {
            t.join().unwrap();
        }
        assert_eq!(store.get_product(&code("P1")).unwrap().current_stock(), 92);
    }
}
