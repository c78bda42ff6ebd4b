//! The ledger store boundary.
//!
//! The production system talks to a hosted relational store; the core only
//! depends on this trait. The interesting part of the contract is
//! `with_product_lock`: it pins the one contended resource (a product's
//! stock counter) behind a row lock and scopes every write of a sale
//! transaction into a single atomic commit, so the executor's transaction
//! and retry logic is testable without a real database.

use std::sync::Arc;

use tillsync_core::{LedgerError, LedgerResult, ProductCode, SaleId};
use tillsync_inventory::{MovementType, StockMovement};
use tillsync_products::Product;
use tillsync_sales::SalesRecord;

use crate::feed::ChangeSubscription;

/// A write staged inside a product-locked transaction.
#[derive(Debug, Clone, PartialEq)]
pub enum TxnWrite {
    SetStock(i64),
    InsertSale(SalesRecord),
    UpdateSale(SalesRecord),
    DeleteSale(SaleId),
    InsertMovement(StockMovement),
}

/// Reads available to a transaction body while the product row is locked.
///
/// Store implementations provide this so the body can re-read rows that
/// were fetched before the lock was taken (a sale being edited may have
/// been changed by a competing mutation that held the lock first).
pub trait TxnReader {
    fn read_sale(&self, id: SaleId) -> Option<SalesRecord>;
}

/// Transaction scope handed to a `with_product_lock` body.
///
/// The body sees the locked product row, may re-read sales, and stages
/// writes. Nothing is visible outside the transaction until the body
/// returns `Ok` and the store commits every staged write atomically; an
/// error drops all of them.
pub struct StockTxn<'a> {
    product: Product,
    reader: &'a dyn TxnReader,
    writes: Vec<TxnWrite>,
}

impl<'a> StockTxn<'a> {
    pub fn new(product: Product, reader: &'a dyn TxnReader) -> Self {
        Self {
            product,
            reader,
            writes: Vec::new(),
        }
    }

    /// The locked product row, reflecting any stock change already staged
    /// in this transaction.
    pub fn product(&self) -> &Product {
        &self.product
    }

    /// Re-read a sale row under the lock.
    pub fn sale(&self, id: SaleId) -> Option<SalesRecord> {
        self.reader.read_sale(id)
    }

    /// Stage the product's new stock counter.
    pub fn set_stock(&mut self, new_stock: i64) -> Result<(), LedgerError> {
        self.product = self.product.with_current_stock(new_stock)?;
        self.writes.push(TxnWrite::SetStock(new_stock));
        Ok(())
    }

    pub fn insert_sale(&mut self, record: SalesRecord) {
        self.writes.push(TxnWrite::InsertSale(record));
    }

    pub fn update_sale(&mut self, record: SalesRecord) {
        self.writes.push(TxnWrite::UpdateSale(record));
    }

    pub fn delete_sale(&mut self, id: SaleId) {
        self.writes.push(TxnWrite::DeleteSale(id));
    }

    pub fn insert_movement(&mut self, movement: StockMovement) {
        self.writes.push(TxnWrite::InsertMovement(movement));
    }

    /// Staged writes, in the order they will commit.
    pub fn into_writes(self) -> Vec<TxnWrite> {
        self.writes
    }
}

/// Transactional row store holding products, sales and stock movements.
///
/// Implementations must guarantee:
/// - `with_product_lock` serializes transactions per product code; two
///   concurrent bodies for the same code never observe the same stock
///   value and both commit a write from it
/// - a lock wait that exceeds the store's deadline fails with
///   `TransactionConflict` (retryable), not a definitive error
/// - staged writes commit atomically and surface on the change feed in
///   commit order
pub trait LedgerStore: Send + Sync {
    /// Run `body` with the product row for `code` locked, committing its
    /// staged writes atomically on `Ok` and discarding them on `Err`.
    fn with_product_lock<T>(
        &self,
        code: &ProductCode,
        body: impl FnOnce(&mut StockTxn<'_>) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError>;

    /// Point lookup by unique product code.
    fn get_product(&self, code: &ProductCode) -> LedgerResult<Product>;

    fn get_sale(&self, id: SaleId) -> LedgerResult<SalesRecord>;

    /// Full-table snapshots, used for client resynchronization.
    fn list_products(&self) -> LedgerResult<Vec<Product>>;
    fn list_sales(&self) -> LedgerResult<Vec<SalesRecord>>;
    fn list_movements(&self) -> LedgerResult<Vec<StockMovement>>;

    /// Product lifecycle outside the sale path (inventory UI).
    fn insert_product(&self, product: Product) -> LedgerResult<()>;
    fn remove_product(&self, code: &ProductCode) -> LedgerResult<()>;

    /// Subscribe to committed row changes, in commit order.
    fn subscribe_changes(&self) -> ChangeSubscription;

    /// Apply an externally entered stock movement (delivery, manual count).
    ///
    /// Runs under the product lock like a sale: the stock change and its
    /// audit movement commit in the same transaction, keeping the
    /// one-movement-per-stock-change invariant.
    fn apply_movement(&self, movement: StockMovement) -> LedgerResult<()>
    where
        Self: Sized,
    {
        let code = movement.product_code().clone();
        self.with_product_lock(&code, |txn| {
            let delta = match movement.movement_type() {
                MovementType::In => movement.quantity(),
                MovementType::Out => -movement.quantity(),
                MovementType::Adjustment => movement.quantity(),
            };
            let new_stock = txn
                .product()
                .current_stock()
                .checked_add(delta)
                .ok_or_else(|| LedgerError::validation("stock counter overflows"))?;
            if new_stock < 0 {
                return Err(LedgerError::validation(
                    "movement would take stock negative",
                ));
            }
            txn.set_stock(new_stock)?;
            txn.insert_movement(movement);
            Ok(())
        })
    }
}

impl<S> LedgerStore for Arc<S>
where
    S: LedgerStore + ?Sized,
{
    fn with_product_lock<T>(
        &self,
        code: &ProductCode,
        body: impl FnOnce(&mut StockTxn<'_>) -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        (**self).with_product_lock(code, body)
    }

    fn get_product(&self, code: &ProductCode) -> LedgerResult<Product> {
        (**self).get_product(code)
    }

    fn get_sale(&self, id: SaleId) -> LedgerResult<SalesRecord> {
        (**self).get_sale(id)
    }

    fn list_products(&self) -> LedgerResult<Vec<Product>> {
        (**self).list_products()
    }

    fn list_sales(&self) -> LedgerResult<Vec<SalesRecord>> {
        (**self).list_sales()
    }

    fn list_movements(&self) -> LedgerResult<Vec<StockMovement>> {
        (**self).list_movements()
    }

    fn insert_product(&self, product: Product) -> LedgerResult<()> {
        (**self).insert_product(product)
    }

    fn remove_product(&self, code: &ProductCode) -> LedgerResult<()> {
        (**self).remove_product(code)
    }

    fn subscribe_changes(&self) -> ChangeSubscription {
        (**self).subscribe_changes()
    }
}
