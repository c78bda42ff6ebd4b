//! Sale execution pipeline.
//!
//! `record_sale` / `update_sale` / `delete_sale` follow the same shape:
//!
//! 1. Validate input (before any store call)
//! 2. Lock the product row
//! 3. Plan the stock change under the active shortage policy
//! 4. Stage the sale write, its audit movement and the new stock counter
//! 5. Commit atomically; any failure rolls the whole transaction back
//!
//! Lock contention surfaces as `TransactionConflict` and is retried a small
//! bounded number of times here before reaching the caller. Retries are
//! safe because a failed attempt commits nothing.

use chrono::Utc;

use tillsync_core::{LedgerError, SaleId, UserId};
use tillsync_infra::LedgerStore;
use tillsync_inventory::{ShortagePolicy, StockMovement, plan_sale};
use tillsync_sales::{SaleDraft, SalesRecord};

const DEFAULT_CONFLICT_RETRIES: u32 = 3;

/// Fields a sale edit may change.
///
/// Quantity changes re-run the shortage check for the growth delta and
/// produce an adjustment movement; shrinking a sale only returns stock and
/// always succeeds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleUpdate {
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    /// Who performed the edit (owner of the audit movement).
    pub edited_by: UserId,
}

/// Sale-to-stock reconciliation engine over a ledger store.
#[derive(Debug)]
pub struct SaleEngine<S> {
    store: S,
    conflict_retries: u32,
}

impl<S> SaleEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
        }
    }

    /// Override how many times a `TransactionConflict` is retried
    /// internally before surfacing to the caller.
    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl<S> SaleEngine<S>
where
    S: LedgerStore,
{
    /// Record a sale and decrement the product's stock atomically.
    ///
    /// Returns the id of the committed sale. Fails with `ProductNotFound`,
    /// `InsufficientStock` (strict policy), `Validation` (checked before
    /// any store call) or, after retries, `TransactionConflict`.
    pub fn record_sale(
        &self,
        draft: &SaleDraft,
        policy: ShortagePolicy,
    ) -> Result<SaleId, LedgerError> {
        draft.validate()?;

        // One id across retry attempts; a failed attempt commits nothing.
        let sale_id = SaleId::new();
        self.retrying(|| self.record_sale_once(sale_id, draft, policy))
    }

    fn record_sale_once(
        &self,
        sale_id: SaleId,
        draft: &SaleDraft,
        policy: ShortagePolicy,
    ) -> Result<SaleId, LedgerError> {
        self.store.with_product_lock(&draft.product_code, |txn| {
            let product = txn.product();
            let plan = plan_sale(product.current_stock(), draft.quantity, policy)?;
            let now = Utc::now();

            // Snapshot the product name at sale time; history must stay
            // accurate if the product is renamed later.
            let record = SalesRecord::new(
                sale_id,
                draft.product_code.clone(),
                product.name(),
                draft.quantity,
                draft.unit_price,
                draft.customer_name.clone(),
                draft.payment_method,
                draft.user_id,
                now,
            )?;

            if plan.shortage {
                tracing::warn!(
                    product = %draft.product_code,
                    requested = draft.quantity,
                    available = product.current_stock(),
                    "sale exceeds available stock; recording shortage"
                );
            }

            txn.insert_sale(record);
            txn.insert_movement(StockMovement::out_for_sale(
                draft.product_code.clone(),
                sale_id,
                draft.quantity,
                plan.shortage,
                draft.user_id,
                now,
            ));
            txn.set_stock(plan.new_stock)?;
            Ok(sale_id)
        })
    }

    /// Edit a committed sale, reconciling the stock delta.
    pub fn update_sale(
        &self,
        sale_id: SaleId,
        update: &SaleUpdate,
        policy: ShortagePolicy,
    ) -> Result<(), LedgerError> {
        if update.quantity <= 0 {
            return Err(LedgerError::validation("quantity must be positive"));
        }
        if update.unit_price == 0 {
            return Err(LedgerError::validation("unit price must be positive"));
        }

        self.retrying(|| self.update_sale_once(sale_id, update, policy))
    }

    fn update_sale_once(
        &self,
        sale_id: SaleId,
        update: &SaleUpdate,
        policy: ShortagePolicy,
    ) -> Result<(), LedgerError> {
        // Only for the product code; the row is re-read under the lock.
        let current = self.store.get_sale(sale_id)?;

        self.store
            .with_product_lock(&current.product_code().clone(), |txn| {
                let sale = txn.sale(sale_id).ok_or(LedgerError::SaleNotFound)?;
                let delta = update.quantity - sale.quantity();
                let now = Utc::now();

                let mut shortage = false;
                if delta > 0 {
                    // Growing the sale is an additional OUT of `delta`
                    // units and must pass the same shortage check.
                    let plan = plan_sale(txn.product().current_stock(), delta, policy)?;
                    shortage = plan.shortage;
                    txn.set_stock(plan.new_stock)?;
                } else if delta < 0 {
                    let restored = txn
                        .product()
                        .current_stock()
                        .checked_add(-delta)
                        .ok_or_else(|| LedgerError::validation("stock counter overflows"))?;
                    txn.set_stock(restored)?;
                }

                // Price-only edits change no stock, so they get no movement.
                if delta != 0 {
                    txn.insert_movement(StockMovement::adjustment_for_sale(
                        sale.product_code().clone(),
                        sale_id,
                        -delta,
                        shortage,
                        update.edited_by,
                        now,
                    ));
                }

                txn.update_sale(sale.with_quantity_and_price(update.quantity, update.unit_price)?);
                Ok(())
            })
    }

    /// Delete a sale and restore its stock effect.
    pub fn delete_sale(&self, sale_id: SaleId, deleted_by: UserId) -> Result<(), LedgerError> {
        self.retrying(|| self.delete_sale_once(sale_id, deleted_by))
    }

    fn delete_sale_once(&self, sale_id: SaleId, deleted_by: UserId) -> Result<(), LedgerError> {
        let current = self.store.get_sale(sale_id)?;

        self.store
            .with_product_lock(&current.product_code().clone(), |txn| {
                let sale = txn.sale(sale_id).ok_or(LedgerError::SaleNotFound)?;
                let now = Utc::now();

                let restored = txn
                    .product()
                    .current_stock()
                    .checked_add(sale.quantity())
                    .ok_or_else(|| LedgerError::validation("stock counter overflows"))?;
                txn.set_stock(restored)?;
                txn.insert_movement(StockMovement::reversal_for_sale(
                    sale.product_code().clone(),
                    sale_id,
                    sale.quantity(),
                    deleted_by,
                    now,
                ));
                txn.delete_sale(sale_id);
                Ok(())
            })
    }

    /// Run `attempt`, retrying transaction conflicts up to the bound.
    fn retrying<T>(
        &self,
        mut attempt: impl FnMut() -> Result<T, LedgerError>,
    ) -> Result<T, LedgerError> {
        let mut tries = 0;
        loop {
            match attempt() {
                Err(err) if err.is_retryable() && tries < self.conflict_retries => {
                    tries += 1;
                    tracing::warn!(error = %err, attempt = tries, "retrying after conflict");
                }
                other => return other,
            }
        }
    }
}
