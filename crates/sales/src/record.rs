use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillsync_core::{LedgerError, ProductCode, SaleId, UserId};

/// How the customer paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Card,
    Transfer,
}

/// A committed sale.
///
/// Immutable once written except through the explicit mutation service.
/// `product_name` is a denormalized snapshot taken at sale time so history
/// stays accurate if the product is later renamed; this is intentional,
/// not a modeling bug.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesRecord {
    id: SaleId,
    product_code: ProductCode,
    product_name: String,
    quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    unit_price: u64,
    /// Always `quantity * unit_price`; enforced at construction.
    total_amount: u64,
    customer_name: String,
    payment_method: PaymentMethod,
    user_id: UserId,
    timestamp: DateTime<Utc>,
}

/// Commit-time invariant: total must be the exact product of quantity and
/// unit price, with overflow treated as invalid input.
pub(crate) fn checked_total(quantity: i64, unit_price: u64) -> Result<u64, LedgerError> {
    if quantity <= 0 {
        return Err(LedgerError::validation("quantity must be positive"));
    }
    (quantity as u64)
        .checked_mul(unit_price)
        .ok_or_else(|| LedgerError::validation("total amount overflows"))
}

impl SalesRecord {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: SaleId,
        product_code: ProductCode,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price: u64,
        customer_name: impl Into<String>,
        payment_method: PaymentMethod,
        user_id: UserId,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, LedgerError> {
        if unit_price == 0 {
            return Err(LedgerError::validation("unit price must be positive"));
        }
        let total_amount = checked_total(quantity, unit_price)?;
        Ok(Self {
            id,
            product_code,
            product_name: product_name.into(),
            quantity,
            unit_price,
            total_amount,
            customer_name: customer_name.into(),
            payment_method,
            user_id,
            timestamp,
        })
    }

    pub fn id(&self) -> SaleId {
        self.id
    }

    pub fn product_code(&self) -> &ProductCode {
        &self.product_code
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> u64 {
        self.unit_price
    }

    pub fn total_amount(&self) -> u64 {
        self.total_amount
    }

    pub fn customer_name(&self) -> &str {
        &self.customer_name
    }

    pub fn payment_method(&self) -> PaymentMethod {
        self.payment_method
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Copy of this record with quantity/price replaced and the total
    /// recomputed. Used by the mutation service; everything else (owner,
    /// snapshot name, timestamp) is preserved.
    pub fn with_quantity_and_price(
        &self,
        quantity: i64,
        unit_price: u64,
    ) -> Result<Self, LedgerError> {
        if unit_price == 0 {
            return Err(LedgerError::validation("unit price must be positive"));
        }
        let total_amount = checked_total(quantity, unit_price)?;
        Ok(Self {
            quantity,
            unit_price,
            total_amount,
            ..self.clone()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn record(quantity: i64, unit_price: u64) -> Result<SalesRecord, LedgerError> {
        SalesRecord::new(
            SaleId::new(),
            ProductCode::new("P1").unwrap(),
            "Box of 20",
            quantity,
            unit_price,
            "walk-in",
            PaymentMethod::Cash,
            UserId::new(),
            Utc::now(),
        )
    }

    #[test]
    fn rejects_non_positive_quantity_and_price() {
        assert!(record(0, 100).is_err());
        assert!(record(-3, 100).is_err());
        assert!(record(2, 0).is_err());
    }

    #[test]
    fn update_recomputes_total_and_keeps_snapshot() {
        let r = record(2, 150).unwrap();
        let r2 = r.with_quantity_and_price(5, 120).unwrap();
        assert_eq!(r2.total_amount(), 600);
        assert_eq!(r2.product_name(), r.product_name());
        assert_eq!(r2.user_id(), r.user_id());
        assert_eq!(r2.id(), r.id());
    }

    proptest! {
        #[test]
        fn total_is_always_quantity_times_unit_price(
            quantity in 1i64..1_000_000,
            unit_price in 1u64..1_000_000,
        ) {
            let r = record(quantity, unit_price).unwrap();
            prop_assert_eq!(r.total_amount(), quantity as u64 * unit_price);
        }

        #[test]
        fn non_positive_quantity_never_constructs(quantity in i64::MIN..=0) {
            prop_assert!(record(quantity, 100).is_err());
        }
    }
}
