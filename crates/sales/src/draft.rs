use serde::{Deserialize, Serialize};

use tillsync_core::{LedgerError, ProductCode, UserId};

use crate::record::{PaymentMethod, checked_total};

/// Caller-supplied input for recording a sale.
///
/// The caller computes `total_amount` itself (the POS screen shows it
/// before confirmation); `validate` re-checks that it matches
/// `quantity * unit_price` so a buggy client cannot commit a mismatched
/// total. Validation runs before any store call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDraft {
    pub product_code: ProductCode,
    pub quantity: i64,
    /// Price in smallest currency unit (e.g., cents).
    pub unit_price: u64,
    pub total_amount: u64,
    pub customer_name: String,
    pub payment_method: PaymentMethod,
    pub user_id: UserId,
}

impl SaleDraft {
    pub fn validate(&self) -> Result<(), LedgerError> {
        if self.quantity <= 0 {
            return Err(LedgerError::validation("quantity must be positive"));
        }
        if self.unit_price == 0 {
            return Err(LedgerError::validation("unit price must be positive"));
        }
        let expected = checked_total(self.quantity, self.unit_price)?;
        if self.total_amount != expected {
            return Err(LedgerError::validation(format!(
                "total amount mismatch: expected {expected}, got {}",
                self.total_amount
            )));
        }
        Ok(())
    }
}
