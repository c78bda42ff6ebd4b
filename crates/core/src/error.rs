//! Ledger error model.

use thiserror::Error;

use crate::code::ProductCode;

/// Result type used across the ledger core.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Failure taxonomy for sale/stock operations.
///
/// Deterministic business failures (`Validation`, `ProductNotFound`,
/// `InsufficientStock`) are final: retrying without changing the input
/// cannot succeed. `TransactionConflict` is transient and safe to retry;
/// `StoreUnavailable` is fatal to the caller and surfaced as-is.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Input failed validation before any store call was made.
    #[error("validation failed: {0}")]
    Validation(String),

    /// No product row exists for the given code.
    #[error("product not found: {0}")]
    ProductNotFound(ProductCode),

    /// The sale would exceed available stock under the strict shortage policy.
    ///
    /// Carries available vs requested for user-facing messaging.
    #[error("insufficient stock: {available} available, {requested} requested")]
    InsufficientStock { available: i64, requested: i64 },

    /// Transient contention on the product row (lock wait timed out or a
    /// concurrent writer won). Safe to retry.
    #[error("transaction conflict: {0}")]
    TransactionConflict(String),

    /// The backing store could not serve the request at all.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// A requested sale row does not exist.
    #[error("sale not found")]
    SaleNotFound,
}

impl LedgerError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::TransactionConflict(msg.into())
    }

    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::StoreUnavailable(msg.into())
    }

    /// Whether a caller may safely re-run the failed operation unchanged.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TransactionConflict(_))
    }
}
