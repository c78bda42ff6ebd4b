//! `tillsync-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! typed identifiers, the product-code value type, and the ledger error
//! taxonomy shared by the executor, mutation service and synchronizer.

pub mod code;
pub mod error;
pub mod id;

pub use code::ProductCode;
pub use error::{LedgerError, LedgerResult};
pub use id::{MovementId, SaleId, UserId};
