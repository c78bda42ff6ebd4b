//! `tillsync-engine` — the sale transaction executor and mutation service.
//!
//! Short-lived, request-scoped operations that record, edit and reverse
//! sales against the ledger store. Each operation runs under the product
//! row lock as one atomic transaction: the sale row, its audit movement
//! and the stock counter commit together or not at all.

pub mod sale_engine;

pub use sale_engine::{SaleEngine, SaleUpdate};
