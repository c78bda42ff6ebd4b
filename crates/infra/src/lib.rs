//! Infrastructure layer: the ledger store boundary and its in-memory
//! implementation.
//!
//! The durable relational store is an external collaborator; this crate
//! owns only its *contract* (`LedgerStore`) and a contention-simulating
//! in-memory implementation used for tests, development and the reference
//! deployment.

pub mod change;
pub mod feed;
pub mod memory;
pub mod store;

pub use change::{ChangeEvent, RowChange};
pub use feed::{ChangeFeed, ChangeSubscription};
pub use memory::{HeldLock, MemoryLedgerStore};
pub use store::{LedgerStore, StockTxn};
