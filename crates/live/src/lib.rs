//! `tillsync-live` — the live state synchronizer.
//!
//! Long-lived subscription layer between the ledger store's change feed
//! and connected clients: transforms raw row changes into typed client
//! updates, applies per-connection role visibility, fans out over bounded
//! buffers (slow consumers get a full-resync signal instead of blocking
//! the bus), and maintains the client-side dashboard aggregates.

pub mod dashboard;
pub mod hub;
pub mod update;


pub use dashboard::{ClientState, DashboardStats};
pub use hub::{ClientFeed, SyncHub, SyncSnapshot};
pub use update::ClientUpdate;
