//! `tillsync-api` — HTTP surface over the reconciliation engine and the
//! live synchronizer.

pub mod app;
pub mod middleware;
pub mod telemetry;
