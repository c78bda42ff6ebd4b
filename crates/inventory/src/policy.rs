use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

/// Whether a sale exceeding available stock is rejected or allowed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShortagePolicy {
    /// Insufficient stock blocks the sale entirely.
    Strict,
    /// The sale goes through, stock is clamped to zero and the movement is
    /// flagged as a shortage for audit.
    Permissive,
}

impl ShortagePolicy {
    pub fn allows_negative_stock(&self) -> bool {
        matches!(self, Self::Permissive)
    }
}

/// Process-wide shortage-policy toggle.
///
/// Reads are last-write-wins and deliberately not linearized with in-flight
/// transactions: callers snapshot the policy once at the start of each
/// transaction and a concurrent toggle takes effect only for transactions
/// started afterwards. Who may flip it is decided by the external
/// authorization layer; this type only holds the state.
#[derive(Debug, Clone, Default)]
pub struct PolicyHandle {
    allow_negative: Arc<AtomicBool>,
}

impl PolicyHandle {
    pub fn new(allow_negative_stock: bool) -> Self {
        Self {
            allow_negative: Arc::new(AtomicBool::new(allow_negative_stock)),
        }
    }

    pub fn set_allow_negative_stock(&self, allow: bool) {
        self.allow_negative.store(allow, Ordering::Relaxed);
    }

    pub fn allow_negative_stock(&self) -> bool {
        self.allow_negative.load(Ordering::Relaxed)
    }

    /// Snapshot taken once at the start of a transaction.
    pub fn snapshot(&self) -> ShortagePolicy {
        if self.allow_negative_stock() {
            ShortagePolicy::Permissive
        } else {
            ShortagePolicy::Strict
        }
    }
}
