//! Change-event fan-out from the store to its subscribers.
//!
//! Best-effort in-process pub/sub: each subscriber gets every committed
//! change in commit order. Dead subscribers are pruned on publish. The
//! per-client bounded buffering and visibility filtering live one layer
//! up, in the synchronizer.

use std::sync::{Mutex, mpsc};
use std::time::Duration;

use crate::change::ChangeEvent;

/// A subscription to the store's change stream.
#[derive(Debug)]
pub struct ChangeSubscription {
    receiver: mpsc::Receiver<ChangeEvent>,
}

impl ChangeSubscription {
    pub(crate) fn new(receiver: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { receiver }
    }

    /// Block until the next change is available.
    pub fn recv(&self) -> Result<ChangeEvent, mpsc::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive a change without blocking.
    pub fn try_recv(&self) -> Result<ChangeEvent, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Block for up to `timeout` waiting for a change.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<ChangeEvent, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

/// Publisher side of the change stream.
#[derive(Debug, Default)]
pub struct ChangeFeed {
    subscribers: Mutex<Vec<mpsc::Sender<ChangeEvent>>>,
}

impl ChangeFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver one committed change to every live subscriber.
    ///
    /// The store calls this while still holding its commit lock, which is
    /// what makes per-subscriber delivery order equal commit order.
    pub(crate) fn publish(&self, event: ChangeEvent) {
        let Ok(mut subs) = self.subscribers.lock() else {
            // Poisoned registry: no subscriber can make progress anyway.
            return;
        };

        // Drop any dead subscribers while publishing.
        subs.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn subscribe(&self) -> ChangeSubscription {
        let (tx, rx) = mpsc::channel();

        if let Ok(mut subs) = self.subscribers.lock() {
            subs.push(tx);
        }

        ChangeSubscription::new(rx)
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.lock().map(|s| s.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::change::RowChange;
    use chrono::Utc;
    use tillsync_core::SaleId;

    fn event(seq: u64) -> ChangeEvent {
        ChangeEvent {
            seq,
            committed_at: Utc::now(),
            change: RowChange::SaleDeleted(SaleId::new()),
        }
    }

    #[test]
    fn delivers_in_publish_order_to_every_subscriber() {
        let feed = ChangeFeed::new();
        let a = feed.subscribe();
        let b = feed.subscribe();

        for seq in 1..=3 {
            feed.publish(event(seq));
        }

        for sub in [&a, &b] {
            let seqs: Vec<u64> = (0..3).map(|_| sub.try_recv().unwrap().seq).collect();
            assert_eq!(seqs, vec![1, 2, 3]);
        }
    }

    #[test]
    fn prunes_dropped_subscribers_on_publish() {
        let feed = ChangeFeed::new();
        let kept = feed.subscribe();
        drop(feed.subscribe());

        feed.publish(event(1));
        assert_eq!(feed.subscriber_count(), 1);
        assert_eq!(kept.try_recv().unwrap().seq, 1);
    }
}
