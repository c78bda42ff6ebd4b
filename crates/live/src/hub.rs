//! Fan-out hub between the store's change feed and connected clients.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, mpsc};
use std::time::{Duration, Instant};

use serde::Serialize;

use tillsync_auth::ConnectionIdentity;
use tillsync_core::{LedgerError, LedgerResult};
use tillsync_infra::{ChangeEvent, LedgerStore, RowChange};
use tillsync_products::Product;
use tillsync_sales::SalesRecord;

use crate::update::ClientUpdate;

const DEFAULT_BUFFER_CAPACITY: usize = 256;
const DEFAULT_RESYNC_TIMEOUT: Duration = Duration::from_secs(30);
const RESYNC_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Consistent full-state fetch used on connect and after a resync signal.
///
/// `sales` is already filtered for the requesting connection's visibility.
#[derive(Debug, Clone, Serialize)]
pub struct SyncSnapshot {
    pub products: Vec<Product>,
    pub sales: Vec<SalesRecord>,
}

/// Receiving half of one client connection.
#[derive(Debug)]
pub struct ClientFeed {
    id: u64,
    receiver: mpsc::Receiver<ClientUpdate>,
}

impl ClientFeed {
    pub fn recv(&self) -> Result<ClientUpdate, mpsc::RecvError> {
        self.receiver.recv()
    }

    pub fn try_recv(&self) -> Result<ClientUpdate, mpsc::TryRecvError> {
        self.receiver.try_recv()
    }

    pub fn recv_timeout(&self, timeout: Duration) -> Result<ClientUpdate, mpsc::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LagState {
    Live,
    /// Buffer overflowed; deltas are dropped until the client resyncs.
    Lagged,
}

#[derive(Debug)]
struct ConnectionHandle {
    identity: ConnectionIdentity,
    tx: mpsc::SyncSender<ClientUpdate>,
    lag: LagState,
    resync_timeout: Duration,
}

type ConnectionMap = Arc<Mutex<HashMap<u64, ConnectionHandle>>>;

impl ConnectionHandle {
    /// Deliver one update; returns false when the client is gone.
    ///
    /// A full buffer converts the connection to the lagged state: further
    /// deltas are dropped and exactly one `Resync` marker is delivered as
    /// soon as the client frees a slot. A short-lived thread polls for that
    /// slot so the dispatch loop itself never blocks; if the marker cannot
    /// be delivered before the resync timeout (client gone or wedged), the
    /// thread prunes the connection instead.
    fn offer(
        &mut self,
        id: u64,
        connections: &ConnectionMap,
        update: Option<ClientUpdate>,
    ) -> bool {
        match self.lag {
            LagState::Lagged => true,
            LagState::Live => {
                let Some(update) = update else {
                    return true;
                };
                match self.tx.try_send(update) {
                    Ok(()) => true,
                    Err(mpsc::TrySendError::Full(_)) => {
                        tracing::warn!(
                            user = %self.identity.user_id,
                            "subscriber fell behind; dropping deltas until resync"
                        );
                        self.lag = LagState::Lagged;
                        let tx = self.tx.clone();
                        let connections = Arc::clone(connections);
                        let deadline = Instant::now() + self.resync_timeout;
                        std::thread::spawn(move || {
                            loop {
                                match tx.try_send(ClientUpdate::Resync) {
                                    Ok(()) => return,
                                    Err(mpsc::TrySendError::Full(_)) => {
                                        if Instant::now() >= deadline {
                                            break;
                                        }
                                        std::thread::sleep(RESYNC_POLL_INTERVAL);
                                    }
                                    Err(mpsc::TrySendError::Disconnected(_)) => break,
                                }
                            }
                            if let Ok(mut conns) = connections.lock() {
                                conns.remove(&id);
                            }
                        });
                        true
                    }
                    Err(mpsc::TrySendError::Disconnected(_)) => false,
                }
            }
        }
    }
}

/// Live state synchronizer.
///
/// One ingestion loop consumes the store's change feed and fans typed
/// updates out to per-connection bounded buffers. Per-subscriber delivery
/// order equals store commit order for that subscriber's visible subset;
/// nothing is guaranteed across subscribers. All updates are upserts or
/// key-removals, so the overlap between a snapshot fetch and already
/// queued deltas is benign; full refresh is the only recovery strategy for
/// missed deltas.
#[derive(Debug)]
pub struct SyncHub<S> {
    store: S,
    connections: ConnectionMap,
    next_id: AtomicU64,
    buffer_capacity: usize,
    resync_timeout: Duration,
}

impl<S> SyncHub<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            connections: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
            buffer_capacity: DEFAULT_BUFFER_CAPACITY,
            resync_timeout: DEFAULT_RESYNC_TIMEOUT,
        }
    }

    /// Override the per-connection delta buffer size.
    pub fn with_buffer_capacity(mut self, capacity: usize) -> Self {
        self.buffer_capacity = capacity;
        self
    }

    /// Override how long a lagged connection may sit on a full buffer
    /// before it is dropped instead of resynced.
    pub fn with_resync_timeout(mut self, timeout: Duration) -> Self {
        self.resync_timeout = timeout;
        self
    }
}

impl<S> SyncHub<S>
where
    S: LedgerStore,
{
    /// Register a connection and return its feed plus the initial full
    /// snapshot. The client applies the snapshot first, then consumes
    /// incremental updates.
    pub fn subscribe(
        &self,
        identity: ConnectionIdentity,
    ) -> LedgerResult<(ClientFeed, SyncSnapshot)> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::sync_channel(self.buffer_capacity);

        {
            let mut conns = self
                .connections
                .lock()
                .map_err(|_| LedgerError::unavailable("connection registry poisoned"))?;
            conns.insert(
                id,
                ConnectionHandle {
                    identity,
                    tx,
                    lag: LagState::Live,
                    resync_timeout: self.resync_timeout,
                },
            );
        }

        match self.snapshot_for(identity) {
            Ok(snapshot) => Ok((ClientFeed { id, receiver: rx }, snapshot)),
            Err(err) => {
                if let Ok(mut conns) = self.connections.lock() {
                    conns.remove(&id);
                }
                Err(err)
            }
        }
    }

    /// Full resynchronization after a `Resync` signal (or a reconnect):
    /// clears the connection's lagged state and returns a fresh snapshot.
    /// Incremental delivery resumes from the store's current position.
    pub fn resync(&self, feed: &ClientFeed) -> LedgerResult<SyncSnapshot> {
        let identity = {
            let mut conns = self
                .connections
                .lock()
                .map_err(|_| LedgerError::unavailable("connection registry poisoned"))?;
            let handle = conns
                .get_mut(&feed.id)
                .ok_or_else(|| LedgerError::validation("unknown connection"))?;
            handle.lag = LagState::Live;
            handle.identity
        };
        self.snapshot_for(identity)
    }

    fn snapshot_for(&self, identity: ConnectionIdentity) -> LedgerResult<SyncSnapshot> {
        let products = self.store.list_products()?;
        let sales = self
            .store
            .list_sales()?
            .into_iter()
            .filter(|sale| identity.can_view_sale(sale.user_id()))
            .collect();
        Ok(SyncSnapshot { products, sales })
    }

    /// Transform one committed row change and fan it out.
    pub fn dispatch(&self, event: &ChangeEvent) {
        match &event.change {
            RowChange::ProductInserted(product) | RowChange::ProductUpdated(product) => {
                self.broadcast(|_| Some(ClientUpdate::ProductChanged(product.clone())));
            }
            RowChange::ProductDeleted(code) => {
                self.broadcast(|_| Some(ClientUpdate::ProductRemoved(code.clone())));
            }
            RowChange::MovementInserted(movement) => {
                // Movements are not delivered raw; they only trigger a
                // refresh of the derived product state.
                match self.store.get_product(movement.product_code()) {
                    Ok(product) => {
                        self.broadcast(|_| Some(ClientUpdate::ProductChanged(product.clone())));
                    }
                    Err(LedgerError::ProductNotFound(_)) => {
                        // Product removed since the movement committed; the
                        // delete event prunes client state.
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "product refresh after movement failed");
                    }
                }
            }
            RowChange::SaleInserted(sale) | RowChange::SaleUpdated(sale) => {
                self.broadcast(|identity| {
                    identity
                        .can_view_sale(sale.user_id())
                        .then(|| ClientUpdate::SaleVisible(sale.clone()))
                });
            }
            RowChange::SaleDeleted(id) => {
                // Removal needs no visibility filter: a client never holds
                // a record it was not allowed to see.
                self.broadcast(|_| Some(ClientUpdate::SaleRemoved(*id)));
            }
        }
    }

    fn broadcast(&self, make: impl Fn(&ConnectionIdentity) -> Option<ClientUpdate>) {
        let Ok(mut conns) = self.connections.lock() else {
            return;
        };
        conns.retain(|id, handle| {
            let update = make(&handle.identity);
            handle.offer(*id, &self.connections, update)
        });
    }

    #[cfg(test)]
    fn connection_count(&self) -> usize {
        self.connections.lock().map(|c| c.len()).unwrap_or(0)
    }
}

impl<S> SyncHub<S>
where
    S: LedgerStore + Send + Sync + 'static,
{
    /// Start the ingestion loop on a background thread.
    ///
    /// The loop ends when the store's change feed disconnects (store
    /// dropped).
    pub fn spawn(self: &Arc<Self>) -> std::thread::JoinHandle<()> {
        let hub = Arc::clone(self);
        let subscription = hub.store.subscribe_changes();
        std::thread::spawn(move || {
            while let Ok(event) = subscription.recv() {
                hub.dispatch(&event);
            }
        })
    }
}
