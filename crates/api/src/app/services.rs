//! Service wiring behind the HTTP handlers.

use std::sync::Arc;

use tillsync_engine::SaleEngine;
use tillsync_infra::MemoryLedgerStore;
use tillsync_inventory::PolicyHandle;
use tillsync_live::SyncHub;

type Store = Arc<MemoryLedgerStore>;

pub struct AppServices {
    store: Store,
    engine: SaleEngine<Store>,
    hub: Arc<SyncHub<Store>>,
    policy: PolicyHandle,
}

impl AppServices {
    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn engine(&self) -> &SaleEngine<Store> {
        &self.engine
    }

    pub fn hub(&self) -> &Arc<SyncHub<Store>> {
        &self.hub
    }

    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }
}

/// Wire the in-memory store, the engine, the live hub (with its ingestion
/// loop running) and the shortage-policy handle.
pub fn build_services(allow_negative_stock: bool) -> Arc<AppServices> {
    let store = Arc::new(MemoryLedgerStore::new());
    let engine = SaleEngine::new(Arc::clone(&store));
    let hub = Arc::new(SyncHub::new(Arc::clone(&store)));
    let _ingest = hub.spawn();
    let policy = PolicyHandle::new(allow_negative_stock);

    Arc::new(AppServices {
        store,
        engine,
        hub,
        policy,
    })
}
