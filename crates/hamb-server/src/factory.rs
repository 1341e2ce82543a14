//! Bridges backed by the local entity store

use std::sync::Arc;

use async_trait::async_trait;
use hamb_bridges::{
    Bridge, BridgeEvents, BridgeFactory, BridgeResult, InMemoryAggregator, ManagerContext,
};
use hamb_core::BridgeConfig;
use hamb_entities::{EntityStore, FilteredRegistry, MirroredEndpointFactory, StoreSubscriber};
use hamb_storage::Storage;
use tracing::warn;

use crate::protocol::UdpProtocolServer;

/// Builds each bridge from the shared entity store and storage directory
///
/// A new bridge runs one reconciliation pass before it is handed out. A
/// failing pass is logged; the bridge is still returned.
pub struct LocalBridgeFactory {
    store: Arc<EntityStore>,
    storage: Storage,
}

impl LocalBridgeFactory {
    pub fn new(store: Arc<EntityStore>, storage: Storage) -> Self {
        Self { store, storage }
    }
}

#[async_trait]
impl BridgeFactory for LocalBridgeFactory {
    async fn create(&self, config: BridgeConfig, events: BridgeEvents) -> BridgeResult<Arc<Bridge>> {
        let server = UdpProtocolServer::open(&config.id, self.storage.clone()).await?;
        let context = ManagerContext {
            registry: Arc::new(FilteredRegistry::new(self.store.clone(), &config.filter)),
            factory: Arc::new(MirroredEndpointFactory::new()),
            aggregator: Arc::new(InMemoryAggregator::new()),
            subscriber: Arc::new(StoreSubscriber::new(self.store.clone())),
        };

        let bridge = Arc::new(Bridge::new(config, context, Box::new(server), events));
        if let Err(e) = bridge.refresh_devices().await {
            warn!(bridge_id = %bridge.id(), "Initial device refresh failed: {}", e);
        }
        Ok(bridge)
    }
}
