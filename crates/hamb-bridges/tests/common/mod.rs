//! Test doubles for the bridge engine
//!
//! Every collaborator the engine talks to has a scriptable in-memory
//! stand-in here, plus a log capture helper for asserting on log output.

#![allow(dead_code)]

mod gate;
mod logs;
mod mock_bridge_factory;
mod mock_endpoint;
mod mock_registry;
mod mock_server;
mod mock_subscriber;

pub use gate::*;
pub use logs::*;
pub use mock_bridge_factory::*;
pub use mock_endpoint::*;
pub use mock_registry::*;
pub use mock_server::*;
pub use mock_subscriber::*;

use std::sync::Arc;

use hamb_bridges::{Aggregator, BridgeEndpointManager, InMemoryAggregator, ManagerContext};

/// Collaborators of one endpoint manager, kept for inspection
pub struct Harness {
    pub registry: Arc<MockRegistry>,
    pub factory: Arc<MockEndpointFactory>,
    pub aggregator: Arc<dyn Aggregator>,
    pub subscriber: Arc<MockSubscriber>,
}

impl Harness {
    pub fn new(entity_ids: &[&str]) -> Self {
        Self::with_aggregator(entity_ids, Arc::new(InMemoryAggregator::new()))
    }

    pub fn with_aggregator(entity_ids: &[&str], aggregator: Arc<dyn Aggregator>) -> Self {
        Self {
            registry: Arc::new(MockRegistry::new(entity_ids)),
            factory: Arc::new(MockEndpointFactory::new()),
            aggregator,
            subscriber: Arc::new(MockSubscriber::new()),
        }
    }

    pub fn context(&self) -> ManagerContext {
        ManagerContext {
            registry: self.registry.clone(),
            factory: self.factory.clone(),
            aggregator: self.aggregator.clone(),
            subscriber: self.subscriber.clone(),
        }
    }

    pub fn manager(&self) -> BridgeEndpointManager {
        BridgeEndpointManager::new("test-bridge", self.context(), tracing::Span::none())
    }

    /// Entity ids of the aggregator's children, in order
    pub fn live_ids(&self) -> Vec<String> {
        self.aggregator
            .parts()
            .iter()
            .map(|p| p.entity_id().to_string())
            .collect()
    }
}
