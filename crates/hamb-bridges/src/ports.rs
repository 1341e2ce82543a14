//! Capabilities a bridge consumes from its collaborators
//!
//! The reconciliation engine only calls through these traits. Concrete
//! implementations live with the entity source and the binary.

use std::sync::Arc;

use async_trait::async_trait;
use futures::stream::BoxStream;
use hamb_core::{
    BridgeConfig, BridgeFilter, CommissioningInfo, EntityMetadata, EntityState, StateBatch,
};

use crate::error::{EndpointError, RegistryError, ServerError, SubscriptionError};

/// Registry entry visible to a bridge
#[derive(Debug, Clone, PartialEq)]
pub struct RegistryEntity {
    pub metadata: EntityMetadata,
    pub state: Option<EntityState>,
}

/// The desired entity set of one bridge
#[async_trait]
pub trait BridgeRegistry: Send + Sync {
    /// Re-pull the desired entity set from the entity source
    async fn refresh(&self) -> Result<(), RegistryError>;

    /// Desired entity ids as of the last successful refresh
    fn entity_ids(&self) -> Vec<String>;

    /// Replace the filter; takes effect on the next refresh
    fn set_filter(&self, filter: BridgeFilter);

    fn entity(&self, entity_id: &str) -> Option<RegistryEntity>;
}

/// A protocol-visible device mirroring one entity
#[async_trait]
pub trait EntityEndpoint: Send + Sync {
    fn entity_id(&self) -> &str;

    async fn delete(&self) -> Result<(), EndpointError>;

    /// Apply pushed states; entries for other entities are ignored
    async fn update_states(&self, states: &StateBatch);
}

/// Construction path for entity endpoints
#[async_trait]
pub trait EndpointFactory: Send + Sync {
    /// Fails with [`EndpointError::InvalidDevice`] when the entity cannot be
    /// a device at all, [`EndpointError::Failed`] otherwise
    async fn create(
        &self,
        registry: &dyn BridgeRegistry,
        entity_id: &str,
    ) -> Result<Arc<dyn EntityEndpoint>, EndpointError>;
}

/// Container endpoint holding a bridge's entity endpoints
#[async_trait]
pub trait Aggregator: Send + Sync {
    async fn add(&self, endpoint: Arc<dyn EntityEndpoint>) -> Result<(), EndpointError>;

    fn remove(&self, entity_id: &str) -> Option<Arc<dyn EntityEndpoint>>;

    /// Children in insertion order
    fn parts(&self) -> Vec<Arc<dyn EntityEndpoint>>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Pushed state updates; the subscription ends when the stream is dropped
pub type StateStream = BoxStream<'static, StateBatch>;

/// Push subscription against the entity source
#[async_trait]
pub trait EntitySubscriber: Send + Sync {
    async fn subscribe(&self, entity_ids: Vec<String>) -> Result<StateStream, SubscriptionError>;
}

/// Protocol server bound to a bridge's port
#[async_trait]
pub trait ProtocolServer: Send + Sync {
    /// Claim the configured port and go online
    async fn start(&self, config: &BridgeConfig) -> Result<(), ServerError>;

    /// Go offline and release the port
    async fn stop(&self) -> Result<(), ServerError>;

    /// Forget commissioning state; the server must be stopped
    async fn factory_reset(&self) -> Result<(), ServerError>;

    /// Remove everything the server persisted
    async fn erase(&self) -> Result<(), ServerError>;

    fn is_online(&self) -> bool;

    fn commissioning(&self) -> Option<CommissioningInfo>;
}
