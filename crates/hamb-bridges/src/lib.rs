//! Bridge lifecycle and device reconciliation
//!
//! - [`BridgeService`]: every configured bridge, port uniqueness, fan-out
//!   start and refresh
//! - [`Bridge`]: one protocol server paired with one [`BridgeEndpointManager`]
//! - [`BridgeEndpointManager`]: reconciles the desired entity set against the
//!   live endpoints and keeps a state subscription armed
//! - [`BridgeFactory`]: builds bridges from stored configuration
//!
//! Collaborators are reached only through the traits in [`ports`].

mod aggregator;
mod bridge;
mod error;
mod events;
mod factory;
mod manager;
pub mod ports;
mod service;
mod task;

pub use aggregator::InMemoryAggregator;
pub use bridge::Bridge;
pub use error::{
    BridgeError, BridgeResult, EndpointError, RegistryError, ServerError, SubscriptionError,
};
pub use events::{BridgeEvent, BridgeEvents};
pub use factory::BridgeFactory;
pub use manager::{BridgeEndpointManager, ManagerContext};
pub use ports::{
    Aggregator, BridgeRegistry, EndpointFactory, EntityEndpoint, EntitySubscriber,
    ProtocolServer, RegistryEntity, StateStream,
};
pub use service::{BridgeService, BridgeServiceOptions};
pub use task::PeriodicTask;
