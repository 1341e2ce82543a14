//! Home Assistant Matter bridge server
//!
//! Wires the local entity store, bridge storage and bridge service together
//! and owns the protocol server implementation used by every bridge.

pub mod app;
pub mod factory;
pub mod protocol;

pub use app::{seed_entities, App};
pub use factory::LocalBridgeFactory;
pub use protocol::UdpProtocolServer;
