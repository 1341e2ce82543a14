//! Core types for the Home Assistant Matter bridge
//!
//! This crate provides the data model shared by every other crate in the
//! workspace: bridge configuration and runtime state, failed-device records,
//! entity states pushed by the entity source, and the health projection used
//! by status reporting.

mod bridge;
mod entity;
mod failed_device;
pub mod health;

pub use bridge::{
    BasicInformation, BridgeConfig, BridgeData, BridgeFilter, BridgeStatus, BridgeSummary,
    CommissioningInfo, CreateBridgeRequest, FabricInfo, FilterKind, FilterPattern,
    UpdateBridgeRequest,
};
pub use entity::{split_entity_id, EntityIdError, EntityMetadata, EntityState, StateBatch};
pub use failed_device::{FailedDevice, FailureKind};
pub use health::{overall_health, BridgeHealthInfo, HealthStatus};

/// Default Matter port used by the first bridge
pub const DEFAULT_PORT: u16 = 5540;
