//! Health projection over the runtime state of all bridges

use serde::{Deserialize, Serialize};

use crate::bridge::{BridgeData, BridgeStatus};

/// Overall health of the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All bridges running with every device loaded
    Healthy,
    /// Functional, but some bridge is starting or has failed devices
    Degraded,
    /// At least one bridge is stopped or failed
    Unhealthy,
}

/// Health information for a single bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeHealthInfo {
    pub id: String,
    pub name: String,
    pub status: BridgeStatus,
    pub device_count: usize,
    pub failed_device_count: usize,
    pub is_commissioned: bool,
}

impl From<&BridgeData> for BridgeHealthInfo {
    fn from(data: &BridgeData) -> Self {
        Self {
            id: data.config.id.clone(),
            name: data.config.name.clone(),
            status: data.status,
            device_count: data.device_count,
            failed_device_count: data.failed_devices.len(),
            is_commissioned: data.is_commissioned(),
        }
    }
}

/// Aggregate bridge states into one health status
///
/// An empty bridge list is healthy (nothing configured yet).
pub fn overall_health(bridges: &[BridgeData]) -> HealthStatus {
    if bridges.is_empty() {
        return HealthStatus::Healthy;
    }

    let mut healthy = 0;
    for bridge in bridges {
        match bridge.status {
            BridgeStatus::Stopped | BridgeStatus::Failed => return HealthStatus::Unhealthy,
            BridgeStatus::Running if bridge.failed_devices.is_empty() => healthy += 1,
            _ => {}
        }
    }

    if healthy == bridges.len() {
        HealthStatus::Healthy
    } else {
        HealthStatus::Degraded
    }
}
