//! Bridge configuration and runtime state

use serde::{Deserialize, Serialize};

use crate::failed_device::FailedDevice;

/// Kind of value a filter pattern is matched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterKind {
    /// Glob over the full entity id (`*` matches any run of characters)
    Pattern,
    /// Entity domain, e.g. `light`
    Domain,
    /// Integration platform, e.g. `hue`
    Platform,
    /// Exact entity id
    EntityId,
    /// Entity category (`config` / `diagnostic`)
    EntityCategory,
    /// Area id
    Area,
    /// Label id
    Label,
    /// Device id
    DeviceId,
}

/// A single include/exclude rule
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterPattern {
    #[serde(rename = "type")]
    pub kind: FilterKind,
    pub value: String,
}

impl FilterPattern {
    pub fn new(kind: FilterKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// Shorthand for a glob over entity ids
    pub fn pattern(value: impl Into<String>) -> Self {
        Self::new(FilterKind::Pattern, value)
    }

    /// Shorthand for a domain match
    pub fn domain(value: impl Into<String>) -> Self {
        Self::new(FilterKind::Domain, value)
    }
}

/// Allowed/denied entity selection for one bridge
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeFilter {
    #[serde(default)]
    pub include: Vec<FilterPattern>,
    #[serde(default)]
    pub exclude: Vec<FilterPattern>,
}

impl BridgeFilter {
    /// A filter that includes every entity
    pub fn include_all() -> Self {
        Self {
            include: vec![FilterPattern::pattern("*")],
            exclude: Vec::new(),
        }
    }
}

/// Immutable device metadata announced by the bridge's root endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BasicInformation {
    pub vendor_id: u16,
    pub vendor_name: String,
    pub product_id: u16,
    pub product_name: String,
    pub product_label: String,
    pub hardware_version: u32,
    pub software_version: u32,
}

impl Default for BasicInformation {
    fn default() -> Self {
        Self {
            vendor_id: 0xfff1,
            vendor_name: "home-assistant-matter-bridge".to_string(),
            product_id: 0x8000,
            product_name: "MatterBridge".to_string(),
            product_label: "Home Assistant Matter Bridge".to_string(),
            hardware_version: 2024,
            software_version: 2024,
        }
    }
}

/// Persisted configuration of a bridge
///
/// `id` and `basic_information` never change after creation; `name`, `port`
/// and `filter` are mutable through [`UpdateBridgeRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    pub id: String,
    pub name: String,
    pub port: u16,
    #[serde(default)]
    pub filter: BridgeFilter,
    pub basic_information: BasicInformation,
}

impl BridgeConfig {
    /// Build a new configuration from a create request
    pub fn from_request(
        id: impl Into<String>,
        request: CreateBridgeRequest,
        basic_information: BasicInformation,
    ) -> Self {
        Self {
            id: id.into(),
            name: request.name,
            port: request.port,
            filter: request.filter,
            basic_information,
        }
    }

    /// Apply the mutable fields of an update request
    pub fn apply(&mut self, request: &UpdateBridgeRequest) {
        self.name = request.name.clone();
        self.port = request.port;
        self.filter = request.filter.clone();
    }
}

/// Request to create a bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateBridgeRequest {
    pub name: String,
    pub port: u16,
    #[serde(default)]
    pub filter: BridgeFilter,
}

/// Request to update an existing bridge
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBridgeRequest {
    pub id: String,
    pub name: String,
    pub port: u16,
    #[serde(default)]
    pub filter: BridgeFilter,
}

/// Lifecycle status of a running bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BridgeStatus {
    Starting,
    Running,
    #[default]
    Stopped,
    Failed,
}

impl std::fmt::Display for BridgeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BridgeStatus::Failed => write!(f, "failed"),
            BridgeStatus::Running => write!(f, "running"),
            BridgeStatus::Starting => write!(f, "starting"),
            BridgeStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// A fabric the bridge has been commissioned into
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FabricInfo {
    pub fabric_index: u8,
    pub fabric_id: u64,
    pub node_id: u64,
    pub root_vendor_id: u16,
    #[serde(default)]
    pub label: String,
}

/// Pairing state of a bridge, opaque to the reconciliation engine
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommissioningInfo {
    pub is_commissioned: bool,
    #[serde(default)]
    pub fabrics: Vec<FabricInfo>,
}

impl CommissioningInfo {
    pub fn from_fabrics(fabrics: Vec<FabricInfo>) -> Self {
        Self {
            is_commissioned: !fabrics.is_empty(),
            fabrics,
        }
    }
}

/// Configuration plus ephemeral runtime state of a bridge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgeData {
    #[serde(flatten)]
    pub config: BridgeConfig,
    pub status: BridgeStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    pub device_count: usize,
    #[serde(default)]
    pub failed_devices: Vec<FailedDevice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commissioning: Option<CommissioningInfo>,
}

impl BridgeData {
    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn is_commissioned(&self) -> bool {
        self.commissioning
            .as_ref()
            .map(|c| c.is_commissioned)
            .unwrap_or(false)
    }
}

/// Compact status projection pushed to status listeners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeSummary {
    pub id: String,
    pub name: String,
    pub status: BridgeStatus,
    pub device_count: usize,
    pub failed_device_count: usize,
    pub is_commissioned: bool,
    pub fabric_count: usize,
}

impl From<&BridgeData> for BridgeSummary {
    fn from(data: &BridgeData) -> Self {
        Self {
            id: data.config.id.clone(),
            name: data.config.name.clone(),
            status: data.status,
            device_count: data.device_count,
            failed_device_count: data.failed_devices.len(),
            is_commissioned: data.is_commissioned(),
            fabric_count: data
                .commissioning
                .as_ref()
                .map(|c| c.fabrics.len())
                .unwrap_or(0),
        }
    }
}
