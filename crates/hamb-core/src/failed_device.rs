//! Per-entity failure records produced by a reconciliation pass

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why an entity could not be exposed as an endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The entity cannot be represented as a device at all
    InvalidDevice,
    /// Endpoint construction failed for another reason
    CreationFailed,
    /// The endpoint was built but the aggregator refused it
    AttachFailed,
}

impl FailureKind {
    /// Prefix used for the human-readable error message
    pub fn prefix(&self) -> &'static str {
        match self {
            FailureKind::AttachFailed => "Failed to add endpoint",
            FailureKind::CreationFailed => "Creation failed",
            FailureKind::InvalidDevice => "Invalid device",
        }
    }
}

/// An entity that failed during the most recent reconciliation pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailedDevice {
    pub entity_id: String,
    pub kind: FailureKind,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl FailedDevice {
    /// Record a failure now, prefixing the cause with the kind's label
    pub fn new(
        entity_id: impl Into<String>,
        kind: FailureKind,
        cause: impl std::fmt::Display,
    ) -> Self {
        Self {
            entity_id: entity_id.into(),
            kind,
            error: format!("{}: {}", kind.prefix(), cause),
            timestamp: Utc::now(),
        }
    }
}
