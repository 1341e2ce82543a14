//! Entity states and registry metadata as seen from the entity source

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A batch of pushed state updates keyed by entity id
pub type StateBatch = HashMap<String, EntityState>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EntityIdError {
    #[error("expected <domain>.<object_id>")]
    InvalidFormat,

    #[error("missing domain before '.'")]
    EmptyDomain,

    #[error("missing object id after '.'")]
    EmptyObjectId,

    #[error("only a-z, 0-9 and '_' are allowed")]
    InvalidChars,
}

/// Split an entity id into `(domain, object_id)`
///
/// Both parts must be non-empty lowercase alphanumeric with underscores.
pub fn split_entity_id(entity_id: &str) -> Result<(&str, &str), EntityIdError> {
    let (domain, object_id) = entity_id
        .split_once('.')
        .ok_or(EntityIdError::InvalidFormat)?;
    if object_id.contains('.') {
        return Err(EntityIdError::InvalidFormat);
    }
    if domain.is_empty() {
        return Err(EntityIdError::EmptyDomain);
    }
    if object_id.is_empty() {
        return Err(EntityIdError::EmptyObjectId);
    }

    let valid = |s: &str| {
        s.chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
    };
    if !valid(domain) || !valid(object_id) {
        return Err(EntityIdError::InvalidChars);
    }

    Ok((domain, object_id))
}

/// Current state of one entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityState {
    pub entity_id: String,

    /// Raw value such as `on`, `23.5` or `unavailable`
    pub state: String,

    #[serde(default)]
    pub attributes: HashMap<String, serde_json::Value>,

    pub last_changed: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl EntityState {
    pub fn new(
        entity_id: impl Into<String>,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        Self {
            entity_id: entity_id.into(),
            state: state.into(),
            attributes,
            last_changed: now,
            last_updated: now,
        }
    }

    /// Produce the successor state, keeping `last_changed` when the value is unchanged
    pub fn with_update(
        &self,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Self {
        let now = Utc::now();
        let state = state.into();
        let changed = self.state != state;

        Self {
            entity_id: self.entity_id.clone(),
            state,
            attributes,
            last_changed: if changed { now } else { self.last_changed },
            last_updated: now,
        }
    }

    pub fn is_unavailable(&self) -> bool {
        self.state == "unavailable"
    }
}

/// Registry metadata used by bridge filters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub entity_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_id: Option<String>,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub entity_category: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default)]
    pub disabled: bool,
}

impl EntityMetadata {
    pub fn new(entity_id: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            ..Default::default()
        }
    }

    /// Domain part of the entity id, or the whole id when malformed
    pub fn domain(&self) -> &str {
        split_entity_id(&self.entity_id)
            .map(|(domain, _)| domain)
            .unwrap_or(&self.entity_id)
    }
}
