//! Entity metadata and states, with change notification

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use hamb_core::{split_entity_id, EntityIdError, EntityMetadata, EntityState, StateBatch};
use tokio::sync::broadcast;
use tracing::{debug, info, instrument};

const CHANGE_CHANNEL_CAPACITY: usize = 1024;

/// The entities every bridge selects from
///
/// Each state write is broadcast as a single-entry [`StateBatch`]. While
/// disconnected, registries refuse to refresh but states still change.
pub struct EntityStore {
    metadata: DashMap<String, EntityMetadata>,
    states: DashMap<String, EntityState>,
    connected: AtomicBool,
    changes: broadcast::Sender<StateBatch>,
}

impl EntityStore {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(CHANGE_CHANNEL_CAPACITY);
        Self {
            metadata: DashMap::new(),
            states: DashMap::new(),
            connected: AtomicBool::new(true),
            changes,
        }
    }

    /// Add or replace an entity's registry metadata
    pub fn register(&self, metadata: EntityMetadata) -> Result<(), EntityIdError> {
        split_entity_id(&metadata.entity_id)?;
        debug!(entity_id = %metadata.entity_id, "Registering entity");
        self.metadata.insert(metadata.entity_id.clone(), metadata);
        Ok(())
    }

    /// Set an entity's state and broadcast it
    ///
    /// An entity without metadata is registered with defaults. `last_changed`
    /// only moves when the state value changes.
    #[instrument(skip(self, state, attributes))]
    pub fn set_state(
        &self,
        entity_id: &str,
        state: impl Into<String>,
        attributes: HashMap<String, serde_json::Value>,
    ) -> Result<EntityState, EntityIdError> {
        split_entity_id(entity_id)?;

        let new_state = match self.states.get(entity_id) {
            Some(existing) => existing.with_update(state, attributes),
            None => EntityState::new(entity_id, state, attributes),
        };
        self.metadata
            .entry(entity_id.to_string())
            .or_insert_with(|| EntityMetadata::new(entity_id));
        self.states.insert(entity_id.to_string(), new_state.clone());

        let batch = StateBatch::from([(entity_id.to_string(), new_state.clone())]);
        let _ = self.changes.send(batch);
        Ok(new_state)
    }

    /// Forget an entity; bridges drop it on their next pass
    pub fn remove(&self, entity_id: &str) -> Option<EntityMetadata> {
        self.states.remove(entity_id);
        self.metadata.remove(entity_id).map(|(_, m)| m)
    }

    pub fn set_connected(&self, connected: bool) {
        let was = self.connected.swap(connected, Ordering::SeqCst);
        if was != connected {
            info!(connected, "Entity source connection changed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn metadata(&self, entity_id: &str) -> Option<EntityMetadata> {
        self.metadata.get(entity_id).map(|m| m.clone())
    }

    pub fn state(&self, entity_id: &str) -> Option<EntityState> {
        self.states.get(entity_id).map(|s| s.clone())
    }

    /// Metadata of every registered entity, in no particular order
    pub fn entities(&self) -> Vec<EntityMetadata> {
        self.metadata.iter().map(|m| m.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.metadata.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metadata.is_empty()
    }

    /// Receive every state write from now on
    pub fn subscribe(&self) -> broadcast::Receiver<StateBatch> {
        self.changes.subscribe()
    }
}

impl Default for EntityStore {
    fn default() -> Self {
        Self::new()
    }
}
