//! Per-bridge view of the entity store

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use hamb_bridges::{BridgeRegistry, RegistryEntity, RegistryError};
use hamb_core::BridgeFilter;
use tracing::debug;

use crate::filter::EntityFilter;
use crate::store::EntityStore;

/// The entities of an [`EntityStore`] a bridge's filter selects
///
/// The desired set only changes on [`refresh`](BridgeRegistry::refresh),
/// and is sorted by entity id.
pub struct FilteredRegistry {
    store: Arc<EntityStore>,
    filter: RwLock<EntityFilter>,
    entity_ids: RwLock<Vec<String>>,
}

impl FilteredRegistry {
    pub fn new(store: Arc<EntityStore>, filter: &BridgeFilter) -> Self {
        Self {
            store,
            filter: RwLock::new(EntityFilter::new(filter)),
            entity_ids: RwLock::new(Vec::new()),
        }
    }

    fn is_desired(&self, entity_id: &str) -> bool {
        self.entity_ids
            .read()
            .map(|ids| ids.binary_search_by(|id| id.as_str().cmp(entity_id)).is_ok())
            .unwrap_or(false)
    }
}

#[async_trait]
impl BridgeRegistry for FilteredRegistry {
    async fn refresh(&self) -> Result<(), RegistryError> {
        if !self.store.is_connected() {
            return Err(RegistryError::Unavailable(
                "entity store is disconnected".to_string(),
            ));
        }

        let mut ids: Vec<String> = {
            let filter = self
                .filter
                .read()
                .map_err(|_| RegistryError::Unavailable("filter lock poisoned".to_string()))?;
            self.store
                .entities()
                .into_iter()
                .filter(|e| filter.matches(e))
                .map(|e| e.entity_id)
                .collect()
        };
        ids.sort();

        debug!("Registry selected {} entities", ids.len());
        if let Ok(mut current) = self.entity_ids.write() {
            *current = ids;
        }
        Ok(())
    }

    fn entity_ids(&self) -> Vec<String> {
        self.entity_ids
            .read()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    fn set_filter(&self, filter: BridgeFilter) {
        if let Ok(mut current) = self.filter.write() {
            *current = EntityFilter::new(&filter);
        }
    }

    fn entity(&self, entity_id: &str) -> Option<RegistryEntity> {
        if !self.is_desired(entity_id) {
            return None;
        }
        let metadata = self.store.metadata(entity_id)?;
        Some(RegistryEntity {
            metadata,
            state: self.store.state(entity_id),
        })
    }
}
