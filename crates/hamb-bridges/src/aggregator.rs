use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::EndpointError;
use crate::ports::{Aggregator, EntityEndpoint};

/// Aggregator keeping its children in memory, in insertion order
///
/// Rejects a second child with the same entity id, and any child beyond
/// `max_parts` when a limit is set.
#[derive(Default)]
pub struct InMemoryAggregator {
    parts: RwLock<IndexMap<String, Arc<dyn EntityEndpoint>>>,
    max_parts: Option<usize>,
}

impl InMemoryAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_limit(max_parts: usize) -> Self {
        Self {
            parts: RwLock::default(),
            max_parts: Some(max_parts),
        }
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.parts
            .read()
            .map(|p| p.contains_key(entity_id))
            .unwrap_or(false)
    }
}

impl std::fmt::Debug for InMemoryAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<String> = self
            .parts
            .read()
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();
        f.debug_struct("InMemoryAggregator")
            .field("parts", &ids)
            .field("max_parts", &self.max_parts)
            .finish()
    }
}

#[async_trait]
impl Aggregator for InMemoryAggregator {
    async fn add(&self, endpoint: Arc<dyn EntityEndpoint>) -> Result<(), EndpointError> {
        let mut parts = self
            .parts
            .write()
            .map_err(|_| EndpointError::Failed("aggregator lock poisoned".to_string()))?;

        let entity_id = endpoint.entity_id().to_string();
        if parts.contains_key(&entity_id) {
            return Err(EndpointError::Failed(format!(
                "endpoint {entity_id} already exists"
            )));
        }
        if let Some(max) = self.max_parts {
            if parts.len() >= max {
                return Err(EndpointError::Failed(format!(
                    "aggregator is full ({max} endpoints)"
                )));
            }
        }

        parts.insert(entity_id, endpoint);
        Ok(())
    }

    fn remove(&self, entity_id: &str) -> Option<Arc<dyn EntityEndpoint>> {
        self.parts
            .write()
            .ok()
            .and_then(|mut p| p.shift_remove(entity_id))
    }

    fn parts(&self) -> Vec<Arc<dyn EntityEndpoint>> {
        self.parts
            .read()
            .map(|p| p.values().cloned().collect())
            .unwrap_or_default()
    }

    fn len(&self) -> usize {
        self.parts.read().map(|p| p.len()).unwrap_or(0)
    }
}
