use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use hamb_bridges::{BridgeRegistry, RegistryEntity, RegistryError};
use hamb_core::{BridgeFilter, EntityMetadata};

/// Registry whose desired set is set directly by the test
///
/// `set_entity_ids` stages the list the next `refresh` publishes.
pub struct MockRegistry {
    staged: RwLock<Vec<String>>,
    current: RwLock<Vec<String>>,
    fail_refresh: AtomicBool,
    refresh_count: AtomicUsize,
    filters: RwLock<Vec<BridgeFilter>>,
}

impl MockRegistry {
    pub fn new(entity_ids: &[&str]) -> Self {
        Self {
            staged: RwLock::new(entity_ids.iter().map(|s| s.to_string()).collect()),
            current: RwLock::new(Vec::new()),
            fail_refresh: AtomicBool::new(false),
            refresh_count: AtomicUsize::new(0),
            filters: RwLock::new(Vec::new()),
        }
    }

    pub fn set_entity_ids(&self, entity_ids: &[&str]) {
        *self.staged.write().unwrap() = entity_ids.iter().map(|s| s.to_string()).collect();
    }

    pub fn set_failing(&self, failing: bool) {
        self.fail_refresh.store(failing, Ordering::SeqCst);
    }

    pub fn refresh_count(&self) -> usize {
        self.refresh_count.load(Ordering::SeqCst)
    }

    pub fn filters(&self) -> Vec<BridgeFilter> {
        self.filters.read().unwrap().clone()
    }
}

#[async_trait]
impl BridgeRegistry for MockRegistry {
    async fn refresh(&self) -> Result<(), RegistryError> {
        self.refresh_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_refresh.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("connection lost".to_string()));
        }
        let staged = self.staged.read().unwrap().clone();
        *self.current.write().unwrap() = staged;
        Ok(())
    }

    fn entity_ids(&self) -> Vec<String> {
        self.current.read().unwrap().clone()
    }

    fn set_filter(&self, filter: BridgeFilter) {
        self.filters.write().unwrap().push(filter);
    }

    fn entity(&self, entity_id: &str) -> Option<RegistryEntity> {
        self.current
            .read()
            .unwrap()
            .iter()
            .any(|id| id == entity_id)
            .then(|| RegistryEntity {
                metadata: EntityMetadata::new(entity_id),
                state: None,
            })
    }
}
