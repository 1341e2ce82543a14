use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use async_trait::async_trait;
use hamb_bridges::{BridgeRegistry, EndpointError, EndpointFactory, EntityEndpoint};
use hamb_core::StateBatch;

use super::Gate;

/// Endpoint that records what happens to it
pub struct MockEndpoint {
    entity_id: String,
    fail_delete: bool,
    delete_gate: Option<Arc<Gate>>,
    deleted: AtomicBool,
    updates: Mutex<Vec<StateBatch>>,
}

impl MockEndpoint {
    pub fn new(entity_id: &str, fail_delete: bool) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            fail_delete,
            delete_gate: None,
            deleted: AtomicBool::new(false),
            updates: Mutex::new(Vec::new()),
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> Vec<StateBatch> {
        self.updates.lock().unwrap().clone()
    }
}

#[async_trait]
impl EntityEndpoint for MockEndpoint {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    async fn delete(&self) -> Result<(), EndpointError> {
        if let Some(gate) = &self.delete_gate {
            gate.pass().await;
        }
        if self.fail_delete {
            return Err(EndpointError::Failed("endpoint is busy".to_string()));
        }
        self.deleted.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn update_states(&self, states: &StateBatch) {
        self.updates.lock().unwrap().push(states.clone());
    }
}

/// Endpoint construction path with scripted failures
///
/// Records every construction attempt in order.
#[derive(Default)]
pub struct MockEndpointFactory {
    failures: RwLock<HashMap<String, EndpointError>>,
    failing_deletes: RwLock<HashSet<String>>,
    delete_gates: RwLock<HashMap<String, Arc<Gate>>>,
    attempts: Mutex<Vec<String>>,
    created: Mutex<Vec<Arc<MockEndpoint>>>,
}

impl MockEndpointFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail(&self, entity_id: &str, error: EndpointError) {
        self.failures
            .write()
            .unwrap()
            .insert(entity_id.to_string(), error);
    }

    pub fn succeed(&self, entity_id: &str) {
        self.failures.write().unwrap().remove(entity_id);
    }

    /// Endpoints built for `entity_id` from now on fail to delete
    pub fn fail_delete(&self, entity_id: &str) {
        self.failing_deletes
            .write()
            .unwrap()
            .insert(entity_id.to_string());
    }

    /// Endpoints built for `entity_id` from now on park their delete at `gate`
    pub fn hold_delete(&self, entity_id: &str, gate: Arc<Gate>) {
        self.delete_gates
            .write()
            .unwrap()
            .insert(entity_id.to_string(), gate);
    }

    pub fn attempts(&self) -> Vec<String> {
        self.attempts.lock().unwrap().clone()
    }

    pub fn attempts_for(&self, entity_id: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .iter()
            .filter(|id| *id == entity_id)
            .count()
    }

    pub fn reset_attempts(&self) {
        self.attempts.lock().unwrap().clear();
    }

    /// Most recently built endpoint for `entity_id`
    pub fn endpoint(&self, entity_id: &str) -> Option<Arc<MockEndpoint>> {
        self.created
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|e| e.entity_id() == entity_id)
            .cloned()
    }
}

#[async_trait]
impl EndpointFactory for MockEndpointFactory {
    async fn create(
        &self,
        _registry: &dyn BridgeRegistry,
        entity_id: &str,
    ) -> Result<Arc<dyn EntityEndpoint>, EndpointError> {
        self.attempts.lock().unwrap().push(entity_id.to_string());

        if let Some(error) = self.failures.read().unwrap().get(entity_id) {
            return Err(error.clone());
        }

        let fail_delete = self.failing_deletes.read().unwrap().contains(entity_id);
        let mut endpoint = MockEndpoint::new(entity_id, fail_delete);
        endpoint.delete_gate = self.delete_gates.read().unwrap().get(entity_id).cloned();
        let endpoint = Arc::new(endpoint);
        self.created.lock().unwrap().push(endpoint.clone());
        Ok(endpoint)
    }
}

/// Aggregator that refuses selected entity ids
pub struct RejectingAggregator {
    inner: hamb_bridges::InMemoryAggregator,
    rejected: HashSet<String>,
}

impl RejectingAggregator {
    pub fn new(rejected: &[&str]) -> Self {
        Self {
            inner: hamb_bridges::InMemoryAggregator::new(),
            rejected: rejected.iter().map(|s| s.to_string()).collect(),
        }
    }
}

#[async_trait]
impl hamb_bridges::Aggregator for RejectingAggregator {
    async fn add(&self, endpoint: Arc<dyn EntityEndpoint>) -> Result<(), EndpointError> {
        if self.rejected.contains(endpoint.entity_id()) {
            return Err(EndpointError::Failed("behavior initialization failed".to_string()));
        }
        self.inner.add(endpoint).await
    }

    fn remove(&self, entity_id: &str) -> Option<Arc<dyn EntityEndpoint>> {
        self.inner.remove(entity_id)
    }

    fn parts(&self) -> Vec<Arc<dyn EntityEndpoint>> {
        self.inner.parts()
    }

    fn len(&self) -> usize {
        self.inner.len()
    }
}
