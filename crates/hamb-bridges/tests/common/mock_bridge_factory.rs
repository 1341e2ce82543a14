use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hamb_bridges::{
    Bridge, BridgeError, BridgeEvents, BridgeFactory, BridgeResult, InMemoryAggregator,
};
use hamb_core::BridgeConfig;

use super::{Harness, MockServer, MockServerState};

/// Everything behind one bridge built by [`MockBridgeFactory`]
pub struct BuiltBridge {
    pub harness: Harness,
    pub server: Arc<MockServerState>,
}

/// Builds bridges backed entirely by test doubles
///
/// Each bridge's registry reports `entity_ids`.
pub struct MockBridgeFactory {
    entity_ids: Vec<String>,
    fail_create: AtomicBool,
    failing_start_ports: Mutex<HashSet<u16>>,
    built: Mutex<HashMap<String, Arc<BuiltBridge>>>,
}

impl MockBridgeFactory {
    pub fn new(entity_ids: &[&str]) -> Self {
        Self {
            entity_ids: entity_ids.iter().map(|s| s.to_string()).collect(),
            fail_create: AtomicBool::new(false),
            failing_start_ports: Mutex::new(HashSet::new()),
            built: Mutex::new(HashMap::new()),
        }
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Servers of bridges built from now on fail to start on `port`
    pub fn fail_start_on(&self, port: u16) {
        self.failing_start_ports.lock().unwrap().insert(port);
    }

    pub fn built(&self, bridge_id: &str) -> Arc<BuiltBridge> {
        self.built
            .lock()
            .unwrap()
            .get(bridge_id)
            .cloned()
            .unwrap_or_else(|| panic!("no bridge built with id {bridge_id}"))
    }

    pub fn built_count(&self) -> usize {
        self.built.lock().unwrap().len()
    }
}

#[async_trait]
impl BridgeFactory for MockBridgeFactory {
    async fn create(&self, config: BridgeConfig, events: BridgeEvents) -> BridgeResult<Arc<Bridge>> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(BridgeError::Construction("factory offline".to_string()));
        }

        let ids: Vec<&str> = self.entity_ids.iter().map(String::as_str).collect();
        let harness = Harness::with_aggregator(&ids, Arc::new(InMemoryAggregator::new()));
        let (server, state) = MockServer::new();
        if self
            .failing_start_ports
            .lock()
            .unwrap()
            .contains(&config.port)
        {
            state.fail_start.store(true, Ordering::SeqCst);
        }

        let id = config.id.clone();
        let bridge = Arc::new(Bridge::new(
            config,
            harness.context(),
            Box::new(server),
            events,
        ));

        self.built.lock().unwrap().insert(
            id,
            Arc::new(BuiltBridge {
                harness,
                server: state,
            }),
        );
        Ok(bridge)
    }
}
