use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hamb_bridges::{ProtocolServer, ServerError};
use hamb_core::{BridgeConfig, CommissioningInfo, FabricInfo};

/// Observable state of a [`MockServer`], shared with the test
#[derive(Default)]
pub struct MockServerState {
    pub online: AtomicBool,
    pub fail_start: AtomicBool,
    pub started_ports: Mutex<Vec<u16>>,
    pub stops: AtomicUsize,
    pub resets: AtomicUsize,
    pub erased: AtomicBool,
    pub fabrics: Mutex<Vec<FabricInfo>>,
}

impl MockServerState {
    pub fn started_ports(&self) -> Vec<u16> {
        self.started_ports.lock().unwrap().clone()
    }

    pub fn commission(&self, label: &str) {
        let mut fabrics = self.fabrics.lock().unwrap();
        let index = fabrics.len() as u8 + 1;
        fabrics.push(FabricInfo {
            fabric_index: index,
            fabric_id: 1000 + index as u64,
            node_id: 1,
            root_vendor_id: 0xfff1,
            label: label.to_string(),
        });
    }
}

pub struct MockServer {
    state: Arc<MockServerState>,
}

impl MockServer {
    pub fn new() -> (Self, Arc<MockServerState>) {
        let state = Arc::new(MockServerState::default());
        (
            Self {
                state: state.clone(),
            },
            state,
        )
    }
}

#[async_trait]
impl ProtocolServer for MockServer {
    async fn start(&self, config: &BridgeConfig) -> Result<(), ServerError> {
        if self.state.fail_start.load(Ordering::SeqCst) {
            return Err(ServerError::Bind {
                port: config.port,
                source: std::io::Error::from(std::io::ErrorKind::AddrInUse),
            });
        }
        self.state.started_ports.lock().unwrap().push(config.port);
        self.state.online.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServerError> {
        self.state.stops.fetch_add(1, Ordering::SeqCst);
        self.state.online.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn factory_reset(&self) -> Result<(), ServerError> {
        self.state.resets.fetch_add(1, Ordering::SeqCst);
        self.state.fabrics.lock().unwrap().clear();
        Ok(())
    }

    async fn erase(&self) -> Result<(), ServerError> {
        self.state.erased.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn is_online(&self) -> bool {
        self.state.online.load(Ordering::SeqCst)
    }

    fn commissioning(&self) -> Option<CommissioningInfo> {
        Some(CommissioningInfo::from_fabrics(
            self.state.fabrics.lock().unwrap().clone(),
        ))
    }
}
