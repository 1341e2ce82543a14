//! Protocol server owning a bridge's UDP port

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use hamb_bridges::{ProtocolServer, ServerError};
use hamb_core::{BridgeConfig, CommissioningInfo, FabricInfo};
use hamb_storage::{Storage, StorageError, StorageFile, StorageResult};
use serde::{Deserialize, Serialize};
use tokio::net::UdpSocket;
use tokio::sync::Mutex;
use tracing::{debug, info};

const FABRICS_VERSION: u32 = 1;
const FABRICS_MINOR_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct FabricTable {
    fabrics: Vec<FabricInfo>,
}

/// Claims the bridge port while running and keeps its fabric table
///
/// The fabric table is stored under `bridge.<id>.fabrics`.
pub struct UdpProtocolServer {
    key: String,
    storage: Storage,
    socket: Mutex<Option<UdpSocket>>,
    online: AtomicBool,
    fabrics: RwLock<Vec<FabricInfo>>,
}

impl UdpProtocolServer {
    /// Create the server for a bridge, loading its stored fabrics
    pub async fn open(bridge_id: &str, storage: Storage) -> StorageResult<Self> {
        let key = format!("bridge.{bridge_id}.fabrics");
        let fabrics = storage
            .load::<FabricTable>(&key)
            .await?
            .map(|file| file.data.fabrics)
            .unwrap_or_default();
        debug!(bridge_id, "Loaded {} fabrics", fabrics.len());

        Ok(Self {
            key,
            storage,
            socket: Mutex::new(None),
            online: AtomicBool::new(false),
            fabrics: RwLock::new(fabrics),
        })
    }

    /// Address the server is bound to while running
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.socket
            .lock()
            .await
            .as_ref()
            .and_then(|s| s.local_addr().ok())
    }

    async fn persist(&self, fabrics: Vec<FabricInfo>) -> Result<(), ServerError> {
        let file = StorageFile::new(
            self.key.clone(),
            FabricTable { fabrics },
            FABRICS_VERSION,
            FABRICS_MINOR_VERSION,
        );
        self.storage.save(&file).await.map_err(storage_error)
    }

    fn clear_fabrics(&self) {
        if let Ok(mut fabrics) = self.fabrics.write() {
            fabrics.clear();
        }
    }
}

fn storage_error(e: StorageError) -> ServerError {
    ServerError::Protocol(e.to_string())
}

#[async_trait]
impl ProtocolServer for UdpProtocolServer {
    async fn start(&self, config: &BridgeConfig) -> Result<(), ServerError> {
        let mut socket = self.socket.lock().await;
        if socket.is_some() {
            return Ok(());
        }

        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.port));
        let bound = UdpSocket::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                port: config.port,
                source,
            })?;
        info!(port = config.port, "Protocol server listening");

        *socket = Some(bound);
        self.online.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&self) -> Result<(), ServerError> {
        if self.socket.lock().await.take().is_some() {
            debug!("Protocol server released its port");
        }
        self.online.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn factory_reset(&self) -> Result<(), ServerError> {
        self.clear_fabrics();
        self.persist(Vec::new()).await
    }

    async fn erase(&self) -> Result<(), ServerError> {
        self.clear_fabrics();
        self.storage.delete(&self.key).await.map_err(storage_error)
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn commissioning(&self) -> Option<CommissioningInfo> {
        self.fabrics
            .read()
            .ok()
            .map(|f| CommissioningInfo::from_fabrics(f.clone()))
    }
}
