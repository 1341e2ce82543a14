//! Bridge configuration persistence

use std::sync::RwLock;

use async_trait::async_trait;
use hamb_core::BridgeConfig;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::storage::{load_versioned, Storable, Storage, StorageResult};

/// Persistence port used by the bridge service
#[async_trait]
pub trait BridgeStorage: Send + Sync {
    /// All stored configurations in insertion order
    fn bridges(&self) -> Vec<BridgeConfig>;

    /// Insert or replace the configuration with the same id
    async fn add(&self, config: BridgeConfig) -> StorageResult<()>;

    /// Remove a configuration; unknown ids are ignored
    async fn remove(&self, id: &str) -> StorageResult<()>;
}

/// Stored payload of [`FileBridgeStorage`]
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgeList {
    pub bridges: Vec<BridgeConfig>,
}

impl Storable for BridgeList {
    const KEY: &'static str = "hamb.bridges";
    const VERSION: u32 = 1;
    const MINOR_VERSION: u32 = 1;
}

/// Bridge configurations kept in one storage file
///
/// The file is read once at [`FileBridgeStorage::open`] and rewritten after
/// every mutation. Mutations are serialized so the file always matches the
/// in-memory list.
#[derive(Debug)]
pub struct FileBridgeStorage {
    storage: Storage,
    bridges: RwLock<IndexMap<String, BridgeConfig>>,
    write_lock: Mutex<()>,
}

impl FileBridgeStorage {
    pub async fn open(storage: Storage) -> StorageResult<Self> {
        let list: BridgeList = load_versioned(&storage).await?.unwrap_or_default();
        info!(
            "Loaded {} bridge configurations from {:?}",
            list.bridges.len(),
            storage.dir()
        );

        let bridges = list
            .bridges
            .into_iter()
            .map(|config| (config.id.clone(), config))
            .collect();

        Ok(Self {
            storage,
            bridges: RwLock::new(bridges),
            write_lock: Mutex::new(()),
        })
    }

    fn snapshot(&self) -> BridgeList {
        BridgeList {
            bridges: self.bridges(),
        }
    }

    async fn persist(&self) -> StorageResult<()> {
        self.storage.save(&self.snapshot().to_storage_file()).await
    }
}

#[async_trait]
impl BridgeStorage for FileBridgeStorage {
    fn bridges(&self) -> Vec<BridgeConfig> {
        self.bridges
            .read()
            .map(|b| b.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn add(&self, config: BridgeConfig) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        debug!("Storing bridge {}", config.id);
        if let Ok(mut bridges) = self.bridges.write() {
            bridges.insert(config.id.clone(), config);
        }
        self.persist().await
    }

    async fn remove(&self, id: &str) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;
        let removed = self
            .bridges
            .write()
            .map(|mut b| b.shift_remove(id).is_some())
            .unwrap_or(false);
        if !removed {
            return Ok(());
        }
        debug!("Removed bridge {} from storage", id);
        self.persist().await
    }
}

/// In-memory [`BridgeStorage`]
#[derive(Debug, Default)]
pub struct MemoryBridgeStorage {
    bridges: RwLock<IndexMap<String, BridgeConfig>>,
}

impl MemoryBridgeStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bridges(configs: impl IntoIterator<Item = BridgeConfig>) -> Self {
        Self {
            bridges: RwLock::new(
                configs
                    .into_iter()
                    .map(|config| (config.id.clone(), config))
                    .collect(),
            ),
        }
    }
}

#[async_trait]
impl BridgeStorage for MemoryBridgeStorage {
    fn bridges(&self) -> Vec<BridgeConfig> {
        self.bridges
            .read()
            .map(|b| b.values().cloned().collect())
            .unwrap_or_default()
    }

    async fn add(&self, config: BridgeConfig) -> StorageResult<()> {
        if let Ok(mut bridges) = self.bridges.write() {
            bridges.insert(config.id.clone(), config);
        }
        Ok(())
    }

    async fn remove(&self, id: &str) -> StorageResult<()> {
        if let Ok(mut bridges) = self.bridges.write() {
            bridges.shift_remove(id);
        }
        Ok(())
    }
}
