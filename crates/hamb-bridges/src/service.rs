//! Registry of all configured bridges

use std::sync::{Arc, RwLock};

use futures::future::join_all;
use hamb_core::{
    overall_health, BasicInformation, BridgeConfig, BridgeData, BridgeHealthInfo, BridgeSummary,
    CreateBridgeRequest, HealthStatus, UpdateBridgeRequest,
};
use hamb_storage::BridgeStorage;
use indexmap::IndexMap;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use ulid::Ulid;

use crate::bridge::Bridge;
use crate::error::{BridgeError, BridgeResult};
use crate::events::{BridgeEvent, BridgeEvents};
use crate::factory::BridgeFactory;

/// Service-wide settings
#[derive(Debug, Clone, Default)]
pub struct BridgeServiceOptions {
    /// Merged into the configuration of every new bridge
    pub basic_information: BasicInformation,
}

/// Owns every bridge and guards port uniqueness
///
/// Create, update, delete, load and dispose are serialized so a port check
/// and the mutation it guards cannot interleave with another mutation.
pub struct BridgeService {
    storage: Arc<dyn BridgeStorage>,
    factory: Arc<dyn BridgeFactory>,
    options: BridgeServiceOptions,
    bridges: RwLock<IndexMap<String, Arc<Bridge>>>,
    mutation_lock: Mutex<()>,
    events: BridgeEvents,
}

impl BridgeService {
    pub fn new(
        storage: Arc<dyn BridgeStorage>,
        factory: Arc<dyn BridgeFactory>,
        options: BridgeServiceOptions,
    ) -> Self {
        Self {
            storage,
            factory,
            options,
            bridges: RwLock::new(IndexMap::new()),
            mutation_lock: Mutex::new(()),
            events: BridgeEvents::new(),
        }
    }

    pub fn events(&self) -> &BridgeEvents {
        &self.events
    }

    /// Construct a bridge for every stored configuration
    ///
    /// A configuration that fails to construct is logged and skipped.
    pub async fn load(&self) -> BridgeResult<()> {
        let _mutation = self.mutation_lock.lock().await;

        let configs = self.storage.bridges();
        info!("Loading {} bridges", configs.len());
        for config in configs {
            let id = config.id.clone();
            match self.factory.create(config, self.events.clone()).await {
                Ok(bridge) => self.insert(bridge),
                Err(e) => error!(bridge_id = %id, "Failed to load bridge: {}", e),
            }
        }
        Ok(())
    }

    /// Create, persist, start and register a new bridge
    ///
    /// A bridge whose start fails stays registered in the `Failed` state.
    pub async fn create(&self, request: CreateBridgeRequest) -> BridgeResult<Arc<Bridge>> {
        let _mutation = self.mutation_lock.lock().await;

        self.ensure_port_free(request.port, None)?;

        let config = BridgeConfig::from_request(
            Ulid::new().to_string(),
            request,
            self.options.basic_information.clone(),
        );
        let id = config.id.clone();
        info!(bridge_id = %id, port = config.port, "Creating bridge {}", config.name);

        let bridge = self
            .factory
            .create(config.clone(), self.events.clone())
            .await?;

        if let Err(e) = self.storage.add(config).await {
            error!(bridge_id = %id, "Failed to persist bridge: {}", e);
            if let Err(e) = bridge.dispose().await {
                warn!(bridge_id = %id, "Failed to dispose bridge: {}", e);
            }
            return Err(e.into());
        }

        if let Err(e) = bridge.start().await {
            warn!(bridge_id = %id, "Bridge created but failed to start: {}", e);
        }

        self.insert(bridge.clone());
        Ok(bridge)
    }

    /// Apply a configuration change; `Ok(None)` when the id is unknown
    pub async fn update(&self, request: UpdateBridgeRequest) -> BridgeResult<Option<Arc<Bridge>>> {
        let _mutation = self.mutation_lock.lock().await;

        let Some(bridge) = self.get(&request.id) else {
            debug!(bridge_id = %request.id, "Update for unknown bridge ignored");
            return Ok(None);
        };

        if request.port != bridge.port() {
            self.ensure_port_free(request.port, Some(&request.id))?;
        }

        let updated = bridge.update(&request).await;
        self.storage.add(bridge.config()).await?;
        updated?;

        Ok(Some(bridge))
    }

    /// Stop and forget a bridge; unknown ids are a no-op
    pub async fn delete(&self, id: &str) -> BridgeResult<()> {
        let _mutation = self.mutation_lock.lock().await;

        let Some(bridge) = self.get(id) else {
            return Ok(());
        };

        if let Err(e) = bridge.delete().await {
            warn!(bridge_id = %id, "Error while deleting bridge: {}", e);
        }
        if let Ok(mut bridges) = self.bridges.write() {
            bridges.shift_remove(id);
        }
        self.storage.remove(id).await?;

        info!(bridge_id = %id, "Bridge deleted");
        self.events.publish(BridgeEvent::Removed { id: id.to_string() });
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Bridge>> {
        self.bridges.read().ok().and_then(|b| b.get(id).cloned())
    }

    /// All bridges in creation order
    pub fn bridges(&self) -> Vec<Arc<Bridge>> {
        self.bridges
            .read()
            .map(|b| b.values().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.bridges.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Start every bridge, returning the ones that failed
    pub async fn start_all(&self) -> Vec<(String, BridgeError)> {
        let bridges = self.bridges();
        let results = join_all(bridges.iter().map(|bridge| async move {
            (bridge.id(), bridge.start().await)
        }))
        .await;

        collect_failures(results, "start")
    }

    /// Run a reconciliation pass on every bridge, returning the ones that failed
    pub async fn refresh_all(&self) -> Vec<(String, BridgeError)> {
        let bridges = self.bridges();
        let results = join_all(bridges.iter().map(|bridge| async move {
            (bridge.id(), bridge.refresh_devices().await)
        }))
        .await;

        collect_failures(results, "refresh")
    }

    /// Dispose every bridge and release their ports
    pub async fn dispose(&self) {
        let _mutation = self.mutation_lock.lock().await;

        let bridges: Vec<Arc<Bridge>> = self
            .bridges
            .write()
            .map(|mut b| b.drain(..).map(|(_, bridge)| bridge).collect())
            .unwrap_or_default();

        info!("Disposing {} bridges", bridges.len());
        for bridge in bridges {
            if let Err(e) = bridge.dispose().await {
                warn!(bridge_id = %bridge.id(), "Failed to dispose bridge: {}", e);
            }
        }
    }

    pub fn data(&self) -> Vec<BridgeData> {
        self.bridges().iter().map(|b| b.data()).collect()
    }

    pub fn summaries(&self) -> Vec<BridgeSummary> {
        self.data().iter().map(BridgeSummary::from).collect()
    }

    pub fn health(&self) -> HealthStatus {
        overall_health(&self.data())
    }

    pub fn bridge_health(&self) -> Vec<BridgeHealthInfo> {
        self.data().iter().map(BridgeHealthInfo::from).collect()
    }

    /// Publish a full snapshot of all bridges
    pub fn heartbeat(&self) {
        self.events.publish(BridgeEvent::Heartbeat {
            bridges: self.summaries(),
        });
    }

    fn insert(&self, bridge: Arc<Bridge>) {
        if let Ok(mut bridges) = self.bridges.write() {
            bridges.insert(bridge.id(), bridge);
        }
    }

    fn ensure_port_free(&self, port: u16, except_id: Option<&str>) -> BridgeResult<()> {
        let taken = self
            .bridges()
            .iter()
            .any(|b| b.port() == port && Some(b.id().as_str()) != except_id);
        if taken {
            return Err(BridgeError::PortConflict { port });
        }
        Ok(())
    }
}

fn collect_failures(
    results: Vec<(String, BridgeResult<()>)>,
    operation: &str,
) -> Vec<(String, BridgeError)> {
    results
        .into_iter()
        .filter_map(|(id, result)| match result {
            Ok(()) => None,
            Err(e) => {
                error!(bridge_id = %id, "Failed to {} bridge: {}", operation, e);
                Some((id, e))
            }
        })
        .collect()
}
