//! Application wiring

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use hamb_bridges::{BridgeService, BridgeServiceOptions, PeriodicTask};
use hamb_config::{AppConfig, EntitySeed};
use hamb_entities::EntityStore;
use hamb_logging::LogCapture;
use hamb_storage::{FileBridgeStorage, Storage};
use tracing::{info, warn};

use crate::factory::LocalBridgeFactory;

/// The running bridge application
pub struct App {
    config: AppConfig,
    logs: Arc<LogCapture>,
    store: Arc<EntityStore>,
    service: Arc<BridgeService>,
    tasks: Vec<PeriodicTask>,
}

impl App {
    /// Build every component; nothing is started yet
    pub async fn build(config: AppConfig, logs: Arc<LogCapture>) -> Result<Self> {
        config.validate()?;

        let storage = Storage::new(&config.storage.location);
        let bridge_storage = FileBridgeStorage::open(storage.clone())
            .await
            .with_context(|| format!("failed to open storage at {}", config.storage.location))?;

        let store = Arc::new(EntityStore::new());
        seed_entities(&store, &config.entities)?;

        let factory = LocalBridgeFactory::new(store.clone(), storage);
        let service = Arc::new(BridgeService::new(
            Arc::new(bridge_storage),
            Arc::new(factory),
            BridgeServiceOptions {
                basic_information: config.bridges.basic_information.clone(),
            },
        ));

        Ok(Self {
            config,
            logs,
            store,
            service,
            tasks: Vec::new(),
        })
    }

    pub fn service(&self) -> &Arc<BridgeService> {
        &self.service
    }

    pub fn store(&self) -> &Arc<EntityStore> {
        &self.store
    }

    pub fn logs(&self) -> &Arc<LogCapture> {
        &self.logs
    }

    /// Load stored bridges, start them and schedule periodic work
    pub async fn start(&mut self) -> Result<()> {
        self.service.load().await?;

        let failures = self.service.start_all().await;
        if !failures.is_empty() {
            warn!("{} of {} bridges failed to start", failures.len(), self.service.len());
        }

        self.tasks = self.spawn_tasks();
        info!("{} bridges loaded", self.service.len());
        Ok(())
    }

    fn spawn_tasks(&self) -> Vec<PeriodicTask> {
        let mut tasks = Vec::new();

        let refresh_secs = self.config.bridges.refresh_interval_secs;
        if refresh_secs > 0 {
            let service = self.service.clone();
            tasks.push(PeriodicTask::spawn(
                "bridge-refresh",
                Duration::from_secs(refresh_secs),
                move || {
                    let service = service.clone();
                    async move {
                        service.refresh_all().await;
                    }
                },
            ));
        }

        let service = self.service.clone();
        tasks.push(PeriodicTask::spawn(
            "heartbeat",
            Duration::from_secs(self.config.bridges.heartbeat_interval_secs),
            move || {
                let service = service.clone();
                async move { service.heartbeat() }
            },
        ));

        tasks
    }

    /// Names of the scheduled tasks
    pub fn task_names(&self) -> Vec<&str> {
        self.tasks.iter().map(|t| t.name()).collect()
    }

    /// Cancel periodic work and dispose every bridge
    pub async fn shutdown(mut self) {
        for task in self.tasks.drain(..) {
            task.cancel().await;
        }
        self.service.dispose().await;
        info!("Shutdown complete");
    }
}

/// Register the configured entities and set their initial states
pub fn seed_entities(store: &EntityStore, seeds: &[EntitySeed]) -> Result<()> {
    for seed in seeds {
        store
            .register(seed.metadata())
            .with_context(|| format!("invalid entity {}", seed.entity_id))?;
        let state = seed.state();
        store.set_state(&state.entity_id, state.state, state.attributes)?;
    }
    info!("Seeded {} entities", seeds.len());
    Ok(())
}
