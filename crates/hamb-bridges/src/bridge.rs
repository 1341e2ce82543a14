//! One protocol server paired with one endpoint manager

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::RwLock;

use hamb_core::{BridgeConfig, BridgeData, BridgeStatus, BridgeSummary, UpdateBridgeRequest};
use tokio::sync::Mutex;
use tracing::{error, info, info_span, warn, Instrument, Span};

use crate::error::{BridgeError, BridgeResult};
use crate::events::{BridgeEvent, BridgeEvents};
use crate::manager::{BridgeEndpointManager, ManagerContext};
use crate::ports::ProtocolServer;

#[derive(Debug, Default)]
struct Runtime {
    status: BridgeStatus,
    status_reason: Option<String>,
}

/// A bridge: its configuration, protocol server and endpoints
///
/// Lifecycle operations (`start`, `stop`, `update`, `factory_reset`,
/// `dispose`) are serialized against each other. Reconciliation passes are
/// serialized separately by the endpoint manager.
pub struct Bridge {
    config: RwLock<BridgeConfig>,
    runtime: RwLock<Runtime>,
    manager: BridgeEndpointManager,
    server: Box<dyn ProtocolServer>,
    events: BridgeEvents,
    lifecycle: Mutex<()>,
    disposed: AtomicBool,
    span: Span,
}

impl Bridge {
    pub fn new(
        config: BridgeConfig,
        context: ManagerContext,
        server: Box<dyn ProtocolServer>,
        events: BridgeEvents,
    ) -> Self {
        let span = info_span!("bridge", id = %config.id, name = %config.name);
        context.registry.set_filter(config.filter.clone());
        let manager = BridgeEndpointManager::new(config.id.clone(), context, span.clone());

        Self {
            config: RwLock::new(config),
            runtime: RwLock::new(Runtime::default()),
            manager,
            server,
            events,
            lifecycle: Mutex::new(()),
            disposed: AtomicBool::new(false),
            span,
        }
    }

    pub fn id(&self) -> String {
        self.config().id
    }

    pub fn config(&self) -> BridgeConfig {
        self.config
            .read()
            .map(|c| c.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    pub fn port(&self) -> u16 {
        self.config().port
    }

    pub fn status(&self) -> BridgeStatus {
        self.runtime
            .read()
            .map(|r| r.status)
            .unwrap_or(BridgeStatus::Failed)
    }

    pub fn manager(&self) -> &BridgeEndpointManager {
        &self.manager
    }

    pub fn span(&self) -> &Span {
        &self.span
    }

    /// Snapshot of configuration and runtime state
    ///
    /// A running bridge whose server went offline reports `Failed`.
    pub fn data(&self) -> BridgeData {
        let (mut status, mut status_reason) = self
            .runtime
            .read()
            .map(|r| (r.status, r.status_reason.clone()))
            .unwrap_or((BridgeStatus::Failed, None));
        if status == BridgeStatus::Running && !self.server.is_online() {
            status = BridgeStatus::Failed;
            status_reason = Some("protocol server is offline".to_string());
        }

        BridgeData {
            config: self.config(),
            status,
            status_reason,
            device_count: self.manager.device_count(),
            failed_devices: self.manager.get_failed_devices(),
            commissioning: self.server.commissioning(),
        }
    }

    pub fn summary(&self) -> BridgeSummary {
        BridgeSummary::from(&self.data())
    }

    /// Bind the port, start the server and begin observing entity states
    ///
    /// A no-op when already running. A server failure leaves the bridge
    /// `Failed` with the cause as its status reason.
    pub async fn start(&self) -> BridgeResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        self.start_locked().instrument(self.span.clone()).await
    }

    async fn start_locked(&self) -> BridgeResult<()> {
        self.ensure_active()?;
        if self.status() == BridgeStatus::Running {
            return Ok(());
        }

        self.set_status(BridgeStatus::Starting, None);
        let config = self.config();
        info!(port = config.port, "Starting bridge");

        if let Err(e) = self.server.start(&config).await {
            error!(port = config.port, "Failed to start bridge: {}", e);
            self.set_status(BridgeStatus::Failed, Some(e.to_string()));
            self.publish();
            return Err(e.into());
        }

        self.manager.start_observing().await?;
        self.set_status(BridgeStatus::Running, None);
        info!("Bridge running");
        self.publish();
        Ok(())
    }

    /// Stop observing, stop the server and release the port
    pub async fn stop(&self) -> BridgeResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        self.stop_locked().instrument(self.span.clone()).await?;
        self.publish();
        Ok(())
    }

    async fn stop_locked(&self) -> BridgeResult<()> {
        self.manager.stop_observing();
        if let Err(e) = self.server.stop().await {
            error!("Failed to stop bridge: {}", e);
            self.set_status(BridgeStatus::Failed, Some(e.to_string()));
            return Err(e.into());
        }
        self.set_status(BridgeStatus::Stopped, None);
        info!("Bridge stopped");
        Ok(())
    }

    /// Run one reconciliation pass and announce the result
    pub async fn refresh_devices(&self) -> BridgeResult<()> {
        self.manager.refresh_devices().await?;
        self.publish();
        Ok(())
    }

    /// Apply a configuration change
    ///
    /// A port change on a running or failed bridge restarts the server on
    /// the new port. A reconciliation pass runs afterwards so the new filter
    /// applies.
    pub async fn update(&self, request: &UpdateBridgeRequest) -> BridgeResult<()> {
        {
            let _lifecycle = self.lifecycle.lock().await;
            self.update_locked(request)
                .instrument(self.span.clone())
                .await?;
        }
        self.refresh_devices().await
    }

    async fn update_locked(&self, request: &UpdateBridgeRequest) -> BridgeResult<()> {
        self.ensure_active()?;

        let (old_port, config) = {
            let mut config = self
                .config
                .write()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let old_port = config.port;
            config.apply(request);
            (old_port, config.clone())
        };
        self.manager.registry().set_filter(config.filter.clone());
        info!(name = %config.name, port = config.port, "Bridge configuration updated");

        let restart = matches!(self.status(), BridgeStatus::Running | BridgeStatus::Failed);
        if old_port != config.port && restart {
            info!("Port changed from {} to {}, restarting", old_port, config.port);
            self.stop_locked().await?;
            self.start_locked().await?;
        }
        Ok(())
    }

    /// Forget all commissioning state and come back up uncommissioned
    ///
    /// Only a running bridge is reset.
    pub async fn factory_reset(&self) -> BridgeResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        async {
            self.ensure_active()?;
            if self.status() != BridgeStatus::Running {
                warn!("Factory reset skipped, bridge is not running");
                return Ok(());
            }

            info!("Factory resetting bridge");
            self.stop_locked().await?;
            self.server.factory_reset().await?;
            self.start_locked().await
        }
        .instrument(self.span.clone())
        .await
    }

    /// Tear down: stop observing, stop the server, release the port
    ///
    /// Idempotent. The bridge refuses further lifecycle operations.
    pub async fn dispose(&self) -> BridgeResult<()> {
        let _lifecycle = self.lifecycle.lock().await;
        if self.disposed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        async {
            self.manager.dispose();
            let result = self.server.stop().await;
            self.set_status(BridgeStatus::Stopped, None);
            info!("Bridge disposed");
            result.map_err(BridgeError::from)
        }
        .instrument(self.span.clone())
        .await
    }

    /// Dispose and erase everything the server persisted
    pub async fn delete(&self) -> BridgeResult<()> {
        let disposed = self.dispose().await;
        self.server.erase().instrument(self.span.clone()).await?;
        disposed
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn ensure_active(&self) -> BridgeResult<()> {
        if self.is_disposed() {
            return Err(BridgeError::Disposed(self.id()));
        }
        Ok(())
    }

    fn set_status(&self, status: BridgeStatus, reason: Option<String>) {
        if let Ok(mut runtime) = self.runtime.write() {
            runtime.status = status;
            runtime.status_reason = reason;
        }
    }

    fn publish(&self) {
        self.events.publish(BridgeEvent::Updated(self.summary()));
    }
}

impl std::fmt::Debug for Bridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Bridge")
            .field("config", &self.config())
            .field("status", &self.status())
            .field("device_count", &self.manager.device_count())
            .finish()
    }
}
