//! Reconciliation of desired entities against live endpoints

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use futures::StreamExt;
use hamb_core::{FailedDevice, FailureKind, StateBatch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn, Instrument, Span};

use crate::error::{BridgeError, BridgeResult, EndpointError};
use crate::ports::{Aggregator, BridgeRegistry, EndpointFactory, EntitySubscriber};

/// Everything a [`BridgeEndpointManager`] talks to
#[derive(Clone)]
pub struct ManagerContext {
    pub registry: Arc<dyn BridgeRegistry>,
    pub factory: Arc<dyn EndpointFactory>,
    pub aggregator: Arc<dyn Aggregator>,
    pub subscriber: Arc<dyn EntitySubscriber>,
}

/// A running state subscription; aborted when dropped
struct Subscription {
    handle: JoinHandle<()>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Owns the endpoints of one bridge
///
/// [`refresh_devices`](Self::refresh_devices) runs one reconciliation pass.
/// Passes and delivered state batches are serialized by a per-bridge lock,
/// so a batch is never applied while endpoints are being deleted or created.
pub struct BridgeEndpointManager {
    bridge_id: String,
    registry: Arc<dyn BridgeRegistry>,
    factory: Arc<dyn EndpointFactory>,
    aggregator: Arc<dyn Aggregator>,
    subscriber: Arc<dyn EntitySubscriber>,
    pass_lock: Arc<tokio::sync::Mutex<()>>,
    entity_ids: RwLock<Vec<String>>,
    failed_devices: RwLock<Vec<FailedDevice>>,
    observing: AtomicBool,
    subscription: Mutex<Option<Subscription>>,
    disposed: Arc<AtomicBool>,
    span: Span,
}

impl BridgeEndpointManager {
    pub fn new(bridge_id: impl Into<String>, context: ManagerContext, span: Span) -> Self {
        Self {
            bridge_id: bridge_id.into(),
            registry: context.registry,
            factory: context.factory,
            aggregator: context.aggregator,
            subscriber: context.subscriber,
            pass_lock: Arc::new(tokio::sync::Mutex::new(())),
            entity_ids: RwLock::new(Vec::new()),
            failed_devices: RwLock::new(Vec::new()),
            observing: AtomicBool::new(false),
            subscription: Mutex::new(None),
            disposed: Arc::new(AtomicBool::new(false)),
            span,
        }
    }

    pub fn registry(&self) -> &Arc<dyn BridgeRegistry> {
        &self.registry
    }

    /// Failures of the most recent pass (a fresh copy on every call)
    pub fn get_failed_devices(&self) -> Vec<FailedDevice> {
        self.failed_devices
            .read()
            .map(|f| f.clone())
            .unwrap_or_default()
    }

    pub fn clear_failed_devices(&self) {
        if let Ok(mut failed) = self.failed_devices.write() {
            failed.clear();
        }
    }

    /// Desired entity ids fetched by the most recent pass
    pub fn entity_ids(&self) -> Vec<String> {
        self.entity_ids
            .read()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    /// Number of live endpoints
    pub fn device_count(&self) -> usize {
        self.aggregator.len()
    }

    pub fn is_observing(&self) -> bool {
        self.observing.load(Ordering::SeqCst)
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Run one reconciliation pass
    ///
    /// Only a registry refresh failure aborts the pass. Every per-entity
    /// failure is recorded in [`get_failed_devices`](Self::get_failed_devices)
    /// and the pass moves on.
    pub async fn refresh_devices(&self) -> BridgeResult<()> {
        let _pass = self.pass_lock.lock().await;
        self.reconcile().instrument(self.span.clone()).await
    }

    async fn reconcile(&self) -> BridgeResult<()> {
        if self.is_disposed() {
            return Err(BridgeError::Disposed(self.bridge_id.clone()));
        }

        self.registry
            .refresh()
            .await
            .map_err(BridgeError::RegistryRefresh)?;

        let endpoints = self.aggregator.parts();
        let desired = self.registry.entity_ids();
        if let Ok(mut ids) = self.entity_ids.write() {
            *ids = desired.clone();
        }

        self.clear_failed_devices();

        let desired_set: HashSet<&str> = desired.iter().map(String::as_str).collect();
        let mut handled: HashSet<String> = HashSet::new();

        for endpoint in endpoints {
            let entity_id = endpoint.entity_id().to_string();
            if desired_set.contains(entity_id.as_str()) {
                handled.insert(entity_id);
                continue;
            }

            match endpoint.delete().await {
                Ok(()) => {
                    self.aggregator.remove(&entity_id);
                    debug!(entity_id = %entity_id, "Removed endpoint");
                }
                Err(e) => {
                    warn!("Failed to delete endpoint {}: {}", entity_id, e);
                }
            }
        }

        for entity_id in &desired {
            if !handled.insert(entity_id.clone()) {
                continue;
            }
            self.create_endpoint(entity_id).await;
        }

        let success_count = self.aggregator.len();
        let failed_count = self.failed_devices.read().map(|f| f.len()).unwrap_or(0);
        if failed_count > 0 {
            warn!(
                "Device refresh completed: {} successful, {} failed",
                success_count, failed_count
            );
        } else {
            info!(
                "Device refresh completed successfully: {} devices loaded",
                success_count
            );
        }

        if self.is_observing() {
            self.arm_subscription().await;
        }

        Ok(())
    }

    async fn create_endpoint(&self, entity_id: &str) {
        let endpoint = match self.factory.create(self.registry.as_ref(), entity_id).await {
            Ok(endpoint) => endpoint,
            Err(EndpointError::InvalidDevice(reason)) => {
                warn!(
                    "Invalid device detected. Entity: {} Reason: {}",
                    entity_id, reason
                );
                self.record_failure(FailedDevice::new(
                    entity_id,
                    FailureKind::InvalidDevice,
                    reason,
                ));
                return;
            }
            Err(e) => {
                error!("Failed to create device {}. Error: {}", entity_id, e);
                self.record_failure(FailedDevice::new(entity_id, FailureKind::CreationFailed, e));
                return;
            }
        };

        match self.aggregator.add(endpoint).await {
            Ok(()) => debug!("Successfully added endpoint for {}", entity_id),
            Err(e) => {
                error!("Failed to add endpoint {} to aggregator: {}", entity_id, e);
                self.record_failure(FailedDevice::new(entity_id, FailureKind::AttachFailed, e));
                self.aggregator.remove(entity_id);
            }
        }
    }

    fn record_failure(&self, failure: FailedDevice) {
        if let Ok(mut failed) = self.failed_devices.write() {
            failed.push(failure);
        }
    }

    /// Subscribe to state updates for the current desired entities
    ///
    /// Replaces any previous subscription. Nothing is opened while the
    /// desired set is empty, but later passes re-arm the subscription.
    pub async fn start_observing(&self) -> BridgeResult<()> {
        let _pass = self.pass_lock.lock().await;
        if self.is_disposed() {
            return Err(BridgeError::Disposed(self.bridge_id.clone()));
        }
        self.observing.store(true, Ordering::SeqCst);
        self.arm_subscription().instrument(self.span.clone()).await;
        Ok(())
    }

    /// Tear down the state subscription; idempotent
    ///
    /// A pass that is still subscribing drops its stream instead of keeping it.
    pub fn stop_observing(&self) {
        self.observing.store(false, Ordering::SeqCst);
        self.teardown_subscription();
    }

    fn teardown_subscription(&self) {
        let previous = self.subscription.lock().ok().and_then(|mut s| s.take());
        if previous.is_some() {
            debug!(parent: &self.span, "State subscription closed");
        }
    }

    async fn arm_subscription(&self) {
        self.teardown_subscription();

        let entity_ids = self.entity_ids();
        if entity_ids.is_empty() {
            return;
        }

        let count = entity_ids.len();
        let mut stream = match self.subscriber.subscribe(entity_ids).await {
            Ok(stream) => stream,
            Err(e) => {
                error!("Failed to subscribe to entity states: {}", e);
                return;
            }
        };

        // Observing may have been stopped while `subscribe` was pending.
        let Ok(mut slot) = self.subscription.lock() else {
            return;
        };
        if !self.is_observing() || self.is_disposed() {
            debug!("Observing stopped during subscribe, dropping stream");
            return;
        }

        let aggregator = self.aggregator.clone();
        let pass_lock = self.pass_lock.clone();
        let disposed = self.disposed.clone();
        let handle = tokio::spawn(
            async move {
                while let Some(batch) = stream.next().await {
                    if disposed.load(Ordering::SeqCst) {
                        break;
                    }
                    let _pass = pass_lock.lock().await;
                    if disposed.load(Ordering::SeqCst) {
                        break;
                    }
                    apply_states(aggregator.as_ref(), &batch).await;
                }
            }
            .instrument(self.span.clone()),
        );

        *slot = Some(Subscription { handle });
        debug!("Observing {} entities", count);
    }

    /// Forward a batch of states to every live endpoint
    ///
    /// Dropped once the manager is disposed.
    pub async fn update_states(&self, states: &StateBatch) {
        let _pass = self.pass_lock.lock().await;
        if self.is_disposed() {
            return;
        }
        apply_states(self.aggregator.as_ref(), states).await;
    }

    /// Stop observing and refuse any further work
    pub fn dispose(&self) {
        self.disposed.store(true, Ordering::SeqCst);
        self.stop_observing();
    }
}

impl Drop for BridgeEndpointManager {
    fn drop(&mut self) {
        self.disposed.store(true, Ordering::SeqCst);
    }
}

async fn apply_states(aggregator: &dyn Aggregator, states: &StateBatch) {
    for endpoint in aggregator.parts() {
        endpoint.update_states(states).await;
    }
}
