//! Change notifications published by bridges and the bridge service

use hamb_core::BridgeSummary;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::trace;

/// Default capacity of the event channel
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

/// Something observers of the bridge list should know about
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BridgeEvent {
    /// A bridge changed (started, stopped, finished a pass, was reconfigured)
    Updated(BridgeSummary),
    /// A bridge was deleted
    Removed { id: String },
    /// Periodic full snapshot
    Heartbeat { bridges: Vec<BridgeSummary> },
}

/// Broadcast channel for [`BridgeEvent`]s
///
/// Cloning shares the channel. Publishing without subscribers is not an error.
#[derive(Debug, Clone)]
pub struct BridgeEvents {
    sender: broadcast::Sender<BridgeEvent>,
}

impl BridgeEvents {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<BridgeEvent> {
        self.sender.subscribe()
    }

    pub fn publish(&self, event: BridgeEvent) {
        trace!(?event, "Publishing bridge event");
        let _ = self.sender.send(event);
    }

    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BridgeEvents {
    fn default() -> Self {
        Self::new()
    }
}
