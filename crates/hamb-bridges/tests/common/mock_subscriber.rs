use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use futures::channel::mpsc;
use futures::StreamExt;
use hamb_bridges::{EntitySubscriber, StateStream, SubscriptionError};
use hamb_core::{EntityState, StateBatch};

use super::Gate;

/// Subscriber whose pushes are driven by the test
///
/// Every `subscribe` call opens a fresh channel; `push` sends to the newest.
#[derive(Default)]
pub struct MockSubscriber {
    subscriptions: Mutex<Vec<(Vec<String>, mpsc::UnboundedSender<StateBatch>)>>,
    gate: Mutex<Option<Arc<Gate>>>,
}

impl MockSubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    /// Park the next `subscribe` call at `gate`
    pub fn hold(&self, gate: Arc<Gate>) {
        *self.gate.lock().unwrap() = Some(gate);
    }

    /// Entity id lists of every subscription opened so far
    pub fn subscriptions(&self) -> Vec<Vec<String>> {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .map(|(ids, _)| ids.clone())
            .collect()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.lock().unwrap().len()
    }

    /// Number of subscriptions whose stream is still held by the engine
    pub fn open_count(&self) -> usize {
        self.subscriptions
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, tx)| !tx.is_closed())
            .count()
    }

    /// Push a batch on the newest subscription; false when it is closed
    pub fn push(&self, batch: StateBatch) -> bool {
        self.subscriptions
            .lock()
            .unwrap()
            .last()
            .map(|(_, tx)| tx.unbounded_send(batch).is_ok())
            .unwrap_or(false)
    }
}

#[async_trait]
impl EntitySubscriber for MockSubscriber {
    async fn subscribe(&self, entity_ids: Vec<String>) -> Result<StateStream, SubscriptionError> {
        let gate = self.gate.lock().unwrap().take();
        if let Some(gate) = gate {
            gate.pass().await;
        }

        let (tx, rx) = mpsc::unbounded();
        self.subscriptions.lock().unwrap().push((entity_ids, tx));
        Ok(rx.boxed())
    }
}

pub fn batch(states: &[(&str, &str)]) -> StateBatch {
    states
        .iter()
        .map(|(id, state)| {
            (
                id.to_string(),
                EntityState::new(*id, *state, Default::default()),
            )
        })
        .collect()
}
