//! State subscriptions against the entity store

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use futures::{stream, StreamExt};
use hamb_bridges::{EntitySubscriber, StateStream, SubscriptionError};
use hamb_core::StateBatch;
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

/// Streams state changes for a fixed set of entities
///
/// A new stream first yields the current states of the requested entities
/// (when any exist), then every later write to one of them.
pub struct StoreSubscriber {
    store: Arc<crate::EntityStore>,
}

impl StoreSubscriber {
    pub fn new(store: Arc<crate::EntityStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl EntitySubscriber for StoreSubscriber {
    async fn subscribe(&self, entity_ids: Vec<String>) -> Result<StateStream, SubscriptionError> {
        // subscribe before the snapshot so no write falls in between
        let changes = BroadcastStream::new(self.store.subscribe());

        let initial: StateBatch = entity_ids
            .iter()
            .filter_map(|id| self.store.state(id).map(|s| (id.clone(), s)))
            .collect();
        let initial = stream::iter((!initial.is_empty()).then_some(initial));

        let wanted: Arc<HashSet<String>> = Arc::new(entity_ids.into_iter().collect());
        let changes = changes.filter_map(move |received| {
            let wanted = wanted.clone();
            async move {
                match received {
                    Ok(batch) => {
                        let batch: StateBatch = batch
                            .into_iter()
                            .filter(|(id, _)| wanted.contains(id))
                            .collect();
                        (!batch.is_empty()).then_some(batch)
                    }
                    Err(BroadcastStreamRecvError::Lagged(skipped)) => {
                        warn!("State subscription lagged, {} updates skipped", skipped);
                        None
                    }
                }
            }
        });

        Ok(initial.chain(changes).boxed())
    }
}
