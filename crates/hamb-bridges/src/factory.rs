use std::sync::Arc;

use async_trait::async_trait;
use hamb_core::BridgeConfig;

use crate::bridge::Bridge;
use crate::error::BridgeResult;
use crate::events::BridgeEvents;

/// Builds a [`Bridge`] from its configuration
///
/// Implementations choose the protocol server, entity source and endpoint
/// construction path. Bridges publish their changes on `events`.
#[async_trait]
pub trait BridgeFactory: Send + Sync {
    async fn create(&self, config: BridgeConfig, events: BridgeEvents) -> BridgeResult<Arc<Bridge>>;
}
