use std::sync::Arc;

use tokio::sync::Notify;

/// Parks an async call until the test opens it
#[derive(Default)]
pub struct Gate {
    entered: Notify,
    release: Notify,
}

impl Gate {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Called by the double: signal arrival, then wait for `open`
    pub async fn pass(&self) {
        self.entered.notify_one();
        self.release.notified().await;
    }

    /// Wait until a call is parked at the gate
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    pub fn open(&self) {
        self.release.notify_one();
    }
}
