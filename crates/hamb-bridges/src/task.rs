//! Cancellable scheduled tasks

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info};

/// A job run on a fixed interval until cancelled
///
/// The first run happens one full period after spawning. Runs never
/// overlap: a slow run delays the next tick.
#[derive(Debug)]
pub struct PeriodicTask {
    name: String,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    handle: JoinHandle<()>,
}

impl PeriodicTask {
    pub fn spawn<F, Fut>(name: impl Into<String>, period: Duration, mut job: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let (shutdown_tx, mut shutdown_rx) = broadcast::channel(1);
        let running = Arc::new(AtomicBool::new(true));

        let task_name = name.clone();
        let task_running = running.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // the first tick completes immediately
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        debug!(task = %task_name, "Running periodic task");
                        job().await;
                    }
                    _ = shutdown_rx.recv() => {
                        break;
                    }
                }
            }

            task_running.store(false, Ordering::SeqCst);
            info!(task = %task_name, "Periodic task stopped");
        });

        info!(task = %name, period_secs = period.as_secs(), "Periodic task started");
        Self {
            name,
            running,
            shutdown_tx,
            handle,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Signal the task to stop after its current run and wait for it
    pub async fn cancel(self) {
        let _ = self.shutdown_tx.send(());
        let _ = self.handle.await;
    }
}
