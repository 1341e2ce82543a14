use std::sync::Arc;

use hamb_logging::{CaptureLayer, LogCapture, LogEntry, LogLevel};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::layer::SubscriberExt;

/// Capture every event on the current thread until the guard is dropped
///
/// Works with the default current-thread `#[tokio::test]` runtime, where
/// spawned tasks run on the test thread too.
pub fn capture_logs() -> (Arc<LogCapture>, DefaultGuard) {
    let capture = Arc::new(LogCapture::new(512).expect("non-zero capacity"));
    let subscriber = tracing_subscriber::registry().with(CaptureLayer::new(capture.clone()));
    let guard = tracing::subscriber::set_default(subscriber);
    (capture, guard)
}

pub fn logs_at(capture: &LogCapture, level: LogLevel) -> Vec<LogEntry> {
    capture
        .entries()
        .into_iter()
        .filter(|e| e.level == level)
        .collect()
}

pub fn assert_logged(capture: &LogCapture, level: LogLevel, needle: &str) {
    let found = logs_at(capture, level)
        .iter()
        .any(|e| e.message.contains(needle));
    assert!(
        found,
        "Expected a {} log containing '{}', got: {:#?}",
        level,
        needle,
        capture.entries()
    );
}
