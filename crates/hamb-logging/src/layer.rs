use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::{Context, Layer};

use crate::buffer::LogEntry;
use crate::capture::LogCapture;
use crate::level::LogLevel;

/// `tracing_subscriber` layer that records every event into a [`LogCapture`]
///
/// The event target becomes the entry's facility. Structured fields other
/// than `message` are appended as `key=value` pairs.
#[derive(Debug, Clone)]
pub struct CaptureLayer {
    capture: Arc<LogCapture>,
}

impl CaptureLayer {
    pub fn new(capture: Arc<LogCapture>) -> Self {
        Self { capture }
    }

    pub fn capture(&self) -> &Arc<LogCapture> {
        &self.capture
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        self.capture.push(LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::from_tracing_level(metadata.level()),
            facility: metadata.target().to_string(),
            message: visitor.finish(),
        });
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: Vec<String>,
}

impl MessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            return self.message;
        }
        let fields = self.fields.join(" ");
        if self.message.is_empty() {
            fields
        } else {
            format!("{} {}", self.message, fields)
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields.push(format!("{}={}", field.name(), value));
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{value:?}");
        } else {
            self.fields.push(format!("{}={:?}", field.name(), value));
        }
    }
}
