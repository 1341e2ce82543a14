use std::sync::RwLock;

use chrono::Utc;

use crate::buffer::{LogBuffer, LogEntry, LogQuery, ZeroCapacity};
use crate::level::LogLevel;

/// Default number of entries kept by a [`LogCapture`]
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

/// Thread-safe log capture service
///
/// Holds the most recent log entries for the status/log readers.
#[derive(Debug)]
pub struct LogCapture {
    buffer: RwLock<LogBuffer>,
}

impl LogCapture {
    pub fn new(capacity: usize) -> Result<Self, ZeroCapacity> {
        Ok(Self {
            buffer: RwLock::new(LogBuffer::new(capacity)?),
        })
    }

    /// Record a log entry stamped with the current time
    pub fn log(&self, level: LogLevel, facility: &str, message: impl Into<String>) {
        self.push(LogEntry {
            timestamp: Utc::now(),
            level,
            facility: facility.to_string(),
            message: message.into(),
        });
    }

    pub fn push(&self, entry: LogEntry) {
        if let Ok(mut buffer) = self.buffer.write() {
            buffer.push(entry);
        }
    }

    /// All captured entries, oldest first
    pub fn entries(&self) -> Vec<LogEntry> {
        self.buffer.read().map(|b| b.all()).unwrap_or_default()
    }

    pub fn query(&self, query: &LogQuery) -> Vec<LogEntry> {
        self.buffer.read().map(|b| b.query(query)).unwrap_or_default()
    }

    pub fn clear(&self) {
        if let Ok(mut buffer) = self.buffer.write() {
            buffer.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.buffer.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.read().map(|b| b.is_empty()).unwrap_or(true)
    }
}

impl Default for LogCapture {
    fn default() -> Self {
        Self {
            buffer: RwLock::new(LogBuffer::default()),
        }
    }
}
