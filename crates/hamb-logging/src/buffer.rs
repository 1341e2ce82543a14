//! Fixed-capacity ring buffer of log entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::capture::DEFAULT_BUFFER_SIZE;
use crate::level::LogLevel;

/// A single captured log entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// Logger name (the tracing target)
    pub facility: String,
    pub message: String,
}

/// Filter applied when reading from a [`LogBuffer`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    /// Keep entries at or above this level
    pub min_level: Option<LogLevel>,
    /// Case-insensitive substring of the facility
    pub facility: Option<String>,
    /// Case-insensitive substring of the message
    pub search: Option<String>,
    /// Keep entries at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Keep only the most recent N matches
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("log buffer capacity must be positive")]
pub struct ZeroCapacity;

/// Circular buffer that evicts the oldest entry once full
///
/// Slots are allocated once at construction. `head` is the next slot to
/// write; the oldest live entry sits `len` slots behind it.
#[derive(Debug)]
pub struct LogBuffer {
    slots: Vec<Option<LogEntry>>,
    head: usize,
    len: usize,
}

impl LogBuffer {
    pub fn new(capacity: usize) -> Result<Self, ZeroCapacity> {
        if capacity == 0 {
            return Err(ZeroCapacity);
        }
        Ok(Self {
            slots: vec![None; capacity],
            head: 0,
            len: 0,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Append an entry, overwriting the oldest one when full
    pub fn push(&mut self, entry: LogEntry) {
        let capacity = self.capacity();
        self.slots[self.head] = Some(entry);
        self.head = (self.head + 1) % capacity;
        if self.len < capacity {
            self.len += 1;
        }
    }

    /// Entries in chronological order (oldest first)
    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> + '_ {
        let capacity = self.capacity();
        let start = (self.head + capacity - self.len) % capacity;
        (0..self.len).filter_map(move |i| self.slots[(start + i) % capacity].as_ref())
    }

    /// Copy of all entries in chronological order
    pub fn all(&self) -> Vec<LogEntry> {
        self.iter().cloned().collect()
    }

    /// Copy of the entries matching `query`, oldest first
    pub fn query(&self, query: &LogQuery) -> Vec<LogEntry> {
        let facility = query.facility.as_ref().map(|f| f.to_lowercase());
        let search = query.search.as_ref().map(|s| s.to_lowercase());

        let mut entries: Vec<LogEntry> = self
            .iter()
            .filter(|e| query.min_level.map_or(true, |min| e.level >= min))
            .filter(|e| {
                facility
                    .as_ref()
                    .map_or(true, |f| e.facility.to_lowercase().contains(f.as_str()))
            })
            .filter(|e| {
                search
                    .as_ref()
                    .map_or(true, |s| e.message.to_lowercase().contains(s.as_str()))
            })
            .filter(|e| query.since.map_or(true, |since| e.timestamp >= since))
            .cloned()
            .collect();

        if let Some(limit) = query.limit.filter(|l| *l > 0) {
            if entries.len() > limit {
                entries.drain(..entries.len() - limit);
            }
        }

        entries
    }

    pub fn clear(&mut self) {
        self.slots.iter_mut().for_each(|slot| *slot = None);
        self.head = 0;
        self.len = 0;
    }
}

impl Default for LogBuffer {
    fn default() -> Self {
        Self {
            slots: vec![None; DEFAULT_BUFFER_SIZE],
            head: 0,
            len: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(n: usize) -> LogEntry {
        LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Info,
            facility: "test".to_string(),
            message: format!("message {n}"),
        }
    }

    fn messages(buffer: &LogBuffer) -> Vec<String> {
        buffer.iter().map(|e| e.message.clone()).collect()
    }

    #[test]
    fn test_zero_capacity_rejected() {
        assert_eq!(LogBuffer::new(0).unwrap_err(), ZeroCapacity);
    }

    #[test]
    fn test_push_below_capacity() {
        let mut buffer = LogBuffer::new(3).unwrap();
        buffer.push(entry(1));
        buffer.push(entry(2));

        assert_eq!(buffer.len(), 2);
        assert_eq!(messages(&buffer), vec!["message 1", "message 2"]);
    }

    #[test]
    fn test_wraparound_keeps_chronological_order() {
        let mut buffer = LogBuffer::new(3).unwrap();
        for n in 1..=5 {
            buffer.push(entry(n));
        }

        assert_eq!(buffer.len(), 3);
        assert_eq!(
            messages(&buffer),
            vec!["message 3", "message 4", "message 5"]
        );
    }

    #[test]
    fn test_clear_resets_cursor() {
        let mut buffer = LogBuffer::new(2).unwrap();
        for n in 1..=3 {
            buffer.push(entry(n));
        }
        buffer.clear();
        assert!(buffer.is_empty());

        buffer.push(entry(9));
        assert_eq!(messages(&buffer), vec!["message 9"]);
    }

    #[test]
    fn test_query_filters() {
        let mut buffer = LogBuffer::new(10).unwrap();
        let old = Utc::now() - Duration::hours(1);
        buffer.push(LogEntry {
            timestamp: old,
            level: LogLevel::Debug,
            facility: "hamb_bridges::manager".to_string(),
            message: "Adding endpoint light.a".to_string(),
        });
        buffer.push(LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Warn,
            facility: "hamb_bridges::manager".to_string(),
            message: "Invalid device detected".to_string(),
        });
        buffer.push(LogEntry {
            timestamp: Utc::now(),
            level: LogLevel::Error,
            facility: "hamb_storage".to_string(),
            message: "Write failed".to_string(),
        });

        let warn_up = buffer.query(&LogQuery {
            min_level: Some(LogLevel::Warn),
            ..Default::default()
        });
        assert_eq!(warn_up.len(), 2);

        let by_facility = buffer.query(&LogQuery {
            facility: Some("MANAGER".to_string()),
            ..Default::default()
        });
        assert_eq!(by_facility.len(), 2);

        let by_search = buffer.query(&LogQuery {
            search: Some("invalid".to_string()),
            ..Default::default()
        });
        assert_eq!(by_search.len(), 1);

        let recent = buffer.query(&LogQuery {
            since: Some(old + Duration::minutes(1)),
            ..Default::default()
        });
        assert_eq!(recent.len(), 2);

        let limited = buffer.query(&LogQuery {
            limit: Some(1),
            ..Default::default()
        });
        assert_eq!(limited.len(), 1);
        assert_eq!(limited[0].message, "Write failed");
    }
}
