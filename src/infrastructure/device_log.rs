// Device log - Bounded operator log backing GET /logs
use crate::application::log_sink::{LogLevel, LogSink, TracingSink};
use crate::domain::ring_buffer::RingBuffer;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogEntry {
    pub at: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
}

pub struct DeviceLog {
    entries: Mutex<RingBuffer<LogEntry>>,
}

impl DeviceLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(RingBuffer::new(capacity)),
        }
    }

    /// Oldest first.
    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.snapshot(),
            Err(poisoned) => poisoned.into_inner().snapshot(),
        }
    }
}

impl LogSink for DeviceLog {
    fn record(&self, level: LogLevel, message: &str) {
        TracingSink.record(level, message);

        let entry = LogEntry {
            at: Utc::now(),
            level,
            message: message.to_string(),
        };
        match self.entries.lock() {
            Ok(mut entries) => entries.push(entry),
            Err(poisoned) => poisoned.into_inner().push(entry),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keeps_most_recent_entries() {
        let log = DeviceLog::new(2);
        log.info("connected");
        log.warn("Battery charge mode is already running");
        log.info("disconnected");

        let entries = log.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert_eq!(entries[1].message, "disconnected");
    }

    #[test]
    fn test_entries_serialize_with_lowercase_level() {
        let log = DeviceLog::new(4);
        log.info("hello");
        let value = serde_json::to_value(log.entries()).unwrap();
        assert_eq!(value[0]["level"], "info");
        assert_eq!(value[0]["message"], "hello");
    }
}
