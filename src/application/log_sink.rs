// Log sink trait - Operator-visible device log
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warn,
}

/// Destination for messages the operator should see (connection changes,
/// rejected mode starts, hand-offs between telemetry sources).
pub trait LogSink: Send + Sync {
    fn record(&self, level: LogLevel, message: &str);

    fn info(&self, message: &str) {
        self.record(LogLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(LogLevel::Warn, message);
    }
}

/// Sink that only forwards to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn record(&self, level: LogLevel, message: &str) {
        match level {
            LogLevel::Info => tracing::info!(target: "device", "{}", message),
            LogLevel::Warn => tracing::warn!(target: "device", "{}", message),
        }
    }
}
