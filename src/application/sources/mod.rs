// Telemetry sources - Simulator, bridge poller and push listener
pub mod payload;
pub mod poller;
pub mod push_listener;
pub mod simulator;

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Path a device payload took to reach the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Ingress {
    Poll,
    Push,
}

impl fmt::Display for Ingress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ingress::Poll => f.write_str("poll"),
            Ingress::Push => f.write_str("push"),
        }
    }
}

/// Undecoded device payload together with when and how it arrived.
#[derive(Debug, Clone, PartialEq)]
pub struct Arrival {
    pub via: Ingress,
    pub body: serde_json::Value,
    pub received_at: DateTime<Utc>,
}

impl Arrival {
    pub fn new(via: Ingress, body: serde_json::Value) -> Self {
        Self {
            via,
            body,
            received_at: Utc::now(),
        }
    }
}
