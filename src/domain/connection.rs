// Connection state domain model
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    WebSerial,
    Bridge,
    Simulation,
}

impl Transport {
    /// True for transports backed by a physical device.
    pub fn is_real(self) -> bool {
        !matches!(self, Transport::Simulation)
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Transport::WebSerial => "web serial",
            Transport::Bridge => "bridge",
            Transport::Simulation => "simulation",
        };
        f.write_str(name)
    }
}

/// Connection state as reported by the connection-management collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub connected: bool,
    pub transport: Transport,
    #[serde(default)]
    pub connecting: bool,
}

#[cfg(test)]
impl ConnectionReport {
    pub fn connected(transport: Transport) -> Self {
        Self {
            connected: true,
            transport,
            connecting: false,
        }
    }

    pub fn connecting(transport: Transport) -> Self {
        Self {
            connected: false,
            transport,
            connecting: true,
        }
    }

    pub fn disconnected() -> Self {
        Self {
            connected: false,
            transport: Transport::Simulation,
            connecting: false,
        }
    }
}

/// Connection lifecycle as tracked by the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "phase", content = "transport", rename_all = "lowercase")]
pub enum ConnectionPhase {
    #[default]
    Disconnected,
    Connecting(Transport),
    Connected(Transport),
}

impl ConnectionPhase {
    pub fn from_report(report: ConnectionReport) -> Self {
        match (report.connected, report.connecting) {
            (true, _) => ConnectionPhase::Connected(report.transport),
            (false, true) => ConnectionPhase::Connecting(report.transport),
            (false, false) => ConnectionPhase::Disconnected,
        }
    }

    /// The transport when connected to a physical device, `None` otherwise.
    pub fn device_transport(&self) -> Option<Transport> {
        match self {
            ConnectionPhase::Connected(transport) if transport.is_real() => Some(*transport),
            _ => None,
        }
    }
}

impl fmt::Display for ConnectionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionPhase::Disconnected => f.write_str("disconnected"),
            ConnectionPhase::Connecting(transport) => write!(f, "connecting ({})", transport),
            ConnectionPhase::Connected(transport) => write!(f, "connected ({})", transport),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_from_report() {
        assert_eq!(
            ConnectionPhase::from_report(ConnectionReport::connected(Transport::Bridge)),
            ConnectionPhase::Connected(Transport::Bridge)
        );
        assert_eq!(
            ConnectionPhase::from_report(ConnectionReport::connecting(Transport::WebSerial)),
            ConnectionPhase::Connecting(Transport::WebSerial)
        );
        assert_eq!(
            ConnectionPhase::from_report(ConnectionReport::disconnected()),
            ConnectionPhase::Disconnected
        );
    }

    #[test]
    fn test_device_transport_excludes_simulation() {
        assert_eq!(
            ConnectionPhase::Connected(Transport::WebSerial).device_transport(),
            Some(Transport::WebSerial)
        );
        assert_eq!(ConnectionPhase::Connected(Transport::Simulation).device_transport(), None);
        assert_eq!(ConnectionPhase::Connecting(Transport::Bridge).device_transport(), None);
    }

    #[test]
    fn test_report_deserializes_without_connecting_flag() {
        let report: ConnectionReport =
            serde_json::from_str(r#"{"connected": true, "transport": "webserial"}"#).unwrap();
        assert_eq!(report, ConnectionReport::connected(Transport::WebSerial));
    }
}
