// Telemetry sample domain models
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Operating mode reported by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceMode {
    Load,
    Charge,
    #[default]
    Standby,
}

impl DeviceMode {
    /// Case-insensitive parse; unknown names yield `None` so callers can default.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "load" => Some(DeviceMode::Load),
            "charge" | "charging" => Some(DeviceMode::Charge),
            "standby" | "idle" => Some(DeviceMode::Standby),
            _ => None,
        }
    }
}

/// Whether a sample came from the simulator or a real device path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    Simulated,
    Real,
}

/// One telemetry observation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample {
    pub timestamp: DateTime<Utc>,
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub temperature: f64,
    pub mode: DeviceMode,
    pub warnings: Vec<String>,
    pub origin: Origin,
    pub input_voltage: Option<f64>,
}

impl Sample {
    pub fn new(timestamp: DateTime<Utc>, voltage: f64, current: f64, origin: Origin) -> Self {
        Self {
            timestamp,
            voltage,
            current,
            power: voltage * current,
            temperature: 0.0,
            mode: DeviceMode::Standby,
            warnings: Vec::new(),
            origin,
            input_voltage: None,
        }
    }

    pub fn with_power(mut self, power: f64) -> Self {
        self.power = power;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_mode(mut self, mode: DeviceMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    pub fn with_input_voltage(mut self, input_voltage: Option<f64>) -> Self {
        self.input_voltage = input_voltage;
        self
    }

    /// Value used for the input-power proxy channel when the buffers are re-seeded
    /// from this sample.
    pub fn input_channel_value(&self) -> f64 {
        self.input_voltage.unwrap_or(self.voltage)
    }
}

/// Last numeric readings seen from a real source, used to fill in absent payload fields.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct LastKnown {
    pub voltage: f64,
    pub current: f64,
    pub temperature: f64,
}

impl LastKnown {
    pub fn remember(&mut self, sample: &Sample) {
        self.voltage = sample.voltage;
        self.current = sample.current;
        self.temperature = sample.temperature;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_is_derived_unless_supplied() {
        let now = Utc::now();
        let sample = Sample::new(now, 5.0, 0.6, Origin::Real);
        assert!((sample.power - 3.0).abs() < 1e-12);

        let sample = Sample::new(now, 5.0, 0.6, Origin::Real).with_power(2.5);
        assert_eq!(sample.power, 2.5);
    }

    #[test]
    fn test_input_channel_prefers_reported_input_voltage() {
        let now = Utc::now();
        let sample = Sample::new(now, 5.0, 0.6, Origin::Real);
        assert_eq!(sample.input_channel_value(), 5.0);

        let sample = sample.with_input_voltage(Some(19.5));
        assert_eq!(sample.input_channel_value(), 19.5);
    }

    #[test]
    fn test_device_mode_parse() {
        assert_eq!(DeviceMode::parse("LOAD"), Some(DeviceMode::Load));
        assert_eq!(DeviceMode::parse(" charge "), Some(DeviceMode::Charge));
        assert_eq!(DeviceMode::parse("standby"), Some(DeviceMode::Standby));
        assert_eq!(DeviceMode::parse("turbo"), None);
    }
}
