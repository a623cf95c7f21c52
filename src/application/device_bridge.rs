// Device bridge trait - The process that owns the serial port
use crate::domain::output_mode::{clamp_current, clamp_voltage, InvalidSetpoint, Setpoint};
use async_trait::async_trait;
use serde::Serialize;

/// Body of `POST /set`. Current is sent in whole milliamps, as the device expects.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SetpointCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current: Option<u32>,
}

fn to_wire_volts(voltage: f64) -> f64 {
    (voltage * 100.0).round() / 100.0
}

fn to_wire_milliamps(current: f64) -> u32 {
    (current * 1000.0).round() as u32
}

impl SetpointCommand {
    pub fn from_setpoint(setpoint: Setpoint) -> Self {
        Self {
            voltage: Some(to_wire_volts(setpoint.voltage)),
            current: Some(to_wire_milliamps(setpoint.current)),
        }
    }

    /// Build a partial command, clamping each supplied field to the supply limits.
    pub fn partial(voltage: Option<f64>, current: Option<f64>) -> Result<Self, InvalidSetpoint> {
        let voltage = voltage.map(clamp_voltage).transpose()?;
        let current = current.map(clamp_current).transpose()?;
        Ok(Self {
            voltage: voltage.map(to_wire_volts),
            current: current.map(to_wire_milliamps),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.voltage.is_none() && self.current.is_none()
    }
}

#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Latest reading as raw JSON; decoding and defaulting happen in the coordinator.
    async fn read(&self) -> anyhow::Result<serde_json::Value>;

    /// Push new setpoints to the device
    async fn set(&self, command: SetpointCommand) -> anyhow::Result<()>;

    /// Enable or disable the output stage
    async fn toggle(&self, on: bool) -> anyhow::Result<()>;

    /// Ask the device to emit a telemetry line immediately
    async fn feedback(&self) -> anyhow::Result<()>;
}
