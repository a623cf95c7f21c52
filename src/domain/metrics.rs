// Channel history and display projections
use crate::domain::connection::ConnectionPhase;
use crate::domain::output_mode::{ModeKind, OutputMode, Setpoint};
use crate::domain::ring_buffer::RingBuffer;
use crate::domain::telemetry::{DeviceMode, Sample};
use serde::Serialize;

/// Charted channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    /// Input power/voltage proxy, driven by setpoints and ramps.
    InputPower,
    OutputPower,
    OutputVoltage,
    OutputCurrent,
}

impl Channel {
    fn index(self) -> usize {
        match self {
            Channel::InputPower => 0,
            Channel::OutputPower => 1,
            Channel::OutputVoltage => 2,
            Channel::OutputCurrent => 3,
        }
    }
}

/// One rolling buffer per charted channel.
#[derive(Debug, Clone)]
pub struct ChannelHistory {
    buffers: [RingBuffer<f64>; 4],
}

impl ChannelHistory {
    pub fn new(depth: usize) -> Self {
        Self {
            buffers: std::array::from_fn(|_| RingBuffer::new(depth)),
        }
    }

    pub fn push(&mut self, channel: Channel, value: f64) {
        self.buffers[channel.index()].push(value);
    }

    /// Push the measured output channels of a sample. The input channel is left
    /// to the caller since it may be owned by a ramp.
    pub fn push_outputs(&mut self, sample: &Sample) {
        self.push(Channel::OutputPower, sample.power);
        self.push(Channel::OutputVoltage, sample.voltage);
        self.push(Channel::OutputCurrent, sample.current);
    }

    /// Fill every channel with the sample's values, discarding earlier history.
    pub fn reset_to(&mut self, sample: &Sample) {
        let fills = [
            (Channel::InputPower, sample.input_channel_value()),
            (Channel::OutputPower, sample.power),
            (Channel::OutputVoltage, sample.voltage),
            (Channel::OutputCurrent, sample.current),
        ];
        for (channel, value) in fills {
            let buffer = &mut self.buffers[channel.index()];
            let depth = buffer.capacity();
            buffer.reset(value, depth);
        }
    }

    pub fn channel(&self, channel: Channel) -> Vec<f64> {
        self.buffers[channel.index()].snapshot()
    }

    pub fn snapshot(&self) -> HistorySnapshot {
        HistorySnapshot {
            input_power: self.channel(Channel::InputPower),
            output_power: self.channel(Channel::OutputPower),
            output_voltage: self.channel(Channel::OutputVoltage),
            output_current: self.channel(Channel::OutputCurrent),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub input_power: Vec<f64>,
    pub output_power: Vec<f64>,
    pub output_voltage: Vec<f64>,
    pub output_current: Vec<f64>,
}

/// Where the displayed electrical values came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplaySource {
    /// A fresh sample from a real device.
    Live,
    /// Derived from the active mode's setpoint.
    Setpoint,
    /// No fresh data and no active mode.
    Idle,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayedMetrics {
    pub voltage: f64,
    pub current: f64,
    pub power: f64,
    pub input_voltage: f64,
    pub temperature: Option<f64>,
    pub mode: DeviceMode,
    pub warnings: Vec<String>,
    pub source: DisplaySource,
}

impl DisplayedMetrics {
    pub fn live(sample: &Sample, fallback_input: f64) -> Self {
        Self {
            voltage: sample.voltage,
            current: sample.current,
            power: sample.power,
            input_voltage: sample.input_voltage.unwrap_or(fallback_input),
            temperature: Some(sample.temperature),
            mode: sample.mode,
            warnings: sample.warnings.clone(),
            source: DisplaySource::Live,
        }
    }

    pub fn from_setpoint(
        setpoint: Setpoint,
        kind: ModeKind,
        input_value: f64,
        temperature: Option<f64>,
    ) -> Self {
        let mode = match kind {
            ModeKind::Load => DeviceMode::Load,
            ModeKind::Battery | ModeKind::Mobile => DeviceMode::Charge,
        };
        Self {
            voltage: setpoint.voltage,
            current: setpoint.current,
            power: setpoint.power(),
            input_voltage: input_value,
            temperature,
            mode,
            warnings: Vec::new(),
            source: DisplaySource::Setpoint,
        }
    }

    pub fn idle(temperature: Option<f64>) -> Self {
        Self {
            voltage: 0.0,
            current: 0.0,
            power: 0.0,
            input_voltage: 0.0,
            temperature,
            mode: DeviceMode::Standby,
            warnings: Vec::new(),
            source: DisplaySource::Idle,
        }
    }
}

/// Mode-specific flags surfaced to the UI.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModeFlags {
    pub load_active: bool,
    pub battery_charging: bool,
    pub mobile_charging: bool,
}

impl ModeFlags {
    pub fn for_kind(kind: ModeKind) -> Self {
        Self {
            load_active: kind == ModeKind::Load,
            battery_charging: kind == ModeKind::Battery,
            mobile_charging: kind == ModeKind::Mobile,
        }
    }
}

/// Which scheduled activities are currently live.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TimerStatus {
    pub simulator: bool,
    pub poller: bool,
    pub push_listener: bool,
    pub input_ramp: bool,
}

/// Read-only projection of the coordinator state.
#[derive(Debug, Clone, Serialize)]
pub struct TelemetrySnapshot {
    pub metrics: DisplayedMetrics,
    pub flags: ModeFlags,
    pub active_mode: OutputMode,
    pub connection: ConnectionPhase,
    pub output_enabled: bool,
    pub first_real_received: bool,
    pub device_output_on: Option<bool>,
    pub last_raw: Option<serde_json::Value>,
    pub timers: TimerStatus,
}
