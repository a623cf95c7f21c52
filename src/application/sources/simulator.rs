// Simulator - Synthetic waveforms while no trusted device data is available
use crate::domain::output_mode::OutputMode;
use crate::domain::telemetry::{DeviceMode, Origin, Sample};
use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

const AMBIENT_TEMPERATURE: f64 = 25.0;
const OVER_TEMPERATURE: f64 = 60.0;
/// Baseline when a mode is active but its setpoint is zero.
const IDLE_ACTIVE_VOLTAGE: f64 = 0.5;

pub struct Simulator {
    rng: StdRng,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Produce one sample for wall-clock time `now`. An active mode oscillates
    /// gently around its setpoint; with no mode the output stays near zero.
    pub fn sample(&mut self, now: DateTime<Utc>, mode: &OutputMode) -> Sample {
        let t = now.timestamp_millis() as f64 / 1000.0;
        let slow = (TAU * t / 20.0).sin();
        let fast = (TAU * t / 7.0 + 1.3).sin();

        let (voltage, current, device_mode) = match mode.setpoint() {
            Some(setpoint) => {
                let base_v = setpoint.voltage.max(IDLE_ACTIVE_VOLTAGE);
                let base_i = setpoint.current;
                let v = base_v * (1.0 + 0.01 * slow) + self.rng.gen_range(-0.01..=0.01) * base_v;
                let i = base_i * (1.0 + 0.03 * fast) + self.rng.gen_range(-0.01..=0.01) * base_i;
                let device_mode = match mode {
                    OutputMode::Load(_) => DeviceMode::Load,
                    _ => DeviceMode::Charge,
                };
                (v.max(0.0), i.max(0.0), device_mode)
            }
            None => {
                let v = 0.01 * (1.0 + slow) + self.rng.gen_range(0.0..=0.005);
                let i = 0.001 * (1.0 + fast) + self.rng.gen_range(0.0..=0.001);
                (v, i, DeviceMode::Standby)
            }
        };

        let power = voltage * current;
        let temperature = AMBIENT_TEMPERATURE
            + power * 0.8
            + 0.5 * (TAU * t / 60.0).sin()
            + self.rng.gen_range(-0.2..=0.2);
        let warnings = if temperature > OVER_TEMPERATURE {
            vec![format!("Over temperature: {:.1} C", temperature)]
        } else {
            Vec::new()
        };

        Sample::new(now, voltage, current, Origin::Simulated)
            .with_temperature(temperature)
            .with_mode(device_mode)
            .with_warnings(warnings)
    }
}
