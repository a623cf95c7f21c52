use crate::application::coordinator::CoordinatorSettings;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub bridge: BridgeSettings,
    #[serde(default)]
    pub telemetry: TelemetrySettings,
    #[serde(default)]
    pub ramp: RampSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerSettings {
    pub bind_addr: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct BridgeSettings {
    pub base_url: String,
    pub request_timeout_ms: u64,
}

impl Default for BridgeSettings {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8000".to_string(),
            request_timeout_ms: 1500,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct TelemetrySettings {
    pub history_depth: usize,
    pub freshness_window_ms: u64,
    pub simulator_interval_ms: u64,
    pub poll_interval_ms: u64,
    pub push_channel_capacity: usize,
    /// Fixed seed for reproducible simulator traces.
    pub simulator_seed: Option<u64>,
}

impl Default for TelemetrySettings {
    fn default() -> Self {
        Self {
            history_depth: 60,
            freshness_window_ms: 5000,
            simulator_interval_ms: 1000,
            poll_interval_ms: 2000,
            push_channel_capacity: 64,
            simulator_seed: None,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RampSettings {
    pub steps: u32,
    pub step_interval_ms: u64,
}

impl Default for RampSettings {
    fn default() -> Self {
        Self {
            steps: 12,
            step_interval_ms: 60,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingSettings {
    pub device_log_capacity: usize,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            device_log_capacity: 200,
        }
    }
}

impl BridgeSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl AppSettings {
    /// Reject settings the timers cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        let intervals = [
            ("telemetry.simulator_interval_ms", self.telemetry.simulator_interval_ms),
            ("telemetry.poll_interval_ms", self.telemetry.poll_interval_ms),
            ("ramp.step_interval_ms", self.ramp.step_interval_ms),
        ];
        for (key, value) in intervals {
            if value == 0 {
                anyhow::bail!("{} must be greater than zero", key);
            }
        }
        Ok(())
    }
}

impl From<&AppSettings> for CoordinatorSettings {
    fn from(settings: &AppSettings) -> Self {
        let telemetry = &settings.telemetry;
        Self {
            history_depth: telemetry.history_depth,
            freshness_window: Duration::from_millis(telemetry.freshness_window_ms),
            simulator_interval: Duration::from_millis(telemetry.simulator_interval_ms),
            poll_interval: Duration::from_millis(telemetry.poll_interval_ms),
            ramp_steps: settings.ramp.steps,
            ramp_step_interval: Duration::from_millis(settings.ramp.step_interval_ms),
        }
    }
}

/// Load settings from `config/coordinator.toml` (optional) overlaid with
/// `PSU_*` environment variables, e.g. `PSU_BRIDGE__BASE_URL`.
pub fn load_settings() -> anyhow::Result<AppSettings> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/coordinator").required(false))
        .add_source(
            config::Environment::with_prefix("PSU")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let settings: AppSettings = settings.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}
