// HTTP request handlers
use crate::domain::connection::ConnectionReport;
use crate::domain::metrics::{HistorySnapshot, TelemetrySnapshot};
use crate::domain::output_mode::{InvalidSetpoint, OutputMode, ProfileSettings, Setpoint};
use crate::infrastructure::device_log::LogEntry;
use crate::presentation::api_error::ApiError;
use crate::presentation::app_state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;

/// Body of `POST /mode/start`.
#[derive(Debug, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum StartModeRequest {
    Load {
        voltage: f64,
        current: f64,
    },
    Battery {
        #[serde(default)]
        name: Option<String>,
        voltage: f64,
        current: f64,
    },
    Mobile {
        #[serde(default)]
        name: Option<String>,
        voltage: f64,
        current: f64,
    },
}

impl StartModeRequest {
    fn into_mode(self) -> Result<OutputMode, InvalidSetpoint> {
        let profile = |name: Option<String>, default: &str, voltage, current| {
            Setpoint::new(voltage, current)
                .map(|setpoint| ProfileSettings::new(name.unwrap_or_else(|| default.to_string()), setpoint))
        };
        Ok(match self {
            StartModeRequest::Load { voltage, current } => {
                OutputMode::Load(Setpoint::new(voltage, current)?)
            }
            StartModeRequest::Battery {
                name,
                voltage,
                current,
            } => OutputMode::Battery(profile(name, "battery", voltage, current)?),
            StartModeRequest::Mobile {
                name,
                voltage,
                current,
            } => OutputMode::Mobile(profile(name, "mobile", voltage, current)?),
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct SetpointRequest {
    pub voltage: Option<f64>,
    pub current: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct OutputRequest {
    pub on: bool,
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

pub async fn get_telemetry(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TelemetrySnapshot>, ApiError> {
    Ok(Json(state.coordinator.snapshot().await?))
}

pub async fn get_history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HistorySnapshot>, ApiError> {
    Ok(Json(state.coordinator.history().await?))
}

pub async fn get_logs(State(state): State<Arc<AppState>>) -> Json<Vec<LogEntry>> {
    Json(state.device_log.entries())
}

pub async fn report_connection(
    State(state): State<Arc<AppState>>,
    Json(report): Json<ConnectionReport>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.report_connection(report).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Start an output mode; 409 if a different mode is already running.
pub async fn start_mode(
    State(state): State<Arc<AppState>>,
    Json(request): Json<StartModeRequest>,
) -> Result<Json<TelemetrySnapshot>, ApiError> {
    let mode = request.into_mode()?;
    state.coordinator.start_mode(mode).await?;
    Ok(Json(state.coordinator.snapshot().await?))
}

pub async fn stop_mode(State(state): State<Arc<AppState>>) -> Result<Json<OutputMode>, ApiError> {
    Ok(Json(state.coordinator.stop_mode().await?))
}

pub async fn update_setpoint(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SetpointRequest>,
) -> Result<Json<Option<Setpoint>>, ApiError> {
    let updated = state
        .coordinator
        .update_setpoint(request.voltage, request.current)
        .await?;
    Ok(Json(updated))
}

pub async fn set_output(
    State(state): State<Arc<AppState>>,
    Json(request): Json<OutputRequest>,
) -> Result<StatusCode, ApiError> {
    state.coordinator.set_output(request.on).await?;
    Ok(StatusCode::ACCEPTED)
}

pub async fn request_feedback(State(state): State<Arc<AppState>>) -> Result<StatusCode, ApiError> {
    state.coordinator.request_feedback().await?;
    Ok(StatusCode::ACCEPTED)
}

/// Device push ingress. Payloads are dropped when no push listener is running.
pub async fn push_telemetry(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> StatusCode {
    if !state.push_channel.publish(body) {
        tracing::debug!("Push payload dropped, no listener running");
    }
    StatusCode::ACCEPTED
}
