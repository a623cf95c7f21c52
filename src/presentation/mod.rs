// Presentation layer - HTTP surface over the coordinator
pub mod api_error;
pub mod app_state;
pub mod handlers;

use crate::presentation::app_state::AppState;
use crate::presentation::handlers::*;
use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(health_check))
        .route("/telemetry", get(get_telemetry))
        .route("/history", get(get_history))
        .route("/logs", get(get_logs))
        .route("/connection", post(report_connection))
        .route("/mode/start", post(start_mode))
        .route("/mode/stop", post(stop_mode))
        .route("/setpoint", post(update_setpoint))
        .route("/output", post(set_output))
        .route("/feedback", post(request_feedback))
        .route("/push", post(push_telemetry))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
