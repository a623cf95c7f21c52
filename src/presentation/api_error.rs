// API errors - Maps coordinator failures onto HTTP status codes
use crate::application::coordinator::CoordinatorError;
use crate::domain::output_mode::InvalidSetpoint;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug)]
pub struct ApiError(CoordinatorError);

impl From<CoordinatorError> for ApiError {
    fn from(err: CoordinatorError) -> Self {
        ApiError(err)
    }
}

impl From<InvalidSetpoint> for ApiError {
    fn from(err: InvalidSetpoint) -> Self {
        ApiError(CoordinatorError::InvalidSetpoint(err))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let message = self.0.to_string();
        match self.0 {
            CoordinatorError::ModeConflict(conflict) => (
                StatusCode::CONFLICT,
                Json(json!({
                    "error": message,
                    "active": conflict.active,
                    "requested": conflict.requested,
                })),
            )
                .into_response(),
            CoordinatorError::InvalidSetpoint(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(json!({ "error": message }))).into_response()
            }
            CoordinatorError::Stopped => {
                tracing::error!("Request failed: {}", message);
                (StatusCode::SERVICE_UNAVAILABLE, Json(json!({ "error": message }))).into_response()
            }
        }
    }
}
