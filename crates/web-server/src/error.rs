use analytics::AnalyticsError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use reporting::ReportingError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Analytics(#[from] AnalyticsError),
    #[error("Invalid query: {0}")]
    InvalidQuery(String),
    #[error("Reporting error: {0}")]
    Reporting(#[from] ReportingError),
}

/// Converts our custom `AppError` into an HTTP response.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_message) = match self {
            AppError::Analytics(err) => {
                tracing::warn!(error = %err, "Report rejected.");
                (StatusCode::BAD_REQUEST, err.to_string())
            }
            AppError::InvalidQuery(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Reporting(err) => {
                tracing::error!(error = ?err, "Reporting error.");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to render the report".to_string(),
                )
            }
        };

        let body = Json(json!({ "error": error_message }));
        (status, body).into_response()
    }
}
