//! Error taxonomy shared by the contact relay, event tracker and HTTP layer.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::error;

/// Generic body for any tracking request that could not be stored.
pub const TRACKING_FAILURE: &str = "Failed to process tracking data";

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Bad or missing input; the message is shown to the caller as-is.
    #[error("validation error: {0}")]
    Validation(String),

    /// Downstream email/service failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Event-log read/write failure.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("unknown error: {0}")]
    Unknown(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Transport(_) | AppError::Storage(_) | AppError::Unknown(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message safe to return to the caller. Only validation errors carry
    /// their detail; everything else is generic.
    pub fn public_message(&self) -> String {
        match self {
            AppError::Validation(msg) => msg.clone(),
            AppError::Transport(_) => "Failed to send email".to_string(),
            AppError::Storage(_) => TRACKING_FAILURE.to_string(),
            AppError::Unknown(_) => "Internal server error".to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Storage(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("{}", self);
        }
        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}
