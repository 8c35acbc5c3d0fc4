//! Error types for the test panel

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use panel_api::ErrorResponse;
use thiserror::Error;
use tracing::error;

/// Main error type for the test panel
#[derive(Error, Debug)]
pub enum PanelError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("GitHub error: {0}")]
    GithubError(String),

    #[error("{0}")]
    AuthError(String),

    #[error("User not authenticated")]
    Unauthenticated,

    #[error("{0}")]
    ValidationError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("{0}")]
    MethodNotAllowed(String),

    #[error("Command failed: {0}")]
    CommandError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Server error: {0}")]
    ServerError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl PanelError {
    /// HTTP status reported to API callers
    pub fn status_code(&self) -> StatusCode {
        match self {
            PanelError::Unauthenticated => StatusCode::FORBIDDEN,
            PanelError::AuthError(_) | PanelError::ValidationError(_) => StatusCode::BAD_REQUEST,
            PanelError::NotFound(_) => StatusCode::NOT_FOUND,
            PanelError::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for PanelError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }
        (
            status,
            Json(ErrorResponse {
                error: self.to_string(),
            }),
        )
            .into_response()
    }
}
