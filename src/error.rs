//! Error types for the toolkit
//!
//! Provides unified error handling using thiserror.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

// == Toolkit Error Enum ==
/// Unified error type for the cache and rate limiter engines.
#[derive(Error, Debug)]
pub enum ToolkitError {
    /// Duration string does not match `<integer><unit>`
    #[error("Invalid time format: {0}")]
    InvalidFormat(String),

    /// Client-only storage selected without a client context
    #[error("Environment mismatch: {0}")]
    EnvironmentMismatch(String),

    /// External store selected without a configured client
    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    /// External backend round trip failed
    #[error("Backend error: {0}")]
    Backend(String),

    /// Value could not be converted to or from JSON
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An event listener returned an error
    #[error("Listener error: {0}")]
    Listener(anyhow::Error),

    /// Invalid request data
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),
}

impl From<redis::RedisError> for ToolkitError {
    fn from(err: redis::RedisError) -> Self {
        ToolkitError::Backend(err.to_string())
    }
}

// == IntoResponse Implementation ==
impl IntoResponse for ToolkitError {
    fn into_response(self) -> Response {
        let status = match &self {
            ToolkitError::InvalidFormat(_)
            | ToolkitError::InvalidRequest(_)
            | ToolkitError::EnvironmentMismatch(_) => StatusCode::BAD_REQUEST,
            ToolkitError::NotFound(_) => StatusCode::NOT_FOUND,
            ToolkitError::Serialization(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ToolkitError::MissingDependency(_) | ToolkitError::Backend(_) => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            ToolkitError::Listener(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = Json(json!({
            "error": self.to_string()
        }));

        (status, body).into_response()
    }
}

// == Result Type Alias ==
/// Convenience Result type for the toolkit.
pub type Result<T> = std::result::Result<T, ToolkitError>;
