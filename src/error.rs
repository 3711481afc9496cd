/// Unified error types for the sales portal
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Credential check failures
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No user record matched the identifier
    #[error("user not found")]
    NotFound,

    /// A user matched but the stored secret differs
    #[error("password mismatch")]
    BadSecret,
}

/// Form validation failures, detected before any remote call
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationFailure {
    #[error("required fields are missing")]
    MissingRequiredFields,

    #[error("no record owner configured for this user")]
    OwnerNotConfigured,

    #[error("time must be entered as HH:MM")]
    InvalidTime,
}

/// Failure reported by the record store, carried verbatim to the user
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct RemoteError {
    pub message: String,
}

impl RemoteError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Main error type for the portal
#[derive(Error, Debug)]
pub enum PortalError {
    /// Authentication errors
    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthFailure),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationFailure),

    /// Record store errors
    #[error("Record store error: {0}")]
    Remote(#[from] RemoteError),

    /// Session idle timeout elapsed
    #[error("Your session has expired. Please log in again.")]
    SessionExpired,

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// JSON error body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Convert PortalError to HTTP response
impl IntoResponse for PortalError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            PortalError::Authentication(_) | PortalError::SessionExpired => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            PortalError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            PortalError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            PortalError::Remote(ref e) => {
                tracing::warn!("Record store call failed: {}", e);
                (StatusCode::BAD_GATEWAY, "RecordStoreError", e.message.clone())
            }
            PortalError::Config(_) | PortalError::Internal(_) | PortalError::Io(_) => {
                tracing::error!("Internal failure: {}", self);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "InternalServerError",
                    "Internal server error".to_string(), // Don't leak details
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for portal operations
pub type PortalResult<T> = Result<T, PortalError>;
