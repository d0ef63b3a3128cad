//! Common error types and handling for ThesisTrack

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the ThesisTrack application.
///
/// Workflow action failures are modeled as distinct variants so callers can
/// translate them into specific user-facing messages without inspecting the
/// message string.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Unexpected error: {0}")]
    Unexpected(#[from] anyhow::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Not ready: {0}")]
    NotReady(String),

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Out of turn: {0}")]
    OutOfTurn(String),

    #[error("Not assigned: {0}")]
    NotAssigned(String),

    #[error("Already decided: {0}")]
    AlreadyDecided(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Already exists: {0}")]
    AlreadyExists(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get the appropriate HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::NotReady(_) | Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotAssigned(_) => StatusCode::FORBIDDEN,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidState(_)
            | Error::OutOfTurn(_)
            | Error::AlreadyDecided(_)
            | Error::Conflict(_)
            | Error::AlreadyExists(_) => StatusCode::CONFLICT,
            Error::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            Error::Unexpected(_) | Error::Serialization(_) | Error::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the error code for API responses
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Unexpected(_) => "UNEXPECTED_ERROR",
            Error::Serialization(_) => "SERIALIZATION_ERROR",
            Error::NotReady(_) => "NOT_READY",
            Error::InvalidState(_) => "INVALID_STATE",
            Error::OutOfTurn(_) => "OUT_OF_TURN",
            Error::NotAssigned(_) => "NOT_ASSIGNED",
            Error::AlreadyDecided(_) => "ALREADY_DECIDED",
            Error::Conflict(_) => "CONFLICT",
            Error::NotFound(_) => "NOT_FOUND",
            Error::AlreadyExists(_) => "ALREADY_EXISTS",
            Error::Unavailable(_) => "UNAVAILABLE",
            Error::Validation(_) => "VALIDATION_ERROR",
            Error::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a caller can expect the same call to succeed on retry.
    ///
    /// Only transport-level failures and lost write races qualify; the other
    /// kinds require a different caller action first.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Error::Conflict(_) | Error::Unavailable(_))
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();

        // Log internal errors with full context
        if matches!(status, StatusCode::INTERNAL_SERVER_ERROR) {
            tracing::error!(error = %self, "Internal server error");
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}
