//! Telemetry Error Types
//!
//! Write-path errors never reach clients; they are logged by the worker.
//! Read-path errors (bad ranges, store failures) render through `AppError`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

/// Telemetry result type alias
pub type TelemetryResult<T> = Result<T, TelemetryError>;

#[derive(Debug, Error)]
pub enum TelemetryError {
    /// `from` after `to`, or a span the engine refuses to scan
    #[error("Invalid date range: {0}")]
    InvalidRange(String),

    /// Missing or malformed query parameter
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Telemetry queue is full")]
    QueueFull,

    #[error("Telemetry queue is closed")]
    QueueClosed,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl TelemetryError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            TelemetryError::InvalidRange(_) | TelemetryError::InvalidQuery(_) => {
                StatusCode::BAD_REQUEST
            }
            TelemetryError::QueueFull | TelemetryError::QueueClosed => {
                StatusCode::SERVICE_UNAVAILABLE
            }
            TelemetryError::Database(_) | TelemetryError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TelemetryError::InvalidRange(_) | TelemetryError::InvalidQuery(_) => {
                ErrorKind::BadRequest
            }
            TelemetryError::QueueFull | TelemetryError::QueueClosed => {
                ErrorKind::ServiceUnavailable
            }
            TelemetryError::Database(_) | TelemetryError::Internal(_) => {
                ErrorKind::InternalServerError
            }
        }
    }

    /// Convert to AppError; store details stay in the logs
    pub fn to_app_error(&self) -> AppError {
        match self {
            TelemetryError::Database(_) | TelemetryError::Internal(_) => {
                AppError::new(self.kind(), "Failed to load statistics")
            }
            TelemetryError::InvalidRange(_) => AppError::new(self.kind(), self.to_string())
                .with_action("Use YYYY-MM-DD dates with from <= to"),
            _ => AppError::new(self.kind(), self.to_string()),
        }
    }

    fn log(&self) {
        match self {
            TelemetryError::Database(e) => {
                tracing::error!(error = %e, "Telemetry database error");
            }
            TelemetryError::Internal(msg) => {
                tracing::error!(message = %msg, "Telemetry internal error");
            }
            _ => {
                tracing::debug!(error = %self, "Telemetry error");
            }
        }
    }
}

impl From<TelemetryError> for AppError {
    fn from(err: TelemetryError) -> Self {
        err.to_app_error()
    }
}

impl IntoResponse for TelemetryError {
    fn into_response(self) -> Response {
        self.log();
        self.to_app_error().into_response()
    }
}
