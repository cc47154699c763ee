//! Gateway Error Types
//!
//! User-visible admission failures render their own bodies; internal
//! failures (settings, registration) are logged and recovered locally.

use axum::Json;
use axum::http::{StatusCode, header};
use axum::response::{Html, IntoResponse, Response};
use kernel::error::{app_error::AppError, kind::ErrorKind};
use thiserror::Error;

use crate::application::maintenance::MAINTENANCE_PAGE;

/// Gateway result type alias
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Admission failures shown to the client
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Client exceeded its window
    #[error("Too many requests, please try again later")]
    RateLimited { retry_after_secs: u64 },

    /// Maintenance mode is on
    #[error("{message}")]
    Maintenance {
        /// JSON for API paths, the maintenance page otherwise
        api: bool,
        message: String,
        creator: String,
    },

    #[error("API key is required")]
    MissingApiKey,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("API key is disabled")]
    DisabledApiKey,

    #[error("API key is not permitted for /{root} endpoints")]
    KeyOutOfScope { root: String },

    #[error("Daily quota exhausted for this API key")]
    QuotaExceeded,

    #[error("Admin token required")]
    AdminTokenRequired,
}

impl GatewayError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::RateLimited { .. } | GatewayError::QuotaExceeded => {
                StatusCode::TOO_MANY_REQUESTS
            }
            GatewayError::Maintenance { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::MissingApiKey
            | GatewayError::InvalidApiKey
            | GatewayError::AdminTokenRequired => StatusCode::UNAUTHORIZED,
            GatewayError::DisabledApiKey | GatewayError::KeyOutOfScope { .. } => {
                StatusCode::FORBIDDEN
            }
        }
    }

    /// Get the ErrorKind for this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::RateLimited { .. } | GatewayError::QuotaExceeded => {
                ErrorKind::TooManyRequests
            }
            GatewayError::Maintenance { .. } => ErrorKind::ServiceUnavailable,
            GatewayError::MissingApiKey
            | GatewayError::InvalidApiKey
            | GatewayError::AdminTokenRequired => ErrorKind::Unauthorized,
            GatewayError::DisabledApiKey | GatewayError::KeyOutOfScope { .. } => {
                ErrorKind::Forbidden
            }
        }
    }

    /// Short label used for metrics
    pub fn reason(&self) -> &'static str {
        match self {
            GatewayError::RateLimited { .. } => "rate_limited",
            GatewayError::Maintenance { .. } => "maintenance",
            GatewayError::MissingApiKey => "missing_key",
            GatewayError::InvalidApiKey => "invalid_key",
            GatewayError::DisabledApiKey => "disabled_key",
            GatewayError::KeyOutOfScope { .. } => "out_of_scope",
            GatewayError::QuotaExceeded => "quota_exceeded",
            GatewayError::AdminTokenRequired => "admin_token",
        }
    }

    fn log(&self) {
        match self {
            GatewayError::RateLimited { .. } | GatewayError::QuotaExceeded => {
                tracing::warn!(reason = self.reason(), "Admission rejected");
            }
            GatewayError::AdminTokenRequired => {
                tracing::warn!("Admin route called without a valid token");
            }
            _ => {
                tracing::debug!(error = %self, "Admission rejected");
            }
        }
    }
}

impl From<GatewayError> for AppError {
    fn from(err: GatewayError) -> Self {
        let kind = err.kind();
        let message = err.to_string();
        AppError::new(kind, message)
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        self.log();
        let status = self.status_code();
        let message = self.to_string();

        match self {
            GatewayError::Maintenance { api: false, .. } => {
                (status, Html(MAINTENANCE_PAGE)).into_response()
            }
            GatewayError::Maintenance { creator, .. } => (
                status,
                Json(serde_json::json!({
                    "status": false,
                    "message": message,
                    "maintenance": true,
                    "creator": creator,
                })),
            )
                .into_response(),
            GatewayError::RateLimited { retry_after_secs } => (
                status,
                [(header::RETRY_AFTER, retry_after_secs.to_string())],
                Json(serde_json::json!({ "status": false, "message": message })),
            )
                .into_response(),
            _ => (
                status,
                Json(serde_json::json!({ "status": false, "message": message })),
            )
                .into_response(),
        }
    }
}

/// Failure to obtain live settings; never shown to clients
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to read settings from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse settings from {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Settings unavailable: {0}")]
    Unavailable(String),
}

/// Failure of one handler module at startup
#[derive(Debug, Clone, Error)]
pub enum RegistrationError {
    #[error("Registration failed: {0}")]
    Failed(String),

    #[error("Missing dependency: {0}")]
    MissingDependency(String),

    #[error("Registration panicked: {0}")]
    Panicked(String),
}
