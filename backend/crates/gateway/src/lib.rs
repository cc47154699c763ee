//! Gateway Admission Module
//!
//! Clean Architecture structure:
//! - `domain/` - Settings model, API key records, settings provider trait
//! - `application/` - Maintenance gate, key authenticator, hit counters,
//!   envelope merge, handler registry
//! - `infra/` - File-backed and in-memory settings providers
//! - `presentation/` - Axum middleware, admin routes
//!
//! ## Request Flow
//! rate limiter -> maintenance gate -> API-key authenticator -> (telemetry)
//! -> envelope -> handler
//!
//! ## Failure Model
//! - Rate limit, maintenance and credential failures are user-visible and
//!   always render `{"status": false, ...}` JSON for API paths
//! - Settings read failures are logged and the gate fails open
//! - A module that fails to register is logged and skipped

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod metrics;
pub mod presentation;

// Re-exports for convenience
pub use application::authenticate::{ApiKeyAuthenticator, AuthOutcome};
pub use application::hit_counter::EndpointHits;
pub use application::registry::{HandlerModule, HandlerRegistry, LoadedHandlers, RegistryReport};
pub use domain::provider::SettingsProvider;
pub use domain::settings::{ApiKeyRecord, GatewaySettings, PublicSettings};
pub use error::{GatewayError, RegistrationError, SettingsError};
pub use infra::file::FileSettingsProvider;
pub use infra::memory::StaticSettingsProvider;
pub use presentation::router::{hits_router, with_admission, with_admin_guard, with_envelope};
pub use presentation::state::{AdminToken, GatewayState};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
