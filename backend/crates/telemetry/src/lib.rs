//! Usage Telemetry Module
//!
//! Clean Architecture structure:
//! - `domain/` - Request log entries, usage aggregates, repository traits
//! - `application/` - Write path (pipeline, record use case) and the
//!   statistics query engine
//! - `infra/` - PostgreSQL and in-memory stores
//! - `presentation/` - Usage-recording middleware, admin statistics routes
//!
//! ## Write Path
//! The middleware builds a `RequestLogEntry` once the response is ready and
//! hands it to a bounded queue. A background worker writes the log entry
//! and bumps the `(date, endpoint, method, version)` aggregate concurrently.
//! Write failures are logged and counted, never surfaced to the client.
//!
//! ## Read Path
//! Statistics are computed on demand from aggregates (totals, rankings,
//! daily series) and raw logs (peak hour, recent errors).

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod metrics;
pub mod presentation;

// Re-exports for convenience
pub use application::config::TelemetryConfig;
pub use application::pipeline::{PipelineHandle, TelemetryPipeline};
pub use application::stats::StatsQueryUseCase;
pub use domain::entities::{RequestLogEntry, UsageKey, UsageStatAggregate};
pub use domain::repository::{RequestLogRepository, UsageStatRepository};
pub use error::{TelemetryError, TelemetryResult};
pub use infra::memory::InMemoryUsageStore;
pub use infra::postgres::PgUsageRepository;
pub use presentation::middleware::UsageRecorder;
pub use presentation::router::{stats_router, with_usage_recording};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[cfg(test)]
mod tests;
