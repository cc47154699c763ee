//! Repository Traits
//!
//! Interfaces for usage persistence. Implementations are in the
//! infrastructure layer.

use crate::domain::entities::{LogQuery, RequestLogEntry, UsageKey, UsageQuery, UsageStatAggregate};
use crate::error::TelemetryResult;

/// Append-only request log
#[trait_variant::make(RequestLogRepository: Send)]
pub trait LocalRequestLogRepository {
    /// Persist one entry
    async fn insert(&self, entry: &RequestLogEntry) -> TelemetryResult<()>;

    /// Entries matching `query`, newest first
    async fn find_logs(&self, query: &LogQuery) -> TelemetryResult<Vec<RequestLogEntry>>;

    /// Entry counts per UTC hour of day (index 0..=23)
    async fn hourly_counts(&self, query: &LogQuery) -> TelemetryResult<[u64; 24]>;
}

/// Per-day usage aggregates
#[trait_variant::make(UsageStatRepository: Send)]
pub trait LocalUsageStatRepository {
    /// Create the row for `key` if needed and count one request, atomically
    async fn increment(
        &self,
        key: &UsageKey,
        success: bool,
        response_time_ms: u64,
    ) -> TelemetryResult<()>;

    /// Rows matching `query`, ordered by (date, endpoint, method, version)
    async fn find_stats(&self, query: &UsageQuery) -> TelemetryResult<Vec<UsageStatAggregate>>;
}
