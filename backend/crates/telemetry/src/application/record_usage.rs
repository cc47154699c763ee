//! Record Usage Use Case
//!
//! Writes one completed request: the log entry and the aggregate increment
//! run concurrently and fail independently.

use std::sync::Arc;

use crate::domain::entities::RequestLogEntry;
use crate::domain::repository::{RequestLogRepository, UsageStatRepository};
use crate::metrics::{TARGET_AGGREGATE, TARGET_LOG, WRITE_FAILURES_TOTAL};

/// Which of the two writes landed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UsageWriteOutcome {
    pub log_written: bool,
    pub aggregate_written: bool,
}

pub struct RecordUsageUseCase<S>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    store: Arc<S>,
}

impl<S> RecordUsageUseCase<S>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Best effort: failures are logged and counted, never returned
    pub async fn execute(&self, entry: &RequestLogEntry) -> UsageWriteOutcome {
        let key = entry.usage_key();

        let (log, aggregate) = tokio::join!(
            RequestLogRepository::insert(self.store.as_ref(), entry),
            UsageStatRepository::increment(
                self.store.as_ref(),
                &key,
                entry.success,
                entry.response_time
            ),
        );

        if let Err(e) = &log {
            WRITE_FAILURES_TOTAL.with_label_values(&[TARGET_LOG]).inc();
            tracing::error!(
                error = %e,
                request_id = %entry.request_id,
                endpoint = %entry.endpoint,
                "Failed to write request log"
            );
        }

        if let Err(e) = &aggregate {
            WRITE_FAILURES_TOTAL.with_label_values(&[TARGET_AGGREGATE]).inc();
            tracing::error!(
                error = %e,
                date = %key.date,
                endpoint = %key.endpoint,
                method = %key.method,
                version = %key.version,
                "Failed to update usage aggregate"
            );
        }

        UsageWriteOutcome {
            log_written: log.is_ok(),
            aggregate_written: aggregate.is_ok(),
        }
    }
}
