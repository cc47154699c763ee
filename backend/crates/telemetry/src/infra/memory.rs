//! In-memory usage store
//!
//! Used when no database is configured, and by tests. Contents are lost on
//! restart.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::domain::entities::{LogQuery, RequestLogEntry, UsageKey, UsageQuery, UsageStatAggregate};
use crate::domain::repository::{RequestLogRepository, UsageStatRepository};
use crate::error::{TelemetryError, TelemetryResult};

#[derive(Debug, Clone, Default)]
pub struct InMemoryUsageStore {
    logs: Arc<Mutex<Vec<RequestLogEntry>>>,
    stats: Arc<Mutex<BTreeMap<UsageKey, UsageStatAggregate>>>,
}

impl InMemoryUsageStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn log_count(&self) -> usize {
        self.logs.lock().map(|logs| logs.len()).unwrap_or(0)
    }

    /// Every aggregate row, in key order
    pub fn aggregates(&self) -> Vec<UsageStatAggregate> {
        self.stats
            .lock()
            .map(|stats| stats.values().cloned().collect())
            .unwrap_or_default()
    }

    fn logs(&self) -> TelemetryResult<MutexGuard<'_, Vec<RequestLogEntry>>> {
        self.logs
            .lock()
            .map_err(|_| TelemetryError::Internal("request log lock poisoned".to_string()))
    }

    fn stats(&self) -> TelemetryResult<MutexGuard<'_, BTreeMap<UsageKey, UsageStatAggregate>>> {
        self.stats
            .lock()
            .map_err(|_| TelemetryError::Internal("usage stats lock poisoned".to_string()))
    }
}

impl RequestLogRepository for InMemoryUsageStore {
    async fn insert(&self, entry: &RequestLogEntry) -> TelemetryResult<()> {
        self.logs()?.push(entry.clone());
        Ok(())
    }

    async fn find_logs(&self, query: &LogQuery) -> TelemetryResult<Vec<RequestLogEntry>> {
        let logs = self.logs()?;
        let mut found: Vec<RequestLogEntry> = logs
            .iter()
            .filter(|entry| query.matches(entry))
            .cloned()
            .collect();
        drop(logs);

        found.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        if let Some(limit) = query.limit {
            found.truncate(limit);
        }
        Ok(found)
    }

    async fn hourly_counts(&self, query: &LogQuery) -> TelemetryResult<[u64; 24]> {
        let logs = self.logs()?;
        Ok(crate::application::stats::hourly_histogram(
            logs.iter()
                .filter(|entry| query.matches(entry))
                .map(|entry| entry.timestamp),
        ))
    }
}

impl UsageStatRepository for InMemoryUsageStore {
    async fn increment(
        &self,
        key: &UsageKey,
        success: bool,
        response_time_ms: u64,
    ) -> TelemetryResult<()> {
        self.stats()?
            .entry(key.clone())
            .or_insert_with(|| UsageStatAggregate::new(key.clone()))
            .record(success, response_time_ms);
        Ok(())
    }

    async fn find_stats(&self, query: &UsageQuery) -> TelemetryResult<Vec<UsageStatAggregate>> {
        Ok(self
            .stats()?
            .values()
            .filter(|row| query.matches(row))
            .cloned()
            .collect())
    }
}
