//! Telemetry Entities
//!
//! Field names serialize in camelCase; dashboards read these shapes as-is.

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// 2xx and 3xx count as success
#[inline]
pub fn is_success_status(status: u16) -> bool {
    (200..400).contains(&status)
}

/// One completed API request. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestLogEntry {
    pub request_id: Uuid,
    /// Request path
    pub endpoint: String,
    pub method: String,
    pub client_ip: String,
    pub user_agent: Option<String>,
    /// Request headers with credentials masked
    pub headers: BTreeMap<String, String>,
    pub status_code: u16,
    /// Milliseconds from admission to response
    pub response_time: u64,
    pub version: String,
    pub api_key_id: Option<String>,
    pub success: bool,
    /// JSON body of a failed response, when it was small enough to keep
    pub error: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

impl RequestLogEntry {
    /// Aggregate row this entry counts towards
    pub fn usage_key(&self) -> UsageKey {
        UsageKey {
            date: self.timestamp.date_naive(),
            endpoint: self.endpoint.clone(),
            method: self.method.clone(),
            version: self.version.clone(),
        }
    }
}

/// Identity of one aggregate row
///
/// Ordering (date, endpoint, method, version) is the order stores return
/// rows in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageKey {
    pub date: NaiveDate,
    pub endpoint: String,
    pub method: String,
    pub version: String,
}

/// Per-day counters for one (endpoint, method, version)
///
/// `success_requests + failed_requests == total_requests` always holds;
/// the only mutation is [`UsageStatAggregate::record`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStatAggregate {
    pub date: NaiveDate,
    pub endpoint: String,
    pub method: String,
    pub version: String,
    pub total_requests: u64,
    pub success_requests: u64,
    pub failed_requests: u64,
    /// Sum of response times in milliseconds
    pub total_response_time: u64,
}

impl UsageStatAggregate {
    /// Empty row for `key`
    pub fn new(key: UsageKey) -> Self {
        Self {
            date: key.date,
            endpoint: key.endpoint,
            method: key.method,
            version: key.version,
            total_requests: 0,
            success_requests: 0,
            failed_requests: 0,
            total_response_time: 0,
        }
    }

    pub fn key(&self) -> UsageKey {
        UsageKey {
            date: self.date,
            endpoint: self.endpoint.clone(),
            method: self.method.clone(),
            version: self.version.clone(),
        }
    }

    /// Count one request
    pub fn record(&mut self, success: bool, response_time_ms: u64) {
        self.total_requests += 1;
        if success {
            self.success_requests += 1;
        } else {
            self.failed_requests += 1;
        }
        self.total_response_time += response_time_ms;
    }

    pub fn is_consistent(&self) -> bool {
        self.success_requests + self.failed_requests == self.total_requests
    }
}

/// Filter over aggregate rows; bounds are inclusive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub endpoint: Option<String>,
}

/// Filter over raw log entries; `from` inclusive, `to` exclusive
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogQuery {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub endpoint: Option<String>,
    pub failed_only: bool,
    /// Newest entries first, at most this many
    pub limit: Option<usize>,
}

impl LogQuery {
    pub fn matches(&self, entry: &RequestLogEntry) -> bool {
        self.from.is_none_or(|from| entry.timestamp >= from)
            && self.to.is_none_or(|to| entry.timestamp < to)
            && self
                .endpoint
                .as_deref()
                .is_none_or(|endpoint| entry.endpoint == endpoint)
            && (!self.failed_only || !entry.success)
    }
}

impl UsageQuery {
    pub fn matches(&self, row: &UsageStatAggregate) -> bool {
        self.from.is_none_or(|from| row.date >= from)
            && self.to.is_none_or(|to| row.date <= to)
            && self
                .endpoint
                .as_deref()
                .is_none_or(|endpoint| row.endpoint == endpoint)
    }
}
