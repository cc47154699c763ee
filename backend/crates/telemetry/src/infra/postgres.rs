//! PostgreSQL Repository Implementations
//!
//! Aggregate increments are a single `INSERT ... ON CONFLICT DO UPDATE`, so
//! concurrent writers for the same key never lose an update.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use sqlx::types::Json;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::domain::entities::{LogQuery, RequestLogEntry, UsageKey, UsageQuery, UsageStatAggregate};
use crate::domain::repository::{RequestLogRepository, UsageStatRepository};
use crate::error::{TelemetryError, TelemetryResult};

/// PostgreSQL-backed usage store
#[derive(Clone)]
pub struct PgUsageRepository {
    pool: PgPool,
}

impl PgUsageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Request Log Repository Implementation
// ============================================================================

impl RequestLogRepository for PgUsageRepository {
    async fn insert(&self, entry: &RequestLogEntry) -> TelemetryResult<()> {
        sqlx::query(
            r#"
            INSERT INTO request_logs (
                request_id,
                endpoint,
                method,
                client_ip,
                user_agent,
                headers,
                status_code,
                response_time_ms,
                version,
                api_key_id,
                success,
                error,
                created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(entry.request_id)
        .bind(&entry.endpoint)
        .bind(&entry.method)
        .bind(&entry.client_ip)
        .bind(&entry.user_agent)
        .bind(Json(&entry.headers))
        .bind(i32::from(entry.status_code))
        .bind(to_i64(entry.response_time)?)
        .bind(&entry.version)
        .bind(&entry.api_key_id)
        .bind(entry.success)
        .bind(&entry.error)
        .bind(entry.timestamp)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_logs(&self, query: &LogQuery) -> TelemetryResult<Vec<RequestLogEntry>> {
        let limit = query.limit.map(to_i64_usize).transpose()?;

        let rows = sqlx::query_as::<_, RequestLogRow>(
            r#"
            SELECT
                request_id,
                endpoint,
                method,
                client_ip,
                user_agent,
                headers,
                status_code,
                response_time_ms,
                version,
                api_key_id,
                success,
                error,
                created_at
            FROM request_logs
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at < $2)
              AND ($3::text IS NULL OR endpoint = $3)
              AND (NOT $4 OR success = FALSE)
            ORDER BY created_at DESC
            LIMIT $5
            "#,
        )
        .bind(query.from)
        .bind(query.to)
        .bind(query.endpoint.as_deref())
        .bind(query.failed_only)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(RequestLogRow::into_entry).collect()
    }

    async fn hourly_counts(&self, query: &LogQuery) -> TelemetryResult<[u64; 24]> {
        let rows = sqlx::query_as::<_, (i32, i64)>(
            r#"
            SELECT
                EXTRACT(HOUR FROM created_at AT TIME ZONE 'UTC')::int4 AS hour,
                COUNT(*) AS count
            FROM request_logs
            WHERE ($1::timestamptz IS NULL OR created_at >= $1)
              AND ($2::timestamptz IS NULL OR created_at < $2)
              AND ($3::text IS NULL OR endpoint = $3)
              AND (NOT $4 OR success = FALSE)
            GROUP BY 1
            "#,
        )
        .bind(query.from)
        .bind(query.to)
        .bind(query.endpoint.as_deref())
        .bind(query.failed_only)
        .fetch_all(&self.pool)
        .await?;

        let mut counts = [0u64; 24];
        for (hour, count) in rows {
            let slot = usize::try_from(hour)
                .ok()
                .and_then(|hour| counts.get_mut(hour))
                .ok_or_else(|| TelemetryError::Internal(format!("Invalid hour bucket: {hour}")))?;
            *slot = to_u64(count)?;
        }
        Ok(counts)
    }
}

// ============================================================================
// Usage Stat Repository Implementation
// ============================================================================

impl UsageStatRepository for PgUsageRepository {
    async fn increment(
        &self,
        key: &UsageKey,
        success: bool,
        response_time_ms: u64,
    ) -> TelemetryResult<()> {
        let (success_inc, failed_inc) = if success { (1i64, 0i64) } else { (0, 1) };

        sqlx::query(
            r#"
            INSERT INTO usage_stats (
                date,
                endpoint,
                method,
                version,
                total_requests,
                success_requests,
                failed_requests,
                total_response_time_ms
            ) VALUES ($1, $2, $3, $4, 1, $5, $6, $7)
            ON CONFLICT (date, endpoint, method, version) DO UPDATE SET
                total_requests = usage_stats.total_requests + 1,
                success_requests = usage_stats.success_requests + EXCLUDED.success_requests,
                failed_requests = usage_stats.failed_requests + EXCLUDED.failed_requests,
                total_response_time_ms = usage_stats.total_response_time_ms + EXCLUDED.total_response_time_ms,
                updated_at = now()
            "#,
        )
        .bind(key.date)
        .bind(&key.endpoint)
        .bind(&key.method)
        .bind(&key.version)
        .bind(success_inc)
        .bind(failed_inc)
        .bind(to_i64(response_time_ms)?)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_stats(&self, query: &UsageQuery) -> TelemetryResult<Vec<UsageStatAggregate>> {
        let rows = sqlx::query_as::<_, UsageStatRow>(
            r#"
            SELECT
                date,
                endpoint,
                method,
                version,
                total_requests,
                success_requests,
                failed_requests,
                total_response_time_ms
            FROM usage_stats
            WHERE ($1::date IS NULL OR date >= $1)
              AND ($2::date IS NULL OR date <= $2)
              AND ($3::text IS NULL OR endpoint = $3)
            ORDER BY date, endpoint, method, version
            "#,
        )
        .bind(query.from)
        .bind(query.to)
        .bind(query.endpoint.as_deref())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(UsageStatRow::into_aggregate).collect()
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct RequestLogRow {
    request_id: Uuid,
    endpoint: String,
    method: String,
    client_ip: String,
    user_agent: Option<String>,
    headers: Json<BTreeMap<String, String>>,
    status_code: i32,
    response_time_ms: i64,
    version: String,
    api_key_id: Option<String>,
    success: bool,
    error: Option<serde_json::Value>,
    created_at: DateTime<Utc>,
}

impl RequestLogRow {
    fn into_entry(self) -> TelemetryResult<RequestLogEntry> {
        let status_code = u16::try_from(self.status_code).map_err(|_| {
            TelemetryError::Internal(format!("Invalid status_code: {}", self.status_code))
        })?;

        Ok(RequestLogEntry {
            request_id: self.request_id,
            endpoint: self.endpoint,
            method: self.method,
            client_ip: self.client_ip,
            user_agent: self.user_agent,
            headers: self.headers.0,
            status_code,
            response_time: to_u64(self.response_time_ms)?,
            version: self.version,
            api_key_id: self.api_key_id,
            success: self.success,
            error: self.error,
            timestamp: self.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UsageStatRow {
    date: NaiveDate,
    endpoint: String,
    method: String,
    version: String,
    total_requests: i64,
    success_requests: i64,
    failed_requests: i64,
    total_response_time_ms: i64,
}

impl UsageStatRow {
    fn into_aggregate(self) -> TelemetryResult<UsageStatAggregate> {
        Ok(UsageStatAggregate {
            date: self.date,
            endpoint: self.endpoint,
            method: self.method,
            version: self.version,
            total_requests: to_u64(self.total_requests)?,
            success_requests: to_u64(self.success_requests)?,
            failed_requests: to_u64(self.failed_requests)?,
            total_response_time: to_u64(self.total_response_time_ms)?,
        })
    }
}

fn to_i64(value: u64) -> TelemetryResult<i64> {
    i64::try_from(value).map_err(|_| TelemetryError::Internal(format!("Counter overflow: {value}")))
}

fn to_i64_usize(value: usize) -> TelemetryResult<i64> {
    i64::try_from(value).map_err(|_| TelemetryError::Internal(format!("Limit overflow: {value}")))
}

fn to_u64(value: i64) -> TelemetryResult<u64> {
    u64::try_from(value).map_err(|_| TelemetryError::Internal(format!("Negative counter: {value}")))
}
