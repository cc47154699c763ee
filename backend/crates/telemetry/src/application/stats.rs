//! Statistics Query Engine
//!
//! Read-only views over aggregates and raw logs. The calculations are free
//! functions over plain data; [`StatsQueryUseCase`] loads the data and takes
//! an explicit `now`, so every view is deterministic for a fixed dataset.

use chrono::{DateTime, Duration, NaiveDate, Timelike, Utc};
use serde::Serialize;
use std::sync::Arc;

use crate::domain::entities::{LogQuery, RequestLogEntry, UsageQuery, UsageStatAggregate};
use crate::domain::repository::{RequestLogRepository, UsageStatRepository};
use crate::error::{TelemetryError, TelemetryResult};

/// Longest range accepted by range and endpoint queries, in days
pub const MAX_RANGE_DAYS: i64 = 366;

/// Entries in the top-endpoints list
pub const TOP_ENDPOINTS: usize = 10;

/// Failed log entries shown in the endpoint view
pub const RECENT_ERRORS: usize = 10;

/// Days covered by the endpoint view when no `from` is given
pub const DEFAULT_ENDPOINT_DAYS: i64 = 7;

// ============================================================================
// Calculations
// ============================================================================

/// Summed counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Totals {
    pub total_requests: u64,
    pub success_requests: u64,
    pub failed_requests: u64,
    pub total_response_time: u64,
}

impl Totals {
    pub fn add(&mut self, row: &UsageStatAggregate) {
        self.total_requests += row.total_requests;
        self.success_requests += row.success_requests;
        self.failed_requests += row.failed_requests;
        self.total_response_time += row.total_response_time;
    }

    pub fn success_rate(&self) -> f64 {
        success_rate(self.success_requests, self.total_requests)
    }

    pub fn average_response_time(&self) -> u64 {
        average_response_time(self.total_response_time, self.total_requests)
    }
}

pub fn totals<'a>(rows: impl IntoIterator<Item = &'a UsageStatAggregate>) -> Totals {
    let mut totals = Totals::default();
    for row in rows {
        totals.add(row);
    }
    totals
}

/// Percentage of successful requests, two decimals; 0 for no requests
pub fn success_rate(success: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round2(success as f64 * 100.0 / total as f64)
}

/// Mean response time rounded to the nearest millisecond; 0 for no requests
pub fn average_response_time(total_response_time: u64, total: u64) -> u64 {
    if total == 0 {
        return 0;
    }
    (total_response_time + total / 2) / total
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Busiest hour of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeakHour {
    pub hour: u32,
    pub count: u64,
}

/// Count timestamps per UTC hour of day
pub fn hourly_histogram(timestamps: impl IntoIterator<Item = DateTime<Utc>>) -> [u64; 24] {
    let mut counts = [0u64; 24];
    for ts in timestamps {
        counts[ts.hour() as usize] += 1;
    }
    counts
}

/// Hour with the most entries, lowest hour on ties; `None` when empty
pub fn peak_hour(counts: &[u64; 24]) -> Option<PeakHour> {
    let mut peak: Option<PeakHour> = None;
    for (hour, &count) in counts.iter().enumerate() {
        if count == 0 {
            continue;
        }
        if peak.is_none_or(|p| count > p.count) {
            peak = Some(PeakHour {
                hour: hour as u32,
                count,
            });
        }
    }
    peak
}

/// Counters for one endpoint across dates, methods and versions
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointSummary {
    pub endpoint: String,
    pub total_requests: u64,
    pub success_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub average_response_time: u64,
}

/// Per-endpoint totals in order of first appearance in `rows`
pub fn endpoint_breakdown(rows: &[UsageStatAggregate]) -> Vec<EndpointSummary> {
    let mut order: Vec<String> = Vec::new();
    let mut sums: Vec<Totals> = Vec::new();

    for row in rows {
        match order.iter().position(|endpoint| *endpoint == row.endpoint) {
            Some(index) => sums[index].add(row),
            None => {
                order.push(row.endpoint.clone());
                let mut totals = Totals::default();
                totals.add(row);
                sums.push(totals);
            }
        }
    }

    order
        .into_iter()
        .zip(sums)
        .map(|(endpoint, totals)| EndpointSummary {
            endpoint,
            total_requests: totals.total_requests,
            success_requests: totals.success_requests,
            failed_requests: totals.failed_requests,
            success_rate: totals.success_rate(),
            average_response_time: totals.average_response_time(),
        })
        .collect()
}

/// One ranked endpoint and the value it was ranked by
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ranked<T> {
    pub endpoint: String,
    pub value: T,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rankings {
    /// Lowest average response time
    pub fastest: Option<Ranked<u64>>,
    /// Highest average response time
    pub slowest: Option<Ranked<u64>>,
    /// Highest success rate
    pub most_reliable: Option<Ranked<f64>>,
    /// Lowest success rate
    pub least_reliable: Option<Ranked<f64>>,
}

/// Single pass; the first endpoint encountered keeps a tie
pub fn rankings(breakdown: &[EndpointSummary]) -> Rankings {
    let mut fastest: Option<&EndpointSummary> = None;
    let mut slowest: Option<&EndpointSummary> = None;
    let mut most: Option<&EndpointSummary> = None;
    let mut least: Option<&EndpointSummary> = None;

    for summary in breakdown {
        if fastest.is_none_or(|f| summary.average_response_time < f.average_response_time) {
            fastest = Some(summary);
        }
        if slowest.is_none_or(|s| summary.average_response_time > s.average_response_time) {
            slowest = Some(summary);
        }
        if most.is_none_or(|m| summary.success_rate > m.success_rate) {
            most = Some(summary);
        }
        if least.is_none_or(|l| summary.success_rate < l.success_rate) {
            least = Some(summary);
        }
    }

    Rankings {
        fastest: fastest.map(|s| Ranked {
            endpoint: s.endpoint.clone(),
            value: s.average_response_time,
        }),
        slowest: slowest.map(|s| Ranked {
            endpoint: s.endpoint.clone(),
            value: s.average_response_time,
        }),
        most_reliable: most.map(|s| Ranked {
            endpoint: s.endpoint.clone(),
            value: s.success_rate,
        }),
        least_reliable: least.map(|s| Ranked {
            endpoint: s.endpoint.clone(),
            value: s.success_rate,
        }),
    }
}

/// Most requested first; equal volumes keep breakdown order
pub fn top_endpoints(breakdown: &[EndpointSummary], limit: usize) -> Vec<EndpointSummary> {
    let mut sorted = breakdown.to_vec();
    sorted.sort_by(|a, b| b.total_requests.cmp(&a.total_requests));
    sorted.truncate(limit);
    sorted
}

/// Requests per hour over the part of `[start, end)` that has elapsed by `now`
pub fn throughput(total: u64, start: DateTime<Utc>, end: DateTime<Utc>, now: DateTime<Utc>) -> f64 {
    let until = end.min(now);
    let elapsed_ms = (until - start).num_milliseconds();
    if elapsed_ms <= 0 {
        return 0.0;
    }
    let hours = elapsed_ms as f64 / 3_600_000.0;
    round2(total as f64 / hours)
}

/// Counters for one day
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyPoint {
    pub date: NaiveDate,
    pub total_requests: u64,
    pub success_requests: u64,
    pub failed_requests: u64,
    pub success_rate: f64,
    pub average_response_time: u64,
}

/// One point per day in `[from, to]`, zero-filled
pub fn daily_series(rows: &[UsageStatAggregate], from: NaiveDate, to: NaiveDate) -> Vec<DailyPoint> {
    from.iter_days()
        .take_while(|day| *day <= to)
        .map(|date| {
            let day_totals = totals(rows.iter().filter(|row| row.date == date));
            DailyPoint {
                date,
                total_requests: day_totals.total_requests,
                success_requests: day_totals.success_requests,
                failed_requests: day_totals.failed_requests,
                success_rate: day_totals.success_rate(),
                average_response_time: day_totals.average_response_time(),
            }
        })
        .collect()
}

/// Midnight UTC at the start of `date`
pub fn day_start(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}

/// `[start of from, start of the day after to)`
pub fn day_window(from: NaiveDate, to: NaiveDate) -> TelemetryResult<(DateTime<Utc>, DateTime<Utc>)> {
    let next = to
        .succ_opt()
        .ok_or_else(|| TelemetryError::InvalidRange(format!("to ({to}) is out of range")))?;
    Ok((day_start(from), day_start(next)))
}

/// Reject reversed or oversized ranges
pub fn validate_range(from: NaiveDate, to: NaiveDate) -> TelemetryResult<()> {
    if from > to {
        return Err(TelemetryError::InvalidRange(format!(
            "from ({from}) is after to ({to})"
        )));
    }
    if (to - from).num_days() + 1 > MAX_RANGE_DAYS {
        return Err(TelemetryError::InvalidRange(format!(
            "range may span at most {MAX_RANGE_DAYS} days"
        )));
    }
    Ok(())
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverallStats {
    #[serde(flatten)]
    pub totals: Totals,
    pub success_rate: f64,
    pub average_response_time: u64,
    pub unique_endpoints: usize,
    pub first_date: Option<NaiveDate>,
    pub peak_hour: Option<PeakHour>,
    pub rankings: Rankings,
    pub top_endpoints: Vec<EndpointSummary>,
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyStats {
    pub date: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
    pub success_rate: f64,
    pub average_response_time: u64,
    pub peak_hour: Option<PeakHour>,
    pub requests_per_hour: f64,
    pub endpoints: Vec<EndpointSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeStats {
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
    pub success_rate: f64,
    pub average_response_time: u64,
    pub peak_hour: Option<PeakHour>,
    pub requests_per_hour: f64,
    pub days: Vec<DailyPoint>,
    pub rankings: Rankings,
    pub top_endpoints: Vec<EndpointSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EndpointStats {
    pub endpoint: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    #[serde(flatten)]
    pub totals: Totals,
    pub success_rate: f64,
    pub average_response_time: u64,
    pub peak_hour: Option<PeakHour>,
    pub requests_per_hour: f64,
    pub days: Vec<DailyPoint>,
    pub methods: Vec<MethodCount>,
    pub versions: Vec<VersionCount>,
    pub recent_errors: Vec<RequestLogEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodCount {
    pub method: String,
    pub total_requests: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionCount {
    pub version: String,
    pub total_requests: u64,
}

fn count_by<F>(rows: &[UsageStatAggregate], field: F) -> Vec<(String, u64)>
where
    F: Fn(&UsageStatAggregate) -> &str,
{
    let mut counts: Vec<(String, u64)> = Vec::new();
    for row in rows {
        let name = field(row);
        match counts.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, total)) => *total += row.total_requests,
            None => counts.push((name.to_string(), row.total_requests)),
        }
    }
    counts
}

// ============================================================================
// Use Case
// ============================================================================

/// Statistics query use case
pub struct StatsQueryUseCase<S>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    store: Arc<S>,
}

impl<S> StatsQueryUseCase<S>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Everything recorded so far
    pub async fn overall(&self, now: DateTime<Utc>) -> TelemetryResult<OverallStats> {
        let rows = self.store.find_stats(&UsageQuery::default()).await?;
        let hours = self.store.hourly_counts(&LogQuery::default()).await?;

        let totals = totals(&rows);
        let breakdown = endpoint_breakdown(&rows);

        Ok(OverallStats {
            totals,
            success_rate: totals.success_rate(),
            average_response_time: totals.average_response_time(),
            unique_endpoints: breakdown.len(),
            first_date: rows.iter().map(|row| row.date).min(),
            peak_hour: peak_hour(&hours),
            rankings: rankings(&breakdown),
            top_endpoints: top_endpoints(&breakdown, TOP_ENDPOINTS),
            generated_at: now,
        })
    }

    /// One UTC day
    pub async fn daily(&self, date: NaiveDate, now: DateTime<Utc>) -> TelemetryResult<DailyStats> {
        let rows = self
            .store
            .find_stats(&UsageQuery {
                from: Some(date),
                to: Some(date),
                endpoint: None,
            })
            .await?;

        let (start, end) = day_window(date, date)?;
        let hours = self.store.hourly_counts(&log_window(start, end, None)).await?;

        let totals = totals(&rows);
        Ok(DailyStats {
            date,
            totals,
            success_rate: totals.success_rate(),
            average_response_time: totals.average_response_time(),
            peak_hour: peak_hour(&hours),
            requests_per_hour: throughput(totals.total_requests, start, end, now),
            endpoints: endpoint_breakdown(&rows),
        })
    }

    /// Inclusive range of UTC days
    pub async fn range(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        now: DateTime<Utc>,
    ) -> TelemetryResult<RangeStats> {
        validate_range(from, to)?;

        let rows = self
            .store
            .find_stats(&UsageQuery {
                from: Some(from),
                to: Some(to),
                endpoint: None,
            })
            .await?;

        let (start, end) = day_window(from, to)?;
        let hours = self.store.hourly_counts(&log_window(start, end, None)).await?;

        let totals = totals(&rows);
        let breakdown = endpoint_breakdown(&rows);

        Ok(RangeStats {
            from,
            to,
            totals,
            success_rate: totals.success_rate(),
            average_response_time: totals.average_response_time(),
            peak_hour: peak_hour(&hours),
            requests_per_hour: throughput(totals.total_requests, start, end, now),
            days: daily_series(&rows, from, to),
            rankings: rankings(&breakdown),
            top_endpoints: top_endpoints(&breakdown, TOP_ENDPOINTS),
        })
    }

    /// One endpoint over a range; defaults to the last
    /// [`DEFAULT_ENDPOINT_DAYS`] days ending today
    pub async fn endpoint(
        &self,
        endpoint: &str,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
        now: DateTime<Utc>,
    ) -> TelemetryResult<EndpointStats> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            return Err(TelemetryError::InvalidQuery(
                "endpoint name is required".to_string(),
            ));
        }

        let to = to.unwrap_or_else(|| now.date_naive());
        let from = match from {
            Some(from) => from,
            None => to
                .checked_sub_signed(Duration::days(DEFAULT_ENDPOINT_DAYS - 1))
                .ok_or_else(|| TelemetryError::InvalidRange(format!("to ({to}) is out of range")))?,
        };
        validate_range(from, to)?;

        let rows = self
            .store
            .find_stats(&UsageQuery {
                from: Some(from),
                to: Some(to),
                endpoint: Some(endpoint.to_string()),
            })
            .await?;

        let (start, end) = day_window(from, to)?;
        let hours = self
            .store
            .hourly_counts(&log_window(start, end, Some(endpoint)))
            .await?;

        let recent_errors = self
            .store
            .find_logs(&LogQuery {
                failed_only: true,
                limit: Some(RECENT_ERRORS),
                ..log_window(start, end, Some(endpoint))
            })
            .await?;

        let totals = totals(&rows);
        Ok(EndpointStats {
            endpoint: endpoint.to_string(),
            from,
            to,
            totals,
            success_rate: totals.success_rate(),
            average_response_time: totals.average_response_time(),
            peak_hour: peak_hour(&hours),
            requests_per_hour: throughput(totals.total_requests, start, end, now),
            days: daily_series(&rows, from, to),
            methods: count_by(&rows, |row| row.method.as_str())
                .into_iter()
                .map(|(method, total_requests)| MethodCount {
                    method,
                    total_requests,
                })
                .collect(),
            versions: count_by(&rows, |row| row.version.as_str())
                .into_iter()
                .map(|(version, total_requests)| VersionCount {
                    version,
                    total_requests,
                })
                .collect(),
            recent_errors,
        })
    }
}

fn log_window(start: DateTime<Utc>, end: DateTime<Utc>, endpoint: Option<&str>) -> LogQuery {
    LogQuery {
        from: Some(start),
        to: Some(end),
        endpoint: endpoint.map(str::to_string),
        ..Default::default()
    }
}
