//! Unit tests for the telemetry crate

#[cfg(test)]
mod fixtures {
    use crate::domain::entities::{
        LogQuery, RequestLogEntry, UsageKey, UsageQuery, UsageStatAggregate, is_success_status,
    };
    use crate::domain::repository::{RequestLogRepository, UsageStatRepository};
    use crate::error::{TelemetryError, TelemetryResult};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};
    use std::collections::BTreeMap;
    use uuid::Uuid;

    pub fn at(date: (i32, u32, u32), hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(date.0, date.1, date.2, hour, minute, 0)
            .unwrap()
    }

    pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    pub fn entry(endpoint: &str, status: u16, response_time: u64, timestamp: DateTime<Utc>) -> RequestLogEntry {
        RequestLogEntry {
            request_id: Uuid::new_v4(),
            endpoint: endpoint.to_string(),
            method: "GET".to_string(),
            client_ip: "203.0.113.7".to_string(),
            user_agent: Some("test".to_string()),
            headers: BTreeMap::new(),
            status_code: status,
            response_time,
            version: "v1".to_string(),
            api_key_id: None,
            success: is_success_status(status),
            error: None,
            timestamp,
        }
    }

    pub fn row(day: NaiveDate, endpoint: &str, total: u64, success: u64, time: u64) -> UsageStatAggregate {
        UsageStatAggregate {
            date: day,
            endpoint: endpoint.to_string(),
            method: "GET".to_string(),
            version: "v1".to_string(),
            total_requests: total,
            success_requests: success,
            failed_requests: total - success,
            total_response_time: time,
        }
    }

    /// Store whose every write fails
    #[derive(Clone, Default)]
    pub struct FailingStore;

    impl RequestLogRepository for FailingStore {
        async fn insert(&self, _entry: &RequestLogEntry) -> TelemetryResult<()> {
            Err(TelemetryError::Internal("log store down".to_string()))
        }

        async fn find_logs(&self, _query: &LogQuery) -> TelemetryResult<Vec<RequestLogEntry>> {
            Err(TelemetryError::Internal("log store down".to_string()))
        }

        async fn hourly_counts(&self, _query: &LogQuery) -> TelemetryResult<[u64; 24]> {
            Err(TelemetryError::Internal("log store down".to_string()))
        }
    }

    impl UsageStatRepository for FailingStore {
        async fn increment(&self, _key: &UsageKey, _success: bool, _ms: u64) -> TelemetryResult<()> {
            Err(TelemetryError::Internal("stats store down".to_string()))
        }

        async fn find_stats(&self, _query: &UsageQuery) -> TelemetryResult<Vec<UsageStatAggregate>> {
            Err(TelemetryError::Internal("stats store down".to_string()))
        }
    }
}

#[cfg(test)]
mod entity_tests {
    use super::fixtures::*;
    use crate::domain::entities::*;

    #[test]
    fn test_success_status_class() {
        assert!(is_success_status(200));
        assert!(is_success_status(204));
        assert!(is_success_status(302));
        assert!(!is_success_status(400));
        assert!(!is_success_status(429));
        assert!(!is_success_status(503));
        assert!(!is_success_status(101));
    }

    #[test]
    fn test_usage_key_from_entry() {
        let e = entry("/api/v1/echo", 200, 12, at((2024, 3, 1), 23, 59));
        let key = e.usage_key();
        assert_eq!(key.date, date(2024, 3, 1));
        assert_eq!(key.endpoint, "/api/v1/echo");
        assert_eq!(key.method, "GET");
        assert_eq!(key.version, "v1");
    }

    #[test]
    fn test_aggregate_record() {
        let e = entry("/api/x", 200, 0, at((2024, 3, 1), 0, 0));
        let mut agg = UsageStatAggregate::new(e.usage_key());
        agg.record(true, 10);
        agg.record(false, 30);
        agg.record(true, 5);

        assert_eq!(agg.total_requests, 3);
        assert_eq!(agg.success_requests, 2);
        assert_eq!(agg.failed_requests, 1);
        assert_eq!(agg.total_response_time, 45);
        assert!(agg.is_consistent());
    }

    #[test]
    fn test_entry_serializes_camel_case() {
        let e = entry("/api/x", 500, 7, at((2024, 3, 1), 1, 0));
        let json = serde_json::to_value(&e).unwrap();
        for field in [
            "requestId", "endpoint", "method", "clientIp", "userAgent", "headers", "statusCode",
            "responseTime", "version", "apiKeyId", "success", "error", "timestamp",
        ] {
            assert!(json.get(field).is_some(), "missing {field}");
        }
        assert_eq!(json["success"], serde_json::json!(false));
    }

    #[test]
    fn test_log_query_bounds() {
        let e = entry("/api/x", 500, 7, at((2024, 3, 1), 12, 0));
        let query = LogQuery {
            from: Some(at((2024, 3, 1), 12, 0)),
            to: Some(at((2024, 3, 1), 13, 0)),
            ..Default::default()
        };
        assert!(query.matches(&e));

        let query = LogQuery {
            to: Some(at((2024, 3, 1), 12, 0)),
            ..Default::default()
        };
        assert!(!query.matches(&e));

        let query = LogQuery {
            endpoint: Some("/api/y".to_string()),
            ..Default::default()
        };
        assert!(!query.matches(&e));
    }
}

#[cfg(test)]
mod stats_calc_tests {
    use super::fixtures::*;
    use crate::application::stats::*;

    #[test]
    fn test_success_rate() {
        assert_eq!(success_rate(0, 0), 0.0);
        assert_eq!(success_rate(5, 5), 100.0);
        assert_eq!(success_rate(1, 3), 33.33);
        assert_eq!(success_rate(2, 3), 66.67);
    }

    #[test]
    fn test_average_response_time_rounding() {
        assert_eq!(average_response_time(0, 0), 0);
        assert_eq!(average_response_time(500, 0), 0);
        assert_eq!(average_response_time(10, 4), 3); // 2.5 rounds up
        assert_eq!(average_response_time(9, 4), 2); // 2.25
        assert_eq!(average_response_time(11, 4), 3); // 2.75
        assert_eq!(average_response_time(300, 3), 100);
    }

    #[test]
    fn test_peak_hour() {
        let d = (2024, 3, 1);
        let stamps = [3, 3, 14, 14, 14, 5].map(|h| at(d, h, 0));
        let counts = hourly_histogram(stamps);
        assert_eq!(peak_hour(&counts), Some(PeakHour { hour: 14, count: 3 }));
    }

    #[test]
    fn test_peak_hour_tie_takes_lowest() {
        let d = (2024, 3, 1);
        let counts = hourly_histogram([20, 7, 20, 7].map(|h| at(d, h, 30)));
        assert_eq!(peak_hour(&counts), Some(PeakHour { hour: 7, count: 2 }));
    }

    #[test]
    fn test_peak_hour_empty() {
        assert_eq!(peak_hour(&[0; 24]), None);
    }

    #[test]
    fn test_breakdown_first_appearance_order() {
        let rows = vec![
            row(date(2024, 3, 1), "/api/b", 2, 2, 20),
            row(date(2024, 3, 1), "/api/a", 4, 2, 40),
            row(date(2024, 3, 2), "/api/b", 2, 1, 60),
        ];
        let breakdown = endpoint_breakdown(&rows);

        assert_eq!(breakdown.len(), 2);
        assert_eq!(breakdown[0].endpoint, "/api/b");
        assert_eq!(breakdown[0].total_requests, 4);
        assert_eq!(breakdown[0].success_requests, 3);
        assert_eq!(breakdown[0].average_response_time, 20);
        assert_eq!(breakdown[0].success_rate, 75.0);
        assert_eq!(breakdown[1].endpoint, "/api/a");
    }

    #[test]
    fn test_rankings_first_wins_ties() {
        let rows = vec![
            row(date(2024, 3, 1), "/api/first", 2, 2, 20),
            row(date(2024, 3, 1), "/api/second", 2, 2, 20),
            row(date(2024, 3, 1), "/api/slow", 1, 0, 90),
        ];
        let r = rankings(&endpoint_breakdown(&rows));

        assert_eq!(r.fastest.unwrap().endpoint, "/api/first");
        assert_eq!(r.most_reliable.unwrap().endpoint, "/api/first");
        let slowest = r.slowest.unwrap();
        assert_eq!(slowest.endpoint, "/api/slow");
        assert_eq!(slowest.value, 90);
        assert_eq!(r.least_reliable.unwrap().value, 0.0);
    }

    #[test]
    fn test_rankings_empty() {
        assert_eq!(rankings(&[]), Rankings::default());
    }

    #[test]
    fn test_top_endpoints_stable() {
        let rows = vec![
            row(date(2024, 3, 1), "/api/a", 1, 1, 1),
            row(date(2024, 3, 1), "/api/b", 5, 5, 1),
            row(date(2024, 3, 1), "/api/c", 1, 1, 1),
        ];
        let top = top_endpoints(&endpoint_breakdown(&rows), 2);
        let names: Vec<_> = top.iter().map(|s| s.endpoint.as_str()).collect();
        assert_eq!(names, vec!["/api/b", "/api/a"]);
    }

    #[test]
    fn test_throughput_bounded_by_now() {
        let start = at((2024, 3, 1), 0, 0);
        let end = at((2024, 3, 2), 0, 0);

        // Half the day elapsed
        assert_eq!(throughput(120, start, end, at((2024, 3, 1), 12, 0)), 10.0);
        // Day over: whole 24h
        assert_eq!(throughput(48, start, end, at((2024, 3, 5), 0, 0)), 2.0);
        // Window in the future
        assert_eq!(throughput(10, start, end, at((2024, 2, 1), 0, 0)), 0.0);
    }

    #[test]
    fn test_daily_series_zero_fills() {
        let rows = vec![row(date(2024, 3, 2), "/api/a", 3, 3, 30)];
        let days = daily_series(&rows, date(2024, 3, 1), date(2024, 3, 3));
        assert_eq!(days.len(), 3);
        assert_eq!(days[0].total_requests, 0);
        assert_eq!(days[1].total_requests, 3);
        assert_eq!(days[1].average_response_time, 10);
        assert_eq!(days[2].total_requests, 0);
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range(date(2024, 3, 1), date(2024, 3, 1)).is_ok());
        assert!(validate_range(date(2024, 1, 1), date(2024, 12, 31)).is_ok());
        assert!(validate_range(date(2024, 3, 2), date(2024, 3, 1)).is_err());
        assert!(validate_range(date(2023, 1, 1), date(2024, 12, 31)).is_err());
    }
}

#[cfg(test)]
mod store_tests {
    use super::fixtures::*;
    use crate::domain::entities::{LogQuery, UsageQuery};
    use crate::domain::repository::{RequestLogRepository, UsageStatRepository};
    use crate::infra::memory::InMemoryUsageStore;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_concurrent_increments_keep_invariant() {
        let store = Arc::new(InMemoryUsageStore::new());
        let key = entry("/api/x", 200, 0, at((2024, 3, 1), 9, 0)).usage_key();

        let mut tasks = Vec::new();
        for i in 0..200u64 {
            let store = store.clone();
            let key = key.clone();
            tasks.push(tokio::spawn(async move {
                store.increment(&key, i % 3 != 0, i).await.unwrap();
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let rows = store.aggregates();
        assert_eq!(rows.len(), 1);
        let agg = &rows[0];
        assert_eq!(agg.total_requests, 200);
        assert!(agg.is_consistent());
        assert_eq!(agg.failed_requests, 67);
        assert_eq!(agg.total_response_time, (0..200).sum::<u64>());
    }

    #[tokio::test]
    async fn test_find_stats_filters_and_orders() {
        let store = InMemoryUsageStore::new();
        for (day, endpoint) in [(2, "/api/b"), (1, "/api/b"), (1, "/api/a"), (3, "/api/a")] {
            let e = entry(endpoint, 200, 5, at((2024, 3, day), 10, 0));
            store.increment(&e.usage_key(), true, 5).await.unwrap();
        }

        let all = store.find_stats(&UsageQuery::default()).await.unwrap();
        let order: Vec<_> = all.iter().map(|r| (r.date.to_string(), r.endpoint.clone())).collect();
        assert_eq!(
            order,
            vec![
                ("2024-03-01".to_string(), "/api/a".to_string()),
                ("2024-03-01".to_string(), "/api/b".to_string()),
                ("2024-03-02".to_string(), "/api/b".to_string()),
                ("2024-03-03".to_string(), "/api/a".to_string()),
            ]
        );

        let filtered = store
            .find_stats(&UsageQuery {
                from: Some(date(2024, 3, 2)),
                to: Some(date(2024, 3, 3)),
                endpoint: Some("/api/a".to_string()),
            })
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].date, date(2024, 3, 3));
    }

    #[tokio::test]
    async fn test_find_logs_newest_first_with_limit() {
        let store = InMemoryUsageStore::new();
        for minute in [5, 30, 10] {
            store
                .insert(&entry("/api/x", 500, 1, at((2024, 3, 1), 8, minute)))
                .await
                .unwrap();
        }
        store
            .insert(&entry("/api/x", 200, 1, at((2024, 3, 1), 8, 45)))
            .await
            .unwrap();

        let failed = store
            .find_logs(&LogQuery {
                failed_only: true,
                limit: Some(2),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(failed.len(), 2);
        assert_eq!(failed[0].timestamp, at((2024, 3, 1), 8, 30));
        assert_eq!(failed[1].timestamp, at((2024, 3, 1), 8, 10));

        let hours = store.hourly_counts(&LogQuery::default()).await.unwrap();
        assert_eq!(hours[8], 4);
    }
}

#[cfg(test)]
mod pipeline_tests {
    use super::fixtures::*;
    use crate::application::config::TelemetryConfig;
    use crate::application::pipeline::TelemetryPipeline;
    use crate::application::record_usage::{RecordUsageUseCase, UsageWriteOutcome};
    use crate::error::TelemetryError;
    use crate::infra::memory::InMemoryUsageStore;
    use chrono::Utc;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_record_usage_writes_both() {
        let store = InMemoryUsageStore::new();
        let use_case = RecordUsageUseCase::new(Arc::new(store.clone()));

        let outcome = use_case
            .execute(&entry("/api/x", 404, 12, Utc::now()))
            .await;
        assert_eq!(
            outcome,
            UsageWriteOutcome {
                log_written: true,
                aggregate_written: true
            }
        );
        assert_eq!(store.log_count(), 1);
        assert_eq!(store.aggregates()[0].failed_requests, 1);
    }

    #[tokio::test]
    async fn test_record_usage_swallows_failures() {
        let use_case = RecordUsageUseCase::new(Arc::new(FailingStore));
        let outcome = use_case
            .execute(&entry("/api/x", 200, 12, Utc::now()))
            .await;
        assert!(!outcome.log_written);
        assert!(!outcome.aggregate_written);
    }

    #[tokio::test]
    async fn test_pipeline_drains_on_shutdown() {
        let store = InMemoryUsageStore::new();
        let config = TelemetryConfig {
            queue_capacity: 64,
            max_in_flight: 4,
            ..Default::default()
        };
        let (pipeline, handle) = TelemetryPipeline::spawn(store.clone(), &config);

        for i in 0..50 {
            pipeline
                .submit(entry("/api/x", if i % 5 == 0 { 500 } else { 200 }, i, Utc::now()))
                .unwrap();
        }
        drop(pipeline);

        assert!(handle.drain(Duration::from_secs(5)).await);
        assert_eq!(store.log_count(), 50);

        let total: u64 = store.aggregates().iter().map(|a| a.total_requests).sum();
        assert_eq!(total, 50);
        assert!(store.aggregates().iter().all(|a| a.is_consistent()));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_full_queue_drops_events() {
        let store = InMemoryUsageStore::new();
        let config = TelemetryConfig {
            queue_capacity: 2,
            max_in_flight: 1,
            ..Default::default()
        };
        let (pipeline, handle) = TelemetryPipeline::spawn(store.clone(), &config);

        // The worker cannot run until this task yields
        assert!(pipeline.submit(entry("/api/x", 200, 1, Utc::now())).is_ok());
        assert!(pipeline.submit(entry("/api/x", 200, 1, Utc::now())).is_ok());
        assert!(matches!(
            pipeline.submit(entry("/api/x", 200, 1, Utc::now())),
            Err(TelemetryError::QueueFull)
        ));

        drop(pipeline);
        assert!(handle.drain(Duration::from_secs(5)).await);
        assert_eq!(store.log_count(), 2);
    }

    #[tokio::test]
    async fn test_pipeline_survives_store_failures() {
        let (pipeline, handle) = TelemetryPipeline::spawn(FailingStore, &TelemetryConfig::default());
        for _ in 0..5 {
            pipeline.submit(entry("/api/x", 200, 1, Utc::now())).unwrap();
        }
        drop(pipeline);
        assert!(handle.drain(Duration::from_secs(5)).await);
    }
}

#[cfg(test)]
mod stats_query_tests {
    use super::fixtures::*;
    use crate::application::stats::StatsQueryUseCase;
    use crate::domain::repository::{RequestLogRepository, UsageStatRepository};
    use crate::error::TelemetryError;
    use crate::infra::memory::InMemoryUsageStore;
    use std::sync::Arc;

    async fn seeded() -> InMemoryUsageStore {
        let store = InMemoryUsageStore::new();
        let data = [
            ("/api/v1/echo", 200, 10, at((2024, 3, 1), 3, 0)),
            ("/api/v1/echo", 200, 20, at((2024, 3, 1), 3, 10)),
            ("/api/v1/echo", 500, 30, at((2024, 3, 1), 14, 0)),
            ("/api/v1/slow", 200, 300, at((2024, 3, 1), 14, 5)),
            ("/api/v1/slow", 200, 100, at((2024, 3, 2), 14, 0)),
            ("/api/v1/echo", 404, 5, at((2024, 3, 2), 5, 0)),
        ];
        for (endpoint, status, ms, ts) in data {
            let e = entry(endpoint, status, ms, ts);
            store.insert(&e).await.unwrap();
            store.increment(&e.usage_key(), e.success, ms).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_overall() {
        let use_case = StatsQueryUseCase::new(Arc::new(seeded().await));
        let now = at((2024, 3, 3), 0, 0);
        let stats = use_case.overall(now).await.unwrap();

        assert_eq!(stats.totals.total_requests, 6);
        assert_eq!(stats.totals.success_requests, 4);
        assert_eq!(stats.totals.failed_requests, 2);
        assert_eq!(stats.success_rate, 66.67);
        assert_eq!(stats.average_response_time, 78); // 465 / 6 = 77.5
        assert_eq!(stats.unique_endpoints, 2);
        assert_eq!(stats.first_date, Some(date(2024, 3, 1)));
        assert_eq!(stats.peak_hour.unwrap().hour, 14);
        assert_eq!(stats.peak_hour.unwrap().count, 3);
        assert_eq!(stats.rankings.fastest.as_ref().unwrap().endpoint, "/api/v1/echo");
        assert_eq!(stats.rankings.slowest.as_ref().unwrap().endpoint, "/api/v1/slow");
        assert_eq!(stats.rankings.most_reliable.as_ref().unwrap().endpoint, "/api/v1/slow");
        assert_eq!(stats.top_endpoints[0].endpoint, "/api/v1/echo");
        assert_eq!(stats.generated_at, now);
    }

    #[tokio::test]
    async fn test_daily() {
        let use_case = StatsQueryUseCase::new(Arc::new(seeded().await));
        let stats = use_case
            .daily(date(2024, 3, 1), at((2024, 3, 1), 12, 0))
            .await
            .unwrap();

        assert_eq!(stats.totals.total_requests, 4);
        assert_eq!(stats.peak_hour.unwrap().hour, 3);
        // 4 requests over 12 elapsed hours
        assert_eq!(stats.requests_per_hour, 0.33);
        assert_eq!(stats.endpoints.len(), 2);
    }

    #[tokio::test]
    async fn test_daily_empty_day() {
        let use_case = StatsQueryUseCase::new(Arc::new(seeded().await));
        let stats = use_case
            .daily(date(2024, 6, 1), at((2024, 6, 2), 0, 0))
            .await
            .unwrap();
        assert_eq!(stats.totals.total_requests, 0);
        assert_eq!(stats.success_rate, 0.0);
        assert_eq!(stats.average_response_time, 0);
        assert_eq!(stats.peak_hour, None);
    }

    #[tokio::test]
    async fn test_range() {
        let use_case = StatsQueryUseCase::new(Arc::new(seeded().await));
        let stats = use_case
            .range(date(2024, 3, 1), date(2024, 3, 3), at((2024, 3, 10), 0, 0))
            .await
            .unwrap();

        assert_eq!(stats.days.len(), 3);
        assert_eq!(stats.days[1].total_requests, 2);
        assert_eq!(stats.days[2].total_requests, 0);
        // 6 requests over 72 hours
        assert_eq!(stats.requests_per_hour, 0.08);

        let err = use_case
            .range(date(2024, 3, 3), date(2024, 3, 1), at((2024, 3, 10), 0, 0))
            .await
            .unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidRange(_)));
    }

    #[tokio::test]
    async fn test_endpoint() {
        let use_case = StatsQueryUseCase::new(Arc::new(seeded().await));
        let stats = use_case
            .endpoint("/api/v1/echo", None, None, at((2024, 3, 2), 18, 0))
            .await
            .unwrap();

        assert_eq!(stats.from, date(2024, 2, 25));
        assert_eq!(stats.to, date(2024, 3, 2));
        assert_eq!(stats.days.len(), 7);
        assert_eq!(stats.totals.total_requests, 4);
        assert_eq!(stats.methods[0].method, "GET");
        assert_eq!(stats.versions[0].total_requests, 4);
        assert_eq!(stats.recent_errors.len(), 2);
        assert_eq!(stats.recent_errors[0].status_code, 404);

        assert!(matches!(
            use_case.endpoint("  ", None, None, at((2024, 3, 2), 0, 0)).await,
            Err(TelemetryError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_dates_at_calendar_edges_are_rejected() {
        let use_case = StatsQueryUseCase::new(Arc::new(InMemoryUsageStore::new()));
        let now = at((2024, 3, 1), 0, 0);
        let max = chrono::NaiveDate::MAX;
        let min = chrono::NaiveDate::MIN;

        assert!(matches!(
            use_case.range(max, max, now).await,
            Err(TelemetryError::InvalidRange(_))
        ));
        assert!(matches!(
            use_case.daily(max, now).await,
            Err(TelemetryError::InvalidRange(_))
        ));
        assert!(matches!(
            use_case.endpoint("/api/v1/echo", Some(max), Some(max), now).await,
            Err(TelemetryError::InvalidRange(_))
        ));
        assert!(matches!(
            use_case.endpoint("/api/v1/echo", None, Some(min), now).await,
            Err(TelemetryError::InvalidRange(_))
        ));

        // The last representable day still has a start
        let stats = use_case.daily(max.pred_opt().unwrap(), now).await.unwrap();
        assert_eq!(stats.totals.total_requests, 0);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let use_case = StatsQueryUseCase::new(Arc::new(FailingStore));
        let err = use_case.overall(at((2024, 3, 1), 0, 0)).await.unwrap_err();
        assert!(matches!(err, TelemetryError::Internal(_)));
    }
}

#[cfg(test)]
mod http_tests {
    use super::fixtures::*;
    use crate::application::config::TelemetryConfig;
    use crate::application::pipeline::TelemetryPipeline;
    use crate::domain::repository::UsageStatRepository;
    use crate::infra::memory::InMemoryUsageStore;
    use crate::presentation::middleware::UsageRecorder;
    use crate::presentation::router::{stats_router, with_usage_recording};
    use axum::body::{Body, to_bytes};
    use axum::http::{Request, StatusCode, header};
    use axum::response::IntoResponse;
    use axum::routing::get;
    use axum::{Extension, Json, Router};
    use kernel::request::ApiKeyIdentity;
    use serde_json::{Value, json};
    use std::time::Duration;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_records_api_requests_only() {
        let store = InMemoryUsageStore::new();
        let (pipeline, handle) = TelemetryPipeline::spawn(store.clone(), &TelemetryConfig::default());
        let recorder = UsageRecorder::new(pipeline, TelemetryConfig::default());

        let handlers = Router::new()
            .route("/api/v2/echo", get(|| async { Json(json!({ "ok": true })) }))
            .route(
                "/api/v2/fail",
                get(|| async {
                    (StatusCode::BAD_REQUEST, Json(json!({ "status": false, "message": "bad input" })))
                        .into_response()
                }),
            )
            .route("/health", get(|| async { "ok" }));
        let app = with_usage_recording(handlers, recorder)
            .layer(Extension(ApiKeyIdentity::new("alpha")));

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/api/v2/echo")
                    .header("x-api-key", "secret-key")
                    .header(header::AUTHORIZATION, "Bearer secret-token")
                    .header(header::USER_AGENT, "curl/8")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        assert!(res.headers().contains_key("x-request-id"));

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/api/v2/fail").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&to_bytes(res.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["message"], json!("bad input"));

        let res = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert!(!res.headers().contains_key("x-request-id"));

        assert!(handle.drain(Duration::from_secs(5)).await);

        let mut logs = crate::domain::repository::RequestLogRepository::find_logs(
            &store,
            &Default::default(),
        )
        .await
        .unwrap();
        assert_eq!(logs.len(), 2);
        logs.sort_by_key(|e| e.status_code);

        let ok = &logs[0];
        assert_eq!(ok.endpoint, "/api/v2/echo");
        assert_eq!(ok.version, "v2");
        assert_eq!(ok.api_key_id.as_deref(), Some("alpha"));
        assert_eq!(ok.user_agent.as_deref(), Some("curl/8"));
        assert_eq!(ok.headers.get("x-api-key").map(String::as_str), Some("[REDACTED]"));
        assert_eq!(ok.headers.get("authorization").map(String::as_str), Some("[REDACTED]"));
        assert!(ok.success);
        assert!(ok.error.is_none());

        let failed = &logs[1];
        assert!(!failed.success);
        assert_eq!(failed.error.as_ref().unwrap()["message"], json!("bad input"));

        let rows = store.find_stats(&Default::default()).await.unwrap();
        assert_eq!(rows.len(), 2);
        assert!(rows.iter().all(|r| r.is_consistent()));
    }

    #[tokio::test]
    async fn test_stats_routes() {
        let store = InMemoryUsageStore::new();
        let e = entry("/api/v1/echo", 200, 10, chrono::Utc::now());
        store.increment(&e.usage_key(), true, 10).await.unwrap();
        let app = stats_router(store);

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/admin/stats/overall").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&to_bytes(res.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["totalRequests"], json!(1));
        assert_eq!(body["successRate"], json!(100.0));

        let res = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/admin/stats/range?from=2024-03-05&to=2024-03-01")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&to_bytes(res.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["status"], json!(false));

        let res = app
            .clone()
            .oneshot(Request::builder().uri("/admin/stats/range?from=nope").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);

        let res = app
            .oneshot(
                Request::builder()
                    .uri("/admin/stats/endpoint?name=/api/v1/echo")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body: Value = serde_json::from_slice(&to_bytes(res.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["endpoint"], json!("/api/v1/echo"));
        assert_eq!(body["days"].as_array().unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_far_future_date_is_bad_request() {
        let app = stats_router(InMemoryUsageStore::new());
        let max = chrono::NaiveDate::MAX.to_string().replace('+', "%2B");

        let res = app
            .oneshot(
                Request::builder()
                    .uri(format!("/admin/stats/daily?date={max}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
        let body: Value = serde_json::from_slice(&to_bytes(res.into_body(), usize::MAX).await.unwrap()).unwrap();
        assert_eq!(body["status"], json!(false));
    }
}
