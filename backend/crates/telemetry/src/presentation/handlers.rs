//! HTTP Handlers

use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use chrono::Utc;
use std::sync::Arc;

use crate::application::stats::{
    DailyStats, EndpointStats, OverallStats, RangeStats, StatsQueryUseCase,
};
use crate::domain::repository::{RequestLogRepository, UsageStatRepository};
use crate::error::{TelemetryError, TelemetryResult};
use crate::presentation::dto::{DailyQuery, EndpointQuery, RangeQuery};

/// Shared state for statistics handlers
#[derive(Clone)]
pub struct StatsAppState<S>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    pub store: Arc<S>,
}

impl<S> StatsAppState<S>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    fn use_case(&self) -> StatsQueryUseCase<S> {
        StatsQueryUseCase::new(self.store.clone())
    }
}

fn query<T>(query: Result<Query<T>, QueryRejection>) -> TelemetryResult<T> {
    query
        .map(|Query(params)| params)
        .map_err(|rejection| TelemetryError::InvalidQuery(rejection.body_text()))
}

/// GET /admin/stats/overall
pub async fn overall<S>(State(state): State<StatsAppState<S>>) -> TelemetryResult<Json<OverallStats>>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    let stats = state.use_case().overall(Utc::now()).await?;
    Ok(Json(stats))
}

/// GET /admin/stats/daily?date=YYYY-MM-DD
pub async fn daily<S>(
    State(state): State<StatsAppState<S>>,
    params: Result<Query<DailyQuery>, QueryRejection>,
) -> TelemetryResult<Json<DailyStats>>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    let params = query(params)?;
    let now = Utc::now();
    let date = params.date.unwrap_or_else(|| now.date_naive());

    let stats = state.use_case().daily(date, now).await?;
    Ok(Json(stats))
}

/// GET /admin/stats/range?from=YYYY-MM-DD&to=YYYY-MM-DD
pub async fn range<S>(
    State(state): State<StatsAppState<S>>,
    params: Result<Query<RangeQuery>, QueryRejection>,
) -> TelemetryResult<Json<RangeStats>>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    let params = query(params)?;
    let stats = state
        .use_case()
        .range(params.from, params.to, Utc::now())
        .await?;
    Ok(Json(stats))
}

/// GET /admin/stats/endpoint?name=/api/v1/echo[&from=&to=]
pub async fn endpoint<S>(
    State(state): State<StatsAppState<S>>,
    params: Result<Query<EndpointQuery>, QueryRejection>,
) -> TelemetryResult<Json<EndpointStats>>
where
    S: RequestLogRepository + UsageStatRepository + Clone + Send + Sync + 'static,
{
    let params = query(params)?;
    let stats = state
        .use_case()
        .endpoint(&params.name, params.from, params.to, Utc::now())
        .await?;
    Ok(Json(stats))
}
