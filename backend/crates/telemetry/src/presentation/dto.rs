//! Query DTOs for the statistics routes

use chrono::NaiveDate;
use serde::Deserialize;

/// GET /admin/stats/daily
#[derive(Debug, Deserialize)]
pub struct DailyQuery {
    /// Defaults to today (UTC)
    pub date: Option<NaiveDate>,
}

/// GET /admin/stats/range
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// GET /admin/stats/endpoint
#[derive(Debug, Deserialize)]
pub struct EndpointQuery {
    /// Request path, e.g. `/api/v1/echo`
    pub name: String,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
