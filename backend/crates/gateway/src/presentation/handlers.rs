//! Admin Handlers

use axum::Json;
use axum::extract::State;
use serde::Serialize;
use std::sync::Arc;

use crate::application::hit_counter::{EndpointHit, EndpointHits};

#[derive(Debug, Serialize)]
pub struct HitsResponse {
    pub total: u64,
    pub endpoints: Vec<EndpointHit>,
}

/// GET /admin/hits
pub async fn endpoint_hits(State(hits): State<Arc<EndpointHits>>) -> Json<HitsResponse> {
    Json(HitsResponse {
        total: hits.total(),
        endpoints: hits.snapshot(),
    })
}
