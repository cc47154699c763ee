//! Gateway Router Composition
//!
//! Layers are applied innermost first. `with_envelope` wraps the handler
//! routes, telemetry goes around that, and `with_admission` goes outside
//! telemetry.

use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::{Router, routing::get};
use std::sync::Arc;

use crate::application::hit_counter::EndpointHits;
use crate::domain::provider::SettingsProvider;
use crate::presentation::handlers;
use crate::presentation::middleware::{
    envelope, maintenance_gate, rate_limit, require_admin_token, require_api_key,
};
use crate::presentation::state::{AdminToken, GatewayState};

/// Merge `status`/`creator` into every JSON object response of `router`
pub fn with_envelope<P>(router: Router, state: GatewayState<P>) -> Router
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn(move |req: Request, next: Next| {
        envelope(state.clone(), req, next)
    }))
}

/// Rate limiter -> maintenance gate -> API-key authenticator around `router`
pub fn with_admission<P>(router: Router, state: GatewayState<P>) -> Router
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    let auth_state = state.clone();
    let gate_state = state.clone();
    let limit_state = state;

    router
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            require_api_key(auth_state.clone(), req, next)
        }))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            maintenance_gate(gate_state.clone(), req, next)
        }))
        .layer(middleware::from_fn(move |req: Request, next: Next| {
            rate_limit(limit_state.clone(), req, next)
        }))
}

/// Guard every route of `router` with the admin token
pub fn with_admin_guard(router: Router, token: AdminToken) -> Router {
    router.layer(middleware::from_fn(move |req: Request, next: Next| {
        require_admin_token(token.clone(), req, next)
    }))
}

/// `/admin/hits`
pub fn hits_router(hits: Arc<EndpointHits>) -> Router {
    Router::new()
        .route("/admin/hits", get(handlers::endpoint_hits))
        .with_state(hits)
}
