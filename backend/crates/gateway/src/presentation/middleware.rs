//! Admission Middleware
//!
//! Rate limiter, maintenance gate, API-key authenticator, response envelope
//! and the admin-token guard, each as an axum `from_fn` middleware.

use axum::body::{Body, HttpBody};
use axum::extract::{ConnectInfo, Query, Request};
use axum::http::{HeaderMap, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use kernel::endpoint::{endpoint_name, is_api_path};
use platform::client::client_identifier;
use platform::crypto::secret_eq;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::application::authenticate::AuthOutcome;
use crate::application::envelope::apply_envelope;
use crate::application::maintenance::{self, MaintenanceDecision};
use crate::domain::provider::SettingsProvider;
use crate::domain::settings::{DEFAULT_CREATOR, GatewaySettings};
use crate::error::GatewayError;
use crate::metrics::{AUTH_REJECTIONS_TOTAL, MAINTENANCE_REJECTIONS_TOTAL, RATE_LIMITED_TOTAL};
use crate::presentation::state::{AdminToken, GatewayState, SettingsSnapshot};

/// Header carrying the API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Query parameters accepted as the API key, in lookup order
pub const API_KEY_QUERY_PARAMS: [&str; 2] = ["apikey", "api_key"];

/// Reject clients that exceeded their fixed window
pub async fn rate_limit<P>(state: GatewayState<P>, req: Request, next: Next) -> Response
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    let direct_ip = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0.ip());
    let client = client_identifier(req.headers(), direct_ip);

    let now_ms = Utc::now().timestamp_millis();
    let result = state.limiter.check_at(&client, now_ms);

    if !result.allowed {
        RATE_LIMITED_TOTAL.inc();
        tracing::debug!(client = %client, count = result.count, "Rate limit exceeded");
        return GatewayError::RateLimited {
            retry_after_secs: result.retry_after_secs(now_ms),
        }
        .into_response();
    }

    next.run(req).await
}

/// Short-circuit non-operational paths while maintenance is on
///
/// A settings read failure is logged and the request passes.
pub async fn maintenance_gate<P>(state: GatewayState<P>, mut req: Request, next: Next) -> Response
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    let settings = match state.settings.current().await {
        Ok(settings) => settings,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read settings, admitting request");
            return next.run(req).await;
        }
    };

    let path = req.uri().path().to_string();
    let decision = maintenance::evaluate(&settings, &path);

    if decision != MaintenanceDecision::Pass {
        MAINTENANCE_REJECTIONS_TOTAL.inc();
        return GatewayError::Maintenance {
            api: decision == MaintenanceDecision::RejectJson,
            message: maintenance::message(&settings),
            creator: settings.creator().to_string(),
        }
        .into_response();
    }

    req.extensions_mut().insert(SettingsSnapshot(settings));
    next.run(req).await
}

/// Validate the API key on API paths and tag the request with its identity
///
/// The endpoint hit counter is bumped before validation, so rejected calls
/// are counted too.
pub async fn require_api_key<P>(state: GatewayState<P>, mut req: Request, next: Next) -> Response
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    let path = req.uri().path().to_string();
    if !is_api_path(&path) {
        return next.run(req).await;
    }
    // Bare roots such as `/api/v1` are key-checked but have no name to count
    let endpoint = endpoint_name(&path);
    if let Some(endpoint) = &endpoint {
        state.hits.record(endpoint);
    }

    let snapshot = snapshot(&req);
    let Some(settings) = request_settings(&state, snapshot).await else {
        return next.run(req).await;
    };

    let presented = presented_key(&req);
    let today = Utc::now().date_naive();

    match state
        .authenticator
        .authenticate(&settings, &path, presented.as_deref(), today)
    {
        Ok(AuthOutcome::Authenticated(identity)) => {
            tracing::debug!(key_id = %identity.as_str(), path = %path, "API key accepted");
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Ok(AuthOutcome::Anonymous | AuthOutcome::NotApplicable) => next.run(req).await,
        Err(e) => {
            AUTH_REJECTIONS_TOTAL.with_label_values(&[e.reason()]).inc();
            e.into_response()
        }
    }
}

/// Merge `status` and `creator` into JSON object responses
pub async fn envelope<P>(state: GatewayState<P>, req: Request, next: Next) -> Response
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    let snapshot = snapshot(&req);
    let creator = request_settings(&state, snapshot)
        .await
        .map(|settings| settings.creator().to_string())
        .unwrap_or_else(|| DEFAULT_CREATOR.to_string());

    let response = next.run(req).await;

    if !is_json(response.headers()) {
        return response;
    }

    let limit = state.config.envelope_body_limit;
    let size = response.body().size_hint().exact();
    if !size.is_some_and(|len| len <= limit as u64) {
        tracing::debug!(size = ?size, limit, "JSON response passed through without envelope");
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer response body for envelope");
            parts.headers.remove(header::CONTENT_LENGTH);
            return Response::from_parts(parts, Body::empty());
        }
    };

    let payload = match serde_json::from_slice::<serde_json::Value>(&bytes) {
        Ok(payload) if payload.is_object() => payload,
        _ => return Response::from_parts(parts, Body::from(bytes)),
    };

    let merged = apply_envelope(payload, &creator);
    match serde_json::to_vec(&merged) {
        Ok(body) => {
            parts.headers.remove(header::CONTENT_LENGTH);
            Response::from_parts(parts, Body::from(body))
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize enveloped payload");
            Response::from_parts(parts, Body::from(bytes))
        }
    }
}

/// Require `Authorization: Bearer <ADMIN_TOKEN>` when a token is configured
pub async fn require_admin_token(token: AdminToken, req: Request, next: Next) -> Response {
    let Some(expected) = token.0.as_deref() else {
        return next.run(req).await;
    };

    let authorized = bearer_token(req.headers()).is_some_and(|presented| secret_eq(presented, expected));
    if !authorized {
        return GatewayError::AdminTokenRequired.into_response();
    }

    next.run(req).await
}

fn snapshot(req: &Request) -> Option<Arc<GatewaySettings>> {
    req.extensions()
        .get::<SettingsSnapshot>()
        .map(|SettingsSnapshot(settings)| settings.clone())
}

/// Settings for this request: the gate's snapshot, else a fresh read
async fn request_settings<P>(
    state: &GatewayState<P>,
    snapshot: Option<Arc<GatewaySettings>>,
) -> Option<Arc<GatewaySettings>>
where
    P: SettingsProvider + Clone + Send + Sync + 'static,
{
    if snapshot.is_some() {
        return snapshot;
    }

    match state.settings.current().await {
        Ok(settings) => Some(settings),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read settings");
            None
        }
    }
}

/// Key from the `x-api-key` header, the query string, or a bearer token
pub fn presented_key(req: &Request) -> Option<String> {
    if let Some(key) = req
        .headers()
        .get(API_KEY_HEADER)
        .and_then(|value| value.to_str().ok())
    {
        return Some(key.to_string());
    }

    if let Ok(Query(params)) = Query::<HashMap<String, String>>::try_from_uri(req.uri()) {
        if let Some(key) = API_KEY_QUERY_PARAMS
            .iter()
            .find_map(|name| params.get(*name))
        {
            return Some(key.clone());
        }
    }

    bearer_token(req.headers()).map(str::to_string)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}
