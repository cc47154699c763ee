//! Usage Recording Middleware
//!
//! Wraps API requests: assigns a request id, times the handler, then queues
//! a `RequestLogEntry`. The write itself happens on the pipeline worker, so
//! the response is never held up by the store.

use axum::body::{Body, HttpBody};
use axum::extract::{ConnectInfo, Request};
use axum::http::{HeaderMap, HeaderName, HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use chrono::Utc;
use kernel::endpoint::{API_VERSION_HEADER, api_version, is_api_path};
use kernel::id::RequestId;
use kernel::request::ApiKeyIdentity;
use platform::client::{client_identifier, sanitize_headers, user_agent};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use crate::application::config::TelemetryConfig;
use crate::application::pipeline::TelemetryPipeline;
use crate::domain::entities::{RequestLogEntry, is_success_status};

/// Response header echoing the request id
pub static REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Middleware state
#[derive(Debug, Clone)]
pub struct UsageRecorder {
    pub pipeline: TelemetryPipeline,
    pub config: Arc<TelemetryConfig>,
}

impl UsageRecorder {
    pub fn new(pipeline: TelemetryPipeline, config: TelemetryConfig) -> Self {
        Self {
            pipeline,
            config: Arc::new(config),
        }
    }
}

/// Request facts captured before the handler runs
struct PendingEntry {
    request_id: RequestId,
    endpoint: String,
    method: String,
    client_ip: String,
    user_agent: Option<String>,
    headers: BTreeMap<String, String>,
    version: String,
    api_key_id: Option<String>,
}

impl PendingEntry {
    fn from_request(req: &Request) -> Self {
        let headers = req.headers();
        let path = req.uri().path();

        let direct_ip = req
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|info| info.0.ip());
        let version_header = headers
            .get(API_VERSION_HEADER)
            .and_then(|value| value.to_str().ok());

        Self {
            request_id: RequestId::new(),
            endpoint: path.to_string(),
            method: req.method().as_str().to_string(),
            client_ip: client_identifier(headers, direct_ip),
            user_agent: user_agent(headers),
            headers: sanitize_headers(headers),
            version: api_version(path, version_header),
            api_key_id: req
                .extensions()
                .get::<ApiKeyIdentity>()
                .map(|identity| identity.id.clone()),
        }
    }

    fn complete(
        self,
        status_code: u16,
        response_time: u64,
        error: Option<serde_json::Value>,
    ) -> RequestLogEntry {
        RequestLogEntry {
            request_id: self.request_id.into_uuid(),
            endpoint: self.endpoint,
            method: self.method,
            client_ip: self.client_ip,
            user_agent: self.user_agent,
            headers: self.headers,
            status_code,
            response_time,
            version: self.version,
            api_key_id: self.api_key_id,
            success: is_success_status(status_code),
            error,
            timestamp: Utc::now(),
        }
    }
}

/// Record one API request; other paths pass straight through
pub async fn record_usage(recorder: UsageRecorder, mut req: Request, next: Next) -> Response {
    if !is_api_path(req.uri().path()) {
        return next.run(req).await;
    }

    let pending = PendingEntry::from_request(&req);
    let request_id = pending.request_id;
    req.extensions_mut().insert(request_id);

    let started = Instant::now();
    let response = next.run(req).await;
    let response_time = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let status_code = response.status().as_u16();
    let (mut response, error) = if is_success_status(status_code) {
        (response, None)
    } else {
        capture_error(response, recorder.config.error_body_limit).await
    };

    if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER.clone(), value);
    }

    // Failures are logged and counted by the pipeline
    let _ = recorder
        .pipeline
        .submit(pending.complete(status_code, response_time, error));

    response
}

/// Keep a small JSON error body for the log, leaving the response intact
async fn capture_error(response: Response, limit: usize) -> (Response, Option<serde_json::Value>) {
    let small = response
        .body()
        .size_hint()
        .exact()
        .is_some_and(|len| len <= limit as u64);
    if !small || !is_json(response.headers()) {
        return (response, None);
    }

    let (mut parts, body) = response.into_parts();
    match axum::body::to_bytes(body, limit).await {
        Ok(bytes) => {
            let error = serde_json::from_slice(&bytes).ok();
            (Response::from_parts(parts, Body::from(bytes)), error)
        }
        Err(e) => {
            tracing::warn!(error = %e, "Failed to buffer error body for telemetry");
            parts.headers.remove(header::CONTENT_LENGTH);
            (Response::from_parts(parts, Body::empty()), None)
        }
    }
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|ct| ct.starts_with("application/json"))
}
