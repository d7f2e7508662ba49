//! API route handlers.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderName},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, error};

use lcp_core::traits::CacheData;

use crate::dto::{HealthResponse, MetricsResponse};
use crate::error::ApiError;
use crate::metrics::MetricsState;
use crate::sse;
use crate::state::{AppState, CacheState};

type Result<T> = std::result::Result<T, ApiError>;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        up_since: state.up_since,
    })
}

/// GET /metrics
pub async fn get_metrics(State(state): State<MetricsState>) -> Json<MetricsResponse> {
    let caches = state
        .caches
        .iter()
        .map(|cache| (cache.name().to_string(), cache.stats()))
        .collect();

    Json(MetricsResponse {
        requests: state.app.metrics.requests(),
        successful_requests: state.app.metrics.successful(),
        caches,
    })
}

/// GET /:name
///
/// Current snapshot as rendered by the cache's marshal function.
pub async fn read_snapshot<T: CacheData>(State(state): State<CacheState<T>>) -> Result<Response> {
    state.cache.record_request();
    let body = state.cache.marshal().map_err(|err| {
        error!(cache = %state.cache.name(), error = %err, "Failed to marshal snapshot");
        ApiError::from(err)
    })?;

    Ok(([(header::CONTENT_TYPE, "application/json")], body).into_response())
}

/// GET|POST /:name/stream
///
/// Server-sent events: a retry directive, periodic heartbeats, and one
/// `message` event per accepted update. No backlog is replayed; clients pair
/// the stream with a read of `GET /:name`.
pub async fn stream_snapshot<T: CacheData>(State(state): State<CacheState<T>>) -> Response {
    state.cache.record_request();
    let subscription = state.cache.subscribe();
    debug!(
        cache = %state.cache.name(),
        subscriber = subscription.id(),
        subscribers = state.cache.subscriber_count(),
        "Stream opened"
    );

    let config = &state.app.config;
    let events = sse::event_stream(
        subscription,
        state.app.closing.subscribe(),
        config.heartbeat,
        config.retry_ms,
    );

    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
            (header::CONNECTION, "keep-alive"),
            (X_ACCEL_BUFFERING, "no"),
        ],
        Body::from_stream(events),
    )
        .into_response()
}
