//! API route configuration.

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tower_http::timeout::TimeoutLayer;

use lcp_cache::{Cache, StatsSource};
use lcp_core::traits::CacheData;

use crate::auth::require_auth;
use crate::handlers;
use crate::metrics::MetricsState;
use crate::state::{AppState, CacheState};

/// Creates the router for routes that do not belong to a cache.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check))
        .with_state(state)
}

/// Creates the metrics route reporting on `caches`.
pub fn metrics_router(state: Arc<AppState>, caches: Vec<Arc<dyn StatsSource>>) -> Router {
    Router::new()
        .route("/metrics", get(handlers::get_metrics))
        .with_state(MetricsState {
            app: state,
            caches: caches.into(),
        })
}

/// Creates the authorized read and stream routes for one cache.
///
/// The point read is bounded by the request timeout; the stream is
/// long-lived and is not.
pub fn cache_routes<T: CacheData>(state: Arc<AppState>, cache: Arc<Cache<T>>) -> Router {
    let name = cache.name().to_string();
    let timeout = TimeoutLayer::new(state.config.request_timeout);

    Router::new()
        .route(&format!("/{name}"), get(handlers::read_snapshot::<T>).layer(timeout))
        .route(
            &format!("/{name}/stream"),
            get(handlers::stream_snapshot::<T>).post(handlers::stream_snapshot::<T>),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(CacheState { cache, app: state })
}
