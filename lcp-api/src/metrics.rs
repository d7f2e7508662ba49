//! Request counters and the metrics route state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use lcp_cache::StatsSource;

use crate::state::AppState;

/// Server-wide request counters.
#[derive(Debug, Default)]
pub struct RequestMetrics {
    requests: AtomicU64,
    successful: AtomicU64,
}

impl RequestMetrics {
    /// Requests received on any route.
    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Requests answered with a 2xx status.
    pub fn successful(&self) -> u64 {
        self.successful.load(Ordering::Relaxed)
    }
}

/// Middleware counting every request and its outcome.
pub async fn count_requests(State(state): State<Arc<AppState>>, request: Request, next: Next) -> Response {
    state.metrics.requests.fetch_add(1, Ordering::Relaxed);
    let response = next.run(request).await;
    if response.status().is_success() {
        state.metrics.successful.fetch_add(1, Ordering::Relaxed);
    }
    response
}

/// State of the metrics route.
#[derive(Clone)]
pub struct MetricsState {
    /// Shared application state
    pub app: Arc<AppState>,
    /// Every mounted cache
    pub caches: Arc<[Arc<dyn StatsSource>]>,
}
