//! # LCP API Server
//!
//! HTTP surface for LCP caches.
//!
//! ## Endpoints
//!
//! - `GET /health` - Liveness check (no auth)
//! - `GET /metrics` - Request counters and per-cache statistics (no auth)
//! - `GET /:name` - Current snapshot of cache `name`
//! - `GET|POST /:name/stream` - Server-sent events with every accepted update
//!
//! Cache routes require `Authorization: Bearer <token>`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lcp_api::{ApiServer, ApiConfig};
//!
//! let server = ApiServer::new(ApiConfig::from_env()).mount(steam_cache);
//! server.run(([0, 0, 0, 0], 8000), shutdown_signal()).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod auth;
mod dto;
mod error;
mod handlers;
mod metrics;
mod routes;
mod sse;
mod state;

pub use auth::{Authorizer, BearerTokens};
pub use dto::{HealthResponse, MetricsResponse};
pub use error::ApiError;
pub use metrics::RequestMetrics;
pub use routes::{cache_routes, create_router, metrics_router};
pub use state::{ApiConfig, AppState, CacheState};

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use lcp_cache::{Cache, StatsSource};
use lcp_core::traits::CacheData;

/// API server for LCP caches.
pub struct ApiServer {
    state: Arc<AppState>,
    caches: Router,
    mounted: Vec<String>,
    stats: Vec<Arc<dyn StatsSource>>,
}

impl ApiServer {
    /// Creates a new API server with the given configuration.
    pub fn new(config: ApiConfig) -> Self {
        Self::with_state(AppState::new(config))
    }

    /// Creates a server around prepared state, e.g. with a custom [`Authorizer`].
    pub fn with_state(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
            caches: Router::new(),
            mounted: Vec::new(),
            stats: Vec::new(),
        }
    }

    /// Adds the read and stream routes of `cache`.
    pub fn mount<T: CacheData>(mut self, cache: Arc<Cache<T>>) -> Self {
        self.mounted.push(cache.name().to_string());
        self.stats.push(cache.clone());
        self.caches = self.caches.merge(cache_routes(self.state.clone(), cache));
        self
    }

    /// Names of the mounted caches.
    pub fn mounted(&self) -> &[String] {
        &self.mounted
    }

    /// Creates the router with all routes configured.
    pub fn router(&self) -> Router {
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);

        create_router(self.state.clone())
            .merge(metrics_router(self.state.clone(), self.stats.clone()))
            .merge(self.caches.clone())
            .layer(middleware::from_fn_with_state(self.state.clone(), metrics::count_requests))
            .layer(cors)
            .layer(TraceLayer::new_for_http())
    }

    /// Runs the server until `shutdown` resolves.
    ///
    /// On shutdown, open event streams are ended so in-flight connections
    /// can drain.
    pub async fn run(
        self,
        addr: impl Into<SocketAddr>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> std::io::Result<()> {
        let addr = addr.into();
        let listener = tokio::net::TcpListener::bind(addr).await?;

        info!(%addr, caches = ?self.mounted, "LCP API server listening");

        let state = self.state.clone();
        axum::serve(listener, self.router())
            .with_graceful_shutdown(async move {
                shutdown.await;
                info!("Shutting down API server");
                state.closing.send_replace(true);
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use lcp_cache::CacheConfig;
    use tempfile::tempdir;
    use tower::ServiceExt;

    fn get(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_metrics_count_requests_per_cache() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(
            Cache::open(CacheConfig::new("github", dir.path()), vec!["repo".to_string()], true)
                .await
                .unwrap(),
        );
        let app = ApiServer::new(ApiConfig::default().with_tokens(["secret"]))
            .mount(cache.clone())
            .router();

        let ok = app.clone().oneshot(get("/github", Some("secret"))).await.unwrap();
        assert_eq!(ok.status(), StatusCode::OK);
        let denied = app.clone().oneshot(get("/github", None)).await.unwrap();
        assert_eq!(denied.status(), StatusCode::UNAUTHORIZED);

        let response = app.oneshot(get("/metrics", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let metrics: serde_json::Value = serde_json::from_slice(&body).unwrap();

        // The metrics request itself is counted before its response is built.
        assert_eq!(metrics["requests"], 3);
        assert_eq!(metrics["successful_requests"], 1);
        assert_eq!(metrics["caches"]["github"]["requests"], 1);
        assert_eq!(metrics["caches"]["github"]["updates"], 1);
        assert_eq!(metrics["caches"]["github"]["subscribers"], 0);
    }
}
