//! App state: configuration, authorization, shutdown signal.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use lcp_cache::Cache;
use lcp_core::constants::{HEARTBEAT_INTERVAL, REQUEST_TIMEOUT, STREAM_RETRY_MS};
use lcp_core::traits::CacheData;

use crate::auth::{Authorizer, BearerTokens};
use crate::metrics::RequestMetrics;

/// API server configuration.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    /// Accepted bearer tokens
    pub valid_tokens: Vec<String>,
    /// Idle interval between heartbeat frames
    pub heartbeat: Duration,
    /// Reconnect delay advertised to stream clients
    pub retry_ms: u64,
    /// Deadline for point reads
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            valid_tokens: Vec::new(),
            heartbeat: HEARTBEAT_INTERVAL,
            retry_ms: STREAM_RETRY_MS,
            request_timeout: REQUEST_TIMEOUT,
        }
    }
}

impl ApiConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();

        Self {
            valid_tokens: std::env::var("VALID_TOKENS")
                .map(|v| v.split_whitespace().map(String::from).collect())
                .unwrap_or_default(),
            ..Self::default()
        }
    }

    /// Replaces the accepted tokens.
    pub fn with_tokens<I, S>(mut self, tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.valid_tokens = tokens.into_iter().map(Into::into).collect();
        self
    }

    /// Sets the heartbeat interval.
    pub fn heartbeat(mut self, heartbeat: Duration) -> Self {
        self.heartbeat = heartbeat;
        self
    }
}

/// Shared application state.
pub struct AppState {
    /// Configuration
    pub config: ApiConfig,
    /// Request authorization
    pub authorizer: Arc<dyn Authorizer>,
    /// Process start, reported by `/health`
    pub up_since: DateTime<Utc>,
    /// Server-wide request counters
    pub metrics: RequestMetrics,
    /// Flipped to true when the server starts shutting down; ends open streams.
    pub closing: watch::Sender<bool>,
}

impl AppState {
    /// Creates state authorizing requests against `config.valid_tokens`.
    pub fn new(config: ApiConfig) -> Self {
        let authorizer = Arc::new(BearerTokens::new(config.valid_tokens.clone()));
        Self::with_authorizer(config, authorizer)
    }

    /// Creates state with a custom authorizer.
    pub fn with_authorizer(config: ApiConfig, authorizer: Arc<dyn Authorizer>) -> Self {
        let (closing, _) = watch::channel(false);
        Self {
            config,
            authorizer,
            up_since: Utc::now(),
            metrics: RequestMetrics::default(),
            closing,
        }
    }
}

/// State of the routes serving one cache.
pub struct CacheState<T: CacheData> {
    /// The cache being served
    pub cache: Arc<Cache<T>>,
    /// Shared application state
    pub app: Arc<AppState>,
}

impl<T: CacheData> Clone for CacheState<T> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            app: self.app.clone(),
        }
    }
}
