//! DTOs for API responses.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lcp_cache::CacheStats;

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always true while the process serves requests
    pub ok: bool,
    /// When the server state was created
    pub up_since: DateTime<Utc>,
}

/// Metrics response.
#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    /// Requests received on any route
    pub requests: u64,
    /// Requests answered with a 2xx status
    pub successful_requests: u64,
    /// Per-cache statistics, keyed by cache name
    pub caches: BTreeMap<String, CacheStats>,
}
