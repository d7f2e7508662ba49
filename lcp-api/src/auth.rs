//! Bearer token authorization.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Decides whether a request may read cache data.
pub trait Authorizer: Send + Sync {
    /// Returns true if the request headers carry valid credentials.
    fn authorize(&self, headers: &HeaderMap) -> bool;
}

/// Accepts `Authorization: Bearer <token>` for any configured token.
#[derive(Clone, Debug, Default)]
pub struct BearerTokens {
    tokens: Vec<String>,
}

impl BearerTokens {
    /// Creates an authorizer accepting `tokens`. Blank tokens are ignored.
    pub fn new(tokens: Vec<String>) -> Self {
        Self {
            tokens: tokens.into_iter().filter(|t| !t.trim().is_empty()).collect(),
        }
    }
}

impl Authorizer for BearerTokens {
    fn authorize(&self, headers: &HeaderMap) -> bool {
        let Some(given) = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
        else {
            return false;
        };
        self.tokens.iter().any(|token| token == given)
    }
}

/// Middleware rejecting unauthorized requests before they reach a cache.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if !state.authorizer.authorize(request.headers()) {
        debug!(path = %request.uri().path(), "Rejected unauthorized request");
        return Err(ApiError::unauthorized("invalid bearer auth token"));
    }
    Ok(next.run(request).await)
}
