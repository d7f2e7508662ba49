//! Error types for LCP.
//!
//! One error enum covers fetching, change detection, and persistence so that
//! the refresh loop can classify any failure with a single match.

use thiserror::Error;

/// Result type alias using `LcpError`.
pub type Result<T> = std::result::Result<T, LcpError>;

/// Main error type for all LCP operations.
#[derive(Debug, Error)]
pub enum LcpError {
    // ═══════════════════════════════════════════════════════════════════════════
    // UPSTREAM FETCH ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Upstream asked us to slow down.
    #[error("Rate limited by upstream: {0}")]
    RateLimited(String),

    /// Upstream did not answer in time.
    #[error("Upstream timeout: {0}")]
    Timeout(String),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned {status}: {message}")]
    Upstream {
        /// HTTP status code returned by the upstream service
        status: u16,
        /// Short description of the failure
        message: String,
    },

    /// Integration-specific condition where upstream has nothing usable yet.
    #[error("No data available: {0}")]
    NoData(String),

    /// Request could not be sent or its body could not be read.
    #[error("HTTP request failed: {0}")]
    Http(String),

    /// Upstream payload did not have the expected shape.
    #[error("Invalid upstream payload: {0}")]
    InvalidPayload(String),

    // ═══════════════════════════════════════════════════════════════════════════
    // SERIALIZATION ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // ═══════════════════════════════════════════════════════════════════════════
    // STORAGE ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A persisted snapshot exists but cannot be decoded.
    #[error("Corrupt snapshot file '{path}': {reason}")]
    CorruptSnapshot {
        /// Path of the offending file
        path: String,
        /// Decoder error
        reason: String,
    },

    // ═══════════════════════════════════════════════════════════════════════════
    // VALIDATION & INTERNAL ERRORS
    // ═══════════════════════════════════════════════════════════════════════════

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal invariant violation.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl LcpError {
    /// Returns true if this is a known, retryable fetch failure.
    ///
    /// Expected errors are logged as warnings by the refresh loop; everything
    /// else is reported as an operational failure.
    pub fn is_expected(&self) -> bool {
        match self {
            LcpError::RateLimited(_) | LcpError::Timeout(_) | LcpError::NoData(_) => true,
            LcpError::Upstream { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Returns true if this error came from local persistence.
    pub fn is_storage_error(&self) -> bool {
        matches!(self, LcpError::Io(_) | LcpError::CorruptSnapshot { .. })
    }
}
