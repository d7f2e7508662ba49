//! # LCP Sources
//!
//! Upstream adapters that produce cache payloads.
//!
//! [`JsonSource`] fetches a JSON document from a URL and maps transport and
//! status failures onto [`LcpError`] so the refresh loop can tell transient
//! upstream trouble from real bugs.
//!
//! ## Example
//!
//! ```rust,ignore
//! use lcp_sources::{http_client, JsonSource};
//!
//! let client = http_client()?;
//! let source = JsonSource::new("https://api.example.com/games").bearer(token);
//! let games: serde_json::Value = source.fetch(&client).await?;
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod config;
mod json;

pub use config::{load_sources, parse_sources, validate_cache_name, SourceConfig, SourceKind};
pub use json::{http_client, JsonSource};

pub use lcp_core::error::{LcpError, Result};
