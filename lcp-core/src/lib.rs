//! # LCP Core
//!
//! Core types, errors, and traits shared by every LCP crate.
//!
//! - **Types**: [`Snapshot`] and the payload models published by integrations
//! - **Errors**: [`LcpError`] with transient/unexpected classification
//! - **Constants**: stream and subscriber defaults
//! - **Traits**: the [`CacheData`] capability bound
//!
//! ## Example
//!
//! ```rust
//! use lcp_core::Snapshot;
//!
//! let snapshot = Snapshot::new(vec!["gameA".to_string()]);
//! let json = serde_json::to_string(&snapshot).unwrap();
//! assert!(json.contains("\"updated\""));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod constants;
pub mod error;
pub mod models;
pub mod traits;
pub mod types;

pub use constants::*;
pub use error::{LcpError, Result};
pub use traits::*;
pub use types::*;
