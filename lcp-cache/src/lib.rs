//! # LCP Cache
//!
//! Generic self-refreshing, durable, broadcast cache.
//!
//! - [`Cache`]: typed snapshot store with change detection
//! - [`SnapshotFile`]: per-cache JSON file surviving restarts
//! - [`Broadcaster`]: non-blocking fan-out to live subscribers
//! - [`spawn_refresh`]: background loop feeding the cache from upstream
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use lcp_cache::{Cache, CacheConfig, RefreshConfig, spawn_refresh};
//!
//! let games = fetch_games(&client).await;
//! let cache = Arc::new(
//!     Cache::open(CacheConfig::new("steam", "cache"), games.clone().unwrap_or_default(), games.is_ok()).await?,
//! );
//! let handle = spawn_refresh(cache.clone(), client, fetch_games_owned, RefreshConfig::default());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

mod broadcast;
mod cache;
pub mod change;
mod refresh;
mod storage;

pub use broadcast::{Broadcaster, Frame, Subscription};
pub use cache::{json_marshal, marshal_with, Cache, CacheConfig, CacheStats, Marshal, StatsSource};
pub use refresh::{refresh_once, spawn_refresh, RefreshConfig, RefreshHandle, RefreshOutcome};
pub use storage::{CorruptSnapshotPolicy, SnapshotFile};
