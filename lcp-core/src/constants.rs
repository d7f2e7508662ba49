//! Defaults shared by the cache, the scheduler, and the stream endpoint.

use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// BROADCAST
// ═══════════════════════════════════════════════════════════════════════════════

/// Frames buffered per stream subscriber before it is treated as unresponsive.
pub const DEFAULT_SUBSCRIBER_CAPACITY: usize = 8;

// ═══════════════════════════════════════════════════════════════════════════════
// SERVER-SENT EVENTS
// ═══════════════════════════════════════════════════════════════════════════════

/// Reconnect delay advertised to stream clients, in milliseconds.
pub const STREAM_RETRY_MS: u64 = 5000;

/// Interval between heartbeat comment frames on an idle stream.
pub const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(2);

// ═══════════════════════════════════════════════════════════════════════════════
// REFRESH & STORAGE
// ═══════════════════════════════════════════════════════════════════════════════

/// Default wait between two refreshes of a cache.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Extension of a persisted snapshot file.
pub const SNAPSHOT_EXTENSION: &str = "json";

/// Folder used for persisted snapshots when none is configured.
pub const DEFAULT_CACHE_FOLDER: &str = "cache";

/// Timeout applied to outbound requests and to point-read responses.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(20);
