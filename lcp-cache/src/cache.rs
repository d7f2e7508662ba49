//! The snapshot store.
//!
//! A [`Cache`] holds one typed snapshot behind a read/write lock. Updates are
//! serialized through an async writer gate; each accepted update swaps the
//! snapshot, then persists and broadcasts it outside the lock.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use lcp_core::constants::{DEFAULT_CACHE_FOLDER, DEFAULT_SUBSCRIBER_CAPACITY};
use lcp_core::error::{LcpError, Result};
use lcp_core::traits::CacheData;
use lcp_core::types::Snapshot;

use crate::broadcast::{Broadcaster, Subscription};
use crate::change::{self, Change};
use crate::storage::{CorruptSnapshotPolicy, SnapshotFile};

/// Turns a snapshot into the frame served to clients.
pub type Marshal<T> = Arc<dyn Fn(&Snapshot<T>) -> Result<String> + Send + Sync>;

/// Serializes the snapshot as-is: `{"data": ..., "updated": ...}`.
pub fn json_marshal<T: Serialize + 'static>() -> Marshal<T> {
    Arc::new(|snapshot: &Snapshot<T>| Ok(serde_json::to_string(snapshot)?))
}

/// Serializes a reshaped payload, keeping the `{data, updated}` envelope.
pub fn marshal_with<T, U, F>(reshape: F) -> Marshal<T>
where
    T: 'static,
    U: Serialize + 'static,
    F: Fn(&T) -> U + Send + Sync + 'static,
{
    Arc::new(move |snapshot: &Snapshot<T>| {
        let reshaped = snapshot.borrowed().map(&reshape);
        Ok(serde_json::to_string(&reshaped)?)
    })
}

/// Cache statistics.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Accepted updates since the process started
    pub updates: u64,
    /// Authorized reads and stream connections served
    pub requests: u64,
    /// Live stream subscribers
    pub subscribers: usize,
}

/// Type-erased view of a cache's statistics.
pub trait StatsSource: Send + Sync {
    /// Logical name of the cache.
    fn name(&self) -> &str;
    /// Current statistics.
    fn stats(&self) -> CacheStats;
}

#[derive(Default)]
struct Counters {
    updates: AtomicU64,
    requests: AtomicU64,
}

/// Cache configuration.
#[derive(Clone, Debug)]
pub struct CacheConfig {
    /// Logical name; used for the route segment and the snapshot file
    pub name: String,
    /// Folder holding persisted snapshots
    pub root: PathBuf,
    /// Frames buffered per stream subscriber
    pub subscriber_capacity: usize,
    /// Behavior when the persisted snapshot cannot be decoded
    pub on_corrupt: CorruptSnapshotPolicy,
}

impl CacheConfig {
    /// Creates a configuration with default capacity and strict corruption handling.
    pub fn new(name: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            root: root.into(),
            subscriber_capacity: DEFAULT_SUBSCRIBER_CAPACITY,
            on_corrupt: CorruptSnapshotPolicy::default(),
        }
    }

    /// Sets the per-subscriber buffer size.
    pub fn subscriber_capacity(mut self, capacity: usize) -> Self {
        self.subscriber_capacity = capacity;
        self
    }

    /// Sets the corrupt snapshot policy.
    pub fn on_corrupt(mut self, policy: CorruptSnapshotPolicy) -> Self {
        self.on_corrupt = policy;
        self
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new("cache", DEFAULT_CACHE_FOLDER)
    }
}

/// Self-persisting, broadcasting snapshot of one integration's data.
///
/// # Thread Safety
///
/// Reads take a shared lock for the duration of a clone or a marshal.
/// Updates are serialized, so `updated` never goes backwards and frames are
/// broadcast in the order updates were applied.
pub struct Cache<T: CacheData> {
    name: String,
    snapshot: RwLock<Snapshot<T>>,
    writer: Mutex<()>,
    storage: SnapshotFile,
    broadcaster: Broadcaster,
    marshal: Marshal<T>,
    counters: Counters,
}

impl<T: CacheData> Cache<T> {
    /// Opens a cache, restoring its persisted snapshot if there is one.
    ///
    /// A persisted snapshot always wins over `initial`. Without one, `initial`
    /// is applied as the first update when `apply_initial` is set (usually:
    /// the initial fetch succeeded); otherwise the cache starts from
    /// `T::default()`.
    #[instrument(skip(config, initial), fields(cache = %config.name))]
    pub async fn open(config: CacheConfig, initial: T, apply_initial: bool) -> Result<Self> {
        let storage = SnapshotFile::new(&config.root, &config.name);

        let restored = match storage.load::<T>().await {
            Ok(restored) => restored,
            Err(err @ LcpError::CorruptSnapshot { .. }) => match config.on_corrupt {
                CorruptSnapshotPolicy::Fail => return Err(err),
                CorruptSnapshotPolicy::Discard => {
                    warn!(error = %err, "Discarding corrupt snapshot, starting cold");
                    storage.discard().await?;
                    None
                }
            },
            Err(err) => return Err(err),
        };
        let found = restored.is_some();

        let cache = Self {
            name: config.name,
            snapshot: RwLock::new(restored.unwrap_or_default()),
            writer: Mutex::new(()),
            storage,
            broadcaster: Broadcaster::with_capacity(config.subscriber_capacity),
            marshal: json_marshal(),
            counters: Counters::default(),
        };

        if found {
            info!(updated = %cache.snapshot.read().updated, "Restored persisted snapshot");
        } else if apply_initial {
            cache.update(initial).await?;
        }

        Ok(cache)
    }

    /// Replaces the frame marshal function.
    pub fn with_marshal(mut self, marshal: Marshal<T>) -> Self {
        self.marshal = marshal;
        self
    }

    /// Logical name of the cache.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consistent copy of the current snapshot.
    pub fn read(&self) -> Snapshot<T> {
        self.snapshot.read().clone()
    }

    /// Current snapshot rendered by the marshal function.
    pub fn marshal(&self) -> Result<String> {
        let snapshot = self.snapshot.read();
        (self.marshal)(&*snapshot)
    }

    /// Applies `candidate` if it is a real, non-empty change.
    ///
    /// Returns `Ok(true)` when the snapshot was replaced. Persistence and
    /// broadcast failures are logged and do not undo the in-memory swap.
    pub async fn update(&self, candidate: T) -> Result<bool> {
        let _writer = self.writer.lock().await;

        let change = {
            let current = self.snapshot.read();
            change::detect(&current.data, &candidate)?
        };
        match change {
            Change::Unchanged => {
                debug!(cache = %self.name, "Fetched data unchanged");
                return Ok(false);
            }
            Change::Empty => {
                debug!(cache = %self.name, "Ignoring empty payload");
                return Ok(false);
            }
            Change::Changed => {}
        }

        let snapshot = {
            let mut current = self.snapshot.write();
            current.data = candidate;
            current.updated = Utc::now().max(current.updated);
            current.clone()
        };
        self.counters.updates.fetch_add(1, Ordering::Relaxed);

        if let Err(err) = self.storage.persist(&snapshot).await {
            error!(cache = %self.name, error = %err, "Failed to persist snapshot");
        }

        match (self.marshal)(&snapshot) {
            Ok(frame) => {
                let delivered = self.broadcaster.broadcast(frame);
                debug!(cache = %self.name, delivered, "Broadcast update");
            }
            Err(err) => error!(cache = %self.name, error = %err, "Failed to marshal broadcast frame"),
        }

        info!(cache = %self.name, "Cache updated");
        Ok(true)
    }

    /// Registers a live subscriber for future updates.
    pub fn subscribe(&self) -> Subscription {
        self.broadcaster.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.broadcaster.len()
    }

    /// Counts one served read or stream connection.
    pub fn record_request(&self) {
        self.counters.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            updates: self.counters.updates.load(Ordering::Relaxed),
            requests: self.counters.requests.load(Ordering::Relaxed),
            subscribers: self.broadcaster.len(),
        }
    }

    /// Persisted record backing this cache.
    pub fn storage(&self) -> &SnapshotFile {
        &self.storage
    }
}

impl<T: CacheData> StatsSource for Cache<T> {
    fn name(&self) -> &str {
        &self.name
    }

    fn stats(&self) -> CacheStats {
        Cache::stats(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lcp_core::models::{AppleMusicCache, AppleMusicPlaylist, AppleMusicSong};
    use tempfile::tempdir;

    fn games(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    async fn open(dir: &std::path::Path, initial: Vec<String>, apply: bool) -> Cache<Vec<String>> {
        Cache::open(CacheConfig::new("steam", dir), initial, apply)
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_restart_scenario() {
        let dir = tempdir().unwrap();

        let cache = open(dir.path(), games(&["gameA"]), true).await;
        let first = cache.read();
        assert_eq!(first.data, games(&["gameA"]));

        assert!(cache.update(games(&["gameA", "gameB"])).await.unwrap());
        let second = cache.read();
        assert_eq!(second.data, games(&["gameA", "gameB"]));
        assert!(second.updated > first.updated);
        drop(cache);

        let restarted = open(dir.path(), games(&["ignored"]), true).await;
        assert_eq!(restarted.read(), second);
    }

    #[tokio::test]
    async fn test_update_is_idempotent() {
        let dir = tempdir().unwrap();
        let cache = open(dir.path(), games(&["gameA"]), true).await;

        assert!(cache.update(games(&["gameB"])).await.unwrap());
        let after_first = cache.read();
        assert!(!cache.update(games(&["gameB"])).await.unwrap());
        assert_eq!(cache.read(), after_first);
    }

    #[tokio::test]
    async fn test_empty_update_never_replaces_data() {
        let dir = tempdir().unwrap();
        let cache = open(dir.path(), games(&["gameA"]), true).await;
        let before = cache.read();

        assert!(!cache.update(Vec::new()).await.unwrap());
        assert_eq!(cache.read(), before);
    }

    #[tokio::test]
    async fn test_initial_not_applied_without_flag() {
        let dir = tempdir().unwrap();
        let cache = open(dir.path(), games(&["gameA"]), false).await;

        assert!(cache.read().data.is_empty());
        assert!(!cache.storage().path().exists());
    }

    #[tokio::test]
    async fn test_updated_is_monotonic() {
        let dir = tempdir().unwrap();
        let cache = open(dir.path(), games(&["0"]), true).await;

        let mut last = cache.read().updated;
        for i in 1..20 {
            cache.update(games(&[&i.to_string()])).await.unwrap();
            let updated = cache.read().updated;
            assert!(updated >= last);
            last = updated;
        }
    }

    #[tokio::test]
    async fn test_update_broadcasts_to_all_subscribers_in_order() {
        let dir = tempdir().unwrap();
        let cache = open(dir.path(), games(&["gameA"]), true).await;
        let mut subs: Vec<_> = (0..3).map(|_| cache.subscribe()).collect();

        cache.update(games(&["gameB"])).await.unwrap();
        let first = cache.marshal().unwrap();
        cache.update(games(&["gameC"])).await.unwrap();
        let second = cache.marshal().unwrap();

        for sub in &mut subs {
            assert_eq!(sub.recv().await.as_deref(), Some(first.as_str()));
            assert_eq!(sub.recv().await.as_deref(), Some(second.as_str()));
            assert!(sub.try_recv().is_none());
        }
    }

    #[tokio::test]
    async fn test_noop_update_does_not_broadcast() {
        let dir = tempdir().unwrap();
        let cache = open(dir.path(), games(&["gameA"]), true).await;
        let mut sub = cache.subscribe();

        cache.update(games(&["gameA"])).await.unwrap();
        assert!(sub.try_recv().is_none());
    }

    #[tokio::test]
    async fn test_failed_persist_keeps_memory_authoritative() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("snapshots");
        let cache = open(&root, games(&["gameA"]), false).await;
        let mut sub = cache.subscribe();

        // A plain file where the snapshot folder should be makes every write fail.
        std::fs::write(&root, b"not a folder").unwrap();

        assert!(cache.update(games(&["a"])).await.unwrap());
        assert_eq!(cache.read().data, games(&["a"]));
        assert_eq!(sub.recv().await.as_deref(), Some(cache.marshal().unwrap().as_str()));
        assert!(!cache.storage().path().exists());
    }

    #[tokio::test]
    async fn test_stats_count_accepted_updates_and_requests() {
        let dir = tempdir().unwrap();
        let cache = open(dir.path(), games(&["gameA"]), true).await;

        cache.update(games(&["gameA"])).await.unwrap();
        cache.update(Vec::new()).await.unwrap();
        cache.update(games(&["gameB"])).await.unwrap();
        cache.record_request();
        let _sub = cache.subscribe();

        // The applied initial value counts as the first update.
        let stats = cache.stats();
        assert_eq!(stats.updates, 2);
        assert_eq!(stats.requests, 1);
        assert_eq!(stats.subscribers, 1);

        let erased: &dyn StatsSource = &cache;
        assert_eq!(erased.name(), "steam");
        assert_eq!(erased.stats(), stats);
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_fails_by_default() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("steam.json"), b"{\"data\": [").unwrap();

        let result = Cache::open(CacheConfig::new("steam", dir.path()), games(&["gameA"]), true).await;
        assert!(matches!(result, Err(LcpError::CorruptSnapshot { .. })));
    }

    #[tokio::test]
    async fn test_corrupt_snapshot_discarded_on_request() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("steam.json"), b"garbage").unwrap();

        let config = CacheConfig::new("steam", dir.path()).on_corrupt(CorruptSnapshotPolicy::Discard);
        let cache = Cache::open(config, games(&["gameA"]), true).await.unwrap();

        assert_eq!(cache.read().data, games(&["gameA"]));
        assert!(dir.path().join("steam.json.corrupt").exists());
        let persisted: Snapshot<Vec<String>> = cache.storage().load().await.unwrap().unwrap();
        assert_eq!(persisted, cache.read());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_readers_never_see_torn_snapshots() {
        let dir = tempdir().unwrap();
        let cache = Arc::new(
            Cache::open(CacheConfig::new("counter", dir.path()), vec![0u64; 64], true)
                .await
                .unwrap(),
        );

        let readers: Vec<_> = (0..4)
            .map(|_| {
                let cache = cache.clone();
                tokio::spawn(async move {
                    let mut last = cache.read();
                    for _ in 0..2_000 {
                        let snapshot = cache.read();
                        let first = snapshot.data[0];
                        assert!(snapshot.data.iter().all(|v| *v == first));
                        assert!(first >= last.data[0]);
                        assert!(snapshot.updated >= last.updated);
                        if first == last.data[0] {
                            assert_eq!(snapshot.updated, last.updated);
                        }
                        last = snapshot;
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for i in 1..50u64 {
            cache.update(vec![i; 64]).await.unwrap();
        }
        for reader in readers {
            reader.await.unwrap();
        }
    }

    #[tokio::test]
    async fn test_custom_marshal_reshapes_frames() {
        let dir = tempdir().unwrap();
        let song = AppleMusicSong {
            track: "So What".into(),
            id: "1".into(),
            ..Default::default()
        };
        let initial = AppleMusicCache {
            recently_played: vec![song.clone()],
            playlists: vec![AppleMusicPlaylist {
                name: "jazz".into(),
                tracks: vec![song; 6],
                last_modified: Utc::now(),
                url: "https://music.apple.com/jazz".into(),
                id: "p.jazz".into(),
            }],
        };

        let cache = Cache::open(CacheConfig::new("applemusic", dir.path()), initial, true)
            .await
            .unwrap()
            .with_marshal(marshal_with(AppleMusicCache::summarize));

        let frame: serde_json::Value = serde_json::from_str(&cache.marshal().unwrap()).unwrap();
        let summary = &frame["data"]["playlist_summaries"][0];
        assert_eq!(summary["track_count"], 6);
        assert_eq!(summary["first_four_tracks"].as_array().unwrap().len(), 4);
        assert!(frame["updated"].is_string());
    }
}
