//! Periodic refresh of a cache from its upstream fetch function.
//!
//! One background task per cache: wait `interval`, fetch, apply, repeat.
//! Fetch failures never stop the loop and never touch the cache; a stale
//! snapshot is preferred over no snapshot.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use lcp_core::constants::DEFAULT_REFRESH_INTERVAL;
use lcp_core::error::{LcpError, Result};
use lcp_core::traits::{CacheData, ErrorClassifier};

use crate::cache::Cache;

/// Scheduler configuration.
#[derive(Clone, Copy, Debug)]
pub struct RefreshConfig {
    /// Wait between two fetches
    pub interval: Duration,
    /// Which fetch errors are expected and only worth a warning
    pub is_expected: ErrorClassifier,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self::every(DEFAULT_REFRESH_INTERVAL)
    }
}

impl RefreshConfig {
    /// Refresh every `interval`, using the default error classification.
    pub fn every(interval: Duration) -> Self {
        Self {
            interval,
            is_expected: LcpError::is_expected,
        }
    }

    /// Overrides the expected-error classifier.
    pub fn expected_errors(mut self, is_expected: ErrorClassifier) -> Self {
        self.is_expected = is_expected;
        self
    }
}

/// Result of one refresh cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Fetched data replaced the snapshot.
    Updated,
    /// Fetched data was identical or empty.
    Unchanged,
    /// Fetch failed with an expected error.
    Skipped,
    /// Fetch or apply failed unexpectedly.
    Failed,
    /// The fetch function panicked.
    Panicked,
}

/// Runs one fetch-and-apply cycle.
///
/// The fetch runs in its own task so that a panic inside it is contained
/// and reported as [`RefreshOutcome::Panicked`].
pub async fn refresh_once<T, C, F, Fut>(
    cache: &Cache<T>,
    client: C,
    fetch: Arc<F>,
    is_expected: ErrorClassifier,
) -> RefreshOutcome
where
    T: CacheData,
    C: Send + 'static,
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let fetched = match tokio::spawn(async move { fetch(client).await }).await {
        Ok(fetched) => fetched,
        Err(err) => {
            error!(cache = %cache.name(), error = %err, "Fetch task panicked");
            return RefreshOutcome::Panicked;
        }
    };

    match fetched {
        Ok(data) => match cache.update(data).await {
            Ok(true) => RefreshOutcome::Updated,
            Ok(false) => RefreshOutcome::Unchanged,
            Err(err) => {
                error!(cache = %cache.name(), error = %err, "Applying fetched data failed");
                RefreshOutcome::Failed
            }
        },
        Err(err) if is_expected(&err) => {
            warn!(cache = %cache.name(), error = %err, "Refresh skipped");
            RefreshOutcome::Skipped
        }
        Err(err) => {
            error!(cache = %cache.name(), error = %err, "Refresh failed");
            RefreshOutcome::Failed
        }
    }
}

/// Handle to a running refresh loop.
///
/// Dropping the handle also ends the loop at its next wait.
pub struct RefreshHandle {
    name: String,
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl RefreshHandle {
    /// Name of the cache being refreshed.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true once the loop has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Interrupts the wait and waits for the loop to exit.
    ///
    /// A fetch already in flight is allowed to finish and be applied.
    pub async fn stop(self) -> Result<()> {
        let _ = self.cancel_tx.send(());
        self.join
            .await
            .map_err(|e| LcpError::Internal(format!("refresh loop for {} failed: {e}", self.name)))
    }
}

/// Spawns the refresh loop for `cache`.
///
/// The first fetch happens one `interval` after spawning; the initial
/// snapshot is expected to come from [`Cache::open`].
pub fn spawn_refresh<T, C, F, Fut>(
    cache: Arc<Cache<T>>,
    client: C,
    fetch: F,
    config: RefreshConfig,
) -> RefreshHandle
where
    T: CacheData,
    C: Clone + Send + Sync + 'static,
    F: Fn(C) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let name = cache.name().to_string();
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let fetch = Arc::new(fetch);

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + config.interval, config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    info!(cache = %cache.name(), "Refresh loop stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let outcome = refresh_once(&cache, client.clone(), fetch.clone(), config.is_expected).await;
                    debug!(cache = %cache.name(), ?outcome, "Refresh cycle finished");
                }
            }
        }
    });

    RefreshHandle {
        name,
        cancel_tx,
        join,
    }
}
