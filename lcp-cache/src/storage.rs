//! File-based snapshot persistence.
//!
//! Each cache owns one file, `<cache_root>/<name>.json`, holding the same
//! `{data, updated}` document the read endpoint serves. Writes go to a
//! sibling temp file first and are renamed into place, so a crash mid-write
//! leaves the previous snapshot intact.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, instrument, warn};

use lcp_core::constants::SNAPSHOT_EXTENSION;
use lcp_core::error::{LcpError, Result};
use lcp_core::types::Snapshot;

/// What to do when a persisted snapshot exists but cannot be decoded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CorruptSnapshotPolicy {
    /// Refuse to open the cache.
    #[default]
    Fail,
    /// Move the file aside and start cold.
    Discard,
}

/// Persisted record of one cache.
#[derive(Clone, Debug)]
pub struct SnapshotFile {
    /// Path to the snapshot file
    path: PathBuf,
}

impl SnapshotFile {
    /// Snapshot file for cache `name` under `root`.
    pub fn new(root: impl AsRef<Path>, name: &str) -> Self {
        Self {
            path: root
                .as_ref()
                .join(format!("{name}.{SNAPSHOT_EXTENSION}")),
        }
    }

    /// Returns the file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        self.path.with_extension(format!("{SNAPSHOT_EXTENSION}.tmp"))
    }

    fn corrupt_path(&self) -> PathBuf {
        self.path.with_extension(format!("{SNAPSHOT_EXTENSION}.corrupt"))
    }

    /// Writes `snapshot`, replacing any previous file.
    pub async fn persist<T: Serialize>(&self, snapshot: &Snapshot<T>) -> Result<()> {
        let serialized = serde_json::to_vec(snapshot)?;
        self.write(&serialized).await
    }

    /// Writes an already-encoded snapshot document.
    #[instrument(skip(self, serialized), fields(path = %self.path.display()))]
    async fn write(&self, serialized: &[u8]) -> Result<()> {
        if let Some(folder) = self.path.parent() {
            fs::create_dir_all(folder).await?;
        }

        let temp_path = self.temp_path();
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(serialized).await?;
        file.sync_all().await?;
        drop(file);

        fs::rename(&temp_path, &self.path).await?;

        debug!(bytes = serialized.len(), "Snapshot persisted");
        Ok(())
    }

    /// Reads the persisted snapshot.
    ///
    /// Returns `Ok(None)` when no file exists, which is normal on first boot.
    /// A file that exists but does not decode is [`LcpError::CorruptSnapshot`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load<T: DeserializeOwned>(&self) -> Result<Option<Snapshot<T>>> {
        let contents = match fs::read(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let snapshot = serde_json::from_slice(&contents).map_err(|e| LcpError::CorruptSnapshot {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        })?;

        debug!(bytes = contents.len(), "Snapshot loaded");
        Ok(Some(snapshot))
    }

    /// Moves an undecodable file aside so the next persist starts clean.
    ///
    /// Returns where the file went.
    pub async fn discard(&self) -> Result<PathBuf> {
        let target = self.corrupt_path();
        fs::rename(&self.path, &target).await?;
        warn!(from = %self.path.display(), to = %target.display(), "Moved corrupt snapshot aside");
        Ok(target)
    }
}
