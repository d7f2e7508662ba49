//! Point-in-time view of a cache.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A cached value and the moment it last *changed*.
///
/// `updated` is not a poll timestamp: refreshes that fetch identical data
/// leave it untouched, so clients can use it as a staleness signal.
///
/// The serialized form is shared by the read endpoint, the stream frames, and
/// the persisted file:
///
/// ```json
/// {"data": ..., "updated": "2024-05-01T12:00:00.123456789Z"}
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot<T> {
    /// Cached payload
    pub data: T,
    /// Time of the last real change (RFC 3339 on the wire)
    pub updated: DateTime<Utc>,
}

impl<T> Snapshot<T> {
    /// Creates a snapshot stamped with the current time.
    pub fn new(data: T) -> Self {
        Self::at(data, Utc::now())
    }

    /// Creates a snapshot with an explicit timestamp.
    pub fn at(data: T, updated: DateTime<Utc>) -> Self {
        Self { data, updated }
    }

    /// Maps the payload, keeping the timestamp.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Snapshot<U> {
        Snapshot {
            data: f(self.data),
            updated: self.updated,
        }
    }

    /// Borrowing view of the snapshot, for serializing without cloning `data`.
    pub fn borrowed(&self) -> Snapshot<&T> {
        Snapshot {
            data: &self.data,
            updated: self.updated,
        }
    }
}

impl<T: Default> Default for Snapshot<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
