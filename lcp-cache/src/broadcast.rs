//! Fan-out of serialized snapshots to live subscribers.
//!
//! Every subscriber gets a small bounded channel. Broadcasting never waits:
//! a subscriber whose buffer is full is considered unresponsive and removed,
//! which closes its channel and ends its stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, warn};

use lcp_core::constants::DEFAULT_SUBSCRIBER_CAPACITY;

/// One serialized update, shared by every subscriber it is delivered to.
pub type Frame = Arc<str>;

struct Registry {
    subscribers: DashMap<u64, mpsc::Sender<Frame>>,
    next_id: AtomicU64,
    capacity: usize,
}

/// Registry of live subscribers.
///
/// Cloning is cheap; clones share the same subscriber map.
#[derive(Clone)]
pub struct Broadcaster {
    registry: Arc<Registry>,
}

impl Broadcaster {
    /// Creates a registry with the default per-subscriber capacity.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_SUBSCRIBER_CAPACITY)
    }

    /// Creates a registry buffering `capacity` frames per subscriber.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            registry: Arc::new(Registry {
                subscribers: DashMap::new(),
                next_id: AtomicU64::new(1),
                capacity: capacity.max(1),
            }),
        }
    }

    /// Registers a new subscriber.
    ///
    /// The subscriber is removed when the returned handle is dropped.
    pub fn subscribe(&self) -> Subscription {
        let (tx, rx) = mpsc::channel(self.registry.capacity);
        let id = self.registry.next_id.fetch_add(1, Ordering::Relaxed);
        self.registry.subscribers.insert(id, tx);
        debug!(subscriber = id, "Subscriber registered");

        Subscription {
            id,
            receiver: rx,
            broadcaster: self.clone(),
        }
    }

    /// Removes a subscriber and closes its channel.
    ///
    /// Returns false if it was already gone.
    pub fn unsubscribe(&self, id: u64) -> bool {
        let removed = self.registry.subscribers.remove(&id).is_some();
        if removed {
            debug!(subscriber = id, "Subscriber removed");
        }
        removed
    }

    /// Offers `frame` to every subscriber without blocking.
    ///
    /// Returns how many subscribers accepted it.
    pub fn broadcast(&self, frame: impl Into<Frame>) -> usize {
        let frame = frame.into();
        let mut delivered = 0;

        self.registry.subscribers.retain(|id, tx| match tx.try_send(frame.clone()) {
            Ok(()) => {
                delivered += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                warn!(subscriber = *id, "Dropping unresponsive subscriber");
                false
            }
            Err(TrySendError::Closed(_)) => false,
        });

        delivered
    }

    /// Number of registered subscribers.
    pub fn len(&self) -> usize {
        self.registry.subscribers.len()
    }

    /// Returns true if nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.registry.subscribers.is_empty()
    }
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiving side of one subscriber.
pub struct Subscription {
    id: u64,
    receiver: mpsc::Receiver<Frame>,
    broadcaster: Broadcaster,
}

impl Subscription {
    /// Registry id of this subscriber.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next frame.
    ///
    /// Returns `None` once the subscriber has been removed and its buffer drained.
    pub async fn recv(&mut self) -> Option<Frame> {
        self.receiver.recv().await
    }

    /// Takes a buffered frame without waiting.
    pub fn try_recv(&mut self) -> Option<Frame> {
        self.receiver.try_recv().ok()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.broadcaster.unsubscribe(self.id);
    }
}
