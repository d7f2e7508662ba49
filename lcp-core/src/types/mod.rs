//! Domain types for LCP.
//!
//! - [`Snapshot`]: cached value plus the time it last changed

mod snapshot;

pub use snapshot::*;
