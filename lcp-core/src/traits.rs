//! Capability bounds for cached payloads.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Anything that can live in a cache.
///
/// The bound is what the cache needs and nothing more: a canonical serialized
/// form for change detection and persistence, a way back from disk, and a
/// fallback value for a cold start with nothing to apply. New integrations get
/// it for free through the blanket impl.
pub trait CacheData: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {}

impl<T> CacheData for T where T: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {}

/// Classifies a fetch error as expected (transient, known in advance) or not.
pub type ErrorClassifier = fn(&crate::LcpError) -> bool;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SteamGame;

    fn assert_cache_data<T: CacheData>() {}

    #[test]
    fn test_payloads_are_cache_data() {
        assert_cache_data::<Vec<SteamGame>>();
        assert_cache_data::<Vec<String>>();
        assert_cache_data::<serde_json::Value>();
    }
}
