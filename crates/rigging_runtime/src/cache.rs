//! Write-once value cache keyed by capability.

use rigging_core::{CapabilityKey, Resource};
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Produced values, keyed by the capability they satisfy.
///
/// Each key is written at most once per run, by its sole producer; later
/// nodes in the construction order read their inputs from here.
#[derive(Default)]
pub struct ValueCache {
    values: HashMap<CapabilityKey, Arc<dyn Any + Send + Sync>>,
}

impl ValueCache {
    pub(crate) fn new() -> Self {
        Self {
            values: HashMap::new(),
        }
    }

    /// The cached value for `T`, if its producer has run.
    #[must_use]
    pub fn get<T: Resource>(&self) -> Option<Arc<T>> {
        self.values
            .get(&CapabilityKey::of::<T>())
            .cloned()
            .and_then(|value| value.downcast::<T>().ok())
    }

    /// Whether a value for `key` has been produced.
    #[must_use]
    pub fn contains(&self, key: CapabilityKey) -> bool {
        self.values.contains_key(&key)
    }

    /// Number of produced values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been produced yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn insert(&mut self, key: CapabilityKey, value: Arc<dyn Any + Send + Sync>) {
        self.values.insert(key, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Config {
        port: u16,
    }

    impl Resource for Config {}

    struct Server;

    impl Resource for Server {}

    #[test]
    fn test_get_returns_inserted_value() {
        let mut cache = ValueCache::new();
        cache.insert(CapabilityKey::of::<Config>(), Arc::new(Config { port: 8080 }));

        let config = cache.get::<Config>().expect("cached value");
        assert_eq!(config.port, 8080);
        assert!(cache.contains(CapabilityKey::of::<Config>()));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_get_misses_absent_key() {
        let cache = ValueCache::new();
        assert!(cache.get::<Server>().is_none());
        assert!(cache.is_empty());
    }
}
