//! The core cache store.

use std::collections::HashMap;
use std::sync::RwLock;

use super::key::CacheKey;
use super::{Cache, CachedValue};

/// A plain map-backed cache with no eviction policy of its own.
///
/// Every decorator chain bottoms out here. Also used directly as the
/// executor's session-local first-level cache.
pub struct PerpetualCache {
    id: String,
    entries: RwLock<HashMap<CacheKey, CachedValue>>,
}

impl PerpetualCache {
    /// Create an empty cache with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into(), entries: RwLock::new(HashMap::new()) }
    }
}

impl Cache for PerpetualCache {
    fn id(&self) -> &str {
        &self.id
    }

    fn put(&self, key: CacheKey, value: CachedValue) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert(key, value);
        }
    }

    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        self.entries.read().ok()?.get(key).cloned()
    }

    fn remove(&self, key: &CacheKey) {
        if let Ok(mut entries) = self.entries.write() {
            entries.remove(key);
        }
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    fn size(&self) -> usize {
        self.entries.read().map(|entries| entries.len()).unwrap_or(0)
    }
}
