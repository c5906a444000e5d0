//! Bounded-size eviction by recency.

use std::sync::RwLock;

use crate::cache::key::CacheKey;
use crate::cache::{Cache, CachedValue};

/// Evicts the least-recently-used entry once a capacity is exceeded.
///
/// Recency is tracked in an ordered key list; `get` and `put` both count as
/// use. Eviction removes the entry from the delegate as well.
pub struct LruCache {
    delegate: Box<dyn Cache>,
    capacity: usize,
    // Most recently used at the back.
    order: RwLock<Vec<CacheKey>>,
}

impl LruCache {
    /// Wrap a delegate with the default capacity of 1024 entries.
    #[must_use]
    pub fn new(delegate: Box<dyn Cache>) -> Self {
        Self::with_capacity(delegate, 1024)
    }

    /// Wrap a delegate with an explicit capacity.
    #[must_use]
    pub fn with_capacity(delegate: Box<dyn Cache>, capacity: usize) -> Self {
        Self { delegate, capacity, order: RwLock::new(Vec::new()) }
    }

    /// Record a use of `key` and return the key evicted by it, if any.
    fn touch(&self, key: &CacheKey) -> Option<CacheKey> {
        let mut order = self.order.write().ok()?;
        if let Some(pos) = order.iter().position(|k| k == key) {
            let existing = order.remove(pos);
            order.push(existing);
            return None;
        }
        order.push(key.clone());
        if order.len() > self.capacity {
            return Some(order.remove(0));
        }
        None
    }
}

impl Cache for LruCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CachedValue) {
        let evicted = self.touch(&key);
        self.delegate.put(key, value);
        if let Some(oldest) = evicted {
            self.delegate.remove(&oldest);
        }
    }

    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let hit = self.delegate.get(key)?;
        self.touch(key);
        Some(hit)
    }

    fn remove(&self, key: &CacheKey) {
        if let Ok(mut order) = self.order.write() {
            if let Some(pos) = order.iter().position(|k| k == key) {
                order.remove(pos);
            }
        }
        self.delegate.remove(key);
    }

    fn clear(&self) {
        if let Ok(mut order) = self.order.write() {
            order.clear();
        }
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }
}
