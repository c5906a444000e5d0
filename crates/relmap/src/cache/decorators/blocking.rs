//! Single-flight misses.

use std::collections::HashSet;
use std::sync::{Condvar, Mutex};
use std::time::Duration;

use tracing::warn;

use crate::cache::key::CacheKey;
use crate::cache::{Cache, CachedValue};

/// Serializes concurrent misses for the same key.
///
/// A `get` that misses keeps a per-key latch held; the caller is expected to
/// execute the query and `put` the result, which releases the latch. Other
/// callers asking for the same key block until then. Hits and distinct keys
/// never block each other; the cache as a whole is never locked across a
/// miss.
pub struct BlockingCache {
    delegate: Box<dyn Cache>,
    latched: Mutex<HashSet<CacheKey>>,
    released: Condvar,
    timeout: Option<Duration>,
}

impl BlockingCache {
    /// Wrap a delegate, with an optional wait timeout.
    #[must_use]
    pub fn new(delegate: Box<dyn Cache>, timeout: Option<Duration>) -> Self {
        Self {
            delegate,
            latched: Mutex::new(HashSet::new()),
            released: Condvar::new(),
            timeout,
        }
    }

    /// Wait until no other caller holds the latch for `key`, then take it.
    ///
    /// Returns `false` if the wait timed out; caches never fail a `get`, so
    /// the caller proceeds without the latch.
    fn acquire(&self, key: &CacheKey) -> bool {
        let Ok(mut latched) = self.latched.lock() else {
            return false;
        };
        match self.timeout {
            Some(timeout) => {
                while latched.contains(key) {
                    let Ok((guard, result)) = self.released.wait_timeout(latched, timeout) else {
                        return false;
                    };
                    latched = guard;
                    if result.timed_out() && latched.contains(key) {
                        warn!(cache = self.delegate.id(), %key, "timed out waiting on cache latch");
                        return false;
                    }
                }
            }
            None => {
                while latched.contains(key) {
                    let Ok(guard) = self.released.wait(latched) else {
                        return false;
                    };
                    latched = guard;
                }
            }
        }
        latched.insert(key.clone());
        true
    }

    fn release(&self, key: &CacheKey) {
        if let Ok(mut latched) = self.latched.lock() {
            latched.remove(key);
        }
        self.released.notify_all();
    }
}

impl Cache for BlockingCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CachedValue) {
        self.delegate.put(key.clone(), value);
        self.release(&key);
    }

    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let latched = self.acquire(key);
        let hit = self.delegate.get(key);
        // A miss keeps the latch held until the caller puts the result.
        if hit.is_some() && latched {
            self.release(key);
        }
        hit
    }

    fn remove(&self, key: &CacheKey) {
        // Mirrors put on the failure path: the executing caller releases its
        // latch without storing a value.
        self.release(key);
    }

    fn clear(&self) {
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }
}
