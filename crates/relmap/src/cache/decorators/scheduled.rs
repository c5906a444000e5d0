//! Interval-based whole-cache invalidation.

use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::cache::key::CacheKey;
use crate::cache::{Cache, CachedValue};

/// Clears the whole cache once a flush interval has elapsed.
///
/// There is no background task; the elapsed check runs on every cache
/// operation, so the flush happens lazily on first access after the
/// interval.
pub struct ScheduledCache {
    delegate: Box<dyn Cache>,
    interval: Duration,
    last_flush: RwLock<Instant>,
}

impl ScheduledCache {
    /// Default flush interval of one hour.
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(3600);

    /// Wrap a delegate with the given flush interval.
    #[must_use]
    pub fn new(delegate: Box<dyn Cache>, interval: Duration) -> Self {
        Self { delegate, interval, last_flush: RwLock::new(Instant::now()) }
    }

    fn flush_if_due(&self) {
        let due = self
            .last_flush
            .read()
            .map(|last| last.elapsed() >= self.interval)
            .unwrap_or(false);
        if due {
            self.clear();
        }
    }
}

impl Cache for ScheduledCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CachedValue) {
        self.flush_if_due();
        self.delegate.put(key, value);
    }

    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        self.flush_if_due();
        self.delegate.get(key)
    }

    fn remove(&self, key: &CacheKey) {
        self.flush_if_due();
        self.delegate.remove(key);
    }

    fn clear(&self) {
        if let Ok(mut last) = self.last_flush.write() {
            *last = Instant::now();
        }
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.flush_if_due();
        self.delegate.size()
    }
}
