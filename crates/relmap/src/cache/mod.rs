//! Result caching.
//!
//! The cache is a chain of decorators over a plain map:
//!
//! - [`PerpetualCache`] - the core store, no eviction of its own
//! - [`decorators::LruCache`] - bounded entry count
//! - [`decorators::WeakCache`] - reclaimable retention
//! - [`decorators::ScheduledCache`] - whole-cache invalidation on an interval
//! - [`decorators::BlockingCache`] - single-flight misses per key
//!
//! Each layer implements the same [`Cache`] contract and delegates inward.
//! [`CacheBuilder`] assembles a chain in the fixed order core → eviction →
//! scheduled → blocking, so the blocking layer always observes eviction.
//!
//! `get` and `put` never fail; misconfiguration is a build-time error.

use std::sync::{Arc, Weak};
use std::time::Duration;

use relmap_core::Value;

use crate::error::{Error, Result};

pub mod decorators;
pub mod key;
pub mod perpetual;

pub use decorators::{BlockingCache, LruCache, ScheduledCache, WeakCache};
pub use key::CacheKey;
pub use perpetual::PerpetualCache;

/// A materialized result list, as stored in a cache.
pub type RowList = Vec<Value>;

/// A cached slot.
#[derive(Debug, Clone)]
pub enum CachedValue {
    /// A live, strongly-held result list.
    Strong(Arc<RowList>),
    /// A result list the runtime may reclaim once no caller holds it.
    Weak(Weak<RowList>),
    /// A placeholder marking an execution in progress.
    Pending,
}

impl CachedValue {
    /// Wrap a result list as a strongly-held value.
    #[must_use]
    pub fn strong(rows: RowList) -> Self {
        Self::Strong(Arc::new(rows))
    }

    /// Resolve to the live result list, if it still exists.
    ///
    /// `Pending` placeholders and reclaimed weak slots resolve to `None`.
    #[must_use]
    pub fn resolve(&self) -> Option<Arc<RowList>> {
        match self {
            Self::Strong(rows) => Some(Arc::clone(rows)),
            Self::Weak(weak) => weak.upgrade(),
            Self::Pending => None,
        }
    }

    /// Returns `true` if this slot is an execution placeholder.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }
}

/// The cache contract shared by the core store and every decorator.
///
/// Implementations are shared across sessions within a namespace and must
/// tolerate concurrent calls; all methods take `&self`.
pub trait Cache: Send + Sync {
    /// The namespace-scoped cache id.
    fn id(&self) -> &str;

    /// Store a value, overwriting any existing entry.
    fn put(&self, key: CacheKey, value: CachedValue);

    /// Fetch a previously stored value, or `None`.
    fn get(&self, key: &CacheKey) -> Option<CachedValue>;

    /// Remove one entry.
    fn remove(&self, key: &CacheKey);

    /// Remove every entry.
    fn clear(&self);

    /// Number of entries currently held.
    fn size(&self) -> usize;
}

/// The eviction layer of a cache chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Eviction {
    /// Bounded entry count, least-recently-used out first.
    Lru {
        /// Maximum number of entries.
        capacity: usize,
    },
    /// Reclaimable retention with a bounded protected subset.
    Weak {
        /// Capacity of the hard-retention queue for recently read values.
        protected: usize,
    },
}

impl Eviction {
    /// LRU eviction with the default capacity of 1024 entries.
    #[must_use]
    pub const fn lru() -> Self {
        Self::Lru { capacity: 1024 }
    }

    /// Weak retention with the default protected capacity of 256 values.
    #[must_use]
    pub const fn weak() -> Self {
        Self::Weak { protected: 256 }
    }
}

/// Assembles a cache decorator chain for one namespace.
///
/// ```
/// use std::time::Duration;
/// use relmap::cache::{Cache, CacheBuilder, Eviction};
///
/// let cache = CacheBuilder::new("com.example.UserMapper")
///     .eviction(Eviction::lru())
///     .flush_interval(Duration::from_secs(3600))
///     .blocking(true)
///     .build()
///     .unwrap();
/// assert_eq!(cache.id(), "com.example.UserMapper");
/// ```
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    id: String,
    eviction: Option<Eviction>,
    flush_interval: Option<Duration>,
    blocking: bool,
    blocking_timeout: Option<Duration>,
}

impl CacheBuilder {
    /// Start a builder for the given namespace id.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            eviction: None,
            flush_interval: None,
            blocking: false,
            blocking_timeout: None,
        }
    }

    /// Set the eviction layer.
    #[must_use]
    pub const fn eviction(mut self, eviction: Eviction) -> Self {
        self.eviction = Some(eviction);
        self
    }

    /// Invalidate the whole cache after the given interval.
    #[must_use]
    pub const fn flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = Some(interval);
        self
    }

    /// Serialize concurrent misses for the same key.
    #[must_use]
    pub const fn blocking(mut self, blocking: bool) -> Self {
        self.blocking = blocking;
        self
    }

    /// Give up waiting on a concurrent miss after the given duration.
    #[must_use]
    pub const fn blocking_timeout(mut self, timeout: Duration) -> Self {
        self.blocking_timeout = Some(timeout);
        self
    }

    /// Assemble the chain.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for a zero eviction capacity or a zero
    /// flush interval.
    pub fn build(self) -> Result<Box<dyn Cache>> {
        let mut cache: Box<dyn Cache> = Box::new(PerpetualCache::new(self.id.clone()));

        match self.eviction {
            Some(Eviction::Lru { capacity }) => {
                if capacity == 0 {
                    return Err(Error::config(format!(
                        "cache '{}': LRU capacity must be positive",
                        self.id
                    )));
                }
                cache = Box::new(LruCache::with_capacity(cache, capacity));
            }
            Some(Eviction::Weak { protected }) => {
                if protected == 0 {
                    return Err(Error::config(format!(
                        "cache '{}': protected capacity must be positive",
                        self.id
                    )));
                }
                cache = Box::new(WeakCache::with_protected_capacity(cache, protected));
            }
            None => {}
        }

        if let Some(interval) = self.flush_interval {
            if interval.is_zero() {
                return Err(Error::config(format!(
                    "cache '{}': flush interval must be positive",
                    self.id
                )));
            }
            cache = Box::new(ScheduledCache::new(cache, interval));
        }

        if self.blocking {
            cache = Box::new(BlockingCache::new(cache, self.blocking_timeout));
        }

        Ok(cache)
    }
}
