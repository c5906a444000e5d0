//! Reclaimable retention.

use std::collections::VecDeque;
use std::sync::{Arc, RwLock, Weak};

use crate::cache::key::CacheKey;
use crate::cache::{Cache, CachedValue, RowList};

/// Holds values weakly so the runtime can reclaim them once no caller does.
///
/// Entries are stored in the delegate as weak slots plus a key-bearing
/// tracking token. Tokens whose value has been reclaimed are purged from
/// the delegate opportunistically on `put`, `clear`, and `size`; a reclaimed
/// slot observed by `get` is purged immediately. A fixed-capacity queue of
/// recently read values keeps hot entries strongly held so repeated reads do
/// not see them reclaimed between accesses. The queue capacity bounds only
/// this protected subset, not the cache as a whole.
pub struct WeakCache {
    delegate: Box<dyn Cache>,
    protected_capacity: usize,
    state: RwLock<WeakState>,
}

#[derive(Default)]
struct WeakState {
    // One token per weak entry stored in the delegate.
    tracking: Vec<(CacheKey, Weak<RowList>)>,
    // Most recently read at the front.
    protected: VecDeque<Arc<RowList>>,
}

impl WeakCache {
    /// Wrap a delegate with the default protected capacity of 256 values.
    #[must_use]
    pub fn new(delegate: Box<dyn Cache>) -> Self {
        Self::with_protected_capacity(delegate, 256)
    }

    /// Wrap a delegate with an explicit protected capacity.
    #[must_use]
    pub fn with_protected_capacity(delegate: Box<dyn Cache>, protected_capacity: usize) -> Self {
        Self { delegate, protected_capacity, state: RwLock::new(WeakState::default()) }
    }

    /// Drop every token whose value has been reclaimed, removing the entry
    /// from the delegate as well.
    fn purge_reclaimed(&self) {
        let Ok(mut state) = self.state.write() else {
            return;
        };
        let mut dead = Vec::new();
        state.tracking.retain(|(key, weak)| {
            if weak.strong_count() == 0 {
                dead.push(key.clone());
                false
            } else {
                true
            }
        });
        drop(state);
        for key in dead {
            self.delegate.remove(&key);
        }
    }

    fn protect(&self, rows: &Arc<RowList>) {
        if let Ok(mut state) = self.state.write() {
            state.protected.push_front(Arc::clone(rows));
            while state.protected.len() > self.protected_capacity {
                state.protected.pop_back();
            }
        }
    }
}

impl Cache for WeakCache {
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put(&self, key: CacheKey, value: CachedValue) {
        self.purge_reclaimed();
        // The caller's Arc governs liveness from here on.
        let stored = match value {
            CachedValue::Strong(rows) => CachedValue::Weak(Arc::downgrade(&rows)),
            other => other,
        };
        if let CachedValue::Weak(ref weak) = stored {
            if let Ok(mut state) = self.state.write() {
                state.tracking.retain(|(tracked, _)| tracked != &key);
                state.tracking.push((key.clone(), weak.clone()));
            }
        }
        self.delegate.put(key, stored);
    }

    fn get(&self, key: &CacheKey) -> Option<CachedValue> {
        let slot = self.delegate.get(key)?;
        match slot.resolve() {
            Some(rows) => {
                self.protect(&rows);
                Some(CachedValue::Strong(rows))
            }
            None => {
                self.delegate.remove(key);
                None
            }
        }
    }

    fn remove(&self, key: &CacheKey) {
        if let Ok(mut state) = self.state.write() {
            state.tracking.retain(|(tracked, _)| tracked != key);
        }
        self.delegate.remove(key);
    }

    fn clear(&self) {
        if let Ok(mut state) = self.state.write() {
            state.tracking.clear();
            state.protected.clear();
        }
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.purge_reclaimed();
        self.delegate.size()
    }
}
