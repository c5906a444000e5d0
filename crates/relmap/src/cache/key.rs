//! Composite cache keys.

use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};

use relmap_core::Value;

/// Hash-combining multiplier for incremental updates.
const MULTIPLIER: u64 = 37;

/// An ordered, hash-combined composite identity for a cached result.
///
/// Built incrementally by the executor from the statement id, row window,
/// SQL text, parameter values, and environment id. Two keys are equal iff
/// all components are equal in order; the running hash and checksum make
/// inequality cheap to detect before the component lists are compared.
#[derive(Debug, Clone, Default)]
pub struct CacheKey {
    hashcode: u64,
    checksum: u64,
    parts: Vec<Value>,
}

impl CacheKey {
    /// Create an empty key.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one component into the key.
    pub fn update(&mut self, part: Value) {
        let base = base_hash(&part);
        self.checksum = self.checksum.wrapping_add(base);
        self.hashcode = self.hashcode.wrapping_mul(MULTIPLIER).wrapping_add(base);
        self.parts.push(part);
    }

    /// Fold a sequence of components into the key, in order.
    pub fn update_all<I: IntoIterator<Item = Value>>(&mut self, parts: I) {
        for part in parts {
            self.update(part);
        }
    }

    /// Number of components folded in so far.
    #[must_use]
    pub fn component_count(&self) -> usize {
        self.parts.len()
    }
}

fn base_hash(part: &Value) -> u64 {
    // DefaultHasher::new() is deterministically seeded, so keys built in
    // different sessions from equal components hash identically.
    let mut hasher = DefaultHasher::new();
    part.hash(&mut hasher);
    hasher.finish()
}

impl PartialEq for CacheKey {
    fn eq(&self, other: &Self) -> bool {
        self.hashcode == other.hashcode
            && self.checksum == other.checksum
            && self.parts == other.parts
    }
}

impl Eq for CacheKey {}

impl Hash for CacheKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.hashcode.hash(state);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.hashcode, self.checksum)?;
        for part in &self.parts {
            write!(f, ":{part}")?;
        }
        Ok(())
    }
}
