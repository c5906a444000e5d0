//! Cache decorators.
//!
//! Each decorator wraps a delegate implementing the same [`Cache`](super::Cache)
//! contract and adds one behavior. Composition order matters: the blocking
//! layer is applied outermost so that concurrent misses for an evicted key
//! still synchronize correctly.

mod blocking;
mod lru;
mod scheduled;
mod weak;

pub use blocking::BlockingCache;
pub use lru::LruCache;
pub use scheduled::ScheduledCache;
pub use weak::WeakCache;
