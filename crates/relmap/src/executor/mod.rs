//! Statement execution.
//!
//! The [`Executor`] trait is the top-level orchestrator: it turns a mapped
//! statement and parameter into a cache key, consults the namespace and
//! session-local caches, and drives the statement handler and key generator
//! on a miss. [`SimpleExecutor`] runs one physical statement per call;
//! [`BatchExecutor`] defers updates into driver batches.
//!
//! The shared orchestration (caching, deferred loads, commit/rollback
//! discipline) lives in a blanket implementation over the crate-private
//! [`ExecutorOps`] trait; concrete executors only supply the `do_*` physical
//! operations.

use std::collections::VecDeque;
use std::sync::{Arc, MutexGuard};

use relmap_core::Value;
use relmap_driver::{SharedTransaction, Transaction};
use tracing::debug;

use crate::cache::{Cache, CacheKey, CachedValue, PerpetualCache};
use crate::config::Configuration;
use crate::cursor::DefaultCursor;
use crate::error::{Error, Result};
use crate::mapping::MappedStatement;
use crate::parameter::{write, ParamObject, Parameter};
use crate::row_bounds::RowBounds;

pub mod key_gen;
pub mod statement;

mod batch;
mod simple;

pub use batch::BatchExecutor;
pub use key_gen::KeyGenerator;
pub use simple::SimpleExecutor;
pub use statement::SimpleStatementHandler;

/// Sentinel returned by batched updates in place of an affected-row count.
///
/// The real counts become available from
/// [`Executor::flush_statements`] once the batch is drained.
pub const BATCH_UPDATE_RETURN_VALUE: i64 = i64::MIN + 1002;

/// The outcome of one drained statement batch.
#[derive(Debug)]
pub struct BatchResult {
    /// The mapped statement the batch belongs to.
    pub statement_id: String,
    /// The SQL text the batch executed.
    pub sql: String,
    /// The parameters enqueued into the batch, in order.
    pub parameters: Vec<Parameter>,
    /// Per-command affected counts, in enqueue order.
    pub update_counts: Vec<u64>,
}

/// A lazy-load placeholder waiting for a query result to land in the
/// session-local cache.
pub struct DeferredLoad {
    key: CacheKey,
    target: ParamObject,
    property: String,
}

impl DeferredLoad {
    /// Try to resolve against the local cache.
    ///
    /// Returns `false` if the result is not available yet.
    fn resolve(&self, local_cache: &PerpetualCache) -> Result<bool> {
        let Some(CachedValue::Strong(rows)) = local_cache.get(&self.key) else {
            return Ok(false);
        };
        let value = if rows.len() == 1 {
            rows[0].clone()
        } else {
            Value::Array((*rows).clone())
        };
        write(&self.target)?
            .set_property(&self.property, value)
            .map_err(|e| Error::property(&format!("deferred load of '{}'", self.property), e))?;
        Ok(true)
    }
}

/// Per-executor state shared by every implementation.
pub(crate) struct ExecutorSession {
    pub(crate) configuration: Arc<Configuration>,
    pub(crate) transaction: SharedTransaction,
    pub(crate) local_cache: PerpetualCache,
    pub(crate) deferred_loads: VecDeque<DeferredLoad>,
    pub(crate) closed: bool,
}

impl ExecutorSession {
    pub(crate) fn new(configuration: Arc<Configuration>, transaction: SharedTransaction) -> Self {
        Self {
            configuration,
            transaction,
            local_cache: PerpetualCache::new("LocalCache"),
            deferred_loads: VecDeque::new(),
            closed: false,
        }
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.closed {
            Err(Error::state(format!("executor is closed, cannot {operation}")))
        } else {
            Ok(())
        }
    }
}

/// Lock the shared transaction.
pub(crate) fn lock_transaction(
    transaction: &SharedTransaction,
) -> Result<MutexGuard<'_, dyn Transaction + 'static>> {
    transaction.lock().map_err(|_| Error::LockPoisoned("transaction".to_string()))
}

fn namespace_cache(session: &ExecutorSession, ms: &MappedStatement) -> Option<Arc<dyn Cache>> {
    ms.cache().and_then(|id| session.configuration.cache(id))
}

/// Executes mapped statements against one transaction.
///
/// Not safe for concurrent use; one executor belongs to one session. After
/// an error the executor stays usable until explicitly closed.
pub trait Executor: Send {
    /// Execute a mutating statement.
    ///
    /// Returns the affected-row count, or [`BATCH_UPDATE_RETURN_VALUE`] when
    /// the update was deferred into a batch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if the executor is closed, or any execution
    /// error from the physical driver or key generation.
    fn update(&mut self, ms: &Arc<MappedStatement>, parameter: Parameter) -> Result<i64>;

    /// Execute a query, computing the cache key internally.
    ///
    /// # Errors
    ///
    /// As [`Executor::query_with_key`].
    fn query(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: Parameter,
        bounds: RowBounds,
    ) -> Result<Vec<Value>>;

    /// Execute a query under a precomputed cache key.
    ///
    /// Consults the namespace cache (when the statement opts in) and the
    /// session-local cache before touching the database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if the executor is closed, or any execution
    /// error from the physical driver or result mapping.
    fn query_with_key(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: Parameter,
        bounds: RowBounds,
        key: CacheKey,
    ) -> Result<Vec<Value>>;

    /// Execute a query lazily, returning a cursor. Cursor results bypass
    /// both caches.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if the executor is closed, or a driver error
    /// from statement preparation.
    fn query_cursor(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: Parameter,
        bounds: RowBounds,
    ) -> Result<DefaultCursor>;

    /// Drain pending batches, returning per-batch results.
    ///
    /// Empty when nothing was pending; no physical execution happens then.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if the executor is closed, or a batch
    /// execution error.
    fn flush_statements(&mut self) -> Result<Vec<BatchResult>>;

    /// Flush pending work and, when `required`, commit the transaction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if the executor is closed, or a driver
    /// error from the commit.
    fn commit(&mut self, required: bool) -> Result<()>;

    /// Discard pending work and, when `required`, roll the transaction back.
    ///
    /// # Errors
    ///
    /// Returns a driver error from the rollback.
    fn rollback(&mut self, required: bool) -> Result<()>;

    /// Build the composite cache key for an execution.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if the executor is closed.
    fn create_cache_key(
        &self,
        ms: &Arc<MappedStatement>,
        parameter: &Parameter,
        bounds: RowBounds,
    ) -> Result<CacheKey>;

    /// Returns `true` if the session-local cache holds a result for `key`.
    fn is_cached(&self, key: &CacheKey) -> bool;

    /// Clear the session-local cache.
    fn clear_local_cache(&mut self);

    /// Register a lazy property load to be resolved once the result for
    /// `key` lands in the session-local cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::State`] if the executor is closed, or an execution
    /// error if an already-available result cannot be assigned.
    fn defer_load(&mut self, key: CacheKey, target: ParamObject, property: String) -> Result<()>;

    /// The transaction this executor runs on.
    fn transaction(&self) -> SharedTransaction;

    /// Close the executor and its transaction.
    ///
    /// Pending batches are discarded; with `force_rollback` the transaction
    /// is rolled back first. Close failures are suppressed.
    fn close(&mut self, force_rollback: bool);

    /// Returns `true` once the executor has been closed.
    fn is_closed(&self) -> bool;
}

/// The physical operations a concrete executor supplies.
pub(crate) trait ExecutorOps: Send {
    fn session(&self) -> &ExecutorSession;

    fn session_mut(&mut self) -> &mut ExecutorSession;

    fn do_update(&mut self, ms: &Arc<MappedStatement>, parameter: &Parameter) -> Result<i64>;

    fn do_query(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: &Parameter,
        bounds: RowBounds,
    ) -> Result<Vec<Value>>;

    fn do_query_cursor(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: &Parameter,
        bounds: RowBounds,
    ) -> Result<DefaultCursor>;

    fn do_flush(&mut self, is_rollback: bool) -> Result<Vec<BatchResult>>;
}

impl<T: ExecutorOps> Executor for T {
    fn update(&mut self, ms: &Arc<MappedStatement>, parameter: Parameter) -> Result<i64> {
        self.session().ensure_open("update")?;
        debug!(statement = ms.id(), "executing update");
        self.session_mut().local_cache.clear();
        if ms.flush_cache() {
            if let Some(cache) = namespace_cache(self.session(), ms) {
                cache.clear();
            }
        }
        self.do_update(ms, &parameter)
    }

    fn query(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: Parameter,
        bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        let key = self.create_cache_key(ms, &parameter, bounds)?;
        self.query_with_key(ms, parameter, bounds, key)
    }

    fn query_with_key(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: Parameter,
        bounds: RowBounds,
        key: CacheKey,
    ) -> Result<Vec<Value>> {
        self.session().ensure_open("query")?;

        if ms.flush_cache() {
            self.session_mut().local_cache.clear();
            if let Some(cache) = namespace_cache(self.session(), ms) {
                cache.clear();
            }
        }

        let cache = if ms.use_cache() { namespace_cache(self.session(), ms) } else { None };
        if let Some(cache) = cache.as_deref() {
            if let Some(rows) = cache.get(&key).and_then(|v| v.resolve()) {
                debug!(statement = ms.id(), cache = cache.id(), "namespace cache hit");
                return Ok((*rows).clone());
            }
        }

        if let Some(CachedValue::Strong(rows)) = self.session().local_cache.get(&key) {
            debug!(statement = ms.id(), "local cache hit");
            // The namespace miss above may hold a single-flight latch;
            // republishing the rows releases it and restores the entry.
            if let Some(cache) = cache.as_deref() {
                cache.put(key, CachedValue::Strong(Arc::clone(&rows)));
            }
            return Ok((*rows).clone());
        }

        // Miss: mark the key in flight, run the statement, then publish.
        debug!(statement = ms.id(), "cache miss, querying database");
        self.session_mut().local_cache.put(key.clone(), CachedValue::Pending);
        let outcome = self.do_query(ms, &parameter, bounds);
        self.session_mut().local_cache.remove(&key);

        let rows = match outcome {
            Ok(rows) => rows,
            Err(e) => {
                // Release any single-flight latch held on the miss.
                if let Some(cache) = cache.as_deref() {
                    cache.remove(&key);
                }
                return Err(e);
            }
        };

        let shared = Arc::new(rows.clone());
        self.session_mut()
            .local_cache
            .put(key.clone(), CachedValue::Strong(Arc::clone(&shared)));
        if let Some(cache) = cache.as_deref() {
            cache.put(key, CachedValue::Strong(shared));
        }

        // Resolve any lazy loads the result unblocked.
        let mut pending = std::mem::take(&mut self.session_mut().deferred_loads);
        while let Some(load) = pending.pop_front() {
            if !load.resolve(&self.session().local_cache)? {
                self.session_mut().deferred_loads.push_back(load);
            }
        }

        Ok(rows)
    }

    fn query_cursor(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: Parameter,
        bounds: RowBounds,
    ) -> Result<DefaultCursor> {
        self.session().ensure_open("open a cursor")?;
        debug!(statement = ms.id(), "opening cursor");
        self.do_query_cursor(ms, &parameter, bounds)
    }

    fn flush_statements(&mut self) -> Result<Vec<BatchResult>> {
        self.session().ensure_open("flush statements")?;
        self.do_flush(false)
    }

    fn commit(&mut self, required: bool) -> Result<()> {
        self.session().ensure_open("commit")?;
        self.session_mut().local_cache.clear();
        self.do_flush(false)?;
        if required {
            lock_transaction(&self.session().transaction)?.commit()?;
        }
        Ok(())
    }

    fn rollback(&mut self, required: bool) -> Result<()> {
        if self.session().closed {
            return Ok(());
        }
        self.session_mut().local_cache.clear();
        let flushed = self.do_flush(true).map(|_| ());
        let rolled = if required {
            lock_transaction(&self.session().transaction)
                .and_then(|mut tx| tx.rollback().map_err(Error::from))
        } else {
            Ok(())
        };
        flushed?;
        rolled
    }

    fn create_cache_key(
        &self,
        ms: &Arc<MappedStatement>,
        parameter: &Parameter,
        bounds: RowBounds,
    ) -> Result<CacheKey> {
        self.session().ensure_open("create a cache key")?;
        let mut key = CacheKey::new();
        key.update(Value::from(ms.id()));
        // Saturate rather than wrap; the unbounded-limit sentinel exceeds i64.
        key.update(Value::Int(i64::try_from(bounds.offset).unwrap_or(i64::MAX)));
        key.update(Value::Int(i64::try_from(bounds.limit).unwrap_or(i64::MAX)));
        key.update(Value::from(ms.sql()));
        key.update_all(parameter.values()?);
        key.update(Value::from(self.session().configuration.environment_id()));
        Ok(key)
    }

    fn is_cached(&self, key: &CacheKey) -> bool {
        matches!(self.session().local_cache.get(key), Some(CachedValue::Strong(_)))
    }

    fn clear_local_cache(&mut self) {
        if !self.session().closed {
            self.session_mut().local_cache.clear();
        }
    }

    fn defer_load(&mut self, key: CacheKey, target: ParamObject, property: String) -> Result<()> {
        self.session().ensure_open("defer a load")?;
        let load = DeferredLoad { key, target, property };
        if !load.resolve(&self.session().local_cache)? {
            self.session_mut().deferred_loads.push_back(load);
        }
        Ok(())
    }

    fn transaction(&self) -> SharedTransaction {
        Arc::clone(&self.session().transaction)
    }

    fn close(&mut self, force_rollback: bool) {
        let _ = self.rollback(force_rollback);
        if let Ok(mut tx) = self.session().transaction.lock() {
            let _ = tx.close();
        }
        let session = self.session_mut();
        session.closed = true;
        session.deferred_loads.clear();
        session.local_cache.clear();
    }

    fn is_closed(&self) -> bool {
        self.session().closed
    }
}
