//! The configuration registry.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use relmap_driver::SharedTransaction;

use crate::cache::Cache;
use crate::error::{Error, Result};
use crate::executor::{BatchExecutor, Executor, SimpleExecutor};
use crate::mapping::MappedStatement;
use crate::type_handler::TypeHandlerRegistry;

/// Which executor implementation a session runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutorType {
    /// One physical statement per execution.
    #[default]
    Simple,
    /// Updates deferred into driver batches, drained on flush.
    Batch,
}

/// Owns the mapped statements, namespace caches, and type handlers shared
/// by every executor built from it.
///
/// Caches and statements are registered once at startup and resolved
/// concurrently afterwards.
pub struct Configuration {
    environment_id: String,
    type_handlers: TypeHandlerRegistry,
    caches: RwLock<HashMap<String, Arc<dyn Cache>>>,
    statements: RwLock<HashMap<String, Arc<MappedStatement>>>,
}

impl Configuration {
    /// Create an empty configuration for the given environment.
    #[must_use]
    pub fn new(environment_id: impl Into<String>) -> Self {
        Self {
            environment_id: environment_id.into(),
            type_handlers: TypeHandlerRegistry::new(),
            caches: RwLock::new(HashMap::new()),
            statements: RwLock::new(HashMap::new()),
        }
    }

    /// The environment id, folded into every cache key.
    #[must_use]
    pub fn environment_id(&self) -> &str {
        &self.environment_id
    }

    /// The type-handler registry.
    #[must_use]
    pub const fn type_handlers(&self) -> &TypeHandlerRegistry {
        &self.type_handlers
    }

    /// Register a namespace cache.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a cache with the same id already exists;
    /// at most one live cache per namespace id.
    pub fn add_cache(&self, cache: Box<dyn Cache>) -> Result<()> {
        let mut caches = self
            .caches
            .write()
            .map_err(|_| Error::LockPoisoned("cache registry".to_string()))?;
        let id = cache.id().to_string();
        if caches.contains_key(&id) {
            return Err(Error::config(format!("cache '{id}' is already registered")));
        }
        caches.insert(id, Arc::from(cache));
        Ok(())
    }

    /// Resolve a namespace cache by id.
    #[must_use]
    pub fn cache(&self, id: &str) -> Option<Arc<dyn Cache>> {
        self.caches.read().ok()?.get(id).map(Arc::clone)
    }

    /// Register a mapped statement, returning the shared handle.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if a statement with the same id already
    /// exists.
    pub fn add_statement(&self, statement: MappedStatement) -> Result<Arc<MappedStatement>> {
        let mut statements = self
            .statements
            .write()
            .map_err(|_| Error::LockPoisoned("statement registry".to_string()))?;
        let id = statement.id().to_string();
        if statements.contains_key(&id) {
            return Err(Error::config(format!("statement '{id}' is already registered")));
        }
        let statement = Arc::new(statement);
        statements.insert(id, Arc::clone(&statement));
        Ok(statement)
    }

    /// Resolve a mapped statement by id.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if no statement with that id exists.
    pub fn statement(&self, id: &str) -> Result<Arc<MappedStatement>> {
        self.statements
            .read()
            .map_err(|_| Error::LockPoisoned("statement registry".to_string()))?
            .get(id)
            .map(Arc::clone)
            .ok_or_else(|| Error::config(format!("unknown mapped statement '{id}'")))
    }

    /// Build an executor of the given kind over a transaction.
    #[must_use]
    pub fn new_executor(
        self: &Arc<Self>,
        transaction: SharedTransaction,
        executor_type: ExecutorType,
    ) -> Box<dyn Executor> {
        match executor_type {
            ExecutorType::Simple => {
                Box::new(SimpleExecutor::new(Arc::clone(self), transaction))
            }
            ExecutorType::Batch => Box::new(BatchExecutor::new(Arc::clone(self), transaction)),
        }
    }
}

impl Default for Configuration {
    fn default() -> Self {
        Self::new("default")
    }
}
