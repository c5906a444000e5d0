//! Mapped-statement execution and caching engine.
//!
//! `relmap` executes pre-compiled, identified SQL commands against a
//! pluggable driver, applies a composable multi-layer result cache, and
//! streams results back eagerly (materialized) or lazily (a single-consumer
//! cursor), while reconciling database-generated keys back onto caller
//! parameters.
//!
//! # Architecture
//!
//! - [`cache`] - decorator chain: perpetual core, LRU / weak eviction,
//!   scheduled flush, single-flight blocking
//! - [`cursor`] - lazy forward-only result cursor with explicit lifecycle
//! - [`executor`] - orchestration, key generation, statement handling
//! - [`mapping`] / [`config`] - mapped statements and their registry
//! - [`result_set`] / [`type_handler`] - row mapping and value conversion
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use relmap::{
//!     Configuration, Executor, ExecutorType, MappedStatement, Parameter, RowBounds,
//!     SqlCommandType,
//! };
//! use relmap_core::Value;
//! use relmap_driver::memory::MemoryEngine;
//! use relmap_driver::{shared, ColumnInfo, ColumnType};
//!
//! # fn main() -> relmap::Result<()> {
//! let engine = MemoryEngine::new();
//! engine.script_query(
//!     "SELECT id, name FROM users",
//!     vec![
//!         ColumnInfo::new("id", ColumnType::Integer),
//!         ColumnInfo::new("name", ColumnType::Text),
//!     ],
//!     vec![vec![Value::Int(1), Value::from("Ada")]],
//! );
//!
//! let config = Arc::new(Configuration::new("dev"));
//! let find_all = config.add_statement(
//!     MappedStatement::builder(
//!         "users.findAll",
//!         "SELECT id, name FROM users",
//!         SqlCommandType::Select,
//!     )
//!     .build()?,
//! )?;
//!
//! let mut executor = config.new_executor(shared(engine.transaction()), ExecutorType::Simple);
//! let rows = executor.query(&find_all, Parameter::None, RowBounds::default())?;
//! assert_eq!(rows.len(), 1);
//! assert_eq!(rows[0].get_property("name"), Some(&Value::from("Ada")));
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod config;
pub mod cursor;
pub mod error;
pub mod executor;
pub mod mapping;
pub mod parameter;
pub mod result_set;
pub mod row_bounds;
pub mod type_handler;

pub use cache::{Cache, CacheBuilder, CacheKey, CachedValue, Eviction, RowList};
pub use config::{Configuration, ExecutorType};
pub use cursor::{CursorIterator, DefaultCursor};
pub use error::{Error, Result};
pub use executor::{
    BatchExecutor, BatchResult, Executor, KeyGenerator, SimpleExecutor, SimpleStatementHandler,
    BATCH_UPDATE_RETURN_VALUE,
};
pub use mapping::{BoundSql, MappedStatement, ResultMap, ResultMapping, SqlCommandType};
pub use parameter::{param, ParamObject, Parameter};
pub use result_set::ResultSetHandler;
pub use row_bounds::{RowBounds, NO_ROW_LIMIT};
pub use type_handler::{TargetType, TypeHandler, TypeHandlerRegistry};
