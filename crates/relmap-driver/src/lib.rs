//! Physical driver contract for `relmap`.
//!
//! This crate defines the traits the execution engine drives a database
//! through:
//!
//! - [`Connection`] - creates statements with declared options
//! - [`Statement`] - executes SQL text and exposes generated keys
//! - [`RowStream`] - a forward-only raw result stream with column metadata
//! - [`Transaction`] - commit/rollback/close over one connection
//!
//! All traits are object-safe; the engine holds them as boxed trait objects.
//! The [`memory`] module provides a scripted in-memory engine used by tests
//! and demos.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::DriverError;
pub use traits::{
    shared, ColumnInfo, ColumnType, Connection, ResultSetType, RowStream, SharedTransaction,
    Statement, StatementOptions, Transaction,
};
