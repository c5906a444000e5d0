//! Core driver traits.
//!
//! These traits are the seam between the execution engine and a physical
//! database driver. They are deliberately narrow: execute SQL text
//! (optionally requesting generated-key capture), fetch rows forward-only,
//! report column metadata, and close.

use std::sync::{Arc, Mutex};

use relmap_core::Value;

use crate::error::DriverError;

/// The database-reported type of a result column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnType {
    /// Integer-valued column.
    Integer,
    /// Floating-point column.
    Real,
    /// Boolean column.
    Boolean,
    /// Text column.
    Text,
    /// Binary column.
    Blob,
    /// Column with no declared type.
    Null,
}

/// Metadata for one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    /// The column name as reported by the driver.
    pub name: String,
    /// The database type of the column.
    pub column_type: ColumnType,
}

impl ColumnInfo {
    /// Create column metadata.
    #[must_use]
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self { name: name.into(), column_type }
    }
}

/// The scrollability mode requested for a statement's result sets.
///
/// Only forward-only consumption is supported by the engine; the other
/// modes exist so mapped statements can declare what the driver should
/// allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResultSetType {
    /// Driver default; treated as the simplest non-scrollable, read-only mode.
    #[default]
    Default,
    /// Explicit forward-only cursor.
    ForwardOnly,
    /// Scrollable, insensitive to concurrent changes.
    ScrollInsensitive,
    /// Scrollable, sensitive to concurrent changes.
    ScrollSensitive,
}

/// Options a statement is created with.
#[derive(Debug, Clone, Default)]
pub struct StatementOptions {
    /// The requested result-set scrollability mode.
    pub result_set_type: ResultSetType,
    /// Whether execution should capture driver-generated keys.
    pub return_generated_keys: bool,
}

impl StatementOptions {
    /// Create default options (forward-only, no key capture).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the result-set type.
    #[must_use]
    pub const fn result_set_type(mut self, result_set_type: ResultSetType) -> Self {
        self.result_set_type = result_set_type;
        self
    }

    /// Request generated-key capture on execution.
    #[must_use]
    pub const fn return_generated_keys(mut self, enabled: bool) -> Self {
        self.return_generated_keys = enabled;
        self
    }
}

/// A forward-only raw result stream.
pub trait RowStream: Send {
    /// Column metadata for the stream, in result order.
    fn columns(&self) -> &[ColumnInfo];

    /// Fetch the next raw row.
    ///
    /// Returns `Ok(None)` once the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Closed`] if the stream was closed.
    fn next_row(&mut self) -> Result<Option<Vec<Value>>, DriverError>;

    /// Close the stream, releasing driver resources.
    ///
    /// Callers treat close failures as best-effort and suppress them.
    ///
    /// # Errors
    ///
    /// Returns a driver error if releasing resources fails.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// A single executable database command.
pub trait Statement: Send {
    /// Execute a mutating command, returning the affected-row count.
    ///
    /// # Errors
    ///
    /// Returns a driver error if execution fails.
    fn execute_update(&mut self, sql: &str) -> Result<u64, DriverError>;

    /// Execute a query, returning its raw result stream.
    ///
    /// # Errors
    ///
    /// Returns a driver error if execution fails.
    fn execute_query(&mut self, sql: &str) -> Result<Box<dyn RowStream>, DriverError>;

    /// The generated-keys stream from the most recent update.
    ///
    /// Returns an empty stream if the statement was not created with
    /// [`StatementOptions::return_generated_keys`] or nothing was generated.
    ///
    /// # Errors
    ///
    /// Returns a driver error if the stream cannot be produced.
    fn generated_keys(&mut self) -> Result<Box<dyn RowStream>, DriverError>;

    /// Enqueue a command for deferred batch execution.
    ///
    /// # Errors
    ///
    /// Returns a driver error if the command cannot be enqueued.
    fn add_batch(&mut self, sql: &str) -> Result<(), DriverError>;

    /// Execute all enqueued commands, returning per-command affected counts
    /// in enqueue order.
    ///
    /// # Errors
    ///
    /// Returns a driver error if any command fails.
    fn execute_batch(&mut self) -> Result<Vec<u64>, DriverError>;

    /// Close the statement.
    ///
    /// # Errors
    ///
    /// Returns a driver error if releasing resources fails.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// A live database connection.
pub trait Connection: Send {
    /// Create a statement with the given options.
    ///
    /// # Errors
    ///
    /// Returns a driver error if the statement cannot be created.
    fn create_statement(
        &mut self,
        options: &StatementOptions,
    ) -> Result<Box<dyn Statement>, DriverError>;
}

/// A transaction wrapping one connection.
///
/// The engine shares a transaction between an executor and key-generator
/// sub-executions via [`SharedTransaction`]; whoever opened the executor is
/// responsible for closing it.
pub trait Transaction: Send {
    /// The connection this transaction runs on.
    ///
    /// # Errors
    ///
    /// Returns [`DriverError::Connection`] if the connection cannot be
    /// obtained.
    fn connection(&mut self) -> Result<&mut dyn Connection, DriverError>;

    /// Commit pending changes.
    ///
    /// # Errors
    ///
    /// Returns a driver error if the commit fails.
    fn commit(&mut self) -> Result<(), DriverError>;

    /// Roll back pending changes.
    ///
    /// # Errors
    ///
    /// Returns a driver error if the rollback fails.
    fn rollback(&mut self) -> Result<(), DriverError>;

    /// Close the transaction and its connection.
    ///
    /// # Errors
    ///
    /// Returns a driver error if the close fails.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// A transaction shared between an executor and its sub-executions.
pub type SharedTransaction = Arc<Mutex<dyn Transaction>>;

/// Wrap a transaction for shared use.
#[must_use]
pub fn shared<T: Transaction + 'static>(transaction: T) -> SharedTransaction {
    Arc::new(Mutex::new(transaction))
}
