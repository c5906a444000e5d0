//! The simple (inline-SQL) statement handler.

use std::sync::Arc;

use relmap_core::Value;
use relmap_driver::{
    Connection, ResultSetType, SharedTransaction, Statement, StatementOptions,
};
use tracing::trace;

use crate::config::Configuration;
use crate::cursor::DefaultCursor;
use crate::error::Result;
use crate::mapping::{BoundSql, MappedStatement};
use crate::parameter::Parameter;
use crate::result_set::ResultSetHandler;
use crate::row_bounds::RowBounds;

/// Drives one mapped statement through prepare, execute, key generation,
/// and result handling.
///
/// This variant carries inline SQL text only; `parameterize` has nothing to
/// bind.
pub struct SimpleStatementHandler {
    configuration: Arc<Configuration>,
    mapped_statement: Arc<MappedStatement>,
    bound_sql: BoundSql,
    row_bounds: RowBounds,
    result_set_handler: ResultSetHandler,
}

impl SimpleStatementHandler {
    /// Create a handler for one execution.
    #[must_use]
    pub fn new(
        configuration: Arc<Configuration>,
        mapped_statement: Arc<MappedStatement>,
        parameter: Parameter,
        row_bounds: RowBounds,
    ) -> Self {
        let bound_sql = mapped_statement.bound_sql(parameter);
        let result_set_handler = ResultSetHandler::new(Arc::clone(&configuration));
        Self { configuration, mapped_statement, bound_sql, row_bounds, result_set_handler }
    }

    /// The SQL text this handler executes.
    #[must_use]
    pub fn sql(&self) -> &str {
        &self.bound_sql.sql
    }

    /// Instantiate the physical statement.
    ///
    /// The declared result-set type picks the scrollability mode; the
    /// default is the simplest forward-only, read-only mode. Driver key
    /// capture is requested when the key generator needs it.
    ///
    /// # Errors
    ///
    /// Returns a driver error if the statement cannot be created.
    pub fn prepare(&self, connection: &mut dyn Connection) -> Result<Box<dyn Statement>> {
        let result_set_type = match self.mapped_statement.result_set_type() {
            ResultSetType::Default => ResultSetType::ForwardOnly,
            declared => declared,
        };
        let options = StatementOptions::new()
            .result_set_type(result_set_type)
            .return_generated_keys(
                self.mapped_statement.key_generator().captures_driver_keys(),
            );
        Ok(connection.create_statement(&options)?)
    }

    /// Bind parameters into the statement. Inline SQL has none; no-op.
    ///
    /// # Errors
    ///
    /// Infallible for this variant.
    pub fn parameterize(&self, _stmt: &mut dyn Statement) -> Result<()> {
        Ok(())
    }

    /// Execute a mutating command and run post-execution key generation.
    ///
    /// # Errors
    ///
    /// Returns a driver error from execution or any key-generation error.
    pub fn update(
        &self,
        transaction: &SharedTransaction,
        stmt: &mut dyn Statement,
    ) -> Result<u64> {
        trace!(statement = self.mapped_statement.id(), "executing update");
        let affected = stmt.execute_update(&self.bound_sql.sql)?;
        self.mapped_statement.key_generator().process_after(
            &self.configuration,
            transaction,
            &self.mapped_statement,
            &self.bound_sql.parameter,
            Some(stmt),
        )?;
        Ok(affected)
    }

    /// Enqueue the command for deferred batch execution.
    ///
    /// # Errors
    ///
    /// Returns a driver error if the command cannot be enqueued.
    pub fn batch(&self, stmt: &mut dyn Statement) -> Result<()> {
        trace!(statement = self.mapped_statement.id(), "adding to batch");
        stmt.add_batch(&self.bound_sql.sql)?;
        Ok(())
    }

    /// Execute a query and materialize the windowed results.
    ///
    /// # Errors
    ///
    /// Returns a driver error from execution or an execution error from
    /// result mapping.
    pub fn query(&self, stmt: &mut dyn Statement) -> Result<Vec<Value>> {
        trace!(statement = self.mapped_statement.id(), "executing query");
        let mut stream = stmt.execute_query(&self.bound_sql.sql)?;
        let result = self.result_set_handler.handle_results(
            stream.as_mut(),
            self.mapped_statement.result_map(),
            &self.row_bounds,
        );
        let _ = stream.close();
        result
    }

    /// Execute a query and wrap its stream in a cursor.
    ///
    /// The cursor takes ownership of the statement and closes both on exit.
    ///
    /// # Errors
    ///
    /// Returns a driver error from execution.
    pub fn query_cursor(self, mut stmt: Box<dyn Statement>) -> Result<DefaultCursor> {
        trace!(statement = self.mapped_statement.id(), "executing cursor query");
        let stream = stmt.execute_query(&self.bound_sql.sql)?;
        Ok(DefaultCursor::new(
            self.result_set_handler,
            Arc::clone(self.mapped_statement.result_map()),
            stream,
            stmt,
            self.row_bounds,
        ))
    }
}
