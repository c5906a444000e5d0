//! The one-statement-per-execution executor.

use std::sync::Arc;

use relmap_core::Value;
use relmap_driver::{SharedTransaction, Statement};

use crate::config::Configuration;
use crate::cursor::DefaultCursor;
use crate::error::Result;
use crate::mapping::MappedStatement;
use crate::parameter::Parameter;
use crate::row_bounds::RowBounds;

use super::statement::SimpleStatementHandler;
use super::{lock_transaction, BatchResult, ExecutorOps, ExecutorSession};

/// Executes every statement immediately on its own physical statement.
pub struct SimpleExecutor {
    session: ExecutorSession,
}

impl SimpleExecutor {
    /// Create an executor over a shared transaction.
    #[must_use]
    pub fn new(configuration: Arc<Configuration>, transaction: SharedTransaction) -> Self {
        Self { session: ExecutorSession::new(configuration, transaction) }
    }

    /// Prepare a statement, holding the transaction lock only while the
    /// driver creates it.
    fn prepare(&self, handler: &SimpleStatementHandler) -> Result<Box<dyn Statement>> {
        let mut tx = lock_transaction(&self.session.transaction)?;
        let connection = tx.connection()?;
        handler.prepare(connection)
    }

    fn handler(
        &self,
        ms: &Arc<MappedStatement>,
        parameter: &Parameter,
        bounds: RowBounds,
    ) -> SimpleStatementHandler {
        SimpleStatementHandler::new(
            Arc::clone(&self.session.configuration),
            Arc::clone(ms),
            parameter.clone(),
            bounds,
        )
    }
}

impl ExecutorOps for SimpleExecutor {
    fn session(&self) -> &ExecutorSession {
        &self.session
    }

    fn session_mut(&mut self) -> &mut ExecutorSession {
        &mut self.session
    }

    fn do_update(&mut self, ms: &Arc<MappedStatement>, parameter: &Parameter) -> Result<i64> {
        ms.key_generator().process_before(
            &self.session.configuration,
            &self.session.transaction,
            parameter,
        )?;
        let handler = self.handler(ms, parameter, RowBounds::default());
        let mut stmt = self.prepare(&handler)?;
        handler.parameterize(stmt.as_mut())?;
        let outcome = handler.update(&self.session.transaction, stmt.as_mut());
        let _ = stmt.close();
        outcome.map(|affected| affected as i64)
    }

    fn do_query(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: &Parameter,
        bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        let handler = self.handler(ms, parameter, bounds);
        let mut stmt = self.prepare(&handler)?;
        handler.parameterize(stmt.as_mut())?;
        let outcome = handler.query(stmt.as_mut());
        let _ = stmt.close();
        outcome
    }

    fn do_query_cursor(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: &Parameter,
        bounds: RowBounds,
    ) -> Result<DefaultCursor> {
        let handler = self.handler(ms, parameter, bounds);
        let mut stmt = self.prepare(&handler)?;
        handler.parameterize(stmt.as_mut())?;
        handler.query_cursor(stmt)
    }

    fn do_flush(&mut self, _is_rollback: bool) -> Result<Vec<BatchResult>> {
        // Nothing is ever deferred.
        Ok(Vec::new())
    }
}
