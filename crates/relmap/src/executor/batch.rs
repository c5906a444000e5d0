//! The batching executor.

use std::sync::Arc;

use relmap_core::Value;
use relmap_driver::{SharedTransaction, Statement};
use tracing::debug;

use crate::config::Configuration;
use crate::cursor::DefaultCursor;
use crate::error::{Error, Result};
use crate::mapping::MappedStatement;
use crate::parameter::Parameter;
use crate::row_bounds::RowBounds;

use super::statement::SimpleStatementHandler;
use super::{
    lock_transaction, BatchResult, ExecutorOps, ExecutorSession, BATCH_UPDATE_RETURN_VALUE,
};

/// One statement's accumulating batch.
struct PendingBatch {
    statement: Arc<MappedStatement>,
    sql: String,
    parameters: Vec<Parameter>,
}

/// Defers updates into driver batches, drained in order on flush.
///
/// Consecutive updates with the same SQL and statement id share one physical
/// statement. Queries force a flush first so they observe pending writes.
pub struct BatchExecutor {
    session: ExecutorSession,
    // statements[i] pairs with batches[i].
    statements: Vec<Box<dyn Statement>>,
    batches: Vec<PendingBatch>,
    current_sql: Option<String>,
    current_statement_id: Option<String>,
}

impl BatchExecutor {
    /// Create an executor over a shared transaction.
    #[must_use]
    pub fn new(configuration: Arc<Configuration>, transaction: SharedTransaction) -> Self {
        Self {
            session: ExecutorSession::new(configuration, transaction),
            statements: Vec::new(),
            batches: Vec::new(),
            current_sql: None,
            current_statement_id: None,
        }
    }

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

    fn reuses_current(&self, ms: &MappedStatement, sql: &str) -> bool {
        self.current_sql.as_deref() == Some(sql)
            && self.current_statement_id.as_deref() == Some(ms.id())
    }
}

impl ExecutorOps for BatchExecutor {
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
        let sql = handler.sql().to_string();

        if self.reuses_current(ms, &sql) {
            // Same command as the previous update; extend its batch.
            let stmt = self
                .statements
                .last_mut()
                .ok_or_else(|| Error::state("batch bookkeeping out of sync"))?;
            handler.parameterize(stmt.as_mut())?;
            handler.batch(stmt.as_mut())?;
            if let Some(batch) = self.batches.last_mut() {
                batch.parameters.push(parameter.clone());
            }
        } else {
            let mut stmt = self.prepare(&handler)?;
            handler.parameterize(stmt.as_mut())?;
            handler.batch(stmt.as_mut())?;
            self.statements.push(stmt);
            self.batches.push(PendingBatch {
                statement: Arc::clone(ms),
                sql: sql.clone(),
                parameters: vec![parameter.clone()],
            });
            self.current_sql = Some(sql);
            self.current_statement_id = Some(ms.id().to_string());
        }
        Ok(BATCH_UPDATE_RETURN_VALUE)
    }

    fn do_query(
        &mut self,
        ms: &Arc<MappedStatement>,
        parameter: &Parameter,
        bounds: RowBounds,
    ) -> Result<Vec<Value>> {
        // Pending writes must land before the read.
        self.do_flush(false)?;
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
        self.do_flush(false)?;
        let handler = self.handler(ms, parameter, bounds);
        let mut stmt = self.prepare(&handler)?;
        handler.parameterize(stmt.as_mut())?;
        handler.query_cursor(stmt)
    }

    fn do_flush(&mut self, is_rollback: bool) -> Result<Vec<BatchResult>> {
        self.current_sql = None;
        self.current_statement_id = None;
        let statements = std::mem::take(&mut self.statements);
        let batches = std::mem::take(&mut self.batches);

        if is_rollback {
            for mut stmt in statements {
                let _ = stmt.close();
            }
            return Ok(Vec::new());
        }

        let mut results = Vec::with_capacity(batches.len());
        let mut failure: Option<Error> = None;
        for (mut stmt, batch) in statements.into_iter().zip(batches) {
            if failure.is_none() {
                debug!(
                    statement = batch.statement.id(),
                    commands = batch.parameters.len(),
                    "executing batch"
                );
                match stmt.execute_batch() {
                    Ok(update_counts) => {
                        let generated = batch.statement.key_generator().process_batch(
                            &self.session.configuration,
                            &self.session.transaction,
                            &batch.statement,
                            &batch.parameters,
                            stmt.as_mut(),
                        );
                        match generated {
                            Ok(()) => results.push(BatchResult {
                                statement_id: batch.statement.id().to_string(),
                                sql: batch.sql,
                                parameters: batch.parameters,
                                update_counts,
                            }),
                            Err(e) => failure = Some(e),
                        }
                    }
                    Err(e) => {
                        failure = Some(Error::execution_with(
                            format!("batch failed for statement '{}'", batch.statement.id()),
                            e,
                        ));
                    }
                }
            }
            // Remaining statements are still closed after a failure.
            let _ = stmt.close();
        }

        match failure {
            Some(e) => Err(e),
            None => Ok(results),
        }
    }
}
