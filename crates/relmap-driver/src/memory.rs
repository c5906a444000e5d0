//! Scripted in-memory engine.
//!
//! [`MemoryEngine`] answers SQL text with pre-scripted results and records
//! everything it executes. It exists for tests and demos: script the
//! responses, run the engine code under test, then assert against the
//! execution log.
//!
//! # Example
//!
//! ```
//! use relmap_core::Value;
//! use relmap_driver::memory::MemoryEngine;
//! use relmap_driver::{ColumnInfo, ColumnType, Connection, StatementOptions};
//!
//! let engine = MemoryEngine::new();
//! engine.script_query(
//!     "SELECT id FROM users",
//!     vec![ColumnInfo::new("id", ColumnType::Integer)],
//!     vec![vec![Value::Int(1)], vec![Value::Int(2)]],
//! );
//!
//! let mut conn = engine.connection();
//! let mut stmt = conn.create_statement(&StatementOptions::new()).unwrap();
//! let mut stream = stmt.execute_query("SELECT id FROM users").unwrap();
//! assert_eq!(stream.next_row().unwrap(), Some(vec![Value::Int(1)]));
//! ```

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use relmap_core::Value;

use crate::error::DriverError;
use crate::traits::{
    ColumnInfo, Connection, RowStream, Statement, StatementOptions, Transaction,
};

/// A scripted result set: column metadata plus raw rows.
#[derive(Debug, Clone, Default)]
pub struct ScriptedResult {
    /// Column metadata in result order.
    pub columns: Vec<ColumnInfo>,
    /// Raw rows, one `Vec<Value>` per row.
    pub rows: Vec<Vec<Value>>,
}

impl ScriptedResult {
    /// Create a scripted result set.
    #[must_use]
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }
}

/// A scripted answer for a mutating command.
#[derive(Debug, Clone)]
pub struct ScriptedUpdate {
    /// The affected-row count to report.
    pub affected: u64,
    /// Generated keys to expose after execution, if any.
    pub generated_keys: Option<ScriptedResult>,
}

/// One recorded driver interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutedCommand {
    /// A query was executed.
    Query(String),
    /// An update was executed immediately.
    Update(String),
    /// A command was enqueued for batch execution.
    Batch(String),
    /// A batch of the given size was drained.
    ExecuteBatch(usize),
}

#[derive(Default)]
struct EngineState {
    queries: HashMap<String, ScriptedResult>,
    updates: HashMap<String, ScriptedUpdate>,
    log: Vec<ExecutedCommand>,
    commits: u32,
    rollbacks: u32,
    closes: u32,
}

/// A scripted in-memory engine shared by connections and statements.
#[derive(Default)]
pub struct MemoryEngine {
    state: Mutex<EngineState>,
}

impl MemoryEngine {
    /// Create a new engine with no scripted responses.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Script the result set for a query.
    pub fn script_query(&self, sql: &str, columns: Vec<ColumnInfo>, rows: Vec<Vec<Value>>) {
        if let Ok(mut state) = self.state.lock() {
            state.queries.insert(sql.to_string(), ScriptedResult::new(columns, rows));
        }
    }

    /// Script the affected count (and optional generated keys) for an update.
    pub fn script_update(&self, sql: &str, affected: u64, generated_keys: Option<ScriptedResult>) {
        if let Ok(mut state) = self.state.lock() {
            state.updates.insert(sql.to_string(), ScriptedUpdate { affected, generated_keys });
        }
    }

    /// Snapshot of everything executed so far, in order.
    #[must_use]
    pub fn log(&self) -> Vec<ExecutedCommand> {
        self.state.lock().map(|s| s.log.clone()).unwrap_or_default()
    }

    /// Number of commits observed.
    #[must_use]
    pub fn commit_count(&self) -> u32 {
        self.state.lock().map(|s| s.commits).unwrap_or_default()
    }

    /// Number of rollbacks observed.
    #[must_use]
    pub fn rollback_count(&self) -> u32 {
        self.state.lock().map(|s| s.rollbacks).unwrap_or_default()
    }

    /// Number of transaction closes observed.
    #[must_use]
    pub fn close_count(&self) -> u32 {
        self.state.lock().map(|s| s.closes).unwrap_or_default()
    }

    /// Create a connection onto this engine.
    #[must_use]
    pub fn connection(self: &Arc<Self>) -> MemoryConnection {
        MemoryConnection { engine: Arc::clone(self) }
    }

    /// Create a transaction onto this engine.
    #[must_use]
    pub fn transaction(self: &Arc<Self>) -> MemoryTransaction {
        MemoryTransaction { connection: self.connection() }
    }

    fn run_update(&self, sql: &str) -> Result<ScriptedUpdate, DriverError> {
        let mut state =
            self.state.lock().map_err(|_| DriverError::LockPoisoned("engine".to_string()))?;
        let update = state
            .updates
            .get(sql)
            .cloned()
            .ok_or_else(|| DriverError::UnknownStatement(sql.to_string()))?;
        state.log.push(ExecutedCommand::Update(sql.to_string()));
        Ok(update)
    }
}

/// A connection onto a [`MemoryEngine`].
pub struct MemoryConnection {
    engine: Arc<MemoryEngine>,
}

impl Connection for MemoryConnection {
    fn create_statement(
        &mut self,
        options: &StatementOptions,
    ) -> Result<Box<dyn Statement>, DriverError> {
        Ok(Box::new(MemoryStatement {
            engine: Arc::clone(&self.engine),
            options: options.clone(),
            batch: Vec::new(),
            last_keys: None,
            closed: false,
        }))
    }
}

/// A statement bound to a [`MemoryEngine`].
pub struct MemoryStatement {
    engine: Arc<MemoryEngine>,
    options: StatementOptions,
    batch: Vec<String>,
    last_keys: Option<ScriptedResult>,
    closed: bool,
}

impl MemoryStatement {
    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        Ok(())
    }
}

impl Statement for MemoryStatement {
    fn execute_update(&mut self, sql: &str) -> Result<u64, DriverError> {
        self.ensure_open()?;
        let update = self.engine.run_update(sql)?;
        self.last_keys =
            if self.options.return_generated_keys { update.generated_keys } else { None };
        Ok(update.affected)
    }

    fn execute_query(&mut self, sql: &str) -> Result<Box<dyn RowStream>, DriverError> {
        self.ensure_open()?;
        let mut state = self
            .engine
            .state
            .lock()
            .map_err(|_| DriverError::LockPoisoned("engine".to_string()))?;
        let result = state
            .queries
            .get(sql)
            .cloned()
            .ok_or_else(|| DriverError::UnknownStatement(sql.to_string()))?;
        state.log.push(ExecutedCommand::Query(sql.to_string()));
        Ok(Box::new(MemoryRowStream::new(result)))
    }

    fn generated_keys(&mut self) -> Result<Box<dyn RowStream>, DriverError> {
        self.ensure_open()?;
        let result = self.last_keys.clone().unwrap_or_default();
        Ok(Box::new(MemoryRowStream::new(result)))
    }

    fn add_batch(&mut self, sql: &str) -> Result<(), DriverError> {
        self.ensure_open()?;
        if let Ok(mut state) = self.engine.state.lock() {
            state.log.push(ExecutedCommand::Batch(sql.to_string()));
        }
        self.batch.push(sql.to_string());
        Ok(())
    }

    fn execute_batch(&mut self) -> Result<Vec<u64>, DriverError> {
        self.ensure_open()?;
        let commands = std::mem::take(&mut self.batch);
        let mut counts = Vec::with_capacity(commands.len());
        let mut key_rows: Option<ScriptedResult> = None;
        for sql in &commands {
            let update = self.engine.run_update(sql)?;
            counts.push(update.affected);
            if self.options.return_generated_keys {
                if let Some(keys) = update.generated_keys {
                    match key_rows.as_mut() {
                        Some(acc) => acc.rows.extend(keys.rows),
                        None => key_rows = Some(keys),
                    }
                }
            }
        }
        if let Ok(mut state) = self.engine.state.lock() {
            state.log.push(ExecutedCommand::ExecuteBatch(commands.len()));
        }
        self.last_keys = key_rows;
        Ok(counts)
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        Ok(())
    }
}

/// A raw result stream backed by scripted rows.
pub struct MemoryRowStream {
    columns: Vec<ColumnInfo>,
    rows: VecDeque<Vec<Value>>,
    closed: bool,
}

impl MemoryRowStream {
    fn new(result: ScriptedResult) -> Self {
        Self { columns: result.columns, rows: result.rows.into(), closed: false }
    }
}

impl RowStream for MemoryRowStream {
    fn columns(&self) -> &[ColumnInfo] {
        &self.columns
    }

    fn next_row(&mut self) -> Result<Option<Vec<Value>>, DriverError> {
        if self.closed {
            return Err(DriverError::Closed);
        }
        Ok(self.rows.pop_front())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.closed = true;
        Ok(())
    }
}

/// A transaction onto a [`MemoryEngine`].
pub struct MemoryTransaction {
    connection: MemoryConnection,
}

impl Transaction for MemoryTransaction {
    fn connection(&mut self) -> Result<&mut dyn Connection, DriverError> {
        Ok(&mut self.connection)
    }

    fn commit(&mut self) -> Result<(), DriverError> {
        if let Ok(mut state) = self.connection.engine.state.lock() {
            state.commits += 1;
        }
        Ok(())
    }

    fn rollback(&mut self) -> Result<(), DriverError> {
        if let Ok(mut state) = self.connection.engine.state.lock() {
            state.rollbacks += 1;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), DriverError> {
        if let Ok(mut state) = self.connection.engine.state.lock() {
            state.closes += 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::ColumnType;

    fn id_column() -> Vec<ColumnInfo> {
        vec![ColumnInfo::new("id", ColumnType::Integer)]
    }

    #[test]
    fn test_scripted_query_round_trip() {
        let engine = MemoryEngine::new();
        engine.script_query("SELECT 1", id_column(), vec![vec![Value::Int(1)]]);

        let mut conn = engine.connection();
        let mut stmt = conn.create_statement(&StatementOptions::new()).unwrap();
        let mut stream = stmt.execute_query("SELECT 1").unwrap();

        assert_eq!(stream.next_row().unwrap(), Some(vec![Value::Int(1)]));
        assert_eq!(stream.next_row().unwrap(), None);
        assert_eq!(engine.log(), vec![ExecutedCommand::Query("SELECT 1".to_string())]);
    }

    #[test]
    fn test_unknown_statement_errors() {
        let engine = MemoryEngine::new();
        let mut conn = engine.connection();
        let mut stmt = conn.create_statement(&StatementOptions::new()).unwrap();

        assert!(matches!(
            stmt.execute_query("SELECT nope"),
            Err(DriverError::UnknownStatement(_))
        ));
    }

    #[test]
    fn test_generated_keys_require_capture() {
        let engine = MemoryEngine::new();
        let keys = ScriptedResult::new(id_column(), vec![vec![Value::Int(7)]]);
        engine.script_update("INSERT", 1, Some(keys));

        let mut conn = engine.connection();

        // Without capture the stream is empty.
        let mut stmt = conn.create_statement(&StatementOptions::new()).unwrap();
        stmt.execute_update("INSERT").unwrap();
        let mut stream = stmt.generated_keys().unwrap();
        assert_eq!(stream.next_row().unwrap(), None);

        // With capture the scripted keys come back.
        let options = StatementOptions::new().return_generated_keys(true);
        let mut stmt = conn.create_statement(&options).unwrap();
        stmt.execute_update("INSERT").unwrap();
        let mut stream = stmt.generated_keys().unwrap();
        assert_eq!(stream.next_row().unwrap(), Some(vec![Value::Int(7)]));
    }

    #[test]
    fn test_batch_execution_order() {
        let engine = MemoryEngine::new();
        engine.script_update("U1", 1, None);
        engine.script_update("U2", 2, None);

        let mut conn = engine.connection();
        let mut stmt = conn.create_statement(&StatementOptions::new()).unwrap();
        stmt.add_batch("U1").unwrap();
        stmt.add_batch("U2").unwrap();

        assert_eq!(stmt.execute_batch().unwrap(), vec![1, 2]);
        assert_eq!(
            engine.log(),
            vec![
                ExecutedCommand::Batch("U1".to_string()),
                ExecutedCommand::Batch("U2".to_string()),
                ExecutedCommand::Update("U1".to_string()),
                ExecutedCommand::Update("U2".to_string()),
                ExecutedCommand::ExecuteBatch(2),
            ]
        );
    }

    #[test]
    fn test_closed_statement_errors() {
        let engine = MemoryEngine::new();
        engine.script_update("U1", 1, None);

        let mut conn = engine.connection();
        let mut stmt = conn.create_statement(&StatementOptions::new()).unwrap();
        stmt.close().unwrap();

        assert!(matches!(stmt.execute_update("U1"), Err(DriverError::Closed)));
    }
}
