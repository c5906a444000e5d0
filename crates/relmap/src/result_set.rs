//! Mapping raw result streams into values.

use std::collections::BTreeMap;
use std::sync::Arc;

use relmap_core::Value;
use relmap_driver::{ColumnInfo, RowStream};

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::mapping::ResultMap;
use crate::row_bounds::RowBounds;

/// Turns raw rows into mapped [`Value`]s.
///
/// Used in two modes: full materialization for eager queries, and a one-row
/// pull for cursors, which stops the underlying row-walk immediately after
/// each mapped row.
#[derive(Clone)]
pub struct ResultSetHandler {
    configuration: Arc<Configuration>,
}

impl ResultSetHandler {
    /// Create a handler over the given configuration.
    #[must_use]
    pub fn new(configuration: Arc<Configuration>) -> Self {
        Self { configuration }
    }

    /// Materialize every row within the window, in stream order.
    ///
    /// # Errors
    ///
    /// Returns a driver error if fetching fails, or an execution error if a
    /// mapped column cannot be converted.
    pub fn handle_results(
        &self,
        stream: &mut dyn RowStream,
        result_map: &ResultMap,
        bounds: &RowBounds,
    ) -> Result<Vec<Value>> {
        let columns = stream.columns().to_vec();
        let mut results = Vec::new();
        let mut index = 0usize;
        while let Some(row) = stream.next_row()? {
            if index < bounds.offset {
                index += 1;
                continue;
            }
            if results.len() >= bounds.limit {
                break;
            }
            results.push(self.map_row(&columns, row, result_map)?);
            index += 1;
        }
        Ok(results)
    }

    /// Pull and map exactly one row, or `None` if the stream is exhausted.
    ///
    /// # Errors
    ///
    /// Returns a driver error if fetching fails, or an execution error if a
    /// mapped column cannot be converted.
    pub fn fetch_one(
        &self,
        stream: &mut dyn RowStream,
        result_map: &ResultMap,
    ) -> Result<Option<Value>> {
        let columns = stream.columns().to_vec();
        match stream.next_row()? {
            Some(row) => Ok(Some(self.map_row(&columns, row, result_map)?)),
            None => Ok(None),
        }
    }

    fn map_row(
        &self,
        columns: &[ColumnInfo],
        row: Vec<Value>,
        result_map: &ResultMap,
    ) -> Result<Value> {
        if result_map.mappings.is_empty() {
            // Auto-map: a lone column is a scalar row, otherwise an object
            // keyed by column name.
            if columns.len() == 1 {
                return Ok(row.into_iter().next().unwrap_or(Value::Null));
            }
            let mut object = BTreeMap::new();
            for (column, value) in columns.iter().zip(row) {
                object.insert(column.name.clone(), value);
            }
            return Ok(Value::Object(object));
        }

        let registry = self.configuration.type_handlers();
        let mut target = Value::Object(BTreeMap::new());
        for mapping in &result_map.mappings {
            let Some(idx) = columns.iter().position(|c| c.name == mapping.column) else {
                // Unmatched columns leave the property unset.
                continue;
            };
            let handler = registry.resolve(mapping.target_type, columns[idx].column_type);
            let converted = handler.convert(&row[idx])?;
            set_creating(&mut target, &mapping.property, converted)?;
        }
        Ok(target)
    }
}

/// Write a dotted property, creating intermediate objects as needed.
fn set_creating(target: &mut Value, path: &str, value: Value) -> Result<()> {
    let mut current = target;
    let mut segments = path.split('.').peekable();
    while let Some(segment) = segments.next() {
        let Value::Object(map) = current else {
            return Err(Error::execution(format!(
                "cannot map property '{path}' onto a {} value",
                current.type_name()
            )));
        };
        if segments.peek().is_none() {
            map.insert(segment.to_string(), value);
            return Ok(());
        }
        current = map
            .entry(segment.to_string())
            .or_insert_with(|| Value::Object(BTreeMap::new()));
    }
    Ok(())
}
