//! Generated-key reconciliation.
//!
//! A [`KeyGenerator`] assigns database-generated key values back onto the
//! caller's parameter objects around the execution of a mutating statement.
//! The strategies form a closed set, dispatched by pattern match: no
//! generation, driver-returned keys (post-execution only), and a secondary
//! select-key statement runnable in either phase.

use std::sync::Arc;

use relmap_core::Value;
use relmap_driver::{RowStream, SharedTransaction, Statement};
use tracing::debug;

use crate::config::Configuration;
use crate::error::{Error, Result};
use crate::mapping::MappedStatement;
use crate::parameter::{write, ParamObject, Parameter};
use crate::row_bounds::RowBounds;
use crate::type_handler::{TargetType, TypeHandler};

use super::simple::SimpleExecutor;
use super::Executor;

/// How database-generated keys reach the caller's parameters.
#[derive(Debug, Clone, Default)]
pub enum KeyGenerator {
    /// No key generation.
    #[default]
    None,
    /// Keys reported by the driver after execution.
    DriverReturned,
    /// Keys produced by a secondary mapped statement.
    SelectKey {
        /// The key-producing statement; its own key properties and columns
        /// drive the assignment.
        statement: Arc<MappedStatement>,
        /// Run before the owning statement instead of after it.
        before: bool,
    },
}

impl KeyGenerator {
    /// A select-key generator over the given statement.
    #[must_use]
    pub fn select_key(statement: Arc<MappedStatement>, before: bool) -> Self {
        Self::SelectKey { statement, before }
    }

    /// Returns `true` if execution must request driver key capture.
    #[must_use]
    pub const fn captures_driver_keys(&self) -> bool {
        matches!(self, Self::DriverReturned)
    }

    /// The pre-execution phase, invoked by the executor.
    pub(crate) fn process_before(
        &self,
        configuration: &Arc<Configuration>,
        transaction: &SharedTransaction,
        parameter: &Parameter,
    ) -> Result<()> {
        if let Self::SelectKey { statement, before: true } = self {
            run_select_key(configuration, transaction, statement, parameter)?;
        }
        Ok(())
    }

    /// The post-execution phase, invoked by the statement handler.
    ///
    /// `stmt` is the just-executed physical statement, when one is live; the
    /// driver-returned strategy reads its generated-keys stream.
    pub(crate) fn process_after(
        &self,
        configuration: &Arc<Configuration>,
        transaction: &SharedTransaction,
        ms: &MappedStatement,
        parameter: &Parameter,
        stmt: Option<&mut dyn Statement>,
    ) -> Result<()> {
        match self {
            Self::None => Ok(()),
            Self::DriverReturned => match stmt {
                Some(stmt) => assign_driver_keys(
                    configuration,
                    ms,
                    std::slice::from_ref(parameter),
                    stmt,
                ),
                None => Ok(()),
            },
            Self::SelectKey { statement, before } => {
                if !*before {
                    run_select_key(configuration, transaction, statement, parameter)?;
                }
                Ok(())
            }
        }
    }

    /// The post-execution phase for a drained batch.
    ///
    /// Driver-returned keys accumulate across the whole batch and are
    /// assigned positionally over all enqueued parameters.
    pub(crate) fn process_batch(
        &self,
        configuration: &Arc<Configuration>,
        transaction: &SharedTransaction,
        ms: &MappedStatement,
        parameters: &[Parameter],
        stmt: &mut dyn Statement,
    ) -> Result<()> {
        match self {
            Self::None => Ok(()),
            Self::DriverReturned => assign_driver_keys(configuration, ms, parameters, stmt),
            Self::SelectKey { statement, before } => {
                if !*before {
                    for parameter in parameters {
                        run_select_key(configuration, transaction, statement, parameter)?;
                    }
                }
                Ok(())
            }
        }
    }
}

// ===== Driver-returned keys =====

/// One parameter's share of a key assignment batch.
struct AssignPlan {
    target: ParamObject,
    properties: Vec<String>,
}

fn assign_driver_keys(
    configuration: &Arc<Configuration>,
    ms: &MappedStatement,
    parameters: &[Parameter],
    stmt: &mut dyn Statement,
) -> Result<()> {
    let properties = ms.key_properties();
    if properties.is_empty() {
        return Ok(());
    }

    let mut stream = stmt.generated_keys()?;
    let outcome = assign_from_stream(configuration, ms, properties, parameters, stream.as_mut());
    // The generated-keys stream is always released, errors suppressed.
    let _ = stream.close();
    outcome
}

fn assign_from_stream(
    configuration: &Arc<Configuration>,
    ms: &MappedStatement,
    properties: &[String],
    parameters: &[Parameter],
    stream: &mut dyn RowStream,
) -> Result<()> {
    let columns = stream.columns().to_vec();
    if columns.len() < properties.len() {
        // Not enough columns to disambiguate; nothing is assigned.
        return Ok(());
    }

    let mut rows = Vec::new();
    while let Some(row) = stream.next_row()? {
        rows.push(row);
    }
    if rows.is_empty() {
        return Ok(());
    }
    debug!(statement = ms.id(), keys = rows.len(), "assigning driver-returned keys");

    let mut plans = Vec::with_capacity(parameters.len());
    for parameter in parameters {
        plans.push(plan_for(parameter, properties)?);
    }

    let registry = configuration.type_handlers();
    let mut next_row = 0usize;
    'plans: for plan in &plans {
        let mut target = write(&plan.target)?;
        let handlers: Vec<Arc<dyn TypeHandler>> = {
            let sample = match &*target {
                Value::Array(items) => items.first().unwrap_or(&Value::Null),
                other => other,
            };
            plan.properties
                .iter()
                .enumerate()
                .map(|(i, prop)| {
                    let declared = sample
                        .get_property(prop)
                        .map_or(TargetType::Dynamic, TargetType::of_value);
                    registry.resolve(declared, columns[i].column_type)
                })
                .collect()
        };
        match &mut *target {
            Value::Array(items) => {
                for item in items {
                    if next_row >= rows.len() {
                        break 'plans;
                    }
                    assign_key_row(item, &rows[next_row], &plan.properties, &handlers)?;
                    next_row += 1;
                }
            }
            single => {
                if next_row >= rows.len() {
                    break 'plans;
                }
                assign_key_row(single, &rows[next_row], &plan.properties, &handlers)?;
                next_row += 1;
            }
        }
    }

    if next_row < rows.len() {
        return Err(Error::execution(format!(
            "statement '{}' generated {} key rows for {} parameter slots",
            ms.id(),
            rows.len(),
            next_row
        )));
    }
    Ok(())
}

/// Resolve which object a parameter's keys land on, with the effective
/// (unqualified) property names.
fn plan_for(parameter: &Parameter, properties: &[String]) -> Result<AssignPlan> {
    if let Some(sole) = parameter.sole() {
        return Ok(AssignPlan { target: sole, properties: properties.to_vec() });
    }

    // No sole parameter: every key property must name the same entry.
    let mut name: Option<&str> = None;
    let mut stripped = Vec::with_capacity(properties.len());
    for property in properties {
        let Some((qualifier, rest)) = property.split_once('.') else {
            return Err(Error::config(format!(
                "key property '{property}' must be qualified as <param>.<property> \
                 when multiple parameters are supplied"
            )));
        };
        match name {
            None => name = Some(qualifier),
            Some(n) if n != qualifier => {
                return Err(Error::config(format!(
                    "key properties reference different parameters ('{n}' and '{qualifier}')"
                )));
            }
            Some(_) => {}
        }
        stripped.push(rest.to_string());
    }
    let name = name
        .ok_or_else(|| Error::config("no key properties to qualify".to_string()))?;
    let target = parameter.named(name).ok_or_else(|| {
        Error::execution(format!("no parameter named '{name}' to receive generated keys"))
    })?;
    Ok(AssignPlan { target, properties: stripped })
}

/// Assign one generated-key row onto one target element, by position.
fn assign_key_row(
    target: &mut Value,
    row: &[Value],
    properties: &[String],
    handlers: &[Arc<dyn TypeHandler>],
) -> Result<()> {
    for (i, property) in properties.iter().enumerate() {
        let converted = handlers[i].convert(&row[i])?;
        target
            .set_property(property, converted)
            .map_err(|e| Error::property(&format!("assigning generated key '{property}'"), e))?;
    }
    Ok(())
}

// ===== Select-key =====

fn run_select_key(
    configuration: &Arc<Configuration>,
    transaction: &SharedTransaction,
    key_statement: &Arc<MappedStatement>,
    parameter: &Parameter,
) -> Result<()> {
    let properties = key_statement.key_properties();
    if properties.is_empty() {
        return Ok(());
    }
    debug!(statement = key_statement.id(), "running select-key statement");

    // A fresh sub-execution over the caller's transaction. The owning
    // execution keeps responsibility for closing the transaction.
    let mut executor =
        SimpleExecutor::new(Arc::clone(configuration), Arc::clone(transaction));
    let mut rows =
        executor.query(key_statement, parameter.clone(), RowBounds::default())?;

    let row = match rows.len() {
        0 => {
            return Err(Error::NoData(format!(
                "select-key statement '{}' returned no data",
                key_statement.id()
            )))
        }
        1 => rows.remove(0),
        n => {
            return Err(Error::TooManyResults(format!(
                "select-key statement '{}' returned {n} rows",
                key_statement.id()
            )))
        }
    };

    let columns = key_statement.key_columns();
    if properties.len() == 1 {
        let property = &properties[0];
        // A same-named field on the result wins; otherwise the whole row is
        // the key value.
        let value = row.get_property(property).cloned().unwrap_or(row);
        set_on_parameter(parameter, property, value)
    } else if columns.is_empty() {
        for property in properties {
            let value = row.get_property(property).cloned().ok_or_else(|| {
                Error::execution(format!(
                    "select-key result of '{}' has no property '{property}'",
                    key_statement.id()
                ))
            })?;
            set_on_parameter(parameter, property, value)?;
        }
        Ok(())
    } else {
        if columns.len() != properties.len() {
            return Err(Error::config(format!(
                "select-key statement '{}': {} key columns for {} key properties",
                key_statement.id(),
                columns.len(),
                properties.len()
            )));
        }
        for (column, property) in columns.iter().zip(properties) {
            let value = row.get_property(column).cloned().ok_or_else(|| {
                Error::execution(format!(
                    "select-key result of '{}' has no column '{column}'",
                    key_statement.id()
                ))
            })?;
            set_on_parameter(parameter, property, value)?;
        }
        Ok(())
    }
}

fn set_on_parameter(parameter: &Parameter, property: &str, value: Value) -> Result<()> {
    if let Some(sole) = parameter.sole() {
        write(&sole)?
            .set_property(property, value)
            .map_err(|e| Error::property(&format!("assigning key property '{property}'"), e))
    } else {
        parameter.set_property(property, value)
    }
}
