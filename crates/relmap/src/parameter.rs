//! Caller parameter objects.
//!
//! A statement executes against either nothing, a single parameter object,
//! or a named multi-parameter map. Parameter objects are shared mutable
//! [`Value`]s so that generated keys and select-key results can be written
//! back onto what the caller still holds.

use std::sync::{Arc, RwLock};

use relmap_core::Value;

use crate::error::{Error, Result};

/// A shared, mutable parameter object.
pub type ParamObject = Arc<RwLock<Value>>;

/// Wrap a value as a shared parameter object.
#[must_use]
pub fn param(value: Value) -> ParamObject {
    Arc::new(RwLock::new(value))
}

/// The parameter supplied to a statement execution.
#[derive(Debug, Clone, Default)]
pub enum Parameter {
    /// No parameter.
    #[default]
    None,
    /// A single parameter object.
    Object(ParamObject),
    /// A named multi-parameter map, in declaration order.
    Map(Vec<(String, ParamObject)>),
}

impl Parameter {
    /// Create a single-object parameter.
    #[must_use]
    pub fn object(value: Value) -> Self {
        Self::Object(param(value))
    }

    /// Create a multi-parameter map from named entries.
    #[must_use]
    pub fn map<K: Into<String>, I: IntoIterator<Item = (K, ParamObject)>>(entries: I) -> Self {
        Self::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// The sole effective parameter object, if one exists.
    ///
    /// A plain object is its own sole parameter. A map has a sole parameter
    /// only when every entry references the same object.
    #[must_use]
    pub fn sole(&self) -> Option<ParamObject> {
        match self {
            Self::None => None,
            Self::Object(obj) => Some(Arc::clone(obj)),
            Self::Map(entries) => {
                let (_, first) = entries.first()?;
                if entries.iter().all(|(_, obj)| Arc::ptr_eq(first, obj)) {
                    Some(Arc::clone(first))
                } else {
                    None
                }
            }
        }
    }

    /// Look up a named entry in a multi-parameter map.
    #[must_use]
    pub fn named(&self, name: &str) -> Option<ParamObject> {
        match self {
            Self::Map(entries) => entries
                .iter()
                .find(|(entry_name, _)| entry_name == name)
                .map(|(_, obj)| Arc::clone(obj)),
            _ => None,
        }
    }

    /// Read a property from the parameter by (possibly dotted) path.
    ///
    /// On a map, the first path segment names the entry.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if a parameter lock is poisoned.
    pub fn get_property(&self, path: &str) -> Result<Option<Value>> {
        match self {
            Self::None => Ok(None),
            Self::Object(obj) => {
                let value = read(obj)?;
                Ok(value.get_property(path).cloned())
            }
            Self::Map(_) => {
                let (name, rest) = split_qualifier(path);
                let Some(obj) = self.named(name) else {
                    return Ok(None);
                };
                let value = read(&obj)?;
                match rest {
                    Some(rest) => Ok(value.get_property(rest).cloned()),
                    None => Ok(Some(value.clone())),
                }
            }
        }
    }

    /// Write a property on the parameter by (possibly dotted) path.
    ///
    /// On a map, the path must be qualified as `<name>.<property>`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for an unqualified path on a map or a
    /// missing named entry, and [`Error::Execution`] when the target value
    /// has no setter for the property.
    pub fn set_property(&self, path: &str, value: Value) -> Result<()> {
        match self {
            Self::None => Err(Error::execution(format!(
                "cannot assign property '{path}': no parameter was supplied"
            ))),
            Self::Object(obj) => {
                let mut target = write(obj)?;
                target
                    .set_property(path, value)
                    .map_err(|e| Error::property(&format!("assigning property '{path}'"), e))
            }
            Self::Map(_) => {
                let (name, rest) = split_qualifier(path);
                let Some(rest) = rest else {
                    return Err(Error::config(format!(
                        "property '{path}' must be qualified as <param>.<property> \
                         on a multi-parameter map"
                    )));
                };
                let obj = self.named(name).ok_or_else(|| {
                    Error::config(format!("no parameter named '{name}' for property '{path}'"))
                })?;
                let mut target = write(&obj)?;
                target
                    .set_property(rest, value)
                    .map_err(|e| Error::property(&format!("assigning property '{path}'"), e))
            }
        }
    }

    /// Snapshot the parameter values in order, for cache-key construction.
    ///
    /// # Errors
    ///
    /// Returns [`Error::LockPoisoned`] if a parameter lock is poisoned.
    pub fn values(&self) -> Result<Vec<Value>> {
        match self {
            Self::None => Ok(Vec::new()),
            Self::Object(obj) => Ok(vec![read(obj)?.clone()]),
            Self::Map(entries) => {
                let mut values = Vec::with_capacity(entries.len());
                for (_, obj) in entries {
                    values.push(read(obj)?.clone());
                }
                Ok(values)
            }
        }
    }
}

/// Split a path into its qualifying first segment and the remainder.
fn split_qualifier(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((name, rest)) => (name, Some(rest)),
        None => (path, None),
    }
}

pub(crate) fn read(obj: &ParamObject) -> Result<std::sync::RwLockReadGuard<'_, Value>> {
    obj.read().map_err(|_| Error::LockPoisoned("parameter object".to_string()))
}

pub(crate) fn write(obj: &ParamObject) -> Result<std::sync::RwLockWriteGuard<'_, Value>> {
    obj.write().map_err(|_| Error::LockPoisoned("parameter object".to_string()))
}
