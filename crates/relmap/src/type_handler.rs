//! Value conversion between database columns and target properties.
//!
//! A [`TypeHandler`] converts one raw column value into the representation a
//! target property expects. Handlers are resolved once per assignment batch
//! from the [`TypeHandlerRegistry`] by the combination of the target's
//! declared type and the column's reported database type.

use std::sync::Arc;

use relmap_core::Value;
use relmap_driver::ColumnType;

use crate::error::{Error, Result};

/// The declared type of an assignment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TargetType {
    /// A signed integer property.
    Integer,
    /// A floating-point property.
    Float,
    /// A boolean property.
    Boolean,
    /// A text property.
    Text,
    /// A binary property.
    Bytes,
    /// No declared type; values pass through unchanged.
    Dynamic,
}

impl TargetType {
    /// Infer a target type from a property's current value.
    ///
    /// Null and structured values give [`TargetType::Dynamic`].
    #[must_use]
    pub const fn of_value(value: &Value) -> Self {
        match value {
            Value::Bool(_) => Self::Boolean,
            Value::Int(_) => Self::Integer,
            Value::Float(_) => Self::Float,
            Value::String(_) => Self::Text,
            Value::Bytes(_) => Self::Bytes,
            Value::Null | Value::Array(_) | Value::Object(_) => Self::Dynamic,
        }
    }
}

/// Converts a raw column value into a target representation.
pub trait TypeHandler: Send + Sync {
    /// Convert one raw value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Execution`] if the value cannot be represented as
    /// the target type.
    fn convert(&self, value: &Value) -> Result<Value>;
}

/// Resolves type handlers by target and column type.
///
/// The default registry covers all [`TargetType`] variants; the column type
/// currently selects no specialized handlers but is part of the resolution
/// key so drivers reporting richer types can be accommodated.
pub struct TypeHandlerRegistry {
    integer: Arc<dyn TypeHandler>,
    float: Arc<dyn TypeHandler>,
    boolean: Arc<dyn TypeHandler>,
    text: Arc<dyn TypeHandler>,
    bytes: Arc<dyn TypeHandler>,
    dynamic: Arc<dyn TypeHandler>,
}

impl TypeHandlerRegistry {
    /// Create a registry with the built-in handlers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            integer: Arc::new(IntegerHandler),
            float: Arc::new(FloatHandler),
            boolean: Arc::new(BooleanHandler),
            text: Arc::new(TextHandler),
            bytes: Arc::new(BytesHandler),
            dynamic: Arc::new(DynamicHandler),
        }
    }

    /// Resolve the handler for a target/column type pair.
    #[must_use]
    pub fn resolve(&self, target: TargetType, _column: ColumnType) -> Arc<dyn TypeHandler> {
        match target {
            TargetType::Integer => Arc::clone(&self.integer),
            TargetType::Float => Arc::clone(&self.float),
            TargetType::Boolean => Arc::clone(&self.boolean),
            TargetType::Text => Arc::clone(&self.text),
            TargetType::Bytes => Arc::clone(&self.bytes),
            TargetType::Dynamic => Arc::clone(&self.dynamic),
        }
    }
}

impl Default for TypeHandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn conversion_error(value: &Value, target: &str) -> Error {
    Error::execution(format!("cannot convert {} value to {target}", value.type_name()))
}

struct IntegerHandler;

impl TypeHandler for IntegerHandler {
    fn convert(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Int(n) => Ok(Value::Int(*n)),
            Value::Bool(b) => Ok(Value::Int(i64::from(*b))),
            Value::Float(f) if f.fract() == 0.0 => Ok(Value::Int(*f as i64)),
            Value::String(s) => s
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| conversion_error(value, "integer")),
            _ => Err(conversion_error(value, "integer")),
        }
    }
}

struct FloatHandler;

impl TypeHandler for FloatHandler {
    fn convert(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Float(f) => Ok(Value::Float(*f)),
            Value::Int(n) => Ok(Value::Float(*n as f64)),
            Value::String(s) => s
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| conversion_error(value, "float")),
            _ => Err(conversion_error(value, "float")),
        }
    }
}

struct BooleanHandler;

impl TypeHandler for BooleanHandler {
    fn convert(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bool(b) => Ok(Value::Bool(*b)),
            Value::Int(n) => Ok(Value::Bool(*n != 0)),
            _ => Err(conversion_error(value, "boolean")),
        }
    }
}

struct TextHandler;

impl TypeHandler for TextHandler {
    fn convert(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::String(s) => Ok(Value::String(s.clone())),
            Value::Int(_) | Value::Float(_) | Value::Bool(_) => {
                Ok(Value::String(value.to_string()))
            }
            _ => Err(conversion_error(value, "text")),
        }
    }
}

struct BytesHandler;

impl TypeHandler for BytesHandler {
    fn convert(&self, value: &Value) -> Result<Value> {
        match value {
            Value::Null => Ok(Value::Null),
            Value::Bytes(b) => Ok(Value::Bytes(b.clone())),
            Value::String(s) => Ok(Value::Bytes(s.clone().into_bytes())),
            _ => Err(conversion_error(value, "bytes")),
        }
    }
}

struct DynamicHandler;

impl TypeHandler for DynamicHandler {
    fn convert(&self, value: &Value) -> Result<Value> {
        Ok(value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> TypeHandlerRegistry {
        TypeHandlerRegistry::new()
    }

    #[test]
    fn test_integer_conversions() {
        let h = registry().resolve(TargetType::Integer, ColumnType::Integer);
        assert_eq!(h.convert(&Value::Int(5)).unwrap(), Value::Int(5));
        assert_eq!(h.convert(&Value::Float(3.0)).unwrap(), Value::Int(3));
        assert_eq!(h.convert(&Value::from("42")).unwrap(), Value::Int(42));
        assert!(h.convert(&Value::Float(3.5)).is_err());
        assert!(h.convert(&Value::from("nope")).is_err());
    }

    #[test]
    fn test_dynamic_passes_through() {
        let h = registry().resolve(TargetType::Dynamic, ColumnType::Null);
        let obj = Value::object([("a", Value::Int(1))]);
        assert_eq!(h.convert(&obj).unwrap(), obj);
    }

    #[test]
    fn test_target_type_inference() {
        assert_eq!(TargetType::of_value(&Value::Int(1)), TargetType::Integer);
        assert_eq!(TargetType::of_value(&Value::from("x")), TargetType::Text);
        assert_eq!(TargetType::of_value(&Value::Null), TargetType::Dynamic);
    }
}
