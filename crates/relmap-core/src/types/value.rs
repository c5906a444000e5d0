//! Dynamic values for rows, parameters, and cache keys.
//!
//! This module provides the [`Value`] enum, the single representation used
//! for result rows, caller parameter objects, and cache-key components.
//!
//! # Example
//!
//! ```
//! use relmap_core::Value;
//!
//! // Create values via From trait
//! let name: Value = "Alice".into();
//! let age: Value = 30i64.into();
//! let active: Value = true.into();
//!
//! // Access typed values
//! assert_eq!(name.as_str(), Some("Alice"));
//! assert_eq!(age.as_int(), Some(30));
//! assert_eq!(active.as_bool(), Some(true));
//! ```

use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// A dynamic value.
///
/// Rows produced by the result-mapping layer are `Object` values keyed by
/// property name; scalar single-column results are plain variants. Parameter
/// objects use the same shape, which is what lets generated keys be written
/// back through [`Value::set_property`].
///
/// # Supported Types
///
/// | Variant | Rust Type | Use Case |
/// |---------|-----------|----------|
/// | `Null` | - | SQL NULL / missing values |
/// | `Bool` | `bool` | Boolean columns |
/// | `Int` | `i64` | Integer columns, generated keys |
/// | `Float` | `f64` | Numeric measurements |
/// | `String` | `String` | Text data |
/// | `Bytes` | `Vec<u8>` | Binary data |
/// | `Array` | `Vec<Value>` | Multi-row parameter sequences |
/// | `Object` | `BTreeMap<String, Value>` | Mapped rows, parameter objects |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Value {
    /// The absence of a value (SQL NULL).
    Null,
    /// A boolean value.
    Bool(bool),
    /// A 64-bit signed integer.
    Int(i64),
    /// A 64-bit floating point number.
    Float(f64),
    /// A UTF-8 string.
    String(String),
    /// Raw binary data.
    Bytes(Vec<u8>),
    /// An ordered list of values.
    Array(Vec<Value>),
    /// A property-bearing object.
    Object(BTreeMap<String, Value>),
}

impl Value {
    /// Create an object value from an iterator of `(name, value)` pairs.
    #[must_use]
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// Returns `true` if this value is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Get the value as a boolean if it is one.
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get the value as an integer if it is one.
    #[must_use]
    pub const fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(n) => Some(*n),
            _ => None,
        }
    }

    /// Get the value as a float if it is one.
    #[must_use]
    pub const fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Get the value as a string slice if it is one.
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Get the value as a byte slice if it is one.
    #[must_use]
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::Bytes(b) => Some(b),
            _ => None,
        }
    }

    /// Get the value as an array slice if it is one.
    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Get the value as an object map if it is one.
    #[must_use]
    pub const fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(map) => Some(map),
            _ => None,
        }
    }

    /// The name of this value's type, for error messages.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }

    /// Read a property by (possibly dotted) path.
    ///
    /// A path like `"user.id"` navigates nested objects segment by segment.
    /// Returns `None` if any segment is missing or a non-object is reached
    /// before the final segment.
    #[must_use]
    pub fn get_property(&self, path: &str) -> Option<&Value> {
        let mut current = self;
        for segment in path.split('.') {
            current = current.as_object()?.get(segment)?;
        }
        Some(current)
    }

    /// Returns `true` if [`Value::set_property`] would succeed for `path`.
    ///
    /// The final segment is always writable on an object (objects are open
    /// maps), so this only checks that every intermediate segment resolves
    /// to an object and that the write target itself is an object.
    #[must_use]
    pub fn can_set_property(&self, path: &str) -> bool {
        let mut current = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                return current.as_object().is_some() && !segment.is_empty();
            }
            match current.as_object().and_then(|map| map.get(segment)) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    /// Write a property by (possibly dotted) path.
    ///
    /// The final segment is inserted or overwritten on the target object.
    /// Intermediate segments must already exist and be objects.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NoSetter`] if the write target is not an object,
    /// and [`CoreError::NoSuchProperty`] if an intermediate segment is
    /// missing.
    pub fn set_property(&mut self, path: &str, value: Value) -> Result<(), CoreError> {
        let own_type = self.type_name();
        let mut current = self;
        let mut segments = path.split('.').peekable();
        while let Some(segment) = segments.next() {
            if segments.peek().is_none() {
                return match current {
                    Value::Object(map) => {
                        map.insert(segment.to_string(), value);
                        Ok(())
                    }
                    other => Err(CoreError::NoSetter {
                        path: path.to_string(),
                        actual: other.type_name(),
                    }),
                };
            }
            current = match current {
                Value::Object(map) => match map.get_mut(segment) {
                    Some(next) => next,
                    None => {
                        return Err(CoreError::NoSuchProperty {
                            path: path.to_string(),
                            actual: "object",
                        })
                    }
                },
                other => {
                    return Err(CoreError::NoSetter {
                        path: path.to_string(),
                        actual: other.type_name(),
                    })
                }
            };
        }
        Err(CoreError::NoSuchProperty { path: path.to_string(), actual: own_type })
    }
}

// Equality treats floats by bit pattern so that `Value` can serve as a hash
// map key (cache keys compare component lists for equality).
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Bytes(a), Self::Bytes(b)) => a == b,
            (Self::Array(a), Self::Array(b)) => a == b,
            (Self::Object(a), Self::Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(n) => n.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::String(s) => s.hash(state),
            Self::Bytes(b) => b.hash(state),
            Self::Array(items) => {
                items.len().hash(state);
                for item in items {
                    item.hash(state);
                }
            }
            Self::Object(map) => {
                map.len().hash(state);
                for (k, v) in map {
                    k.hash(state);
                    v.hash(state);
                }
            }
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Self::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Self::Int(i64::from(n))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Self::Bytes(b)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self::Object(map)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(n) => write!(f, "{n}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Bytes(b) => write!(f, "<{} bytes>", b.len()),
            Self::Array(items) => write!(f, "[{} items]", items.len()),
            Self::Object(map) => write!(f, "{{{} properties}}", map.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accessors() {
        assert_eq!(Value::from(42i64).as_int(), Some(42));
        assert_eq!(Value::from(2.5f64).as_float(), Some(2.5));
        assert_eq!(Value::from("hi").as_str(), Some("hi"));
        assert_eq!(Value::from(true).as_bool(), Some(true));
        assert!(Value::Null.is_null());
        assert_eq!(Value::from("hi").as_int(), None);
    }

    #[test]
    fn test_get_property_dotted() {
        let user = Value::object([("id", Value::from(7i64))]);
        let wrapper = Value::object([("user", user)]);

        assert_eq!(wrapper.get_property("user.id"), Some(&Value::Int(7)));
        assert_eq!(wrapper.get_property("user.missing"), None);
        assert_eq!(wrapper.get_property("missing.id"), None);
    }

    #[test]
    fn test_set_property_inserts_and_overwrites() {
        let mut user = Value::object([("name", Value::from("Alice"))]);
        user.set_property("id", Value::from(1i64)).unwrap();
        user.set_property("id", Value::from(2i64)).unwrap();

        assert_eq!(user.get_property("id"), Some(&Value::Int(2)));
    }

    #[test]
    fn test_set_property_dotted() {
        let mut wrapper = Value::object([("user", Value::object([("name", Value::from("Bob"))]))]);
        wrapper.set_property("user.id", Value::from(9i64)).unwrap();

        assert_eq!(wrapper.get_property("user.id"), Some(&Value::Int(9)));
    }

    #[test]
    fn test_set_property_no_setter() {
        let mut scalar = Value::from(5i64);
        let err = scalar.set_property("id", Value::from(1i64)).unwrap_err();

        assert!(matches!(err, CoreError::NoSetter { .. }));
    }

    #[test]
    fn test_can_set_property() {
        let user = Value::object([("profile", Value::object([("city", Value::from("x"))]))]);

        assert!(user.can_set_property("id"));
        assert!(user.can_set_property("profile.zip"));
        assert!(!user.can_set_property("missing.zip"));
        assert!(!Value::from(1i64).can_set_property("id"));
    }

    #[test]
    fn test_float_equality_by_bits() {
        assert_eq!(Value::from(1.5f64), Value::from(1.5f64));
        assert_ne!(Value::from(1.5f64), Value::from(2.5f64));
        // NaN is equal to itself under bit comparison, keeping Eq lawful.
        assert_eq!(Value::from(f64::NAN), Value::from(f64::NAN));
    }

    #[test]
    fn test_serde_round_trip() {
        let value = Value::object([
            ("id", Value::Int(1)),
            ("name", Value::from("Ada")),
            ("tags", Value::Array(vec![Value::from("a"), Value::from("b")])),
        ]);

        let json = serde_json::to_string(&value).unwrap();
        let back: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_hash_consistency() {
        use std::collections::hash_map::DefaultHasher;

        let hash = |v: &Value| {
            let mut h = DefaultHasher::new();
            v.hash(&mut h);
            h.finish()
        };

        assert_eq!(hash(&Value::from(42i64)), hash(&Value::from(42i64)));
        assert_ne!(hash(&Value::from(42i64)), hash(&Value::from(43i64)));
    }
}
