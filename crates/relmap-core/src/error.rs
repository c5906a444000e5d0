//! Error types for the core crate.

use thiserror::Error;

/// Errors that can occur when reading or writing [`Value`](crate::Value)
/// properties.
#[derive(Debug, Error)]
pub enum CoreError {
    /// A value type mismatch occurred.
    #[error("type mismatch: expected {expected}, got {actual}")]
    TypeMismatch {
        /// The expected type.
        expected: String,
        /// The actual type.
        actual: String,
    },

    /// A property path referenced a segment that does not exist.
    #[error("no such property '{path}' on value of type {actual}")]
    NoSuchProperty {
        /// The full property path that failed to resolve.
        path: String,
        /// The type of the value the path was resolved against.
        actual: &'static str,
    },

    /// A property was assigned on a value that cannot hold properties.
    ///
    /// Only `Value::Object` accepts property writes; this is the "no setter"
    /// failure mode for every other variant.
    #[error("no setter for property '{path}' on value of type {actual}")]
    NoSetter {
        /// The property path that was being assigned.
        path: String,
        /// The type of the value the write was attempted on.
        actual: &'static str,
    },
}

impl CoreError {
    /// Creates a type mismatch error.
    #[must_use]
    pub fn type_mismatch(expected: impl Into<String>, actual: impl Into<String>) -> Self {
        Self::TypeMismatch { expected: expected.into(), actual: actual.into() }
    }
}
