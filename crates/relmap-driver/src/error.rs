//! Error types for the driver contract.

use thiserror::Error;

/// Errors that can occur inside a driver implementation.
#[derive(Debug, Error)]
pub enum DriverError {
    /// The driver has no answer for the given SQL text.
    #[error("unknown statement: {0}")]
    UnknownStatement(String),

    /// A statement or stream was used after being closed.
    #[error("driver resource is closed")]
    Closed,

    /// The connection could not be obtained or has failed.
    #[error("connection error: {0}")]
    Connection(String),

    /// The driver does not support the requested operation.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// An internal lock was poisoned (a thread panicked while holding it).
    #[error("internal lock poisoned: {0}")]
    LockPoisoned(String),
}

impl DriverError {
    /// Create a connection error.
    #[must_use]
    pub fn connection(msg: impl Into<String>) -> Self {
        Self::Connection(msg.into())
    }

    /// Create an unsupported-operation error.
    #[must_use]
    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported(msg.into())
    }
}
