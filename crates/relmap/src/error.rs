//! Error types for the execution engine.

use relmap_core::CoreError;
use relmap_driver::DriverError;
use thiserror::Error;

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while executing mapped statements.
#[derive(Debug, Error)]
pub enum Error {
    /// Mapping metadata is wrong and must be fixed by the caller.
    ///
    /// Examples: mismatched key-column/key-property counts, an unqualified
    /// key property under a multi-parameter map, or a duplicate cache
    /// namespace registration.
    #[error("configuration error: {0}")]
    Config(String),

    /// A query that required exactly one row returned none.
    #[error("no data found: {0}")]
    NoData(String),

    /// A query that required exactly one row returned more than one.
    #[error("more than one value returned: {0}")]
    TooManyResults(String),

    /// Physical execution or value conversion failed.
    #[error("execution error: {message}")]
    Execution {
        /// What was being executed when the failure occurred.
        message: String,
        /// The underlying failure, when one exists.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A cursor or executor was used in a state that forbids the operation.
    #[error("invalid state: {0}")]
    State(String),

    /// An error reported by the physical driver.
    #[error("driver error")]
    Driver(#[from] DriverError),

    /// An internal lock was poisoned (a thread panicked while holding it).
    #[error("internal lock poisoned: {0}")]
    LockPoisoned(String),
}

impl Error {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an execution error with no underlying cause.
    #[must_use]
    pub fn execution(msg: impl Into<String>) -> Self {
        Self::Execution { message: msg.into(), source: None }
    }

    /// Create an execution error wrapping an underlying cause.
    #[must_use]
    pub fn execution_with(
        msg: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Execution { message: msg.into(), source: Some(Box::new(source)) }
    }

    /// Create an invalid-state error.
    #[must_use]
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Wrap a property-access failure as an execution error.
    ///
    /// Property access failures surface during generated-key assignment and
    /// result mapping, which are execution-time concerns.
    #[must_use]
    pub fn property(context: &str, source: CoreError) -> Self {
        Self::Execution { message: context.to_string(), source: Some(Box::new(source)) }
    }

    /// Returns `true` if this is a configuration error.
    #[must_use]
    pub const fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }

    /// Returns `true` if this is an invalid-state error.
    #[must_use]
    pub const fn is_state(&self) -> bool {
        matches!(self, Self::State(_))
    }

    /// Returns `true` if this is a cardinality error (zero or too many rows).
    #[must_use]
    pub const fn is_cardinality(&self) -> bool {
        matches!(self, Self::NoData(_) | Self::TooManyResults(_))
    }
}
