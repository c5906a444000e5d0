//! Core types for `relmap`.
//!
//! This crate provides the dynamic [`Value`] model shared by every layer of
//! the engine: result rows, caller parameter objects, cache-key components,
//! and generated-key values all travel as [`Value`]s.
//!
//! # Example
//!
//! ```
//! use relmap_core::Value;
//!
//! let mut user = Value::object([("name", Value::from("Alice"))]);
//! user.set_property("id", Value::from(42i64)).unwrap();
//!
//! assert_eq!(user.get_property("id"), Some(&Value::Int(42)));
//! assert_eq!(user.get_property("name").and_then(Value::as_str), Some("Alice"));
//! ```

pub mod error;
pub mod types;

pub use error::CoreError;
pub use types::Value;
