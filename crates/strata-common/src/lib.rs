//! Strata common types, errors, and configuration.
//!
//! This crate provides shared definitions used across all Strata components.

pub mod config;
pub mod error;
pub mod schema;
pub mod types;

pub use config::{DEFAULT_BUFFER_SIZE, LayoutStrategy, RuntimeConfig};
pub use error::{IndexKind, Result, StrataError};
pub use schema::{Field, Schema, SchemaBuilder};
pub use types::{PrimitiveType, Value};
