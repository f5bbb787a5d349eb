//! Error types for Strata.

use thiserror::Error;

/// Result type alias using StrataError.
pub type Result<T> = std::result::Result<T, StrataError>;

/// Which dimension of a layout an out-of-bounds index refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// A record (row) index.
    Record,
    /// A field (column) index.
    Field,
}

impl std::fmt::Display for IndexKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IndexKind::Record => write!(f, "record"),
            IndexKind::Field => write!(f, "field"),
        }
    }
}

/// Errors that can occur in Strata operations.
#[derive(Debug, Error)]
pub enum StrataError {
    // Layout errors
    #[error("Schema too large: record of {record_size} bytes does not fit in a {buffer_size} byte buffer")]
    SchemaTooLarge {
        record_size: usize,
        buffer_size: usize,
    },

    #[error("Buffer too small: layout expects {expected} bytes, buffer has {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    #[error("Buffer full: capacity of {capacity} records reached")]
    BufferFull { capacity: usize },

    #[error("Index out of bounds: {kind} index {index} (bound {bound})")]
    IndexOutOfBounds {
        kind: IndexKind,
        index: usize,
        bound: usize,
    },

    #[error("Buffer is shared, exclusive access required for writing")]
    BufferShared,

    #[error("Compression error: {0}")]
    CompressionError(String),

    // Buffer pool errors
    #[error("Buffer pool exhausted, no free buffer available")]
    BufferPoolExhausted,

    #[error("Timed out after {millis} ms waiting for a buffer")]
    BufferTimeout { millis: u64 },

    // Type errors
    #[error("Type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: String, actual: String },

    #[error("Arity mismatch: schema has {expected} fields, record has {actual}")]
    ArityMismatch { expected: usize, actual: usize },

    #[error("Field not found: {0}")]
    FieldNotFound(String),

    // Configuration errors
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },

    // Internal errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl StrataError {
    /// Shorthand for a record index that is past its bound.
    pub fn record_out_of_bounds(index: usize, bound: usize) -> Self {
        StrataError::IndexOutOfBounds {
            kind: IndexKind::Record,
            index,
            bound,
        }
    }

    /// Shorthand for a field index that is past the schema width.
    pub fn field_out_of_bounds(index: usize, bound: usize) -> Self {
        StrataError::IndexOutOfBounds {
            kind: IndexKind::Field,
            index,
            bound,
        }
    }

    /// Returns true for conditions an operator is expected to recover from.
    ///
    /// A full buffer is rotated for a fresh one; an exhausted pool can be
    /// retried once buffers are released.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            StrataError::BufferFull { .. }
                | StrataError::BufferPoolExhausted
                | StrataError::BufferTimeout { .. }
        )
    }
}
