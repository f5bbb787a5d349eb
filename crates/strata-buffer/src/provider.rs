//! Buffer acquisition trait.

use crate::buffer::TupleBuffer;
use strata_common::Result;

/// Source of tuple buffers for operators.
///
/// Operators depend on this trait rather than on a concrete pool so that
/// tests and network receivers can supply buffers of their own.
pub trait BufferProvider: Send + Sync {
    /// Returns the size of the buffers this provider hands out by default.
    fn buffer_size(&self) -> usize;

    /// Returns a buffer of at least `min_size` bytes, waiting if necessary.
    fn acquire_buffer(&self, min_size: usize) -> Result<TupleBuffer>;

    /// Returns a buffer of at least `min_size` bytes without waiting.
    fn try_acquire_buffer(&self, min_size: usize) -> Result<TupleBuffer>;
}
