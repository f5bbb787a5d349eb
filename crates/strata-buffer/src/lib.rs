//! Tuple buffer management for Strata.
//!
//! This crate provides the memory that records are laid out in:
//! - Fixed-capacity, reference-counted tuple buffers with record metadata
//! - A preallocated pool of equally sized buffers
//! - Blocking, non-blocking and timed acquisition
//! - Automatic return to the pool when the last handle is dropped

mod buffer;
mod pool;
mod provider;

pub use buffer::TupleBuffer;
pub use pool::{BufferManager, BufferManagerConfig, BufferManagerStats};
pub use provider::BufferProvider;
