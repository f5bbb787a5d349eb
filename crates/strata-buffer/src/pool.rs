//! Fixed-size tuple buffer pool.

use crate::buffer::{BufferMemory, TupleBuffer};
use crate::provider::BufferProvider;
use parking_lot::{Condvar, Mutex};
use std::sync::Arc;
use std::time::{Duration, Instant};
use strata_common::{DEFAULT_BUFFER_SIZE, Result, RuntimeConfig, StrataError};
use sysinfo::System;
use tracing::{debug, trace, warn};

/// Configuration for the buffer manager.
#[derive(Debug, Clone)]
pub struct BufferManagerConfig {
    /// Size of every pooled buffer in bytes.
    pub buffer_size: usize,
    /// Number of buffers in the pool.
    pub num_buffers: usize,
}

impl Default for BufferManagerConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            num_buffers: 1024,
        }
    }
}

impl From<&RuntimeConfig> for BufferManagerConfig {
    fn from(config: &RuntimeConfig) -> Self {
        Self {
            buffer_size: config.buffer_size,
            num_buffers: config.num_pooled_buffers,
        }
    }
}

/// State shared between the manager and every pooled buffer it handed out.
pub(crate) struct PoolShared {
    buffer_size: usize,
    free_list: Mutex<Vec<BufferMemory>>,
    available: Condvar,
}

impl PoolShared {
    /// Returns released memory to the free list and wakes one waiter.
    pub(crate) fn recycle(&self, memory: BufferMemory) {
        debug_assert_eq!(memory.len(), self.buffer_size);
        let mut free_list = self.free_list.lock();
        free_list.push(memory);
        trace!(available = free_list.len(), "buffer returned to pool");
        drop(free_list);
        self.available.notify_one();
    }
}

/// Buffer manager.
///
/// Owns a fixed number of equally sized buffers:
/// - Blocking, non-blocking and timed acquisition
/// - Automatic return to the pool when the last handle is dropped
/// - Unpooled buffers for requests larger than the pooled size
///
/// Buffers still in flight when the manager is dropped are freed instead of
/// returned.
pub struct BufferManager {
    /// Configuration.
    config: BufferManagerConfig,
    shared: Arc<PoolShared>,
}

impl BufferManager {
    /// Creates a buffer manager and preallocates every buffer.
    pub fn new(config: BufferManagerConfig) -> Result<Self> {
        if config.buffer_size == 0 {
            return Err(StrataError::InvalidParameter {
                name: "buffer_size".to_string(),
                value: "0".to_string(),
            });
        }
        if config.num_buffers == 0 {
            return Err(StrataError::InvalidParameter {
                name: "num_buffers".to_string(),
                value: "0".to_string(),
            });
        }

        let free_list: Vec<_> = (0..config.num_buffers)
            .map(|_| BufferMemory::zeroed(config.buffer_size))
            .collect();

        debug!(
            buffer_size = config.buffer_size,
            num_buffers = config.num_buffers,
            "created buffer manager"
        );

        let shared = Arc::new(PoolShared {
            buffer_size: config.buffer_size,
            free_list: Mutex::new(free_list),
            available: Condvar::new(),
        });

        Ok(Self { config, shared })
    }

    /// Creates a buffer manager from the runtime configuration.
    pub fn from_config(config: &RuntimeConfig) -> Result<Self> {
        config.validate()?;
        Self::new(config.into())
    }

    /// Creates a pool of `buffer_size` buffers sized to 25% of available RAM.
    ///
    /// Minimum 16 buffers so that a pipeline can always make progress on
    /// low-memory systems.
    pub fn auto_sized(buffer_size: usize) -> Result<Self> {
        let mut sys = System::new();
        sys.refresh_memory();

        let available_bytes = sys.available_memory() as usize;
        let target_bytes = available_bytes / 4; // 25% of available RAM
        let num_buffers = (target_bytes / buffer_size.max(1)).max(16);

        Self::new(BufferManagerConfig {
            buffer_size,
            num_buffers,
        })
    }

    /// Returns the size of every pooled buffer.
    pub fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    /// Returns the number of buffers owned by the pool.
    pub fn num_buffers(&self) -> usize {
        self.config.num_buffers
    }

    /// Returns the number of buffers currently free.
    pub fn available_buffers(&self) -> usize {
        self.shared.free_list.lock().len()
    }

    #[inline]
    fn wrap(&self, memory: BufferMemory) -> TupleBuffer {
        TupleBuffer::from_memory(memory, Some(Arc::downgrade(&self.shared)))
    }

    /// Takes a buffer from the pool, waiting until one is released.
    pub fn get_buffer_blocking(&self) -> TupleBuffer {
        let mut free_list = self.shared.free_list.lock();
        loop {
            if let Some(memory) = free_list.pop() {
                drop(free_list);
                return self.wrap(memory);
            }
            self.shared.available.wait(&mut free_list);
        }
    }

    /// Takes a buffer from the pool without waiting.
    ///
    /// Fails with `BufferPoolExhausted` if every buffer is in use.
    pub fn get_buffer_no_blocking(&self) -> Result<TupleBuffer> {
        let memory = self.shared.free_list.lock().pop();
        match memory {
            Some(memory) => Ok(self.wrap(memory)),
            None => {
                debug!("buffer pool exhausted");
                Err(StrataError::BufferPoolExhausted)
            }
        }
    }

    /// Takes a buffer from the pool, waiting at most `timeout`.
    ///
    /// A timeout too large to express as a deadline waits indefinitely.
    pub fn get_buffer_timeout(&self, timeout: Duration) -> Result<TupleBuffer> {
        let Some(deadline) = Instant::now().checked_add(timeout) else {
            return Ok(self.get_buffer_blocking());
        };
        let mut free_list = self.shared.free_list.lock();
        loop {
            if let Some(memory) = free_list.pop() {
                drop(free_list);
                return Ok(self.wrap(memory));
            }
            if self
                .shared
                .available
                .wait_until(&mut free_list, deadline)
                .timed_out()
            {
                // A buffer may have been released right at the deadline.
                if let Some(memory) = free_list.pop() {
                    drop(free_list);
                    return Ok(self.wrap(memory));
                }
                let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(millis, "timed out waiting for a buffer");
                return Err(StrataError::BufferTimeout { millis });
            }
        }
    }

    /// Allocates a buffer of `size` bytes outside the pool.
    ///
    /// The memory is freed, not pooled, when the last handle is dropped.
    pub fn get_unpooled_buffer(&self, size: usize) -> TupleBuffer {
        debug!(size, "allocating unpooled buffer");
        TupleBuffer::unpooled(size)
    }

    /// Returns statistics about the pool.
    pub fn stats(&self) -> BufferManagerStats {
        let available = self.available_buffers();
        BufferManagerStats {
            buffer_size: self.config.buffer_size,
            total_buffers: self.config.num_buffers,
            available_buffers: available,
            in_use_buffers: self.config.num_buffers - available,
        }
    }
}

impl BufferProvider for BufferManager {
    fn buffer_size(&self) -> usize {
        self.config.buffer_size
    }

    fn acquire_buffer(&self, min_size: usize) -> Result<TupleBuffer> {
        if min_size <= self.config.buffer_size {
            Ok(self.get_buffer_blocking())
        } else {
            Ok(self.get_unpooled_buffer(min_size))
        }
    }

    fn try_acquire_buffer(&self, min_size: usize) -> Result<TupleBuffer> {
        if min_size <= self.config.buffer_size {
            self.get_buffer_no_blocking()
        } else {
            Ok(self.get_unpooled_buffer(min_size))
        }
    }
}

impl std::fmt::Debug for BufferManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferManager")
            .field("buffer_size", &self.config.buffer_size)
            .field("num_buffers", &self.config.num_buffers)
            .field("available_buffers", &self.available_buffers())
            .finish()
    }
}

/// Statistics about the buffer pool.
#[derive(Debug, Clone)]
pub struct BufferManagerStats {
    /// Size of every pooled buffer.
    pub buffer_size: usize,
    /// Number of buffers owned by the pool.
    pub total_buffers: usize,
    /// Number of free buffers.
    pub available_buffers: usize,
    /// Number of buffers handed out and not yet released.
    pub in_use_buffers: usize,
}
