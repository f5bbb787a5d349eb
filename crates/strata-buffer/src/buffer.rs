//! Reference-counted tuple buffers.

use crate::pool::PoolShared;
use bytes::Bytes;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use strata_common::{Result, StrataError};

/// An owned, fixed-size block of bytes.
///
/// Allocated once and moved between the pool's free list and live buffers;
/// it is never reallocated.
pub(crate) struct BufferMemory {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: BufferMemory uniquely owns its allocation, like a Box<[u8]>.
unsafe impl Send for BufferMemory {}
unsafe impl Sync for BufferMemory {}

impl BufferMemory {
    /// Allocates `len` zeroed bytes.
    pub(crate) fn zeroed(len: usize) -> Self {
        let boxed: Box<[u8]> = vec![0u8; len].into_boxed_slice();
        let ptr = NonNull::from(Box::leak(boxed)).cast::<u8>();
        Self { ptr, len }
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.len
    }
}

impl Drop for BufferMemory {
    fn drop(&mut self) {
        // SAFETY: ptr and len come from the Box leaked in zeroed().
        unsafe {
            drop(Box::from_raw(std::ptr::slice_from_raw_parts_mut(
                self.ptr.as_ptr(),
                self.len,
            )));
        }
    }
}

/// Shared state behind every handle to one buffer.
struct BufferControl {
    /// Cached base pointer of `memory`.
    data: NonNull<u8>,
    /// Cached length of `memory`.
    capacity: usize,
    /// Owned memory; taken on drop to hand it back to the pool.
    memory: Option<BufferMemory>,
    number_of_tuples: AtomicU64,
    watermark: AtomicU64,
    origin_id: AtomicU64,
    sequence_number: AtomicU64,
    /// Pool to return the memory to, None for unpooled buffers.
    recycler: Option<Weak<PoolShared>>,
}

// SAFETY: the bytes behind `data` are only written through `&mut TupleBuffer`
// while the handle is the sole owner (see TupleBuffer::data_mut). Metadata
// is atomic.
unsafe impl Send for BufferControl {}
unsafe impl Sync for BufferControl {}

impl Drop for BufferControl {
    fn drop(&mut self) {
        let Some(memory) = self.memory.take() else {
            return;
        };
        if let Some(pool) = self.recycler.as_ref().and_then(Weak::upgrade) {
            pool.recycle(memory);
        }
    }
}

/// A handle to a fixed-capacity block of bytes plus record metadata.
///
/// Cloning a handle increments a reference count; the memory goes back to
/// its pool when the last handle is dropped. Writing requires `&mut` access
/// to the only live handle, so a buffer that has been shared (for example
/// handed to several downstream readers) is read-only.
///
/// Buffers taken from a pool are not zeroed; their contents are whatever the
/// previous user left behind. Only the first `number_of_tuples` records, as
/// interpreted by a memory layout, are meaningful.
#[derive(Clone)]
pub struct TupleBuffer {
    control: Arc<BufferControl>,
}

impl TupleBuffer {
    /// Creates a zeroed buffer that does not belong to any pool.
    pub fn unpooled(capacity: usize) -> Self {
        Self::from_memory(BufferMemory::zeroed(capacity), None)
    }

    pub(crate) fn from_memory(memory: BufferMemory, recycler: Option<Weak<PoolShared>>) -> Self {
        let control = BufferControl {
            data: memory.ptr,
            capacity: memory.len,
            memory: Some(memory),
            number_of_tuples: AtomicU64::new(0),
            watermark: AtomicU64::new(0),
            origin_id: AtomicU64::new(0),
            sequence_number: AtomicU64::new(0),
            recycler,
        };
        Self {
            control: Arc::new(control),
        }
    }

    /// Returns the size of the buffer in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.control.capacity
    }

    /// Returns true if the buffer returns to a pool when released.
    pub fn is_pooled(&self) -> bool {
        self.control.recycler.is_some()
    }

    /// Returns true if this is the only live handle to the buffer.
    #[inline]
    pub fn is_exclusive(&self) -> bool {
        Arc::strong_count(&self.control) == 1
    }

    /// Returns the number of live handles to the buffer.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.control)
    }

    /// Returns the base pointer of the buffer.
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.control.data.as_ptr()
    }

    /// Returns the buffer contents.
    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        // SAFETY: writers need `&mut self` on the only handle, which cannot
        // coexist with this shared borrow or with any other handle.
        unsafe { std::slice::from_raw_parts(self.control.data.as_ptr(), self.control.capacity) }
    }

    /// Returns the buffer contents for writing.
    ///
    /// Fails with `BufferShared` if another handle to the buffer is alive.
    #[inline]
    pub fn data_mut(&mut self) -> Result<&mut [u8]> {
        if !self.is_exclusive() {
            return Err(StrataError::BufferShared);
        }
        // SAFETY: this is the only handle and it is mutably borrowed.
        Ok(unsafe {
            std::slice::from_raw_parts_mut(self.control.data.as_ptr(), self.control.capacity)
        })
    }

    /// Returns the base pointer of the buffer for writing.
    ///
    /// Fails with `BufferShared` if another handle to the buffer is alive.
    /// The pointer stays valid for `capacity()` bytes for as long as this
    /// handle lives, and writes through it are exclusive for as long as the
    /// handle stays mutably borrowed.
    #[inline]
    pub fn as_mut_ptr(&mut self) -> Result<NonNull<u8>> {
        if !self.is_exclusive() {
            return Err(StrataError::BufferShared);
        }
        Ok(self.control.data)
    }

    /// Copies `src` to the start of the buffer.
    ///
    /// Used on the receiving side of a network transfer. Fails if `src` is
    /// larger than the buffer.
    pub fn copy_from(&mut self, src: &[u8]) -> Result<()> {
        let capacity = self.capacity();
        if src.len() > capacity {
            return Err(StrataError::BufferTooSmall {
                expected: src.len(),
                actual: capacity,
            });
        }
        self.data_mut()?[..src.len()].copy_from_slice(src);
        Ok(())
    }

    /// Copies the whole buffer into an immutable byte handle for shipping.
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.as_slice())
    }

    /// Returns the number of valid records committed to this buffer.
    #[inline]
    pub fn number_of_tuples(&self) -> u64 {
        self.control.number_of_tuples.load(Ordering::Acquire)
    }

    /// Sets the number of valid records.
    #[inline]
    pub fn set_number_of_tuples(&self, count: u64) {
        self.control.number_of_tuples.store(count, Ordering::Release);
    }

    /// Returns the watermark timestamp carried by this buffer.
    #[inline]
    pub fn watermark(&self) -> u64 {
        self.control.watermark.load(Ordering::Acquire)
    }

    /// Sets the watermark timestamp.
    #[inline]
    pub fn set_watermark(&self, watermark: u64) {
        self.control.watermark.store(watermark, Ordering::Release);
    }

    /// Returns the id of the source that produced this buffer.
    #[inline]
    pub fn origin_id(&self) -> u64 {
        self.control.origin_id.load(Ordering::Acquire)
    }

    /// Sets the origin id.
    #[inline]
    pub fn set_origin_id(&self, origin_id: u64) {
        self.control.origin_id.store(origin_id, Ordering::Release);
    }

    /// Returns the sequence number of this buffer within its origin.
    #[inline]
    pub fn sequence_number(&self) -> u64 {
        self.control.sequence_number.load(Ordering::Acquire)
    }

    /// Sets the sequence number.
    #[inline]
    pub fn set_sequence_number(&self, sequence_number: u64) {
        self.control
            .sequence_number
            .store(sequence_number, Ordering::Release);
    }
}

impl std::fmt::Debug for TupleBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TupleBuffer")
            .field("capacity", &self.capacity())
            .field("number_of_tuples", &self.number_of_tuples())
            .field("watermark", &self.watermark())
            .field("origin_id", &self.origin_id())
            .field("sequence_number", &self.sequence_number())
            .field("ref_count", &self.ref_count())
            .finish()
    }
}
