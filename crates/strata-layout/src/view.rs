//! Read-only views over filled buffers.

use crate::field::FieldReader;
use crate::layout::MemoryLayout;
use crate::native::{NativeType, RecordTuple};
use crate::record::Record;
use std::ptr::NonNull;
use std::sync::Arc;
use strata_buffer::TupleBuffer;
use strata_common::{Result, Schema, StrataError};

/// A [`MemoryLayout`] applied to a shared, read-only [`TupleBuffer`].
///
/// Views are what downstream operators and the receiving side of a network
/// transfer use once a buffer has been committed and handed off. Any number
/// of views over the same buffer may be used from any number of threads.
/// The record count is taken from the buffer's metadata when the view is
/// created.
pub struct BufferView<'b> {
    layout: Arc<MemoryLayout>,
    buffer: &'b TupleBuffer,
    number_of_records: usize,
}

impl<'b> BufferView<'b> {
    pub(crate) fn new(layout: Arc<MemoryLayout>, buffer: &'b TupleBuffer) -> Result<Self> {
        layout.check_buffer(buffer)?;
        let number_of_records = layout.committed_records(buffer)?;
        Ok(Self {
            layout,
            buffer,
            number_of_records,
        })
    }

    #[inline]
    pub fn layout(&self) -> &Arc<MemoryLayout> {
        &self.layout
    }

    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        self.layout.schema()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.layout.capacity()
    }

    /// Returns the number of committed records.
    #[inline]
    pub fn number_of_records(&self) -> usize {
        self.number_of_records
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.number_of_records == 0
    }

    /// Returns the viewed buffer.
    #[inline]
    pub fn buffer(&self) -> &'b TupleBuffer {
        self.buffer
    }

    #[inline]
    pub(crate) fn base(&self) -> NonNull<u8> {
        NonNull::from(self.buffer.as_slice()).cast::<u8>()
    }

    #[inline]
    fn check_record(&self, record: usize) -> Result<()> {
        if record >= self.number_of_records {
            return Err(StrataError::record_out_of_bounds(
                record,
                self.number_of_records,
            ));
        }
        Ok(())
    }

    /// Reads record `record` as dynamic values.
    pub fn read_record(&self, record: usize) -> Result<Record> {
        self.check_record(record)?;
        self.layout.read_values(self.buffer.as_slice(), record)
    }

    /// Reads record `record` as a Rust tuple.
    pub fn read<R: RecordTuple>(&self, record: usize) -> Result<R> {
        self.check_record(record)?;
        self.layout.check_tuple::<R>()?;
        // SAFETY: R matches the schema and record < number_of_records <= capacity.
        Ok(unsafe { self.read_unchecked(record) })
    }

    /// Reads record `record` without any checks.
    ///
    /// # Safety
    /// `R` must match the schema and `record < capacity()`.
    #[inline(always)]
    pub unsafe fn read_unchecked<R: RecordTuple>(&self, record: usize) -> R {
        unsafe { self.layout.load_tuple(self.buffer.as_ptr(), record) }
    }

    /// Returns a typed reader for the field at index `field`.
    pub fn field<T: NativeType>(&self, field: usize) -> Result<FieldReader<'_, T>> {
        FieldReader::new(self, field)
    }

    /// Returns a typed reader for the field called `name`.
    pub fn field_by_name<T: NativeType>(&self, name: &str) -> Result<FieldReader<'_, T>> {
        let field = self.layout.field_index(name)?;
        FieldReader::new(self, field)
    }

    /// Iterates over all committed records as dynamic values.
    pub fn records(&self) -> impl Iterator<Item = Result<Record>> + '_ {
        (0..self.number_of_records).map(move |record| self.read_record(record))
    }
}

impl std::fmt::Debug for BufferView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BufferView")
            .field("strategy", &self.layout.strategy())
            .field("capacity", &self.layout.capacity())
            .field("number_of_records", &self.number_of_records)
            .finish()
    }
}

impl std::fmt::Display for BufferView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.layout
            .fmt_records(f, self.buffer.as_slice(), self.number_of_records)
    }
}
