//! A memory layout bound to one writable buffer.

use crate::field::FieldAccessor;
use crate::layout::MemoryLayout;
use crate::native::{NativeType, RecordTuple};
use crate::record::Record;
use std::ptr::NonNull;
use std::sync::Arc;
use strata_buffer::TupleBuffer;
use strata_common::{Result, Schema, StrataError, Value};

/// A [`MemoryLayout`] mapped onto an exclusively borrowed [`TupleBuffer`].
///
/// Records are appended with `push_record`/`push` and read back with
/// `read_record`/`read`. The record count lives here while the buffer is
/// being filled and is written to the buffer's metadata by [`commit`].
/// Dropping a bound layout releases the borrow, not the buffer.
///
/// [`commit`]: BoundLayout::commit
pub struct BoundLayout<'b> {
    layout: Arc<MemoryLayout>,
    buffer: &'b mut TupleBuffer,
    /// Base pointer of `buffer`, valid for `layout.buffer_size()` bytes.
    base: NonNull<u8>,
    number_of_records: usize,
}

// SAFETY: `base` points into memory owned by the exclusively borrowed buffer,
// so moving the bound layout to another thread moves the only writer.
unsafe impl Send for BoundLayout<'_> {}

impl<'b> BoundLayout<'b> {
    pub(crate) fn new(layout: Arc<MemoryLayout>, buffer: &'b mut TupleBuffer) -> Result<Self> {
        layout.check_buffer(buffer)?;
        let number_of_records = layout.committed_records(buffer)?;
        let base = buffer.as_mut_ptr()?;
        Ok(Self {
            layout,
            buffer,
            base,
            number_of_records,
        })
    }

    /// Returns the layout.
    #[inline]
    pub fn layout(&self) -> &Arc<MemoryLayout> {
        &self.layout
    }

    /// Returns the schema of the layout.
    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        self.layout.schema()
    }

    /// Returns the maximum number of records.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.layout.capacity()
    }

    /// Returns the number of records written so far.
    #[inline]
    pub fn number_of_records(&self) -> usize {
        self.number_of_records
    }

    /// Returns true if no further record fits.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.number_of_records >= self.layout.capacity()
    }

    #[inline]
    pub(crate) fn base(&self) -> NonNull<u8> {
        self.base
    }

    fn data(&self) -> &[u8] {
        // SAFETY: base is valid for buffer_size bytes and writes only happen
        // through `&mut self` or an accessor borrowing `self`, neither of
        // which can run while this slice is alive on this thread.
        unsafe { std::slice::from_raw_parts(self.base.as_ptr(), self.layout.buffer_size()) }
    }

    #[inline]
    fn check_not_full(&self) -> Result<()> {
        if self.is_full() {
            return Err(StrataError::BufferFull {
                capacity: self.layout.capacity(),
            });
        }
        Ok(())
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

    /// Appends one record given as dynamic values in schema order.
    ///
    /// On error nothing is written and the record count is unchanged.
    pub fn push_record(&mut self, values: &[Value]) -> Result<()> {
        self.check_not_full()?;
        self.layout.check_values(values)?;

        let record = self.number_of_records;
        // SAFETY: base is valid for buffer_size bytes and `self` is borrowed
        // mutably, so no accessor is alive.
        let data = unsafe {
            std::slice::from_raw_parts_mut(self.base.as_ptr(), self.layout.buffer_size())
        };
        self.layout.write_values(data, record, values)?;
        self.number_of_records = record + 1;
        Ok(())
    }

    /// Appends one record given as a Rust tuple.
    ///
    /// ```ignore
    /// bound.push((1i32, 2.5f64, true))?;
    /// ```
    #[inline]
    pub fn push<R: RecordTuple>(&mut self, values: R) -> Result<()> {
        self.check_not_full()?;
        self.layout.check_tuple::<R>()?;
        // SAFETY: R matches the schema and the record index is below capacity.
        unsafe { self.push_unchecked(values) };
        Ok(())
    }

    /// Appends one record without any checks.
    ///
    /// # Safety
    /// `R` must match the schema and `number_of_records() < capacity()`.
    #[inline(always)]
    pub unsafe fn push_unchecked<R: RecordTuple>(&mut self, values: R) {
        let record = self.number_of_records;
        unsafe { self.layout.store_tuple(self.base.as_ptr(), record, values) };
        self.number_of_records = record + 1;
    }

    /// Reads record `record` as dynamic values.
    pub fn read_record(&self, record: usize) -> Result<Record> {
        self.check_record(record)?;
        self.layout.read_values(self.data(), record)
    }

    /// Reads record `record` as a Rust tuple.
    #[inline]
    pub fn read<R: RecordTuple>(&self, record: usize) -> Result<R> {
        self.check_record(record)?;
        self.layout.check_tuple::<R>()?;
        // SAFETY: R matches the schema and record < number_of_records <= capacity.
        Ok(unsafe { self.read_unchecked(record) })
    }

    /// Reads record `record` without any checks.
    ///
    /// # Safety
    /// `R` must match the schema and `record < capacity()`. Records at or
    /// past `number_of_records()` hold stale bytes.
    #[inline(always)]
    pub unsafe fn read_unchecked<R: RecordTuple>(&self, record: usize) -> R {
        unsafe { self.layout.load_tuple(self.base.as_ptr(), record) }
    }

    /// Writes the record count to the buffer's metadata.
    pub fn commit(&self) {
        self.buffer.set_number_of_tuples(self.number_of_records as u64);
    }

    /// Returns a typed accessor for the field at index `field`.
    ///
    /// Fails with `IndexOutOfBounds` for an unknown field and with
    /// `TypeMismatch` if `T` cannot hold the field's declared type.
    pub fn field<T: NativeType>(&self, field: usize) -> Result<FieldAccessor<'_, T>> {
        FieldAccessor::new(self, field)
    }

    /// Returns a typed accessor for the field called `name`.
    pub fn field_by_name<T: NativeType>(&self, name: &str) -> Result<FieldAccessor<'_, T>> {
        let field = self.layout.field_index(name)?;
        FieldAccessor::new(self, field)
    }
}

impl std::fmt::Debug for BoundLayout<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundLayout")
            .field("strategy", &self.layout.strategy())
            .field("capacity", &self.layout.capacity())
            .field("number_of_records", &self.number_of_records)
            .finish()
    }
}

impl std::fmt::Display for BoundLayout<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.layout.fmt_records(f, self.data(), self.number_of_records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::{LayoutStrategy, PrimitiveType};

    fn schema() -> Schema {
        Schema::builder()
            .field("id", PrimitiveType::Int64)
            .field("flag", PrimitiveType::Boolean)
            .field("price", PrimitiveType::Float32)
            .build()
    }

    fn layout(strategy: LayoutStrategy, buffer_size: usize) -> Arc<MemoryLayout> {
        Arc::new(MemoryLayout::new(schema(), buffer_size, strategy).unwrap())
    }

    fn values(i: i64) -> Vec<Value> {
        vec![
            Value::Int64(i),
            Value::Boolean(i % 2 == 0),
            Value::Float32(i as f32 * 0.5),
        ]
    }

    #[test]
    fn test_push_and_read_record() {
        for strategy in [LayoutStrategy::Row, LayoutStrategy::Column] {
            let layout = layout(strategy, 130);
            let mut buffer = TupleBuffer::unpooled(130);
            let mut bound = layout.map(&mut buffer).unwrap();

            for i in 0..10 {
                bound.push_record(&values(i)).unwrap();
                assert_eq!(bound.number_of_records(), i as usize + 1);
            }
            for i in 0..10 {
                assert_eq!(bound.read_record(i as usize).unwrap().values(), &values(i)[..]);
            }
        }
    }

    #[test]
    fn test_push_full_buffer() {
        let layout = layout(LayoutStrategy::Column, 39);
        let mut buffer = TupleBuffer::unpooled(39);
        let mut bound = layout.map(&mut buffer).unwrap();
        assert_eq!(bound.capacity(), 3);

        bound.push_record(&values(0)).unwrap();
        bound.push_record(&values(1)).unwrap();
        bound.push_record(&values(2)).unwrap();
        assert!(bound.is_full());

        let err = bound.push_record(&values(3)).unwrap_err();
        assert!(matches!(err, StrataError::BufferFull { capacity: 3 }));
        assert!(err.is_recoverable());
        assert!(matches!(
            bound.push((3i64, true, 1.0f32)),
            Err(StrataError::BufferFull { .. })
        ));
        assert_eq!(bound.number_of_records(), 3);
    }

    #[test]
    fn test_push_rejects_mismatched_values() {
        let layout = layout(LayoutStrategy::Row, 1024);
        let mut buffer = TupleBuffer::unpooled(1024);
        let mut bound = layout.map(&mut buffer).unwrap();

        let err = bound.push_record(&[Value::Int64(1)]).unwrap_err();
        assert!(matches!(err, StrataError::ArityMismatch { expected: 3, actual: 1 }));

        let err = bound
            .push_record(&[Value::Int32(1), Value::Boolean(true), Value::Float32(0.0)])
            .unwrap_err();
        assert!(matches!(err, StrataError::TypeMismatch { .. }));

        assert!(matches!(
            bound.push((1i64, true, 0.0f64)),
            Err(StrataError::TypeMismatch { .. })
        ));
        assert_eq!(bound.number_of_records(), 0);
    }

    #[test]
    fn test_read_past_count() {
        let layout = layout(LayoutStrategy::Row, 1024);
        let mut buffer = TupleBuffer::unpooled(1024);
        let mut bound = layout.map(&mut buffer).unwrap();
        bound.push_record(&values(1)).unwrap();

        assert!(bound.read_record(0).is_ok());
        let err = bound.read_record(1).unwrap_err();
        assert_eq!(err.to_string(), "Index out of bounds: record index 1 (bound 1)");
        assert!(bound.read::<(i64, bool, f32)>(1).is_err());
    }

    #[test]
    fn test_typed_and_dynamic_push_write_same_bytes() {
        for strategy in [LayoutStrategy::Row, LayoutStrategy::Column] {
            let layout = layout(strategy, 260);

            let mut typed = TupleBuffer::unpooled(260);
            let mut bound = layout.map(&mut typed).unwrap();
            for i in 0..20i64 {
                bound.push((i, i % 2 == 0, i as f32 * 0.5)).unwrap();
            }
            drop(bound);

            let mut dynamic = TupleBuffer::unpooled(260);
            let mut bound = layout.map(&mut dynamic).unwrap();
            for i in 0..20 {
                bound.push_record(&values(i)).unwrap();
            }
            drop(bound);

            assert_eq!(typed.as_slice(), dynamic.as_slice());
        }
    }

    #[test]
    fn test_read_typed() {
        let layout = layout(LayoutStrategy::Column, 1024);
        let mut buffer = TupleBuffer::unpooled(1024);
        let mut bound = layout.map(&mut buffer).unwrap();
        bound.push_record(&values(4)).unwrap();

        let (id, flag, price): (i64, bool, f32) = bound.read(0).unwrap();
        assert_eq!((id, flag, price), (4, true, 2.0));
        assert!(matches!(
            bound.read::<(i64, bool)>(0),
            Err(StrataError::ArityMismatch {
                expected: 3,
                actual: 2
            })
        ));
    }

    #[test]
    fn test_commit_and_remap_resumes_count() {
        let layout = layout(LayoutStrategy::Row, 1024);
        let mut buffer = TupleBuffer::unpooled(1024);

        let mut bound = layout.map(&mut buffer).unwrap();
        bound.push_record(&values(1)).unwrap();
        bound.push_record(&values(2)).unwrap();
        drop(bound);
        assert_eq!(buffer.number_of_tuples(), 0);

        let mut bound = layout.map(&mut buffer).unwrap();
        bound.push_record(&values(1)).unwrap();
        bound.push_record(&values(2)).unwrap();
        bound.commit();
        drop(bound);
        assert_eq!(buffer.number_of_tuples(), 2);

        let mut bound = layout.map(&mut buffer).unwrap();
        assert_eq!(bound.number_of_records(), 2);
        bound.push_record(&values(3)).unwrap();
        assert_eq!(bound.read_record(2).unwrap().values(), &values(3)[..]);
    }

    #[test]
    fn test_map_rejects_count_past_capacity() {
        let layout = layout(LayoutStrategy::Row, 26);
        let mut buffer = TupleBuffer::unpooled(26);
        buffer.set_number_of_tuples(3);

        assert!(matches!(
            layout.map(&mut buffer),
            Err(StrataError::IndexOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_unchecked_roundtrip() {
        let layout = layout(LayoutStrategy::Column, 1024);
        let mut buffer = TupleBuffer::unpooled(1024);
        let mut bound = layout.map(&mut buffer).unwrap();

        unsafe {
            bound.push_unchecked((7i64, false, 1.25f32));
            bound.push_unchecked((8i64, true, 2.5f32));
        }
        assert_eq!(bound.number_of_records(), 2);
        let second: (i64, bool, f32) = unsafe { bound.read_unchecked(1) };
        assert_eq!(second, (8, true, 2.5));
    }

    #[test]
    fn test_display() {
        let layout = layout(LayoutStrategy::Row, 1024);
        let mut buffer = TupleBuffer::unpooled(1024);
        let mut bound = layout.map(&mut buffer).unwrap();
        bound.push_record(&values(1)).unwrap();
        bound.push_record(&values(2)).unwrap();

        assert_eq!(
            bound.to_string(),
            "id:INT64|flag:BOOLEAN|price:FLOAT32\n1|false|0.5\n2|true|1\n"
        );
    }

    #[test]
    fn test_bound_layout_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<BoundLayout<'static>>();
    }
}
