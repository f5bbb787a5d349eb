//! Memory layouts.
//!
//! A [`MemoryLayout`] turns a schema and a buffer size into an offset for
//! every `(record, field)` pair. It owns no data: it is built once per
//! schema and buffer size, shared behind an `Arc`, and mapped onto as many
//! buffers as needed.

use crate::bound::BoundLayout;
use crate::column::ColumnLayout;
use crate::compression::CompressedBuffer;
use crate::native::RecordTuple;
use crate::record::Record;
use crate::row::RowLayout;
use crate::view::BufferView;
use std::sync::Arc;
use strata_buffer::TupleBuffer;
use strata_common::{Field, LayoutStrategy, Result, Schema, StrataError, Value};
use tracing::{debug, warn};

/// Strategy-specific offset tables.
#[derive(Debug, Clone)]
pub enum LayoutKind {
    Row(RowLayout),
    Column(ColumnLayout),
}

/// Offset computation policy for one schema and buffer size.
#[derive(Debug)]
pub struct MemoryLayout {
    schema: Arc<Schema>,
    /// Buffer size the layout was computed for.
    buffer_size: usize,
    /// Sum of the field widths.
    record_size: usize,
    /// Maximum number of records per buffer.
    capacity: usize,
    kind: LayoutKind,
}

impl MemoryLayout {
    /// Builds a layout of `schema` over buffers of `buffer_size` bytes.
    ///
    /// Fails with `SchemaTooLarge` if not even one record fits, and with
    /// `ConfigError` if the schema has no fields.
    pub fn new(
        schema: impl Into<Arc<Schema>>,
        buffer_size: usize,
        strategy: LayoutStrategy,
    ) -> Result<Self> {
        let schema = schema.into();
        if schema.is_empty() {
            return Err(StrataError::ConfigError(
                "cannot build a memory layout for a schema without fields".to_string(),
            ));
        }

        let record_size: usize = schema.fields().iter().map(Field::size).sum();
        let capacity = buffer_size / record_size;
        if capacity == 0 {
            warn!(record_size, buffer_size, "record does not fit into buffer");
            return Err(StrataError::SchemaTooLarge {
                record_size,
                buffer_size,
            });
        }

        let kind = match strategy {
            LayoutStrategy::Row => LayoutKind::Row(RowLayout::new(&schema)),
            LayoutStrategy::Column => LayoutKind::Column(ColumnLayout::new(&schema, capacity)),
        };

        debug!(
            %strategy,
            record_size,
            buffer_size,
            capacity,
            "created memory layout"
        );

        Ok(Self {
            schema,
            buffer_size,
            record_size,
            capacity,
            kind,
        })
    }

    /// Builds a row-major layout.
    pub fn row(schema: impl Into<Arc<Schema>>, buffer_size: usize) -> Result<Self> {
        Self::new(schema, buffer_size, LayoutStrategy::Row)
    }

    /// Builds a column-major layout.
    pub fn column(schema: impl Into<Arc<Schema>>, buffer_size: usize) -> Result<Self> {
        Self::new(schema, buffer_size, LayoutStrategy::Column)
    }

    /// Returns the schema.
    #[inline]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    /// Returns the strategy this layout was built with.
    pub fn strategy(&self) -> LayoutStrategy {
        match self.kind {
            LayoutKind::Row(_) => LayoutStrategy::Row,
            LayoutKind::Column(_) => LayoutStrategy::Column,
        }
    }

    /// Returns the strategy-specific offset tables.
    #[inline]
    pub fn kind(&self) -> &LayoutKind {
        &self.kind
    }

    /// Returns the buffer size the layout was computed for.
    #[inline]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Returns the maximum number of records per buffer.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the size of one record in bytes.
    #[inline]
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Returns the number of fields per record.
    #[inline]
    pub fn field_count(&self) -> usize {
        self.schema.len()
    }

    /// Returns the index of the field called `name`.
    pub fn field_index(&self, name: &str) -> Result<usize> {
        self.schema
            .index_of(name)
            .ok_or_else(|| StrataError::FieldNotFound(name.to_string()))
    }

    /// Returns the start offset of every column, or None for a row layout.
    pub fn column_offsets(&self) -> Option<&[usize]> {
        match &self.kind {
            LayoutKind::Row(_) => None,
            LayoutKind::Column(column) => Some(column.column_offsets()),
        }
    }

    #[inline]
    pub(crate) fn check_field(&self, field: usize) -> Result<()> {
        if field >= self.schema.len() {
            return Err(StrataError::field_out_of_bounds(field, self.schema.len()));
        }
        Ok(())
    }

    /// Returns the buffer offset of `(record, field)`.
    ///
    /// Fails with `IndexOutOfBounds` if `record >= capacity` or `field` is
    /// not a field of the schema.
    pub fn field_offset(&self, record: usize, field: usize) -> Result<usize> {
        self.check_field(field)?;
        if record >= self.capacity {
            return Err(StrataError::record_out_of_bounds(record, self.capacity));
        }
        // SAFETY: field was checked above.
        Ok(unsafe { self.field_offset_unchecked(record, field) })
    }

    /// Returns the buffer offset of `(record, field)` without bounds checks.
    ///
    /// # Safety
    /// `field` must be less than `field_count()`. The offset only lies
    /// inside the buffer if `record < capacity()`.
    #[inline(always)]
    pub unsafe fn field_offset_unchecked(&self, record: usize, field: usize) -> usize {
        match &self.kind {
            LayoutKind::Row(row) => unsafe { row.offset(record, field) },
            LayoutKind::Column(column) => unsafe { column.offset(record, field) },
        }
    }

    /// Returns `(base, stride)` such that the offset of `(record, field)` is
    /// `base + record * stride`.
    ///
    /// This is the strategy branch hoisted out of a per-record loop.
    pub fn field_base_and_stride(&self, field: usize) -> Result<(usize, usize)> {
        self.check_field(field)?;
        let pair = match &self.kind {
            LayoutKind::Row(row) => (row.field_offsets()[field], row.record_size()),
            LayoutKind::Column(column) => {
                (column.column_offsets()[field], column.field_sizes()[field])
            }
        };
        Ok(pair)
    }

    /// Binds this layout to `buffer` for writing.
    ///
    /// Fails with `BufferTooSmall` if the buffer is smaller than the layout's
    /// buffer size and with `BufferShared` if the buffer handle is not the
    /// only one alive.
    pub fn map<'b>(self: &Arc<Self>, buffer: &'b mut TupleBuffer) -> Result<BoundLayout<'b>> {
        BoundLayout::new(Arc::clone(self), buffer)
    }

    /// Binds this layout to `buffer` for reading only.
    pub fn view<'b>(self: &Arc<Self>, buffer: &'b TupleBuffer) -> Result<BufferView<'b>> {
        BufferView::new(Arc::clone(self), buffer)
    }

    /// Wraps a committed `buffer` for in-place compression.
    pub fn compressed<'b>(
        self: &Arc<Self>,
        buffer: &'b mut TupleBuffer,
    ) -> Result<CompressedBuffer<'b>> {
        CompressedBuffer::new(Arc::clone(self), buffer)
    }

    pub(crate) fn check_buffer(&self, buffer: &TupleBuffer) -> Result<()> {
        if buffer.capacity() < self.buffer_size {
            return Err(StrataError::BufferTooSmall {
                expected: self.buffer_size,
                actual: buffer.capacity(),
            });
        }
        Ok(())
    }

    /// Returns the record count committed to `buffer`, validated against
    /// this layout's capacity.
    pub(crate) fn committed_records(&self, buffer: &TupleBuffer) -> Result<usize> {
        let committed = buffer.number_of_tuples();
        if committed > self.capacity as u64 {
            return Err(StrataError::record_out_of_bounds(
                committed as usize,
                self.capacity,
            ));
        }
        Ok(committed as usize)
    }

    /// Verifies that `values` has one value of the declared type per field.
    pub(crate) fn check_values(&self, values: &[Value]) -> Result<()> {
        let fields = self.schema.fields();
        if values.len() != fields.len() {
            return Err(StrataError::ArityMismatch {
                expected: fields.len(),
                actual: values.len(),
            });
        }
        for (field, value) in fields.iter().zip(values) {
            if value.data_type() != field.data_type {
                return Err(StrataError::TypeMismatch {
                    expected: field.data_type.to_string(),
                    actual: value.data_type().to_string(),
                });
            }
        }
        Ok(())
    }

    /// Verifies that the tuple type `R` matches the schema.
    pub(crate) fn check_tuple<R: RecordTuple>(&self) -> Result<()> {
        if R::ARITY != self.schema.len() {
            return Err(StrataError::ArityMismatch {
                expected: self.schema.len(),
                actual: R::ARITY,
            });
        }
        if !R::matches(&self.schema) {
            return Err(StrataError::TypeMismatch {
                expected: self.schema.to_string(),
                actual: std::any::type_name::<R>().to_string(),
            });
        }
        Ok(())
    }

    /// Writes checked values as record `record` of `data`.
    pub(crate) fn write_values(&self, data: &mut [u8], record: usize, values: &[Value]) -> Result<()> {
        for (field, value) in values.iter().enumerate() {
            // SAFETY: check_values guarantees one value per field.
            let offset = unsafe { self.field_offset_unchecked(record, field) };
            let dst = data.get_mut(offset..).ok_or_else(|| {
                StrataError::Internal(format!(
                    "field {} of record {} lies outside the buffer",
                    field, record
                ))
            })?;
            value.write_to(dst)?;
        }
        Ok(())
    }

    /// Reads record `record` of `data` as dynamic values.
    pub(crate) fn read_values(&self, data: &[u8], record: usize) -> Result<Record> {
        let mut values = Vec::with_capacity(self.schema.len());
        for (field, desc) in self.schema.fields().iter().enumerate() {
            // SAFETY: field enumerates the schema.
            let offset = unsafe { self.field_offset_unchecked(record, field) };
            let value = data
                .get(offset..)
                .and_then(|bytes| Value::read_from(desc.data_type, bytes))
                .ok_or_else(|| {
                    StrataError::Internal(format!(
                        "field {} of record {} lies outside the buffer",
                        field, record
                    ))
                })?;
            values.push(value);
        }
        Ok(Record::new(values))
    }

    /// Stores a typed record at index `record`.
    ///
    /// Row layouts write one contiguous record; column layouts scatter one
    /// value into every column.
    ///
    /// # Safety
    /// `R` must match the schema, `record < capacity()`, and `base` must be
    /// valid for writes of `buffer_size()` bytes.
    #[inline(always)]
    pub(crate) unsafe fn store_tuple<R: RecordTuple>(&self, base: *mut u8, record: usize, values: R) {
        match &self.kind {
            LayoutKind::Row(row) => {
                let offset_of = |f| unsafe { row.field_offset_in_record(f) };
                unsafe { values.store_fields(base.add(row.record_offset(record)), offset_of) }
            }
            LayoutKind::Column(column) => {
                let offset_of = |f| unsafe { column.offset(record, f) };
                unsafe { values.store_fields(base, offset_of) }
            }
        }
    }

    /// Loads a typed record from index `record`.
    ///
    /// # Safety
    /// `R` must match the schema, `record < capacity()`, and `base` must be
    /// valid for reads of `buffer_size()` bytes.
    #[inline(always)]
    pub(crate) unsafe fn load_tuple<R: RecordTuple>(&self, base: *const u8, record: usize) -> R {
        match &self.kind {
            LayoutKind::Row(row) => {
                let offset_of = |f| unsafe { row.field_offset_in_record(f) };
                unsafe { R::load_fields(base.add(row.record_offset(record)), offset_of) }
            }
            LayoutKind::Column(column) => {
                let offset_of = |f| unsafe { column.offset(record, f) };
                unsafe { R::load_fields(base, offset_of) }
            }
        }
    }

    /// Writes a header line and the first `count` records of `data`.
    pub(crate) fn fmt_records(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        data: &[u8],
        count: usize,
    ) -> std::fmt::Result {
        let header: Vec<String> = self.schema.fields().iter().map(|fd| fd.to_string()).collect();
        writeln!(f, "{}", header.join("|"))?;
        for record in 0..count {
            let values = self.read_values(data, record).map_err(|_| std::fmt::Error)?;
            writeln!(f, "{}", values)?;
        }
        Ok(())
    }
}
