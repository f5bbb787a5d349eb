//! Row-major offset computation.
//!
//! Buffer layout for a schema `(a, b, c)`:
//! ```text
//! +----+----+----+----+----+----+-----+
//! | a0 | b0 | c0 | a1 | b1 | c1 | ... |
//! +----+----+----+----+----+----+-----+
//! ```
//! Every record occupies `record_size` contiguous bytes.

use strata_common::Schema;

/// Offsets of a row-major layout.
#[derive(Debug, Clone)]
pub struct RowLayout {
    /// Size of one record in bytes.
    record_size: usize,
    /// Offset of each field within one record.
    field_offsets: Vec<usize>,
}

impl RowLayout {
    /// Computes the per-record field offsets of `schema`.
    pub(crate) fn new(schema: &Schema) -> Self {
        let mut field_offsets = Vec::with_capacity(schema.len());
        let mut offset = 0;
        for field in schema.fields() {
            field_offsets.push(offset);
            offset += field.size();
        }
        Self {
            record_size: offset,
            field_offsets,
        }
    }

    /// Returns the size of one record.
    #[inline]
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Returns the offset of every field within a record.
    #[inline]
    pub fn field_offsets(&self) -> &[usize] {
        &self.field_offsets
    }

    /// Returns the offset of the first byte of `record`.
    #[inline(always)]
    pub fn record_offset(&self, record: usize) -> usize {
        record * self.record_size
    }

    /// Returns the offset of `field` within any record.
    ///
    /// # Safety
    /// `field` must be less than the number of fields.
    #[inline(always)]
    pub unsafe fn field_offset_in_record(&self, field: usize) -> usize {
        unsafe { *self.field_offsets.get_unchecked(field) }
    }

    /// Returns the buffer offset of `(record, field)`.
    ///
    /// # Safety
    /// `field` must be less than the number of fields.
    #[inline(always)]
    pub unsafe fn offset(&self, record: usize, field: usize) -> usize {
        self.record_offset(record) + unsafe { self.field_offset_in_record(field) }
    }
}
