//! Column-major offset computation.
//!
//! Buffer layout for a schema `(a, b)` with capacity `n`:
//! ```text
//! +----+----+-----+------+----+----+-----+------+--------+
//! | a0 | a1 | ... | an-1 | b0 | b1 | ... | bn-1 | unused |
//! +----+----+-----+------+----+----+-----+------+--------+
//! ```
//! Each field owns a contiguous column of `capacity` values, so the column
//! regions never overlap regardless of how many records are valid.

use strata_common::Schema;

/// Offsets of a column-major layout.
#[derive(Debug, Clone)]
pub struct ColumnLayout {
    /// Offset of the first value of each column.
    column_offsets: Vec<usize>,
    /// Width of each field.
    field_sizes: Vec<usize>,
}

impl ColumnLayout {
    /// Computes the column regions of `schema` for `capacity` records.
    pub(crate) fn new(schema: &Schema, capacity: usize) -> Self {
        let mut column_offsets = Vec::with_capacity(schema.len());
        let mut field_sizes = Vec::with_capacity(schema.len());
        let mut offset = 0;
        for field in schema.fields() {
            column_offsets.push(offset);
            field_sizes.push(field.size());
            offset += field.size() * capacity;
        }
        Self {
            column_offsets,
            field_sizes,
        }
    }

    /// Returns the start offset of every column.
    #[inline]
    pub fn column_offsets(&self) -> &[usize] {
        &self.column_offsets
    }

    /// Returns the width of every field.
    #[inline]
    pub fn field_sizes(&self) -> &[usize] {
        &self.field_sizes
    }

    /// Returns the buffer offset of `(record, field)`.
    ///
    /// # Safety
    /// `field` must be less than the number of fields.
    #[inline(always)]
    pub unsafe fn offset(&self, record: usize, field: usize) -> usize {
        unsafe {
            *self.column_offsets.get_unchecked(field) + record * *self.field_sizes.get_unchecked(field)
        }
    }
}
