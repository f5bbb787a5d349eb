//! Typed per-field access.
//!
//! An accessor resolves the strategy once, at construction, into a base
//! offset and a stride. Every access afterwards is `base + record * stride`
//! with no branch on the layout kind.

use crate::bound::BoundLayout;
use crate::layout::MemoryLayout;
use crate::native::NativeType;
use crate::view::BufferView;
use std::marker::PhantomData;
use std::ptr::NonNull;
use strata_common::{Result, StrataError};

/// Resolves `(base, stride)` of `field` and checks that `T` can hold it.
fn resolve<T: NativeType>(layout: &MemoryLayout, field: usize) -> Result<(usize, usize)> {
    let (base, stride) = layout.field_base_and_stride(field)?;
    let declared = layout.schema().fields()[field].data_type;
    if !T::is_compatible(declared) {
        return Err(StrataError::TypeMismatch {
            expected: declared.to_string(),
            actual: T::TYPE.to_string(),
        });
    }
    Ok((base, stride))
}

/// Typed read/write access to one field of a [`BoundLayout`].
///
/// Several accessors for different fields may be alive at once; they all
/// borrow the bound layout, so no record can be pushed while they exist.
///
/// ```ignore
/// let key = bound.field::<i32>(0)?;
/// for record in 0..bound.capacity() {
///     key.set(record, 1)?;
/// }
/// ```
pub struct FieldAccessor<'a, T: NativeType> {
    /// Address of this field in record 0.
    ptr: NonNull<u8>,
    stride: usize,
    capacity: usize,
    field: usize,
    _marker: PhantomData<(&'a (), T)>,
}

impl<'a, T: NativeType> FieldAccessor<'a, T> {
    pub(crate) fn new(bound: &'a BoundLayout<'_>, field: usize) -> Result<Self> {
        let layout = bound.layout();
        let (base, stride) = resolve::<T>(layout, field)?;
        // SAFETY: base is a column or field offset below buffer_size.
        let ptr = unsafe { bound.base().add(base) };
        Ok(Self {
            ptr,
            stride,
            capacity: layout.capacity(),
            field,
            _marker: PhantomData,
        })
    }

    /// Returns the index of the field.
    #[inline]
    pub fn field_index(&self) -> usize {
        self.field
    }

    /// Returns the number of records addressable through this accessor.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the value of this field in record `record`.
    ///
    /// Checked against capacity, not against the number of pushed records.
    #[inline]
    pub fn get(&self, record: usize) -> Result<T> {
        if record >= self.capacity {
            return Err(StrataError::record_out_of_bounds(record, self.capacity));
        }
        // SAFETY: record < capacity.
        Ok(unsafe { self.get_unchecked(record) })
    }

    /// Sets the value of this field in record `record`.
    #[inline]
    pub fn set(&self, record: usize, value: T) -> Result<()> {
        if record >= self.capacity {
            return Err(StrataError::record_out_of_bounds(record, self.capacity));
        }
        // SAFETY: record < capacity.
        unsafe { self.set_unchecked(record, value) };
        Ok(())
    }

    /// Returns the value of this field in record `record` without checks.
    ///
    /// # Safety
    /// `record` must be less than `capacity()`.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, record: usize) -> T {
        unsafe { T::load(self.ptr.as_ptr().add(record * self.stride)) }
    }

    /// Sets the value of this field in record `record` without checks.
    ///
    /// # Safety
    /// `record` must be less than `capacity()`.
    #[inline(always)]
    pub unsafe fn set_unchecked(&self, record: usize, value: T) {
        unsafe { value.store(self.ptr.as_ptr().add(record * self.stride)) }
    }
}

impl<T: NativeType> Clone for FieldAccessor<'_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: NativeType> Copy for FieldAccessor<'_, T> {}

impl<T: NativeType> std::fmt::Debug for FieldAccessor<'_, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FieldAccessor")
            .field("field", &self.field)
            .field("type", &T::TYPE)
            .field("stride", &self.stride)
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Typed read-only access to one field of a [`BufferView`].
///
/// Bounded by the committed record count of the viewed buffer.
pub struct FieldReader<'a, T: NativeType> {
    ptr: NonNull<u8>,
    stride: usize,
    len: usize,
    field: usize,
    _marker: PhantomData<(&'a [u8], T)>,
}

// SAFETY: a reader only loads from a buffer that no handle can write while
// the borrowed view is alive.
unsafe impl<T: NativeType> Send for FieldReader<'_, T> {}
unsafe impl<T: NativeType> Sync for FieldReader<'_, T> {}

impl<'a, T: NativeType> FieldReader<'a, T> {
    pub(crate) fn new(view: &'a BufferView<'_>, field: usize) -> Result<Self> {
        let layout = view.layout();
        let (base, stride) = resolve::<T>(layout, field)?;
        // SAFETY: base is a column or field offset below buffer_size.
        let ptr = unsafe { view.base().add(base) };
        Ok(Self {
            ptr,
            stride,
            len: view.number_of_records(),
            field,
            _marker: PhantomData,
        })
    }

    /// Returns the index of the field.
    #[inline]
    pub fn field_index(&self) -> usize {
        self.field
    }

    /// Returns the number of readable records.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns true if the viewed buffer holds no records.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the value of this field in record `record`.
    #[inline]
    pub fn get(&self, record: usize) -> Result<T> {
        if record >= self.len {
            return Err(StrataError::record_out_of_bounds(record, self.len));
        }
        // SAFETY: record < len <= capacity.
        Ok(unsafe { self.get_unchecked(record) })
    }

    /// Returns the value of this field in record `record` without checks.
    ///
    /// # Safety
    /// `record` must be less than the layout's capacity.
    #[inline(always)]
    pub unsafe fn get_unchecked(&self, record: usize) -> T {
        unsafe { T::load(self.ptr.as_ptr().add(record * self.stride)) }
    }

    /// Iterates over the field's values in record order.
    pub fn iter(&self) -> impl Iterator<Item = T> + '_ {
        // SAFETY: record < len.
        (0..self.len).map(move |record| unsafe { self.get_unchecked(record) })
    }
}
