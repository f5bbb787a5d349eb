//! Rust types that map onto schema fields.
//!
//! [`NativeType`] is the element type of a field accessor, and
//! [`RecordTuple`] is a Rust tuple of native types that can be pushed or read
//! as one record. Both encode values in native byte order with unaligned
//! loads and stores, exactly like [`Value::write_to`], so typed and dynamic
//! access produce the same bytes.
//!
//! [`Value::write_to`]: strata_common::Value::write_to

use strata_common::{PrimitiveType, Schema};

mod private {
    pub trait NativeSealed {}
}

/// A fixed-width Rust type that can be stored in a field.
pub trait NativeType: private::NativeSealed + Copy + Send + Sync + 'static {
    /// The primitive type this Rust type is declared as.
    const TYPE: PrimitiveType;

    /// Returns true if a field declared as `data_type` can hold this type.
    #[inline]
    fn is_compatible(data_type: PrimitiveType) -> bool {
        data_type == Self::TYPE
    }

    /// Loads a value from `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for reads of `Self::TYPE.size()` bytes.
    unsafe fn load(ptr: *const u8) -> Self;

    /// Stores this value at `ptr`.
    ///
    /// # Safety
    /// `ptr` must be valid for writes of `Self::TYPE.size()` bytes.
    unsafe fn store(self, ptr: *mut u8);
}

macro_rules! native_type {
    ($t:ty, $v:ident) => {
        impl private::NativeSealed for $t {}

        impl NativeType for $t {
            const TYPE: PrimitiveType = PrimitiveType::$v;

            #[inline(always)]
            unsafe fn load(ptr: *const u8) -> Self {
                unsafe { ptr.cast::<$t>().read_unaligned() }
            }

            #[inline(always)]
            unsafe fn store(self, ptr: *mut u8) {
                unsafe { ptr.cast::<$t>().write_unaligned(self) }
            }
        }
    };
}

native_type!(i8, Int8);
native_type!(i16, Int16);
native_type!(i32, Int32);
native_type!(i64, Int64);
native_type!(u16, UInt16);
native_type!(u32, UInt32);
native_type!(u64, UInt64);
native_type!(f32, Float32);
native_type!(f64, Float64);

impl private::NativeSealed for u8 {}

impl NativeType for u8 {
    const TYPE: PrimitiveType = PrimitiveType::UInt8;

    // Char fields are single raw bytes as well.
    #[inline]
    fn is_compatible(data_type: PrimitiveType) -> bool {
        matches!(data_type, PrimitiveType::UInt8 | PrimitiveType::Char)
    }

    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        unsafe { ptr.read() }
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        unsafe { ptr.write(self) }
    }
}

impl private::NativeSealed for bool {}

impl NativeType for bool {
    const TYPE: PrimitiveType = PrimitiveType::Boolean;

    // Any non-zero byte reads as true, so foreign bytes never produce an
    // invalid bool.
    #[inline(always)]
    unsafe fn load(ptr: *const u8) -> Self {
        unsafe { ptr.read() != 0 }
    }

    #[inline(always)]
    unsafe fn store(self, ptr: *mut u8) {
        unsafe { ptr.write(self as u8) }
    }
}

/// A Rust tuple whose elements are laid out as one record.
///
/// Implemented for tuples of one to sixteen [`NativeType`] elements.
pub trait RecordTuple: Sized {
    /// Number of fields in the tuple.
    const ARITY: usize;

    /// Returns true if every element matches the corresponding schema field.
    fn matches(schema: &Schema) -> bool;

    /// Stores every element at `base + offset_of(field)`.
    ///
    /// # Safety
    /// For every field index `i < ARITY`, `base + offset_of(i)` must be
    /// valid for writes of that element's width.
    unsafe fn store_fields<F: Fn(usize) -> usize>(self, base: *mut u8, offset_of: F);

    /// Loads every element from `base + offset_of(field)`.
    ///
    /// # Safety
    /// For every field index `i < ARITY`, `base + offset_of(i)` must be
    /// valid for reads of that element's width.
    unsafe fn load_fields<F: Fn(usize) -> usize>(base: *const u8, offset_of: F) -> Self;
}

macro_rules! record_tuple {
    ($arity:expr; $($idx:tt : $T:ident),+) => {
        impl<$($T: NativeType),+> RecordTuple for ($($T,)+) {
            const ARITY: usize = $arity;

            fn matches(schema: &Schema) -> bool {
                let fields = schema.fields();
                fields.len() == $arity $(&& $T::is_compatible(fields[$idx].data_type))+
            }

            #[inline(always)]
            unsafe fn store_fields<F: Fn(usize) -> usize>(self, base: *mut u8, offset_of: F) {
                unsafe {
                    $( self.$idx.store(base.add(offset_of($idx))); )+
                }
            }

            #[inline(always)]
            unsafe fn load_fields<F: Fn(usize) -> usize>(base: *const u8, offset_of: F) -> Self {
                unsafe { ($( $T::load(base.add(offset_of($idx))), )+) }
            }
        }
    };
}

record_tuple!(1; 0: A);
record_tuple!(2; 0: A, 1: B);
record_tuple!(3; 0: A, 1: B, 2: C);
record_tuple!(4; 0: A, 1: B, 2: C, 3: D);
record_tuple!(5; 0: A, 1: B, 2: C, 3: D, 4: E);
record_tuple!(6; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0);
record_tuple!(7; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0, 6: G);
record_tuple!(8; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0, 6: G, 7: H);
record_tuple!(9; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0, 6: G, 7: H, 8: I);
record_tuple!(10; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0, 6: G, 7: H, 8: I, 9: J);
record_tuple!(11; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0, 6: G, 7: H, 8: I, 9: J, 10: K);
record_tuple!(12; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0, 6: G, 7: H, 8: I, 9: J, 10: K, 11: L);
record_tuple!(13; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0, 6: G, 7: H, 8: I, 9: J, 10: K, 11: L, 12: M);
record_tuple!(14; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0, 6: G, 7: H, 8: I, 9: J, 10: K, 11: L, 12: M, 13: N);
record_tuple!(15; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0, 6: G, 7: H, 8: I, 9: J, 10: K, 11: L, 12: M, 13: N, 14: O);
record_tuple!(16; 0: A, 1: B, 2: C, 3: D, 4: E, 5: F0, 6: G, 7: H, 8: I, 9: J, 10: K, 11: L, 12: M, 13: N, 14: O, 15: P);

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::Value;

    #[test]
    fn test_native_types() {
        assert_eq!(<i32 as NativeType>::TYPE, PrimitiveType::Int32);
        assert_eq!(<u64 as NativeType>::TYPE, PrimitiveType::UInt64);
        assert_eq!(<f64 as NativeType>::TYPE, PrimitiveType::Float64);
        assert_eq!(<bool as NativeType>::TYPE, PrimitiveType::Boolean);
    }

    #[test]
    fn test_u8_accepts_char() {
        assert!(u8::is_compatible(PrimitiveType::UInt8));
        assert!(u8::is_compatible(PrimitiveType::Char));
        assert!(!i8::is_compatible(PrimitiveType::Char));
        assert!(!i32::is_compatible(PrimitiveType::UInt32));
    }

    #[test]
    fn test_store_matches_value_encoding() {
        let mut typed = [0u8; 8];
        let mut dynamic = [0u8; 8];

        unsafe { (-12345i64).store(typed.as_mut_ptr()) };
        Value::Int64(-12345).write_to(&mut dynamic).unwrap();
        assert_eq!(typed, dynamic);

        let loaded = unsafe { i64::load(dynamic.as_ptr()) };
        assert_eq!(loaded, -12345);
    }

    #[test]
    fn test_unaligned_access() {
        let mut buf = [0u8; 9];
        let ptr = unsafe { buf.as_mut_ptr().add(1) };
        unsafe { 1.5f64.store(ptr) };
        assert_eq!(unsafe { f64::load(ptr) }, 1.5);
    }

    #[test]
    fn test_bool_reads_nonzero_as_true() {
        let buf = [7u8];
        assert!(unsafe { bool::load(buf.as_ptr()) });
    }

    #[test]
    fn test_record_tuple_matches() {
        let schema = Schema::builder()
            .field("a", PrimitiveType::Int32)
            .field("b", PrimitiveType::Float64)
            .build();

        assert!(<(i32, f64)>::matches(&schema));
        assert!(!<(i32, f32)>::matches(&schema));
        assert!(!<(i32,)>::matches(&schema));
        assert!(!<(i32, f64, u8)>::matches(&schema));
        assert_eq!(<(i32, f64)>::ARITY, 2);
    }

    #[test]
    fn test_record_tuple_store_load() {
        let mut buf = [0u8; 13];
        let offsets = [0usize, 4, 12];

        unsafe { (7i32, 2.5f64, true).store_fields(buf.as_mut_ptr(), |f| offsets[f]) };
        let loaded: (i32, f64, bool) =
            unsafe { RecordTuple::load_fields(buf.as_ptr(), |f| offsets[f]) };

        assert_eq!(loaded, (7, 2.5, true));
        assert_eq!(&buf[0..4], &7i32.to_ne_bytes());
    }
}
