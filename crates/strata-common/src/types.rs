//! Primitive field types and dynamically typed values.

use crate::error::{Result, StrataError};
use serde::{Deserialize, Serialize};

/// Identifier for every fixed-width type a schema field may declare.
///
/// All types have a fixed byte width, which is what lets a layout compute
/// offsets without looking at the data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum PrimitiveType {
    // Boolean
    Boolean = 1,

    // Single-byte character
    Char = 2,

    // Integer types
    Int8 = 10,
    Int16 = 11,
    Int32 = 12,
    Int64 = 13,

    // Unsigned integer types
    UInt8 = 20,
    UInt16 = 21,
    UInt32 = 22,
    UInt64 = 23,

    // Floating point types
    Float32 = 30,
    Float64 = 31,
}

impl PrimitiveType {
    /// Returns the byte width of a value of this type.
    #[inline]
    pub const fn size(&self) -> usize {
        match self {
            PrimitiveType::Boolean | PrimitiveType::Char => 1,
            PrimitiveType::Int8 | PrimitiveType::UInt8 => 1,
            PrimitiveType::Int16 | PrimitiveType::UInt16 => 2,
            PrimitiveType::Int32 | PrimitiveType::UInt32 | PrimitiveType::Float32 => 4,
            PrimitiveType::Int64 | PrimitiveType::UInt64 | PrimitiveType::Float64 => 8,
        }
    }

    /// Returns true if this type is an integer type (signed or unsigned).
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            PrimitiveType::Int8
                | PrimitiveType::Int16
                | PrimitiveType::Int32
                | PrimitiveType::Int64
                | PrimitiveType::UInt8
                | PrimitiveType::UInt16
                | PrimitiveType::UInt32
                | PrimitiveType::UInt64
        )
    }

    /// Returns true if this type is a floating-point type.
    pub fn is_floating_point(&self) -> bool {
        matches!(self, PrimitiveType::Float32 | PrimitiveType::Float64)
    }

    /// Returns true if this type is numeric.
    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_floating_point()
    }
}

impl std::fmt::Display for PrimitiveType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PrimitiveType::Boolean => "BOOLEAN",
            PrimitiveType::Char => "CHAR",
            PrimitiveType::Int8 => "INT8",
            PrimitiveType::Int16 => "INT16",
            PrimitiveType::Int32 => "INT32",
            PrimitiveType::Int64 => "INT64",
            PrimitiveType::UInt8 => "UINT8",
            PrimitiveType::UInt16 => "UINT16",
            PrimitiveType::UInt32 => "UINT32",
            PrimitiveType::UInt64 => "UINT64",
            PrimitiveType::Float32 => "FLOAT32",
            PrimitiveType::Float64 => "FLOAT64",
        };
        write!(f, "{}", name)
    }
}

/// A single field value of any primitive type.
///
/// Used by the checked whole-record path, where the element types of a
/// record are only known at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Boolean(bool),
    Char(u8),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
}

impl Value {
    /// Returns the primitive type of this value.
    pub fn data_type(&self) -> PrimitiveType {
        match self {
            Value::Boolean(_) => PrimitiveType::Boolean,
            Value::Char(_) => PrimitiveType::Char,
            Value::Int8(_) => PrimitiveType::Int8,
            Value::Int16(_) => PrimitiveType::Int16,
            Value::Int32(_) => PrimitiveType::Int32,
            Value::Int64(_) => PrimitiveType::Int64,
            Value::UInt8(_) => PrimitiveType::UInt8,
            Value::UInt16(_) => PrimitiveType::UInt16,
            Value::UInt32(_) => PrimitiveType::UInt32,
            Value::UInt64(_) => PrimitiveType::UInt64,
            Value::Float32(_) => PrimitiveType::Float32,
            Value::Float64(_) => PrimitiveType::Float64,
        }
    }

    /// Encodes the value into the first `self.data_type().size()` bytes of
    /// `dst` using native byte order.
    ///
    /// Fails with `BufferTooSmall` if `dst` is shorter than the type's width.
    #[inline]
    pub fn write_to(&self, dst: &mut [u8]) -> Result<()> {
        let size = self.data_type().size();
        let actual = dst.len();
        let dst = dst.get_mut(..size).ok_or(StrataError::BufferTooSmall {
            expected: size,
            actual,
        })?;
        match *self {
            Value::Boolean(v) => dst.copy_from_slice(&[v as u8]),
            Value::Char(v) => dst.copy_from_slice(&[v]),
            Value::Int8(v) => dst.copy_from_slice(&v.to_ne_bytes()),
            Value::Int16(v) => dst.copy_from_slice(&v.to_ne_bytes()),
            Value::Int32(v) => dst.copy_from_slice(&v.to_ne_bytes()),
            Value::Int64(v) => dst.copy_from_slice(&v.to_ne_bytes()),
            Value::UInt8(v) => dst.copy_from_slice(&v.to_ne_bytes()),
            Value::UInt16(v) => dst.copy_from_slice(&v.to_ne_bytes()),
            Value::UInt32(v) => dst.copy_from_slice(&v.to_ne_bytes()),
            Value::UInt64(v) => dst.copy_from_slice(&v.to_ne_bytes()),
            Value::Float32(v) => dst.copy_from_slice(&v.to_ne_bytes()),
            Value::Float64(v) => dst.copy_from_slice(&v.to_ne_bytes()),
        }
        Ok(())
    }

    /// Decodes a value of type `data_type` from `src` using native byte order.
    ///
    /// Returns None if `src` is shorter than the type's width.
    pub fn read_from(data_type: PrimitiveType, src: &[u8]) -> Option<Self> {
        let bytes = src.get(..data_type.size())?;
        let value = match data_type {
            PrimitiveType::Boolean => Value::Boolean(bytes[0] != 0),
            PrimitiveType::Char => Value::Char(bytes[0]),
            PrimitiveType::Int8 => Value::Int8(i8::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Int16 => Value::Int16(i16::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Int32 => Value::Int32(i32::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Int64 => Value::Int64(i64::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::UInt8 => Value::UInt8(bytes[0]),
            PrimitiveType::UInt16 => Value::UInt16(u16::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::UInt32 => Value::UInt32(u32::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::UInt64 => Value::UInt64(u64::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Float32 => Value::Float32(f32::from_ne_bytes(bytes.try_into().ok()?)),
            PrimitiveType::Float64 => Value::Float64(f64::from_ne_bytes(bytes.try_into().ok()?)),
        };
        Some(value)
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Boolean(v) => write!(f, "{}", v),
            Value::Char(v) => write!(f, "{}", *v as char),
            Value::Int8(v) => write!(f, "{}", v),
            Value::Int16(v) => write!(f, "{}", v),
            Value::Int32(v) => write!(f, "{}", v),
            Value::Int64(v) => write!(f, "{}", v),
            Value::UInt8(v) => write!(f, "{}", v),
            Value::UInt16(v) => write!(f, "{}", v),
            Value::UInt32(v) => write!(f, "{}", v),
            Value::UInt64(v) => write!(f, "{}", v),
            Value::Float32(v) => write!(f, "{}", v),
            Value::Float64(v) => write!(f, "{}", v),
        }
    }
}

macro_rules! value_from {
    ($t:ty, $v:ident) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$v(v)
            }
        }
    };
}

value_from!(bool, Boolean);
value_from!(i8, Int8);
value_from!(i16, Int16);
value_from!(i32, Int32);
value_from!(i64, Int64);
value_from!(u8, UInt8);
value_from!(u16, UInt16);
value_from!(u32, UInt32);
value_from!(u64, UInt64);
value_from!(f32, Float32);
value_from!(f64, Float64);
