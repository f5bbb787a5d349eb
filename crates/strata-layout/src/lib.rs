//! Memory layouts for tuple buffers.
//!
//! A [`MemoryLayout`] decides where every field of every record lives inside
//! a fixed-size [`TupleBuffer`]:
//! - Row layout: records are stored one after another
//! - Column layout: each field is stored as a contiguous column
//!
//! Layouts are built once per schema and buffer size and shared behind an
//! `Arc`. Mapping a layout onto a buffer yields a [`BoundLayout`] for filling
//! it, viewing a committed buffer yields a read-only [`BufferView`]. Both
//! offer a checked tier returning `Result` and an `unsafe` unchecked tier
//! for hot loops, plus per-field typed accessors. A committed buffer can be
//! compressed in place with [`CompressedBuffer`] before it is shipped.
//!
//! [`TupleBuffer`]: strata_buffer::TupleBuffer

mod bound;
mod column;
mod compression;
mod field;
mod layout;
mod native;
mod record;
mod row;
mod view;

pub use bound::BoundLayout;
pub use column::ColumnLayout;
pub use compression::{CompressedBuffer, CompressionAlgorithm, CompressionMode};
pub use field::{FieldAccessor, FieldReader};
pub use layout::{LayoutKind, MemoryLayout};
pub use native::{NativeType, RecordTuple};
pub use record::Record;
pub use row::RowLayout;
pub use view::BufferView;
