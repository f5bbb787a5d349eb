//! Record schemas.
//!
//! A schema is an ordered list of named, typed fields. The order is the
//! physical field order inside a record, so it is fixed once the schema is
//! built. Layouts hold schemas behind an `Arc` and never mutate them.

use crate::types::PrimitiveType;
use serde::{Deserialize, Serialize};

/// A single named field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Field name. Not required to be unique.
    pub name: String,
    /// Declared type of the field.
    pub data_type: PrimitiveType,
}

impl Field {
    /// Creates a new field.
    pub fn new(name: impl Into<String>, data_type: PrimitiveType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }

    /// Returns the byte width of this field.
    #[inline]
    pub fn size(&self) -> usize {
        self.data_type.size()
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.name, self.data_type)
    }
}

/// An immutable, ordered collection of fields.
///
/// Only the fields are serialized. The record size is always derived from
/// them, including after deserialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "SchemaFields")]
pub struct Schema {
    fields: Vec<Field>,
    /// Sum of all field widths, computed once at build time.
    #[serde(skip)]
    record_size: usize,
}

/// Serialized form of a [`Schema`].
#[derive(Deserialize)]
struct SchemaFields {
    fields: Vec<Field>,
}

impl From<SchemaFields> for Schema {
    fn from(repr: SchemaFields) -> Self {
        Schema::new(repr.fields)
    }
}

impl Schema {
    /// Creates a schema from a list of fields.
    pub fn new(fields: Vec<Field>) -> Self {
        let record_size = fields.iter().map(Field::size).sum();
        Self {
            fields,
            record_size,
        }
    }

    /// Starts building a schema field by field.
    pub fn builder() -> SchemaBuilder {
        SchemaBuilder::default()
    }

    /// Returns the fields in physical order.
    #[inline]
    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// Returns the field at `index`.
    #[inline]
    pub fn field(&self, index: usize) -> Option<&Field> {
        self.fields.get(index)
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true if the schema has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Returns the size of one record in bytes.
    #[inline]
    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Returns the index of the first field called `name`.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }

    /// Iterates over the declared field types in order.
    pub fn types(&self) -> impl Iterator<Item = PrimitiveType> + '_ {
        self.fields.iter().map(|f| f.data_type)
    }
}

impl std::fmt::Display for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", field)?;
        }
        write!(f, ")")
    }
}

/// Builder for [`Schema`].
#[derive(Debug, Default)]
pub struct SchemaBuilder {
    fields: Vec<Field>,
}

impl SchemaBuilder {
    /// Appends a field.
    pub fn field(mut self, name: impl Into<String>, data_type: PrimitiveType) -> Self {
        self.fields.push(Field::new(name, data_type));
        self
    }

    /// Finishes the schema.
    pub fn build(self) -> Schema {
        Schema::new(self.fields)
    }
}
