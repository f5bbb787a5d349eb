//! Dynamically typed records.

use strata_common::{Schema, Value};

/// One record as a list of field values in schema order.
///
/// This is the currency of the checked whole-record path, used when the
/// field types are only known at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    values: Vec<Value>,
}

impl Record {
    /// Creates a record from field values.
    pub fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    /// Returns the field values.
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Returns the value of the field at `index`.
    #[inline]
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Returns the value of the field called `name` in `schema`.
    pub fn get_by_name(&self, schema: &Schema, name: &str) -> Option<&Value> {
        schema.index_of(name).and_then(|index| self.values.get(index))
    }

    /// Returns the number of fields.
    #[inline]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if the record has no fields.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl From<Vec<Value>> for Record {
    fn from(values: Vec<Value>) -> Self {
        Self::new(values)
    }
}

impl std::fmt::Display for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for (i, value) in self.values.iter().enumerate() {
            if i > 0 {
                write!(f, "|")?;
            }
            write!(f, "{}", value)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_common::PrimitiveType;

    #[test]
    fn test_record_accessors() {
        let record = Record::new(vec![Value::Int32(1), Value::Float64(2.5)]);

        assert_eq!(record.len(), 2);
        assert!(!record.is_empty());
        assert_eq!(record.get(1), Some(&Value::Float64(2.5)));
        assert_eq!(record.get(2), None);
    }

    #[test]
    fn test_get_by_name() {
        let schema = Schema::builder()
            .field("id", PrimitiveType::Int32)
            .field("price", PrimitiveType::Float64)
            .build();
        let record = Record::from(vec![Value::Int32(9), Value::Float64(0.5)]);

        assert_eq!(record.get_by_name(&schema, "price"), Some(&Value::Float64(0.5)));
        assert_eq!(record.get_by_name(&schema, "missing"), None);
    }

    #[test]
    fn test_display() {
        let record = Record::new(vec![Value::Int32(1), Value::Boolean(true), Value::Char(b'z')]);
        assert_eq!(record.to_string(), "1|true|z");
    }
}
