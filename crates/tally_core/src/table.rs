//! Row-oriented in-memory tables with schema-checked writes.

use crate::errors::{CoreError, Result};
use crate::value::{DataType, Value};

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub data_type: DataType,
    pub nullable: bool,
}

impl Field {
    pub fn new(name: impl Into<String>, data_type: DataType, nullable: bool) -> Field {
        Field {
            name: name.into(),
            data_type,
            nullable,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    fields: Vec<Field>,
}

impl TableSchema {
    pub fn new(fields: Vec<Field>) -> TableSchema {
        TableSchema { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn num_fields(&self) -> usize {
        self.fields.len()
    }

    pub fn field_index(&self, name: &str) -> Result<usize> {
        self.fields
            .iter()
            .position(|f| f.name == name)
            .ok_or_else(|| CoreError::UnknownColumn(name.to_string()))
    }
}

/// An in-memory table. Rows are validated against the schema on insert, so a
/// constructed table always holds well-typed data.
#[derive(Debug, Clone, PartialEq)]
pub struct MemTable {
    schema: TableSchema,
    rows: Vec<Vec<Value>>,
}

impl MemTable {
    pub fn new(schema: TableSchema) -> MemTable {
        MemTable {
            schema,
            rows: Vec::new(),
        }
    }

    pub fn schema(&self) -> &TableSchema {
        &self.schema
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    /// Append a row, checking arity, types and nullability.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.schema.num_fields() {
            return Err(CoreError::ArityMismatch {
                expected: self.schema.num_fields(),
                found: row.len(),
            });
        }
        for (value, field) in row.iter().zip(self.schema.fields()) {
            if value.is_null() {
                if !field.nullable {
                    return Err(CoreError::NullNotAllowed {
                        field: field.name.clone(),
                    });
                }
                continue;
            }
            if !field.data_type.accepts(value) {
                return Err(CoreError::TypeMismatch {
                    expected: field.data_type,
                    found: value
                        .data_type()
                        .map(|dt| dt.to_string())
                        .unwrap_or_else(|| "null".to_string()),
                });
            }
        }
        self.rows.push(row);
        Ok(())
    }

    /// All values of a single column, in row order.
    pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
        let idx = self.schema.field_index(name)?;
        Ok(self.rows.iter().map(|row| &row[idx]).collect())
    }
}
