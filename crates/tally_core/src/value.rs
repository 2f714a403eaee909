//! Dynamically typed values and their logical types.

use std::fmt;

use chrono::NaiveDate;

use crate::errors::{CoreError, Result};

/// Logical type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    Bool,
    Int32,
    Int64,
    Float64,
    Utf8,
    Date,
}

impl DataType {
    /// Check whether a value can be stored under this type.
    ///
    /// `Null` is accepted for every type; nullability is a property of the
    /// field, not the type.
    pub fn accepts(&self, value: &Value) -> bool {
        match value.data_type() {
            Some(dt) => dt == *self,
            None => true,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Bool => write!(f, "bool"),
            DataType::Int32 => write!(f, "int32"),
            DataType::Int64 => write!(f, "int64"),
            DataType::Float64 => write!(f, "float64"),
            DataType::Utf8 => write!(f, "utf8"),
            DataType::Date => write!(f, "date"),
        }
    }
}

/// A single scalar value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Float64(f64),
    Utf8(String),
    Date(NaiveDate),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The logical type of this value. `Null` carries no type.
    pub fn data_type(&self) -> Option<DataType> {
        Some(match self {
            Value::Null => return None,
            Value::Bool(_) => DataType::Bool,
            Value::Int32(_) => DataType::Int32,
            Value::Int64(_) => DataType::Int64,
            Value::Float64(_) => DataType::Float64,
            Value::Utf8(_) => DataType::Utf8,
            Value::Date(_) => DataType::Date,
        })
    }

    pub fn try_as_i32(&self) -> Result<i32> {
        match self {
            Value::Int32(v) => Ok(*v),
            other => Err(type_mismatch(DataType::Int32, other)),
        }
    }

    pub fn try_as_f64(&self) -> Result<f64> {
        match self {
            Value::Float64(v) => Ok(*v),
            other => Err(type_mismatch(DataType::Float64, other)),
        }
    }

    pub fn try_as_str(&self) -> Result<&str> {
        match self {
            Value::Utf8(v) => Ok(v),
            other => Err(type_mismatch(DataType::Utf8, other)),
        }
    }

    pub fn try_as_date(&self) -> Result<NaiveDate> {
        match self {
            Value::Date(v) => Ok(*v),
            other => Err(type_mismatch(DataType::Date, other)),
        }
    }
}

fn type_mismatch(expected: DataType, found: &Value) -> CoreError {
    CoreError::TypeMismatch {
        expected,
        found: found
            .data_type()
            .map(|dt| dt.to_string())
            .unwrap_or_else(|| "null".to_string()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Bool(v) => write!(f, "{v}"),
            Value::Int32(v) => write!(f, "{v}"),
            Value::Int64(v) => write!(f, "{v}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Utf8(v) => write!(f, "{v}"),
            Value::Date(v) => write!(f, "{v}"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int64(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float64(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Utf8(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Value::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_matching_type() {
        assert!(DataType::Int32.accepts(&Value::Int32(4)));
        assert!(!DataType::Int32.accepts(&Value::Int64(4)));
        assert!(!DataType::Utf8.accepts(&Value::Float64(1.5)));
    }

    #[test]
    fn accepts_null_for_any_type() {
        assert!(DataType::Bool.accepts(&Value::Null));
        assert!(DataType::Date.accepts(&Value::Null));
    }

    #[test]
    fn option_into_value() {
        assert_eq!(Value::from(Some(3_i32)), Value::Int32(3));
        assert_eq!(Value::from(None::<i32>), Value::Null);
    }

    #[test]
    fn try_as_mismatch_names_found_type() {
        let err = Value::Utf8("x".to_string()).try_as_i32().unwrap_err();
        assert_eq!(
            err.to_string(),
            "type mismatch: expected int32, found utf8"
        );
    }
}
