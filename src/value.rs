//! # Field Values
//!
//! [`Value`] is the tagged union a record decodes into: character data,
//! doubles, logicals, dates, and raw bytes for binary memos. Typed
//! projections fail with `InvalidArgument` when the underlying variant does
//! not support them, with the exception of [`Value::as_string`], which
//! renders any variant.

use std::fmt;

use crate::date::Date;
use crate::error::{Result, XbaseError};

/// A decoded field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Character and memo text.
    Text(String),
    /// Numeric and float fields.
    Number(f64),
    /// Logical fields.
    Logical(bool),
    /// Date fields.
    Date(Date),
    /// Binary and general memo payloads.
    Bytes(Vec<u8>),
}

impl Value {
    /// Renders the value as a string, whatever its variant.
    pub fn as_string(&self) -> String {
        self.to_string()
    }

    /// The numeric value, failing unless this is a number.
    pub fn as_f64(&self) -> Result<f64> {
        match self {
            Value::Number(n) => Ok(*n),
            other => Err(XbaseError::invalid(format!(
                "numeric projection of a {} value",
                other.variant_name()
            ))),
        }
    }

    /// The numeric value truncated to an integer.
    pub fn as_i64(&self) -> Result<i64> {
        Ok(self.as_f64()? as i64)
    }

    /// The logical value, failing unless this is a logical.
    pub fn as_bool(&self) -> Result<bool> {
        match self {
            Value::Logical(b) => Ok(*b),
            other => Err(XbaseError::invalid(format!(
                "boolean projection of a {} value",
                other.variant_name()
            ))),
        }
    }

    /// The date value, failing unless this is a date.
    pub fn as_date(&self) -> Result<Date> {
        match self {
            Value::Date(d) => Ok(*d),
            other => Err(XbaseError::invalid(format!(
                "date projection of a {} value",
                other.variant_name()
            ))),
        }
    }

    /// The raw bytes of a binary value, or the display bytes of any other.
    pub fn as_bytes(&self) -> Vec<u8> {
        match self {
            Value::Bytes(b) => b.clone(),
            Value::Text(s) => s.clone().into_bytes(),
            other => other.to_string().into_bytes(),
        }
    }

    /// Length in bytes of the stored representation; used by the memo store
    /// to size block chains.
    pub(crate) fn byte_len(&self) -> usize {
        match self {
            Value::Text(s) => s.len(),
            Value::Bytes(b) => b.len(),
            other => other.to_string().len(),
        }
    }

    fn variant_name(&self) -> &'static str {
        match self {
            Value::Text(_) => "text",
            Value::Number(_) => "number",
            Value::Logical(_) => "logical",
            Value::Date(_) => "date",
            Value::Bytes(_) => "binary",
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(s) => f.write_str(s),
            Value::Number(n) => {
                if n.fract() == 0.0 && n.abs() < 1e15 {
                    write!(f, "{}", *n as i64)
                } else {
                    write!(f, "{n}")
                }
            }
            Value::Logical(b) => f.write_str(if *b { "T" } else { "F" }),
            Value::Date(d) => {
                if d.is_blank() {
                    f.write_str("        ")
                } else {
                    f.write_str(&d.dtos())
                }
            }
            Value::Bytes(b) => write!(f, "{}", String::from_utf8_lossy(b)),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Logical(b)
    }
}

impl From<Date> for Value {
    fn from(d: Date) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Bytes(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Bytes(b.to_vec())
    }
}
