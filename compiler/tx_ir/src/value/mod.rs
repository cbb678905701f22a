//! Runtime values.
//!
//! [`Value`] is the closed set of things an expression can evaluate to.
//! Conversions never panic: each returns a [`ConversionError`] naming the
//! requested and actual types.

use std::fmt;

use crate::twin::{PropertyValue, TwinRef};
use crate::DateTime;

/// Semantic type of an expression or value.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ValueType {
    Bool,
    Double,
    String,
    DateTime,
    Array,
    Twin,
    Object,
    Null,
    Unknown,
}

impl ValueType {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Double => "double",
            Self::String => "string",
            Self::DateTime => "datetime",
            Self::Array => "array",
            Self::Twin => "twin",
            Self::Object => "object",
            Self::Null => "null",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A value could not be converted to the requested type.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("cannot convert {found} to {expected}")]
pub struct ConversionError {
    pub expected: ValueType,
    pub found: ValueType,
}

/// Result of evaluating an expression.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    /// No value: an unresolved reference or an undefined operation.
    Undefined,
    Null,
    Bool(bool),
    Double(f64),
    String(String),
    DateTime(DateTime),
    Array(Vec<Value>),
    Twin(TwinRef),
}

impl Value {
    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Undefined => ValueType::Unknown,
            Value::Null => ValueType::Null,
            Value::Bool(_) => ValueType::Bool,
            Value::Double(_) => ValueType::Double,
            Value::String(_) => ValueType::String,
            Value::DateTime(_) => ValueType::DateTime,
            Value::Array(_) => ValueType::Array,
            Value::Twin(_) => ValueType::Twin,
        }
    }

    #[inline]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Numbers and booleans are both numeric; `true` is `1`.
    pub fn is_numeric(&self) -> bool {
        matches!(self, Value::Double(_) | Value::Bool(_))
    }

    fn mismatch(&self, expected: ValueType) -> ConversionError {
        ConversionError {
            expected,
            found: self.value_type(),
        }
    }

    pub fn as_f64(&self) -> Result<f64, ConversionError> {
        match self {
            Value::Double(d) => Ok(*d),
            Value::Bool(b) => Ok(if *b { 1.0 } else { 0.0 }),
            Value::String(s) => s.trim().parse().map_err(|_| self.mismatch(ValueType::Double)),
            _ => Err(self.mismatch(ValueType::Double)),
        }
    }

    pub fn as_bool(&self) -> Result<bool, ConversionError> {
        match self {
            Value::Bool(b) => Ok(*b),
            Value::Double(d) => Ok(*d != 0.0),
            Value::String(s) if s.eq_ignore_ascii_case("true") => Ok(true),
            Value::String(s) if s.eq_ignore_ascii_case("false") => Ok(false),
            _ => Err(self.mismatch(ValueType::Bool)),
        }
    }

    pub fn as_str(&self) -> Result<&str, ConversionError> {
        match self {
            Value::String(s) => Ok(s),
            _ => Err(self.mismatch(ValueType::String)),
        }
    }

    pub fn as_datetime(&self) -> Result<DateTime, ConversionError> {
        match self {
            Value::DateTime(d) => Ok(*d),
            _ => Err(self.mismatch(ValueType::DateTime)),
        }
    }

    pub fn as_twin(&self) -> Result<&TwinRef, ConversionError> {
        match self {
            Value::Twin(t) => Ok(t),
            _ => Err(self.mismatch(ValueType::Twin)),
        }
    }

    pub fn as_array(&self) -> Result<&[Value], ConversionError> {
        match self {
            Value::Array(items) => Ok(items),
            _ => Err(self.mismatch(ValueType::Array)),
        }
    }

    /// Text form used by string functions (`TOUPPER(3)` is `"3"`).
    pub fn to_text(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(true) => f.write_str("True"),
            Value::Bool(false) => f.write_str("False"),
            Value::Double(d) => write!(f, "{d}"),
            Value::String(s) => f.write_str(s),
            Value::DateTime(d) => write!(f, "{d}"),
            Value::Array(items) => {
                f.write_str("{")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("}")
            }
            Value::Twin(t) => write!(f, "[{}]", t.id),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(d: f64) -> Self {
        Value::Double(d)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_owned())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<DateTime> for Value {
    fn from(d: DateTime) -> Self {
        Value::DateTime(d)
    }
}

impl From<TwinRef> for Value {
    fn from(t: TwinRef) -> Self {
        Value::Twin(t)
    }
}

impl From<&PropertyValue> for Value {
    /// Nested objects have no scalar form and become their JSON text.
    fn from(p: &PropertyValue) -> Self {
        match p {
            PropertyValue::Null => Value::Null,
            PropertyValue::Bool(b) => Value::Bool(*b),
            PropertyValue::Number(n) => Value::Double(*n),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Array(items) => Value::Array(items.iter().map(Value::from).collect()),
            PropertyValue::Object(map) => Value::String(map.to_json()),
        }
    }
}
