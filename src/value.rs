use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single column value as exchanged with the storage engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
  Null,
  Bool(bool),
  Int(i64),
  Float(f64),
  Text(String),
}

impl Value {
  pub fn is_null(&self) -> bool {
    matches!(self, Value::Null)
  }

  pub fn is_numeric(&self) -> bool {
    matches!(self, Value::Int(_) | Value::Float(_))
  }

  pub fn as_i64(&self) -> Option<i64> {
    match self {
      Value::Int(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_f64(&self) -> Option<f64> {
    match self {
      Value::Int(v) => Some(*v as f64),
      Value::Float(v) => Some(*v),
      _ => None,
    }
  }

  pub fn as_str(&self) -> Option<&str> {
    match self {
      Value::Text(s) => Some(s),
      _ => None,
    }
  }

  /// True for numeric values strictly below zero.
  pub fn is_negative(&self) -> bool {
    match self {
      Value::Int(v) => *v < 0,
      Value::Float(v) => *v < 0.0,
      _ => false,
    }
  }

  /// Absolute value of a numeric value. `None` for non-numeric values and
  /// for `i64::MIN`, which has no positive counterpart.
  pub fn abs(&self) -> Option<Value> {
    match self {
      Value::Int(v) => v.checked_abs().map(Value::Int),
      Value::Float(v) => Some(Value::Float(v.abs())),
      _ => None,
    }
  }

  /// Adds two numeric values. Integer addition is checked; mixing an integer
  /// with a float yields a float.
  pub fn checked_add(&self, delta: &Value) -> Option<Value> {
    match (self, delta) {
      (Value::Int(a), Value::Int(b)) => a.checked_add(*b).map(Value::Int),
      (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
        Some(Value::Float(self.as_f64()? + delta.as_f64()?))
      }
      _ => None,
    }
  }

  /// Orders two values of compatible types. Integers and floats compare
  /// numerically; text compares lexicographically. Mixed or null operands
  /// are unordered.
  pub fn compare(&self, other: &Value) -> Option<Ordering> {
    match (self, other) {
      (Value::Int(a), Value::Int(b)) => Some(a.cmp(b)),
      (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
        self.as_f64()?.partial_cmp(&other.as_f64()?)
      }
      (Value::Text(a), Value::Text(b)) => Some(a.cmp(b)),
      (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
      _ => None,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Value::Null => write!(f, "null"),
      Value::Bool(v) => write!(f, "{}", v),
      Value::Int(v) => write!(f, "{}", v),
      Value::Float(v) => write!(f, "{}", v),
      Value::Text(v) => write!(f, "{}", v),
    }
  }
}

impl From<i64> for Value {
  fn from(v: i64) -> Self {
    Value::Int(v)
  }
}

impl From<i32> for Value {
  fn from(v: i32) -> Self {
    Value::Int(v as i64)
  }
}

impl From<u32> for Value {
  fn from(v: u32) -> Self {
    Value::Int(v as i64)
  }
}

impl From<f64> for Value {
  fn from(v: f64) -> Self {
    Value::Float(v)
  }
}

impl From<bool> for Value {
  fn from(v: bool) -> Self {
    Value::Bool(v)
  }
}

impl From<&str> for Value {
  fn from(v: &str) -> Self {
    Value::Text(v.to_string())
  }
}

impl From<String> for Value {
  fn from(v: String) -> Self {
    Value::Text(v)
  }
}

impl<T: Into<Value>> From<Option<T>> for Value {
  fn from(v: Option<T>) -> Self {
    v.map_or(Value::Null, Into::into)
  }
}

// 2^63, exactly representable; integral floats in [-2^63, 2^63) fit an i64.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

/// The closed set of column kinds an entity field may have.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
  Integer,
  Text,
  Float,
  Boolean,
}

impl FieldKind {
  pub fn name(&self) -> &'static str {
    match self {
      FieldKind::Integer => "integer",
      FieldKind::Text => "text",
      FieldKind::Float => "float",
      FieldKind::Boolean => "boolean",
    }
  }

  /// Converts `value` into this kind, parsing text where needed.
  ///
  /// Null passes through unchanged. Floats convert to integers only when
  /// they carry no fractional part and fit an `i64`.
  pub fn coerce(&self, field: &str, value: &Value) -> Result<Value> {
    let mismatch = || Error::TypeMismatch {
      field: field.to_string(),
      expected: self.name().to_string(),
      value: value.to_string(),
    };

    let coerced = match (self, value) {
      (_, Value::Null) => Value::Null,

      (FieldKind::Integer, Value::Int(v)) => Value::Int(*v),
      (FieldKind::Integer, Value::Float(v)) if v.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(v) => {
        Value::Int(*v as i64)
      }
      (FieldKind::Integer, Value::Text(s)) => Value::Int(s.trim().parse::<i64>().map_err(|_| mismatch())?),
      (FieldKind::Integer, _) => return Err(mismatch()),

      (FieldKind::Text, Value::Text(s)) => Value::Text(s.clone()),
      (FieldKind::Text, other) => Value::Text(other.to_string()),

      (FieldKind::Float, Value::Float(v)) => Value::Float(*v),
      (FieldKind::Float, Value::Int(v)) => Value::Float(*v as f64),
      (FieldKind::Float, Value::Text(s)) => Value::Float(s.trim().parse::<f64>().map_err(|_| mismatch())?),
      (FieldKind::Float, _) => return Err(mismatch()),

      (FieldKind::Boolean, Value::Bool(v)) => Value::Bool(*v),
      (FieldKind::Boolean, Value::Int(0)) => Value::Bool(false),
      (FieldKind::Boolean, Value::Int(1)) => Value::Bool(true),
      (FieldKind::Boolean, Value::Text(s)) => match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Value::Bool(true),
        "false" | "0" => Value::Bool(false),
        _ => return Err(mismatch()),
      },
      (FieldKind::Boolean, _) => return Err(mismatch()),
    };

    Ok(coerced)
  }
}

impl fmt::Display for FieldKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.name())
  }
}
