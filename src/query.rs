//! Predicates and assignments passed to the storage engine.
//!
//! Engines need only two comparison operators: equality for routing and
//! lookups, and greater-or-equal for balance guards.

use crate::record::Fields;
use crate::value::Value;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
  Eq(Value),
  Gte(Value),
}

impl Condition {
  pub fn matches(&self, actual: Option<&Value>) -> bool {
    match (self, actual) {
      (Condition::Eq(expected), Some(actual)) => actual == expected,
      (Condition::Eq(expected), None) => expected.is_null(),
      (Condition::Gte(bound), Some(actual)) => {
        matches!(actual.compare(bound), Some(Ordering::Greater | Ordering::Equal))
      }
      (Condition::Gte(_), None) => false,
    }
  }
}

/// A conjunction of per-column conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Predicate {
  conditions: Vec<(String, Condition)>,
}

impl Predicate {
  pub fn new() -> Self {
    Self::default()
  }

  /// Equality on every entry of `fields`.
  pub fn from_fields(fields: &Fields) -> Self {
    let conditions = fields
      .iter()
      .map(|(k, v)| (k.clone(), Condition::Eq(v.clone())))
      .collect();
    Self { conditions }
  }

  pub fn eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.push(field, Condition::Eq(value.into()));
    self
  }

  pub fn gte(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
    self.push(field, Condition::Gte(value.into()));
    self
  }

  /// Adds an equality, replacing any earlier equality on the same column.
  pub fn set_eq(&mut self, field: &str, value: Value) {
    self
      .conditions
      .retain(|(name, cond)| !(name == field && matches!(cond, Condition::Eq(_))));
    self.push(field, Condition::Eq(value));
  }

  pub fn push(&mut self, field: impl Into<String>, condition: Condition) {
    self.conditions.push((field.into(), condition));
  }

  pub fn extend(&mut self, other: Predicate) {
    self.conditions.extend(other.conditions);
  }

  pub fn conditions(&self) -> &[(String, Condition)] {
    &self.conditions
  }

  pub fn is_empty(&self) -> bool {
    self.conditions.is_empty()
  }

  pub fn matches(&self, row: &Fields) -> bool {
    self
      .conditions
      .iter()
      .all(|(field, cond)| cond.matches(row.get(field)))
  }
}

impl From<Fields> for Predicate {
  fn from(fields: Fields) -> Self {
    Self::from_fields(&fields)
  }
}

impl From<&Fields> for Predicate {
  fn from(fields: &Fields) -> Self {
    Self::from_fields(fields)
  }
}

impl fmt::Display for Predicate {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if self.conditions.is_empty() {
      return f.write_str("TRUE");
    }
    for (i, (field, cond)) in self.conditions.iter().enumerate() {
      if i > 0 {
        f.write_str(" AND ")?;
      }
      match cond {
        Condition::Eq(v) => write!(f, "{} = {}", field, v)?,
        Condition::Gte(v) => write!(f, "{} >= {}", field, v)?,
      }
    }
    Ok(())
  }
}

/// A single column assignment in an update.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdateOp {
  /// `column = value`
  Set(Value),
  /// `column = column + delta`, evaluated by the storage engine.
  Increment(Value),
}

pub type Assignments = BTreeMap<String, UpdateOp>;

/// Plain `Set` assignments for every entry of `fields`.
pub fn set_all(fields: &Fields) -> Assignments {
  fields
    .iter()
    .map(|(k, v)| (k.clone(), UpdateOp::Set(v.clone())))
    .collect()
}
