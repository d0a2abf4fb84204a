use crate::error::Result;
use crate::value::Value;
use serde::Serialize;
use std::collections::BTreeMap;

/// Identity assigned to a row by the storage engine on insert.
pub type RecordId = u64;

/// Column name to value mapping used for inserts, filters and assignments.
pub type Fields = BTreeMap<String, Value>;

/// Builds a [`Fields`] map from `name => value` pairs.
///
/// ```
/// let f = tableshard::fields! { "user_id" => 5, "name" => "alice" };
/// assert_eq!(f.len(), 2);
/// ```
#[macro_export]
macro_rules! fields {
  () => {
    $crate::Fields::new()
  };
  ($($name:expr => $value:expr),+ $(,)?) => {{
    let mut map = $crate::Fields::new();
    $( map.insert(::std::string::String::from($name), $crate::Value::from($value)); )+
    map
  }};
}

/// A persisted row.
///
/// Field access is lenient: reading a column the row does not carry yields
/// `None` instead of an error, so sparse rows can be inspected without
/// consulting the schema first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
  pub id: RecordId,
  #[serde(flatten)]
  pub fields: Fields,
}

impl Record {
  pub fn new(id: RecordId, fields: Fields) -> Self {
    Self { id, fields }
  }

  pub fn get(&self, name: &str) -> Option<&Value> {
    self.fields.get(name)
  }

  pub fn get_i64(&self, name: &str) -> Option<i64> {
    self.get(name).and_then(Value::as_i64)
  }

  pub fn get_str(&self, name: &str) -> Option<&str> {
    self.get(name).and_then(Value::as_str)
  }

  pub fn set(&mut self, name: impl Into<String>, value: impl Into<Value>) {
    self.fields.insert(name.into(), value.into());
  }

  /// Copies every entry of `values` onto the row, replacing existing columns.
  pub fn apply(&mut self, values: &Fields) {
    for (k, v) in values {
      self.fields.insert(k.clone(), v.clone());
    }
  }

  /// Renders the row as a JSON object, `id` included.
  pub fn to_json(&self) -> Result<serde_json::Value> {
    Ok(serde_json::to_value(self)?)
  }
}
