//! Delta-update parameter parsing.
//!
//! A parameter key ending in [`DELTA_SUFFIX`] asks for the value to be added
//! to the stored column (`chips__x = -1` means `chips = chips - 1`). Plain
//! keys overwrite the column. Negative deltas on guarded columns also yield a
//! guard that the caller turns into a `column >= |delta|` condition, so the
//! update matches no row instead of driving the column below zero.

use crate::config::EntityDescriptor;
use crate::error::{Error, Result};
use crate::query::{Assignments, Predicate, UpdateOp};
use crate::record::Fields;
use crate::value::{FieldKind, Value};
use std::collections::BTreeMap;

/// Marks a parameter key as an increment rather than an assignment.
pub const DELTA_SUFFIX: &str = "__x";

#[derive(Debug, Clone, PartialEq)]
pub enum Guard {
  /// The stored value must be at least this large for the update to apply.
  MinimumValue(Value),
}

/// The parsed form of a delta-update parameter map.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeltaUpdate {
  pub ops: Assignments,
  pub guards: BTreeMap<String, Guard>,
}

impl DeltaUpdate {
  /// The guards as `>=` conditions, ready to be merged into a filter.
  pub fn guard_predicate(&self) -> Predicate {
    self
      .guards
      .iter()
      .fold(Predicate::new(), |pred, (field, Guard::MinimumValue(min))| {
        pred.gte(field.clone(), min.clone())
      })
  }

  pub fn guarded_fields(&self) -> Vec<String> {
    self.guards.keys().cloned().collect()
  }

  pub fn is_empty(&self) -> bool {
    self.ops.is_empty()
  }
}

pub fn parse_delta_params(descriptor: &EntityDescriptor, params: &Fields) -> Result<DeltaUpdate> {
  let mut out = DeltaUpdate::default();

  for (key, raw) in params {
    let (name, as_delta) = match key.strip_suffix(DELTA_SUFFIX) {
      Some(stripped) => (stripped, true),
      None => (key.as_str(), false),
    };

    let spec = descriptor.require_field(name)?;
    let value = spec.kind.coerce(name, raw)?;

    if out.ops.contains_key(name) {
      return Err(Error::ConflictingUpdate { field: name.to_string() });
    }

    if !as_delta {
      out.ops.insert(name.to_string(), UpdateOp::Set(value));
      continue;
    }

    let invalid = || Error::InvalidDelta {
      field: name.to_string(),
      value: raw.to_string(),
    };

    if !matches!(spec.kind, FieldKind::Integer | FieldKind::Float) || !value.is_numeric() {
      return Err(invalid());
    }

    if spec.negative_guard && value.is_negative() {
      let min = value.abs().ok_or_else(invalid)?;
      out.guards.insert(name.to_string(), Guard::MinimumValue(min));
    }

    out.ops.insert(name.to_string(), UpdateOp::Increment(value));
  }

  Ok(out)
}
