//! Key-based routing to determine shard assignment.
//!
//! Integer routing fields map to `|value| % shard_count`. Text routing fields
//! hash the UTF-8 bytes with standard CRC-32 (IEEE polynomial), read the
//! checksum as an unsigned 32-bit integer and take it modulo `shard_count`.
//! Both rules are part of the on-disk contract: changing either moves
//! existing rows to a different table.

use crate::config::{EntityDescriptor, FieldSpec};
use crate::error::{Error, Result};
use crate::value::{FieldKind, Value};

/// Unsigned CRC-32 checksum of `bytes`.
#[inline]
pub fn uint_crc32(bytes: &[u8]) -> u32 {
  crc32fast::hash(bytes)
}

/// Routes an entity's key to its shard index.
pub fn route(descriptor: &EntityDescriptor, key: &Value) -> Result<u16> {
  if key.is_null() {
    return Err(Error::MissingRoutingKey {
      entity: descriptor.name().to_string(),
    });
  }
  Router::new(descriptor.shard_count()).route(descriptor.routing_field(), key)
}

/// Routes keys to shard indices for a fixed shard count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Router {
  shard_count: u16,
}

impl Router {
  /// Creates a new router with the specified shard count.
  ///
  /// # Panics
  ///
  /// Panics if `shard_count` is zero.
  pub fn new(shard_count: u16) -> Self {
    assert!(shard_count > 0, "shard_count must be greater than zero");
    Self { shard_count }
  }

  /// Routes `key` according to the kind of `field`.
  ///
  /// # Errors
  ///
  /// - `InvalidKey` if an integer field's key does not parse as an integer
  /// - `UnsupportedRoutingField` for field kinds with no routing rule
  pub fn route(&self, field: &FieldSpec, key: &Value) -> Result<u16> {
    match field.kind {
      FieldKind::Integer => {
        let invalid = || Error::InvalidKey {
          field: field.name.clone(),
          value: key.to_string(),
        };
        match FieldKind::Integer.coerce(&field.name, key).map_err(|_| invalid())? {
          Value::Int(v) => Ok(self.route_int(v)),
          _ => Err(invalid()),
        }
      }
      FieldKind::Text => {
        if key.is_null() {
          return Err(Error::InvalidKey {
            field: field.name.clone(),
            value: key.to_string(),
          });
        }
        Ok(self.route_text(&key.to_string()))
      }
      FieldKind::Float | FieldKind::Boolean => Err(Error::UnsupportedRoutingField {
        field: field.name.clone(),
        kind: field.kind.to_string(),
      }),
    }
  }

  /// `|value| % shard_count`.
  #[inline]
  pub fn route_int(&self, value: i64) -> u16 {
    (value.unsigned_abs() % self.shard_count as u64) as u16
  }

  /// `crc32(value) % shard_count`.
  #[inline]
  pub fn route_text(&self, value: &str) -> u16 {
    (uint_crc32(value.as_bytes()) % self.shard_count as u32) as u16
  }

  /// Returns the total number of shards.
  pub fn shard_count(&self) -> u16 {
    self.shard_count
  }
}
