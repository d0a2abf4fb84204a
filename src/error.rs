use std::io;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
  #[error("Missing routing key for entity: {entity}")]
  MissingRoutingKey { entity: String },

  #[error("Invalid routing key for field '{field}': {value}")]
  InvalidKey { field: String, value: String },

  #[error("Field '{field}' of kind {kind} cannot be used for routing")]
  UnsupportedRoutingField { field: String, kind: String },

  #[error("Insufficient balance in table {table} for fields: {}", fields.join(", "))]
  InsufficientBalance { table: String, fields: Vec<String> },

  #[error("No matching record in table: {table}")]
  NotFound { table: String },

  #[error("Expected a unique record in table {table}, found {count}")]
  MultipleFound { table: String, count: usize },

  #[error("Unique constraint violated in table: {table}")]
  Duplicate { table: String },

  #[error("Unknown field '{field}' on entity {entity}")]
  UnknownField { entity: String, field: String },

  #[error("Delta value for field '{field}' must be numeric, got {value}")]
  InvalidDelta { field: String, value: String },

  #[error("Field '{field}' is assigned more than once in one update")]
  ConflictingUpdate { field: String },

  #[error("Routing field '{field}' cannot be reassigned; rows would land on the wrong shard")]
  RoutingFieldChange { field: String },

  #[error("Field '{field}' expects {expected}, got {value}")]
  TypeMismatch {
    field: String,
    expected: String,
    value: String,
  },

  #[error("Shard index {index} out of range (shard_count: {shard_count})")]
  ShardOutOfRange { index: u16, shard_count: u16 },

  #[error("Configuration Error: {0}")]
  Config(String),

  #[error("Storage Error: {0}")]
  Storage(String),

  #[error("I/O Error: {0}")]
  Io(#[from] io::Error),

  #[error("JSON Error: {0}")]
  Json(#[from] serde_json::Error),
}

impl Error {
  /// Returns true for outcomes a caller handles as a business result
  /// (a rejected balance change, a missing row) rather than a fault.
  pub fn is_logical(&self) -> bool {
    matches!(self, Error::InsufficientBalance { .. } | Error::NotFound { .. })
  }
}
