//! # tableshard
//!
//! `tableshard` spreads the rows of a logical entity over N physical tables
//! ("shards") and routes each operation to the right one from the value of a
//! designated routing field.
//!
//! It is storage-agnostic: any engine able to insert, filter, update and look
//! up a unique row per table can sit underneath via [`StorageEngine`]. An
//! in-memory engine, [`MemoryStorage`], ships with the crate.
//!
//! ## Key Features
//!
//! * **Stable Routing**: Integer keys use `|key| % N`; text keys use the
//!   unsigned CRC-32 of their UTF-8 bytes, so placement survives restarts.
//! * **Explicit Registry**: Per-shard table handles are built once and cached.
//! * **Guarded Deltas**: `chips__x = -5` only applies while `chips >= 5`.
//! * **Upserts**: Atomic when the engine supports it, documented race otherwise.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use tableshard::{fields, EntityDescriptor, FieldSpec, MemoryStorage, ShardRegistry, ShardedModel};
//!
//! # fn main() -> tableshard::Result<()> {
//! let descriptor = EntityDescriptor::builder("player")
//!   .field(FieldSpec::text("account"))
//!   .field(FieldSpec::integer("chips").guarded())
//!   .routing_field("account")
//!   .build()?;
//!
//! let players = ShardedModel::new(descriptor, Arc::new(ShardRegistry::new()), Arc::new(MemoryStorage::new()));
//!
//! players.update_or_create("alice", fields! { "account" => "alice" }, fields! { "chips" => 10 })?;
//! players.delta_update("alice", fields! {}, &fields! { "chips__x" => -4 })?;
//!
//! let alice = players.filter("alice", fields! {})?.get()?;
//! assert_eq!(alice.get_i64("chips"), Some(6));
//! # Ok(())
//! # }
//! ```

mod config;
pub mod delta;
mod error;
pub mod query;
mod record;
pub mod sharded;
pub mod storage;
mod value;

// Re-exports for the flat public API
pub use config::{
  DEFAULT_SHARD_COUNT, EntityConfig, EntityDescriptor, EntityDescriptorBuilder, FieldConfig, FieldSpec,
  load_descriptors, load_descriptors_file,
};
pub use delta::{DELTA_SUFFIX, DeltaUpdate, Guard, parse_delta_params};
pub use error::{Error, Result};
pub use query::{Assignments, Condition, Predicate, UpdateOp};
pub use record::{Fields, Record, RecordId};
pub use sharded::{QuerySet, ShardHandle, ShardRegistry, ShardedModel};
pub use storage::memory::MemoryStorage;
pub use storage::{StorageEngine, UpsertOutcome};
pub use value::{FieldKind, Value};
