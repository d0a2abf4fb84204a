//! Process-wide cache of per-shard table handles.

use crate::config::EntityDescriptor;
use crate::error::{Error, Result};
use crate::sharded::router;
use crate::value::Value;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Binding of one shard of an entity to its physical table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShardHandle {
  entity: String,
  index: u16,
  table: String,
}

impl ShardHandle {
  pub fn entity(&self) -> &str {
    &self.entity
  }

  pub fn index(&self) -> u16 {
    self.index
  }

  /// Physical table name, e.g. `orders3`.
  pub fn table(&self) -> &str {
    &self.table
  }
}

/// A thread-safe map from `(entity, shard index)` to [`ShardHandle`].
///
/// Handles are built on first access and shared afterwards; exactly one
/// handle ever exists per key.
#[derive(Default)]
pub struct ShardRegistry {
  // Entity name -> shard index -> handle
  inner: RwLock<HashMap<String, HashMap<u16, Arc<ShardHandle>>>>,
  constructed: AtomicU64,
}

impl ShardRegistry {
  pub fn new() -> Self {
    Self::default()
  }

  /// Returns the handle for shard `index` of `descriptor`, creating it if it
  /// doesn't exist.
  ///
  /// Uses double-checked locking: the read lock serves the warm path and the
  /// write lock is only taken to insert a missing handle.
  ///
  /// # Errors
  ///
  /// - `ShardOutOfRange` if `index >= shard_count`
  /// - `Config` if another descriptor with the same entity name but a
  ///   different table layout was registered first
  pub fn get_handle(&self, descriptor: &EntityDescriptor, index: u16) -> Result<Arc<ShardHandle>> {
    if index >= descriptor.shard_count() {
      return Err(Error::ShardOutOfRange {
        index,
        shard_count: descriptor.shard_count(),
      });
    }

    // 1. Optimistic Read
    {
      let map = self.inner.read();
      if let Some(handle) = map.get(descriptor.name()).and_then(|shards| shards.get(&index)) {
        return Self::verified(descriptor, handle);
      }
    }

    // 2. Write Lock (Creation)
    let mut map = self.inner.write();
    let shards = map.entry(descriptor.name().to_string()).or_default();
    if let Some(handle) = shards.get(&index) {
      return Self::verified(descriptor, handle);
    }

    let handle = Arc::new(ShardHandle {
      entity: descriptor.name().to_string(),
      index,
      table: descriptor.table_name(index),
    });
    shards.insert(index, handle.clone());
    self.constructed.fetch_add(1, Ordering::Relaxed);

    tracing::debug!(
      target: "tableshard::sharded",
      "Registered shard {} of {} as table {}",
      index,
      descriptor.name(),
      handle.table
    );

    Ok(handle)
  }

  /// Routes `key` and returns the handle of the shard it belongs to.
  pub fn get_handle_for_key(&self, descriptor: &EntityDescriptor, key: &Value) -> Result<Arc<ShardHandle>> {
    let index = router::route(descriptor, key)?;
    self.get_handle(descriptor, index)
  }

  /// Materializes every shard of `descriptor` and returns the handles in
  /// index order. Intended for startup, so the first request against each
  /// shard doesn't pay for construction.
  pub fn register_entity(&self, descriptor: &EntityDescriptor) -> Result<Vec<Arc<ShardHandle>>> {
    (0..descriptor.shard_count())
      .map(|index| self.get_handle(descriptor, index))
      .collect()
  }

  /// Total number of handles held, across all entities.
  pub fn len(&self) -> usize {
    self.inner.read().values().map(HashMap::len).sum()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Number of handles built since the registry was created.
  pub fn constructed(&self) -> u64 {
    self.constructed.load(Ordering::Relaxed)
  }

  fn verified(descriptor: &EntityDescriptor, handle: &Arc<ShardHandle>) -> Result<Arc<ShardHandle>> {
    let expected = descriptor.table_name(handle.index);
    if handle.table != expected {
      return Err(Error::Config(format!(
        "Entity {} is already registered with table {} (requested {})",
        descriptor.name(),
        handle.table,
        expected
      )));
    }
    Ok(handle.clone())
  }
}
