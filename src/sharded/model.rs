//! ShardedModel implementation - the main public API.

use crate::config::EntityDescriptor;
use crate::delta::parse_delta_params;
use crate::error::{Error, Result};
use crate::query::{Assignments, Condition, Predicate, UpdateOp, set_all};
use crate::record::{Fields, RecordId};
use crate::sharded::queryset::QuerySet;
use crate::sharded::registry::{ShardHandle, ShardRegistry};
use crate::sharded::router::Router;
use crate::storage::{StorageEngine, UpsertOutcome};
use crate::value::Value;

use std::sync::Arc;

/// Data access for one logical entity spread over `shard_count` tables.
///
/// Every operation takes the routing key first. The key selects the shard
/// and, except for [`filter_exact`](Self::filter_exact), is also written to
/// or matched against the routing field.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use tableshard::{fields, EntityDescriptor, FieldSpec, MemoryStorage, ShardRegistry, ShardedModel};
///
/// # fn main() -> tableshard::Result<()> {
/// let descriptor = EntityDescriptor::builder("wallet")
///   .field(FieldSpec::integer("user_id"))
///   .field(FieldSpec::integer("gold"))
///   .routing_field("user_id")
///   .build()?;
///
/// let wallets = ShardedModel::new(descriptor, Arc::new(ShardRegistry::new()), Arc::new(MemoryStorage::new()));
///
/// wallets.create(42, fields! { "gold" => 10 })?;
/// let rows = wallets.filter(42, fields! {})?.fetch()?;
/// assert_eq!(rows[0].get_i64("gold"), Some(10));
/// # Ok(())
/// # }
/// ```
///
/// # Limitations
///
/// - **No cross-shard transactions**: each call touches exactly one table
/// - **Fixed shard count**: rows are not moved if the count changes
pub struct ShardedModel<S: StorageEngine> {
  descriptor: Arc<EntityDescriptor>,
  registry: Arc<ShardRegistry>,
  storage: Arc<S>,
}

impl<S: StorageEngine> Clone for ShardedModel<S> {
  fn clone(&self) -> Self {
    Self {
      descriptor: self.descriptor.clone(),
      registry: self.registry.clone(),
      storage: self.storage.clone(),
    }
  }
}

impl<S: StorageEngine> ShardedModel<S> {
  pub fn new(descriptor: EntityDescriptor, registry: Arc<ShardRegistry>, storage: Arc<S>) -> Self {
    Self {
      descriptor: Arc::new(descriptor),
      registry,
      storage,
    }
  }

  pub fn descriptor(&self) -> &EntityDescriptor {
    &self.descriptor
  }

  pub fn registry(&self) -> &ShardRegistry {
    &self.registry
  }

  pub fn storage(&self) -> &S {
    &self.storage
  }

  pub fn field_names(&self) -> Vec<&str> {
    self.descriptor.field_names()
  }

  /// Materializes every shard handle of this entity up front.
  pub fn warm(&self) -> Result<Vec<Arc<ShardHandle>>> {
    self.registry.register_entity(&self.descriptor)
  }

  /// The shard index `key` routes to.
  pub fn shard_index(&self, key: impl Into<Value>) -> Result<u16> {
    Ok(self.resolve(&key.into())?.0.index())
  }

  pub fn handle_for_key(&self, key: impl Into<Value>) -> Result<Arc<ShardHandle>> {
    Ok(self.resolve(&key.into())?.0)
  }

  /// The handle of shard `index`, bypassing routing.
  pub fn handle_for_index(&self, index: u16) -> Result<Arc<ShardHandle>> {
    self.registry.get_handle(&self.descriptor, index)
  }

  /// The handle of the shard selected by the CRC-32 of `text`, whatever the
  /// kind of the routing field.
  pub fn handle_for_text(&self, text: &str) -> Result<Arc<ShardHandle>> {
    let index = Router::new(self.descriptor.shard_count()).route_text(text);
    self.handle_for_index(index)
  }

  /// Inserts a row on the key's shard, with the routing field set to `key`.
  /// A routing field in `fields` must agree with `key`.
  pub fn create(&self, key: impl Into<Value>, fields: Fields) -> Result<RecordId> {
    let (handle, key) = self.resolve(&key.into())?;
    let mut row = self.descriptor.coerce_fields(&fields)?;
    self.ensure_routing_unchanged(&row, &key)?;
    row.insert(self.routing_name().to_string(), key);
    self.storage.insert(handle.table(), &row)
  }

  /// Sets `fields` on every row of the key's shard whose routing field equals
  /// `key`. Returns the number of rows changed.
  ///
  /// Use [`filter_update`](Self::filter_update) to match on more columns.
  pub fn update(&self, key: impl Into<Value>, fields: Fields) -> Result<u64> {
    let (handle, key) = self.resolve(&key.into())?;
    let mut values = self.descriptor.coerce_fields(&fields)?;
    self.ensure_routing_unchanged(&values, &key)?;
    values.insert(self.routing_name().to_string(), key.clone());

    let predicate = Predicate::new().eq(self.routing_name(), key);
    self.storage.update(handle.table(), &predicate, &set_all(&values))
  }

  /// Rows of the key's shard matching `extra` and whose routing field equals
  /// `key`.
  pub fn filter(&self, key: impl Into<Value>, extra: impl Into<Predicate>) -> Result<QuerySet<'_, S>> {
    let (handle, key) = self.resolve(&key.into())?;
    let mut predicate = self.checked_predicate(extra.into())?;
    predicate.set_eq(self.routing_name(), key);
    Ok(QuerySet::new(&*self.storage, handle, predicate))
  }

  /// Rows of the key's shard matching exactly `filters`. The key only selects
  /// the shard; it is not added to the predicate.
  pub fn filter_exact(&self, key: impl Into<Value>, filters: impl Into<Predicate>) -> Result<QuerySet<'_, S>> {
    let (handle, _) = self.resolve(&key.into())?;
    let predicate = self.checked_predicate(filters.into())?;
    Ok(QuerySet::new(&*self.storage, handle, predicate))
  }

  /// Sets `updates` on the rows [`filter`](Self::filter) would return.
  /// Returns the number of rows changed.
  pub fn filter_update(&self, key: impl Into<Value>, filters: impl Into<Predicate>, updates: Fields) -> Result<u64> {
    let key = key.into();
    let (_, routed) = self.resolve(&key)?;
    let values = self.descriptor.coerce_fields(&updates)?;
    self.ensure_routing_unchanged(&values, &routed)?;
    self.filter(key, filters)?.update(&set_all(&values))
  }

  /// Updates the single row of the key's shard matching `lookup`, or creates
  /// it from `lookup ∪ updates` (plus the routing field) when absent.
  ///
  /// Returns `true` on success; failures are errors.
  ///
  /// # Concurrency
  ///
  /// Engines with a native upsert make this atomic. Otherwise the lookup and
  /// the write are separate calls: two callers that both miss can both insert.
  /// A unique constraint on the lookup columns turns that race into an
  /// `Error::Duplicate` for the loser, which is returned as-is.
  pub fn update_or_create(&self, key: impl Into<Value>, lookup: Fields, updates: Fields) -> Result<bool> {
    self.upsert(key, lookup, updates).map(|_| true)
  }

  /// [`update_or_create`](Self::update_or_create), reporting which branch ran
  /// and the identity of the affected row.
  pub fn upsert(&self, key: impl Into<Value>, lookup: Fields, updates: Fields) -> Result<UpsertOutcome> {
    let (handle, key) = self.resolve(&key.into())?;
    let lookup = self.descriptor.coerce_fields(&lookup)?;
    let updates = self.descriptor.coerce_fields(&updates)?;
    self.ensure_routing_unchanged(&lookup, &key)?;
    self.ensure_routing_unchanged(&updates, &key)?;

    let table = handle.table();
    let predicate = Predicate::from_fields(&lookup);

    let mut create = lookup.clone();
    create.extend(updates.clone());
    create.insert(self.routing_name().to_string(), key);

    if let Some(outcome) = self.storage.upsert(table, &predicate, &create, &set_all(&updates))? {
      return Ok(outcome);
    }

    match self.storage.get_unique(table, &predicate) {
      Ok(mut record) => {
        record.apply(&updates);
        self.storage.save(table, &record)?;
        Ok(UpsertOutcome::Updated(record.id))
      }
      Err(Error::NotFound { .. }) => {
        tracing::debug!(
          target: "tableshard::sharded",
          "No row in {} matches {}, creating one",
          table,
          predicate
        );
        match self.storage.insert(table, &create) {
          Ok(id) => Ok(UpsertOutcome::Created(id)),
          Err(err @ Error::Duplicate { .. }) => {
            tracing::warn!(
              target: "tableshard::sharded",
              "Concurrent update_or_create inserted a row in {} matching {} first",
              table,
              predicate
            );
            Err(err)
          }
          Err(err) => Err(err),
        }
      }
      Err(err) => Err(err),
    }
  }

  /// Applies delta-style parameters (see [`crate::delta`]) to the rows
  /// [`filter`](Self::filter) would return. Returns the number of rows
  /// changed.
  ///
  /// # Errors
  ///
  /// `InsufficientBalance` when a guarded field would go below zero: rows
  /// match `filters` but none satisfy the guards, so nothing was written.
  /// The follow-up count that tells the two cases apart is a separate read.
  pub fn delta_update(&self, key: impl Into<Value>, filters: impl Into<Predicate>, params: &Fields) -> Result<u64> {
    let key = key.into();
    let (handle, routed) = self.resolve(&key)?;
    let delta = parse_delta_params(&self.descriptor, params)?;
    self.ensure_routing_untouched(&delta.ops, &routed)?;

    if delta.is_empty() {
      return Ok(0);
    }

    let base = self.filter(key, filters)?.predicate().clone();
    let mut guarded = base.clone();
    guarded.extend(delta.guard_predicate());

    let table = handle.table();
    let changed = self.storage.update(table, &guarded, &delta.ops)?;

    if changed == 0 && !delta.guards.is_empty() && self.storage.count(table, &base)? > 0 {
      let fields = delta.guarded_fields();
      tracing::warn!(
        target: "tableshard::sharded",
        "Rejected delta update on {}: insufficient {}",
        table,
        fields.join(", ")
      );
      return Err(Error::InsufficientBalance {
        table: table.to_string(),
        fields,
      });
    }

    Ok(changed)
  }

  fn routing_name(&self) -> &str {
    &self.descriptor.routing_field().name
  }

  /// Routes `key` and returns its shard handle along with the key converted
  /// to the routing field's kind.
  fn resolve(&self, key: &Value) -> Result<(Arc<ShardHandle>, Value)> {
    let handle = self.registry.get_handle_for_key(&self.descriptor, key)?;
    let spec = self.descriptor.routing_field();
    let value = spec.kind.coerce(&spec.name, key).map_err(|_| Error::InvalidKey {
      field: spec.name.clone(),
      value: key.to_string(),
    })?;
    Ok((handle, value))
  }

  /// Validates column names and coerces condition values.
  fn checked_predicate(&self, predicate: Predicate) -> Result<Predicate> {
    let mut out = Predicate::new();
    for (name, cond) in predicate.conditions() {
      let spec = self.descriptor.require_field(name)?;
      let cond = match cond {
        Condition::Eq(v) => Condition::Eq(spec.kind.coerce(name, v)?),
        Condition::Gte(v) => Condition::Gte(spec.kind.coerce(name, v)?),
      };
      out.push(name.clone(), cond);
    }
    Ok(out)
  }

  fn ensure_routing_unchanged(&self, values: &Fields, key: &Value) -> Result<()> {
    match values.get(self.routing_name()) {
      Some(v) if v != key => Err(Error::RoutingFieldChange {
        field: self.routing_name().to_string(),
      }),
      _ => Ok(()),
    }
  }

  fn ensure_routing_untouched(&self, ops: &Assignments, key: &Value) -> Result<()> {
    match ops.get(self.routing_name()) {
      None => Ok(()),
      Some(UpdateOp::Set(v)) if v == key => Ok(()),
      Some(_) => Err(Error::RoutingFieldChange {
        field: self.routing_name().to_string(),
      }),
    }
  }
}
