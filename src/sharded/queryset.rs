use crate::error::Result;
use crate::query::{Assignments, Predicate};
use crate::record::Record;
use crate::sharded::registry::ShardHandle;
use crate::storage::StorageEngine;
use std::sync::Arc;

/// A filter bound to one shard, evaluated only when read.
///
/// Building or refining a `QuerySet` touches no storage. Every read runs the
/// query again, so the same value can be consumed any number of times and
/// always reflects the current table contents.
pub struct QuerySet<'a, S: StorageEngine + ?Sized> {
  storage: &'a S,
  handle: Arc<ShardHandle>,
  predicate: Predicate,
}

impl<'a, S: StorageEngine + ?Sized> QuerySet<'a, S> {
  pub(crate) fn new(storage: &'a S, handle: Arc<ShardHandle>, predicate: Predicate) -> Self {
    Self {
      storage,
      handle,
      predicate,
    }
  }

  pub fn handle(&self) -> &ShardHandle {
    &self.handle
  }

  pub fn predicate(&self) -> &Predicate {
    &self.predicate
  }

  /// Narrows the query with additional conditions.
  pub fn filter(mut self, more: impl Into<Predicate>) -> Self {
    self.predicate.extend(more.into());
    self
  }

  pub fn fetch(&self) -> Result<Vec<Record>> {
    self.storage.filter(self.handle.table(), &self.predicate)
  }

  pub fn iter(&self) -> Result<std::vec::IntoIter<Record>> {
    Ok(self.fetch()?.into_iter())
  }

  pub fn count(&self) -> Result<u64> {
    self.storage.count(self.handle.table(), &self.predicate)
  }

  pub fn exists(&self) -> Result<bool> {
    Ok(self.count()? > 0)
  }

  /// The matching row with the lowest identity, if any.
  pub fn first(&self) -> Result<Option<Record>> {
    Ok(self.fetch()?.into_iter().min_by_key(|r| r.id))
  }

  /// The single matching row; fails with `NotFound` or `MultipleFound`.
  pub fn get(&self) -> Result<Record> {
    self.storage.get_unique(self.handle.table(), &self.predicate)
  }

  /// Applies `assignments` to every matching row and returns how many changed.
  pub fn update(&self, assignments: &Assignments) -> Result<u64> {
    self.storage.update(self.handle.table(), &self.predicate, assignments)
  }
}
