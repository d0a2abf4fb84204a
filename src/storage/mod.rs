//! The storage engine seam.
//!
//! The sharding layer never talks to a database directly. Every operation is
//! resolved to a physical table name and handed to a [`StorageEngine`], which
//! owns query execution, connection handling and isolation.

pub mod memory;

use crate::error::Result;
use crate::query::{Assignments, Predicate};
use crate::record::{Fields, Record, RecordId};

/// Result of an atomic insert-or-update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
  Created(RecordId),
  Updated(RecordId),
}

impl UpsertOutcome {
  pub fn id(&self) -> RecordId {
    match self {
      UpsertOutcome::Created(id) | UpsertOutcome::Updated(id) => *id,
    }
  }
}

/// Primitive per-table operations the sharding layer relies on.
///
/// Implementations must be safe to share across threads. Each call is
/// expected to be atomic with respect to the rows it touches; nothing spans
/// more than one table.
pub trait StorageEngine: Send + Sync {
  /// Inserts a row and returns its identity.
  fn insert(&self, table: &str, fields: &Fields) -> Result<RecordId>;

  /// Returns every row matching `predicate`. A missing table holds no rows.
  fn filter(&self, table: &str, predicate: &Predicate) -> Result<Vec<Record>>;

  /// Applies `assignments` to every row matching `predicate` and returns the
  /// number of rows changed. Increments are evaluated by the engine against
  /// the stored value, not read back into the caller.
  ///
  /// An `Increment` needs a numeric stored value: a column that is null or
  /// absent on a matched row fails the whole call with `Error::Storage` and
  /// no row is changed, as does an integer overflow.
  fn update(&self, table: &str, predicate: &Predicate, assignments: &Assignments) -> Result<u64>;

  /// Returns the single row matching `predicate`.
  ///
  /// Fails with `Error::NotFound` when nothing matches and with
  /// `Error::MultipleFound` when more than one row does.
  fn get_unique(&self, table: &str, predicate: &Predicate) -> Result<Record>;

  /// Persists every column of an existing row, identified by `record.id`.
  fn save(&self, table: &str, record: &Record) -> Result<()>;

  fn count(&self, table: &str, predicate: &Predicate) -> Result<u64> {
    Ok(self.filter(table, predicate)?.len() as u64)
  }

  /// Atomically updates the row matching `lookup`, or inserts `create` when
  /// none does.
  ///
  /// Engines without a native insert-on-conflict primitive return `Ok(None)`
  /// and the caller falls back to a lookup followed by a write.
  fn upsert(
    &self,
    _table: &str,
    _lookup: &Predicate,
    _create: &Fields,
    _updates: &Assignments,
  ) -> Result<Option<UpsertOutcome>> {
    Ok(None)
  }
}
