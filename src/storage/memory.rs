//! An in-process [`StorageEngine`] keeping every table in memory.
//!
//! Each table sits behind its own mutex, so a single call observes and
//! mutates a table atomically while calls against different tables proceed
//! in parallel.

use crate::error::{Error, Result};
use crate::query::{Assignments, Predicate, UpdateOp};
use crate::record::{Fields, Record, RecordId};
use crate::storage::{StorageEngine, UpsertOutcome};
use crate::value::Value;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct MemTable {
  next_id: RecordId,
  rows: BTreeMap<RecordId, Fields>,
  /// Column sets whose combined values must be unique within the table.
  unique_keys: Vec<Vec<String>>,
}

impl MemTable {
  fn matching_ids(&self, predicate: &Predicate) -> Vec<RecordId> {
    self
      .rows
      .iter()
      .filter(|(_, row)| predicate.matches(row))
      .map(|(id, _)| *id)
      .collect()
  }

  /// Fails if `candidate` collides with any row other than `skip` on one of
  /// the table's unique keys.
  fn check_unique(&self, table: &str, candidate: &Fields, skip: &[RecordId]) -> Result<()> {
    for key in &self.unique_keys {
      let clash = self
        .rows
        .iter()
        .any(|(id, row)| !skip.contains(id) && same_key(key, row, candidate));
      if clash {
        return Err(Error::Duplicate { table: table.to_string() });
      }
    }
    Ok(())
  }

  fn insert(&mut self, table: &str, fields: &Fields) -> Result<RecordId> {
    self.check_unique(table, fields, &[])?;
    self.next_id += 1;
    let id = self.next_id;
    self.rows.insert(id, fields.clone());
    Ok(id)
  }

  /// Applies `assignments` to the rows in `ids`, all or nothing.
  fn apply(&mut self, table: &str, ids: &[RecordId], assignments: &Assignments) -> Result<()> {
    let mut staged = Vec::with_capacity(ids.len());

    for id in ids {
      let mut row = self.rows.get(id).cloned().unwrap_or_default();
      for (col, op) in assignments {
        let next = match op {
          UpdateOp::Set(v) => v.clone(),
          UpdateOp::Increment(delta) => match row.get(col).and_then(|cur| cur.checked_add(delta)) {
            Some(v) => v,
            None => {
              let current = row.get(col).map_or_else(|| "null".to_string(), Value::to_string);
              return Err(Error::Storage(format!(
                "cannot increment {}.{} (current: {}, delta: {})",
                table, col, current, delta
              )));
            }
          },
        };
        row.insert(col.clone(), next);
      }
      staged.push((*id, row));
    }

    for (id, row) in &staged {
      self.check_unique(table, row, ids)?;
      let clash = staged
        .iter()
        .any(|(other, other_row)| other != id && self.collides(row, other_row));
      if clash {
        return Err(Error::Duplicate { table: table.to_string() });
      }
    }

    for (id, row) in staged {
      self.rows.insert(id, row);
    }
    Ok(())
  }

  fn collides(&self, a: &Fields, b: &Fields) -> bool {
    self.unique_keys.iter().any(|key| same_key(key, a, b))
  }
}

/// Two rows share a unique key when every key column is present and equal.
/// Nulls never collide.
fn same_key(key: &[String], a: &Fields, b: &Fields) -> bool {
  key.iter().all(|col| match (a.get(col), b.get(col)) {
    (Some(x), Some(y)) => !x.is_null() && x == y,
    _ => false,
  })
}

/// Reference engine used by tests, demos and benchmarks.
pub struct MemoryStorage {
  tables: RwLock<HashMap<String, Arc<Mutex<MemTable>>>>,
  unique_keys: RwLock<HashMap<String, Vec<Vec<String>>>>,
  native_upsert: bool,
}

impl Default for MemoryStorage {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryStorage {
  pub fn new() -> Self {
    Self {
      tables: RwLock::new(HashMap::new()),
      unique_keys: RwLock::new(HashMap::new()),
      native_upsert: true,
    }
  }

  /// Disables [`StorageEngine::upsert`], forcing callers onto the
  /// lookup-then-write path.
  pub fn without_native_upsert(mut self) -> Self {
    self.native_upsert = false;
    self
  }

  /// Declares a unique constraint over `columns` on `table`.
  pub fn add_unique_key(&self, table: &str, columns: &[&str]) {
    let key: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
    if let Some(existing) = self.get(table) {
      existing.lock().unique_keys.push(key.clone());
    }
    self.unique_keys.write().entry(table.to_string()).or_default().push(key);
  }

  pub fn table_names(&self) -> Vec<String> {
    let mut names: Vec<String> = self.tables.read().keys().cloned().collect();
    names.sort();
    names
  }

  /// Number of rows currently stored in `table`.
  pub fn row_count(&self, table: &str) -> usize {
    match self.get(table) {
      Some(t) => {
        let t = t.lock();
        t.rows.len()
      }
      None => 0,
    }
  }

  fn get(&self, table: &str) -> Option<Arc<Mutex<MemTable>>> {
    self.tables.read().get(table).cloned()
  }

  fn get_or_create(&self, table: &str) -> Arc<Mutex<MemTable>> {
    {
      let map = self.tables.read();
      if let Some(t) = map.get(table) {
        return t.clone();
      }
    }

    let mut map = self.tables.write();
    if let Some(t) = map.get(table) {
      return t.clone();
    }

    tracing::debug!(target: "tableshard::storage", "Creating in-memory table {}", table);
    let unique_keys = self.unique_keys.read().get(table).cloned().unwrap_or_default();
    let created = Arc::new(Mutex::new(MemTable {
      unique_keys,
      ..Default::default()
    }));
    map.insert(table.to_string(), created.clone());
    created
  }
}

impl StorageEngine for MemoryStorage {
  fn insert(&self, table: &str, fields: &Fields) -> Result<RecordId> {
    let t = self.get_or_create(table);
    let mut t = t.lock();
    t.insert(table, fields)
  }

  fn filter(&self, table: &str, predicate: &Predicate) -> Result<Vec<Record>> {
    let Some(t) = self.get(table) else {
      return Ok(Vec::new());
    };
    let t = t.lock();
    Ok(
      t.rows
        .iter()
        .filter(|(_, row)| predicate.matches(row))
        .map(|(id, row)| Record::new(*id, row.clone()))
        .collect(),
    )
  }

  fn update(&self, table: &str, predicate: &Predicate, assignments: &Assignments) -> Result<u64> {
    let Some(t) = self.get(table) else {
      return Ok(0);
    };
    let mut t = t.lock();
    let ids = t.matching_ids(predicate);
    if assignments.is_empty() {
      return Ok(ids.len() as u64);
    }
    t.apply(table, &ids, assignments)?;
    Ok(ids.len() as u64)
  }

  fn get_unique(&self, table: &str, predicate: &Predicate) -> Result<Record> {
    let mut rows = self.filter(table, predicate)?;
    match rows.len() {
      0 => Err(Error::NotFound { table: table.to_string() }),
      1 => Ok(rows.remove(0)),
      count => Err(Error::MultipleFound {
        table: table.to_string(),
        count,
      }),
    }
  }

  fn save(&self, table: &str, record: &Record) -> Result<()> {
    let not_found = || Error::NotFound { table: table.to_string() };
    let t = self.get(table).ok_or_else(not_found)?;
    let mut t = t.lock();
    if !t.rows.contains_key(&record.id) {
      return Err(not_found());
    }
    t.check_unique(table, &record.fields, &[record.id])?;
    t.rows.insert(record.id, record.fields.clone());
    Ok(())
  }

  fn count(&self, table: &str, predicate: &Predicate) -> Result<u64> {
    let Some(t) = self.get(table) else {
      return Ok(0);
    };
    let t = t.lock();
    Ok(t.matching_ids(predicate).len() as u64)
  }

  fn upsert(
    &self,
    table: &str,
    lookup: &Predicate,
    create: &Fields,
    updates: &Assignments,
  ) -> Result<Option<UpsertOutcome>> {
    if !self.native_upsert {
      return Ok(None);
    }

    let t = self.get_or_create(table);
    let mut t = t.lock();
    let ids = t.matching_ids(lookup);

    match ids.as_slice() {
      [] => Ok(Some(UpsertOutcome::Created(t.insert(table, create)?))),
      [id] => {
        t.apply(table, &ids, updates)?;
        Ok(Some(UpsertOutcome::Updated(*id)))
      }
      _ => Err(Error::MultipleFound {
        table: table.to_string(),
        count: ids.len(),
      }),
    }
  }
}
