use crate::error::{Error, Result};
use crate::record::Fields;
use crate::value::{FieldKind, Value};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;

/// Number of shards an entity is split into unless configured otherwise.
pub const DEFAULT_SHARD_COUNT: u16 = 10;

/// Schema entry for a single column of a sharded entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
  pub name: String,
  pub kind: FieldKind,
  /// Negative delta updates on this column are only applied while the
  /// stored value can cover them.
  pub negative_guard: bool,
}

impl FieldSpec {
  pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
    Self {
      name: name.into(),
      kind,
      negative_guard: false,
    }
  }

  pub fn integer(name: impl Into<String>) -> Self {
    Self::new(name, FieldKind::Integer)
  }

  pub fn text(name: impl Into<String>) -> Self {
    Self::new(name, FieldKind::Text)
  }

  pub fn float(name: impl Into<String>) -> Self {
    Self::new(name, FieldKind::Float)
  }

  pub fn boolean(name: impl Into<String>) -> Self {
    Self::new(name, FieldKind::Boolean)
  }

  pub fn guarded(mut self) -> Self {
    self.negative_guard = true;
    self
  }
}

/// Immutable description of a logical entity stored across `shard_count`
/// physical tables.
///
/// Built once at startup through [`EntityDescriptor::builder`] or one of the
/// JSON loaders; every constructor validates that the routing field exists
/// and that the shard count is positive.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDescriptor {
  name: String,
  table_prefix: String,
  fields: Vec<FieldSpec>,
  routing_idx: usize,
  shard_count: u16,
}

impl EntityDescriptor {
  pub fn builder(name: impl Into<String>) -> EntityDescriptorBuilder {
    EntityDescriptorBuilder::new(name)
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  /// Physical table names are this prefix followed by the shard index.
  pub fn table_prefix(&self) -> &str {
    &self.table_prefix
  }

  pub fn shard_count(&self) -> u16 {
    self.shard_count
  }

  pub fn fields(&self) -> &[FieldSpec] {
    &self.fields
  }

  pub fn field(&self, name: &str) -> Option<&FieldSpec> {
    self.fields.iter().find(|f| f.name == name)
  }

  pub fn routing_field(&self) -> &FieldSpec {
    &self.fields[self.routing_idx]
  }

  pub fn field_names(&self) -> Vec<&str> {
    self.fields.iter().map(|f| f.name.as_str()).collect()
  }

  pub fn fields_by_name(&self) -> HashMap<&str, &FieldSpec> {
    self.fields.iter().map(|f| (f.name.as_str(), f)).collect()
  }

  pub fn is_guarded(&self, name: &str) -> bool {
    self.field(name).is_some_and(|f| f.negative_guard)
  }

  /// Name of the physical table holding shard `index`, e.g. `orders3`.
  pub fn table_name(&self, index: u16) -> String {
    format!("{}{}", self.table_prefix, index)
  }

  pub(crate) fn require_field(&self, name: &str) -> Result<&FieldSpec> {
    self.field(name).ok_or_else(|| Error::UnknownField {
      entity: self.name.clone(),
      field: name.to_string(),
    })
  }

  /// Validates column names and converts each value to its column's kind.
  pub fn coerce_fields(&self, values: &Fields) -> Result<Fields> {
    let mut out = Fields::new();
    for (name, value) in values {
      let spec = self.require_field(name)?;
      out.insert(name.clone(), spec.kind.coerce(name, value)?);
    }
    Ok(out)
  }

  /// Converts string-encoded column values, as kept by a key-value cache,
  /// back into typed values.
  pub fn convert_fields<I, K, V>(&self, raw: I) -> Result<Fields>
  where
    I: IntoIterator<Item = (K, V)>,
    K: AsRef<str>,
    V: AsRef<str>,
  {
    let mut out = Fields::new();
    for (name, text) in raw {
      let name = name.as_ref();
      let spec = self.require_field(name)?;
      out.insert(name.to_string(), spec.kind.coerce(name, &Value::from(text.as_ref()))?);
    }
    Ok(out)
  }

  pub fn from_config(config: EntityConfig) -> Result<Self> {
    let mut builder = Self::builder(config.name)
      .routing_field(config.routing_field)
      .shard_count(config.shard_count);
    if let Some(prefix) = config.table_prefix {
      builder = builder.table_prefix(prefix);
    }
    for f in config.fields {
      builder = builder.field(FieldSpec {
        name: f.name,
        kind: f.kind,
        negative_guard: f.negative_guard,
      });
    }
    builder.build()
  }

  pub fn from_json_str(json: &str) -> Result<Self> {
    let config: EntityConfig = serde_json::from_str(json)?;
    Self::from_config(config)
  }

  pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
    let text = fs::read_to_string(path)?;
    Self::from_json_str(&text)
  }
}

pub struct EntityDescriptorBuilder {
  name: String,
  table_prefix: Option<String>,
  fields: Vec<FieldSpec>,
  routing_field: Option<String>,
  shard_count: u16,
}

impl EntityDescriptorBuilder {
  pub fn new(name: impl Into<String>) -> Self {
    Self {
      name: name.into(),
      table_prefix: None,
      fields: Vec::new(),
      routing_field: None,
      shard_count: DEFAULT_SHARD_COUNT,
    }
  }

  pub fn field(mut self, spec: FieldSpec) -> Self {
    self.fields.push(spec);
    self
  }

  pub fn routing_field(mut self, name: impl Into<String>) -> Self {
    self.routing_field = Some(name.into());
    self
  }

  pub fn shard_count(mut self, count: u16) -> Self {
    self.shard_count = count;
    self
  }

  /// Defaults to the entity name.
  pub fn table_prefix(mut self, prefix: impl Into<String>) -> Self {
    self.table_prefix = Some(prefix.into());
    self
  }

  pub fn build(self) -> Result<EntityDescriptor> {
    if self.name.trim().is_empty() {
      return Err(Error::Config("Entity name cannot be empty".into()));
    }

    if self.shard_count == 0 {
      return Err(Error::Config(format!(
        "shard_count must be greater than zero (entity: {})",
        self.name
      )));
    }

    let mut seen = HashSet::new();
    for f in &self.fields {
      if f.name.trim().is_empty() {
        return Err(Error::Config(format!("Empty field name on entity {}", self.name)));
      }
      if !seen.insert(f.name.as_str()) {
        return Err(Error::Config(format!(
          "Duplicate field '{}' on entity {}",
          f.name, self.name
        )));
      }
    }

    let routing = self
      .routing_field
      .ok_or_else(|| Error::Config(format!("No routing field declared for entity {}", self.name)))?;

    let routing_idx = self
      .fields
      .iter()
      .position(|f| f.name == routing)
      .ok_or_else(|| {
        Error::Config(format!(
          "Routing field '{}' is not a field of entity {}",
          routing, self.name
        ))
      })?;

    if self.shard_count == 1 {
      tracing::warn!(
        target: "tableshard::config",
        "Entity {} is configured with a single shard; all rows share one table",
        self.name
      );
    }

    let table_prefix = self.table_prefix.unwrap_or_else(|| self.name.clone());

    Ok(EntityDescriptor {
      name: self.name,
      table_prefix,
      fields: self.fields,
      routing_idx,
      shard_count: self.shard_count,
    })
  }
}

/// Serialized form of an entity, as read from static configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityConfig {
  pub name: String,
  #[serde(default)]
  pub table_prefix: Option<String>,
  pub routing_field: String,
  #[serde(default = "default_shard_count")]
  pub shard_count: u16,
  pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldConfig {
  pub name: String,
  pub kind: FieldKind,
  #[serde(default)]
  pub negative_guard: bool,
}

fn default_shard_count() -> u16 {
  DEFAULT_SHARD_COUNT
}

/// Parses a JSON array of entity configurations.
///
/// Fails if any entity is invalid or two entities share a name.
pub fn load_descriptors(json: &str) -> Result<Vec<EntityDescriptor>> {
  let configs: Vec<EntityConfig> = serde_json::from_str(json)?;
  let mut names = HashSet::new();
  let mut out = Vec::with_capacity(configs.len());

  for config in configs {
    if !names.insert(config.name.clone()) {
      return Err(Error::Config(format!("Duplicate entity: {}", config.name)));
    }
    out.push(EntityDescriptor::from_config(config)?);
  }

  Ok(out)
}

pub fn load_descriptors_file(path: impl AsRef<Path>) -> Result<Vec<EntityDescriptor>> {
  let text = fs::read_to_string(path)?;
  load_descriptors(&text)
}
