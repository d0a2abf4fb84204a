//! Example: Player wallets sharded by account name
//!
//! This example demonstrates:
//! - Loading an entity descriptor from JSON configuration
//! - Creating rows that land on CRC-32 routed tables
//! - Upserting a row and applying guarded delta updates
//! - Handling a rejected overdraft as a business outcome

use std::sync::Arc;
use tableshard::{EntityDescriptor, Error, MemoryStorage, ShardRegistry, ShardedModel, fields};

const WALLET: &str = r#"{
  "name": "wallet",
  "table_prefix": "t_wallet_",
  "routing_field": "account",
  "shard_count": 16,
  "fields": [
    { "name": "account", "kind": "text" },
    { "name": "gold", "kind": "integer" },
    { "name": "chips", "kind": "integer", "negative_guard": true }
  ]
}"#;

fn main() -> tableshard::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .init();

  println!("=== tableshard Wallet Example ===\n");

  // 1. Describe the entity and bind it to a storage engine
  let descriptor = EntityDescriptor::from_json_str(WALLET)?;
  let wallets = ShardedModel::new(descriptor, Arc::new(ShardRegistry::new()), Arc::new(MemoryStorage::new()));
  wallets.warm()?;
  println!("✓ Registered {} shard tables", wallets.registry().len());

  // 2. Open some wallets
  println!("\n--- Opening Wallets ---");
  for name in ["alice", "bob", "carol", "dave"] {
    wallets.create(name, fields! { "gold" => 0, "chips" => 10 })?;
    let handle = wallets.handle_for_key(name)?;
    println!("  {} -> shard {} ({})", name, handle.index(), handle.table());
  }

  // 3. Upsert: updates alice, creates erin
  println!("\n--- Upserts ---");
  wallets.update_or_create("alice", fields! { "account" => "alice" }, fields! { "gold" => 50 })?;
  wallets.update_or_create("erin", fields! { "account" => "erin" }, fields! { "gold" => 5, "chips" => 1 })?;
  for name in ["alice", "erin"] {
    let row = wallets.filter(name, fields! {})?.get()?;
    println!("  {}", row.to_json()?);
  }

  // 4. Guarded spending
  println!("\n--- Spending Chips ---");
  wallets.delta_update("bob", fields! {}, &fields! { "chips__x" => -7, "gold__x" => 70 })?;
  println!("✓ bob spent 7 chips");

  match wallets.delta_update("bob", fields! {}, &fields! { "chips__x" => -7 }) {
    Err(Error::InsufficientBalance { table, fields }) => {
      println!("✗ bob cannot spend 7 more chips ({}: insufficient {:?})", table, fields)
    }
    other => println!("unexpected outcome: {:?}", other),
  }

  let bob = wallets.filter("bob", fields! {})?.get()?;
  println!("  {}", bob.to_json()?);

  println!("\n=== Example Complete ===");
  Ok(())
}
