//! Basic ShardedModel integration tests

#[path = "../common/mod.rs"]
mod common;

use common::TestEnv;
use tableshard::{Error, Predicate, Value, fields};

#[test]
fn test_create_and_filter() {
  let env = TestEnv::wallets();

  for uid in 0..50 {
    env.model.create(uid, fields! { "gold" => uid * 10 }).unwrap();
  }

  for uid in 0..50 {
    let rows = env.model.filter(uid, fields! {}).unwrap().fetch().unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].get_i64("user_id"), Some(uid as i64));
    assert_eq!(rows[0].get_i64("gold"), Some(uid as i64 * 10));
  }

  // 50 sequential ids over 10 shards: 5 rows per table
  for shard in 0..10 {
    assert_eq!(env.storage.row_count(&format!("wallet{}", shard)), 5);
  }
}

#[test]
fn test_deterministic_routing() {
  let env = TestEnv::profiles();

  let shard1 = env.model.shard_index("consistent_key").unwrap();
  let shard2 = env.model.shard_index("consistent_key").unwrap();
  let shard3 = env.model.shard_index("consistent_key").unwrap();

  assert_eq!(shard1, shard2);
  assert_eq!(shard2, shard3);
}

#[test]
fn test_text_routing_golden_value() {
  let env = TestEnv::profiles();
  env.model.create("abc123", fields! { "level" => 1 }).unwrap();

  assert_eq!(env.model.shard_index("abc123").unwrap(), 8);
  assert_eq!(env.storage.row_count("t_profile_8"), 1);
}

#[test]
fn test_filter_forces_routing_field() {
  let env = TestEnv::wallets();
  env.model.create(3, fields! { "gold" => 1 }).unwrap();
  env.model.create(13, fields! { "gold" => 1 }).unwrap();

  // Both rows live in wallet3; filter only sees the key's own row
  assert_eq!(env.storage.row_count("wallet3"), 2);
  let rows = env.model.filter(3, fields! { "gold" => 1 }).unwrap().fetch().unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].get_i64("user_id"), Some(3));

  // A conflicting routing value in the extra filters is replaced by the key
  let rows = env.model.filter(3, fields! { "user_id" => 13 }).unwrap().fetch().unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].get_i64("user_id"), Some(3));
}

#[test]
fn test_filter_exact_uses_key_only_for_shard() {
  let env = TestEnv::wallets();
  env.model.create(3, fields! { "gold" => 1 }).unwrap();
  env.model.create(13, fields! { "gold" => 1 }).unwrap();
  env.model.create(4, fields! { "gold" => 1 }).unwrap();

  let qs = env.model.filter_exact(3, fields! { "gold" => 1 }).unwrap();
  assert_eq!(qs.handle().table(), "wallet3");
  assert_eq!(qs.count().unwrap(), 2);

  let qs = env.model.filter_exact(23, fields! {}).unwrap();
  assert_eq!(qs.count().unwrap(), 2);
}

#[test]
fn test_queryset_is_lazy_and_restartable() {
  let env = TestEnv::wallets();
  let qs = env.model.filter(7, fields! {}).unwrap();

  assert!(!qs.exists().unwrap());
  assert!(env.storage.table_names().is_empty());

  env.model.create(7, fields! { "gold" => 5 }).unwrap();
  assert_eq!(qs.count().unwrap(), 1);
  assert_eq!(qs.iter().unwrap().count(), 1);
  assert_eq!(qs.iter().unwrap().count(), 1);

  let first = qs.first().unwrap().unwrap();
  assert_eq!(first.get_i64("gold"), Some(5));
}

#[test]
fn test_queryset_refinement() {
  let env = TestEnv::wallets();
  env.model.create(7, fields! { "gold" => 5, "nick" => "a" }).unwrap();
  env.model.create(7, fields! { "gold" => 50, "nick" => "b" }).unwrap();

  let rich = env
    .model
    .filter(7, fields! {})
    .unwrap()
    .filter(Predicate::new().gte("gold", 10));
  let rows = rich.fetch().unwrap();
  assert_eq!(rows.len(), 1);
  assert_eq!(rows[0].get_str("nick"), Some("b"));

  assert!(matches!(
    env.model.filter(7, fields! {}).unwrap().get(),
    Err(Error::MultipleFound { count: 2, .. })
  ));
}

#[test]
fn test_update_matches_routing_field() {
  let env = TestEnv::wallets();
  env.model.create(5, fields! { "gold" => 1 }).unwrap();
  env.model.create(15, fields! { "gold" => 1 }).unwrap();

  let changed = env.model.update(5, fields! { "gold" => 9 }).unwrap();
  assert_eq!(changed, 1);

  let other = env.model.filter(15, fields! {}).unwrap().get().unwrap();
  assert_eq!(other.get_i64("gold"), Some(1));
  let mine = env.model.filter(5, fields! {}).unwrap().get().unwrap();
  assert_eq!(mine.get_i64("gold"), Some(9));
}

#[test]
fn test_filter_update_returns_count() {
  let env = TestEnv::wallets();
  env.model.create(5, fields! { "gold" => 1, "nick" => "x" }).unwrap();
  env.model.create(5, fields! { "gold" => 1, "nick" => "y" }).unwrap();
  env.model.create(5, fields! { "gold" => 2, "nick" => "z" }).unwrap();

  let changed = env
    .model
    .filter_update(5, fields! { "gold" => 1 }, fields! { "nick" => "renamed" })
    .unwrap();
  assert_eq!(changed, 2);

  let renamed = env.model.filter(5, fields! { "nick" => "renamed" }).unwrap().count().unwrap();
  assert_eq!(renamed, 2);
  assert_eq!(env.model.filter_update(6, fields! {}, fields! { "gold" => 0 }).unwrap(), 0);
}

#[test]
fn test_record_json_view() {
  let env = TestEnv::profiles();
  env.model.create("bob", fields! { "level" => 3, "title" => "knight" }).unwrap();

  let bob = env.model.filter("bob", fields! {}).unwrap().get().unwrap();
  let json = bob.to_json().unwrap();
  assert_eq!(json["account"], "bob");
  assert_eq!(json["level"], 3);
  assert_eq!(json["title"], "knight");
  assert_eq!(bob.get("missing"), None);
}

#[test]
fn test_invalid_keys() {
  let env = TestEnv::wallets();
  assert!(matches!(
    env.model.create("not-a-number", fields! {}),
    Err(Error::InvalidKey { .. })
  ));
  assert!(matches!(
    env.model.update(Value::Null, fields! { "gold" => 1 }),
    Err(Error::MissingRoutingKey { .. })
  ));
}

#[test]
fn test_out_of_range_float_keys_are_rejected() {
  let env = TestEnv::wallets();
  for key in [1e19, 5e30, -1e19] {
    assert!(matches!(
      env.model.create(Value::Float(key), fields! {}),
      Err(Error::InvalidKey { .. })
    ));
  }
  assert!(matches!(
    env.model.create(1, fields! { "gold" => 1e25 }),
    Err(Error::TypeMismatch { .. })
  ));
  assert_eq!(env.model.filter(i64::MAX, fields! {}).unwrap().count().unwrap(), 0);
  assert!(env.storage.table_names().is_empty());
}

#[test]
fn test_create_and_update_reject_conflicting_routing_field() {
  let env = TestEnv::wallets();
  assert!(matches!(
    env.model.create(5, fields! { "user_id" => 6, "gold" => 1 }),
    Err(Error::RoutingFieldChange { .. })
  ));
  assert!(env.storage.table_names().is_empty());

  env.model.create(5, fields! { "user_id" => "5", "gold" => 1 }).unwrap();
  assert!(matches!(
    env.model.update(5, fields! { "user_id" => 6 }),
    Err(Error::RoutingFieldChange { .. })
  ));
  assert_eq!(env.model.update(5, fields! { "user_id" => 5, "gold" => 2 }).unwrap(), 1);

  let row = env.model.filter(5, fields! {}).unwrap().get().unwrap();
  assert_eq!(row.get_i64("gold"), Some(2));
}
