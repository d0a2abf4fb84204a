//! Concurrent operations tests

#[path = "../common/mod.rs"]
mod common;

use common::{TestEnv, wallet_descriptor};
use std::sync::{Arc, Barrier};
use std::thread;
use tableshard::{Error, ShardRegistry, fields};

#[test]
fn test_concurrent_first_access_builds_one_handle() {
  let registry = Arc::new(ShardRegistry::new());
  let descriptor = Arc::new(wallet_descriptor(10));
  let thread_count = 16;
  let barrier = Arc::new(Barrier::new(thread_count));

  let handles: Vec<_> = (0..thread_count)
    .map(|_| {
      let registry = registry.clone();
      let descriptor = descriptor.clone();
      let barrier = barrier.clone();
      thread::spawn(move || {
        barrier.wait(); // Synchronize start
        (0..10u16)
          .map(|idx| registry.get_handle(&descriptor, idx).unwrap())
          .collect::<Vec<_>>()
      })
    })
    .collect();

  let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

  assert_eq!(registry.constructed(), 10);
  for per_thread in &results {
    for (idx, handle) in per_thread.iter().enumerate() {
      assert!(Arc::ptr_eq(handle, &results[0][idx]));
      assert_eq!(handle.table(), format!("wallet{}", idx));
    }
  }
}

#[test]
fn test_concurrent_creates() {
  let env = Arc::new(TestEnv::wallets());
  let mut handles = vec![];

  // Spawn 10 threads, each creating 100 wallets
  for thread_id in 0..10 {
    let env = env.clone();
    handles.push(thread::spawn(move || {
      for i in 0..100 {
        let uid = thread_id * 100 + i;
        env.model.create(uid, fields! { "gold" => i }).unwrap();
      }
    }));
  }

  for h in handles {
    h.join().unwrap();
  }

  let total: usize = (0..10).map(|s| env.storage.row_count(&format!("wallet{}", s))).sum();
  assert_eq!(total, 1000, "Should have all 1000 rows");
  assert_eq!(env.registry.len(), 10);
}

#[test]
fn test_guarded_balance_never_goes_negative() {
  let env = Arc::new(TestEnv::wallets());
  env.model.create(7, fields! { "chips" => 100 }).unwrap();

  let thread_count = 20;
  let barrier = Arc::new(Barrier::new(thread_count));
  let mut handles = vec![];

  for _ in 0..thread_count {
    let env = env.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      let mut spent = 0u64;
      for _ in 0..10 {
        match env.model.delta_update(7, fields! {}, &fields! { "chips__x" => -1 }) {
          Ok(n) => spent += n,
          Err(Error::InsufficientBalance { .. }) => {}
          Err(e) => panic!("unexpected error: {}", e),
        }
      }
      spent
    }));
  }

  let spent: u64 = handles.into_iter().map(|h| h.join().unwrap()).sum();
  assert_eq!(spent, 100);

  let row = env.model.filter(7, fields! {}).unwrap().get().unwrap();
  assert_eq!(row.get_i64("chips"), Some(0));
}

#[test]
fn test_concurrent_native_upserts_do_not_duplicate() {
  let env = Arc::new(TestEnv::wallets());
  let thread_count = 8;
  let barrier = Arc::new(Barrier::new(thread_count));
  let mut handles = vec![];

  for t in 0..thread_count {
    let env = env.clone();
    let barrier = barrier.clone();
    handles.push(thread::spawn(move || {
      barrier.wait();
      for uid in 0..20 {
        env
          .model
          .update_or_create(uid, fields! { "user_id" => uid }, fields! { "gold" => t as i64 })
          .unwrap();
      }
    }));
  }

  for h in handles {
    h.join().unwrap();
  }

  for uid in 0..20 {
    assert_eq!(env.model.filter(uid, fields! {}).unwrap().count().unwrap(), 1);
  }
}
