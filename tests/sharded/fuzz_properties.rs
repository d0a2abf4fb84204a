#[path = "../common/mod.rs"]
mod common;

use common::{TestEnv, profile_descriptor, wallet_descriptor};
use proptest::prelude::*;
use std::collections::HashMap;
use tableshard::sharded::route;
use tableshard::{Error, Value, fields};

// --- Reference CRC-32 ---
// Bitwise IEEE 802.3 (reflected polynomial 0xEDB88320), independent of crc32fast.
fn reference_crc32(bytes: &[u8]) -> u32 {
  let mut crc = 0xFFFF_FFFFu32;
  for &b in bytes {
    crc ^= b as u32;
    for _ in 0..8 {
      let mask = (crc & 1).wrapping_neg();
      crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
    }
  }
  !crc
}

// --- The Model ---
// uid -> chips balance
type Model = HashMap<i64, i64>;

// --- The Actions ---
#[derive(Debug, Clone)]
enum Action {
  Open { uid: i64, chips: i64 },
  Spend { uid: i64, amount: i64 },
  Grant { uid: i64, amount: i64 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
  prop_oneof![
    1 => (0..20i64, 0..50i64).prop_map(|(uid, chips)| Action::Open { uid, chips }),
    4 => (0..20i64, 1..30i64).prop_map(|(uid, amount)| Action::Spend { uid, amount }),
    2 => (0..20i64, 1..30i64).prop_map(|(uid, amount)| Action::Grant { uid, amount }),
  ]
}

proptest! {
  #![proptest_config(ProptestConfig::with_cases(64))]

  #[test]
  fn integer_routing_is_abs_mod(k in any::<i64>(), shards in 1u16..512) {
    let desc = wallet_descriptor(shards);
    let expected = (k.unsigned_abs() % shards as u64) as u16;
    prop_assert_eq!(route(&desc, &Value::Int(k)).unwrap(), expected);
    prop_assert_eq!(route(&desc, &Value::from(k.to_string())).unwrap(), expected);
  }

  #[test]
  fn text_routing_matches_reference_crc32(s in ".{0,64}", shards in 1u16..512) {
    let desc = profile_descriptor(shards);
    let expected = (reference_crc32(s.as_bytes()) % shards as u32) as u16;
    let first = route(&desc, &Value::from(s.as_str())).unwrap();
    prop_assert_eq!(first, expected);
    prop_assert_eq!(route(&desc, &Value::from(s.as_str())).unwrap(), first);
  }

  #[test]
  fn guarded_balances_follow_model(actions in prop::collection::vec(action_strategy(), 1..80)) {
    let env = TestEnv::wallets();
    let mut model: Model = HashMap::new();

    for action in actions {
      match action {
        Action::Open { uid, chips } => {
          env
            .model
            .update_or_create(uid, fields! { "user_id" => uid }, fields! { "chips" => chips })
            .unwrap();
          model.insert(uid, chips);
        }
        Action::Spend { uid, amount } => {
          let res = env.model.delta_update(uid, fields! {}, &fields! { "chips__x" => -amount });
          match model.get_mut(&uid) {
            None => prop_assert_eq!(res.unwrap(), 0),
            Some(balance) if *balance >= amount => {
              prop_assert_eq!(res.unwrap(), 1);
              *balance -= amount;
            }
            Some(_) => prop_assert!(matches!(res, Err(Error::InsufficientBalance { .. })), "expected InsufficientBalance, got {:?}", res),
          }
        }
        Action::Grant { uid, amount } => {
          let changed = env.model.delta_update(uid, fields! {}, &fields! { "chips__x" => amount }).unwrap();
          match model.get_mut(&uid) {
            None => prop_assert_eq!(changed, 0),
            Some(balance) => {
              prop_assert_eq!(changed, 1);
              *balance += amount;
            }
          }
        }
      }
    }

    for (uid, balance) in &model {
      let row = env.model.filter(*uid, fields! {}).unwrap().get().unwrap();
      prop_assert_eq!(row.get_i64("chips"), Some(*balance));
      prop_assert!(*balance >= 0);
    }
  }
}

#[test]
fn reference_crc32_agrees_with_check_value() {
  assert_eq!(reference_crc32(b"123456789"), 0xCBF4_3926);
  assert_eq!(reference_crc32(b"abc123"), tableshard::sharded::uint_crc32(b"abc123"));
}
