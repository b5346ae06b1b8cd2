//! Property-Based Tests for the in-memory store
//!
//! Uses proptest to check store behavior over generated operation sequences.

use proptest::prelude::*;
use std::collections::HashSet;
use std::time::Duration;

use bytes::Bytes;

use crate::cache::{CacheStore, MemoryStore};
use crate::middleware::CacheKey;
use crate::store::ResponseStore;

// == Test Configuration ==
const TEST_MAX_ENTRIES: usize = 100;
const TEST_MAX_BYTES: usize = 4096;
const TEST_TTL: Duration = Duration::from_secs(300);

// == Strategies ==
fn valid_key_strategy() -> impl Strategy<Value = String> {
    "[a-f0-9]{1,64}"
}

fn valid_value_strategy() -> impl Strategy<Value = Bytes> {
    prop::collection::vec(any::<u8>(), 0..512).prop_map(Bytes::from)
}

#[derive(Debug, Clone)]
enum StoreOp {
    Set { key: String, value: Bytes },
    Get { key: String },
}

fn store_op_strategy() -> impl Strategy<Value = StoreOp> {
    prop_oneof![
        (valid_key_strategy(), valid_value_strategy())
            .prop_map(|(key, value)| StoreOp::Set { key, value }),
        valid_key_strategy().prop_map(|key| StoreOp::Get { key }),
    ]
}

fn unique(keys: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    keys.into_iter().filter(|k| seen.insert(k.clone())).collect()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // Hit and miss counters match what each lookup observed.
    #[test]
    fn prop_statistics_accuracy(ops in prop::collection::vec(store_op_strategy(), 1..50)) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_BYTES);
        let mut expected_hits: u64 = 0;
        let mut expected_misses: u64 = 0;

        for op in ops {
            match op {
                StoreOp::Set { key, value } => {
                    let _ = store.set(key, value, TEST_TTL);
                }
                StoreOp::Get { key } => match store.get(&key) {
                    Ok(_) => expected_hits += 1,
                    Err(_) => expected_misses += 1,
                },
            }
        }

        let stats = store.stats();
        prop_assert_eq!(stats.hits, expected_hits);
        prop_assert_eq!(stats.misses, expected_misses);
        prop_assert_eq!(stats.total_entries, store.len());
    }

    // Stored bytes come back exactly, whatever they contain.
    #[test]
    fn prop_roundtrip_storage(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_BYTES);

        store.set(key.clone(), value.clone(), TEST_TTL).unwrap();
        prop_assert_eq!(store.get(&key).unwrap(), value);
    }

    // Last write wins.
    #[test]
    fn prop_overwrite_semantics(
        key in valid_key_strategy(),
        first in valid_value_strategy(),
        second in valid_value_strategy()
    ) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_BYTES);

        store.set(key.clone(), first, TEST_TTL).unwrap();
        store.set(key.clone(), second.clone(), TEST_TTL).unwrap();

        prop_assert_eq!(store.get(&key).unwrap(), second);
        prop_assert_eq!(store.len(), 1);
    }

    #[test]
    fn prop_capacity_enforcement(
        entries in prop::collection::vec((valid_key_strategy(), valid_value_strategy()), 1..200)
    ) {
        let max_entries = 50;
        let mut store = CacheStore::new(max_entries, TEST_MAX_BYTES);

        for (key, value) in entries {
            let _ = store.set(key, value, TEST_TTL);
            prop_assert!(store.len() <= max_entries, "size {} exceeds {}", store.len(), max_entries);
        }
    }

    // Filling to capacity and adding one more evicts the least recently used key.
    #[test]
    fn prop_lru_eviction_order(
        keys in prop::collection::vec(valid_key_strategy(), 3..10),
        accessed in any::<prop::sample::Index>(),
        new_key in valid_key_strategy()
    ) {
        let keys = unique(keys);
        prop_assume!(keys.len() >= 2);
        prop_assume!(!keys.contains(&new_key));

        let mut store = CacheStore::new(keys.len(), TEST_MAX_BYTES);
        for key in &keys {
            store.set(key.clone(), Bytes::from(key.clone()), TEST_TTL).unwrap();
        }

        // Touch one key; the oldest untouched key becomes the victim
        let touched = keys[accessed.index(keys.len())].clone();
        store.get(&touched).unwrap();
        let victim = keys.iter().find(|k| **k != touched).unwrap().clone();

        store.set(new_key.clone(), Bytes::from_static(b"new"), TEST_TTL).unwrap();

        prop_assert_eq!(store.len(), keys.len());
        prop_assert!(!store.contains(&victim), "'{}' should have been evicted", victim);
        prop_assert!(store.contains(&touched), "touched key '{}' was evicted", touched);
        prop_assert!(store.contains(&new_key));
    }
}

// Fewer cases for time-sensitive expiry checks
proptest! {
    #![proptest_config(ProptestConfig::with_cases(5))]

    #[test]
    fn prop_ttl_expiration_behavior(key in valid_key_strategy(), value in valid_value_strategy()) {
        let mut store = CacheStore::new(TEST_MAX_ENTRIES, TEST_MAX_BYTES);

        store.set(key.clone(), value.clone(), Duration::from_millis(40)).unwrap();
        prop_assert_eq!(store.get(&key).unwrap(), value);

        std::thread::sleep(Duration::from_millis(70));

        prop_assert!(store.get(&key).is_err(), "entry should not be served after its lifetime");
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(50))]

    // Concurrent writers and readers through the async backend only ever
    // observe complete values that some writer stored.
    #[test]
    fn prop_concurrent_operation_correctness(
        urls in prop::collection::vec("/[a-z]{1,8}", 1..6),
        writes in prop::collection::vec((any::<prop::sample::Index>(), valid_value_strategy()), 5..40)
    ) {
        let rt = tokio::runtime::Runtime::new().unwrap();

        rt.block_on(async {
            let store = MemoryStore::new(TEST_MAX_ENTRIES, TEST_MAX_BYTES);
            let written: HashSet<Bytes> = writes.iter().map(|(_, v)| v.clone()).collect();

            let mut handles = vec![];
            for (index, value) in writes {
                let store = store.clone();
                let key = CacheKey::from_url(&urls[index.index(urls.len())]);
                handles.push(tokio::spawn(async move {
                    store.put(&key, value, TEST_TTL).await.unwrap();
                    store.get(&key).await.unwrap()
                }));
            }

            for handle in handles {
                let read = handle.await.expect("task should not panic");
                let read = read.expect("entry was just written");
                prop_assert!(written.contains(&read), "read a value no writer stored");
            }

            prop_assert!(store.len().await <= urls.len());
            Ok(())
        })?;
    }
}
