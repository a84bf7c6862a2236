//! Property-Based Tests for Cache Module
//!
//! Uses proptest to check expiry timing, renewal and at-most-once firing
//! against a simple tick-counting model.

use proptest::prelude::*;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheMap, ExpiryCallback};

// == Test Configuration ==
const INTERVAL_MS: u64 = 100;
const LIMIT_MS: u64 = 1000;
/// ceil(LIMIT_MS / INTERVAL_MS); the farthest offset a token can land on
const HORIZON: u64 = 10;

fn new_map() -> CacheMap<String, u32> {
    CacheMap::new(
        Duration::from_millis(INTERVAL_MS),
        Duration::from_millis(LIMIT_MS),
    )
    .unwrap()
}

/// Ticks after which an entry with `ttl_ms` is released.
fn expected_ticks(ttl_ms: u64) -> u64 {
    (ttl_ms / INTERVAL_MS + 1).min(HORIZON)
}

fn counting_callback(counter: &Arc<AtomicUsize>) -> Option<ExpiryCallback> {
    let counter = Arc::clone(counter);
    Some(Box::new(move || {
        counter.fetch_add(1, Ordering::SeqCst);
    }))
}

// == Strategies ==
/// Generates keys from a small pool so operations collide
fn key_strategy() -> impl Strategy<Value = String> {
    (0u8..4).prop_map(|i| format!("key{}", i))
}

/// Generates TTLs in milliseconds, including 0 and values past the limit
fn ttl_strategy() -> impl Strategy<Value = u64> {
    prop_oneof![
        1 => Just(0u64),
        4 => 1u64..1500,
    ]
}

#[derive(Debug, Clone)]
enum CacheOp {
    Insert { key: String, ttl_ms: u64 },
    Contains { key: String },
    GetOrCreate { key: String },
    Erase { key: String },
    Tick,
}

fn cache_op_strategy() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        3 => (key_strategy(), ttl_strategy())
            .prop_map(|(key, ttl_ms)| CacheOp::Insert { key, ttl_ms }),
        2 => key_strategy().prop_map(|key| CacheOp::Contains { key }),
        1 => key_strategy().prop_map(|key| CacheOp::GetOrCreate { key }),
        1 => key_strategy().prop_map(|key| CacheOp::Erase { key }),
        4 => Just(CacheOp::Tick),
    ]
}

// == Reference Model ==
/// Per-key expectation: configured TTL and the tick at which it is released.
#[derive(Debug, Clone)]
struct ModelEntry {
    ttl_ms: u64,
    deadline: Option<u64>,
}

#[derive(Debug, Default)]
struct Model {
    now: u64,
    entries: HashMap<String, ModelEntry>,
    expirations: u64,
}

impl Model {
    fn renew(&mut self, key: &str) {
        let now = self.now;
        if let Some(entry) = self.entries.get_mut(key) {
            if entry.ttl_ms > 0 {
                let target = now + expected_ticks(entry.ttl_ms);
                // A live token fires at the latest horizon it was given.
                entry.deadline = Some(entry.deadline.map_or(target, |d| d.max(target)));
            }
        }
    }

    fn insert(&mut self, key: &str, ttl_ms: u64) {
        let entry = self.entries.entry(key.to_string()).or_insert(ModelEntry {
            ttl_ms: 0,
            deadline: None,
        });
        entry.ttl_ms = ttl_ms;
        if ttl_ms == 0 {
            entry.deadline = None;
        } else {
            self.renew(key);
        }
    }

    fn tick(&mut self) {
        self.now += 1;
        let now = self.now;
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.deadline != Some(now));
        self.expirations += (before - self.entries.len()) as u64;
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    // An entry that is never touched again is present for one tick less than
    // its release offset, gone at the offset, and its callback fired once.
    #[test]
    fn prop_expires_at_offset(ttl_ms in 1u64..3000) {
        let map = new_map();
        let fired = Arc::new(AtomicUsize::new(0));
        map.insert("k".to_string(), 1, Duration::from_millis(ttl_ms), counting_callback(&fired));

        let ticks = expected_ticks(ttl_ms);
        for _ in 0..ticks - 1 {
            map.tick();
        }
        prop_assert_eq!(map.len(), 1, "Entry should survive {} ticks", ticks - 1);

        map.tick();
        prop_assert!(map.is_empty(), "Entry should expire after {} ticks", ticks);

        for _ in 0..HORIZON {
            map.tick();
        }
        prop_assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    // Accessing an entry before its offset elapses keeps it alive; it then
    // expires a full offset after the last access.
    #[test]
    fn prop_sliding_renewal(
        ttl_ms in 100u64..1500,
        gaps in prop::collection::vec(1u64..10, 1..20)
    ) {
        let map = new_map();
        let fired = Arc::new(AtomicUsize::new(0));
        map.insert("k".to_string(), 1, Duration::from_millis(ttl_ms), counting_callback(&fired));
        let ticks = expected_ticks(ttl_ms);

        for gap in gaps {
            let gap = gap.min(ticks - 1);
            for _ in 0..gap {
                map.tick();
            }
            prop_assert!(map.contains(&"k".to_string()), "Renewed entry expired early");
        }

        for _ in 0..ticks - 1 {
            map.tick();
        }
        prop_assert_eq!(map.len(), 1);
        map.tick();
        prop_assert!(map.is_empty());
        prop_assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    // Entries inserted without a timeout survive any number of ticks.
    #[test]
    fn prop_zero_timeout_persists(ticks in 0usize..200, value in any::<u32>()) {
        let map = new_map();
        map.insert_forever("k".to_string(), value);

        for _ in 0..ticks {
            map.tick();
        }
        prop_assert_eq!(map.get(&"k".to_string()), Some(value));
    }

    // Arbitrary interleavings of inserts, lookups, erases and ticks match the
    // model, and callbacks fire exactly once per expiration.
    #[test]
    fn prop_matches_model(ops in prop::collection::vec(cache_op_strategy(), 1..120)) {
        let map = new_map();
        let fired = Arc::new(AtomicUsize::new(0));
        let mut model = Model::default();

        for op in ops {
            match op {
                CacheOp::Insert { key, ttl_ms } => {
                    map.insert(key.clone(), 0, Duration::from_millis(ttl_ms), counting_callback(&fired));
                    model.insert(&key, ttl_ms);
                }
                CacheOp::Contains { key } => {
                    let found = map.contains(&key);
                    prop_assert_eq!(found, model.entries.contains_key(&key));
                    model.renew(&key);
                }
                CacheOp::GetOrCreate { key } => {
                    *map.get_or_create(key.clone()) += 1;
                    if model.entries.contains_key(&key) {
                        model.renew(&key);
                    } else {
                        model.insert(&key, 0);
                    }
                }
                CacheOp::Erase { key } => {
                    prop_assert_eq!(map.erase(&key), model.entries.remove(&key).is_some());
                }
                CacheOp::Tick => {
                    map.tick();
                    model.tick();
                }
            }
            prop_assert_eq!(map.len(), model.entries.len());
        }

        // Drain everything still scheduled.
        for _ in 0..=HORIZON {
            map.tick();
            model.tick();
        }
        prop_assert_eq!(map.len(), model.entries.len());
        prop_assert_eq!(map.stats().expirations, model.expirations);
        prop_assert_eq!(fired.load(Ordering::SeqCst) as u64, model.expirations);
        prop_assert_eq!(map.stats().pending, 0);
    }
}
