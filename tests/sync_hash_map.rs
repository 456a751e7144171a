// SyncHashMap integration test suite (consolidated).
//
// Each test documents the behavior being verified and the invariants
// assumed or asserted. The core invariants exercised:
// - Round trip: after put(k, v), get(k) yields v until remove or replace.
// - Upsert: replacement disposes the old payload exactly once before the
//   new value becomes visible; len is unchanged by an update.
// - Disposal: drop disposes each live entry's key and value exactly once;
//   resize relocations dispose nothing.
// - Growth: crossing load factor 0.75 doubles capacity and preserves
//   membership with the original values.
// - Concurrency: puts of disjoint key sets from multiple threads leave
//   len == N with every key retrievable; contended upserts lose no
//   entries.
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use sync_chainmap::{Disposer, SyncHashMap, TableError};

/// Thread-safe disposal tracker.
#[derive(Clone, Default)]
struct CountingDisposer {
    keys: Arc<AtomicUsize>,
    values: Arc<AtomicUsize>,
}

impl<K, V> Disposer<K, V> for CountingDisposer {
    fn dispose_key(&self, key: K) {
        self.keys.fetch_add(1, Ordering::Relaxed);
        drop(key);
    }
    fn dispose_value(&self, value: V) {
        self.values.fetch_add(1, Ordering::Relaxed);
        drop(value);
    }
}

fn counted_map<K: Eq + std::hash::Hash, V>(
    capacity: usize,
) -> (
    SyncHashMap<K, V, std::collections::hash_map::RandomState, CountingDisposer>,
    CountingDisposer,
) {
    let d = CountingDisposer::default();
    let m = SyncHashMap::with_parts(capacity, Default::default(), d.clone()).expect("capacity > 0");
    (m, d)
}

// Test: the numeric walk-through scenario end to end.
// Verifies: put/get/upsert/remove/drop compose correctly with a
// capacity-32 table and integer payloads.
#[test]
fn numeric_walkthrough() {
    let (m, d) = counted_map::<u64, u64>(32);

    m.put(1, 100).unwrap();
    m.put(2, 200).unwrap();
    assert_eq!(m.get_cloned(&1), Some(100));

    m.put(1, 101).unwrap();
    assert_eq!(m.get_cloned(&1), Some(101));
    assert_eq!(m.len(), 2);
    assert_eq!(d.values.load(Ordering::Relaxed), 1, "one replacement");

    assert!(m.remove(&2));
    assert_eq!(m.get_cloned(&2), None);
    assert_eq!(m.len(), 1);

    drop(m);
    // 1 replaced + 1 removed + 1 live at drop.
    assert_eq!(d.keys.load(Ordering::Relaxed), 3);
    assert_eq!(d.values.load(Ordering::Relaxed), 3);
}

// Test: guard-based lookup.
// Assumes: the guard holds the table lock for its lifetime.
// Verifies: deref yields the stored value; the map is usable again once
// the guard is dropped.
#[test]
fn value_guard_derefs_and_releases() {
    let m: SyncHashMap<String, i32> = SyncHashMap::new();
    m.put("k".to_string(), 7).unwrap();

    {
        let g = m.get("k").expect("present");
        assert_eq!(*g, 7);
    }

    // Lock released: mutations proceed.
    m.put("k".to_string(), 8).unwrap();
    assert_eq!(*m.get("k").unwrap(), 8);
    assert!(m.get("absent").is_none());
}

// Test: removal of an absent key.
// Verifies: no-op, len and contents unchanged, nothing disposed.
#[test]
fn remove_absent_is_noop() {
    let (m, d) = counted_map::<String, i32>(32);
    m.put("k".to_string(), 1).unwrap();

    assert!(!m.remove("missing"));
    assert_eq!(m.len(), 1);
    assert_eq!(m.get_cloned("k"), Some(1));
    assert_eq!(d.keys.load(Ordering::Relaxed), 0);
}

// Test: resize triggered by load factor.
// Verifies: every previously inserted key is retrievable with its
// original value immediately after the insert that triggers growth, and
// len is unchanged by the resize itself.
#[test]
fn growth_preserves_membership() {
    let m: SyncHashMap<u64, u64> = SyncHashMap::with_capacity(8, Default::default()).unwrap();
    for i in 0..6 {
        m.put(i, i * 7).unwrap();
    }
    assert_eq!(m.capacity(), 8, "6/8 == 0.75, not past the threshold");

    // Seventh insert crosses 0.75 and doubles the slot array.
    m.put(6, 42).unwrap();
    assert_eq!(m.capacity(), 16);
    assert_eq!(m.len(), 7);
    for i in 0..6 {
        assert_eq!(m.get_cloned(&i), Some(i * 7));
    }
    assert_eq!(m.get_cloned(&6), Some(42));
}

// Test: explicit growth.
// Verifies: grow() doubles capacity on demand and disposes nothing.
#[test]
fn explicit_growth_disposes_nothing() {
    let (m, d) = counted_map::<u64, String>(32);
    for i in 0..10 {
        m.put(i, format!("v{i}")).unwrap();
    }
    m.grow().unwrap();
    assert_eq!(m.capacity(), 64);
    assert_eq!(m.len(), 10);
    for i in 0..10 {
        assert_eq!(m.get_cloned(&i), Some(format!("v{i}")));
    }
    assert_eq!(d.keys.load(Ordering::Relaxed), 0);
    assert_eq!(d.values.load(Ordering::Relaxed), 0);
}

// Test: zero capacity is an invalid argument at construction.
#[test]
fn zero_capacity_rejected() {
    let r: Result<SyncHashMap<u64, u64>, _> = SyncHashMap::with_capacity(0, Default::default());
    assert!(matches!(r, Err(TableError::InvalidArgument(_))));
}

// Test: concurrent puts of disjoint key ranges.
// Assumes: the table-wide lock serializes all structural operations.
// Verifies: len == N afterwards and every key maps to its value.
#[test]
fn concurrent_disjoint_puts() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 500;

    let m: Arc<SyncHashMap<u64, u64>> = Arc::new(SyncHashMap::new());
    let mut handles = Vec::new();
    for t in 0..THREADS {
        let m = Arc::clone(&m);
        handles.push(thread::spawn(move || {
            for i in 0..PER_THREAD {
                let k = t * PER_THREAD + i;
                m.put(k, k * 2).unwrap();
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(m.len() as u64, THREADS * PER_THREAD);
    for k in 0..THREADS * PER_THREAD {
        assert_eq!(m.get_cloned(&k), Some(k * 2));
    }
}

// Test: contended upserts over one small key set.
// Verifies: no entries are lost or duplicated; each key holds a value
// some thread wrote for it, and every displaced payload was disposed.
#[test]
fn concurrent_contended_upserts() {
    const THREADS: u64 = 4;
    const KEYS: u64 = 16;
    const ROUNDS: u64 = 200;

    let (m, d) = counted_map::<u64, u64>(32);
    let m = Arc::new(m);
    let mut handles = Vec::new();
    for t in 0..THREADS {
        let m = Arc::clone(&m);
        handles.push(thread::spawn(move || {
            for r in 0..ROUNDS {
                for k in 0..KEYS {
                    m.put(k, t * 1_000_000 + r * 1_000 + k).unwrap();
                }
            }
        }));
    }
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(m.len() as u64, KEYS);
    for k in 0..KEYS {
        let v = m.get_cloned(&k).expect("key present");
        assert_eq!(v % 1_000, k, "value was written for this key");
    }

    // Every put but the first per key displaced exactly one payload.
    let expected = (THREADS * ROUNDS * KEYS - KEYS) as usize;
    assert_eq!(d.values.load(Ordering::Relaxed), expected);
}

// Test: a disposer that declines ownership.
// Assumes: the caller retains external ownership of the payloads, so the
// disposer forgets instead of dropping (the moral equivalent of the no-op
// destructors in a stack-scoped-key setup).
#[test]
fn forgetting_disposer_is_supported() {
    struct ForgetDisposer;
    impl<K, V> Disposer<K, V> for ForgetDisposer {
        fn dispose_key(&self, key: K) {
            std::mem::forget(key);
        }
        fn dispose_value(&self, value: V) {
            std::mem::forget(value);
        }
    }

    let m: SyncHashMap<u64, &'static str, _, ForgetDisposer> =
        SyncHashMap::with_parts(32, std::collections::hash_map::RandomState::new(), ForgetDisposer)
            .unwrap();
    m.put(1, "one").unwrap();
    m.put(1, "uno").unwrap();
    assert_eq!(m.get_cloned(&1), Some("uno"));
    assert!(m.remove(&1));
    drop(m);
}

// Test: string keys with borrowed lookups through the sync layer.
#[test]
fn borrowed_lookup_with_str() {
    let m: SyncHashMap<String, i32> = SyncHashMap::new();
    m.put("hello".to_string(), 1).unwrap();
    assert!(m.contains_key("hello"));
    assert!(!m.contains_key("world"));
    assert_eq!(m.get_cloned("hello"), Some(1));
    assert!(m.remove("hello"));
    assert!(m.is_empty());
}
