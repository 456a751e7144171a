//! sync-chainmap: a thread-safe chained hash map with caller-controlled
//! entry disposal.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: a reusable keyed-storage primitive where the caller controls
//!   hashing, equality, and the release of key/value resources, safe to
//!   share between threads under one table-wide lock.
//! - Layers:
//!   - ChainTable<K, V, S, D>: the unsynchronized core. A slot array of
//!     chain heads indexed by `hash % capacity`; collision chains are
//!     doubly-linked nodes stored in a slotmap arena and linked by stable
//!     generational keys instead of raw pointers. Implements lookup,
//!     upsert, three-case chain splicing, and the doubling resize.
//!   - SyncHashMap<K, V, S, D>: public API wrapping the core in a
//!     `parking_lot::Mutex`. Every operation takes `&self`, serializes on
//!     the lock, and runs to completion.
//!
//! Behavior injection
//! - `K: Eq + Hash` defines value equality and hashing of the logical
//!   key; `S: BuildHasher` injects the hash behavior. Equality must be an
//!   equivalence consistent with hashing; identity comparison of handles
//!   breaks update/remove semantics.
//! - `D: Disposer<K, V>` injects destruction behavior, run on
//!   replacement, removal, and teardown. Resize relocates payloads
//!   without disposing them. `DropDisposer` (the default) simply drops.
//!
//! Locking discipline
//! - One non-reentrant mutex serializes all structural operations. The
//!   upsert path splices out the old node and inserts the new one inline
//!   within a single lock acquisition, and resize runs inside the
//!   triggering insert's acquisition, so no operation ever re-enters the
//!   public API while holding the lock.
//! - Disposer/Hash/Eq callbacks run under the lock; calling back into the
//!   same map from one deadlocks. Debug builds carry a reentrancy guard
//!   in the core that panics at the point of reentry instead.
//!
//! Lookup aliasing contract
//! - `get` returns a `ValueGuard` that keeps the lock held while the
//!   borrowed value is in use, so the reference cannot survive a
//!   mutation. `get_cloned` copies the value out and releases the lock
//!   before returning.
//!
//! Hasher and rehashing invariants
//! - Each node caches its key's `u64` hash and indexing always uses the
//!   cached hash; `K: Hash` is never invoked after insertion, so resize
//!   makes no calls into user code.
//!
//! Notes and non-goals
//! - No iteration/enumeration API, no persistence, no sharded or
//!   lock-free concurrency, no automatic shrink on delete, no multi-key
//!   transactions. Single-key point operations only.
//! - Growth is all-or-nothing: an allocation failure while doubling the
//!   slot array leaves the table at its previous capacity and is reported
//!   as `TableError::AllocationFailure`.

pub mod chain_table;
mod dispose;
mod reentrancy;
mod sync_hash_map;

// Public surface
pub use chain_table::{ChainTable, TableError, STARTING_CAPACITY};
pub use dispose::{Disposer, DropDisposer};
pub use sync_hash_map::{SyncHashMap, ValueGuard};
