//! SyncHashMap: the public, lock-serialized layer over [`ChainTable`].
//!
//! One table-wide mutex serializes every structural operation. All methods
//! take `&self`, block until the lock is acquired, run to completion, and
//! release; there is no timeout or cancellation. The map is `Send + Sync`
//! and is shared between threads behind an `Arc`.
//!
//! Aliasing contract for lookups: [`SyncHashMap::get`] returns a
//! [`ValueGuard`] that keeps the lock held for as long as the borrowed
//! value is in use, so the reference can never outlive the entry it aliases.
//! [`SyncHashMap::get_cloned`] instead copies the value out and releases
//! the lock before returning, accepting that the copy may be stale by the
//! time it is read.

use crate::chain_table::{ChainTable, TableError};
use crate::dispose::{Disposer, DropDisposer};
use core::borrow::Borrow;
use core::fmt;
use core::hash::{BuildHasher, Hash};
use core::ops::Deref;
use parking_lot::{Mutex, MutexGuard};
use slotmap::DefaultKey;
use std::collections::hash_map::RandomState;

/// A thread-safe chained hash map with caller-controlled entry disposal.
///
/// The disposer runs on replacement, removal, and drop, always while the
/// table lock is held; it must not call back into the same map (the
/// non-reentrant lock would deadlock, and debug builds panic instead).
pub struct SyncHashMap<K, V, S = RandomState, D = DropDisposer>
where
    D: Disposer<K, V>,
{
    inner: Mutex<ChainTable<K, V, S, D>>,
}

impl<K, V> SyncHashMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ChainTable::new()),
        }
    }
}

impl<K, V> Default for SyncHashMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SyncHashMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self {
            inner: Mutex::new(ChainTable::with_hasher(hasher)),
        }
    }

    pub fn with_capacity(capacity: usize, hasher: S) -> Result<Self, TableError> {
        Ok(Self {
            inner: Mutex::new(ChainTable::with_capacity(capacity, hasher)?),
        })
    }
}

impl<K, V, S, D> SyncHashMap<K, V, S, D>
where
    K: Eq + Hash,
    S: BuildHasher,
    D: Disposer<K, V>,
{
    /// Full constructor: starting capacity, hash behavior, and disposal
    /// behavior.
    pub fn with_parts(capacity: usize, hasher: S, disposer: D) -> Result<Self, TableError> {
        Ok(Self {
            inner: Mutex::new(ChainTable::with_parts(capacity, hasher, disposer)?),
        })
    }

    /// Insert `key -> value`, transferring ownership of both into the map.
    /// Replaces (and disposes) the payload of an existing equal key. May
    /// grow the table; a growth allocation failure is returned while the
    /// insert itself has already taken effect.
    pub fn put(&self, key: K, value: V) -> Result<(), TableError> {
        self.inner.lock().put(key, value)
    }

    /// Remove the entry for `q`, disposing its payload. Returns whether an
    /// entry was removed.
    pub fn remove<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().remove(q)
    }

    /// Borrow the value stored for `q`. The returned guard holds the table
    /// lock until dropped; all other operations block meanwhile.
    pub fn get<'a, Q>(&'a self, q: &Q) -> Option<ValueGuard<'a, K, V, S, D>>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let table = self.inner.lock();
        let node = table.find_node(q)?;
        Some(ValueGuard { table, node })
    }

    /// Copy the value stored for `q` out of the map, releasing the lock
    /// before returning.
    pub fn get_cloned<Q>(&self, q: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
        V: Clone,
    {
        self.inner.lock().get(q).cloned()
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.inner.lock().contains_key(q)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.lock().capacity()
    }

    /// Explicitly double the slot array, rehashing every entry. Normally
    /// growth happens automatically when `put` crosses the load factor.
    pub fn grow(&self) -> Result<(), TableError> {
        self.inner.lock().grow()
    }
}

/// Lock-holding borrow of one value in a [`SyncHashMap`].
///
/// Holds the table lock for its whole lifetime, which statically prevents
/// the borrowed value from being observed across a mutation. Drop it
/// promptly; every other map operation blocks while it lives.
pub struct ValueGuard<'a, K, V, S, D>
where
    D: Disposer<K, V>,
{
    table: MutexGuard<'a, ChainTable<K, V, S, D>>,
    node: DefaultKey,
}

impl<K, V, S, D> Deref for ValueGuard<'_, K, V, S, D>
where
    K: Eq + Hash,
    S: BuildHasher,
    D: Disposer<K, V>,
{
    type Target = V;

    fn deref(&self) -> &V {
        // The node was located under this same lock acquisition and cannot
        // have been removed while the guard exists.
        self.table.node_value(self.node).unwrap()
    }
}

impl<K, V, S, D> fmt::Debug for ValueGuard<'_, K, V, S, D>
where
    K: Eq + Hash,
    S: BuildHasher,
    V: fmt::Debug,
    D: Disposer<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}
