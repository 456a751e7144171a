//! ChainTable: the unsynchronized slot-array-and-chains core.
//!
//! Storage layout: chain nodes live in a `SlotMap` arena and link to each
//! other through stable generational keys, so each slot's collision chain
//! is a doubly-linked list that can never dangle. The slot array holds one
//! optional chain head per slot; a key's slot is `hash % capacity`.
//!
//! Each node caches its key's 64-bit hash and indexing always uses the
//! cached hash, so a resize recomputes slots without calling back into
//! user code. Payloads are relocated during a resize, never disposed.

use crate::dispose::{Disposer, DropDisposer};
use crate::reentrancy::DebugReentrancy;
use core::borrow::Borrow;
use core::hash::{BuildHasher, Hash};
use log::trace;
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;
use std::collections::TryReserveError;
use thiserror::Error;

/// Slot count of a table created without an explicit capacity.
pub const STARTING_CAPACITY: usize = 32;

/// Grow when `len / capacity` exceeds this after an insert.
const MAX_LOAD_FACTOR: f64 = 0.75;

/// Errors surfaced by construction and slot-array growth. Key absence is
/// never an error; lookups report it through `Option` and removals through
/// their return value.
#[derive(Debug, Error)]
pub enum TableError {
    /// A constructor argument was unusable (e.g. a zero starting capacity).
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),
    /// The slot array could not be grown. The table is untouched and stays
    /// valid at its previous capacity.
    #[error("allocation failure while growing the slot array")]
    AllocationFailure(#[from] TryReserveError),
}

#[derive(Debug)]
struct Node<K, V> {
    key: K,
    value: V,
    hash: u64,
    /// Index of the slot whose chain currently contains this node.
    slot: usize,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

/// The chained hash table core. Not synchronized; [`crate::SyncHashMap`]
/// wraps it in a mutex for concurrent use.
///
/// Invariants maintained across all operations:
/// - `slots[node.slot]`'s chain contains the node;
/// - chain links are symmetric and both chain ends link to `None`;
/// - `len` equals the total node count across all chains;
/// - no two nodes in the table have keys equal under `K: Eq`;
/// - `capacity()` is positive and equal to the slot array length.
pub struct ChainTable<K, V, S = RandomState, D = DropDisposer>
where
    D: Disposer<K, V>,
{
    hasher: S,
    disposer: D,
    /// Chain heads, one per slot.
    slots: Vec<Option<DefaultKey>>,
    nodes: SlotMap<DefaultKey, Node<K, V>>,
    len: usize,
    reentrancy: DebugReentrancy,
}

impl<K, V> ChainTable<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_hasher(Default::default())
    }
}

impl<K, V> Default for ChainTable<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> ChainTable<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    pub fn with_hasher(hasher: S) -> Self {
        Self::build(STARTING_CAPACITY, hasher, DropDisposer)
    }

    pub fn with_capacity(capacity: usize, hasher: S) -> Result<Self, TableError> {
        Self::with_parts(capacity, hasher, DropDisposer)
    }
}

impl<K, V, S, D> ChainTable<K, V, S, D>
where
    K: Eq + Hash,
    S: BuildHasher,
    D: Disposer<K, V>,
{
    /// Full constructor: starting capacity, hash behavior, and disposal
    /// behavior. Fails with [`TableError::InvalidArgument`] on a zero
    /// capacity.
    pub fn with_parts(capacity: usize, hasher: S, disposer: D) -> Result<Self, TableError> {
        if capacity == 0 {
            return Err(TableError::InvalidArgument("capacity must be positive"));
        }
        Ok(Self::build(capacity, hasher, disposer))
    }

    fn build(capacity: usize, hasher: S, disposer: D) -> Self {
        Self {
            hasher,
            disposer,
            slots: vec![None; capacity],
            nodes: SlotMap::with_key(),
            len: 0,
            reentrancy: DebugReentrancy::new(),
        }
    }

    fn make_hash<Q>(&self, q: &Q) -> u64
    where
        Q: ?Sized + Hash,
    {
        self.hasher.hash_one(q)
    }

    fn slot_of(&self, hash: u64) -> usize {
        (hash % self.slots.len() as u64) as usize
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current slot count. Grows only by doubling.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Walk the chain for `hash` and return the first node whose key
    /// satisfies `matches`.
    fn find_hashed(&self, hash: u64, matches: impl Fn(&K) -> bool) -> Option<DefaultKey> {
        let mut cursor = self.slots[self.slot_of(hash)];
        while let Some(k) = cursor {
            let node = &self.nodes[k];
            if matches(&node.key) {
                return Some(k);
            }
            cursor = node.next;
        }
        None
    }

    pub(crate) fn find_node<Q>(&self, q: &Q) -> Option<DefaultKey>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        self.find_hashed(self.make_hash(q), |k| k.borrow() == q)
    }

    pub(crate) fn node_value(&self, key: DefaultKey) -> Option<&V> {
        self.nodes.get(key).map(|n| &n.value)
    }

    /// Borrow the value stored for `q`, if present. The reference aliases
    /// the table's own storage and is invalidated by any mutation.
    pub fn get<Q>(&self, q: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.find_node(q).map(|k| &self.nodes[k].value)
    }

    pub fn contains_key<Q>(&self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let _g = self.reentrancy.enter();
        self.find_node(q).is_some()
    }

    /// Insert `key -> value`, taking ownership of both.
    ///
    /// If a node with an equal key already exists, its payload is handed to
    /// the disposer first and the node is spliced out; the new entry is
    /// only linked afterwards, so the old resources are released exactly
    /// once before the replacement becomes visible. The caller's key is
    /// always the one stored, even when a logically-equal key was present.
    ///
    /// Growth is triggered when the load factor exceeds 0.75 after the
    /// insert. A growth allocation failure is returned to the caller; the
    /// insert itself has already completed and the table stays valid.
    pub fn put(&mut self, key: K, value: V) -> Result<(), TableError> {
        // The guard brackets the regions that run caller code: the hashed
        // probe (Hash, Eq) and the disposal of a displaced payload.
        let (hash, existing) = {
            let _g = self.reentrancy.enter();
            let hash = self.make_hash(&key);
            (hash, self.find_hashed(hash, |k| *k == key))
        };

        if let Some(existing) = existing {
            let old = self.unlink(existing);
            let _g = self.reentrancy.enter();
            self.disposer.dispose_key(old.key);
            self.disposer.dispose_value(old.value);
        }

        self.append(key, value, hash);

        if self.len as f64 / self.slots.len() as f64 > MAX_LOAD_FACTOR {
            self.grow()?;
        }
        Ok(())
    }

    /// Remove the entry for `q`, disposing its payload. Returns whether an
    /// entry was removed; removal of an absent key is a no-op.
    pub fn remove<Q>(&mut self, q: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: ?Sized + Hash + Eq,
    {
        let found = {
            let _g = self.reentrancy.enter();
            self.find_node(q)
        };
        match found {
            Some(found) => {
                let node = self.unlink(found);
                let _g = self.reentrancy.enter();
                self.disposer.dispose_key(node.key);
                self.disposer.dispose_value(node.value);
                true
            }
            None => false,
        }
    }

    /// Append a fresh node at the tail of its slot's chain.
    fn append(&mut self, key: K, value: V, hash: u64) {
        let slot = self.slot_of(hash);
        let node = self.nodes.insert(Node {
            key,
            value,
            hash,
            slot,
            prev: None,
            next: None,
        });
        match self.slots[slot] {
            None => self.slots[slot] = Some(node),
            Some(head) => {
                let mut tail = head;
                while let Some(n) = self.nodes[tail].next {
                    tail = n;
                }
                self.nodes[tail].next = Some(node);
                self.nodes[node].prev = Some(tail);
            }
        }
        self.len += 1;
    }

    /// Splice a node out of its chain and return it. Removing the node
    /// from the chain and freeing its shell are one event; the payload is
    /// returned to the caller, who decides whether to dispose it.
    fn unlink(&mut self, key: DefaultKey) -> Node<K, V> {
        let node = self.nodes.remove(key).unwrap();
        match (node.prev, node.next) {
            // Sole node in its chain: the slot becomes empty.
            (None, None) => self.slots[node.slot] = None,
            // Chain head with a successor: the slot points at the
            // successor, whose back-link is cleared.
            (None, Some(next)) => {
                self.slots[node.slot] = Some(next);
                self.nodes[next].prev = None;
            }
            // Tail: the predecessor becomes the new chain end.
            (Some(prev), None) => self.nodes[prev].next = None,
            // Interior: predecessor and successor are linked directly.
            (Some(prev), Some(next)) => {
                self.nodes[prev].next = Some(next);
                self.nodes[next].prev = Some(prev);
            }
        }
        self.len -= 1;
        node
    }

    /// Double the slot array and relink every node into its recomputed
    /// slot. Runs automatically when `put` crosses the load factor, or
    /// explicitly on demand. It never calls into user code: indexing uses
    /// each node's cached hash.
    ///
    /// All-or-nothing: the only fallible steps are the two allocations at
    /// the top, taken before any live state is touched; on failure the
    /// table is left exactly as it was.
    pub fn grow(&mut self) -> Result<(), TableError> {
        let old_capacity = self.slots.len();
        let new_capacity = old_capacity * 2;

        let mut new_slots: Vec<Option<DefaultKey>> = Vec::new();
        new_slots.try_reserve_exact(new_capacity)?;
        new_slots.resize(new_capacity, None);
        let mut tails: Vec<Option<DefaultKey>> = Vec::new();
        tails.try_reserve_exact(new_capacity)?;
        tails.resize(new_capacity, None);

        trace!(
            "growing slot array {} -> {} ({} entries)",
            old_capacity,
            new_capacity,
            self.len
        );

        let old_slots = std::mem::replace(&mut self.slots, new_slots);
        for head in old_slots {
            let mut cursor = head;
            while let Some(k) = cursor {
                let next = self.nodes[k].next;
                // The modulus changed with the capacity, so the slot must
                // be recomputed from the cached hash, not carried over.
                let slot = self.slot_of(self.nodes[k].hash);
                {
                    let node = &mut self.nodes[k];
                    node.slot = slot;
                    node.prev = tails[slot];
                    node.next = None;
                }
                match tails[slot] {
                    Some(tail) => self.nodes[tail].next = Some(k),
                    None => self.slots[slot] = Some(k),
                }
                tails[slot] = Some(k);
                cursor = next;
            }
        }
        Ok(())
    }
}

impl<K, V, S, D> Drop for ChainTable<K, V, S, D>
where
    D: Disposer<K, V>,
{
    /// Teardown disposes every live entry's key and value exactly once.
    /// The arena and slot array are freed by their own drops afterwards.
    fn drop(&mut self) {
        let _g = self.reentrancy.enter();
        for (_k, node) in self.nodes.drain() {
            self.disposer.dispose_key(node.key);
            self.disposer.dispose_value(node.value);
        }
    }
}
