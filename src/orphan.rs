//! Orphan Store: payloads waiting on a parent that is not yet known
//!
//! Payloads are held in arrival order so the oldest can be evicted when either the
//! count cap or the byte cap is exceeded. The same bound caps the `root_of` walk.
//! Every change is journaled and mirrored into the payload's storage namespace by
//! [`OrphanStore::stage`], so the set survives a restart (arrival order does not).

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::Result;
use crate::hash_graph::HashGraph;
use crate::serialize::{block_size, hash_to_hex};
use crate::storage::{hash_from_key, KeyValueStore, Namespace, StoreTransaction};
use crate::types::*;

/// A payload that can wait in an [`OrphanStore`]
pub trait OrphanPayload: Clone + Serialize + DeserializeOwned {
    const NAMESPACE: Namespace;
    const KIND: &'static str;

    fn orphan_hash(&self) -> Hash;

    /// Every hash this payload depends on
    fn parent_hashes(&self) -> Vec<Hash>;

    fn payload_size(&self) -> usize;
}

impl OrphanPayload for Block {
    const NAMESPACE: Namespace = Namespace::OrphanBlocks;
    const KIND: &'static str = "block";

    fn orphan_hash(&self) -> Hash {
        self.hash()
    }

    fn parent_hashes(&self) -> Vec<Hash> {
        vec![self.header.prev_block_hash]
    }

    fn payload_size(&self) -> usize {
        block_size(self)
    }
}

impl OrphanPayload for Transaction {
    const NAMESPACE: Namespace = Namespace::OrphanTransactions;
    const KIND: &'static str = "transaction";

    fn orphan_hash(&self) -> Hash {
        self.hash()
    }

    fn parent_hashes(&self) -> Vec<Hash> {
        self.source_hashes()
    }

    fn payload_size(&self) -> usize {
        self.size()
    }
}

#[derive(Debug, Clone)]
pub struct OrphanStore<T: OrphanPayload> {
    payloads: IndexMap<Hash, T>,
    graph: HashGraph,
    total_bytes: usize,
    max_count: usize,
    max_bytes: usize,
    journal: Vec<(Hash, Option<T>)>,
}

impl<T: OrphanPayload> OrphanStore<T> {
    pub fn new(max_count: usize, max_bytes: usize) -> Self {
        Self {
            payloads: IndexMap::new(),
            graph: HashGraph::new(),
            total_bytes: 0,
            max_count,
            max_bytes,
            journal: Vec::new(),
        }
    }

    /// Rebuild payloads and graph from the mirrored namespace
    pub fn load(store: &dyn KeyValueStore, max_count: usize, max_bytes: usize) -> Result<Self> {
        let mut orphans = Self::new(max_count, max_bytes);
        for (key, value) in store.scan(T::NAMESPACE)? {
            let hash = hash_from_key(&key)?;
            let payload: T = serde_json::from_slice(&value)?;
            orphans.insert(hash, payload);
        }
        // Entries over a (possibly lowered) cap are evicted and the deletes journaled
        orphans.enforce_limits();
        debug!(kind = T::KIND, count = orphans.len(), "loaded orphans");
        Ok(orphans)
    }

    /// Store `payload` under `hash` and link it to its parents.
    ///
    /// Re-putting a hash overwrites the payload and leaves one edge per parent.
    /// Returns the hashes evicted to stay within the caps, which may include `hash`
    /// itself when the payload alone exceeds the byte cap.
    pub fn put(&mut self, hash: Hash, payload: T) -> Vec<Hash> {
        self.journal.push((hash, Some(payload.clone())));
        self.insert(hash, payload);
        self.enforce_limits()
    }

    fn insert(&mut self, hash: Hash, payload: T) {
        for parent in payload.parent_hashes() {
            self.graph.add_edge(parent, hash);
        }
        self.total_bytes += payload.payload_size();
        if let Some(previous) = self.payloads.insert(hash, payload) {
            self.total_bytes -= previous.payload_size();
        }
    }

    fn enforce_limits(&mut self) -> Vec<Hash> {
        let mut evicted = Vec::new();
        while self.payloads.len() > self.max_count || self.total_bytes > self.max_bytes {
            let oldest = match self.payloads.keys().next() {
                Some(hash) => *hash,
                None => break,
            };
            warn!(kind = T::KIND, hash = %hash_to_hex(&oldest), "evicting oldest orphan");
            self.discard(&oldest);
            evicted.push(oldest);
        }
        evicted
    }

    pub fn has(&self, hash: &Hash) -> bool {
        self.payloads.contains_key(hash)
    }

    pub fn get(&self, hash: &Hash) -> Option<&T> {
        self.payloads.get(hash)
    }

    /// Hashes currently waiting on `parent`
    pub fn children_of(&self, parent: &Hash) -> Vec<Hash> {
        self.graph.children(parent)
    }

    /// Delete the payload only; graph edges stay until removed explicitly
    pub fn remove(&mut self, hash: &Hash) -> Option<T> {
        let payload = self.payloads.shift_remove(hash)?;
        self.total_bytes -= payload.payload_size();
        self.journal.push((*hash, None));
        Some(payload)
    }

    pub fn remove_child_edges(&mut self, parent: &Hash) {
        self.graph.remove_edges_from(parent);
    }

    /// Delete the payload together with every edge linking it to its parents
    pub fn discard(&mut self, hash: &Hash) -> Option<T> {
        self.graph.remove_edges_to(hash);
        self.remove(hash)
    }

    /// Discard `hash` and every orphan descending from it
    pub fn prune(&mut self, hash: &Hash) -> Vec<Hash> {
        let mut pruned = Vec::new();
        let mut queue = vec![*hash];
        while let Some(current) = queue.pop() {
            for child in self.graph.remove_edges_from(&current) {
                if self.has(&child) {
                    queue.push(child);
                }
            }
            if self.discard(&current).is_some() {
                pruned.push(current);
            }
        }
        pruned
    }

    /// RootOf: the first ancestor of `hash` whose own parent is not an orphan.
    ///
    /// Walks at most as many steps as there are orphans held, so it terminates even
    /// on a malformed graph.
    pub fn root_of(&self, hash: &Hash) -> Hash {
        let mut current = *hash;
        for _ in 0..self.payloads.len() {
            let payload = match self.payloads.get(&current) {
                Some(payload) => payload,
                None => break,
            };
            match payload.parent_hashes().into_iter().find(|parent| self.has(parent)) {
                Some(parent) => current = parent,
                None => break,
            }
        }
        current
    }

    /// Discard every orphan `indexed` reports as already known outside the store
    pub fn discard_indexed(&mut self, mut indexed: impl FnMut(&Hash) -> Result<bool>) -> Result<Vec<Hash>> {
        let hashes: Vec<Hash> = self.payloads.keys().copied().collect();
        let mut discarded = Vec::new();
        for hash in hashes {
            if indexed(&hash)? {
                warn!(kind = T::KIND, hash = %hash_to_hex(&hash), "dropping orphan that is already indexed");
                self.discard(&hash);
                discarded.push(hash);
            }
        }
        Ok(discarded)
    }

    pub fn len(&self) -> usize {
        self.payloads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payloads.is_empty()
    }

    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }

    /// Stage the journaled changes into `txn` and clear the journal
    pub fn stage(&mut self, txn: &mut StoreTransaction<'_>) -> Result<()> {
        for (hash, payload) in self.journal.drain(..) {
            match payload {
                Some(payload) => txn.put(T::NAMESPACE, &hash, &payload)?,
                None => txn.delete(T::NAMESPACE, &hash),
            }
        }
        Ok(())
    }
}
