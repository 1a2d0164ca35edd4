//! HashGraph Index: parent/child adjacency between hashes
//!
//! A pure index with no payloads, shared by the block and transaction orphan stores.
//! Edges point from a parent hash to the children waiting on it; the reverse map lets a
//! child be unlinked from every parent it waits on. Callers must never add an edge
//! whose child is an ancestor of the parent.

use std::collections::HashMap;

use indexmap::IndexSet;

use crate::types::Hash;

#[derive(Debug, Clone, Default)]
pub struct HashGraph {
    children: HashMap<Hash, IndexSet<Hash>>,
    parents: HashMap<Hash, IndexSet<Hash>>,
}

impl HashGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record that `child` waits on `parent`; adding an existing edge is a no-op
    pub fn add_edge(&mut self, parent: Hash, child: Hash) {
        self.children.entry(parent).or_default().insert(child);
        self.parents.entry(child).or_default().insert(parent);
    }

    /// Children of `parent`, in edge insertion order
    pub fn children(&self, parent: &Hash) -> Vec<Hash> {
        self.children
            .get(parent)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn parents(&self, child: &Hash) -> Vec<Hash> {
        self.parents
            .get(child)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_children(&self, parent: &Hash) -> bool {
        self.children.get(parent).map_or(false, |set| !set.is_empty())
    }

    /// Drop every edge leaving `parent`, returning the children that were linked
    pub fn remove_edges_from(&mut self, parent: &Hash) -> Vec<Hash> {
        let children = match self.children.remove(parent) {
            Some(children) => children,
            None => return Vec::new(),
        };
        for child in &children {
            if let Some(parents) = self.parents.get_mut(child) {
                parents.shift_remove(parent);
                if parents.is_empty() {
                    self.parents.remove(child);
                }
            }
        }
        children.into_iter().collect()
    }

    /// Drop every edge arriving at `child`
    pub fn remove_edges_to(&mut self, child: &Hash) {
        let parents = match self.parents.remove(child) {
            Some(parents) => parents,
            None => return,
        };
        for parent in &parents {
            if let Some(children) = self.children.get_mut(parent) {
                children.shift_remove(child);
                if children.is_empty() {
                    self.children.remove(parent);
                }
            }
        }
    }

    pub fn edge_count(&self) -> usize {
        self.children.values().map(IndexSet::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }
}
