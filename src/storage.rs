//! Storage collaborator: a namespaced key-value store with atomic batches
//!
//! The engine never mutates the store directly. Every logical operation stages its
//! writes in a [`StoreTransaction`] (which reads its own writes) and commits them as
//! one [`WriteBatch`]; a store must apply a batch entirely or not at all. Records are
//! JSON-encoded.

use std::collections::BTreeMap;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ChainError, Result};
use crate::types::*;

/// Key namespaces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// Full block payloads by block hash
    Blocks,
    /// [`BlockInfo`] by block hash
    BlockInfo,
    /// [`TransactionDescriptor`] by transaction hash
    Transactions,
    /// [`PoolEntry`] by transaction hash
    Pool,
    OrphanBlocks,
    OrphanTransactions,
    /// Engine-wide singletons (best tip, halted marker)
    Meta,
}

pub const BEST_TIP_KEY: &[u8] = b"best_tip";
pub const HALTED_KEY: &[u8] = b"halted";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { namespace: Namespace, key: Vec<u8>, value: Vec<u8> },
    Delete { namespace: Namespace, key: Vec<u8> },
}

/// An ordered set of writes applied atomically
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, namespace: Namespace, key: Vec<u8>, value: Vec<u8>) {
        self.ops.push(BatchOp::Put { namespace, key, value });
    }

    pub fn delete(&mut self, namespace: Namespace, key: Vec<u8>) {
        self.ops.push(BatchOp::Delete { namespace, key });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    pub fn into_ops(self) -> Vec<BatchOp> {
        self.ops
    }
}

/// Persistent key-value storage consumed by the engine
pub trait KeyValueStore: Send + Sync {
    fn get(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Apply every operation of `batch` or none of them
    fn write(&self, batch: WriteBatch) -> Result<()>;

    /// All entries of a namespace, in key order
    fn scan(&self, namespace: Namespace) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
}

/// In-memory store; a batch is applied under a single write lock
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<BTreeMap<(Namespace, Vec<u8>), Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the whole store, for before/after comparisons
    pub fn snapshot(&self) -> BTreeMap<(Namespace, Vec<u8>), Vec<u8>> {
        self.data.read().clone()
    }

    /// Copy of one namespace
    pub fn snapshot_namespace(&self, namespace: Namespace) -> BTreeMap<Vec<u8>, Vec<u8>> {
        self.data
            .read()
            .iter()
            .filter(|((ns, _), _)| *ns == namespace)
            .map(|((_, key), value)| (key.clone(), value.clone()))
            .collect()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.read().get(&(namespace, key.to_vec())).cloned())
    }

    fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut data = self.data.write();
        for op in batch.into_ops() {
            match op {
                BatchOp::Put { namespace, key, value } => {
                    data.insert((namespace, key), value);
                }
                BatchOp::Delete { namespace, key } => {
                    data.remove(&(namespace, key));
                }
            }
        }
        Ok(())
    }

    fn scan(&self, namespace: Namespace) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        Ok(self
            .data
            .read()
            .range((namespace, Vec::new())..)
            .take_while(|((ns, _), _)| *ns == namespace)
            .map(|((_, key), value)| (key.clone(), value.clone()))
            .collect())
    }
}

pub fn hash_from_key(key: &[u8]) -> Result<Hash> {
    key.try_into()
        .map_err(|_| ChainError::Storage(format!("malformed hash key of {} bytes", key.len())))
}

/// Typed reads shared by committed views and in-flight transactions
pub trait ChainRead {
    fn get_raw(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>>;

    fn fetch<T: DeserializeOwned>(&self, namespace: Namespace, key: &[u8]) -> Result<Option<T>> {
        match self.get_raw(namespace, key)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    fn block(&self, hash: &Hash) -> Result<Option<Block>> {
        self.fetch(Namespace::Blocks, hash)
    }

    fn block_info(&self, hash: &Hash) -> Result<Option<BlockInfo>> {
        self.fetch(Namespace::BlockInfo, hash)
    }

    fn descriptor(&self, hash: &Hash) -> Result<Option<TransactionDescriptor>> {
        self.fetch(Namespace::Transactions, hash)
    }

    fn pool_entry(&self, hash: &Hash) -> Result<Option<PoolEntry>> {
        self.fetch(Namespace::Pool, hash)
    }

    fn best_tip(&self) -> Result<Option<Hash>> {
        self.fetch(Namespace::Meta, BEST_TIP_KEY)
    }

    fn is_halted(&self) -> Result<bool> {
        Ok(self.fetch::<bool>(Namespace::Meta, HALTED_KEY)?.unwrap_or(false))
    }

    fn require_block(&self, hash: &Hash) -> Result<Block> {
        self.block(hash)?
            .ok_or(ChainError::MissingRecord { kind: "block", hash: *hash })
    }

    fn require_block_info(&self, hash: &Hash) -> Result<BlockInfo> {
        self.block_info(hash)?
            .ok_or(ChainError::MissingRecord { kind: "block info", hash: *hash })
    }

    /// Resolve a confirmed transaction through its descriptor's locator
    fn confirmed_transaction(&self, hash: &Hash) -> Result<Option<Transaction>> {
        let descriptor = match self.descriptor(hash)? {
            Some(descriptor) => descriptor,
            None => return Ok(None),
        };
        let block = self.require_block(&descriptor.locator.block_hash)?;
        block
            .transactions
            .into_iter()
            .nth(descriptor.locator.index as usize)
            .map(Some)
            .ok_or(ChainError::MissingRecord { kind: "located transaction", hash: *hash })
    }

    /// Confirmed or pooled transaction payload
    fn transaction(&self, hash: &Hash) -> Result<Option<Transaction>> {
        if let Some(tx) = self.confirmed_transaction(hash)? {
            return Ok(Some(tx));
        }
        Ok(self.pool_entry(hash)?.map(|entry| entry.transaction))
    }
}

/// Read-only view of committed state
#[derive(Clone, Copy)]
pub struct StoreView<'a>(pub &'a dyn KeyValueStore);

impl ChainRead for StoreView<'_> {
    fn get_raw(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.0.get(namespace, key)
    }
}

impl StoreView<'_> {
    pub fn pool_entries(&self) -> Result<Vec<(Hash, PoolEntry)>> {
        self.0
            .scan(Namespace::Pool)?
            .into_iter()
            .map(|(key, value)| Ok((hash_from_key(&key)?, serde_json::from_slice(&value)?)))
            .collect()
    }
}

/// Staged writes over a store, visible to this transaction's own reads
///
/// Nothing reaches the store until [`commit`](StoreTransaction::commit); dropping the
/// transaction discards every staged write.
pub struct StoreTransaction<'a> {
    store: &'a dyn KeyValueStore,
    staged: BTreeMap<(Namespace, Vec<u8>), Option<Vec<u8>>>,
}

impl<'a> StoreTransaction<'a> {
    pub fn new(store: &'a dyn KeyValueStore) -> Self {
        Self { store, staged: BTreeMap::new() }
    }

    pub fn put<T: Serialize>(&mut self, namespace: Namespace, key: &[u8], value: &T) -> Result<()> {
        let bytes = serde_json::to_vec(value)?;
        self.staged.insert((namespace, key.to_vec()), Some(bytes));
        Ok(())
    }

    pub fn delete(&mut self, namespace: Namespace, key: &[u8]) {
        self.staged.insert((namespace, key.to_vec()), None);
    }

    pub fn put_block(&mut self, hash: &Hash, block: &Block) -> Result<()> {
        self.put(Namespace::Blocks, hash, block)
    }

    pub fn put_block_info(&mut self, hash: &Hash, info: &BlockInfo) -> Result<()> {
        self.put(Namespace::BlockInfo, hash, info)
    }

    pub fn put_descriptor(&mut self, hash: &Hash, descriptor: &TransactionDescriptor) -> Result<()> {
        self.put(Namespace::Transactions, hash, descriptor)
    }

    pub fn delete_descriptor(&mut self, hash: &Hash) {
        self.delete(Namespace::Transactions, hash)
    }

    pub fn put_pool_entry(&mut self, hash: &Hash, entry: &PoolEntry) -> Result<()> {
        self.put(Namespace::Pool, hash, entry)
    }

    pub fn delete_pool_entry(&mut self, hash: &Hash) {
        self.delete(Namespace::Pool, hash)
    }

    pub fn set_best_tip(&mut self, hash: &Hash) -> Result<()> {
        self.put(Namespace::Meta, BEST_TIP_KEY, hash)
    }

    pub fn set_halted(&mut self, halted: bool) -> Result<()> {
        if halted {
            self.put(Namespace::Meta, HALTED_KEY, &true)
        } else {
            self.delete(Namespace::Meta, HALTED_KEY);
            Ok(())
        }
    }

    pub fn is_empty(&self) -> bool {
        self.staged.is_empty()
    }

    /// Hand every staged write to the store as one atomic batch
    pub fn commit(self) -> Result<()> {
        if self.staged.is_empty() {
            return Ok(());
        }
        let mut batch = WriteBatch::new();
        for ((namespace, key), value) in self.staged {
            match value {
                Some(value) => batch.put(namespace, key, value),
                None => batch.delete(namespace, key),
            }
        }
        self.store.write(batch)
    }
}

impl ChainRead for StoreTransaction<'_> {
    fn get_raw(&self, namespace: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        match self.staged.get(&(namespace, key.to_vec())) {
            Some(staged) => Ok(staged.clone()),
            None => self.store.get(namespace, key),
        }
    }
}
