//! Block and transaction processors over a shared chain state
//!
//! [`ChainState`] owns the only write path into the chain: every mutation runs under
//! one exclusive lock, and reads take the shared side of the same lock so they never
//! observe a reorganization half way. A fatal error during a mutation halts the state
//! (persisted in storage) until an operator clears it.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use indexmap::IndexSet;
use parking_lot::{RwLock, RwLockWriteGuard};
use tracing::{debug, error, info, warn};

use crate::config::ChainConfig;
use crate::constants::ZERO_HASH;
use crate::error::{ChainError, Result};
use crate::events::{ChainEvent, ChainListener};
use crate::magnet::{Magnet, Placement};
use crate::merkle::block_merkle_root;
use crate::mempool::PriorityQueue;
use crate::orphan::OrphanStore;
use crate::pow::check_proof_of_work;
use crate::reorganization;
use crate::serialize::hash_to_hex;
use crate::storage::{ChainRead, KeyValueStore, StoreTransaction, StoreView};
use crate::types::*;
use crate::validation::Validator;

/// Collaborators handed to the engine at construction
#[derive(Clone)]
pub struct ChainContext {
    pub store: Arc<dyn KeyValueStore>,
    pub validator: Arc<dyn Validator>,
    pub config: ChainConfig,
}

impl ChainContext {
    pub fn new(store: Arc<dyn KeyValueStore>, validator: Arc<dyn Validator>, config: ChainConfig) -> Self {
        Self { store, validator, config }
    }
}

/// In-memory state guarded by the chain lock
pub struct ChainInner {
    block_orphans: OrphanStore<Block>,
    tx_orphans: OrphanStore<Transaction>,
    /// Pool hashes in admission order
    pool_order: IndexSet<Hash>,
    next_sequence: Natural,
    halted: bool,
}

pub struct ChainState {
    context: ChainContext,
    inner: RwLock<ChainInner>,
    listeners: RwLock<Vec<Arc<dyn ChainListener>>>,
}

impl ChainState {
    /// Rebuild in-memory state (orphans, pool order, halted flag) from storage
    pub fn open(context: ChainContext) -> Result<Self> {
        let store = context.store.as_ref();
        let view = StoreView(store);
        let config = &context.config;

        let halted = view.is_halted()?;
        let mut block_orphans = OrphanStore::load(store, config.max_orphan_blocks, config.max_orphan_bytes)?;
        let mut tx_orphans = OrphanStore::load(store, config.max_orphan_transactions, config.max_orphan_bytes)?;

        // An attach commits before the orphan copy it promoted is deleted
        block_orphans.discard_indexed(|hash| Ok(view.block_info(hash)?.is_some()))?;
        tx_orphans.discard_indexed(|hash| Ok(view.descriptor(hash)?.is_some() || view.pool_entry(hash)?.is_some()))?;
        let mut txn = StoreTransaction::new(store);
        block_orphans.stage(&mut txn)?;
        tx_orphans.stage(&mut txn)?;
        txn.commit()?;

        let mut entries = view.pool_entries()?;
        entries.sort_by_key(|(_, entry)| (entry.admitted_at, entry.sequence));
        let next_sequence = entries.iter().map(|(_, entry)| entry.sequence + 1).max().unwrap_or(0);
        let pool_order: IndexSet<Hash> = entries.into_iter().map(|(hash, _)| hash).collect();

        if halted {
            warn!("opened chain state in halted mode");
        }
        info!(
            best_tip = ?view.best_tip()?.map(|tip| hash_to_hex(&tip)),
            pool = pool_order.len(),
            orphan_blocks = block_orphans.len(),
            orphan_transactions = tx_orphans.len(),
            "opened chain state"
        );

        Ok(Self {
            context,
            inner: RwLock::new(ChainInner { block_orphans, tx_orphans, pool_order, next_sequence, halted }),
            listeners: RwLock::new(Vec::new()),
        })
    }

    pub fn context(&self) -> &ChainContext {
        &self.context
    }

    pub fn subscribe(&self, listener: Arc<dyn ChainListener>) {
        self.listeners.write().push(listener);
    }

    /// Run `f` under the shared lock against committed storage
    pub fn read<T>(&self, f: impl FnOnce(&ChainInner, StoreView<'_>) -> Result<T>) -> Result<T> {
        let inner = self.inner.read();
        f(&inner, StoreView(self.context.store.as_ref()))
    }

    /// Run `f` under the exclusive lock, halting on a fatal error and notifying
    /// listeners once the lock is released
    fn mutate<T>(&self, f: impl FnOnce(&mut Mutation<'_>) -> Result<T>) -> Result<T> {
        let mut mutation = Mutation { state: self, inner: self.inner.write(), events: Vec::new() };
        if mutation.inner.halted {
            return Err(ChainError::Halted);
        }

        let result = f(&mut mutation).and_then(|value| mutation.flush_orphans().map(|()| value));
        if let Err(err) = &result {
            if err.is_fatal() {
                mutation.halt(err);
            }
        }

        let events = std::mem::take(&mut mutation.events);
        drop(mutation);
        self.notify(&events);
        result
    }

    fn notify(&self, events: &[ChainEvent]) {
        if events.is_empty() {
            return;
        }
        for listener in self.listeners.read().iter() {
            for event in events {
                listener.on_event(event);
            }
        }
    }

    pub fn is_halted(&self) -> bool {
        self.inner.read().halted
    }

    /// Operator action: resume mutations after a halt
    pub fn clear_halt(&self) -> Result<()> {
        let mut inner = self.inner.write();
        let mut txn = StoreTransaction::new(self.context.store.as_ref());
        txn.set_halted(false)?;
        txn.commit()?;
        inner.halted = false;
        info!("cleared halted chain state");
        Ok(())
    }

    pub fn best_tip(&self) -> Result<Option<Hash>> {
        self.read(|_, view| view.best_tip())
    }

    pub fn pool_transactions(&self) -> Result<Vec<Transaction>> {
        self.read(|inner, view| {
            let mut transactions = Vec::with_capacity(inner.pool_order.len());
            for hash in &inner.pool_order {
                if let Some(entry) = view.pool_entry(hash)? {
                    transactions.push(entry.transaction);
                }
            }
            Ok(transactions)
        })
    }

    /// Fee-ordered, dependency-respecting selection of up to `max` pool transactions
    pub fn block_template(&self, max: usize) -> Result<Vec<Transaction>> {
        self.read(|inner, view| {
            let mut queue = PriorityQueue::new();
            for hash in &inner.pool_order {
                if let Some(entry) = view.pool_entry(hash)? {
                    queue.enqueue(&view, entry.transaction)?;
                }
            }
            let mut template = Vec::new();
            while template.len() < max {
                match queue.dequeue() {
                    Some(tx) => template.push(tx),
                    None => break,
                }
            }
            Ok(template)
        })
    }
}

fn unix_now() -> Natural {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// Context-free checks run before a block is stored anywhere, orphan or not
fn check_block_payload(hash: &Hash, block: &Block, validator: &dyn Validator) -> Result<()> {
    let computed = block.hash();
    if computed != *hash {
        return Err(ChainError::HashMismatch { claimed: *hash, computed });
    }
    let found = block_merkle_root(block)?;
    if found != block.header.merkle_root {
        return Err(ChainError::BadMerkleRoot { expected: block.header.merkle_root, found });
    }
    if !check_proof_of_work(&block.header)? {
        return Err(ChainError::Validation(format!(
            "block {} does not meet its target {:#010x}",
            hash_to_hex(hash),
            block.header.bits
        )));
    }
    validator.validate_block(block)
}

/// One exclusive pass over the chain state
struct Mutation<'s> {
    state: &'s ChainState,
    inner: RwLockWriteGuard<'s, ChainInner>,
    events: Vec<ChainEvent>,
}

impl<'s> Mutation<'s> {
    fn store(&self) -> &'s dyn KeyValueStore {
        self.state.context.store.as_ref()
    }

    fn view(&self) -> StoreView<'s> {
        StoreView(self.store())
    }

    fn validator(&self) -> &'s dyn Validator {
        self.state.context.validator.as_ref()
    }

    fn magnet(&self) -> Magnet<'s> {
        Magnet::new(self.validator())
    }

    fn config(&self) -> &'s ChainConfig {
        &self.state.context.config
    }

    fn halt(&mut self, err: &ChainError) {
        error!(%err, "fatal chain error, halting chain mutation");
        self.inner.halted = true;
        let mut txn = StoreTransaction::new(self.store());
        if let Err(persist) = txn.set_halted(true).and_then(|()| txn.commit()) {
            error!(%persist, "failed to persist halted marker");
        }
        self.events.push(ChainEvent::Halted { reason: err.to_string() });
    }

    fn flush_orphans(&mut self) -> Result<()> {
        let mut txn = StoreTransaction::new(self.store());
        self.inner.block_orphans.stage(&mut txn)?;
        self.inner.tx_orphans.stage(&mut txn)?;
        txn.commit()
    }

    // ============================================================================
    // BLOCKS
    // ============================================================================

    fn block_known(&self, hash: &Hash) -> Result<bool> {
        Ok(self.inner.block_orphans.has(hash) || self.view().block_info(hash)?.is_some())
    }

    fn accept_block(&mut self, hash: Hash, block: Block) -> Result<Vec<Hash>> {
        if self.block_known(&hash)? {
            debug!(hash = %hash_to_hex(&hash), "block already known");
            return Ok(Vec::new());
        }
        check_block_payload(&hash, &block, self.validator())?;

        match self.connect_block(&hash, &block) {
            Ok(()) => {}
            Err(err) if err.is_orphan() => {
                self.park_block(hash, block);
                return Ok(Vec::new());
            }
            Err(err) => {
                warn!(hash = %hash_to_hex(&hash), %err, "rejected block");
                return Err(err);
            }
        }

        let mut accepted = vec![hash];
        accepted.extend(self.accept_block_children(&hash)?);
        Ok(accepted)
    }

    fn park_block(&mut self, hash: Hash, block: Block) -> Vec<Hash> {
        let evicted = self.inner.block_orphans.put(hash, block);
        debug!(
            hash = %hash_to_hex(&hash),
            root = %hash_to_hex(&self.inner.block_orphans.root_of(&hash)),
            "parked orphan block"
        );
        evicted
    }

    /// Index a block whose parent is known: extend the tip, or record a side branch
    /// and reorganize onto it when it carries strictly more work
    fn connect_block(&mut self, hash: &Hash, block: &Block) -> Result<()> {
        let view = self.view();
        let prev = block.header.prev_block_hash;
        let tip = view.best_tip()?;

        if prev == ZERO_HASH {
            if tip.is_some() {
                return Err(ChainError::UnexpectedGenesis(*hash));
            }
            return self.extend_tip(hash, block);
        }

        let parent = view
            .block_info(&prev)?
            .ok_or(ChainError::ParentBlockNotFound { block: *hash, parent: prev })?;
        if parent.status == BlockStatus::Invalid {
            return Err(ChainError::Validation(format!(
                "block {} extends invalid block {}",
                hash_to_hex(hash),
                hash_to_hex(&prev)
            )));
        }
        if tip == Some(prev) {
            return self.extend_tip(hash, block);
        }

        let tip = tip.ok_or(ChainError::MissingRecord { kind: "best tip", hash: prev })?;
        let tip_info = view.require_block_info(&tip)?;
        let mut txn = StoreTransaction::new(self.store());
        let info = self.magnet().store_side_block(&mut txn, hash, block)?;
        txn.commit()?;
        debug!(hash = %hash_to_hex(hash), height = info.height, "stored side-branch block");

        if info.chain_work > tip_info.chain_work {
            self.reorganize(&tip, hash)?;
        }
        Ok(())
    }

    fn extend_tip(&mut self, hash: &Hash, block: &Block) -> Result<()> {
        let mut txn = StoreTransaction::new(self.store());
        let attach = self.magnet().attach_block(&mut txn, hash, block)?;
        txn.commit()?;

        info!(hash = %hash_to_hex(hash), height = attach.info.height, work = %attach.info.chain_work, "new best tip");
        self.events.push(ChainEvent::BlockAttached { hash: *hash, height: attach.info.height });
        self.forget_pooled(&attach.promoted);
        self.report_evicted(&attach.evicted);
        self.settle_confirmed(block)
    }

    /// Drop orphan copies of newly confirmed transactions and promote their waiting children
    fn settle_confirmed(&mut self, block: &Block) -> Result<()> {
        let hashes = block.transaction_hashes();
        for hash in &hashes {
            self.inner.tx_orphans.discard(hash);
        }
        for hash in &hashes {
            self.accept_transaction_children(hash)?;
        }
        Ok(())
    }

    fn reorganize(&mut self, current_tip: &Hash, candidate_tip: &Hash) -> Result<()> {
        let magnet = self.magnet();
        let reorg = reorganization::reorganize(
            &magnet,
            self.store(),
            current_tip,
            candidate_tip,
            self.config().max_reorganization_depth,
        )?;

        let view = self.view();
        for hash in &reorg.detached {
            let height = view.require_block_info(hash)?.height;
            self.events.push(ChainEvent::BlockDetached { hash: *hash, height });
        }
        for hash in &reorg.attached {
            let height = view.require_block_info(hash)?.height;
            self.events.push(ChainEvent::BlockAttached { hash: *hash, height });
        }
        self.forget_pooled(&reorg.promoted);
        self.report_evicted(&reorg.evicted);

        let mut displaced = Vec::new();
        for (hash, _) in &reorg.readmit {
            if self.inner.pool_order.shift_remove(hash) {
                displaced.push(*hash);
            }
        }
        for (hash, tx) in reorg.readmit {
            match self.accept_transaction(hash, tx) {
                Ok(_) => {}
                Err(err) if err.is_fatal() => return Err(err),
                Err(err) => {
                    debug!(hash = %hash_to_hex(&hash), %err, "dropped transaction after reorganization");
                    if displaced.contains(&hash) {
                        self.events.push(ChainEvent::TransactionEvicted { hash });
                    }
                }
            }
        }

        for hash in &reorg.attached {
            let block = view.require_block(hash)?;
            self.settle_confirmed(&block)?;
        }
        Ok(())
    }

    fn accept_block_children(&mut self, hash: &Hash) -> Result<Vec<Hash>> {
        let mut accepted = Vec::new();
        let mut queue = VecDeque::from([*hash]);
        while let Some(parent) = queue.pop_front() {
            for child in self.inner.block_orphans.children_of(&parent) {
                let block = match self.inner.block_orphans.get(&child) {
                    Some(block) => block.clone(),
                    None => continue,
                };
                let connected = check_block_payload(&child, &block, self.validator())
                    .and_then(|()| self.connect_block(&child, &block));
                match connected {
                    Ok(()) => {
                        self.inner.block_orphans.discard(&child);
                        debug!(hash = %hash_to_hex(&child), "promoted orphan block");
                        accepted.push(child);
                        queue.push_back(child);
                    }
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) => {
                        warn!(hash = %hash_to_hex(&child), %err, "orphan block not accepted");
                    }
                }
            }
            self.inner.block_orphans.remove_child_edges(&parent);
        }
        Ok(accepted)
    }

    // ============================================================================
    // TRANSACTIONS
    // ============================================================================

    fn transaction_known(&self, hash: &Hash) -> Result<bool> {
        let view = self.view();
        Ok(self.inner.tx_orphans.has(hash)
            || view.descriptor(hash)?.is_some()
            || view.pool_entry(hash)?.is_some())
    }

    fn accept_transaction(&mut self, hash: Hash, tx: Transaction) -> Result<Vec<Hash>> {
        if self.transaction_known(&hash)? {
            debug!(hash = %hash_to_hex(&hash), "transaction already known");
            return Ok(Vec::new());
        }
        let computed = tx.hash();
        if computed != hash {
            return Err(ChainError::HashMismatch { claimed: hash, computed });
        }

        match self.admit(&hash, &tx) {
            Ok(true) => {}
            Ok(false) => return Ok(Vec::new()),
            Err(err) if err.is_orphan() => {
                self.park_transaction(hash, tx);
                return Ok(Vec::new());
            }
            Err(err) => {
                warn!(hash = %hash_to_hex(&hash), %err, "rejected transaction");
                return Err(err);
            }
        }

        let mut accepted = vec![hash];
        accepted.extend(self.accept_transaction_children(&hash)?);
        // A promoted child can push its own parent out under the pool cap
        accepted.retain(|hash| self.inner.pool_order.contains(hash));
        Ok(accepted)
    }

    fn park_transaction(&mut self, hash: Hash, tx: Transaction) -> Vec<Hash> {
        let evicted = self.inner.tx_orphans.put(hash, tx);
        debug!(
            hash = %hash_to_hex(&hash),
            root = %hash_to_hex(&self.inner.tx_orphans.root_of(&hash)),
            "parked orphan transaction"
        );
        evicted
    }

    /// Attach `tx` to the pool; false when the pool cap evicted it straight away
    fn admit(&mut self, hash: &Hash, tx: &Transaction) -> Result<bool> {
        let placement = Placement::Pool { admitted_at: unix_now(), sequence: self.inner.next_sequence };
        let mut txn = StoreTransaction::new(self.store());
        self.magnet().attach_transaction(&mut txn, hash, tx, placement)?;
        txn.commit()?;

        self.inner.next_sequence += 1;
        self.inner.pool_order.insert(*hash);
        debug!(hash = %hash_to_hex(hash), pool = self.inner.pool_order.len(), "admitted transaction to pool");
        self.events.push(ChainEvent::TransactionAdmitted { hash: *hash });
        self.enforce_pool_limit()?;
        Ok(self.inner.pool_order.contains(hash))
    }

    /// FIFO eviction, independent of fee: the oldest entry goes with its descendants
    fn enforce_pool_limit(&mut self) -> Result<()> {
        while self.inner.pool_order.len() > self.config().max_pool_transactions {
            let oldest = match self.inner.pool_order.first() {
                Some(hash) => *hash,
                None => break,
            };
            let mut txn = StoreTransaction::new(self.store());
            let removed = self.magnet().evict_from_pool(&mut txn, &oldest)?;
            txn.commit()?;
            self.inner.pool_order.shift_remove(&oldest);
            let removed: Vec<Hash> = removed.into_iter().map(|(hash, _)| hash).collect();
            self.report_evicted(&removed);
        }
        Ok(())
    }

    fn accept_transaction_children(&mut self, hash: &Hash) -> Result<Vec<Hash>> {
        let mut accepted = Vec::new();
        let mut queue = VecDeque::from([*hash]);
        while let Some(parent) = queue.pop_front() {
            for child in self.inner.tx_orphans.children_of(&parent) {
                let tx = match self.inner.tx_orphans.get(&child) {
                    Some(tx) => tx.clone(),
                    None => continue,
                };
                match self.admit(&child, &tx) {
                    Ok(survived) => {
                        self.inner.tx_orphans.discard(&child);
                        debug!(hash = %hash_to_hex(&child), survived, "promoted orphan transaction");
                        if survived {
                            accepted.push(child);
                            queue.push_back(child);
                        }
                    }
                    Err(err) if err.is_fatal() => return Err(err),
                    Err(err) if err.is_orphan() => {
                        debug!(hash = %hash_to_hex(&child), "orphan transaction still missing a parent");
                    }
                    Err(err) => {
                        warn!(hash = %hash_to_hex(&child), %err, "orphan transaction not accepted");
                    }
                }
            }
            self.inner.tx_orphans.remove_child_edges(&parent);
        }
        accepted.retain(|hash| self.inner.pool_order.contains(hash));
        Ok(accepted)
    }

    fn forget_pooled(&mut self, hashes: &[Hash]) {
        for hash in hashes {
            self.inner.pool_order.shift_remove(hash);
        }
    }

    fn report_evicted(&mut self, hashes: &[Hash]) {
        for hash in hashes {
            warn!(hash = %hash_to_hex(hash), "evicted transaction from pool");
            self.inner.pool_order.shift_remove(hash);
            self.events.push(ChainEvent::TransactionEvicted { hash: *hash });
        }
    }
}

/// Accept and query blocks
#[derive(Clone)]
pub struct BlockProcessor {
    state: Arc<ChainState>,
}

impl BlockProcessor {
    pub fn new(state: Arc<ChainState>) -> Self {
        Self { state }
    }

    /// Accept a block announced as `hash`.
    ///
    /// Returns every hash newly indexed by this call (the block, then promoted orphan
    /// descendants parent first), or nothing when the block was parked as an orphan or
    /// was already known. Blocks stored on a side branch are listed too: they confirm
    /// nothing yet, but are new inventory to relay. [`BlockProcessor::block_info`]
    /// tells the two apart by status.
    pub fn accept(&self, hash: Hash, block: Block) -> Result<Vec<Hash>> {
        self.state.mutate(|m| m.accept_block(hash, block))
    }

    /// Promote orphans waiting on `hash`, breadth first; side-branch blocks are
    /// listed as in [`BlockProcessor::accept`]
    pub fn accept_children(&self, hash: &Hash) -> Result<Vec<Hash>> {
        self.state.mutate(|m| m.accept_block_children(hash))
    }

    /// Park a block as an orphan without checking it; returns evicted orphans.
    ///
    /// A block that is already indexed is never parked.
    pub fn put_orphan(&self, hash: Hash, block: Block) -> Result<Vec<Hash>> {
        self.state.mutate(|m| {
            if m.view().block_info(&hash)?.is_some() {
                debug!(hash = %hash_to_hex(&hash), "block already indexed, not parked");
                return Ok(Vec::new());
            }
            Ok(m.park_block(hash, block))
        })
    }

    /// Discard an orphan and all orphans descending from it
    pub fn prune_orphan(&self, hash: &Hash) -> Result<Vec<Hash>> {
        self.state.mutate(|m| Ok(m.inner.block_orphans.prune(hash)))
    }

    pub fn exists(&self, hash: &Hash) -> Result<bool> {
        Ok(self.has_orphan(hash) || self.has_non_orphan(hash)?)
    }

    /// The block, if it is indexed and not invalid; never an orphan
    pub fn get(&self, hash: &Hash) -> Result<Option<Block>> {
        self.state.read(|_, view| match view.block_info(hash)? {
            Some(info) if info.status != BlockStatus::Invalid => view.block(hash),
            _ => Ok(None),
        })
    }

    pub fn has_orphan(&self, hash: &Hash) -> bool {
        self.state.inner.read().block_orphans.has(hash)
    }

    pub fn has_non_orphan(&self, hash: &Hash) -> Result<bool> {
        self.state.read(|_, view| Ok(view.block_info(hash)?.is_some()))
    }

    pub fn get_orphan_root(&self, hash: &Hash) -> Hash {
        self.state.inner.read().block_orphans.root_of(hash)
    }

    pub fn block_info(&self, hash: &Hash) -> Result<Option<BlockInfo>> {
        self.state.read(|_, view| view.block_info(hash))
    }
}

/// Accept and query transactions
#[derive(Clone)]
pub struct TransactionProcessor {
    state: Arc<ChainState>,
}

impl TransactionProcessor {
    pub fn new(state: Arc<ChainState>) -> Self {
        Self { state }
    }

    /// Admit a transaction to the pool, or park it when a source is missing.
    ///
    /// Returns the admitted hash followed by any orphans it unblocked.
    pub fn accept(&self, hash: Hash, tx: Transaction) -> Result<Vec<Hash>> {
        self.state.mutate(|m| m.accept_transaction(hash, tx))
    }

    pub fn accept_children(&self, hash: &Hash) -> Result<Vec<Hash>> {
        self.state.mutate(|m| m.accept_transaction_children(hash))
    }

    /// Park a transaction as an orphan; a confirmed or pooled one is never parked
    pub fn put_orphan(&self, hash: Hash, tx: Transaction) -> Result<Vec<Hash>> {
        self.state.mutate(|m| {
            let view = m.view();
            if view.descriptor(&hash)?.is_some() || view.pool_entry(&hash)?.is_some() {
                debug!(hash = %hash_to_hex(&hash), "transaction already indexed, not parked");
                return Ok(Vec::new());
            }
            Ok(m.park_transaction(hash, tx))
        })
    }

    pub fn prune_orphan(&self, hash: &Hash) -> Result<Vec<Hash>> {
        self.state.mutate(|m| Ok(m.inner.tx_orphans.prune(hash)))
    }

    pub fn exists(&self, hash: &Hash) -> Result<bool> {
        Ok(self.has_orphan(hash) || self.has_non_orphan(hash)?)
    }

    /// Confirmed or pooled payload; never an orphan
    pub fn get(&self, hash: &Hash) -> Result<Option<Transaction>> {
        self.state.read(|_, view| view.transaction(hash))
    }

    pub fn has_orphan(&self, hash: &Hash) -> bool {
        self.state.inner.read().tx_orphans.has(hash)
    }

    pub fn has_non_orphan(&self, hash: &Hash) -> Result<bool> {
        self.state.read(|_, view| Ok(view.descriptor(hash)?.is_some() || view.pool_entry(hash)?.is_some()))
    }

    pub fn get_orphan_root(&self, hash: &Hash) -> Hash {
        self.state.inner.read().tx_orphans.root_of(hash)
    }

    pub fn descriptor(&self, hash: &Hash) -> Result<Option<TransactionDescriptor>> {
        self.state.read(|_, view| view.descriptor(hash))
    }

    pub fn pool_entry(&self, hash: &Hash) -> Result<Option<PoolEntry>> {
        self.state.read(|_, view| view.pool_entry(hash))
    }
}
