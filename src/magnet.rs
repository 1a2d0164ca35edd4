//! Magnet: attach and detach the effects of blocks and transactions
//!
//! Every operation here stages its writes into a caller-owned [`StoreTransaction`];
//! the caller commits once per block or transaction, so a failure part way through
//! leaves storage untouched. The Magnet itself holds no state beyond the validator
//! it consults before each attach.

use std::collections::HashSet;

use tracing::trace;

use crate::constants::ZERO_HASH;
use crate::error::{ChainError, Result};
use crate::ledger::{self, LedgerRecord};
use crate::pow::block_work;
use crate::serialize::hash_to_hex;
use crate::storage::{ChainRead, Namespace, StoreTransaction, BEST_TIP_KEY};
use crate::types::*;
use crate::validation::Validator;

/// Where an attached transaction ends up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Confirmed inside a block
    Block(Confirmation),
    /// Unconfirmed, admitted to the pool
    Pool { admitted_at: Natural, sequence: Natural },
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionEffects {
    /// The transaction was in the pool and is now confirmed
    pub promoted: bool,
    /// Pool transactions removed because this one won a contested output
    pub evicted: Vec<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockAttach {
    pub info: BlockInfo,
    pub promoted: Vec<Hash>,
    pub evicted: Vec<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDetach {
    pub info: BlockInfo,
    pub block: Block,
    /// Pool transactions that spent this block's outputs, parents before children
    pub displaced: Vec<(Hash, Transaction)>,
}

pub struct Magnet<'v> {
    validator: &'v dyn Validator,
}

impl<'v> Magnet<'v> {
    pub fn new(validator: &'v dyn Validator) -> Self {
        Self { validator }
    }

    /// AttachTransaction: 𝒯𝒳 × Placement → effects
    ///
    /// 1. Resolve every input's source; an unknown source is an orphan for the pool and
    ///    a rejection for a block, which may only spend confirmed outputs
    /// 2. Verify the transaction against the outputs it spends
    /// 3. Spend each source output; inside a block, a pool transaction holding the same
    ///    output is evicted with its descendants
    /// 4. Record the confirmed descriptor (carrying over markers of a promoted pool
    ///    entry) or the pool entry
    pub fn attach_transaction(
        &self,
        txn: &mut StoreTransaction<'_>,
        hash: &Hash,
        tx: &Transaction,
        placement: Placement,
    ) -> Result<TransactionEffects> {
        let confirming = matches!(placement, Placement::Block(_));
        if tx.is_generation() && !confirming {
            return Err(ChainError::GenerationOutsideBlock(*hash));
        }
        if txn.descriptor(hash)?.is_some() {
            return Err(ChainError::DuplicateTransaction(*hash));
        }
        if !confirming && txn.pool_entry(hash)?.is_some() {
            return Err(ChainError::DuplicateTransaction(*hash));
        }

        // 1. Resolve sources
        let mut spent_outputs = Vec::with_capacity(tx.inputs.len());
        if !tx.is_generation() {
            for input in &tx.inputs {
                let parent = input.prevout.hash;
                match ledger::lookup(&*txn, &parent)? {
                    Some(LedgerRecord::Confirmed(_)) => {}
                    Some(LedgerRecord::Pooled(_)) if !confirming => {}
                    Some(LedgerRecord::Pooled(_)) => {
                        return Err(ChainError::Validation(format!(
                            "confirmed transaction {} spends unconfirmed {}",
                            hash_to_hex(hash),
                            hash_to_hex(&parent)
                        )))
                    }
                    None if confirming => {
                        return Err(ChainError::Validation(format!(
                            "confirmed transaction {} spends unknown {}",
                            hash_to_hex(hash),
                            hash_to_hex(&parent)
                        )))
                    }
                    None => return Err(ChainError::ParentTransactionNotFound { transaction: *hash, parent }),
                }
                let output = ledger::resolve_output(&*txn, &input.prevout)?
                    .ok_or(ChainError::MissingRecord { kind: "source transaction", hash: parent })?;
                spent_outputs.push(output);
            }
        }

        // 2. Verify
        self.validator.verify_transaction(tx, &spent_outputs)?;

        // 3. Spend
        let mut effects = TransactionEffects::default();
        for (index, input) in tx.inputs.iter().enumerate() {
            if input.is_generation() {
                continue;
            }
            let inpoint = InPoint { hash: *hash, index: index as u32 };
            if confirming {
                if let Some(existing) = ledger::spent_by(&*txn, &input.prevout)? {
                    if existing.hash != *hash && txn.pool_entry(&existing.hash)?.is_some() {
                        for (evicted, _) in self.evict_from_pool(txn, &existing.hash)? {
                            effects.evicted.push(evicted);
                        }
                    }
                }
            }
            ledger::spend(txn, &input.prevout, &inpoint)?;
        }

        // 4. Record
        match placement {
            Placement::Block(confirmation) => {
                let outputs_spent_by = match txn.pool_entry(hash)? {
                    Some(entry) => {
                        txn.delete_pool_entry(hash);
                        effects.promoted = true;
                        entry.outputs_spent_by
                    }
                    None => vec![None; tx.outputs.len()],
                };
                let descriptor = TransactionDescriptor {
                    locator: confirmation.locator,
                    height: confirmation.height,
                    outputs_spent_by,
                };
                txn.put_descriptor(hash, &descriptor)?;
            }
            Placement::Pool { admitted_at, sequence } => {
                let entry = PoolEntry {
                    transaction: tx.clone(),
                    admitted_at,
                    sequence,
                    outputs_spent_by: vec![None; tx.outputs.len()],
                };
                txn.put_pool_entry(hash, &entry)?;
            }
        }

        trace!(hash = %hash_to_hex(hash), confirming, "attached transaction");
        Ok(effects)
    }

    /// DetachTransaction: reverse of AttachTransaction
    ///
    /// Pool transactions spending a confirmed transaction's outputs are removed first
    /// and returned as displaced, parents before children. Any spender left after that
    /// is still attached, which means detach order was violated.
    pub fn detach_transaction(
        &self,
        txn: &mut StoreTransaction<'_>,
        hash: &Hash,
        tx: &Transaction,
    ) -> Result<Vec<(Hash, Transaction)>> {
        let record = ledger::lookup(&*txn, hash)?
            .ok_or(ChainError::MissingRecord { kind: "transaction descriptor", hash: *hash })?;

        let mut displaced = Vec::new();
        if record.is_confirmed() {
            for spender in record.outputs_spent_by().iter().flatten() {
                if txn.descriptor(&spender.hash)?.is_none() && txn.pool_entry(&spender.hash)?.is_some() {
                    let mut removed = self.evict_from_pool(txn, &spender.hash)?;
                    removed.reverse();
                    displaced.extend(removed);
                }
            }
        }

        let record = ledger::lookup(&*txn, hash)?
            .ok_or(ChainError::MissingRecord { kind: "transaction descriptor", hash: *hash })?;
        for (index, spender) in record.outputs_spent_by().iter().enumerate() {
            if let Some(spent_by) = spender {
                return Err(ChainError::OutputStillSpent {
                    outpoint: OutPoint { hash: *hash, index: index as u32 },
                    spent_by: *spent_by,
                });
            }
        }

        self.release_inputs(txn, hash, tx)?;
        match record {
            LedgerRecord::Confirmed(_) => txn.delete_descriptor(hash),
            LedgerRecord::Pooled(_) => txn.delete_pool_entry(hash),
        }

        trace!(hash = %hash_to_hex(hash), displaced = displaced.len(), "detached transaction");
        Ok(displaced)
    }

    fn release_inputs(&self, txn: &mut StoreTransaction<'_>, hash: &Hash, tx: &Transaction) -> Result<()> {
        for (index, input) in tx.inputs.iter().enumerate() {
            if input.is_generation() {
                continue;
            }
            let inpoint = InPoint { hash: *hash, index: index as u32 };
            let previous = ledger::unspend(txn, &input.prevout)?;
            if previous != inpoint {
                return Err(ChainError::OutputStillSpent { outpoint: input.prevout, spent_by: previous });
            }
        }
        Ok(())
    }

    /// Remove a pool transaction and every pool descendant, children first.
    ///
    /// Returns the removed transactions in removal order.
    pub fn evict_from_pool(
        &self,
        txn: &mut StoreTransaction<'_>,
        root: &Hash,
    ) -> Result<Vec<(Hash, Transaction)>> {
        // Iterative post-order: every spender lands before the transaction it spends
        let mut order = Vec::new();
        let mut visited = HashSet::new();
        let mut stack = vec![(*root, false)];
        while let Some((hash, expanded)) = stack.pop() {
            if expanded {
                order.push(hash);
                continue;
            }
            if !visited.insert(hash) {
                continue;
            }
            let entry = match txn.pool_entry(&hash)? {
                Some(entry) => entry,
                None => continue,
            };
            stack.push((hash, true));
            for spender in entry.outputs_spent_by.iter().flatten() {
                if !visited.contains(&spender.hash) {
                    stack.push((spender.hash, false));
                }
            }
        }

        let mut removed = Vec::with_capacity(order.len());
        for hash in order {
            let entry = txn
                .pool_entry(&hash)?
                .ok_or(ChainError::MissingRecord { kind: "pool entry", hash })?;
            self.release_inputs(txn, &hash, &entry.transaction)?;
            txn.delete_pool_entry(&hash);
            removed.push((hash, entry.transaction));
        }
        Ok(removed)
    }

    /// AttachBlock: ℬ × BlockInfo(parent) → BlockInfo
    ///
    /// 1. The parent must be the best tip (or absent, for genesis on an empty chain)
    /// 2. height = parent.height + 1, chain_work = parent.chain_work + Work(header)
    /// 3. Attach every transaction in block order
    /// 4. Link parent.next_block_hash, mark the block Active and make it the best tip
    pub fn attach_block(
        &self,
        txn: &mut StoreTransaction<'_>,
        hash: &Hash,
        block: &Block,
    ) -> Result<BlockAttach> {
        let prev = block.header.prev_block_hash;
        let work = block_work(&block.header)?;
        let best_tip = txn.best_tip()?;

        let (height, chain_work) = if prev == ZERO_HASH {
            if best_tip.is_some() {
                return Err(ChainError::UnexpectedGenesis(*hash));
            }
            (0, work)
        } else {
            if best_tip != Some(prev) {
                return Err(ChainError::NotBestTip(prev));
            }
            let mut parent = txn.require_block_info(&prev)?;
            parent.next_block_hash = Some(*hash);
            txn.put_block_info(&prev, &parent)?;
            (parent.height + 1, &parent.chain_work + &work)
        };

        let mut promoted = Vec::new();
        let mut evicted = Vec::new();
        for (index, tx) in block.transactions.iter().enumerate() {
            let tx_hash = tx.hash();
            let confirmation = Confirmation {
                locator: TxLocator { block_hash: *hash, index: index as u32 },
                height,
            };
            let effects = self.attach_transaction(txn, &tx_hash, tx, Placement::Block(confirmation))?;
            if effects.promoted {
                promoted.push(tx_hash);
            }
            evicted.extend(effects.evicted);
        }

        let info = BlockInfo {
            previous_block_hash: prev,
            height,
            chain_work,
            next_block_hash: None,
            transaction_count: block.transactions.len() as u32,
            status: BlockStatus::Active,
        };
        txn.put_block(hash, block)?;
        txn.put_block_info(hash, &info)?;
        txn.set_best_tip(hash)?;

        trace!(hash = %hash_to_hex(hash), height, "attached block");
        Ok(BlockAttach { info, promoted, evicted })
    }

    /// DetachBlock: reverse of AttachBlock, for the current best tip only
    ///
    /// Transactions are detached in reverse block order so intra-block spends unwind
    /// before the outputs they consume. The block keeps its payload and index record,
    /// demoted to a side branch.
    pub fn detach_block(&self, txn: &mut StoreTransaction<'_>, hash: &Hash) -> Result<BlockDetach> {
        if txn.best_tip()? != Some(*hash) {
            return Err(ChainError::NotBestTip(*hash));
        }
        let mut info = txn.require_block_info(hash)?;
        let block = txn.require_block(hash)?;

        let mut displaced = Vec::new();
        for tx in block.transactions.iter().rev() {
            let tx_hash = tx.hash();
            displaced.extend(self.detach_transaction(txn, &tx_hash, tx)?);
        }

        info.status = BlockStatus::Fork;
        info.next_block_hash = None;
        txn.put_block_info(hash, &info)?;

        if info.previous_block_hash == ZERO_HASH {
            txn.delete(Namespace::Meta, BEST_TIP_KEY);
        } else {
            let mut parent = txn.require_block_info(&info.previous_block_hash)?;
            parent.next_block_hash = None;
            txn.put_block_info(&info.previous_block_hash, &parent)?;
            txn.set_best_tip(&info.previous_block_hash)?;
        }

        trace!(hash = %hash_to_hex(hash), height = info.height, "detached block");
        Ok(BlockDetach { info, block, displaced })
    }

    /// Record a block on a side branch: index entry and payload, no transaction effects
    pub fn store_side_block(
        &self,
        txn: &mut StoreTransaction<'_>,
        hash: &Hash,
        block: &Block,
    ) -> Result<BlockInfo> {
        let prev = block.header.prev_block_hash;
        let parent = txn.require_block_info(&prev)?;
        let work = block_work(&block.header)?;
        let info = BlockInfo {
            previous_block_hash: prev,
            height: parent.height + 1,
            chain_work: &parent.chain_work + &work,
            next_block_hash: None,
            transaction_count: block.transactions.len() as u32,
            status: BlockStatus::Fork,
        };
        txn.put_block(hash, block)?;
        txn.put_block_info(hash, &info)?;
        Ok(info)
    }

    pub fn mark_invalid(&self, txn: &mut StoreTransaction<'_>, hash: &Hash) -> Result<()> {
        let mut info = txn.require_block_info(hash)?;
        info.status = BlockStatus::Invalid;
        info.next_block_hash = None;
        txn.put_block_info(hash, &info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{GENERATION_INPUT_INDEX, SEQUENCE_FINAL};
    use crate::merkle::block_merkle_root;
    use crate::pow::{mine_header, ChainWork};
    use crate::storage::{KeyValueStore, MemoryStore, StoreView};
    use crate::validation::ConsensusValidator;
    use proptest::prelude::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_attach_genesis() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        let hash = genesis.hash();

        let mut txn = StoreTransaction::new(&store);
        let attach = magnet.attach_block(&mut txn, &hash, &genesis).unwrap();
        txn.commit().unwrap();

        assert_eq!(attach.info.height, 0);
        assert_eq!(attach.info.chain_work, ChainWork::from_u64(2));
        assert_eq!(StoreView(&store).best_tip().unwrap(), Some(hash));
        let coinbase = genesis.transactions[0].hash();
        let descriptor = StoreView(&store).descriptor(&coinbase).unwrap().unwrap();
        assert_eq!(descriptor.outputs_spent_by, vec![None]);
    }

    #[test]
    fn test_attach_block_links_parent() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        attach(&store, &magnet, &genesis);
        let child = create_test_block(genesis.hash(), 1, vec![]);
        let info = attach(&store, &magnet, &child);

        assert_eq!(info.height, 1);
        assert_eq!(info.chain_work, ChainWork::from_u64(4));
        let parent = StoreView(&store).block_info(&genesis.hash()).unwrap().unwrap();
        assert_eq!(parent.next_block_hash, Some(child.hash()));
    }

    #[test]
    fn test_attach_block_requires_best_tip_parent() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        attach(&store, &magnet, &genesis);
        let a = create_test_block(genesis.hash(), 1, vec![]);
        attach(&store, &magnet, &a);

        let side = create_test_block(genesis.hash(), 2, vec![]);
        let mut txn = StoreTransaction::new(&store);
        let err = magnet.attach_block(&mut txn, &side.hash(), &side).unwrap_err();
        assert!(matches!(err, ChainError::NotBestTip(_)));
    }

    #[test]
    fn test_double_spend_in_block_is_rejected_and_rolled_back() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        attach(&store, &magnet, &genesis);
        let coinbase = genesis.transactions[0].hash();

        let first = create_spend(coinbase, 0, 100);
        let second = create_spend(coinbase, 0, 99);
        let block = create_test_block(genesis.hash(), 1, vec![first, second]);
        let before = store.snapshot();

        let mut txn = StoreTransaction::new(&store);
        let err = magnet.attach_block(&mut txn, &block.hash(), &block).unwrap_err();
        drop(txn);
        assert!(matches!(err, ChainError::OutputAlreadySpent { .. }));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_detach_block_restores_snapshot() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        attach(&store, &magnet, &genesis);
        let coinbase = genesis.transactions[0].hash();

        // Side-branch record first, so the detached block returns to exactly this state
        let spend = create_spend(coinbase, 0, 100);
        let chained = create_spend(spend.hash(), 0, 90);
        let block = create_test_block(genesis.hash(), 1, vec![spend, chained]);
        let hash = block.hash();
        let mut txn = StoreTransaction::new(&store);
        magnet.store_side_block(&mut txn, &hash, &block).unwrap();
        txn.commit().unwrap();
        let before = store.snapshot();

        attach(&store, &magnet, &block);
        assert_ne!(store.snapshot(), before);

        let mut txn = StoreTransaction::new(&store);
        let detach = magnet.detach_block(&mut txn, &hash).unwrap();
        txn.commit().unwrap();

        assert!(detach.displaced.is_empty());
        assert_eq!(store.snapshot(), before);
    }

    proptest! {
        /// Detaching any suffix of the chain unwinds to the earlier state, and attaching
        /// it again restores every record
        #[test]
        fn test_detach_attach_round_trip(length in 1usize..6, depth_seed in 0usize..6) {
            let depth = depth_seed % length + 1;
            let store = MemoryStore::new();
            let validator = ConsensusValidator::new();
            let magnet = Magnet::new(&validator);

            let mut chain = vec![create_test_block(ZERO_HASH, 0, vec![])];
            attach(&store, &magnet, &chain[0]);
            let mut snapshots = vec![store.snapshot()];
            for height in 1..=length {
                let prev = chain[height - 1].clone();
                let spend = create_spend(prev.transactions[0].hash(), 0, 4000);
                let chained = create_spend(spend.hash(), 0, 3000);
                let block = create_test_block(prev.hash(), height as u8, vec![spend, chained]);
                attach(&store, &magnet, &block);
                snapshots.push(store.snapshot());
                chain.push(block);
            }
            let full = store.snapshot();

            for block in chain.iter().rev().take(depth) {
                let mut txn = StoreTransaction::new(&store);
                let detach = magnet.detach_block(&mut txn, &block.hash()).unwrap();
                txn.commit().unwrap();
                prop_assert!(detach.displaced.is_empty());
            }

            let fork_height = length - depth;
            let settled = &snapshots[fork_height];
            let now = store.snapshot();
            for namespace in [Namespace::Transactions, Namespace::Pool, Namespace::Meta] {
                prop_assert_eq!(only(&now, namespace), only(settled, namespace));
            }
            let now_info = only(&now, Namespace::BlockInfo);
            for (key, value) in only(settled, Namespace::BlockInfo) {
                prop_assert_eq!(now_info.get(&key), Some(&value));
            }

            for block in &chain[fork_height + 1..] {
                attach(&store, &magnet, block);
            }
            prop_assert_eq!(store.snapshot(), full);
        }
    }

    #[test]
    fn test_detach_non_tip_is_fatal() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        attach(&store, &magnet, &genesis);
        let a = create_test_block(genesis.hash(), 1, vec![]);
        attach(&store, &magnet, &a);

        let mut txn = StoreTransaction::new(&store);
        let err = magnet.detach_block(&mut txn, &genesis.hash()).unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_pool_transaction_is_promoted_by_block() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        attach(&store, &magnet, &genesis);
        let coinbase = genesis.transactions[0].hash();

        let parent = create_spend(coinbase, 0, 100);
        let child = create_spend(parent.hash(), 0, 90);
        admit(&store, &magnet, &parent, 1);
        admit(&store, &magnet, &child, 2);

        let block = create_test_block(genesis.hash(), 1, vec![parent.clone()]);
        let mut txn = StoreTransaction::new(&store);
        let attach = magnet.attach_block(&mut txn, &block.hash(), &block).unwrap();
        txn.commit().unwrap();

        assert_eq!(attach.promoted, vec![parent.hash()]);
        let view = StoreView(&store);
        assert!(view.pool_entry(&parent.hash()).unwrap().is_none());
        let descriptor = view.descriptor(&parent.hash()).unwrap().unwrap();
        assert_eq!(descriptor.outputs_spent_by[0], Some(InPoint { hash: child.hash(), index: 0 }));
        assert!(view.pool_entry(&child.hash()).unwrap().is_some());
    }

    #[test]
    fn test_conflicting_pool_transaction_is_evicted() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        attach(&store, &magnet, &genesis);
        let coinbase = genesis.transactions[0].hash();

        let pooled = create_spend(coinbase, 0, 100);
        let pooled_child = create_spend(pooled.hash(), 0, 90);
        admit(&store, &magnet, &pooled, 1);
        admit(&store, &magnet, &pooled_child, 2);

        let winner = create_spend(coinbase, 0, 50);
        let block = create_test_block(genesis.hash(), 1, vec![winner.clone()]);
        let mut txn = StoreTransaction::new(&store);
        let attach = magnet.attach_block(&mut txn, &block.hash(), &block).unwrap();
        txn.commit().unwrap();

        assert_eq!(attach.evicted, vec![pooled_child.hash(), pooled.hash()]);
        let view = StoreView(&store);
        assert!(view.pool_entry(&pooled.hash()).unwrap().is_none());
        assert!(view.pool_entry(&pooled_child.hash()).unwrap().is_none());
        assert_eq!(
            ledger::spent_by(&view, &OutPoint { hash: coinbase, index: 0 }).unwrap(),
            Some(InPoint { hash: winner.hash(), index: 0 })
        );
    }

    #[test]
    fn test_block_spending_pool_transaction_is_rejected() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        attach(&store, &magnet, &genesis);
        let coinbase = genesis.transactions[0].hash();

        let pooled = create_spend(coinbase, 0, 100);
        admit(&store, &magnet, &pooled, 1);
        let child = create_spend(pooled.hash(), 0, 90);
        let block = create_test_block(genesis.hash(), 1, vec![child]);
        let mut txn = StoreTransaction::new(&store);
        let err = magnet.attach_block(&mut txn, &block.hash(), &block).unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
    }

    #[test]
    fn test_detach_displaces_pool_spenders() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        attach(&store, &magnet, &genesis);
        let coinbase = genesis.transactions[0].hash();

        let confirmed = create_spend(coinbase, 0, 100);
        let block = create_test_block(genesis.hash(), 1, vec![confirmed.clone()]);
        attach(&store, &magnet, &block);
        let pooled = create_spend(confirmed.hash(), 0, 90);
        let pooled_child = create_spend(pooled.hash(), 0, 80);
        admit(&store, &magnet, &pooled, 1);
        admit(&store, &magnet, &pooled_child, 2);

        let mut txn = StoreTransaction::new(&store);
        let detach = magnet.detach_block(&mut txn, &block.hash()).unwrap();
        txn.commit().unwrap();

        let displaced: Vec<Hash> = detach.displaced.iter().map(|(hash, _)| *hash).collect();
        assert_eq!(displaced, vec![pooled.hash(), pooled_child.hash()]);
        let view = StoreView(&store);
        assert!(view.descriptor(&confirmed.hash()).unwrap().is_none());
        assert!(view.pool_entry(&pooled.hash()).unwrap().is_none());
        assert_eq!(ledger::spent_by(&view, &OutPoint { hash: coinbase, index: 0 }).unwrap(), None);
        assert_eq!(view.best_tip().unwrap(), Some(genesis.hash()));
    }

    #[test]
    fn test_pool_orphan_and_duplicate() {
        let store = MemoryStore::new();
        let validator = ConsensusValidator::new();
        let magnet = Magnet::new(&validator);
        let genesis = create_test_block(ZERO_HASH, 0, vec![]);
        attach(&store, &magnet, &genesis);

        let orphan = create_spend([5; 32], 0, 10);
        let mut txn = StoreTransaction::new(&store);
        let err = magnet
            .attach_transaction(&mut txn, &orphan.hash(), &orphan, Placement::Pool { admitted_at: 0, sequence: 0 })
            .unwrap_err();
        assert!(err.is_orphan());

        let spend = create_spend(genesis.transactions[0].hash(), 0, 10);
        admit(&store, &magnet, &spend, 1);
        let mut txn = StoreTransaction::new(&store);
        let err = magnet
            .attach_transaction(&mut txn, &spend.hash(), &spend, Placement::Pool { admitted_at: 0, sequence: 2 })
            .unwrap_err();
        assert!(matches!(err, ChainError::DuplicateTransaction(_)));
    }

    fn only(snapshot: &BTreeMap<(Namespace, Vec<u8>), Vec<u8>>, namespace: Namespace) -> BTreeMap<Vec<u8>, Vec<u8>> {
        snapshot
            .iter()
            .filter(|((ns, _), _)| *ns == namespace)
            .map(|((_, key), value)| (key.clone(), value.clone()))
            .collect()
    }

    fn attach(store: &dyn KeyValueStore, magnet: &Magnet<'_>, block: &Block) -> BlockInfo {
        let mut txn = StoreTransaction::new(store);
        let attach = magnet.attach_block(&mut txn, &block.hash(), block).unwrap();
        txn.commit().unwrap();
        attach.info
    }

    fn admit(store: &dyn KeyValueStore, magnet: &Magnet<'_>, tx: &Transaction, sequence: Natural) {
        let mut txn = StoreTransaction::new(store);
        magnet
            .attach_transaction(&mut txn, &tx.hash(), tx, Placement::Pool { admitted_at: 0, sequence })
            .unwrap();
        txn.commit().unwrap();
    }

    fn create_spend(parent: Hash, index: u32, value: Integer) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                prevout: OutPoint { hash: parent, index },
                script_sig: vec![0x51],
                sequence: SEQUENCE_FINAL,
            }],
            outputs: vec![TransactionOutput { value, script_pubkey: vec![0x51] }],
            lock_time: 0,
        }
    }

    fn create_test_block(prev: Hash, height: u8, mut transactions: Vec<Transaction>) -> Block {
        let coinbase = Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                prevout: OutPoint { hash: ZERO_HASH, index: GENERATION_INPUT_INDEX },
                script_sig: vec![height, 0xc0],
                sequence: SEQUENCE_FINAL,
            }],
            outputs: vec![TransactionOutput { value: 5000, script_pubkey: vec![0x51] }],
            lock_time: 0,
        };
        transactions.insert(0, coinbase);
        let mut block = Block {
            header: BlockHeader {
                version: 1,
                prev_block_hash: prev,
                merkle_root: ZERO_HASH,
                timestamp: 1_700_000_000 + height as u32,
                bits: 0x207fffff,
                nonce: 0,
            },
            transactions,
        };
        block.header.merkle_root = block_merkle_root(&block).unwrap();
        assert!(mine_header(&mut block.header, 1_000).unwrap());
        block
    }
}
