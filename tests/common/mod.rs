//! Shared builders for integration tests

#![allow(dead_code)]

use std::sync::Arc;

use chain_engine::merkle::block_merkle_root;
use chain_engine::pow::mine_header;
use chain_engine::storage::MemoryStore;
use chain_engine::validation::ConsensusValidator;
use chain_engine::*;
use parking_lot::Mutex;

pub const EASY_BITS: u32 = 0x207fffff;

/// About 65537 units of work against 2 for `EASY_BITS`
pub const HARD_BITS: u32 = 0x1f00ffff;

pub fn create_engine() -> (ChainEngine, Arc<MemoryStore>) {
    create_engine_with(ChainConfig::default())
}

pub fn create_engine_with(config: ChainConfig) -> (ChainEngine, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let engine = ChainEngine::open(store.clone(), Arc::new(ConsensusValidator::new()), config).unwrap();
    (engine, store)
}

/// Generation transaction; `tag` keeps coinbases of different blocks distinct
pub fn create_coinbase(tag: u64, values: &[Integer]) -> Transaction {
    Transaction {
        version: 1,
        inputs: vec![TransactionInput {
            prevout: OutPoint { hash: ZERO_HASH, index: GENERATION_INPUT_INDEX },
            script_sig: tag.to_le_bytes().to_vec(),
            sequence: SEQUENCE_FINAL,
        }],
        outputs: values
            .iter()
            .map(|value| TransactionOutput { value: *value, script_pubkey: vec![0x51] })
            .collect(),
        lock_time: 0,
    }
}

pub fn create_block_with_bits(prev: Hash, tag: u64, bits: u32, transactions: Vec<Transaction>) -> Block {
    let mut all = vec![create_coinbase(tag, &[5000])];
    all.extend(transactions);
    let mut block = Block {
        header: BlockHeader {
            version: 1,
            prev_block_hash: prev,
            merkle_root: ZERO_HASH,
            timestamp: 1_700_000_000 + tag as u32,
            bits,
            nonce: 0,
        },
        transactions: all,
    };
    seal(&mut block);
    block
}

/// Recompute the merkle root and grind the nonce until the header meets its target
pub fn seal(block: &mut Block) {
    block.header.merkle_root = block_merkle_root(block).unwrap();
    assert!(mine_header(&mut block.header, u32::MAX as u64).unwrap());
}

pub fn create_block(prev: Hash, tag: u64, transactions: Vec<Transaction>) -> Block {
    create_block_with_bits(prev, tag, EASY_BITS, transactions)
}

/// Genesis whose coinbase pays `values`, one output each
pub fn create_genesis(values: &[Integer]) -> Block {
    let mut block = Block {
        header: BlockHeader {
            version: 1,
            prev_block_hash: ZERO_HASH,
            merkle_root: ZERO_HASH,
            timestamp: 1_700_000_000,
            bits: EASY_BITS,
            nonce: 0,
        },
        transactions: vec![create_coinbase(0, values)],
    };
    seal(&mut block);
    block
}

pub fn create_spend(sources: &[(Hash, u32)], values: &[Integer]) -> Transaction {
    Transaction {
        version: 1,
        inputs: sources
            .iter()
            .map(|(hash, index)| TransactionInput {
                prevout: OutPoint { hash: *hash, index: *index },
                script_sig: vec![0x51],
                sequence: SEQUENCE_FINAL,
            })
            .collect(),
        outputs: values
            .iter()
            .map(|value| TransactionOutput { value: *value, script_pubkey: vec![0x51] })
            .collect(),
        lock_time: 0,
    }
}

pub fn coinbase_hash(block: &Block) -> Hash {
    block.transactions[0].hash()
}

/// Accept `block` and expect it to become the best tip
pub fn extend(engine: &ChainEngine, block: &Block) -> Hash {
    let hash = block.hash();
    engine.blocks().accept(hash, block.clone()).unwrap();
    assert_eq!(engine.best_tip().unwrap(), Some(hash));
    hash
}

pub fn admit(engine: &ChainEngine, tx: &Transaction) -> Hash {
    let hash = tx.hash();
    let accepted = engine.transactions().accept(hash, tx.clone()).unwrap();
    assert_eq!(accepted.first(), Some(&hash));
    hash
}

/// Collects every event it is handed
#[derive(Default)]
pub struct RecordingListener {
    events: Mutex<Vec<ChainEvent>>,
}

impl RecordingListener {
    pub fn events(&self) -> Vec<ChainEvent> {
        self.events.lock().clone()
    }
}

impl ChainListener for RecordingListener {
    fn on_event(&self, event: &ChainEvent) {
        self.events.lock().push(event.clone());
    }
}
