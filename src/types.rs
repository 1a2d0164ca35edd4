//! Core chain types: payloads, references, and the records the engine persists

use serde::{Deserialize, Serialize};

use crate::constants::{GENERATION_INPUT_INDEX, ZERO_HASH};
use crate::pow::ChainWork;

/// Hash type: 256-bit hash, compared byte-wise
pub type Hash = [u8; 32];

/// Byte string type
pub type ByteString = Vec<u8>;

/// Natural number type
pub type Natural = u64;

/// Integer type
pub type Integer = i64;

/// OutPoint: 𝒪 = ℍ × ℕ, a reference to one output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OutPoint {
    pub hash: Hash,
    pub index: u32,
}

/// InPoint: ℍ × ℕ, a reference to one input spending an [`OutPoint`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InPoint {
    pub hash: Hash,
    pub index: u32,
}

/// Transaction Input: ℐ = 𝒪 × 𝕊 × ℕ
///
/// A generation input carries the null outpoint and uses `script_sig` as free-form data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub prevout: OutPoint,
    pub script_sig: ByteString,
    pub sequence: u32,
}

impl TransactionInput {
    pub fn is_generation(&self) -> bool {
        self.prevout.hash == ZERO_HASH && self.prevout.index == GENERATION_INPUT_INDEX
    }
}

/// Transaction Output: 𝒯 = ℤ × 𝕊
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionOutput {
    pub value: Integer,
    pub script_pubkey: ByteString,
}

/// Transaction: 𝒯𝒳 = ℕ × ℐ* × 𝒯* × ℕ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub version: u32,
    pub inputs: Vec<TransactionInput>,
    pub outputs: Vec<TransactionOutput>,
    pub lock_time: u32,
}

impl Transaction {
    /// A generation (coinbase) transaction has exactly one input, the generation input
    pub fn is_generation(&self) -> bool {
        self.inputs.len() == 1 && self.inputs[0].is_generation()
    }

    /// Distinct source transactions referenced by the non-generation inputs, in input order
    pub fn source_hashes(&self) -> Vec<Hash> {
        let mut sources: Vec<Hash> = Vec::new();
        for input in self.inputs.iter().filter(|i| !i.is_generation()) {
            if !sources.contains(&input.prevout.hash) {
                sources.push(input.prevout.hash);
            }
        }
        sources
    }

    pub fn total_output_value(&self) -> Integer {
        self.outputs.iter().map(|o| o.value).sum()
    }
}

/// Block Header: ℋ = ℤ × ℍ × ℍ × ℕ × ℕ × ℕ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block_hash: Hash,
    pub merkle_root: Hash,
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

/// Block: ℬ = ℋ × 𝒯𝒳*
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Transaction>,
}

/// Where a block sits relative to the best chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockStatus {
    /// On the best chain, transaction effects applied
    Active,
    /// Known and connected to the block tree, but not on the best chain
    Fork,
    /// Failed to attach; never considered for the best chain again
    Invalid,
}

/// Per-block index record
///
/// Height and chain work are fixed once the record exists; `next_block_hash` is only
/// set on `Active` blocks that have an `Active` child, forming the best-chain list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockInfo {
    pub previous_block_hash: Hash,
    pub height: Natural,
    pub chain_work: ChainWork,
    pub next_block_hash: Option<Hash>,
    pub transaction_count: u32,
    pub status: BlockStatus,
}

/// Location of a confirmed transaction inside a stored block
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxLocator {
    pub block_hash: Hash,
    pub index: u32,
}

/// Confirmed transaction record, the authoritative UTXO record for its outputs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionDescriptor {
    pub locator: TxLocator,
    pub height: Natural,
    /// One slot per output; `None` = unspent
    pub outputs_spent_by: Vec<Option<InPoint>>,
}

/// Unconfirmed transaction record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolEntry {
    pub transaction: Transaction,
    /// Unix seconds at admission; FIFO eviction order
    pub admitted_at: Natural,
    /// Admission sequence, breaks ties between equal timestamps
    pub sequence: Natural,
    pub outputs_spent_by: Vec<Option<InPoint>>,
}

/// Per-block confirmation context handed to the Magnet when attaching a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Confirmation {
    pub locator: TxLocator,
    pub height: Natural,
}
