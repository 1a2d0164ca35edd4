//! Merkle root calculation

use crate::error::{ChainError, Result};
use crate::serialize::hash_pair;
use crate::types::*;

/// MerkleRoot: ℍ⁺ → ℍ
///
/// For leaf hashes [h1, ..., hn]:
/// 1. If n = 0: precondition failure, a block always carries its generation transaction
/// 2. While more than one hash remains, pair adjacent hashes and double-hash each pair,
///    duplicating the last hash of an odd-sized level
/// 3. Return the remaining hash (a single leaf is returned unchanged)
pub fn calculate(hashes: &[Hash]) -> Result<Hash> {
    if hashes.is_empty() {
        return Err(ChainError::EmptyMerkleTree);
    }

    let mut level = hashes.to_vec();
    while level.len() > 1 {
        let mut next_level = Vec::with_capacity((level.len() + 1) / 2);
        for chunk in level.chunks(2) {
            let right = chunk.get(1).unwrap_or(&chunk[0]);
            next_level.push(hash_pair(&chunk[0], right));
        }
        level = next_level;
    }

    Ok(level[0])
}

/// Merkle root over a block's transactions, in block order
pub fn block_merkle_root(block: &Block) -> Result<Hash> {
    calculate(&block.transaction_hashes())
}
