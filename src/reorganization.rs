//! Chain reorganization: switch the best chain to a heavier branch

use tracing::{error, info, warn};

use crate::constants::ZERO_HASH;
use crate::error::{ChainError, Result};
use crate::magnet::{BlockAttach, Magnet};
use crate::serialize::hash_to_hex;
use crate::storage::{ChainRead, KeyValueStore, StoreTransaction};
use crate::types::*;

/// Blocks to detach and attach to move from one tip to another
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForkPath {
    pub fork_point: Hash,
    /// Current chain, tip first, fork point excluded
    pub detach: Vec<Hash>,
    /// Candidate chain, fork point excluded, tip last
    pub attach: Vec<Hash>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reorganization {
    pub fork_point: Hash,
    pub detached: Vec<Hash>,
    pub attached: Vec<Hash>,
    /// Former confirmed transactions to offer back to the pool: non-generation
    /// transactions of the detached blocks fork-to-tip, then displaced pool entries
    pub readmit: Vec<(Hash, Transaction)>,
    /// Pool transactions evicted by conflicts with the attached blocks
    pub evicted: Vec<Hash>,
    /// Pool transactions confirmed by the attached blocks
    pub promoted: Vec<Hash>,
}

/// FindForkPoint: ℍ × ℍ → ℍ × ℍ* × ℍ*
///
/// 1. Step the higher of the two tips back through parent links until both sit at
///    the same height, collecting the blocks passed
/// 2. Step both back together until they meet; the meeting block is the fork point
/// 3. Running out of known ancestors means the index is corrupt
pub fn find_fork_point<R: ChainRead + ?Sized>(read: &R, current_tip: &Hash, candidate_tip: &Hash) -> Result<ForkPath> {
    let not_found = || ChainError::ForkPointNotFound { current: *current_tip, candidate: *candidate_tip };

    let mut current = *current_tip;
    let mut candidate = *candidate_tip;
    let mut current_info = read.block_info(&current)?.ok_or_else(not_found)?;
    let mut candidate_info = read.block_info(&candidate)?.ok_or_else(not_found)?;
    let mut detach = Vec::new();
    let mut attach = Vec::new();

    while current != candidate {
        if current_info.height >= candidate_info.height {
            detach.push(current);
            current = current_info.previous_block_hash;
            if current == ZERO_HASH {
                return Err(not_found());
            }
            current_info = read.block_info(&current)?.ok_or_else(not_found)?;
        } else {
            attach.push(candidate);
            candidate = candidate_info.previous_block_hash;
            if candidate == ZERO_HASH {
                return Err(not_found());
            }
            candidate_info = read.block_info(&candidate)?.ok_or_else(not_found)?;
        }
    }

    attach.reverse();
    Ok(ForkPath { fork_point: current, detach, attach })
}

/// Reorganize: ℍ × ℍ → Reorganization
///
/// 1. Find the fork point; refuse to detach more than `max_depth` blocks
/// 2. Detach blocks from the current tip down to the fork point, one commit each
/// 3. Attach blocks from the fork point up to the candidate tip, one commit each
/// 4. On an attach failure, detach what was attached so the chain rests at the fork
///    point, mark the failing block and its candidate descendants Invalid, and return
///    `ReorganizationAborted`; the original branch is not restored
///
/// The best tip moves with each commit, so storage always holds exactly one tip.
pub fn reorganize(
    magnet: &Magnet<'_>,
    store: &dyn KeyValueStore,
    current_tip: &Hash,
    candidate_tip: &Hash,
    max_depth: u64,
) -> Result<Reorganization> {
    // 1. Find fork point
    let path = {
        let txn = StoreTransaction::new(store);
        find_fork_point(&txn, current_tip, candidate_tip)?
    };
    let depth = path.detach.len() as u64;
    if depth > max_depth {
        return Err(ChainError::ReorganizationTooDeep { depth, limit: max_depth });
    }

    // 2. Detach current chain, tip first
    let mut detached_blocks = Vec::with_capacity(path.detach.len());
    let mut displaced = Vec::new();
    for hash in &path.detach {
        let mut txn = StoreTransaction::new(store);
        let detach = magnet.detach_block(&mut txn, hash)?;
        txn.commit()?;
        displaced.extend(detach.displaced);
        detached_blocks.push(detach.block);
    }

    // 3. Attach candidate chain, fork point first
    let mut attached = Vec::with_capacity(path.attach.len());
    let mut evicted = Vec::new();
    let mut promoted = Vec::new();
    for (position, hash) in path.attach.iter().enumerate() {
        match attach_stored(magnet, store, hash) {
            Ok(attach) => {
                evicted.extend(attach.evicted);
                promoted.extend(attach.promoted);
                attached.push(*hash);
            }
            Err(reason) => {
                // 4. Abort at the fork point
                error!(
                    fork_point = %hash_to_hex(&path.fork_point),
                    failed_block = %hash_to_hex(hash),
                    %reason,
                    "reorganization failed, unwinding to fork point"
                );
                abort(magnet, store, &attached, &path.attach[position..])?;
                return Err(ChainError::ReorganizationAborted {
                    fork_point: path.fork_point,
                    failed_block: *hash,
                    reason: Box::new(reason),
                });
            }
        }
    }

    let mut readmit = Vec::new();
    for block in detached_blocks.iter().rev() {
        for tx in block.transactions.iter().filter(|tx| !tx.is_generation()) {
            readmit.push((tx.hash(), tx.clone()));
        }
    }
    readmit.extend(displaced);

    info!(
        fork_point = %hash_to_hex(&path.fork_point),
        new_tip = %hash_to_hex(candidate_tip),
        detached = path.detach.len(),
        attached = attached.len(),
        "reorganized best chain"
    );

    Ok(Reorganization {
        fork_point: path.fork_point,
        detached: path.detach,
        attached,
        readmit,
        evicted,
        promoted,
    })
}

fn attach_stored(magnet: &Magnet<'_>, store: &dyn KeyValueStore, hash: &Hash) -> Result<BlockAttach> {
    let mut txn = StoreTransaction::new(store);
    let block = txn.require_block(hash)?;
    let attach = magnet.attach_block(&mut txn, hash, &block)?;
    txn.commit()?;
    Ok(attach)
}

fn abort(magnet: &Magnet<'_>, store: &dyn KeyValueStore, attached: &[Hash], invalid: &[Hash]) -> Result<()> {
    for hash in attached.iter().rev() {
        let mut txn = StoreTransaction::new(store);
        magnet.detach_block(&mut txn, hash)?;
        txn.commit()?;
    }
    let mut txn = StoreTransaction::new(store);
    for hash in invalid {
        warn!(hash = %hash_to_hex(hash), "marking block invalid");
        magnet.mark_invalid(&mut txn, hash)?;
    }
    txn.commit()
}
