//! Error types for chain management

use thiserror::Error;

use crate::serialize::hash_to_hex;
use crate::types::{Hash, InPoint, OutPoint};

/// How a caller must treat a [`ChainError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Parent missing: park the payload as an orphan, do not report failure
    Orphan,
    /// Consensus violation: drop the payload and report it
    Rejected,
    /// Corrupted or inconsistent state: stop mutating the chain
    Fatal,
}

#[derive(Error, Debug)]
pub enum ChainError {
    #[error("parent block {} of {} not found", hash_to_hex(.parent), hash_to_hex(.block))]
    ParentBlockNotFound { block: Hash, parent: Hash },

    #[error("parent transaction {} of {} not found", hash_to_hex(.parent), hash_to_hex(.transaction))]
    ParentTransactionNotFound { transaction: Hash, parent: Hash },

    #[error("output {outpoint:?} already spent by {spent_by:?}")]
    OutputAlreadySpent { outpoint: OutPoint, spent_by: InPoint },

    #[error("output {0:?} does not exist")]
    OutputIndexOutOfRange(OutPoint),

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("bad merkle root: header commits to {}, transactions hash to {}", hash_to_hex(.expected), hash_to_hex(.found))]
    BadMerkleRoot { expected: Hash, found: Hash },

    #[error("cannot calculate merkle root for empty transaction list")]
    EmptyMerkleTree,

    #[error("payload hashes to {}, announced as {}", hash_to_hex(.computed), hash_to_hex(.claimed))]
    HashMismatch { claimed: Hash, computed: Hash },

    #[error("transaction {} already known", hash_to_hex(.0))]
    DuplicateTransaction(Hash),

    #[error("generation transaction {} outside a block", hash_to_hex(.0))]
    GenerationOutsideBlock(Hash),

    #[error("invalid compact target {0:#010x}")]
    InvalidTarget(u32),

    #[error("block {} claims genesis but a chain already exists", hash_to_hex(.0))]
    UnexpectedGenesis(Hash),

    #[error("reorganization depth {depth} exceeds limit {limit}")]
    ReorganizationTooDeep { depth: u64, limit: u64 },

    #[error("output {0:?} is not spent")]
    NotSpent(OutPoint),

    #[error("output {outpoint:?} still spent by attached input {spent_by:?}")]
    OutputStillSpent { outpoint: OutPoint, spent_by: InPoint },

    #[error("block {} is not the best tip", hash_to_hex(.0))]
    NotBestTip(Hash),

    #[error("no fork point between {} and {}", hash_to_hex(.current), hash_to_hex(.candidate))]
    ForkPointNotFound { current: Hash, candidate: Hash },

    #[error("missing {kind} record for {}", hash_to_hex(.hash))]
    MissingRecord { kind: &'static str, hash: Hash },

    #[error("reorganization aborted at fork point {}: block {} failed: {}", hash_to_hex(.fork_point), hash_to_hex(.failed_block), .reason)]
    ReorganizationAborted {
        fork_point: Hash,
        failed_block: Hash,
        reason: Box<ChainError>,
    },

    #[error("chain state halted after a fatal error")]
    Halted,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ChainError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChainError::ParentBlockNotFound { .. } | ChainError::ParentTransactionNotFound { .. } => {
                ErrorKind::Orphan
            }
            ChainError::OutputAlreadySpent { .. }
            | ChainError::OutputIndexOutOfRange(_)
            | ChainError::Validation(_)
            | ChainError::BadMerkleRoot { .. }
            | ChainError::EmptyMerkleTree
            | ChainError::HashMismatch { .. }
            | ChainError::DuplicateTransaction(_)
            | ChainError::GenerationOutsideBlock(_)
            | ChainError::InvalidTarget(_)
            | ChainError::UnexpectedGenesis(_)
            | ChainError::ReorganizationTooDeep { .. } => ErrorKind::Rejected,
            ChainError::NotSpent(_)
            | ChainError::OutputStillSpent { .. }
            | ChainError::NotBestTip(_)
            | ChainError::ForkPointNotFound { .. }
            | ChainError::MissingRecord { .. }
            | ChainError::ReorganizationAborted { .. }
            | ChainError::Halted
            | ChainError::Storage(_)
            | ChainError::Serialization(_) => ErrorKind::Fatal,
        }
    }

    pub fn is_orphan(&self) -> bool {
        self.kind() == ErrorKind::Orphan
    }

    pub fn is_fatal(&self) -> bool {
        self.kind() == ErrorKind::Fatal
    }
}

pub type Result<T> = std::result::Result<T, ChainError>;
