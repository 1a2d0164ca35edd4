//! # Chain-Engine
//!
//! Chain management for a proof-of-work ledger: indexes blocks and transactions,
//! tracks which outputs are spent, holds payloads whose parents are missing, keeps
//! the best chain (greatest cumulative work) and switches to a heavier branch when
//! one appears.
//!
//! ## Architecture
//!
//! The engine sits between two collaborators it does not own:
//! - Storage ([`storage::KeyValueStore`]): namespaced records committed in atomic batches
//! - Validation ([`validation::Validator`]): context-free block checks and
//!   per-transaction verification
//!
//! and is layered as:
//! - Orphan Store (payloads waiting for a parent, linked through a hash graph)
//! - Ledger Index (spent markers on confirmed and pooled transactions)
//! - Magnet (attach and detach of transactions and blocks)
//! - Reorganization (fork point search and branch switch)
//! - Block and Transaction Processors (the public write path)
//!
//! ## Design Principles
//!
//! 1. **Atomic Steps**: every block attach or detach commits as one storage batch
//! 2. **Single Writer**: all mutations run under one exclusive lock
//! 3. **Fail Stop**: a fatal error halts mutation until an operator clears it
//!
//! ## Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use chain_engine::{ChainConfig, ChainEngine};
//! use chain_engine::storage::MemoryStore;
//! use chain_engine::validation::ConsensusValidator;
//!
//! let engine = ChainEngine::open(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(ConsensusValidator::new()),
//!     ChainConfig::default(),
//! )
//! .unwrap();
//! assert_eq!(engine.best_tip().unwrap(), None);
//! ```

pub mod types;
pub mod constants;
pub mod error;
pub mod serialize;
pub mod merkle;
pub mod pow;
pub mod config;
pub mod storage;
pub mod hash_graph;
pub mod orphan;
pub mod ledger;
pub mod validation;
pub mod magnet;
pub mod reorganization;
pub mod mempool;
pub mod events;
pub mod processor;

// Re-export commonly used types
pub use types::*;
pub use constants::*;
pub use config::ChainConfig;
pub use error::{ChainError, ErrorKind, Result};
pub use events::{ChainEvent, ChainListener};
pub use processor::{BlockProcessor, ChainContext, ChainState, TransactionProcessor};

use std::sync::Arc;

use storage::{KeyValueStore, StoreView};
use validation::Validator;

/// Main chain engine handle
///
/// Cheap to clone; every clone drives the same chain state.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use chain_engine::{ChainConfig, ChainEngine};
/// use chain_engine::types::*;
/// use chain_engine::merkle::block_merkle_root;
/// use chain_engine::pow::mine_header;
/// use chain_engine::storage::MemoryStore;
/// use chain_engine::validation::ConsensusValidator;
///
/// let engine = ChainEngine::open(
///     Arc::new(MemoryStore::new()),
///     Arc::new(ConsensusValidator::new()),
///     ChainConfig::default(),
/// )
/// .unwrap();
///
/// // Genesis: a single generation transaction
/// let mut genesis = Block {
///     header: BlockHeader {
///         version: 1,
///         prev_block_hash: [0; 32],
///         merkle_root: [0; 32],
///         timestamp: 1231006505,
///         bits: 0x207fffff,
///         nonce: 0,
///     },
///     transactions: vec![Transaction {
///         version: 1,
///         inputs: vec![TransactionInput {
///             prevout: OutPoint { hash: [0; 32], index: 0xffffffff },
///             script_sig: vec![0x00],
///             sequence: 0xffffffff,
///         }],
///         outputs: vec![TransactionOutput {
///             value: 5000000000, // 50 BTC
///             script_pubkey: vec![0x51],
///         }],
///         lock_time: 0,
///     }],
/// };
/// genesis.header.merkle_root = block_merkle_root(&genesis).unwrap();
/// assert!(mine_header(&mut genesis.header, 1_000).unwrap());
///
/// let hash = genesis.hash();
/// assert_eq!(engine.blocks().accept(hash, genesis).unwrap(), vec![hash]);
/// assert_eq!(engine.best_tip().unwrap(), Some(hash));
/// ```
#[derive(Clone)]
pub struct ChainEngine {
    state: Arc<ChainState>,
}

impl ChainEngine {
    /// Open the engine over a store, rebuilding in-memory state from it
    pub fn open(
        store: Arc<dyn KeyValueStore>,
        validator: Arc<dyn Validator>,
        config: ChainConfig,
    ) -> Result<Self> {
        Self::with_context(ChainContext::new(store, validator, config))
    }

    pub fn with_context(context: ChainContext) -> Result<Self> {
        Ok(Self { state: Arc::new(ChainState::open(context)?) })
    }

    /// Block processor over this engine's state
    pub fn blocks(&self) -> BlockProcessor {
        BlockProcessor::new(self.state.clone())
    }

    /// Transaction processor over this engine's state
    pub fn transactions(&self) -> TransactionProcessor {
        TransactionProcessor::new(self.state.clone())
    }

    /// Register a listener for chain events
    pub fn subscribe(&self, listener: Arc<dyn ChainListener>) {
        self.state.subscribe(listener)
    }

    pub fn best_tip(&self) -> Result<Option<Hash>> {
        self.state.best_tip()
    }

    pub fn block_info(&self, hash: &Hash) -> Result<Option<BlockInfo>> {
        self.blocks().block_info(hash)
    }

    /// Pool transactions in admission order
    pub fn pool_transactions(&self) -> Result<Vec<Transaction>> {
        self.state.pool_transactions()
    }

    /// Up to `max` pool transactions, highest fee first, parents before children
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use chain_engine::{ChainConfig, ChainEngine};
    /// use chain_engine::storage::MemoryStore;
    /// use chain_engine::validation::ConsensusValidator;
    ///
    /// let engine = ChainEngine::open(
    ///     Arc::new(MemoryStore::new()),
    ///     Arc::new(ConsensusValidator::new()),
    ///     ChainConfig::default(),
    /// )
    /// .unwrap();
    /// assert!(engine.block_template(100).unwrap().is_empty());
    /// ```
    pub fn block_template(&self, max: usize) -> Result<Vec<Transaction>> {
        self.state.block_template(max)
    }

    /// The input currently spending `outpoint`, if any
    pub fn spent_by(&self, outpoint: &OutPoint) -> Result<Option<InPoint>> {
        self.state.read(|_, view| ledger::spent_by(&view, outpoint))
    }

    pub fn is_halted(&self) -> bool {
        self.state.is_halted()
    }

    /// Operator action: resume after a fatal error
    pub fn clear_halt(&self) -> Result<()> {
        self.state.clear_halt()
    }

    /// Run a read against committed storage under the shared chain lock
    pub fn view<T>(&self, f: impl FnOnce(StoreView<'_>) -> Result<T>) -> Result<T> {
        self.state.read(|_, view| f(view))
    }

    pub fn context(&self) -> &ChainContext {
        self.state.context()
    }
}
