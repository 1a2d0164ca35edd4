//! Chain-engine constants

use crate::types::Hash;

/// All-zero hash: previous hash of genesis, and the hash half of the generation outpoint
pub const ZERO_HASH: Hash = [0u8; 32];

/// Output index carried by a generation input
pub const GENERATION_INPUT_INDEX: u32 = 0xffffffff;

/// Maximum money supply: 21,000,000 coins in base units
pub const MAX_MONEY: i64 = 21_000_000 * 100_000_000;

/// Maximum number of inputs per transaction
pub const MAX_INPUTS: usize = 1000;

/// Maximum number of outputs per transaction
pub const MAX_OUTPUTS: usize = 1000;

/// Maximum serialized transaction size: 1MB
pub const MAX_TX_SIZE: usize = 1_000_000;

/// Serialized block header size
pub const BLOCK_HEADER_SIZE: usize = 80;

/// Sequence number for final inputs
pub const SEQUENCE_FINAL: u32 = 0xffffffff;

/// Default cap on orphan blocks held in memory
pub const DEFAULT_MAX_ORPHAN_BLOCKS: usize = 750;

/// Default cap on orphan transactions held in memory
pub const DEFAULT_MAX_ORPHAN_TRANSACTIONS: usize = 100;

/// Default cap on the total serialized size of one orphan store: 5MB
pub const DEFAULT_MAX_ORPHAN_BYTES: usize = 5_000_000;

/// Default cap on pool entries before FIFO eviction
pub const DEFAULT_MAX_POOL_TRANSACTIONS: usize = 50_000;

/// Default bound on the number of blocks a single reorganization may detach
pub const DEFAULT_MAX_REORGANIZATION_DEPTH: u64 = 10_000;
