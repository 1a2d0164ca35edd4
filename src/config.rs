//! Chain engine configuration

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::constants::*;

/// Resource limits for the chain engine
///
/// Every field is optional in the JSON form; missing fields take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChainConfig {
    /// Maximum number of orphan blocks held before the oldest is evicted
    pub max_orphan_blocks: usize,
    /// Maximum number of orphan transactions held before the oldest is evicted
    pub max_orphan_transactions: usize,
    /// Maximum total serialized size of each orphan store
    pub max_orphan_bytes: usize,
    /// Maximum pool size before FIFO eviction
    pub max_pool_transactions: usize,
    /// Maximum number of blocks a reorganization may detach
    pub max_reorganization_depth: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            max_orphan_blocks: DEFAULT_MAX_ORPHAN_BLOCKS,
            max_orphan_transactions: DEFAULT_MAX_ORPHAN_TRANSACTIONS,
            max_orphan_bytes: DEFAULT_MAX_ORPHAN_BYTES,
            max_pool_transactions: DEFAULT_MAX_POOL_TRANSACTIONS,
            max_reorganization_depth: DEFAULT_MAX_REORGANIZATION_DEPTH,
        }
    }
}

impl ChainConfig {
    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        serde_json::from_str(json).context("parsing chain configuration")
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading chain configuration from {}", path.display()))?;
        Self::from_json_str(&json)
    }
}
