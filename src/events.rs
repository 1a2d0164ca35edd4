//! Chain notifications for the networking and wallet collaborators

use crate::types::Hash;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// A block joined the best chain
    BlockAttached { hash: Hash, height: u64 },
    /// A block left the best chain during a reorganization
    BlockDetached { hash: Hash, height: u64 },
    /// A transaction entered the pool
    TransactionAdmitted { hash: Hash },
    /// A transaction left the pool without being confirmed
    TransactionEvicted { hash: Hash },
    /// Chain mutation stopped after a fatal error
    Halted { reason: String },
}

/// Receiver of [`ChainEvent`]s, called after the chain lock is released
pub trait ChainListener: Send + Sync {
    fn on_event(&self, event: &ChainEvent);
}
