//! Transaction pool priority queue for block template construction

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, HashMap, HashSet};

use crate::error::{ChainError, Result};
use crate::ledger;
use crate::storage::ChainRead;
use crate::types::*;

#[derive(Debug, Clone, PartialEq, Eq)]
struct QueueEntry {
    fee: Integer,
    sequence: Natural,
    hash: Hash,
}

impl Ord for QueueEntry {
    /// Higher fee first, then earlier admission
    fn cmp(&self, other: &Self) -> Ordering {
        self.fee
            .cmp(&other.fee)
            .then_with(|| Reverse(self.sequence).cmp(&Reverse(other.sequence)))
            .then_with(|| self.hash.cmp(&other.hash))
    }
}

impl PartialOrd for QueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

#[derive(Debug, Clone)]
struct Pending {
    transaction: Transaction,
    fee: Integer,
    /// Unconfirmed sources, which must be dequeued first
    parents: Vec<Hash>,
}

/// Fee-ordered, dependency-aware queue over unconfirmed transactions
///
/// A transaction is only handed out once every unconfirmed transaction it spends has
/// been handed out by this same queue. Entries whose parents are still pending are
/// set aside under one of those parents and return to the heap when it is dequeued.
#[derive(Debug, Default)]
pub struct PriorityQueue {
    heap: BinaryHeap<QueueEntry>,
    pending: HashMap<Hash, Pending>,
    waiting: HashMap<Hash, Vec<QueueEntry>>,
    dequeued: HashSet<Hash>,
    outputs: HashMap<Hash, Vec<TransactionOutput>>,
    next_sequence: Natural,
}

impl PriorityQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue: 𝒯𝒳 → ℤ
    ///
    /// fee = Σ input amounts − Σ output amounts, with each input resolved through an
    /// earlier enqueue, a confirmed descriptor, or a pool entry (in that order). An
    /// unresolvable input fails with `ParentTransactionNotFound`; the queue does not
    /// resolve orphans.
    pub fn enqueue<R: ChainRead + ?Sized>(&mut self, read: &R, tx: Transaction) -> Result<Hash> {
        let hash = tx.hash();
        if tx.is_generation() {
            return Err(ChainError::GenerationOutsideBlock(hash));
        }
        if self.pending.contains_key(&hash) || self.dequeued.contains(&hash) {
            return Err(ChainError::DuplicateTransaction(hash));
        }

        let mut input_value: Integer = 0;
        let mut parents = Vec::new();
        for input in &tx.inputs {
            let parent = input.prevout.hash;
            let output = if let Some(outputs) = self.outputs.get(&parent) {
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
                outputs.get(input.prevout.index as usize).cloned()
            } else if read.descriptor(&parent)?.is_some() {
                ledger::resolve_output(read, &input.prevout)?
            } else if let Some(entry) = read.pool_entry(&parent)? {
                if !parents.contains(&parent) {
                    parents.push(parent);
                }
                entry.transaction.outputs.get(input.prevout.index as usize).cloned()
            } else {
                return Err(ChainError::ParentTransactionNotFound { transaction: hash, parent });
            };
            input_value += output.ok_or(ChainError::OutputIndexOutOfRange(input.prevout))?.value;
        }

        let fee = input_value - tx.total_output_value();
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        self.outputs.insert(hash, tx.outputs.clone());
        self.pending.insert(hash, Pending { transaction: tx, fee, parents });
        self.heap.push(QueueEntry { fee, sequence, hash });
        Ok(hash)
    }

    /// Dequeue: the highest-fee ready transaction, ties by enqueue order
    pub fn dequeue(&mut self) -> Option<Transaction> {
        while let Some(entry) = self.heap.pop() {
            let blocked = match self.pending.get(&entry.hash) {
                Some(pending) => pending.parents.iter().find(|p| !self.dequeued.contains(*p)).copied(),
                // Removed after being queued
                None => continue,
            };
            if let Some(parent) = blocked {
                self.waiting.entry(parent).or_default().push(entry);
                continue;
            }

            let pending = self.pending.remove(&entry.hash)?;
            self.dequeued.insert(entry.hash);
            if let Some(released) = self.waiting.remove(&entry.hash) {
                self.heap.extend(released);
            }
            return Some(pending.transaction);
        }
        None
    }

    /// Fee of a queued transaction
    pub fn fee(&self, hash: &Hash) -> Option<Integer> {
        self.pending.get(hash).map(|pending| pending.fee)
    }

    /// Drop a queued transaction; its descendants can then never become ready
    pub fn remove(&mut self, hash: &Hash) -> Option<Transaction> {
        self.pending.remove(hash).map(|pending| pending.transaction)
    }

    /// Transactions enqueued and not yet dequeued or removed
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
