//! UTXO Ledger Index: which input, if any, spends each output
//!
//! Spent-by markers live next to the outputs they describe, in the confirmed
//! [`TransactionDescriptor`] or in the unconfirmed [`PoolEntry`]. A confirmed record
//! always takes precedence over a pool record for the same hash.

use crate::error::{ChainError, Result};
use crate::storage::{ChainRead, StoreTransaction};
use crate::types::*;

/// Spentness record of one transaction, wherever it currently lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LedgerRecord {
    Confirmed(TransactionDescriptor),
    Pooled(PoolEntry),
}

impl LedgerRecord {
    pub fn outputs_spent_by(&self) -> &[Option<InPoint>] {
        match self {
            LedgerRecord::Confirmed(descriptor) => &descriptor.outputs_spent_by,
            LedgerRecord::Pooled(entry) => &entry.outputs_spent_by,
        }
    }

    fn outputs_spent_by_mut(&mut self) -> &mut Vec<Option<InPoint>> {
        match self {
            LedgerRecord::Confirmed(descriptor) => &mut descriptor.outputs_spent_by,
            LedgerRecord::Pooled(entry) => &mut entry.outputs_spent_by,
        }
    }

    pub fn is_confirmed(&self) -> bool {
        matches!(self, LedgerRecord::Confirmed(_))
    }
}

/// Descriptor lookup, confirmed first
pub fn lookup<R: ChainRead + ?Sized>(read: &R, hash: &Hash) -> Result<Option<LedgerRecord>> {
    if let Some(descriptor) = read.descriptor(hash)? {
        return Ok(Some(LedgerRecord::Confirmed(descriptor)));
    }
    Ok(read.pool_entry(hash)?.map(LedgerRecord::Pooled))
}

fn store(txn: &mut StoreTransaction<'_>, hash: &Hash, record: &LedgerRecord) -> Result<()> {
    match record {
        LedgerRecord::Confirmed(descriptor) => txn.put_descriptor(hash, descriptor),
        LedgerRecord::Pooled(entry) => txn.put_pool_entry(hash, entry),
    }
}

fn require(txn: &StoreTransaction<'_>, outpoint: &OutPoint, spender: &Hash) -> Result<LedgerRecord> {
    lookup(txn, &outpoint.hash)?.ok_or(ChainError::ParentTransactionNotFound {
        transaction: *spender,
        parent: outpoint.hash,
    })
}

/// Current spender of `outpoint`; `None` when unspent
pub fn spent_by<R: ChainRead + ?Sized>(read: &R, outpoint: &OutPoint) -> Result<Option<InPoint>> {
    let record = lookup(read, &outpoint.hash)?.ok_or(ChainError::MissingRecord {
        kind: "transaction descriptor",
        hash: outpoint.hash,
    })?;
    record
        .outputs_spent_by()
        .get(outpoint.index as usize)
        .copied()
        .ok_or(ChainError::OutputIndexOutOfRange(*outpoint))
}

/// Spend: mark `outpoint` spent by `inpoint`
///
/// Re-spending with the same `inpoint` is a no-op; any other existing spender is a
/// double spend.
pub fn spend(txn: &mut StoreTransaction<'_>, outpoint: &OutPoint, inpoint: &InPoint) -> Result<()> {
    let mut record = require(txn, outpoint, &inpoint.hash)?;
    let slot = record
        .outputs_spent_by_mut()
        .get_mut(outpoint.index as usize)
        .ok_or(ChainError::OutputIndexOutOfRange(*outpoint))?;
    match *slot {
        Some(existing) if existing == *inpoint => return Ok(()),
        Some(existing) => {
            return Err(ChainError::OutputAlreadySpent { outpoint: *outpoint, spent_by: existing })
        }
        None => *slot = Some(*inpoint),
    }
    store(txn, &outpoint.hash, &record)
}

/// Unspend: clear the marker on `outpoint`, returning the input that held it
pub fn unspend(txn: &mut StoreTransaction<'_>, outpoint: &OutPoint) -> Result<InPoint> {
    let mut record = lookup(&*txn, &outpoint.hash)?.ok_or(ChainError::MissingRecord {
        kind: "transaction descriptor",
        hash: outpoint.hash,
    })?;
    let previous = record
        .outputs_spent_by_mut()
        .get_mut(outpoint.index as usize)
        .ok_or(ChainError::OutputIndexOutOfRange(*outpoint))?
        .take()
        .ok_or(ChainError::NotSpent(*outpoint))?;
    store(txn, &outpoint.hash, &record)?;
    Ok(previous)
}

/// Clear every spent-by marker of `hash`'s outputs
pub fn mark_all_unspent(txn: &mut StoreTransaction<'_>, hash: &Hash) -> Result<()> {
    let mut record = lookup(&*txn, hash)?.ok_or(ChainError::MissingRecord {
        kind: "transaction descriptor",
        hash: *hash,
    })?;
    if record.outputs_spent_by().iter().all(Option::is_none) {
        return Ok(());
    }
    record.outputs_spent_by_mut().iter_mut().for_each(|slot| *slot = None);
    store(txn, hash, &record)
}

/// The output `outpoint` refers to, from a confirmed block or the pool
pub fn resolve_output<R: ChainRead + ?Sized>(
    read: &R,
    outpoint: &OutPoint,
) -> Result<Option<TransactionOutput>> {
    let tx = match read.transaction(&outpoint.hash)? {
        Some(tx) => tx,
        None => return Ok(None),
    };
    tx.outputs
        .into_iter()
        .nth(outpoint.index as usize)
        .map(Some)
        .ok_or(ChainError::OutputIndexOutOfRange(*outpoint))
}
