//! Proof-of-work accounting: compact targets, header checks, and cumulative chain work
//!
//! A header only earns the work its `bits` claim once its hash meets that target.
//! Difficulty retargeting is not modelled.

use std::fmt;
use std::ops::Add;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::error::{ChainError, Result};
use crate::types::*;

/// Cumulative estimated hashing effort, unbounded and totally ordered
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainWork(BigUint);

impl ChainWork {
    pub fn zero() -> Self {
        ChainWork(BigUint::default())
    }

    pub fn from_u64(value: u64) -> Self {
        ChainWork(BigUint::from(value))
    }
}

impl Add<&ChainWork> for &ChainWork {
    type Output = ChainWork;

    fn add(self, rhs: &ChainWork) -> ChainWork {
        ChainWork(&self.0 + &rhs.0)
    }
}

impl fmt::Display for ChainWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// ExpandTarget: ℕ → ℕ
///
/// The compact form 0xEEMMMMMM encodes target = M × 256^(E − 3), where the top
/// mantissa bit is a sign bit. Negative, zero, and > 256-bit targets are invalid.
pub fn expand_target(bits: u32) -> Result<BigUint> {
    let exponent = bits >> 24;
    let mantissa = bits & 0x007fffff;

    if bits & 0x00800000 != 0 && mantissa != 0 {
        return Err(ChainError::InvalidTarget(bits));
    }

    let target = if exponent <= 3 {
        BigUint::from(mantissa >> (8 * (3 - exponent)))
    } else {
        BigUint::from(mantissa) << (8 * (exponent - 3)) as usize
    };

    if target == BigUint::default() || target.bits() > 256 {
        return Err(ChainError::InvalidTarget(bits));
    }

    Ok(target)
}

/// Work(h) = 2^256 / (target(h) + 1)
pub fn block_work(header: &BlockHeader) -> Result<ChainWork> {
    let target = expand_target(header.bits)?;
    let numerator = BigUint::from(1u8) << 256usize;
    Ok(ChainWork(numerator / (target + 1u8)))
}

/// CheckProofOfWork: ℋ → {true, false}
///
/// Formula: LE(SHA256(SHA256(header))) ≤ ExpandTarget(header.bits)
pub fn check_proof_of_work(header: &BlockHeader) -> Result<bool> {
    let target = expand_target(header.bits)?;
    let hash_value = BigUint::from_bytes_le(&header.hash());
    Ok(hash_value <= target)
}

/// MineHeader: ℋ × ℕ → ℋ × {success, failure}
///
/// 1. Try nonces from zero upwards, at most `max_attempts` of them
/// 2. Stop at the first header that passes CheckProofOfWork
pub fn mine_header(header: &mut BlockHeader, max_attempts: Natural) -> Result<bool> {
    let target = expand_target(header.bits)?;
    for nonce in 0..max_attempts.min(1 << 32) {
        header.nonce = nonce as u32;
        if BigUint::from_bytes_le(&header.hash()) <= target {
            return Ok(true);
        }
    }
    Ok(false)
}
