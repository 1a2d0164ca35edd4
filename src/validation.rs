//! Validator collaborator: context-free block checks and per-transaction verification
//!
//! The engine consults a [`Validator`] before every attach and never proceeds on
//! failure. [`ConsensusValidator`] covers the structural rules; script and signature
//! checking belong to an external interpreter plugged in through the same trait.

use crate::constants::*;
use crate::error::{ChainError, Result};
use crate::types::*;

/// Outcome of a single rule check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationResult {
    Valid,
    Invalid(String),
}

impl ValidationResult {
    pub fn into_result(self) -> Result<()> {
        match self {
            ValidationResult::Valid => Ok(()),
            ValidationResult::Invalid(reason) => Err(ChainError::Validation(reason)),
        }
    }
}

pub trait Validator: Send + Sync {
    /// Checks that need nothing but the block itself
    fn validate_block(&self, block: &Block) -> Result<()>;

    /// Checks a transaction against the outputs its non-generation inputs spend,
    /// given in input order
    fn verify_transaction(&self, tx: &Transaction, spent_outputs: &[TransactionOutput]) -> Result<()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConsensusValidator;

impl ConsensusValidator {
    pub fn new() -> Self {
        ConsensusValidator
    }
}

impl Validator for ConsensusValidator {
    fn validate_block(&self, block: &Block) -> Result<()> {
        check_block(block)?.into_result()
    }

    fn verify_transaction(&self, tx: &Transaction, spent_outputs: &[TransactionOutput]) -> Result<()> {
        check_transaction(tx)?.into_result()?;
        check_tx_inputs(tx, spent_outputs)?.into_result()
    }
}

/// CheckTransaction: 𝒯𝒳 → {valid, invalid}
///
/// A transaction tx = (v, ins, outs, lt) is valid if and only if:
/// 1. |ins| > 0 ∧ |outs| > 0
/// 2. ∀o ∈ outs: 0 ≤ o.value ≤ M_max
/// 3. |ins| ≤ M_max_inputs
/// 4. |outs| ≤ M_max_outputs
/// 5. |tx| ≤ M_max_tx_size
pub fn check_transaction(tx: &Transaction) -> Result<ValidationResult> {
    // 1. Check inputs and outputs are not empty
    if tx.inputs.is_empty() || tx.outputs.is_empty() {
        return Ok(ValidationResult::Invalid("Empty inputs or outputs".to_string()));
    }

    // 2. Check output values are valid
    for (i, output) in tx.outputs.iter().enumerate() {
        if output.value < 0 || output.value > MAX_MONEY {
            return Ok(ValidationResult::Invalid(format!(
                "Invalid output value {} at index {}",
                output.value, i
            )));
        }
    }

    // 3. Check input count limit
    if tx.inputs.len() > MAX_INPUTS {
        return Ok(ValidationResult::Invalid(format!("Too many inputs: {}", tx.inputs.len())));
    }

    // 4. Check output count limit
    if tx.outputs.len() > MAX_OUTPUTS {
        return Ok(ValidationResult::Invalid(format!("Too many outputs: {}", tx.outputs.len())));
    }

    // 5. Check transaction size limit
    let tx_size = tx.size();
    if tx_size > MAX_TX_SIZE {
        return Ok(ValidationResult::Invalid(format!("Transaction too large: {} bytes", tx_size)));
    }

    Ok(ValidationResult::Valid)
}

/// CheckTxInputs: 𝒯𝒳 × 𝒯* → {valid, invalid}
///
/// For transaction tx spending outputs [o1, ..., on]:
/// 1. If tx is generation: valid, nothing is spent
/// 2. Each non-generation input must have exactly one referenced output
/// 3. Σ o.value ≥ Σ tx.outputs.value
pub fn check_tx_inputs(tx: &Transaction, spent_outputs: &[TransactionOutput]) -> Result<ValidationResult> {
    if tx.is_generation() {
        return Ok(ValidationResult::Valid);
    }

    if tx.inputs.iter().any(TransactionInput::is_generation) {
        return Ok(ValidationResult::Invalid("Generation input in ordinary transaction".to_string()));
    }

    if spent_outputs.len() != tx.inputs.len() {
        return Ok(ValidationResult::Invalid(format!(
            "Expected {} spent outputs, got {}",
            tx.inputs.len(),
            spent_outputs.len()
        )));
    }

    let total_input_value: i64 = spent_outputs.iter().map(|o| o.value).sum();
    if total_input_value < tx.total_output_value() {
        return Ok(ValidationResult::Invalid("Insufficient input value".to_string()));
    }

    Ok(ValidationResult::Valid)
}

/// CheckBlock: ℬ → {valid, invalid}
///
/// For block b = (h, txs):
/// 1. h.version ≥ 1 ∧ h.bits ≠ 0
/// 2. |txs| > 0
/// 3. txs[0] is the generation transaction, and no other transaction is
/// 4. Every tx ∈ txs passes CheckTransaction
pub fn check_block(block: &Block) -> Result<ValidationResult> {
    if block.header.version < 1 {
        return Ok(ValidationResult::Invalid(format!("Invalid block version {}", block.header.version)));
    }
    if block.header.bits == 0 {
        return Ok(ValidationResult::Invalid("Zero difficulty bits".to_string()));
    }

    let generation = match block.transactions.first() {
        Some(tx) => tx,
        None => {
            return Ok(ValidationResult::Invalid(
                "Block must have at least one transaction".to_string(),
            ))
        }
    };
    if !generation.is_generation() {
        return Ok(ValidationResult::Invalid("First transaction must be generation".to_string()));
    }
    if let Some(i) = block.transactions.iter().skip(1).position(Transaction::is_generation) {
        return Ok(ValidationResult::Invalid(format!(
            "Extra generation transaction at index {}",
            i + 1
        )));
    }

    for (i, tx) in block.transactions.iter().enumerate() {
        if let ValidationResult::Invalid(reason) = check_transaction(tx)? {
            return Ok(ValidationResult::Invalid(format!("Transaction {}: {}", i, reason)));
        }
    }

    Ok(ValidationResult::Valid)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_transaction_valid() {
        let tx = create_spending_transaction(1000);
        assert_eq!(check_transaction(&tx).unwrap(), ValidationResult::Valid);
    }

    #[test]
    fn test_check_transaction_empty_inputs() {
        let mut tx = create_spending_transaction(1000);
        tx.inputs.clear();
        assert!(matches!(check_transaction(&tx).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_transaction_empty_outputs() {
        let mut tx = create_spending_transaction(1000);
        tx.outputs.clear();
        assert!(matches!(check_transaction(&tx).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_transaction_negative_output() {
        let tx = create_spending_transaction(-1);
        assert!(matches!(check_transaction(&tx).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_transaction_output_above_max_money() {
        let tx = create_spending_transaction(MAX_MONEY + 1);
        assert!(matches!(check_transaction(&tx).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_transaction_too_many_outputs() {
        let mut tx = create_spending_transaction(1);
        tx.outputs = vec![TransactionOutput { value: 1, script_pubkey: vec![] }; MAX_OUTPUTS + 1];
        assert!(matches!(check_transaction(&tx).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_tx_inputs_generation() {
        let tx = create_generation_transaction();
        assert_eq!(check_tx_inputs(&tx, &[]).unwrap(), ValidationResult::Valid);
    }

    #[test]
    fn test_check_tx_inputs_insufficient_value() {
        let tx = create_spending_transaction(1000);
        let spent = [TransactionOutput { value: 999, script_pubkey: vec![] }];
        assert!(matches!(check_tx_inputs(&tx, &spent).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_tx_inputs_exact_value() {
        let tx = create_spending_transaction(1000);
        let spent = [TransactionOutput { value: 1000, script_pubkey: vec![] }];
        assert_eq!(check_tx_inputs(&tx, &spent).unwrap(), ValidationResult::Valid);
    }

    #[test]
    fn test_check_tx_inputs_count_mismatch() {
        let tx = create_spending_transaction(1000);
        assert!(matches!(check_tx_inputs(&tx, &[]).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_block_valid() {
        let block = create_test_block(vec![create_generation_transaction(), create_spending_transaction(5)]);
        assert_eq!(check_block(&block).unwrap(), ValidationResult::Valid);
    }

    #[test]
    fn test_check_block_requires_generation_first() {
        let block = create_test_block(vec![create_spending_transaction(5)]);
        assert!(matches!(check_block(&block).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_block_rejects_second_generation() {
        let block = create_test_block(vec![create_generation_transaction(), create_generation_transaction()]);
        assert!(matches!(check_block(&block).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_block_empty() {
        let block = create_test_block(vec![]);
        assert!(matches!(check_block(&block).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_check_block_bad_header() {
        let mut block = create_test_block(vec![create_generation_transaction()]);
        block.header.version = 0;
        assert!(matches!(check_block(&block).unwrap(), ValidationResult::Invalid(_)));
    }

    #[test]
    fn test_consensus_validator_maps_to_validation_error() {
        let validator = ConsensusValidator::new();
        let err = validator
            .verify_transaction(&create_spending_transaction(1000), &[])
            .unwrap_err();
        assert!(matches!(err, ChainError::Validation(_)));
    }

    fn create_generation_transaction() -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                prevout: OutPoint { hash: ZERO_HASH, index: GENERATION_INPUT_INDEX },
                script_sig: vec![0x01],
                sequence: SEQUENCE_FINAL,
            }],
            outputs: vec![TransactionOutput { value: 50_0000_0000, script_pubkey: vec![0x51] }],
            lock_time: 0,
        }
    }

    fn create_spending_transaction(value: Integer) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                prevout: OutPoint { hash: [1; 32], index: 0 },
                script_sig: vec![0x51],
                sequence: SEQUENCE_FINAL,
            }],
            outputs: vec![TransactionOutput { value, script_pubkey: vec![0x51] }],
            lock_time: 0,
        }
    }

    fn create_test_block(transactions: Vec<Transaction>) -> Block {
        Block {
            header: BlockHeader {
                version: 1,
                prev_block_hash: [0; 32],
                merkle_root: [0; 32],
                timestamp: 1231006505,
                bits: 0x207fffff,
                nonce: 0,
            },
            transactions,
        }
    }
}
