//! Canonical serialization and identity hashing
//!
//! Transactions and headers are encoded in the Bitcoin wire layout (little-endian
//! integers, CompactSize lengths) and identified by the double SHA-256 of that encoding.

use bitcoin_hashes::{sha256d, Hash as BitcoinHash, HashEngine};

use crate::types::*;

/// Double SHA-256 of arbitrary bytes
pub fn double_sha256(data: &[u8]) -> Hash {
    sha256d::Hash::hash(data).into_inner()
}

/// Double SHA-256 of two concatenated hashes, the merkle tree node function
pub fn hash_pair(left: &Hash, right: &Hash) -> Hash {
    let mut engine = sha256d::Hash::engine();
    engine.input(left);
    engine.input(right);
    sha256d::Hash::from_engine(engine).into_inner()
}

/// Render a hash in display order (byte-reversed hex), as block explorers show it
pub fn hash_to_hex(hash: &Hash) -> String {
    let mut reversed = *hash;
    reversed.reverse();
    hex::encode(reversed)
}

/// Encode a number as a CompactSize varint
pub fn encode_varint(value: u64) -> Vec<u8> {
    if value < 0xfd {
        vec![value as u8]
    } else if value <= 0xffff {
        let mut result = vec![0xfd];
        result.extend_from_slice(&(value as u16).to_le_bytes());
        result
    } else if value <= 0xffffffff {
        let mut result = vec![0xfe];
        result.extend_from_slice(&(value as u32).to_le_bytes());
        result
    } else {
        let mut result = vec![0xff];
        result.extend_from_slice(&value.to_le_bytes());
        result
    }
}

/// Serialize a transaction in its canonical layout
pub fn serialize_transaction(tx: &Transaction) -> Vec<u8> {
    let mut data = Vec::new();

    data.extend_from_slice(&tx.version.to_le_bytes());

    data.extend_from_slice(&encode_varint(tx.inputs.len() as u64));
    for input in &tx.inputs {
        data.extend_from_slice(&input.prevout.hash);
        data.extend_from_slice(&input.prevout.index.to_le_bytes());
        data.extend_from_slice(&encode_varint(input.script_sig.len() as u64));
        data.extend_from_slice(&input.script_sig);
        data.extend_from_slice(&input.sequence.to_le_bytes());
    }

    data.extend_from_slice(&encode_varint(tx.outputs.len() as u64));
    for output in &tx.outputs {
        data.extend_from_slice(&(output.value as u64).to_le_bytes());
        data.extend_from_slice(&encode_varint(output.script_pubkey.len() as u64));
        data.extend_from_slice(&output.script_pubkey);
    }

    data.extend_from_slice(&tx.lock_time.to_le_bytes());
    data
}

/// Serialize a header into its fixed 80-byte layout
pub fn serialize_header(header: &BlockHeader) -> Vec<u8> {
    let mut data = Vec::with_capacity(crate::constants::BLOCK_HEADER_SIZE);
    data.extend_from_slice(&header.version.to_le_bytes());
    data.extend_from_slice(&header.prev_block_hash);
    data.extend_from_slice(&header.merkle_root);
    data.extend_from_slice(&header.timestamp.to_le_bytes());
    data.extend_from_slice(&header.bits.to_le_bytes());
    data.extend_from_slice(&header.nonce.to_le_bytes());
    data
}

/// Serialized size of a block: header, transaction count, transactions
pub fn block_size(block: &Block) -> usize {
    let transactions: usize = block.transactions.iter().map(|tx| serialize_transaction(tx).len()).sum();
    crate::constants::BLOCK_HEADER_SIZE
        + encode_varint(block.transactions.len() as u64).len()
        + transactions
}

impl Transaction {
    /// Transaction identity: double SHA-256 of the canonical encoding
    pub fn hash(&self) -> Hash {
        double_sha256(&serialize_transaction(self))
    }

    pub fn size(&self) -> usize {
        serialize_transaction(self).len()
    }
}

impl BlockHeader {
    /// Block identity: double SHA-256 of the 80-byte header
    pub fn hash(&self) -> Hash {
        double_sha256(&serialize_header(self))
    }
}

impl Block {
    pub fn hash(&self) -> Hash {
        self.header.hash()
    }

    pub fn transaction_hashes(&self) -> Vec<Hash> {
        self.transactions.iter().map(Transaction::hash).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_varint_small() {
        assert_eq!(encode_varint(0), vec![0x00]);
        assert_eq!(encode_varint(0xfc), vec![0xfc]);
    }

    #[test]
    fn test_encode_varint_boundaries() {
        assert_eq!(encode_varint(0xfd), vec![0xfd, 0xfd, 0x00]);
        assert_eq!(encode_varint(0x10000), vec![0xfe, 0x00, 0x00, 0x01, 0x00]);
        assert_eq!(encode_varint(0x1_0000_0000).len(), 9);
    }

    #[test]
    fn test_header_serialization_is_80_bytes() {
        let header = create_test_header();
        assert_eq!(serialize_header(&header).len(), 80);
    }

    #[test]
    fn test_genesis_header_hash() {
        // Bitcoin mainnet genesis header
        let mut merkle_root = [0u8; 32];
        hex::decode_to_slice(
            "3ba3edfd7a7b12b27ac72c3e67768f617fc81bc3888a51323a9fb8aa4b1e5e4a",
            &mut merkle_root,
        )
        .unwrap();
        let header = BlockHeader {
            version: 1,
            prev_block_hash: [0; 32],
            merkle_root,
            timestamp: 1231006505,
            bits: 0x1d00ffff,
            nonce: 2083236893,
        };
        assert_eq!(
            hash_to_hex(&header.hash()),
            "000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f"
        );
    }

    #[test]
    fn test_transaction_hash_changes_with_content() {
        let tx1 = create_test_transaction(1000);
        let tx2 = create_test_transaction(1001);
        assert_ne!(tx1.hash(), tx2.hash());
        assert_eq!(tx1.hash(), tx1.clone().hash());
    }

    #[test]
    fn test_hash_pair_matches_concatenation() {
        let left = [1u8; 32];
        let right = [2u8; 32];
        let mut concat = Vec::new();
        concat.extend_from_slice(&left);
        concat.extend_from_slice(&right);
        assert_eq!(hash_pair(&left, &right), double_sha256(&concat));
    }

    #[test]
    fn test_hash_to_hex_reverses() {
        let mut hash = [0u8; 32];
        hash[0] = 0x01;
        assert!(hash_to_hex(&hash).ends_with("01"));
    }

    fn create_test_header() -> BlockHeader {
        BlockHeader {
            version: 1,
            prev_block_hash: [0; 32],
            merkle_root: [0; 32],
            timestamp: 1231006505,
            bits: 0x207fffff,
            nonce: 0,
        }
    }

    fn create_test_transaction(value: Integer) -> Transaction {
        Transaction {
            version: 1,
            inputs: vec![TransactionInput {
                prevout: OutPoint { hash: [1; 32], index: 0 },
                script_sig: vec![0x51],
                sequence: 0xffffffff,
            }],
            outputs: vec![TransactionOutput {
                value,
                script_pubkey: vec![0x51],
            }],
            lock_time: 0,
        }
    }
}
