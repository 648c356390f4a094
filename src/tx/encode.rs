//! Deterministic consensus wire encoding.
//!
//! The byte layout must match what the chain itself hashes before
//! signature verification; any reordering or width change produces a
//! transaction the node rejects. Layout:
//!
//! ```text
//! chain id (32 bytes, hex-decoded)
//! ref_block_num   u16 LE
//! ref_block_prefix u32 LE
//! expiration      u32 LE (unix seconds)
//! operation count  1 byte
//! each operation's chain-tagged encoding
//! 0x00 (empty extensions)
//! ```

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use crate::chain::Chain;
use crate::error::{TransactionError, TxResult};
use crate::tx::operation::Operation;
use crate::tx::tapos::BlockReference;

/// Serialize a prepared transaction into the exact bytes the chain hashes.
/// Pure: no side effects, no randomness.
pub fn transaction_bytes(
    chain: Chain,
    chain_id: &str,
    reference: BlockReference,
    expiration: DateTime<Utc>,
    operations: &[Operation],
) -> TxResult<Vec<u8>> {
    let mut bytes = hex::decode(chain_id)
        .map_err(|e| TransactionError::Encoding(format!("chain id is not valid hex: {}", e)))?;

    bytes.extend(reference.ref_block_num.to_le_bytes());
    bytes.extend(reference.ref_block_prefix.to_le_bytes());
    bytes.extend((expiration.timestamp() as u32).to_le_bytes());

    if operations.len() > u8::MAX as usize {
        return Err(TransactionError::Encoding(format!(
            "too many operations for a single transaction: {}",
            operations.len()
        )));
    }
    bytes.push(operations.len() as u8);
    for operation in operations {
        bytes.extend(operation.to_bytes(chain));
    }

    bytes.push(0x00); // empty extensions

    Ok(bytes)
}

/// The 32-byte digest the signature covers: a single SHA-256 round over
/// the wire bytes.
pub fn signing_digest(
    chain: Chain,
    chain_id: &str,
    reference: BlockReference,
    expiration: DateTime<Utc>,
    operations: &[Operation],
) -> TxResult<[u8; 32]> {
    let bytes = transaction_bytes(chain, chain_id, reference, expiration, operations)?;
    Ok(Sha256::digest(&bytes).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_header() -> (BlockReference, DateTime<Utc>) {
        let reference = BlockReference {
            ref_block_num: 1234,
            ref_block_prefix: 0xAABBCCDD,
        };
        let expiration = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        (reference, expiration)
    }

    #[test]
    fn test_golden_bytes() {
        let (reference, expiration) = fixed_header();
        let zero_chain_id = "0".repeat(64);
        // An all-empty vote encodes to six zero bytes on the wire.
        let operations = vec![Operation::Vote {
            voter: String::new(),
            author: String::new(),
            permlink: String::new(),
            weight: 0,
        }];

        let bytes =
            transaction_bytes(Chain::Test, &zero_chain_id, reference, expiration, &operations)
                .unwrap();

        let mut expected = vec![0u8; 32];
        expected.extend([0xD2, 0x04]); // 1234 LE
        expected.extend([0xDD, 0xCC, 0xBB, 0xAA]); // 0xAABBCCDD LE
        expected.extend([0x80, 0x00, 0x92, 0x65]); // 1704067200 LE
        expected.push(0x01);
        expected.extend([0u8; 6]);
        expected.push(0x00);
        assert_eq!(bytes, expected);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let (reference, expiration) = fixed_header();
        let operations = vec![Operation::CustomJson {
            required_auths: vec![],
            required_posting_auths: vec!["alice".to_string()],
            id: "follow".to_string(),
            json: r#"{"what":["blog"]}"#.to_string(),
        }];

        let first = transaction_bytes(
            Chain::Hive,
            Chain::Hive.chain_id(),
            reference,
            expiration,
            &operations,
        )
        .unwrap();
        let second = transaction_bytes(
            Chain::Hive,
            Chain::Hive.chain_id(),
            reference,
            expiration,
            &operations,
        )
        .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_digest_is_sha256_of_bytes() {
        let (reference, expiration) = fixed_header();
        let bytes =
            transaction_bytes(Chain::Hive, Chain::Hive.chain_id(), reference, expiration, &[])
                .unwrap();
        let digest =
            signing_digest(Chain::Hive, Chain::Hive.chain_id(), reference, expiration, &[])
                .unwrap();
        assert_eq!(digest, <[u8; 32]>::from(Sha256::digest(&bytes)));
    }

    #[test]
    fn test_bad_chain_id_rejected() {
        let (reference, expiration) = fixed_header();
        let result = transaction_bytes(Chain::Hive, "not-hex", reference, expiration, &[]);
        assert!(matches!(result, Err(TransactionError::Encoding(_))));
    }
}
