//! TaPoS block-reference resolution.
//!
//! # Responsibilities
//! - Fetch the node's dynamic global properties and last irreversible block
//! - Derive `ref_block_num` / `ref_block_prefix` from one block observation
//! - Retry with backoff when the block is missing or structurally
//!   incomplete (seen around microforks), up to a bound

use chrono::{DateTime, NaiveDateTime, Utc};

use crate::error::{TransactionError, TxResult};
use crate::resilience::backoff::backoff_delay;
use crate::resilience::RetryPolicy;
use crate::rpc::types::{get_block, get_dynamic_global_properties};
use crate::rpc::{RpcClient, RpcError};

const BLOCK_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// A transaction's binding to a recent block. Both fields always originate
/// from the same block observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockReference {
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
}

/// A successful resolution: the reference pair plus the head block time it
/// was observed at, for deriving an expiration.
#[derive(Debug, Clone, Copy)]
pub struct TaposRef {
    pub reference: BlockReference,
    pub block_time: DateTime<Utc>,
}

/// Resolve a fresh TaPoS reference.
///
/// A failing properties call is surfaced immediately; a missing or
/// incomplete reference block is transient and retried from the top, since
/// the irreversible block number may have moved on.
pub async fn resolve(rpc: &dyn RpcClient, policy: &RetryPolicy) -> TxResult<TaposRef> {
    let max_attempts = policy.max_prepare_attempts.max(1);

    for attempt in 0..max_attempts {
        if attempt > 0 {
            tokio::time::sleep(backoff_delay(attempt, policy)).await;
        }

        let properties = get_dynamic_global_properties(rpc)
            .await
            .map_err(TransactionError::Preparation)?;
        let block_num = properties.last_irreversible_block_num;

        let header = match get_block(rpc, block_num).await {
            Ok(Some(header)) => header,
            Ok(None) => {
                tracing::warn!(block_num, attempt, "block missing while preparing transaction, retrying");
                continue;
            }
            Err(error) => {
                tracing::warn!(block_num, attempt, error = %error, "block fetch failed while preparing transaction, retrying");
                continue;
            }
        };

        let Some(previous) = header.previous else {
            tracing::warn!(block_num, attempt, "block has no previous hash while preparing transaction, retrying");
            continue;
        };

        return Ok(TaposRef {
            reference: block_reference(block_num, &previous)?,
            block_time: parse_block_time(&properties.time)?,
        });
    }

    Err(TransactionError::PreparationExhausted {
        attempts: max_attempts,
    })
}

/// Derive the reference pair from one observed block: the truncated
/// predecessor number, and a little-endian word out of the previous-block
/// id (hex characters 8..16, i.e. decoded bytes 4..8).
fn block_reference(block_num: u32, previous: &str) -> TxResult<BlockReference> {
    if previous.len() < 16 {
        return Err(TransactionError::Preparation(RpcError::Malformed(format!(
            "previous block id too short: '{}'",
            previous
        ))));
    }

    let decoded = hex::decode(&previous[8..16]).map_err(|e| {
        TransactionError::Preparation(RpcError::Malformed(format!(
            "previous block id '{}': {}",
            previous, e
        )))
    })?;
    let prefix_bytes: [u8; 4] = decoded.try_into().map_err(|_| {
        TransactionError::Preparation(RpcError::Malformed(format!(
            "previous block id '{}' has no 4-byte prefix word",
            previous
        )))
    })?;

    Ok(BlockReference {
        ref_block_num: (block_num.wrapping_sub(1) & 0xFFFF) as u16,
        ref_block_prefix: u32::from_le_bytes(prefix_bytes),
    })
}

/// Node timestamps carry no zone suffix and are defined to be UTC.
fn parse_block_time(time: &str) -> TxResult<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(time, BLOCK_TIME_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|e| {
            TransactionError::Preparation(RpcError::Malformed(format!(
                "block time '{}': {}",
                time, e
            )))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rpc::mock::{ScriptedRpc, Step};
    use crate::rpc::RemoteError;
    use serde_json::json;

    fn fast_policy(max_prepare_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_prepare_attempts,
            base_delay_ms: 1,
            max_delay_ms: 2,
            ..RetryPolicy::default()
        }
    }

    fn properties(block_num: u32) -> Step {
        Step::Ok(json!({
            "last_irreversible_block_num": block_num,
            "time": "2024-01-01T00:00:00",
        }))
    }

    #[tokio::test]
    async fn test_fields_come_from_one_observation() {
        let rpc = ScriptedRpc::new(vec![
            properties(90123456),
            Step::Ok(json!({"previous": "055f2ebf01234567012345670123456701234567"})),
        ]);

        let resolved = resolve(&rpc, &fast_policy(5)).await.unwrap();
        assert_eq!(resolved.reference.ref_block_num, ((90123456u32 - 1) & 0xFFFF) as u16);
        // Hex chars 8..16 of `previous`, little-endian.
        assert_eq!(resolved.reference.ref_block_prefix, 0x67452301);
        assert_eq!(resolved.block_time.timestamp(), 1704067200);
        assert_eq!(
            rpc.calls(),
            vec![
                "condenser_api.get_dynamic_global_properties",
                "condenser_api.get_block",
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_block_retries_from_the_top() {
        let rpc = ScriptedRpc::new(vec![
            properties(100),
            Step::Ok(json!(null)),
            properties(101),
            Step::Ok(json!({"previous": "0000006400000000000000000000000000000000"})),
        ]);

        let resolved = resolve(&rpc, &fast_policy(5)).await.unwrap();
        // Second observation won: block 101, not 100.
        assert_eq!(resolved.reference.ref_block_num, 100);
        assert_eq!(rpc.calls().len(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_incomplete_block_retries() {
        let rpc = ScriptedRpc::new(vec![
            properties(100),
            Step::Ok(json!({"witness": "someone"})),
            properties(100),
            Step::Ok(json!({"previous": "0000006400000000000000000000000000000000"})),
        ]);

        assert!(resolve(&rpc, &fast_policy(5)).await.is_ok());
    }

    #[tokio::test]
    async fn test_properties_failure_is_immediate() {
        let rpc = ScriptedRpc::new(vec![Step::Node(RemoteError {
            code: -32603,
            message: "internal error".to_string(),
            data: None,
        })]);

        let result = resolve(&rpc, &fast_policy(5)).await;
        assert!(matches!(result, Err(TransactionError::Preparation(_))));
        assert_eq!(rpc.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhaustion_is_an_explicit_error() {
        let rpc = ScriptedRpc::new(vec![
            properties(100),
            Step::Ok(json!(null)),
            properties(100),
            Step::Ok(json!(null)),
        ]);

        let result = resolve(&rpc, &fast_policy(2)).await;
        assert!(matches!(
            result,
            Err(TransactionError::PreparationExhausted { attempts: 2 })
        ));
    }

    #[test]
    fn test_block_reference_wraps_at_zero() {
        let reference = block_reference(0, "0000000000000000000000000000000000000000").unwrap();
        assert_eq!(reference.ref_block_num, 0xFFFF);
    }

    #[test]
    fn test_short_previous_id_rejected() {
        assert!(block_reference(10, "abcd").is_err());
    }
}
