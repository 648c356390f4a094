//! Broadcast submission and rejection classification.
//!
//! # Responsibilities
//! - Submit a signed payload in either supported call shape
//! - Decide whether a rejection can be fixed by a fresh TaPoS window
//!
//! Only expiration/TaPoS/canonicality-class rejections are worth
//! re-preparing; everything else (validation failures, missing authority,
//! duplicates) goes back to the caller verbatim.

use serde_json::{json, Value};

use crate::rpc::{RemoteError, RpcClient, RpcError};
use crate::tx::transaction::SignedPayload;

/// Assertion fragments the node emits for failures a fresh reference
/// block and expiration can fix.
const REPREPARE_MARKERS: &[&str] = &[
    "now < trx.expiration",
    "trx.expiration <=",
    "tapos",
    "is_canonical( c.sig )",
];

/// Whether a rejection warrants a fresh prepare-sign-submit cycle.
pub(crate) fn can_reprepare(error: &RemoteError) -> bool {
    let mut haystack = error.message.to_lowercase();
    if let Some(data) = &error.data {
        haystack.push_str(&data.to_string().to_lowercase());
    }
    REPREPARE_MARKERS.iter().any(|marker| haystack.contains(marker))
}

/// Submit the payload using the configured namespace. The condenser shape
/// takes the bare payload positionally; the network-broadcast shape wraps
/// it in a `trx` field.
pub(crate) async fn submit(
    rpc: &dyn RpcClient,
    payload: &SignedPayload,
    use_condenser_namespace: bool,
) -> Result<Value, RpcError> {
    if use_condenser_namespace {
        rpc.call("condenser_api.broadcast_transaction", json!([payload])).await
    } else {
        rpc.call("network_broadcast_api.broadcast_transaction", json!({ "trx": payload }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn remote(message: &str) -> RemoteError {
        RemoteError {
            code: -32000,
            message: message.to_string(),
            data: None,
        }
    }

    #[test]
    fn test_expiration_class_is_repreparable() {
        assert!(can_reprepare(&remote(
            "now < trx.expiration: transaction expiration exception"
        )));
        assert!(can_reprepare(&remote(
            "is_canonical( c.sig ): signature is not canonical"
        )));
    }

    #[test]
    fn test_tapos_marker_found_in_data() {
        let error = RemoteError {
            code: -32000,
            message: "assert exception".to_string(),
            data: Some(serde_json::json!({"stack": "TaPoS block summary mismatch"})),
        };
        assert!(can_reprepare(&error));
    }

    #[test]
    fn test_terminal_rejections_are_not_repreparable() {
        assert!(!can_reprepare(&remote("missing required posting authority")));
        assert!(!can_reprepare(&remote("duplicate transaction check failed")));
    }
}
