//! Typed snapshots of the node calls the transaction lifecycle consumes.

use serde::Deserialize;
use serde_json::json;

use super::{RpcClient, RpcError};

/// Subset of `get_dynamic_global_properties` the lifecycle reads.
#[derive(Debug, Clone, Deserialize)]
pub struct DynamicGlobalProperties {
    pub last_irreversible_block_num: u32,
    /// Head block time, `YYYY-MM-DDTHH:MM:SS`, implicitly UTC.
    pub time: String,
}

/// Subset of a `get_block` response. `previous` is optional so a
/// structurally incomplete block (seen around microforks) is representable
/// rather than a decode failure.
#[derive(Debug, Clone, Deserialize)]
pub struct BlockHeader {
    #[serde(default)]
    pub previous: Option<String>,
}

pub async fn get_dynamic_global_properties(
    rpc: &dyn RpcClient,
) -> Result<DynamicGlobalProperties, RpcError> {
    let raw = rpc
        .call("condenser_api.get_dynamic_global_properties", json!([]))
        .await?;
    serde_json::from_value(raw)
        .map_err(|e| RpcError::Malformed(format!("dynamic global properties: {}", e)))
}

/// Fetch a block header; `Ok(None)` when the node answers `null`.
pub async fn get_block(
    rpc: &dyn RpcClient,
    block_num: u32,
) -> Result<Option<BlockHeader>, RpcError> {
    let raw = rpc.call("condenser_api.get_block", json!([block_num])).await?;
    if raw.is_null() {
        return Ok(None);
    }
    serde_json::from_value(raw)
        .map(Some)
        .map_err(|e| RpcError::Malformed(format!("block {}: {}", block_num, e)))
}
