//! JSON-RPC client with timeout and error handling.
//!
//! # Responsibilities
//! - Issue JSON-RPC 2.0 calls over HTTP
//! - Enforce a per-call deadline
//! - Separate transport failures from remote node rejections

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tokio::time::timeout;
use url::Url;

/// An error object returned by the remote node inside a JSON-RPC response.
#[derive(Debug, Clone, Deserialize, Error)]
#[error("node error {code}: {message}")]
pub struct RemoteError {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub data: Option<Value>,
}

/// Errors raised by the RPC collaborator.
#[derive(Debug, Error)]
pub enum RpcError {
    /// Connection or protocol failure before a response arrived.
    #[error("RPC transport error: {0}")]
    Transport(String),

    /// The call did not complete within the deadline.
    #[error("RPC timeout after {0} seconds")]
    Timeout(u64),

    /// The node answered with an error object.
    #[error(transparent)]
    Node(RemoteError),

    /// The response arrived but could not be decoded.
    #[error("malformed RPC response: {0}")]
    Malformed(String),
}

/// Synchronous-per-call RPC contract: one method, one params value, one
/// `(result, error)` outcome.
#[async_trait]
pub trait RpcClient: Send + Sync {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError>;
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RemoteError>,
}

/// JSON-RPC 2.0 client over HTTP.
pub struct HttpRpcClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
    next_id: AtomicU64,
}

impl HttpRpcClient {
    /// Create a client for `endpoint` with a per-call deadline.
    pub fn new(endpoint: &str, timeout_secs: u64) -> Result<Self, RpcError> {
        let endpoint: Url = endpoint
            .parse()
            .map_err(|e| RpcError::Transport(format!("invalid RPC URL '{}': {}", endpoint, e)))?;

        Ok(Self {
            http: reqwest::Client::new(),
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            next_id: AtomicU64::new(0),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl std::fmt::Debug for HttpRpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRpcClient")
            .field("endpoint", &self.endpoint.as_str())
            .field("timeout_secs", &self.timeout.as_secs())
            .finish()
    }
}

#[async_trait]
impl RpcClient for HttpRpcClient {
    async fn call(&self, method: &str, params: Value) -> Result<Value, RpcError> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let request = serde_json::json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        let exchange = async {
            let response = self
                .http
                .post(self.endpoint.clone())
                .json(&request)
                .send()
                .await
                .map_err(|e| RpcError::Transport(e.to_string()))?;

            let envelope: RpcEnvelope = response
                .json()
                .await
                .map_err(|e| RpcError::Malformed(e.to_string()))?;

            if let Some(error) = envelope.error {
                tracing::debug!(method, code = error.code, message = %error.message, "node returned an error");
                return Err(RpcError::Node(error));
            }

            Ok(envelope.result.unwrap_or(Value::Null))
        };

        match timeout(self.timeout, exchange).await {
            Ok(outcome) => outcome,
            Err(_) => {
                tracing::warn!(method, timeout_secs = self.timeout.as_secs(), "RPC call timed out");
                Err(RpcError::Timeout(self.timeout.as_secs()))
            }
        }
    }
}
