//! Transaction orchestration.
//!
//! # Lifecycle
//! ```text
//! Unprepared --prepare()--> Prepared --sign--> Signed --submit--> Ack | Error
//!                 ^                                        |
//!                 +------ re-preparable rejection ---------+
//! ```
//!
//! `prepare()` is idempotent once the header fields are resolved and
//! re-enterable after a failure. Signing happens lazily inside
//! `process()`; the cached payload snapshot is invalidated whenever a
//! header field or the operation list changes, never left partially stale.
//! Network handles are scoped to the client the transaction owns and are
//! released when it is dropped, on every exit path.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::chain::{Chain, EXPIRE_IN_SECS};
use crate::error::{TransactionError, TxResult};
use crate::resilience::backoff::backoff_delay;
use crate::resilience::RetryPolicy;
use crate::rpc::{HttpRpcClient, RpcClient, RpcError};
use crate::tx::broadcast;
use crate::tx::encode;
use crate::tx::operation::Operation;
use crate::tx::tapos::{self, BlockReference};
use crate::wallet::PrivateKey;

const EXPIRATION_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Construction options. Exactly one of `wif` / `private_key` is
/// required; `ref_block_num` and `ref_block_prefix` may pin the TaPoS
/// reference but only as a pair.
#[derive(Clone, Deserialize)]
#[serde(default)]
pub struct TransactionOptions {
    /// Target network.
    pub chain: Chain,

    /// Chain id override; defaults to the network's constant.
    pub chain_id: Option<String>,

    /// JSON-RPC endpoint; defaults to the network's default node.
    pub url: Option<String>,

    /// Wallet-import-format signing key.
    pub wif: Option<String>,

    /// Raw hex signing key.
    pub private_key: Option<String>,

    /// Pinned TaPoS reference, supplied together with `ref_block_prefix`.
    pub ref_block_num: Option<u16>,
    pub ref_block_prefix: Option<u32>,

    /// Explicit expiration; immutable for the life of the transaction.
    pub expiration: Option<DateTime<Utc>>,

    /// Broadcast through `condenser_api` (default) or
    /// `network_broadcast_api`.
    #[serde(default = "default_condenser_namespace")]
    pub use_condenser_namespace: bool,

    /// Per-call RPC deadline in seconds.
    #[serde(default = "default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,

    /// Retry bounds for preparation and broadcast.
    pub retry: RetryPolicy,
}

fn default_condenser_namespace() -> bool {
    true
}

fn default_rpc_timeout_secs() -> u64 {
    10
}

impl Default for TransactionOptions {
    fn default() -> Self {
        Self {
            chain: Chain::default(),
            chain_id: None,
            url: None,
            wif: None,
            private_key: None,
            ref_block_num: None,
            ref_block_prefix: None,
            expiration: None,
            use_condenser_namespace: default_condenser_namespace(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            retry: RetryPolicy::default(),
        }
    }
}

impl std::fmt::Debug for TransactionOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Key material is deliberately absent.
        f.debug_struct("TransactionOptions")
            .field("chain", &self.chain)
            .field("chain_id", &self.chain_id)
            .field("url", &self.url)
            .field("has_wif", &self.wif.is_some())
            .field("has_private_key", &self.private_key.is_some())
            .field("ref_block_num", &self.ref_block_num)
            .field("ref_block_prefix", &self.ref_block_prefix)
            .field("expiration", &self.expiration)
            .field("use_condenser_namespace", &self.use_condenser_namespace)
            .field("rpc_timeout_secs", &self.rpc_timeout_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

/// The fully-resolved, signed snapshot submitted to the node.
#[derive(Debug, Clone, Serialize)]
pub struct SignedPayload {
    pub expiration: String,
    pub ref_block_num: u16,
    pub ref_block_prefix: u32,
    pub operations: Vec<Value>,
    pub extensions: Vec<Value>,
    pub signatures: Vec<String>,
}

/// Outcome of [`Transaction::process`].
#[derive(Debug, Clone)]
pub enum ProcessOutcome {
    /// Signed locally, not submitted.
    Signed(SignedPayload),
    /// Accepted by the node; the raw acknowledgment body.
    Accepted(Value),
}

/// A single transaction's lifecycle state.
///
/// Owns its signing key and RPC handle exclusively; independent
/// transactions can run concurrently with no shared mutable state.
pub struct Transaction {
    chain: Chain,
    chain_id: String,
    key: PrivateKey,
    operations: Vec<Operation>,
    reference: Option<BlockReference>,
    expiration: Option<DateTime<Utc>>,
    immutable_expiration: bool,
    pinned_reference: bool,
    use_condenser_namespace: bool,
    retry: RetryPolicy,
    rpc: Arc<dyn RpcClient>,
    payload: Option<SignedPayload>,
}

impl Transaction {
    /// Build a transaction over an existing RPC handle.
    ///
    /// Credential and header-field validation happens here, before any
    /// network activity.
    pub fn new(options: TransactionOptions, rpc: Arc<dyn RpcClient>) -> TxResult<Self> {
        let key = match (&options.wif, &options.private_key) {
            (Some(_), Some(_)) => {
                return Err(TransactionError::Configuration(
                    "pass either wif or private_key, not both".to_string(),
                ))
            }
            (Some(wif), None) => PrivateKey::from_wif(wif)?,
            (None, Some(hex_key)) => PrivateKey::from_hex(hex_key)?,
            (None, None) => {
                return Err(TransactionError::Configuration(
                    "no wif or private key".to_string(),
                ))
            }
        };

        let chain_id = options
            .chain_id
            .clone()
            .unwrap_or_else(|| options.chain.chain_id().to_string());
        if !Chain::known_chain_id(&chain_id) {
            tracing::warn!(chain_id = %chain_id, "unknown chain id");
        }

        let reference = match (options.ref_block_num, options.ref_block_prefix) {
            (Some(ref_block_num), Some(ref_block_prefix)) => Some(BlockReference {
                ref_block_num,
                ref_block_prefix,
            }),
            (None, None) => None,
            _ => {
                return Err(TransactionError::Configuration(
                    "ref_block_num and ref_block_prefix must be supplied together".to_string(),
                ))
            }
        };

        Ok(Self {
            chain: options.chain,
            chain_id,
            key,
            operations: Vec::new(),
            pinned_reference: reference.is_some(),
            reference,
            immutable_expiration: options.expiration.is_some(),
            expiration: options.expiration,
            use_condenser_namespace: options.use_condenser_namespace,
            retry: options.retry,
            rpc,
            payload: None,
        })
    }

    /// Build a transaction with its own HTTP client, against the
    /// configured endpoint or the network's default node.
    pub fn connect(options: TransactionOptions) -> TxResult<Self> {
        let url = options
            .url
            .clone()
            .unwrap_or_else(|| options.chain.default_node().to_string());
        let rpc = HttpRpcClient::new(&url, options.rpc_timeout_secs)?;
        Self::new(options, Arc::new(rpc))
    }

    pub fn chain(&self) -> Chain {
        self.chain
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Append a typed operation, invalidating any signed snapshot.
    pub fn push(&mut self, operation: Operation) -> &mut Self {
        self.payload = None;
        self.operations.push(operation);
        self
    }

    /// Normalize and append a generic operation record.
    pub fn push_record(&mut self, record: &Value) -> TxResult<&mut Self> {
        let operation = Operation::from_value(record)?;
        Ok(self.push(operation))
    }

    /// Resolve the TaPoS reference and expiration.
    ///
    /// Idempotent once resolved; a later call after `reprepare` cleared
    /// the derived fields re-runs the whole resolution against a fresh
    /// block.
    pub async fn prepare(&mut self) -> TxResult<()> {
        self.payload = None;

        if self.reference.is_some() && self.expiration.is_some() {
            return Ok(());
        }

        let resolved = tapos::resolve(self.rpc.as_ref(), &self.retry).await?;
        if self.reference.is_none() {
            self.reference = Some(resolved.reference);
        }
        if self.expiration.is_none() {
            self.expiration = Some(resolved.block_time + Duration::seconds(EXPIRE_IN_SECS));
        }
        Ok(())
    }

    /// Drop derived header fields and resolve them again. Explicitly
    /// pinned fields survive.
    async fn reprepare(&mut self) -> TxResult<()> {
        self.payload = None;
        if !self.pinned_reference {
            self.reference = None;
        }
        if !self.immutable_expiration {
            self.expiration = None;
        }
        self.prepare().await
    }

    pub fn ref_block_num(&self) -> Option<u16> {
        self.reference.map(|r| r.ref_block_num)
    }

    pub fn ref_block_prefix(&self) -> Option<u32> {
        self.reference.map(|r| r.ref_block_prefix)
    }

    pub fn expiration(&self) -> Option<DateTime<Utc>> {
        self.expiration
    }

    /// Sign the prepared header and operations, caching the payload until
    /// a header field changes.
    pub fn signed_payload(&mut self) -> TxResult<SignedPayload> {
        if let Some(payload) = &self.payload {
            return Ok(payload.clone());
        }

        let reference = self.reference.ok_or_else(|| {
            TransactionError::Configuration(
                "transaction is not prepared; call prepare() first".to_string(),
            )
        })?;
        let expiration = self.expiration.ok_or_else(|| {
            TransactionError::Configuration(
                "transaction has no expiration; call prepare() first".to_string(),
            )
        })?;

        let digest = encode::signing_digest(
            self.chain,
            &self.chain_id,
            reference,
            expiration,
            &self.operations,
        )?;
        let signature = self.key.sign_canonical(&digest)?;

        let payload = SignedPayload {
            expiration: expiration.format(EXPIRATION_FORMAT).to_string(),
            ref_block_num: reference.ref_block_num,
            ref_block_prefix: reference.ref_block_prefix,
            operations: self.operations.iter().map(Operation::to_value).collect(),
            extensions: Vec::new(),
            signatures: vec![hex::encode(signature)],
        };
        self.payload = Some(payload.clone());
        Ok(payload)
    }

    /// Run the full lifecycle: prepare, sign, and optionally broadcast.
    ///
    /// Re-preparable rejections trigger a fresh prepare-sign-submit cycle
    /// up to `retry.max_broadcast_attempts` total submissions; terminal
    /// rejections surface immediately with the remote code and message.
    pub async fn process(&mut self, broadcast: bool) -> TxResult<ProcessOutcome> {
        self.prepare().await?;

        if !broadcast {
            return Ok(ProcessOutcome::Signed(self.signed_payload()?));
        }

        let max_attempts = self.retry.max_broadcast_attempts.max(1);
        let mut failures = 0u32;
        loop {
            let payload = self.signed_payload()?;
            match broadcast::submit(self.rpc.as_ref(), &payload, self.use_condenser_namespace).await
            {
                Ok(ack) => return Ok(ProcessOutcome::Accepted(ack)),
                Err(RpcError::Node(remote)) => {
                    if !broadcast::can_reprepare(&remote) {
                        return Err(TransactionError::Broadcast(remote));
                    }
                    failures += 1;
                    if failures >= max_attempts {
                        return Err(TransactionError::BroadcastExhausted {
                            attempts: failures,
                        });
                    }
                    tracing::debug!(
                        code = remote.code,
                        message = %remote.message,
                        attempt = failures,
                        "re-preparable rejection, repreparing transaction"
                    );
                    tokio::time::sleep(backoff_delay(failures, &self.retry)).await;
                    self.reprepare().await?;
                }
                Err(other) => return Err(other.into()),
            }
        }
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("chain", &self.chain)
            .field("chain_id", &self.chain_id)
            .field("operations", &self.operations.len())
            .field("reference", &self.reference)
            .field("expiration", &self.expiration)
            .field("use_condenser_namespace", &self.use_condenser_namespace)
            .finish()
    }
}
