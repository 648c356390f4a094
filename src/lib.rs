//! Transaction building, canonical signing, and broadcast for
//! Steem/Hive-family (Graphene) blockchains.
//!
//! # Data Flow
//! ```text
//! TransactionOptions (key material, chain, pinned header fields)
//!     → tx/tapos.rs (resolve block reference + expiration from the node)
//!     → tx/encode.rs (consensus wire bytes, SHA-256 signing digest)
//!     → wallet.rs (canonical recoverable secp256k1 signature)
//!     → tx/broadcast.rs (submit, classify rejections, bounded re-prepare)
//! ```
//!
//! # Security Constraints
//! - Private keys are never logged or serialized
//! - Intermediate key buffers are zeroized after parsing
//! - All RPC calls have configurable timeouts and bounded retries

pub mod chain;
pub mod error;
pub mod resilience;
pub mod rpc;
pub mod tx;
pub mod wallet;

pub use chain::Chain;
pub use error::{TransactionError, TxResult};
pub use resilience::RetryPolicy;
pub use rpc::{HttpRpcClient, RemoteError, RpcClient, RpcError};
pub use tx::operation::{Asset, Operation};
pub use tx::transaction::{ProcessOutcome, SignedPayload, Transaction, TransactionOptions};
pub use wallet::PrivateKey;
