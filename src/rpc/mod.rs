//! JSON-RPC collaborator consumed by the transaction lifecycle.
//!
//! # Data Flow
//! ```text
//! Transaction lifecycle
//!     → client.rs (RpcClient trait; HTTP JSON-RPC 2.0 with timeouts)
//!     → types.rs (typed snapshots of the three consumed node calls)
//! ```
//!
//! The lifecycle only ever sees `(result, error)` pairs; transport details
//! stay behind the [`RpcClient`] trait so tests can script responses.

pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::{HttpRpcClient, RemoteError, RpcClient, RpcError};
pub use types::{BlockHeader, DynamicGlobalProperties};
