//! Error taxonomy for the transaction lifecycle.

use thiserror::Error;

use crate::rpc::{RemoteError, RpcError};

/// Errors that can occur while building, signing, or broadcasting a
/// transaction.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// Invalid or conflicting construction options; fatal, never retried.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A remote call or snapshot failed during TaPoS resolution.
    #[error("unable to prepare transaction: {0}")]
    Preparation(#[source] RpcError),

    /// TaPoS resolution gave up after the configured retry budget.
    #[error("transaction preparation exhausted after {attempts} attempts")]
    PreparationExhausted { attempts: u32 },

    /// The transaction could not be serialized into consensus bytes.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// An operation record could not be normalized into a typed operation.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Internal signing failure. A canonical signature that yields no
    /// recovery id indicates an implementation defect, not a transient
    /// condition.
    #[error("signing error: {0}")]
    Signing(String),

    /// The node rejected the broadcast for a reason a fresh TaPoS window
    /// cannot fix. Carries the remote code and message verbatim.
    #[error("broadcast rejected: {0}")]
    Broadcast(RemoteError),

    /// Re-preparable broadcast rejections persisted past the retry budget.
    #[error("broadcast retries exhausted after {attempts} attempts")]
    BroadcastExhausted { attempts: u32 },

    /// Transport-level RPC failure outside of preparation.
    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Result type for transaction operations.
pub type TxResult<T> = Result<T, TransactionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TransactionError::Configuration("no wif or private key".to_string());
        assert_eq!(err.to_string(), "configuration error: no wif or private key");

        let err = TransactionError::PreparationExhausted { attempts: 5 };
        assert!(err.to_string().contains("5 attempts"));
    }

    #[test]
    fn test_broadcast_error_carries_remote_detail() {
        let err = TransactionError::Broadcast(RemoteError {
            code: -32000,
            message: "missing required posting authority".to_string(),
            data: None,
        });
        let rendered = err.to_string();
        assert!(rendered.contains("-32000"));
        assert!(rendered.contains("posting authority"));
    }
}
