//! Bounded retry policy for remote interactions.
//!
//! # Design Decisions
//! - Every retry loop has an explicit attempt cap; exhaustion is a
//!   first-class, testable error
//! - Jittered exponential backoff between attempts prevents hammering a
//!   struggling node

pub mod backoff;

use serde::{Deserialize, Serialize};

/// Retry bounds for TaPoS resolution and broadcast re-preparation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Maximum TaPoS resolution attempts before giving up on an
    /// incomplete or missing reference block.
    pub max_prepare_attempts: u32,

    /// Maximum broadcast submissions, counting the first. Only
    /// re-preparable rejections consume attempts.
    pub max_broadcast_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_prepare_attempts: 5,
            max_broadcast_attempts: 3,
            base_delay_ms: 100,
            max_delay_ms: 2000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy_is_bounded() {
        let policy = RetryPolicy::default();
        assert!(policy.max_prepare_attempts >= 1);
        assert!(policy.max_broadcast_attempts >= 1);
        assert!(policy.max_delay_ms >= policy.base_delay_ms);
    }
}
