//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

use crate::resilience::RetryPolicy;

/// Delay before retry number `attempt` (1-based): doubles per attempt from
/// the policy's base, capped at its maximum, with up to 10% jitter on top.
pub fn backoff_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    // The shift saturates at the cap long before 20 doublings.
    let doubled = policy
        .base_delay_ms
        .saturating_mul(1u64 << (attempt - 1).min(20));
    let capped = doubled.min(policy.max_delay_ms);

    let jitter_ceiling = capped / 10;
    let jitter = if jitter_ceiling > 0 {
        rand::thread_rng().gen_range(0..=jitter_ceiling)
    } else {
        0
    };

    Duration::from_millis(capped + jitter)
}
