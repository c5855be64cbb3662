//! Exponential backoff.

use std::time::Duration;

/// Delay before retry `attempt` (1-based): `base * 2^(attempt-1)`.
///
/// Attempt 0 is the initial call and never waits. No jitter is applied, so
/// the schedule is deterministic.
pub fn calculate_backoff(attempt: u32, base: Duration) -> Duration {
    if attempt == 0 {
        return Duration::ZERO;
    }

    let factor = 2u32.saturating_pow(attempt - 1);
    base.saturating_mul(factor)
}
