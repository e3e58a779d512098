//! Restart backoff for failed probe sessions.

use std::time::Duration;
use rand::Rng;

/// Delay before restart `attempt` (1-based): `base * 2^(attempt-1)`, capped at `max`,
/// plus up to 10% jitter so hosts that failed together do not reopen together.
pub fn calculate_backoff(attempt: u32, base: Duration, max: Duration) -> Duration {
    if attempt == 0 || base.is_zero() {
        return Duration::ZERO;
    }

    let factor = 1u32.checked_shl(attempt - 1).unwrap_or(u32::MAX);
    let delay = base.saturating_mul(factor).min(max);

    let jitter_ms = delay.as_millis() as u64 / 10;
    let jitter = if jitter_ms > 0 {
        rand::thread_rng().gen_range(0..jitter_ms)
    } else {
        0
    };

    delay + Duration::from_millis(jitter)
}
