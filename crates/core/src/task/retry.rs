//! Retry backoff.

use std::time::Duration;

use rand::Rng;

const MAX_JITTER_SECS: u64 = 30;

/// Delay before the `retried`-th retry: `n^4 + 15 + rand(0..30) * (n + 1)` seconds.
///
/// Grows steeply so a persistently failing task backs off to hours within
/// about ten attempts.
pub fn default_retry_delay(retried: u32) -> Duration {
    let jitter = rand::rng().random_range(0..MAX_JITTER_SECS);
    retry_delay_with_jitter(retried, jitter)
}

/// Backoff formula with an explicit jitter term.
#[must_use]
pub fn retry_delay_with_jitter(retried: u32, jitter_secs: u64) -> Duration {
    let n = u64::from(retried);
    let secs = n
        .saturating_pow(4)
        .saturating_add(15)
        .saturating_add(jitter_secs.saturating_mul(n.saturating_add(1)));
    Duration::from_secs(secs)
}
