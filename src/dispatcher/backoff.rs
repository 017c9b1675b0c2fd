use std::time::Duration;

/// Binary exponential backoff with zero jitter: `base_ms * 2^attempt`.
///
/// With the default `base_ms = 400` and `attempt` starting at 0 for the
/// first retry, attempts land at t≈0.4s, t≈0.8s, t≈1.6s.
pub fn backoff(base_ms: u64, attempt: u32) -> Duration {
    Duration::from_millis(base_ms.saturating_mul(1u64 << attempt.min(32)))
}
