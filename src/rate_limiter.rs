use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::RateLimitConfig;

/// In-memory per-key sliding-window attempt counter.
///
/// A single coarse `Mutex` guards the whole table; per-key cardinality for
/// this hub (distinct client IPs hitting `/api/subscribe`) is small enough
/// that sharding by key hash isn't warranted.
pub struct RateLimiter {
    max_attempts: u32,
    window: Duration,
    attempts: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            max_attempts: config.max_attempts,
            window: Duration::from_secs(config.window_seconds),
            attempts: Mutex::new(HashMap::new()),
        }
    }

    /// Returns true and records `now` against `key` iff fewer than
    /// `max_attempts` accepted attempts remain within the window. A denied
    /// attempt is not recorded, so it does not itself count toward
    /// exhausting the window.
    pub fn allow(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut table = self.attempts.lock().expect("rate limiter mutex poisoned");
        let entry = table.entry(key.to_string()).or_default();
        entry.retain(|&t| now.duration_since(t) < self.window);

        if entry.len() as u32 >= self.max_attempts {
            return false;
        }
        entry.push(now);
        true
    }
}
