use std::collections::HashMap;
use std::sync::Mutex;

use rustchain_core::types::Timestamp;

/// Sliding 60s window rate limiter keyed by an arbitrary string (an IP, a
/// `(ip, endpoint)` pair already joined, or a miner id). Mirrors the
/// request-counter-per-window shape used elsewhere in the stack, just with
/// the window bound made explicit per key rather than per limiter instance.
pub struct RateLimiter {
    limit_per_window: u32,
    window_seconds: i64,
    buckets: Mutex<HashMap<String, Vec<Timestamp>>>,
}

impl RateLimiter {
    pub fn new(limit_per_window: u32, window_seconds: i64) -> Self {
        Self {
            limit_per_window,
            window_seconds,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Records one request attempt for `key` at `now`. Returns `true` if
    /// the request should be rejected (already at or above the limit
    /// within the trailing window).
    pub fn is_rate_limited(&self, key: &str, now: Timestamp) -> bool {
        let mut buckets = self.buckets.lock().expect("rate limiter mutex poisoned");
        let entry = buckets.entry(key.to_string()).or_default();
        entry.retain(|ts| now - ts < self.window_seconds);

        if entry.len() as u32 >= self.limit_per_window {
            return true;
        }
        entry.push(now);
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_limit_then_rejects() {
        let limiter = RateLimiter::new(3, 60);
        assert!(!limiter.is_rate_limited("ip1", 0));
        assert!(!limiter.is_rate_limited("ip1", 1));
        assert!(!limiter.is_rate_limited("ip1", 2));
        assert!(limiter.is_rate_limited("ip1", 3));
    }

    #[test]
    fn window_slides_and_frees_capacity() {
        let limiter = RateLimiter::new(1, 60);
        assert!(!limiter.is_rate_limited("ip1", 0));
        assert!(limiter.is_rate_limited("ip1", 30));
        assert!(!limiter.is_rate_limited("ip1", 61));
    }

    #[test]
    fn keys_are_independent() {
        let limiter = RateLimiter::new(1, 60);
        assert!(!limiter.is_rate_limited("ip1", 0));
        assert!(!limiter.is_rate_limited("ip2", 0));
    }
}
