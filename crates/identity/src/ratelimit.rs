// Path: crates/identity/src/ratelimit.rs
//! A generic token-bucket limiter (spec §4.4.3, §6), grounded on the
//! DashMap-backed `IpLimiter` pattern: per-key buckets refilled
//! continuously at `rate` tokens/minute up to `burst`, consumed one token
//! per call.

use dashmap::DashMap;
use std::hash::Hash;
use std::sync::Arc;
use std::time::Instant;

#[derive(Clone, Copy)]
struct Bucket {
    tokens: f64,
    last: Instant,
}

/// A keyed token-bucket limiter. One instance is shared (via `Arc`/`Clone`)
/// across all callers guarding the same logical surface (e.g. "magic-link
/// requests by email", "auth endpoints by IP").
#[derive(Clone)]
pub struct TokenBucketLimiter<K: Eq + Hash + Clone + Send + Sync + 'static> {
    buckets: Arc<DashMap<K, Bucket>>,
    tokens_per_minute: f64,
    burst: f64,
}

impl<K: Eq + Hash + Clone + Send + Sync + 'static> TokenBucketLimiter<K> {
    /// `per_minute` doubles as both the refill rate and the bucket's
    /// capacity (a caller exhausting its allowance must wait roughly a
    /// minute to fully recover, matching the "N per minute" framing of
    /// every rate-limit env var in spec §6).
    pub fn new(per_minute: u32) -> Self {
        Self {
            buckets: Arc::new(DashMap::new()),
            tokens_per_minute: per_minute.max(1) as f64,
            burst: per_minute.max(1) as f64,
        }
    }

    /// Attempts to consume one token for `key`. Returns `true` if allowed.
    pub fn allow(&self, key: K) -> bool {
        let now = Instant::now();
        let mut entry = self.buckets.entry(key).or_insert_with(|| Bucket {
            tokens: self.burst,
            last: now,
        });
        let elapsed_minutes = now.duration_since(entry.last).as_secs_f64() / 60.0;
        entry.tokens = (entry.tokens + elapsed_minutes * self.tokens_per_minute).min(self.burst);
        entry.last = now;
        if entry.tokens >= 1.0 {
            entry.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Drops bucket entries untouched for longer than `idle_for`, bounding
    /// the limiter's memory use under many distinct keys (IPs, emails).
    pub fn sweep(&self, idle_for: std::time::Duration) {
        let now = Instant::now();
        self.buckets
            .retain(|_, bucket| now.duration_since(bucket.last) < idle_for);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_up_to_burst_then_rejects() {
        let limiter = TokenBucketLimiter::new(3);
        assert!(limiter.allow("a@b.co"));
        assert!(limiter.allow("a@b.co"));
        assert!(limiter.allow("a@b.co"));
        assert!(!limiter.allow("a@b.co"));
    }

    #[test]
    fn distinct_keys_have_independent_buckets() {
        let limiter = TokenBucketLimiter::new(1);
        assert!(limiter.allow("a@b.co"));
        assert!(limiter.allow("c@d.co"));
        assert!(!limiter.allow("a@b.co"));
    }
}
