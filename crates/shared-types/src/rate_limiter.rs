//! # Rate Limiter
//!
//! Per-source token bucket used to flag request floods.
//!
//! ## Security
//!
//! Rate limiting feeds the security manager's scoring:
//! - a source that exhausts its bucket is treated as a DDoS candidate
//! - buckets are keyed by source so one noisy peer cannot starve others

use crate::entities::Timestamp;
use parking_lot::Mutex;
use std::collections::HashMap;

/// One source's bucket.
#[derive(Debug, Clone, Copy)]
struct Bucket {
    tokens: u64,
    last_refill: Timestamp,
}

/// Token bucket rate limiter keyed by source.
///
/// # Algorithm
///
/// - Each source starts with `capacity` tokens
/// - `refill_rate` tokens are added per elapsed second, capped at `capacity`
/// - Each request consumes one token; requests are rejected when empty
///
/// Time is passed in explicitly so callers drive it from their `TimeSource`.
#[derive(Debug)]
pub struct RateLimiter {
    /// Maximum tokens in a bucket.
    capacity: u64,
    /// Tokens to add per second.
    refill_rate: u64,
    buckets: Mutex<HashMap<String, Bucket>>,
}

impl RateLimiter {
    /// Create a new rate limiter.
    ///
    /// # Parameters
    ///
    /// - `capacity`: Maximum burst size per source
    /// - `refill_rate`: Tokens per second per source
    pub fn new(capacity: u64, refill_rate: u64) -> Self {
        Self {
            capacity,
            refill_rate,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Try to acquire a token for `source`.
    ///
    /// Returns `true` if the request is allowed, `false` if rate limited.
    pub fn try_acquire(&self, source: &str, now: Timestamp) -> bool {
        let mut buckets = self.buckets.lock();
        let bucket = buckets.entry(source.to_string()).or_insert(Bucket {
            tokens: self.capacity,
            last_refill: now,
        });

        Self::refill(bucket, now, self.capacity, self.refill_rate);

        if bucket.tokens == 0 {
            return false;
        }
        bucket.tokens -= 1;
        true
    }

    /// Tokens currently available to `source` without consuming one.
    pub fn available(&self, source: &str, now: Timestamp) -> u64 {
        let mut buckets = self.buckets.lock();
        match buckets.get_mut(source) {
            Some(bucket) => {
                Self::refill(bucket, now, self.capacity, self.refill_rate);
                bucket.tokens
            }
            None => self.capacity,
        }
    }

    /// Check if `source` is rate limited without consuming a token.
    pub fn is_limited(&self, source: &str, now: Timestamp) -> bool {
        self.available(source, now) == 0
    }

    /// Drop buckets that have refilled completely.
    ///
    /// Returns the number of buckets removed.
    pub fn gc_full(&self, now: Timestamp) -> usize {
        let mut buckets = self.buckets.lock();
        let before = buckets.len();
        let (capacity, rate) = (self.capacity, self.refill_rate);
        buckets.retain(|_, bucket| {
            Self::refill(bucket, now, capacity, rate);
            bucket.tokens < capacity
        });
        before - buckets.len()
    }

    fn refill(bucket: &mut Bucket, now: Timestamp, capacity: u64, refill_rate: u64) {
        let elapsed = now.secs_since(bucket.last_refill);
        if elapsed == 0 {
            return;
        }
        let tokens_to_add = elapsed.saturating_mul(refill_rate);
        bucket.tokens = bucket.tokens.saturating_add(tokens_to_add).min(capacity);
        bucket.last_refill = now;
    }
}

/// Pre-configured rate limiters for common use cases.
pub mod presets {
    use super::RateLimiter;

    /// Bridge transaction submissions per source (2 req/sec, burst 20).
    pub fn bridge_requests() -> RateLimiter {
        RateLimiter::new(20, 2)
    }

    /// Peer wire messages per validator (50 msg/sec, burst 100).
    pub fn peer_messages() -> RateLimiter {
        RateLimiter::new(100, 50)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(secs: u64) -> Timestamp {
        Timestamp::new(secs)
    }

    #[test]
    fn test_rate_limiter_allows_within_capacity() {
        let limiter = RateLimiter::new(5, 1);
        for _ in 0..5 {
            assert!(limiter.try_acquire("10.0.0.1", ts(1000)));
        }
    }

    #[test]
    fn test_rate_limiter_blocks_over_capacity() {
        let limiter = RateLimiter::new(3, 1);
        for _ in 0..3 {
            assert!(limiter.try_acquire("10.0.0.1", ts(1000)));
        }
        assert!(!limiter.try_acquire("10.0.0.1", ts(1000)));
    }

    #[test]
    fn test_rate_limiter_is_per_source() {
        let limiter = RateLimiter::new(1, 0);
        assert!(limiter.try_acquire("a", ts(1000)));
        assert!(!limiter.try_acquire("a", ts(1000)));
        assert!(limiter.try_acquire("b", ts(1000)));
    }

    #[test]
    fn test_rate_limiter_refills_over_time() {
        let limiter = RateLimiter::new(5, 2);
        for _ in 0..5 {
            limiter.try_acquire("a", ts(1000));
        }
        assert!(limiter.is_limited("a", ts(1000)));
        assert_eq!(limiter.available("a", ts(1001)), 2);
        assert_eq!(limiter.available("a", ts(1100)), 5);
    }

    #[test]
    fn test_gc_removes_full_buckets() {
        let limiter = RateLimiter::new(2, 1);
        limiter.try_acquire("a", ts(1000));
        limiter.try_acquire("b", ts(1000));
        limiter.try_acquire("b", ts(1000));
        assert_eq!(limiter.gc_full(ts(1001)), 1);
        assert_eq!(limiter.available("b", ts(1001)), 1);
    }

    #[test]
    fn test_presets() {
        assert_eq!(presets::bridge_requests().available("x", ts(0)), 20);
        assert_eq!(presets::peer_messages().available("x", ts(0)), 100);
    }
}
