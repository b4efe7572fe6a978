//! Dual token-bucket admission control.
//!
//! Two buckets run in parallel: a small burst bucket that caps
//! back-to-back sends and a larger sustained bucket that caps throughput
//! over minutes. An action is admitted only when both buckets hold a full
//! token, and admission deducts one token from each.

use std::time::{Duration, Instant};

use marionette_core::config::RateLimitConfig;
use tokio::sync::Mutex;
use tracing::trace;

/// A single continuous-refill token bucket.
#[derive(Debug)]
pub struct TokenBucket {
    capacity: f64,
    /// Tokens per second.
    refill_rate: f64,
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(capacity: f64, refill_rate: f64) -> Self {
        Self {
            capacity,
            refill_rate,
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    fn refill(&mut self, now: Instant) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Tokens available as of `now`.
    pub fn available(&mut self, now: Instant) -> f64 {
        self.refill(now);
        self.tokens
    }

    fn deduct(&mut self) {
        self.tokens -= 1.0;
    }

    /// Seconds until this bucket holds a full token, zero if it already
    /// does. Meaningless for a zero-rate bucket; callers treat that as
    /// indefinitely blocked.
    fn deficit_secs(&self) -> f64 {
        if self.tokens >= 1.0 {
            0.0
        } else if self.refill_rate <= 0.0 {
            f64::INFINITY
        } else {
            (1.0 - self.tokens) / self.refill_rate
        }
    }
}

/// Combined gate over the burst and sustained buckets.
pub struct RateLimiter {
    inner: Mutex<Buckets>,
}

struct Buckets {
    short: TokenBucket,
    long: TokenBucket,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            inner: Mutex::new(Buckets {
                short: TokenBucket::new(config.short_capacity, config.short_refill_rate),
                long: TokenBucket::new(config.long_capacity, config.long_refill_rate),
            }),
        }
    }

    /// Admit one action if both buckets hold a full token, deducting from
    /// both. Returns `false` without deducting anything otherwise.
    pub async fn try_admit(&self) -> bool {
        let now = Instant::now();
        let mut buckets = self.inner.lock().await;
        if buckets.short.available(now) >= 1.0 && buckets.long.available(now) >= 1.0 {
            buckets.short.deduct();
            buckets.long.deduct();
            true
        } else {
            false
        }
    }

    /// Wait until both buckets admit, then deduct from both.
    ///
    /// The wait is computed from the larger of the two deficits and
    /// clamped so a refill that lands early is picked up promptly.
    pub async fn admit(&self) {
        loop {
            let wait = {
                let now = Instant::now();
                let mut buckets = self.inner.lock().await;
                let short_deficit = {
                    buckets.short.refill(now);
                    buckets.short.deficit_secs()
                };
                let long_deficit = {
                    buckets.long.refill(now);
                    buckets.long.deficit_secs()
                };
                if short_deficit <= 0.0 && long_deficit <= 0.0 {
                    buckets.short.deduct();
                    buckets.long.deduct();
                    return;
                }
                short_deficit.max(long_deficit)
            };
            let wait = if wait.is_finite() {
                Duration::from_secs_f64(wait.clamp(0.01, 1.0))
            } else {
                Duration::from_secs(1)
            };
            trace!(wait_ms = wait.as_millis() as u64, "Rate limiter waiting for refill");
            tokio::time::sleep(wait).await;
        }
    }
}
