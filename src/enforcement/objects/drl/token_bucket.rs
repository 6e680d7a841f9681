//! Token bucket, pull-refill variant.
//!
//! No background thread: every `try_consume` call itself checks whether the refill period has
//! elapsed and refills in place before (possibly) sleeping a short poll interval and retrying.

use std::sync::Mutex;
use std::thread::sleep;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::options::{
    TOKEN_BUCKET_DEFAULT_CAPACITY, TOKEN_BUCKET_DEFAULT_REFILL_PERIOD_US,
    TOKEN_BUCKET_DEFAULT_SLIDING_WINDOW_US, TOKEN_BUCKET_DEFAULT_TOKENS,
};
use crate::wire::ObjectStatisticsRaw;

use super::statistics::TokenBucketStatistics;

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_micros() as u64
}

struct Inner {
    capacity: f64,
    tokens: f64,
    refill_period_us: u64,
    next_refill_us: u64,
    last_refill_us: u64,
    collect_statistics: bool,
    sliding_window_us: u64,
    stats: TokenBucketStatistics,
}

/// A rate-limiting token bucket. Pull variant: refilled lazily by consumers.
pub struct TokenBucket {
    inner: Mutex<Inner>,
}

impl TokenBucket {
    pub fn new() -> Self {
        Self::with_params(
            TOKEN_BUCKET_DEFAULT_CAPACITY,
            TOKEN_BUCKET_DEFAULT_TOKENS,
            TOKEN_BUCKET_DEFAULT_REFILL_PERIOD_US,
            true,
            TOKEN_BUCKET_DEFAULT_SLIDING_WINDOW_US,
        )
    }

    pub fn with_statistics(collect_statistics: bool, sliding_window_us: u64) -> Self {
        Self::with_params(
            TOKEN_BUCKET_DEFAULT_CAPACITY,
            TOKEN_BUCKET_DEFAULT_TOKENS,
            TOKEN_BUCKET_DEFAULT_REFILL_PERIOD_US,
            collect_statistics,
            sliding_window_us,
        )
    }

    pub fn with_params(
        capacity: f64,
        tokens: f64,
        refill_period_us: u64,
        collect_statistics: bool,
        sliding_window_us: u64,
    ) -> Self {
        let now = now_us();
        TokenBucket {
            inner: Mutex::new(Inner {
                capacity,
                tokens,
                refill_period_us,
                next_refill_us: now + refill_period_us,
                last_refill_us: now,
                collect_statistics,
                sliding_window_us,
                stats: TokenBucketStatistics::new(),
            }),
        }
    }

    pub fn capacity(&self) -> f64 {
        self.inner.lock().expect("token bucket lock poisoned").capacity
    }

    pub fn token_count(&self) -> f64 {
        self.inner.lock().expect("token bucket lock poisoned").tokens
    }

    pub fn refill_period_us(&self) -> u64 {
        self.inner.lock().expect("token bucket lock poisoned").refill_period_us
    }

    pub fn set_refill_period_us(&self, period: u64) {
        self.inner.lock().expect("token bucket lock poisoned").refill_period_us = period;
    }

    pub fn is_statistic_collection_enabled(&self) -> bool {
        self.inner.lock().expect("token bucket lock poisoned").collect_statistics
    }

    pub fn set_statistic_collection(&self, collect: bool) {
        self.inner.lock().expect("token bucket lock poisoned").collect_statistics = collect;
    }

    /// `capacity = throughput * (refill_period / 1e6)`.
    pub fn normalize_tokens(&self, throughput: f64) -> f64 {
        let refill_period_us = self.inner.lock().expect("token bucket lock poisoned").refill_period_us;
        throughput * (refill_period_us as f64 / 1_000_000.0)
    }

    /// `capacity <- normalize(rate)`; clamp `tokens <- min(tokens, capacity)`. Refill period
    /// unchanged.
    pub fn configure_rate(&self, rate: f64) {
        let mut inner = self.inner.lock().expect("token bucket lock poisoned");
        let capacity = rate * (inner.refill_period_us as f64 / 1_000_000.0);
        inner.capacity = capacity;
        inner.tokens = inner.tokens.min(capacity);
    }

    /// `refill_period <- period`; subsequent normalization uses the new period.
    pub fn configure_refill_period(&self, period_us: u64) {
        self.inner.lock().expect("token bucket lock poisoned").refill_period_us = period_us;
    }

    /// `refill_period <- period`, `capacity <- normalize(rate)`, `tokens <- capacity`.
    pub fn configure_init(&self, period_us: u64, rate: f64) {
        let mut inner = self.inner.lock().expect("token bucket lock poisoned");
        inner.refill_period_us = period_us;
        let capacity = rate * (period_us as f64 / 1_000_000.0);
        inner.capacity = capacity;
        inner.tokens = capacity;
    }

    fn try_refill_locked(inner: &mut Inner) {
        let now = now_us();
        if now >= inner.next_refill_us {
            inner.tokens = inner.capacity;
            inner.next_refill_us = now + inner.refill_period_us;
            inner.last_refill_us = now;
        }
    }

    fn record_out_of_tokens_stat_locked(inner: &mut Inner, now: u64) {
        if !inner.collect_statistics {
            return;
        }
        let denominator = (inner.last_refill_us + inner.refill_period_us).saturating_sub(inner.last_refill_us);
        let mut factor = if denominator == 0 {
            1.0
        } else {
            now.saturating_sub(inner.last_refill_us) as f64 / denominator as f64
        };
        if factor > 1.0 {
            factor = 1.0;
        }
        inner.stats.store_stats_entry(factor as f32, inner.tokens, now);
    }

    fn consume_operation(&self, consume_tokens: f64) {
        loop {
            let mut inner = self.inner.lock().expect("token bucket lock poisoned");
            Self::try_refill_locked(&mut inner);

            if consume_tokens <= inner.tokens {
                inner.tokens -= consume_tokens;
                return;
            }

            let now = now_us();
            Self::record_out_of_tokens_stat_locked(&mut inner, now);

            let remaining = inner.next_refill_us.saturating_sub(now) as f64;
            let minimum_sleep = 0.01 * inner.refill_period_us as f64;
            let sleep_us = remaining.max(minimum_sleep);
            drop(inner);

            sleep(Duration::from_micros(sleep_us as u64));
        }
    }

    /// Splits `n` into `capacity`-sized chunks plus a remainder, consuming each independently.
    pub fn try_consume(&self, n: f64) {
        let capacity = self.capacity();
        if capacity <= 0.0 {
            self.consume_operation(n);
            return;
        }

        let mut remaining = n;
        while remaining > capacity {
            self.consume_operation(capacity);
            remaining -= capacity;
        }
        if remaining > 0.0 {
            self.consume_operation(remaining);
        }
    }

    pub fn try_collect_statistics(&self, raw: &mut ObjectStatisticsRaw) -> usize {
        let mut inner = self.inner.lock().expect("token bucket lock poisoned");
        if !inner.collect_statistics {
            return 0;
        }
        let now = now_us();
        let sliding_window_us = inner.sliding_window_us;
        inner.stats.garbage_collect(now, sliding_window_us);
        inner.stats.collect_stats(raw)
    }

    pub fn to_string_summary(&self) -> String {
        let inner = self.inner.lock().expect("token bucket lock poisoned");
        format!(
            "TokenBucket(capacity={}, tokens={}, refill_period_us={})",
            inner.capacity, inner.tokens, inner.refill_period_us
        )
    }
}

impl Default for TokenBucket {
    fn default() -> Self {
        TokenBucket::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_within_capacity_does_not_block() {
        let bucket = TokenBucket::with_params(1_000.0, 1_000.0, 1_000_000, false, 5_000_000);
        bucket.try_consume(500.0);
        assert_eq!(bucket.token_count(), 500.0);
    }

    #[test]
    fn normalize_tokens_scales_by_refill_window() {
        let bucket = TokenBucket::with_params(0.0, 0.0, 500_000, false, 5_000_000);
        assert_eq!(bucket.normalize_tokens(100.0), 50.0);
    }

    #[test]
    fn configure_rate_clamps_existing_tokens() {
        let bucket = TokenBucket::with_params(1_000.0, 1_000.0, 1_000_000, false, 5_000_000);
        bucket.configure_rate(100.0);
        assert_eq!(bucket.capacity(), 100.0);
        assert_eq!(bucket.token_count(), 100.0);
    }

    #[test]
    fn consume_blocks_until_refill_when_short() {
        let bucket = TokenBucket::with_params(10.0, 0.0, 20_000, true, 5_000_000);
        bucket.try_consume(5.0);
        assert!(bucket.token_count() <= 10.0);
    }
}
