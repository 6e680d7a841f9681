//! Token bucket, push-refill (threaded) variant.
//!
//! A dedicated background thread sleeps `refill_period`, refills the bucket, and notifies a
//! condition variable. Consumers short on tokens wait on that condvar (bounded by `refill_period`)
//! rather than polling, and are woken early by `set_interrupted` on shutdown.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::options::{
    TOKEN_BUCKET_DEFAULT_CAPACITY, TOKEN_BUCKET_DEFAULT_TOKENS,
    TOKEN_BUCKET_DEFAULT_SLIDING_WINDOW_US, TOKEN_BUCKET_THREADED_DEFAULT_REFILL_PERIOD_US,
};
use crate::wire::ObjectStatisticsRaw;

use super::statistics::TokenBucketStatistics;

fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch")
        .as_micros() as u64
}

struct State {
    capacity: f64,
    tokens: f64,
    refill_period_us: u64,
    last_refill_us: u64,
    collect_statistics: bool,
    sliding_window_us: u64,
    stats: TokenBucketStatistics,
}

struct Shared {
    state: Mutex<State>,
    refill_condition: Condvar,
    interrupted: AtomicBool,
}

/// A rate-limiting token bucket refilled by a dedicated background thread.
pub struct TokenBucketThreaded {
    shared: Arc<Shared>,
    refill_thread: Mutex<Option<JoinHandle<()>>>,
}

impl TokenBucketThreaded {
    pub fn new() -> Self {
        Self::with_params(
            TOKEN_BUCKET_DEFAULT_CAPACITY,
            TOKEN_BUCKET_DEFAULT_TOKENS,
            TOKEN_BUCKET_THREADED_DEFAULT_REFILL_PERIOD_US,
            true,
            TOKEN_BUCKET_DEFAULT_SLIDING_WINDOW_US,
        )
    }

    pub fn with_params(
        capacity: f64,
        tokens: f64,
        refill_period_us: u64,
        collect_statistics: bool,
        sliding_window_us: u64,
    ) -> Self {
        let shared = Arc::new(Shared {
            state: Mutex::new(State {
                capacity,
                tokens,
                refill_period_us,
                last_refill_us: now_us(),
                collect_statistics,
                sliding_window_us,
                stats: TokenBucketStatistics::new(),
            }),
            refill_condition: Condvar::new(),
            interrupted: AtomicBool::new(false),
        });

        let worker_shared = Arc::clone(&shared);
        let handle = std::thread::spawn(move || Self::run(worker_shared));

        TokenBucketThreaded {
            shared,
            refill_thread: Mutex::new(Some(handle)),
        }
    }

    /// Refill-thread body: sleep one period, refill to capacity, notify waiters. Exits once
    /// `interrupted` is observed.
    fn run(shared: Arc<Shared>) {
        loop {
            let period = {
                let state = shared.state.lock().expect("token bucket lock poisoned");
                state.refill_period_us
            };
            std::thread::sleep(Duration::from_micros(period));

            if shared.interrupted.load(Ordering::Acquire) {
                return;
            }

            {
                let mut state = shared.state.lock().expect("token bucket lock poisoned");
                state.tokens = state.capacity;
                state.last_refill_us = now_us();
            }
            shared.refill_condition.notify_all();

            if shared.interrupted.load(Ordering::Acquire) {
                return;
            }
        }
    }

    pub fn capacity(&self) -> f64 {
        self.shared.state.lock().expect("token bucket lock poisoned").capacity
    }

    pub fn token_count(&self) -> f64 {
        self.shared.state.lock().expect("token bucket lock poisoned").tokens
    }

    pub fn refill_period_us(&self) -> u64 {
        self.shared.state.lock().expect("token bucket lock poisoned").refill_period_us
    }

    pub fn set_refill_period_us(&self, period: u64) {
        self.shared.state.lock().expect("token bucket lock poisoned").refill_period_us = period;
    }

    pub fn is_statistic_collection_enabled(&self) -> bool {
        self.shared.state.lock().expect("token bucket lock poisoned").collect_statistics
    }

    pub fn set_statistic_collection(&self, collect: bool) {
        self.shared.state.lock().expect("token bucket lock poisoned").collect_statistics = collect;
    }

    pub fn normalize_tokens(&self, throughput: f64) -> f64 {
        let refill_period_us = self.shared.state.lock().expect("token bucket lock poisoned").refill_period_us;
        throughput * (refill_period_us as f64 / 1_000_000.0)
    }

    pub fn configure_rate(&self, rate: f64) {
        let mut state = self.shared.state.lock().expect("token bucket lock poisoned");
        let capacity = rate * (state.refill_period_us as f64 / 1_000_000.0);
        state.capacity = capacity;
        state.tokens = state.tokens.min(capacity);
    }

    pub fn configure_refill_period(&self, period_us: u64) {
        self.shared.state.lock().expect("token bucket lock poisoned").refill_period_us = period_us;
    }

    pub fn configure_init(&self, period_us: u64, rate: f64) {
        let mut state = self.shared.state.lock().expect("token bucket lock poisoned");
        state.refill_period_us = period_us;
        let capacity = rate * (period_us as f64 / 1_000_000.0);
        state.capacity = capacity;
        state.tokens = capacity;
    }

    fn record_out_of_tokens_stat_locked(state: &mut State, now: u64) {
        if !state.collect_statistics {
            return;
        }
        let mut factor = if state.refill_period_us == 0 {
            1.0
        } else {
            now.saturating_sub(state.last_refill_us) as f64 / state.refill_period_us as f64
        };
        if factor > 1.0 {
            factor = 1.0;
        }
        state.stats.store_stats_entry(factor as f32, state.tokens, now);
    }

    fn consume_operation(&self, consume_tokens: f64) {
        let mut state = self.shared.state.lock().expect("token bucket lock poisoned");

        loop {
            if consume_tokens <= state.tokens {
                state.tokens -= consume_tokens;
                return;
            }

            let now = now_us();
            Self::record_out_of_tokens_stat_locked(&mut state, now);

            if self.shared.interrupted.load(Ordering::Acquire) {
                // Shutting down: let the caller proceed rather than block forever.
                state.tokens = (state.tokens - consume_tokens).max(0.0);
                return;
            }

            let timeout = Duration::from_micros(state.refill_period_us.max(1));
            let (guard, timeout_result) = self
                .shared
                .refill_condition
                .wait_timeout(state, timeout)
                .expect("token bucket lock poisoned");
            state = guard;

            if timeout_result.timed_out() && self.shared.interrupted.load(Ordering::Acquire) {
                state.tokens = (state.tokens - consume_tokens).max(0.0);
                return;
            }
        }
    }

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
        let mut state = self.shared.state.lock().expect("token bucket lock poisoned");
        if !state.collect_statistics {
            return 0;
        }
        let now = now_us();
        let sliding_window_us = state.sliding_window_us;
        state.stats.garbage_collect(now, sliding_window_us);
        state.stats.collect_stats(raw)
    }

    pub fn to_string_summary(&self) -> String {
        let state = self.shared.state.lock().expect("token bucket lock poisoned");
        format!(
            "TokenBucketThreaded(capacity={}, tokens={}, refill_period_us={})",
            state.capacity, state.tokens, state.refill_period_us
        )
    }

    /// Signals the refill thread to stop and wakes any waiting consumers. Idempotent.
    fn interrupt(&self) {
        self.shared.interrupted.store(true, Ordering::Release);
        self.shared.refill_condition.notify_all();
    }
}

impl Default for TokenBucketThreaded {
    fn default() -> Self {
        TokenBucketThreaded::new()
    }
}

impl Drop for TokenBucketThreaded {
    fn drop(&mut self) {
        self.interrupt();
        if let Some(handle) = self.refill_thread.lock().expect("token bucket lock poisoned").take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consume_within_capacity_does_not_block() {
        let bucket = TokenBucketThreaded::with_params(1_000.0, 1_000.0, 50_000, false, 5_000_000);
        bucket.try_consume(400.0);
        assert_eq!(bucket.token_count(), 600.0);
    }

    #[test]
    fn configure_init_resets_capacity_and_tokens() {
        let bucket = TokenBucketThreaded::with_params(1_000.0, 1_000.0, 50_000, false, 5_000_000);
        bucket.configure_init(20_000, 500.0);
        assert_eq!(bucket.refill_period_us(), 20_000);
        assert_eq!(bucket.capacity(), 10.0);
        assert_eq!(bucket.token_count(), 10.0);
    }

    #[test]
    fn drop_joins_refill_thread_without_hanging() {
        let bucket = TokenBucketThreaded::with_params(10.0, 10.0, 5_000, true, 5_000_000);
        drop(bucket);
    }
}
