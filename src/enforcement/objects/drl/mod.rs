//! Dynamic rate limiter enforcement object: wraps either refill discipline behind one
//! `enforce`/`configure`/`collect_stats` surface.

pub mod statistics;
pub mod token_bucket;
pub mod token_bucket_threaded;

use crate::options::{DRL_OPTION_COLLECT_STATISTICS, TOKEN_BUCKET_DEFAULT_SLIDING_WINDOW_US};
use crate::result::{EnforcementResult, ResultStatus};
use crate::status::PStatus;
use crate::ticket::Ticket;
use crate::wire::ObjectStatisticsRaw;

use token_bucket::TokenBucket;
use token_bucket_threaded::TokenBucketThreaded;

/// A housekeeping-rule `configure(...)` payload for a dynamic rate limiter. Discriminants mirror
/// the reference implementation's `DRLConfiguration` wire values; value `3` is a documented gap
/// (never assigned upstream) and is preserved rather than renumbered.
#[derive(Debug, Clone, Copy)]
pub enum DRLConfiguration {
    /// `(refill_period_us, rate)`: reinitializes both capacity and the refill period.
    Init { refill_period_us: u64, rate: f64 },
    /// `rate`: recomputes capacity from the current refill period.
    Rate(f64),
    /// `refill_period_us`: changes the refill period only.
    RefillPeriod(u64),
    /// Alias of `RefillPeriod`, numbered `4` upstream instead of `3`.
    Refill(u64),
}

impl DRLConfiguration {
    pub fn discriminant(&self) -> i32 {
        match self {
            DRLConfiguration::Init { .. } => 0,
            DRLConfiguration::Rate(_) => 1,
            DRLConfiguration::RefillPeriod(_) => 2,
            DRLConfiguration::Refill(_) => 4,
        }
    }
}

enum Bucket {
    Pull(TokenBucket),
    Push(TokenBucketThreaded),
}

/// Selects which refill discipline a dynamic rate limiter uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefillDiscipline {
    /// No background thread; refills lazily on `try_consume`.
    Pull,
    /// Background thread refills on a fixed period and wakes waiters via a condition variable.
    Push,
}

pub struct DynamicRateLimiter {
    object_id: i64,
    bucket: Bucket,
}

impl DynamicRateLimiter {
    pub fn new(object_id: i64, discipline: RefillDiscipline) -> Self {
        let bucket = match discipline {
            RefillDiscipline::Pull => Bucket::Pull(TokenBucket::with_statistics(
                DRL_OPTION_COLLECT_STATISTICS,
                TOKEN_BUCKET_DEFAULT_SLIDING_WINDOW_US,
            )),
            RefillDiscipline::Push => Bucket::Push(TokenBucketThreaded::with_params(
                crate::options::TOKEN_BUCKET_DEFAULT_CAPACITY,
                crate::options::TOKEN_BUCKET_DEFAULT_TOKENS,
                crate::options::TOKEN_BUCKET_THREADED_DEFAULT_REFILL_PERIOD_US,
                DRL_OPTION_COLLECT_STATISTICS,
                TOKEN_BUCKET_DEFAULT_SLIDING_WINDOW_US,
            )),
        };
        DynamicRateLimiter { object_id, bucket }
    }

    /// `init(refill_period, rate)` at creation time, as the reference implementation applies the
    /// first housekeeping configuration inline with object construction.
    pub fn with_init(object_id: i64, discipline: RefillDiscipline, refill_period_us: u64, rate: f64) -> Self {
        let limiter = Self::new(object_id, discipline);
        limiter.configure(DRLConfiguration::Init { refill_period_us, rate });
        limiter
    }

    pub fn id(&self) -> i64 {
        self.object_id
    }

    pub fn configure(&self, configuration: DRLConfiguration) -> PStatus {
        match configuration {
            DRLConfiguration::Init { refill_period_us, rate } => match &self.bucket {
                Bucket::Pull(b) => b.configure_init(refill_period_us, rate),
                Bucket::Push(b) => b.configure_init(refill_period_us, rate),
            },
            DRLConfiguration::Rate(rate) => match &self.bucket {
                Bucket::Pull(b) => b.configure_rate(rate),
                Bucket::Push(b) => b.configure_rate(rate),
            },
            DRLConfiguration::RefillPeriod(period) | DRLConfiguration::Refill(period) => {
                match &self.bucket {
                    Bucket::Pull(b) => b.configure_refill_period(period),
                    Bucket::Push(b) => b.configure_refill_period(period),
                }
            }
        }
        PStatus::Ok
    }

    /// Consumes `ticket.payload()` tokens (minimum 1, matching the channel's "size 0 means 1"
    /// convention) and always returns success: the bucket blocks rather than rejects.
    pub fn enforce(&self, ticket: &Ticket) -> EnforcementResult {
        let tokens = ticket.payload().max(1) as f64;
        match &self.bucket {
            Bucket::Pull(b) => b.try_consume(tokens),
            Bucket::Push(b) => b.try_consume(tokens),
        }
        let mut result = EnforcementResult::new(ResultStatus::Success);
        result.set_ticket_id(ticket.ticket_id());
        result
    }

    pub fn collect_stats(&self, raw: &mut ObjectStatisticsRaw) -> usize {
        raw.enforcement_object_id = self.object_id;
        match &self.bucket {
            Bucket::Pull(b) => b.try_collect_statistics(raw),
            Bucket::Push(b) => b.try_collect_statistics(raw),
        }
    }

    pub fn to_string_summary(&self) -> String {
        match &self.bucket {
            Bucket::Pull(b) => b.to_string_summary(),
            Bucket::Push(b) => b.to_string_summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configure_discriminants_match_wire_values() {
        assert_eq!(DRLConfiguration::Init { refill_period_us: 1, rate: 1.0 }.discriminant(), 0);
        assert_eq!(DRLConfiguration::Rate(1.0).discriminant(), 1);
        assert_eq!(DRLConfiguration::RefillPeriod(1).discriminant(), 2);
        assert_eq!(DRLConfiguration::Refill(1).discriminant(), 4);
    }

    #[test]
    fn enforce_consumes_tokens_and_succeeds() {
        let limiter = DynamicRateLimiter::with_init(1, RefillDiscipline::Pull, 1_000_000, 1_000.0);
        let ticket = Ticket::new(1, 1, 10, 1, 0);
        let result = limiter.enforce(&ticket);
        assert!(result.is_success());
        assert_eq!(result.ticket_id(), 1);
    }

    #[test]
    fn zero_payload_consumes_minimum_one_token() {
        let limiter = DynamicRateLimiter::with_init(2, RefillDiscipline::Pull, 1_000_000, 1_000.0);
        let ticket = Ticket::new(2, 1, 0, 1, 0);
        let result = limiter.enforce(&ticket);
        assert!(result.is_success());
    }
}
