//! Default constants mirrored from the reference implementation's `options.hpp`.

use std::time::Duration;

/// Number of distinct operation-type/operation-context slots addressable by the "general"
/// context-type enumeration. POSIX-specific enumerations are out of core scope.
pub const GENERAL_OPERATIONS: usize = 8;

/// Sentinel classifier value meaning "no differentiation on this field".
pub const NO_OP: u32 = 0;

pub const DEFAULT_CHANNEL_DIFFERENTIATION_WORKFLOW: bool = true;
pub const DEFAULT_CHANNEL_DIFFERENTIATION_OPERATION_TYPE: bool = false;
pub const DEFAULT_CHANNEL_DIFFERENTIATION_OPERATION_CONTEXT: bool = false;

pub const DEFAULT_OBJECT_DIFFERENTIATION_OPERATION_TYPE: bool = true;
pub const DEFAULT_OBJECT_DIFFERENTIATION_OPERATION_CONTEXT: bool = false;

pub const DEFAULT_CHANNEL_FAST_PATH: bool = true;
pub const DEFAULT_CHANNEL_STATISTIC_COLLECTION: bool = true;
pub const DEFAULT_OBJECT_STATISTIC_COLLECTION: bool = true;
pub const DEFAULT_PARALLELISM_LEVEL: usize = 4;

pub const DEFAULT_SUBMISSION_QUEUE_TIMEOUT: Duration = Duration::from_millis(500);

pub const DRL_OPTION_COLLECT_STATISTICS: bool = true;
pub const TOKEN_BUCKET_DEFAULT_CAPACITY: f64 = 50_000.0;
pub const TOKEN_BUCKET_DEFAULT_TOKENS: f64 = 50_000.0;
pub const TOKEN_BUCKET_DEFAULT_REFILL_PERIOD_US: u64 = 1_000_000;
pub const TOKEN_BUCKET_THREADED_DEFAULT_REFILL_PERIOD_US: u64 = 10_000;
pub const TOKEN_BUCKET_DEFAULT_SLIDING_WINDOW_US: u64 = 5_000_000;

/// Fixed capacity of the token-bucket statistics ring.
pub const OBJECT_STATISTICS_ENTRIES_SIZE: usize = 100;
