//! A channel: one classification bucket's worker pool, submission/completion queues, and
//! enforcement-object directory.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use slog::{debug, Logger};

use crate::context::Context;
use crate::differentiation::DiffToken;
use crate::options::{DEFAULT_CHANNEL_FAST_PATH, DEFAULT_PARALLELISM_LEVEL};
use crate::result::EnforcementResult;
use crate::statistics::{ChannelStatistics, StatisticClassifier, StatisticMetric};
use crate::status::PStatus;
use crate::ticket::Ticket;
use crate::wire::{ChannelStatsRaw, ObjectStatisticsRaw};

use super::completion_queue::CompletionQueue;
use super::objects::drl::RefillDiscipline;
use super::objects::{EnforcementObject, EnforcementObjectType, ObjectConfiguration};
use super::submission_queue::SubmissionQueue;

/// One classification bucket: owns its own submission/completion queues, worker pool, and
/// enforcement-object directory. Fast-path channels never spawn workers; a request is enforced
/// synchronously on the caller's thread.
pub struct ChannelDefault {
    channel_id: i64,
    fast_path: bool,
    parallelism_level: usize,
    collect_statistics: bool,
    next_ticket_id: AtomicU64,
    submission_queue: Arc<SubmissionQueue>,
    completion_queue: Arc<CompletionQueue>,
    statistics: ChannelStatistics,
    workers: Mutex<Vec<JoinHandle<()>>>,
    logger: Logger,
}

impl ChannelDefault {
    pub fn new(channel_id: i64, logger: Logger) -> Self {
        Self::with_params(
            channel_id,
            DEFAULT_CHANNEL_FAST_PATH,
            DEFAULT_PARALLELISM_LEVEL,
            true,
            StatisticMetric::Counter,
            StatisticClassifier::OperationType,
            crate::options::DEFAULT_SUBMISSION_QUEUE_TIMEOUT,
            logger,
        )
    }

    #[allow(clippy::too_many_arguments)]
    pub fn with_params(
        channel_id: i64,
        fast_path: bool,
        parallelism_level: usize,
        collect_statistics: bool,
        metric: StatisticMetric,
        classifier: StatisticClassifier,
        submission_queue_timeout: std::time::Duration,
        logger: Logger,
    ) -> Self {
        let completion_queue = Arc::new(CompletionQueue::new());
        let submission_queue = Arc::new(SubmissionQueue::with_timeout(Arc::clone(&completion_queue), submission_queue_timeout));

        let channel = ChannelDefault {
            channel_id,
            fast_path,
            parallelism_level,
            collect_statistics,
            next_ticket_id: AtomicU64::new(0),
            submission_queue,
            completion_queue,
            statistics: ChannelStatistics::new(metric, classifier),
            workers: Mutex::new(Vec::new()),
            logger,
        };

        if !channel.fast_path {
            channel.start_workers();
        }

        channel
    }

    pub fn id(&self) -> i64 {
        self.channel_id
    }

    fn gen_ticket_id(&self) -> u64 {
        self.next_ticket_id.fetch_add(1, Ordering::Relaxed)
    }

    fn build_ticket(&self, context: &Context, content: Option<Vec<u8>>) -> Ticket {
        let ticket_id = self.gen_ticket_id();
        let operation_size = if context.operation_size() == 0 && content.is_none() {
            1
        } else {
            context.operation_size()
        };
        // payload is bytes/operation x operations (§3): the rate limiter charges this directly
        // as its basic I/O cost, so total_operations must be folded in here, not left for the
        // caller to apply a second time.
        let payload = (operation_size * context.total_operations().max(0) as u64) as i64;

        match content {
            Some(buffer) => Ticket::with_content(
                ticket_id,
                context.total_operations(),
                payload,
                context.operation_type(),
                context.operation_context(),
                buffer,
            ),
            None => Ticket::new(
                ticket_id,
                context.total_operations(),
                payload,
                context.operation_type(),
                context.operation_context(),
            ),
        }
    }

    /// Runs a request through this channel: fast-path enforces synchronously; queueing mode
    /// submits and blocks on the completion queue keyed by ticket id.
    pub fn channel_enforce(&self, context: &Context, content: Option<Vec<u8>>) -> EnforcementResult {
        let ticket = self.build_ticket(context, content);
        let ticket_id = ticket.ticket_id();

        let mut result = if self.fast_path {
            self.submission_queue.enqueue_fast_path(&ticket)
        } else {
            let queued = ticket.clone();
            self.submission_queue.enqueue(queued);
            self.completion_queue.dequeue(ticket_id)
        };
        result.set_ticket_id(ticket_id);

        if self.collect_statistics {
            // Computed from the context directly, independently of the ticket's payload (which
            // already folds total_operations in for the rate limiter's cost accounting) -
            // mirrors the reference implementation's own separate operation_size/total_operations
            // read at the statistics call site.
            let mut operation_size = context.operation_size();
            if self.statistics.metric() == StatisticMetric::Counter && operation_size == 0 {
                operation_size = 1;
            }
            let total_operations = context.total_operations().max(0) as u64;
            self.statistics
                .update_statistic_entry(context.operation_type(), context.operation_context(), total_operations * operation_size);
        }

        result
    }

    pub fn create_enforcement_object(
        &self,
        object_id: i64,
        operation_type: u32,
        operation_context: u32,
        object_type: EnforcementObjectType,
        discipline: RefillDiscipline,
        init_config: Option<(u64, f64)>,
    ) -> PStatus {
        let object = match object_type {
            EnforcementObjectType::Noop => EnforcementObject::new_noop(object_id),
            EnforcementObjectType::Drl => match init_config {
                Some((refill_period_us, rate)) => {
                    EnforcementObject::new_drl_with_init(object_id, discipline, refill_period_us, rate)
                }
                None => EnforcementObject::new_drl(object_id, discipline),
            },
        };
        self.submission_queue
            .create_enforcement_object(object_id, operation_type, operation_context, object)
    }

    pub fn configure_enforcement_object(&self, object_id: i64, configuration: ObjectConfiguration) -> PStatus {
        self.submission_queue.configure_enforcement_object(object_id, configuration)
    }

    pub fn collect_object_statistics(&self, object_id: i64, raw: &mut ObjectStatisticsRaw) -> PStatus {
        raw.channel_id = self.channel_id;
        self.submission_queue.collect_enforcement_object_statistics(object_id, raw)
    }

    pub fn collect_general_statistics(&self, raw: &mut ChannelStatsRaw) {
        raw.channel_id = self.channel_id;
        self.statistics.collect(raw);
    }

    pub fn collect_single_statistics(&self, operation: usize, raw: &mut ChannelStatsRaw) {
        raw.channel_id = self.channel_id;
        self.statistics.collect_single_entry(raw, operation);
    }

    pub fn collect_detailed_statistics(&self, out: &mut Vec<f64>) {
        self.statistics.collect_detailed_windowed_entries(out);
    }

    pub fn define_object_differentiation(&self, operation_type: bool, operation_context: bool) {
        self.submission_queue.define_object_differentiation(operation_type, operation_context);
    }

    pub fn build_object_differentiation_token(&self, operation_type: u32, operation_context: u32) -> DiffToken {
        self.submission_queue.build_object_token(operation_type, operation_context)
    }

    pub fn to_string_summary(&self) -> String {
        format!(
            "ChannelDefault(id={}, fast_path={}, objects=[{}])",
            self.channel_id,
            self.fast_path,
            self.submission_queue.objects_to_string()
        )
    }

    fn start_workers(&self) {
        let mut workers = self.workers.lock().expect("channel lock poisoned");
        for _ in 0..self.parallelism_level {
            let queue = Arc::clone(&self.submission_queue);
            workers.push(std::thread::spawn(move || queue.run()));
        }
    }

    fn join_workers(&self) {
        self.submission_queue.stop_worker();
        let mut workers = self.workers.lock().expect("channel lock poisoned");
        for handle in workers.drain(..) {
            let _ = handle.join();
        }
    }
}

impl Drop for ChannelDefault {
    fn drop(&mut self) {
        if !self.fast_path {
            self.join_workers();
        }
        debug!(self.logger, "channel terminated"; "channel_id" => self.channel_id, "stats" => self.statistics.terminate());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::Discard;

    fn test_logger() -> Logger {
        Logger::root(Discard, slog::o!())
    }

    #[test]
    fn fast_path_enforces_synchronously() {
        let channel = ChannelDefault::new(1, test_logger());
        let context = Context::new(0, 1, 0, 4096, 1);
        let result = channel.channel_enforce(&context, None);
        assert!(result.is_success());
    }

    #[test]
    fn queueing_path_round_trips_through_worker_pool() {
        let channel = ChannelDefault::with_params(
            2,
            false,
            2,
            true,
            StatisticMetric::Counter,
            StatisticClassifier::OperationType,
            crate::options::DEFAULT_SUBMISSION_QUEUE_TIMEOUT,
            test_logger(),
        );
        let context = Context::new(0, 1, 0, 4096, 1);
        let result = channel.channel_enforce(&context, None);
        assert!(result.is_success());
    }

    #[test]
    fn zero_size_request_still_counts_as_one_for_counter_metric() {
        let channel = ChannelDefault::new(3, test_logger());
        let context = Context::new(0, 1, 0, 0, 1);
        channel.channel_enforce(&context, None);

        let mut raw = ChannelStatsRaw::default();
        channel.collect_general_statistics(&mut raw);
        assert_eq!(raw.overall, 1.0);
    }
}
