//! The core: owns the channel arena, the channel-level differentiation token builder, and the
//! housekeeping rule table. Lock ordering is always Core -> channel -> object; a caller never
//! holds a channel or object lock while acquiring one of the core's.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use slog::{error, Logger};

use crate::context::Context;
use crate::differentiation::{ChannelDifferentiationTuple, ChannelHashingDifferentiation, DiffToken, HashAlgorithm};
use crate::enforcement::objects::drl::RefillDiscipline;
use crate::enforcement::{ChannelDefault, EnforcementObjectType, ObjectConfiguration};
use crate::result::{EnforcementResult, ResultStatus};
use crate::rules::{HousekeepingOperation, HousekeepingRule, HousekeepingTable};
use crate::statistics::{StatisticClassifier, StatisticMetric};
use crate::status::PStatus;
use crate::wire::{ChannelStatsRaw, ObjectStatisticsRaw};

/// Parameters for creating a channel. `Default` mirrors the options-module defaults.
#[derive(Clone)]
pub struct ChannelSpec {
    pub channel_id: i64,
    pub tuple: ChannelDifferentiationTuple,
    pub fast_path: bool,
    pub parallelism_level: usize,
    pub collect_statistics: bool,
    pub metric: StatisticMetric,
    pub classifier: StatisticClassifier,
    pub default_object_differentiation: Option<(bool, bool)>,
    pub submission_queue_timeout: Duration,
}

impl ChannelSpec {
    pub fn new(channel_id: i64, tuple: ChannelDifferentiationTuple) -> Self {
        ChannelSpec {
            channel_id,
            tuple,
            fast_path: crate::options::DEFAULT_CHANNEL_FAST_PATH,
            parallelism_level: crate::options::DEFAULT_PARALLELISM_LEVEL,
            collect_statistics: crate::options::DEFAULT_CHANNEL_STATISTIC_COLLECTION,
            metric: StatisticMetric::Counter,
            classifier: StatisticClassifier::OperationType,
            default_object_differentiation: None,
            submission_queue_timeout: crate::options::DEFAULT_SUBMISSION_QUEUE_TIMEOUT,
        }
    }
}

/// Process-wide defaults applied to every channel a housekeeping rule creates, sourced from the
/// stage's configuration file rather than from a per-rule wire payload (the wire's
/// `HousekeepingCreateChannelRaw` carries only the differentiation tuple, not these operational
/// knobs).
#[derive(Debug, Clone, Copy)]
pub struct CoreDefaults {
    pub fast_path: bool,
    pub parallelism_level: usize,
    pub collect_statistics: bool,
    pub submission_queue_timeout: Duration,
}

impl Default for CoreDefaults {
    fn default() -> Self {
        CoreDefaults {
            fast_path: crate::options::DEFAULT_CHANNEL_FAST_PATH,
            parallelism_level: crate::options::DEFAULT_PARALLELISM_LEVEL,
            collect_statistics: crate::options::DEFAULT_CHANNEL_STATISTIC_COLLECTION,
            submission_queue_timeout: crate::options::DEFAULT_SUBMISSION_QUEUE_TIMEOUT,
        }
    }
}

struct ChannelsInner {
    list: Vec<Arc<ChannelDefault>>,
    by_token: HashMap<DiffToken, usize>,
}

pub struct Core {
    channels: RwLock<ChannelsInner>,
    linkers: RwLock<HashMap<i64, DiffToken>>,
    diff_builder: ChannelHashingDifferentiation,
    housekeeping_table: HousekeepingTable,
    defaults: CoreDefaults,
    logger: Logger,
}

impl Core {
    pub fn new(logger: Logger) -> Self {
        Core::with_defaults(logger, CoreDefaults::default())
    }

    /// As [`Core::new`], but every channel a housekeeping rule creates (and the bootstrap default
    /// channel, if requested) picks up `defaults` instead of the bare `options` constants.
    pub fn with_defaults(logger: Logger, defaults: CoreDefaults) -> Self {
        Core {
            channels: RwLock::new(ChannelsInner {
                list: Vec::new(),
                by_token: HashMap::new(),
            }),
            linkers: RwLock::new(HashMap::new()),
            diff_builder: ChannelHashingDifferentiation::new(HashAlgorithm::default()),
            housekeeping_table: HousekeepingTable::new(),
            defaults,
            logger,
        }
    }

    fn channel_spec_from_defaults(&self, channel_id: i64, tuple: ChannelDifferentiationTuple) -> ChannelSpec {
        let mut spec = ChannelSpec::new(channel_id, tuple);
        spec.fast_path = self.defaults.fast_path;
        spec.parallelism_level = self.defaults.parallelism_level;
        spec.collect_statistics = self.defaults.collect_statistics;
        spec.submission_queue_timeout = self.defaults.submission_queue_timeout;
        spec
    }

    /// Mirrors the reference implementation's parameterized constructor: optionally stands up
    /// channel 0 (and, inside it, a no-op object) so a stage is usable before any housekeeping
    /// rule arrives.
    pub fn bootstrap(logger: Logger, create_default_channel: bool) -> Self {
        Core::bootstrap_with_defaults(logger, create_default_channel, CoreDefaults::default())
    }

    /// As [`Core::bootstrap`], applying `defaults` to the bootstrap channel the same way they
    /// apply to every housekeeping-rule-created channel.
    pub fn bootstrap_with_defaults(logger: Logger, create_default_channel: bool, defaults: CoreDefaults) -> Self {
        let core = Core::with_defaults(logger, defaults);
        if create_default_channel {
            let spec = core.channel_spec_from_defaults(
                0,
                ChannelDifferentiationTuple {
                    workflow: 0,
                    operation_type: 0,
                    operation_context: 0,
                },
            );
            let _ = core.create_channel(spec);
            let _ = core.create_enforcement_object(0, 0, 0, 0, EnforcementObjectType::Noop, RefillDiscipline::Pull, None);
        }
        core
    }

    pub fn define_channel_differentiation(&self, workflow: bool, operation_type: bool, operation_context: bool) {
        self.diff_builder.set_classifiers(workflow, operation_type, operation_context);
        self.diff_builder.bind();
    }

    pub fn does_channel_token_exist(&self, token: DiffToken) -> bool {
        self.channels.read().expect("core lock poisoned").by_token.contains_key(&token)
    }

    pub fn does_channel_id_exist(&self, channel_id: i64) -> bool {
        self.linkers.read().expect("core lock poisoned").contains_key(&channel_id)
    }

    pub fn create_channel(&self, spec: ChannelSpec) -> PStatus {
        let token = self.diff_builder.token_from_tuple(spec.tuple);

        if self.does_channel_token_exist(token) || self.does_channel_id_exist(spec.channel_id) {
            return PStatus::Error;
        }

        let channel_logger = self.logger.new(slog::o!("channel_id" => spec.channel_id));
        let channel = Arc::new(ChannelDefault::with_params(
            spec.channel_id,
            spec.fast_path,
            spec.parallelism_level,
            spec.collect_statistics,
            spec.metric,
            spec.classifier,
            spec.submission_queue_timeout,
            channel_logger,
        ));

        if let Some((operation_type, operation_context)) = spec.default_object_differentiation {
            channel.define_object_differentiation(operation_type, operation_context);
        }

        let mut channels = self.channels.write().expect("core lock poisoned");
        let index = channels.list.len();
        channels.by_token.insert(token, index);
        channels.list.push(channel);
        drop(channels);

        self.linkers.write().expect("core lock poisoned").insert(spec.channel_id, token);
        PStatus::Ok
    }

    fn get_channel_diff_token(&self, channel_id: i64) -> Option<DiffToken> {
        self.linkers.read().expect("core lock poisoned").get(&channel_id).copied()
    }

    fn channel_by_token(&self, token: DiffToken) -> Option<Arc<ChannelDefault>> {
        let channels = self.channels.read().expect("core lock poisoned");
        channels.by_token.get(&token).map(|&index| Arc::clone(&channels.list[index]))
    }

    pub fn select_channel(&self, channel_id: i64) -> Option<Arc<ChannelDefault>> {
        let token = self.get_channel_diff_token(channel_id)?;
        self.channel_by_token(token)
    }

    pub fn create_enforcement_object(
        &self,
        channel_id: i64,
        object_id: i64,
        operation_type: u32,
        operation_context: u32,
        object_type: EnforcementObjectType,
        discipline: RefillDiscipline,
        init_config: Option<(u64, f64)>,
    ) -> PStatus {
        match self.select_channel(channel_id) {
            Some(channel) => {
                channel.create_enforcement_object(object_id, operation_type, operation_context, object_type, discipline, init_config)
            }
            None => PStatus::Error,
        }
    }

    /// Hashes `tuple` to a channel token and dispatches. Unmatched requests are logged and
    /// dropped, returning `NotEnforced` rather than panicking: there is no enforcement object to
    /// blame for a request that never found a channel.
    pub fn enforce_request(
        &self,
        tuple: ChannelDifferentiationTuple,
        context: &Context,
        content: Option<Vec<u8>>,
    ) -> EnforcementResult {
        let token = self.diff_builder.token_from_tuple(tuple);
        match self.channel_by_token(token) {
            Some(channel) => channel.channel_enforce(context, content),
            None => {
                error!(self.logger, "no channel matches request"; "workflow" => tuple.workflow);
                EnforcementResult::new(ResultStatus::NotEnforced)
            }
        }
    }

    pub fn list_channels(&self) -> Vec<i64> {
        self.linkers.read().expect("core lock poisoned").keys().copied().collect()
    }

    pub fn get_total_channels(&self) -> usize {
        self.channels.read().expect("core lock poisoned").list.len()
    }

    pub fn insert_housekeeping_rule(&self, rule: HousekeepingRule) -> bool {
        self.housekeeping_table.insert(rule)
    }

    /// Already-enforced rules return `PStatus::Enforced` without re-running. `Configure`/`Remove`
    /// operations, which are not housekeeping concerns here, answer `NotSupported`.
    pub fn execute_housekeeping_rule(&self, rule_id: u64) -> PStatus {
        let outcome = self.housekeeping_table.with_rule(rule_id, |rule| {
            if rule.is_enforced() {
                return PStatus::Enforced;
            }

            let status = match rule.operation() {
                HousekeepingOperation::CreateChannel {
                    channel_id,
                    workflow,
                    operation_type,
                    operation_context,
                } => {
                    let spec = self.channel_spec_from_defaults(
                        *channel_id,
                        ChannelDifferentiationTuple {
                            workflow: *workflow,
                            operation_type: *operation_type,
                            operation_context: *operation_context,
                        },
                    );
                    self.create_channel(spec)
                }
                HousekeepingOperation::CreateObject {
                    channel_id,
                    object_id,
                    operation_type,
                    operation_context,
                    object_type,
                    discipline,
                    init_config,
                } => self.create_enforcement_object(
                    *channel_id,
                    *object_id,
                    *operation_type,
                    *operation_context,
                    *object_type,
                    *discipline,
                    *init_config,
                ),
                HousekeepingOperation::Configure | HousekeepingOperation::Remove => PStatus::NotSupported,
            };

            if matches!(status, PStatus::Ok) {
                rule.mark_enforced();
            }
            status
        });

        outcome.unwrap_or(PStatus::Error)
    }

    /// Executes every rule in insertion order, stopping at the first hard failure. Rules that
    /// are already enforced, or whose operation is unsupported, do not count as failures.
    pub fn execute_housekeeping_rules(&self) -> PStatus {
        for rule_id in self.housekeeping_table.rule_ids() {
            if matches!(self.execute_housekeeping_rule(rule_id), PStatus::Error) {
                return PStatus::Error;
            }
        }
        PStatus::Ok
    }

    pub fn list_housekeeping_table_rules(&self) -> String {
        self.housekeeping_table.to_string_summary()
    }

    pub fn employ_enforcement_rule(&self, channel_id: i64, object_id: i64, configuration: ObjectConfiguration) -> PStatus {
        match self.select_channel(channel_id) {
            Some(channel) => channel.configure_enforcement_object(object_id, configuration),
            None => PStatus::Error,
        }
    }

    pub fn collect_enforcement_object_statistics(&self, channel_id: i64, object_id: i64, raw: &mut ObjectStatisticsRaw) -> PStatus {
        match self.select_channel(channel_id) {
            Some(channel) => channel.collect_object_statistics(object_id, raw),
            None => PStatus::Error,
        }
    }

    pub fn collect_channel_statistics(&self, channel_id: i64, raw: &mut ChannelStatsRaw) -> PStatus {
        match self.select_channel(channel_id) {
            Some(channel) => {
                channel.collect_general_statistics(raw);
                PStatus::Ok
            }
            None => PStatus::Error,
        }
    }

    /// Single-entry flavour: collects overall/windowed aggregates for just one classified slot
    /// (`operation`), still resetting the whole windowed array per the counter's contract.
    pub fn collect_channel_statistics_single(&self, channel_id: i64, operation: usize, raw: &mut ChannelStatsRaw) -> PStatus {
        match self.select_channel(channel_id) {
            Some(channel) => {
                channel.collect_single_statistics(operation, raw);
                PStatus::Ok
            }
            None => PStatus::Error,
        }
    }

    pub fn collect_channel_statistics_detailed(&self, channel_id: i64, out: &mut Vec<f64>) -> PStatus {
        match self.select_channel(channel_id) {
            Some(channel) => {
                channel.collect_detailed_statistics(out);
                PStatus::Ok
            }
            None => PStatus::Error,
        }
    }

    pub fn set_default_object_differentiation(&self, channel_id: i64, operation_type: bool, operation_context: bool) -> PStatus {
        match self.select_channel(channel_id) {
            Some(channel) => {
                channel.define_object_differentiation(operation_type, operation_context);
                PStatus::Ok
            }
            None => PStatus::Error,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slog::Discard;

    fn test_logger() -> Logger {
        Logger::root(Discard, slog::o!())
    }

    fn default_tuple() -> ChannelDifferentiationTuple {
        ChannelDifferentiationTuple {
            workflow: 1,
            operation_type: 0,
            operation_context: 0,
        }
    }

    #[test]
    fn create_channel_rejects_duplicate_id_or_token() {
        let core = Core::new(test_logger());
        let spec = ChannelSpec::new(1, default_tuple());
        assert!(matches!(core.create_channel(spec.clone()), PStatus::Ok));
        assert!(matches!(core.create_channel(spec), PStatus::Error));
    }

    #[test]
    fn enforce_request_without_matching_channel_is_not_enforced() {
        let core = Core::new(test_logger());
        let context = Context::new(0, 1, 0, 4096, 1);
        let result = core.enforce_request(default_tuple(), &context, None);
        assert_eq!(result.status(), ResultStatus::NotEnforced);
    }

    #[test]
    fn housekeeping_rule_runs_once() {
        let core = Core::new(test_logger());
        let rule = HousekeepingRule::new(
            1,
            HousekeepingOperation::CreateChannel {
                channel_id: 5,
                workflow: 9,
                operation_type: 0,
                operation_context: 0,
            },
        );
        core.insert_housekeeping_rule(rule);

        assert!(matches!(core.execute_housekeeping_rule(1), PStatus::Ok));
        assert!(matches!(core.execute_housekeeping_rule(1), PStatus::Enforced));
        assert_eq!(core.get_total_channels(), 1);
    }

    #[test]
    fn configure_and_remove_housekeeping_kinds_are_not_supported() {
        let core = Core::new(test_logger());
        core.insert_housekeeping_rule(HousekeepingRule::new(1, HousekeepingOperation::Configure));
        core.insert_housekeeping_rule(HousekeepingRule::new(2, HousekeepingOperation::Remove));

        assert!(matches!(core.execute_housekeeping_rule(1), PStatus::NotSupported));
        assert!(matches!(core.execute_housekeeping_rule(2), PStatus::NotSupported));
    }

    #[test]
    fn housekeeping_created_channels_pick_up_core_defaults() {
        let defaults = CoreDefaults {
            fast_path: false,
            parallelism_level: 1,
            collect_statistics: true,
            submission_queue_timeout: std::time::Duration::from_millis(50),
        };
        let core = Core::with_defaults(test_logger(), defaults);
        core.insert_housekeeping_rule(HousekeepingRule::new(
            1,
            HousekeepingOperation::CreateChannel {
                channel_id: 1,
                workflow: 1,
                operation_type: 0,
                operation_context: 0,
            },
        ));
        assert!(matches!(core.execute_housekeeping_rule(1), PStatus::Ok));

        // Queueing mode (fast_path = false): the request round-trips through the worker pool
        // and completion queue rather than running synchronously, and still succeeds.
        let context = Context::new(0, 1, 0, 4096, 1);
        let result = core.enforce_request(default_tuple(), &context, None);
        assert!(result.is_success());
    }

    #[test]
    fn collect_channel_statistics_single_reports_one_classified_slot() {
        let core = Core::new(test_logger());
        let spec = ChannelSpec::new(1, default_tuple());
        core.create_channel(spec);

        let context = Context::new(0, 2, 0, 4096, 1);
        core.enforce_request(default_tuple(), &context, None);

        let mut raw = ChannelStatsRaw::default();
        assert!(matches!(core.collect_channel_statistics_single(1, 2, &mut raw), PStatus::Ok));
        assert_eq!(raw.windowed, 1.0);
    }
}
