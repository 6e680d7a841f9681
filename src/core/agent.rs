//! The agent: the boundary a control plane talks to. Owns a core handle, a readiness flag, and
//! stage identity; translates rule objects into core calls. Rule-file parsing and the
//! control-plane socket transport are out of core scope (§1) — rules reach the agent as already
//! -parsed values, via `employ_*` or `bootstrap_with`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use slog::{debug, Logger};

use crate::core::core::Core;
use crate::rules::{EnforcementRule, HousekeepingRule};
use crate::stage_info::StageInfo;
use crate::status::PStatus;
use crate::wire::{ChannelStatsRaw, ObjectStatisticsRaw};

pub struct Agent {
    core: Arc<Core>,
    ready: AtomicBool,
    stage_info: StageInfo,
    execute_on_receive: AtomicBool,
    logger: Logger,
}

impl Agent {
    pub fn new(core: Arc<Core>, stage_info: StageInfo, execute_on_receive: bool, logger: Logger) -> Self {
        Agent {
            core,
            ready: AtomicBool::new(false),
            stage_info,
            execute_on_receive: AtomicBool::new(execute_on_receive),
            logger,
        }
    }

    pub fn core(&self) -> &Arc<Core> {
        &self.core
    }

    /// Stages `rule`. If `execute_on_receive` is set, immediately runs every pending rule rather
    /// than waiting for an explicit `execute_housekeeping_rules` call.
    pub fn employ_housekeeping_rule(&self, rule: HousekeepingRule) -> PStatus {
        if !self.core.insert_housekeeping_rule(rule) {
            return PStatus::Error;
        }
        if self.execute_on_receive.load(Ordering::Acquire) {
            self.core.execute_housekeeping_rules()
        } else {
            PStatus::Ok
        }
    }

    pub fn execute_housekeeping_rules(&self) -> PStatus {
        self.core.execute_housekeeping_rules()
    }

    pub fn employ_enforcement_rule(&self, rule: EnforcementRule) -> PStatus {
        self.core.employ_enforcement_rule(rule.channel_id(), rule.object_id(), rule.configuration())
    }

    /// Differentiation rules (dynamically reconfiguring the channel/object hashing classifiers
    /// at runtime) are never wired into the core: `define_channel_differentiation` and
    /// `define_object_differentiation` are bootstrap-time-only operations here.
    pub fn employ_differentiation_rule(&self) -> PStatus {
        PStatus::NotSupported
    }

    pub fn collect_channel_statistics(&self, channel_id: i64, raw: &mut ChannelStatsRaw) -> PStatus {
        self.core.collect_channel_statistics(channel_id, raw)
    }

    pub fn collect_single_channel_statistic(&self, channel_id: i64, operation: usize, raw: &mut ChannelStatsRaw) -> PStatus {
        self.core.collect_channel_statistics_single(channel_id, operation, raw)
    }

    pub fn collect_detailed_channel_statistics(&self, channel_id: i64, out: &mut Vec<f64>) -> PStatus {
        self.core.collect_channel_statistics_detailed(channel_id, out)
    }

    pub fn collect_enforcement_object_statistics(&self, channel_id: i64, object_id: i64, raw: &mut ObjectStatisticsRaw) -> PStatus {
        self.core.collect_enforcement_object_statistics(channel_id, object_id, raw)
    }

    pub fn get_stage_name(&self) -> &str {
        self.stage_info.name()
    }

    pub fn get_stage_info(&self) -> &StageInfo {
        &self.stage_info
    }

    pub fn set_execute_on_receive(&self, value: bool) {
        self.execute_on_receive.store(value, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.ready.load(Ordering::Acquire)
    }

    pub fn mark_ready(&self) {
        self.ready.store(true, Ordering::Release);
        debug!(self.logger, "agent marked ready"; "stage" => self.stage_info.name().to_string());
    }

    /// Stands in for loading housekeeping rules from a file (out of core scope): inserts each
    /// rule and, if requested, runs the table immediately.
    pub fn bootstrap_with(&self, rules: Vec<HousekeepingRule>, execute_immediately: bool) -> PStatus {
        for rule in rules {
            if matches!(self.employ_housekeeping_rule_staged(rule), PStatus::Error) {
                return PStatus::Error;
            }
        }
        if execute_immediately {
            self.core.execute_housekeeping_rules()
        } else {
            PStatus::Ok
        }
    }

    fn employ_housekeeping_rule_staged(&self, rule: HousekeepingRule) -> PStatus {
        if self.core.insert_housekeeping_rule(rule) {
            PStatus::Ok
        } else {
            PStatus::Error
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::HousekeepingOperation;
    use slog::Discard;

    fn test_logger() -> Logger {
        Logger::root(Discard, slog::o!())
    }

    #[test]
    fn mark_ready_flips_flag() {
        let agent = Agent::new(
            Arc::new(Core::new(test_logger())),
            StageInfo::new("stage", None, 1, 1, "host", "user"),
            false,
            test_logger(),
        );
        assert!(!agent.is_ready());
        agent.mark_ready();
        assert!(agent.is_ready());
    }

    #[test]
    fn bootstrap_with_executes_staged_rules() {
        let agent = Agent::new(
            Arc::new(Core::new(test_logger())),
            StageInfo::new("stage", None, 1, 1, "host", "user"),
            false,
            test_logger(),
        );
        let rule = HousekeepingRule::new(
            1,
            HousekeepingOperation::CreateChannel {
                channel_id: 1,
                workflow: 1,
                operation_type: 0,
                operation_context: 0,
            },
        );
        assert!(matches!(agent.bootstrap_with(vec![rule], true), PStatus::Ok));
        assert_eq!(agent.core().get_total_channels(), 1);
    }

    #[test]
    fn differentiation_rules_are_not_supported() {
        let agent = Agent::new(
            Arc::new(Core::new(test_logger())),
            StageInfo::new("stage", None, 1, 1, "host", "user"),
            false,
            test_logger(),
        );
        assert!(matches!(agent.employ_differentiation_rule(), PStatus::NotSupported));
    }
}
