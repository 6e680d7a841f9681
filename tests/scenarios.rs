//! End-to-end scenarios exercising the Agent/Core boundary the way a control-plane collaborator
//! would: stage a housekeeping rule, execute it, drive traffic through the resulting topology,
//! reconfigure live, and collect statistics. Scaled down from the literal request counts so the
//! suite stays fast; the routing, idempotence, and windowing behavior under test is unaffected by
//! scale.

use slog::{Discard, Logger};

use stageflow::core::{Agent, ChannelSpec, Core};
use stageflow::differentiation::ChannelDifferentiationTuple;
use stageflow::enforcement::objects::drl::{DRLConfiguration, RefillDiscipline};
use stageflow::enforcement::{EnforcementObjectType, ObjectConfiguration};
use stageflow::rules::{EnforcementRule, HousekeepingOperation, HousekeepingRule};
use stageflow::stage_info::StageInfo;
use stageflow::{Context, PStatus};
use std::sync::Arc;

fn logger() -> Logger {
    Logger::root(Discard, slog::o!())
}

fn agent_over(core: Core) -> Agent {
    Agent::new(Arc::new(core), StageInfo::new("test-stage", None, 1, 1, "host", "user"), false, logger())
}

fn tuple(workflow: u32) -> ChannelDifferentiationTuple {
    ChannelDifferentiationTuple {
        workflow,
        operation_type: 0,
        operation_context: 0,
    }
}

/// Differentiation routes correctly: two channels, one per workflow, each gets its own
/// independently-counted traffic.
#[test]
fn differentiation_routes_traffic_to_the_right_channel() {
    let agent = agent_over(Core::new(logger()));

    for (channel_id, workflow) in [(1, 1), (2, 2)] {
        let rule = HousekeepingRule::new(
            channel_id as u64,
            HousekeepingOperation::CreateChannel {
                channel_id,
                workflow,
                operation_type: 0,
                operation_context: 0,
            },
        );
        assert!(matches!(agent.employ_housekeeping_rule(rule), PStatus::Ok));
    }
    assert!(matches!(agent.execute_housekeeping_rules(), PStatus::Ok));

    for _ in 0..50 {
        let result = agent.core().enforce_request(tuple(1), &Context::new(1, 0, 0, 4096, 1), None);
        assert!(result.is_success());
    }
    for _ in 0..30 {
        let result = agent.core().enforce_request(tuple(2), &Context::new(2, 0, 0, 4096, 1), None);
        assert!(result.is_success());
    }

    let mut raw_1 = Default::default();
    let mut raw_2 = Default::default();
    agent.collect_channel_statistics(1, &mut raw_1);
    agent.collect_channel_statistics(2, &mut raw_2);
    assert_eq!(raw_1.overall, 50.0);
    assert_eq!(raw_2.overall, 30.0);
}

/// Rule replay: executing the same `create_channel` rule twice leaves exactly one channel behind
/// and reports `Enforced` on the repeat (P7).
#[test]
fn rule_replay_is_idempotent() {
    let agent = agent_over(Core::new(logger()));
    let rule = HousekeepingRule::new(
        10,
        HousekeepingOperation::CreateChannel {
            channel_id: 10,
            workflow: 1,
            operation_type: 0,
            operation_context: 0,
        },
    );
    agent.employ_housekeeping_rule(rule);

    assert!(matches!(agent.execute_housekeeping_rules(), PStatus::Ok));
    assert!(matches!(agent.execute_housekeeping_rules(), PStatus::Ok));
    assert_eq!(agent.core().get_total_channels(), 1);
}

/// Reconfigure live: a channel's rate limiter starts at one rate, traffic is admitted, an
/// enforcement rule drops the rate, and the object accepts the new configuration without
/// disturbing the channel topology.
#[test]
fn enforcement_rule_reconfigures_a_live_rate_limiter() {
    let core = Core::new(logger());
    let spec_channel = HousekeepingRule::new(
        1,
        HousekeepingOperation::CreateChannel {
            channel_id: 1,
            workflow: 1,
            operation_type: 0,
            operation_context: 0,
        },
    );
    core.insert_housekeeping_rule(spec_channel);
    assert!(matches!(core.execute_housekeeping_rule(1), PStatus::Ok));

    assert!(matches!(
        core.create_enforcement_object(1, 0, 0, 0, EnforcementObjectType::Drl, RefillDiscipline::Pull, Some((1_000_000, 100_000.0))),
        PStatus::Ok
    ));

    let agent = agent_over(core);
    let result = agent.core().enforce_request(tuple(1), &Context::new(1, 0, 0, 1, 1), None);
    assert!(result.is_success());

    let rule = EnforcementRule::new(1, 1, 0, ObjectConfiguration::Drl(DRLConfiguration::Rate(50_000.0)));
    assert!(matches!(agent.employ_enforcement_rule(rule), PStatus::Ok));
}

/// Noop object default: a channel with no enforcement objects installed still answers every
/// request via its built-in no-match noop fallback.
#[test]
fn unmatched_requests_fall_through_to_the_no_match_noop() {
    let core = Core::new(logger());
    core.create_channel(ChannelSpec::new(1, tuple(1)));

    let result = core.enforce_request(tuple(1), &Context::new(1, 0, 0, 4096, 1), None);
    assert!(result.is_success());
}

/// Statistics windowing (P6): a burst of requests raises both aggregates; the very next
/// collection with no new traffic reads the windowed counter back to zero.
#[test]
fn window_reads_back_to_zero_immediately_after_collection() {
    let core = Core::new(logger());
    core.create_channel(ChannelSpec::new(1, tuple(1)));

    for _ in 0..1_000 {
        core.enforce_request(tuple(1), &Context::new(1, 0, 0, 4096, 1), None);
    }

    let mut raw = Default::default();
    assert!(matches!(core.collect_channel_statistics(1, &mut raw), PStatus::Ok));
    assert_eq!(raw.overall, 1_000.0);
    assert_eq!(raw.windowed, 1_000.0);

    core.collect_channel_statistics(1, &mut raw);
    assert_eq!(raw.windowed, 0.0);
}
