//! Housekeeping rules: staged structural changes (create a channel, create an enforcement
//! object) applied at most once each.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::enforcement::objects::drl::RefillDiscipline;
use crate::enforcement::objects::EnforcementObjectType;

/// The structural change a housekeeping rule performs. `Configure` and `Remove` are accepted
/// values on the wire but answer `PStatus::NotSupported` when executed — reconfiguration and
/// removal are enforcement-rule and future-extension concerns respectively, not housekeeping
/// ones.
#[derive(Debug, Clone)]
pub enum HousekeepingOperation {
    CreateChannel {
        channel_id: i64,
        workflow: u32,
        operation_type: u32,
        operation_context: u32,
    },
    CreateObject {
        channel_id: i64,
        object_id: i64,
        operation_type: u32,
        operation_context: u32,
        object_type: EnforcementObjectType,
        discipline: RefillDiscipline,
        init_config: Option<(u64, f64)>,
    },
    Configure,
    Remove,
}

/// A single row of the housekeeping table. `enforced` moves false -> true exactly once: a rule
/// that has already run is never re-applied.
pub struct HousekeepingRule {
    rule_id: u64,
    operation: HousekeepingOperation,
    enforced: AtomicBool,
}

impl HousekeepingRule {
    pub fn new(rule_id: u64, operation: HousekeepingOperation) -> Self {
        HousekeepingRule {
            rule_id,
            operation,
            enforced: AtomicBool::new(false),
        }
    }

    pub fn rule_id(&self) -> u64 {
        self.rule_id
    }

    pub fn operation(&self) -> &HousekeepingOperation {
        &self.operation
    }

    pub fn is_enforced(&self) -> bool {
        self.enforced.load(Ordering::Acquire)
    }

    pub fn mark_enforced(&self) {
        self.enforced.store(true, Ordering::Release);
    }
}
