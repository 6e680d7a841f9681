//! Enforcement object types and the tagged union housekeeping/enforcement rules operate on.

pub mod drl;
pub mod noop;

use crate::result::EnforcementResult;
use crate::status::PStatus;
use crate::ticket::Ticket;
use crate::wire::ObjectStatisticsRaw;

use drl::{DRLConfiguration, DynamicRateLimiter, RefillDiscipline};
use noop::NoopObject;

/// The kinds of enforcement object a housekeeping rule may instantiate. `object_type` on the wire
/// is an `i64`; unrecognized values resolve to `None` rather than panicking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnforcementObjectType {
    Drl,
    Noop,
}

impl EnforcementObjectType {
    pub fn from_wire(value: i64) -> Option<Self> {
        match value {
            0 => Some(EnforcementObjectType::Noop),
            1 => Some(EnforcementObjectType::Drl),
            _ => None,
        }
    }
}

/// A reconfiguration payload for an enforcement object. Only the dynamic rate limiter currently
/// accepts configuration; every other object type answers `PStatus::NotSupported`.
#[derive(Debug, Clone, Copy)]
pub enum ObjectConfiguration {
    Drl(DRLConfiguration),
}

/// A concrete enforcement object, dispatched by kind. New kinds get a new variant here rather
/// than a trait object, matching the closed, small set the reference implementation supports.
pub enum EnforcementObject {
    Drl(DynamicRateLimiter),
    Noop(NoopObject),
}

impl EnforcementObject {
    pub fn new_drl(object_id: i64, discipline: RefillDiscipline) -> Self {
        EnforcementObject::Drl(DynamicRateLimiter::new(object_id, discipline))
    }

    pub fn new_drl_with_init(
        object_id: i64,
        discipline: RefillDiscipline,
        refill_period_us: u64,
        rate: f64,
    ) -> Self {
        EnforcementObject::Drl(DynamicRateLimiter::with_init(object_id, discipline, refill_period_us, rate))
    }

    pub fn new_noop(object_id: i64) -> Self {
        EnforcementObject::Noop(NoopObject::new(object_id))
    }

    pub fn id(&self) -> i64 {
        match self {
            EnforcementObject::Drl(drl) => drl.id(),
            EnforcementObject::Noop(noop) => noop.id(),
        }
    }

    pub fn enforce(&self, ticket: &Ticket) -> EnforcementResult {
        match self {
            EnforcementObject::Drl(drl) => drl.enforce(ticket),
            EnforcementObject::Noop(noop) => noop.enforce(ticket),
        }
    }

    pub fn configure(&self, configuration: ObjectConfiguration) -> PStatus {
        match (self, configuration) {
            (EnforcementObject::Drl(drl), ObjectConfiguration::Drl(config)) => drl.configure(config),
            (EnforcementObject::Noop(_), _) => PStatus::NotSupported,
        }
    }

    pub fn collect_stats(&self, raw: &mut ObjectStatisticsRaw) -> usize {
        match self {
            EnforcementObject::Drl(drl) => drl.collect_stats(raw),
            EnforcementObject::Noop(noop) => noop.collect_stats(raw),
        }
    }

    pub fn to_string_summary(&self) -> String {
        match self {
            EnforcementObject::Drl(drl) => drl.to_string_summary(),
            EnforcementObject::Noop(noop) => noop.to_string_summary(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn object_type_resolves_known_wire_values() {
        assert_eq!(EnforcementObjectType::from_wire(0), Some(EnforcementObjectType::Noop));
        assert_eq!(EnforcementObjectType::from_wire(1), Some(EnforcementObjectType::Drl));
        assert_eq!(EnforcementObjectType::from_wire(99), None);
    }

    #[test]
    fn noop_configure_is_not_supported() {
        let object = EnforcementObject::new_noop(-1);
        let configuration = ObjectConfiguration::Drl(DRLConfiguration::Rate(1.0));
        assert!(matches!(object.configure(configuration), PStatus::NotSupported));
    }
}
