//! Enforcement rules: immediate reconfiguration of an already-created enforcement object. Never
//! staged, unlike housekeeping rules.

use crate::enforcement::ObjectConfiguration;

#[derive(Debug, Clone)]
pub struct EnforcementRule {
    rule_id: i64,
    channel_id: i64,
    object_id: i64,
    configuration: ObjectConfiguration,
}

impl EnforcementRule {
    pub fn new(rule_id: i64, channel_id: i64, object_id: i64, configuration: ObjectConfiguration) -> Self {
        EnforcementRule {
            rule_id,
            channel_id,
            object_id,
            configuration,
        }
    }

    pub fn rule_id(&self) -> i64 {
        self.rule_id
    }

    pub fn channel_id(&self) -> i64 {
        self.channel_id
    }

    pub fn object_id(&self) -> i64 {
        self.object_id
    }

    pub fn configuration(&self) -> ObjectConfiguration {
        self.configuration
    }
}
