//! No-op enforcement object: always succeeds without consuming anything. Used both as an
//! explicitly created object type and as the submission queue's no-match fallback.

use crate::result::{EnforcementResult, ResultStatus};
use crate::ticket::Ticket;
use crate::wire::ObjectStatisticsRaw;

pub struct NoopObject {
    object_id: i64,
    name: String,
}

impl NoopObject {
    pub fn new(object_id: i64) -> Self {
        NoopObject {
            object_id,
            name: "noop".to_string(),
        }
    }

    pub fn named(object_id: i64, name: impl Into<String>) -> Self {
        NoopObject {
            object_id,
            name: name.into(),
        }
    }

    pub fn id(&self) -> i64 {
        self.object_id
    }

    pub fn enforce(&self, ticket: &Ticket) -> EnforcementResult {
        let mut result = EnforcementResult::new(ResultStatus::Success);
        result.set_ticket_id(ticket.ticket_id());
        result
    }

    pub fn collect_stats(&self, raw: &mut ObjectStatisticsRaw) -> usize {
        raw.enforcement_object_id = self.object_id;
        raw.total = 0;
        0
    }

    pub fn to_string_summary(&self) -> String {
        format!("NoopObject(id={}, name={})", self.object_id, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn always_succeeds() {
        let object = NoopObject::new(-1);
        let ticket = Ticket::new(7, 1, 4096, 1, 0);
        let result = object.enforce(&ticket);
        assert!(result.is_success());
        assert_eq!(result.ticket_id(), 7);
    }
}
