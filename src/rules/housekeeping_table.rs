//! The core's housekeeping rule table: insertion is idempotent on rule id, execution is
//! sequential and stops at the first failure.

use std::collections::HashMap;
use std::sync::RwLock;

use super::housekeeping::HousekeepingRule;

#[derive(Default)]
pub struct HousekeepingTable {
    rules: RwLock<Vec<HousekeepingRule>>,
    index: RwLock<HashMap<u64, usize>>,
}

impl HousekeepingTable {
    pub fn new() -> Self {
        HousekeepingTable::default()
    }

    /// Inserts `rule` unless its id already exists. Returns `false` on a duplicate id, matching
    /// the reference implementation's "insertion does not overwrite" contract.
    pub fn insert(&self, rule: HousekeepingRule) -> bool {
        let mut index = self.index.write().expect("housekeeping table lock poisoned");
        if index.contains_key(&rule.rule_id()) {
            return false;
        }

        let mut rules = self.rules.write().expect("housekeeping table lock poisoned");
        let position = rules.len();
        index.insert(rule.rule_id(), position);
        rules.push(rule);
        true
    }

    pub fn with_rule<R>(&self, rule_id: u64, f: impl FnOnce(&HousekeepingRule) -> R) -> Option<R> {
        let index = self.index.read().expect("housekeeping table lock poisoned");
        let position = *index.get(&rule_id)?;
        let rules = self.rules.read().expect("housekeeping table lock poisoned");
        rules.get(position).map(f)
    }

    /// Runs `f` over every rule in insertion order, stopping at the first `Err`.
    pub fn for_each_until_err<E>(&self, mut f: impl FnMut(&HousekeepingRule) -> Result<(), E>) -> Result<(), E> {
        let rules = self.rules.read().expect("housekeeping table lock poisoned");
        for rule in rules.iter() {
            f(rule)?;
        }
        Ok(())
    }

    /// Snapshot of rule ids in insertion order, for callers that need to iterate without holding
    /// the table's lock across each rule's execution.
    pub fn rule_ids(&self) -> Vec<u64> {
        let rules = self.rules.read().expect("housekeeping table lock poisoned");
        rules.iter().map(|rule| rule.rule_id()).collect()
    }

    pub fn len(&self) -> usize {
        self.rules.read().expect("housekeeping table lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn to_string_summary(&self) -> String {
        let rules = self.rules.read().expect("housekeeping table lock poisoned");
        rules
            .iter()
            .map(|rule| format!("rule_id={} enforced={}", rule.rule_id(), rule.is_enforced()))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::housekeeping::HousekeepingOperation;

    #[test]
    fn duplicate_rule_id_is_rejected() {
        let table = HousekeepingTable::new();
        let rule = HousekeepingRule::new(1, HousekeepingOperation::Configure);
        let duplicate = HousekeepingRule::new(1, HousekeepingOperation::Remove);

        assert!(table.insert(rule));
        assert!(!table.insert(duplicate));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn execution_stops_at_first_failure() {
        let table = HousekeepingTable::new();
        table.insert(HousekeepingRule::new(1, HousekeepingOperation::Configure));
        table.insert(HousekeepingRule::new(2, HousekeepingOperation::Remove));

        let mut visited = Vec::new();
        let result: Result<(), &'static str> = table.for_each_until_err(|rule| {
            visited.push(rule.rule_id());
            if rule.rule_id() == 1 {
                Err("boom")
            } else {
                Ok(())
            }
        });

        assert_eq!(result, Err("boom"));
        assert_eq!(visited, vec![1]);
    }
}
