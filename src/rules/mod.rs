pub mod enforcement_rule;
pub mod housekeeping;
pub mod housekeeping_table;

pub use enforcement_rule::EnforcementRule;
pub use housekeeping::{HousekeepingOperation, HousekeepingRule};
pub use housekeeping_table::HousekeepingTable;
