pub mod agent;
#[allow(clippy::module_inception)]
pub mod core;

pub use agent::Agent;
pub use core::{ChannelSpec, Core, CoreDefaults};
