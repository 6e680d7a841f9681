//! Ambient error hierarchy for boundaries that are allowed to fail loudly: configuration
//! loading and the rare observed-poisoned-lock case. The enforcement hot path uses
//! [`crate::status::PStatus`] instead of these types.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StageError {
    #[error("failed to read configuration file: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),

    #[error("unsupported configuration version {0}")]
    UnsupportedConfigVersion(i16),

    #[error("a lock was poisoned by a panicking thread: {0}")]
    PoisonedLock(String),
}

#[derive(Error, Debug)]
pub enum AgentError {
    #[error("stage core error: {0}")]
    Core(String),

    #[error("rule references unknown channel {0}")]
    UnknownChannel(i64),

    #[error("rule references unknown enforcement object {0}")]
    UnknownObject(i64),
}
