//! Versioned YAML configuration, sniffed then parsed then normalized — the same three-stage
//! shape as the reference implementation's own config module: a bare `Version` probe, one
//! struct per schema version, and an `Internal` representation everything downstream consumes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use slog::Level;

use crate::core::CoreDefaults;
use crate::error::StageError;

#[derive(Debug, Deserialize)]
struct Version {
    version: i16,
}

fn default_true() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_parallelism_level() -> usize {
    crate::options::DEFAULT_PARALLELISM_LEVEL
}

fn default_submission_queue_timeout() -> Duration {
    crate::options::DEFAULT_SUBMISSION_QUEUE_TIMEOUT
}

#[derive(Debug, Deserialize)]
struct V1 {
    stage_name: String,
    #[serde(default)]
    env: Option<String>,
    #[serde(default = "default_true")]
    create_default_channel: bool,
    #[serde(default)]
    execute_on_receive: bool,
    #[serde(default = "default_true")]
    fast_path: bool,
    #[serde(default = "default_parallelism_level")]
    parallelism_level: usize,
    #[serde(default = "default_true")]
    collect_statistics: bool,
    #[serde(default = "default_submission_queue_timeout", with = "humantime_serde")]
    submission_queue_timeout: Duration,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default)]
    log_file: Option<PathBuf>,
}

/// Normalized configuration every version collapses into.
#[derive(Debug, Clone)]
pub struct Internal {
    pub stage_name: String,
    pub env: Option<String>,
    pub create_default_channel: bool,
    pub execute_on_receive: bool,
    pub core_defaults: CoreDefaults,
    pub log_level: Level,
    pub log_file: Option<PathBuf>,
}

impl From<V1> for Internal {
    fn from(v1: V1) -> Self {
        let log_level = parse_level(&v1.log_level);
        Internal {
            stage_name: v1.stage_name,
            env: v1.env,
            create_default_channel: v1.create_default_channel,
            execute_on_receive: v1.execute_on_receive,
            core_defaults: CoreDefaults {
                fast_path: v1.fast_path,
                parallelism_level: v1.parallelism_level,
                collect_statistics: v1.collect_statistics,
                submission_queue_timeout: v1.submission_queue_timeout,
            },
            log_level,
            log_file: v1.log_file,
        }
    }
}

fn parse_level(raw: &str) -> Level {
    match raw.to_ascii_lowercase().as_str() {
        "critical" => Level::Critical,
        "error" => Level::Error,
        "warning" | "warn" => Level::Warning,
        "info" => Level::Info,
        "debug" => Level::Debug,
        "trace" => Level::Trace,
        _ => Level::Info,
    }
}

pub fn load(path: &Path) -> Result<Internal, StageError> {
    let contents = std::fs::read_to_string(path)?;
    let version: Version = serde_yaml::from_str(&contents)?;

    match version.version {
        1 => {
            let v1: V1 = serde_yaml::from_str(&contents)?;
            Ok(Internal::from(v1))
        }
        other => Err(StageError::UnsupportedConfigVersion(other)),
    }
}
