//! Result codes surfaced on every public core operation.
//!
//! `PStatus` is deliberately not a Rust `Error`: the enforcement hot path never unwinds, it
//! reports a status and lets the caller decide. Genuinely exceptional conditions (a poisoned
//! lock, a malformed configuration file) use [`crate::error::StageError`] instead.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PStatus {
    Ok,
    Error,
    NotSupported,
    Enforced,
}

impl PStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self, PStatus::Ok)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, PStatus::Error)
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, PStatus::NotSupported)
    }

    pub fn is_enforced(&self) -> bool {
        matches!(self, PStatus::Enforced)
    }
}

impl fmt::Display for PStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PStatus::Ok => "ok",
            PStatus::Error => "error",
            PStatus::NotSupported => "not_supported",
            PStatus::Enforced => "enforced",
        };
        write!(f, "{}", label)
    }
}
