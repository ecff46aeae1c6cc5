//! Error types for the scenario harness

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using the harness error
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;

#[derive(Error, Debug)]
pub enum HarnessError {
    #[error("duplicate alias '{alias}': a registration for it is still pending")]
    DuplicateAlias { alias: String },

    #[error("alias '@{alias}' is not registered earlier in the phase chain")]
    UnregisteredAlias { alias: String },

    #[error("timed out waiting for '@{alias}' after {elapsed_ms} ms (timeout: {timeout_ms} ms)")]
    WaitTimeout {
        alias: String,
        elapsed_ms: u64,
        timeout_ms: u64,
    },

    #[error("no interactable element matched '{selector}' within {waited_ms} ms")]
    ElementNotFound { selector: String, waited_ms: u64 },

    #[error("assertion failed on '{selector}': expected {expected}, actual {actual}")]
    AssertionFailed {
        selector: String,
        expected: String,
        actual: String,
    },

    #[error("{hook} hook failed: {message}")]
    HookFailure { hook: String, message: String },

    #[error("fixture error: {0}")]
    Fixture(String),

    #[error("suite parse error: {0}")]
    SuiteParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl HarnessError {
    /// Stable tag for report records
    pub fn kind(&self) -> ErrorKind {
        match self {
            HarnessError::DuplicateAlias { .. } => ErrorKind::DuplicateAlias,
            HarnessError::UnregisteredAlias { .. } => ErrorKind::UnregisteredAlias,
            HarnessError::WaitTimeout { .. } => ErrorKind::WaitTimeout,
            HarnessError::ElementNotFound { .. } => ErrorKind::ElementNotFound,
            HarnessError::AssertionFailed { .. } => ErrorKind::AssertionFailed,
            HarnessError::HookFailure { .. } => ErrorKind::HookFailure,
            HarnessError::Fixture(_) => ErrorKind::Fixture,
            HarnessError::SuiteParse(_) => ErrorKind::SuiteParse,
            HarnessError::Io(_) => ErrorKind::Io,
            HarnessError::Json(_) | HarnessError::Yaml(_) => ErrorKind::Serialization,
        }
    }
}

/// Error classification carried by scenario reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    DuplicateAlias,
    UnregisteredAlias,
    WaitTimeout,
    ElementNotFound,
    AssertionFailed,
    HookFailure,
    Fixture,
    SuiteParse,
    Io,
    Serialization,
}
