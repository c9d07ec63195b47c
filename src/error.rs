//! Typed errors crossing the SDK boundary.
//!
//! Rule CRUD and import/export report failures as values; nothing in here is
//! ever allowed to surface on the host client's network path.

use thiserror::Error;

/// Interceptor construction failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("interceptor requires a rule engine")]
    MissingRuleEngine,
    #[error("interceptor requires a collector")]
    MissingCollector,
    #[error("body capture limit must be greater than zero")]
    ZeroBodyCapture,
}

/// Rule CRUD failures.
#[derive(Debug, Error)]
pub enum RuleStoreError {
    #[error("rule name cannot be empty")]
    EmptyName,
    #[error("no rule with id {0}")]
    NotFound(String),
    #[error("rule mode is fixed at creation and cannot be changed")]
    ModeImmutable,
}

/// Import/export failures.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("unsupported export document version {0}")]
    UnsupportedVersion(String),
    #[error("malformed export document: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("export I/O failed: {0}")]
    Io(#[from] std::io::Error),
}
