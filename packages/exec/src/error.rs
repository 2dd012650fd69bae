//! Error types for the execution layer.

use thiserror::Error;

/// Errors from the execution bridge.
#[derive(Debug, Error)]
pub enum ExecError {
    /// The request asked for a capability the sandbox was deliberately never
    /// designed to provide. Fatal to the calling code path, never retried,
    /// never downgraded to a warning.
    #[error("not supported in the sandbox: {feature}")]
    NotSupported { feature: &'static str },

    /// An environment entry has no name/value separator.
    #[error("invalid environment entry: {entry:?}")]
    InvalidEnvironment { entry: String },

    /// The host reported a structured failure for the child.
    #[error("exec {target:?}: {cause}")]
    Execution { target: String, cause: String },

    /// The host rejected the request with an arbitrary value.
    #[error("execution failed: {detail}")]
    Failed { detail: String },

    /// The completion signal was dropped without delivering an outcome.
    #[error("execution completion signal lost")]
    CompletionLost,

    /// Executable lookup failed.
    #[error(transparent)]
    Lookup(#[from] LookupError),

    /// Writing to a caller-provided output sink failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from absolute-path executable lookup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    /// The path names nothing, or is not absolute (the sandbox has no
    /// search path).
    #[error("executable file not found: {path}")]
    NotFound { path: String },

    /// The path names a directory.
    #[error("executable path is a directory: {path}")]
    IsDirectory { path: String },
}

/// Errors from the lock registry in strict mode.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The file identity is already held.
    #[error("lock conflict: {name:?} is already locked")]
    Conflict { name: String },

    /// The file identity is not held.
    #[error("not locked: {name:?}")]
    NotLocked { name: String },
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, ExecError>;
