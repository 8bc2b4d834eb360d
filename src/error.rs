//! Structured error types for configuration resolution.

use serde::Serialize;
use std::path::PathBuf;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Resolution errors
    Undefined,
    Invalid,
    CoerceFailed,

    // Capability errors
    NotWritable,
    NotVolatile,
    NoBackends,

    // Binding errors
    NameConflict,
    BindingNotFound,
    NoSuchMember,
    NotResolvable,

    // Source errors
    FileMissing,
    SourceError,
    IoError,
    ManifestError,
}

/// Errors raised by items, backends and namespaces.
///
/// None of these are retried internally. A source having no value for a name
/// is not an error; it is reported as [`crate::Lookup::Absent`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is not defined in any backend, and has no default value")]
    Undefined { name: String },

    #[error("{name} failed validation: {reason}")]
    Invalid { name: String, reason: String },

    #[error("cannot coerce {name}: {reason}")]
    Coerce { name: String, reason: String },

    #[error("{target} is not writable")]
    NotWritable { target: String },

    #[error("{kind} is not a volatile backend")]
    NotVolatile { kind: String },

    #[error("{name} has no explicit backends and its namespace declares no BACKENDS")]
    NoBackends { name: String },

    #[error("trying to change the name of a configuration item from {current} to {requested}")]
    NameConflict { current: String, requested: String },

    #[error("namespace {namespace} does not contain the configuration item")]
    BindingNotFound { namespace: String },

    #[error("namespace {namespace} has no member {name}")]
    NoSuchMember { namespace: String, name: String },

    #[error("member {name} cannot be used that way: {reason}")]
    NotResolvable { name: String, reason: String },

    #[error("file {} is compulsory but cannot be found for {kind}", path.display())]
    FileMissing { kind: String, path: PathBuf },

    #[error("{kind} failed: {message}")]
    Source { kind: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid manifest: {0}")]
    Manifest(String),
}

impl ConfigError {
    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::Undefined { .. } => ErrorCode::Undefined,
            ConfigError::Invalid { .. } => ErrorCode::Invalid,
            ConfigError::Coerce { .. } => ErrorCode::CoerceFailed,
            ConfigError::NotWritable { .. } => ErrorCode::NotWritable,
            ConfigError::NotVolatile { .. } => ErrorCode::NotVolatile,
            ConfigError::NoBackends { .. } => ErrorCode::NoBackends,
            ConfigError::NameConflict { .. } => ErrorCode::NameConflict,
            ConfigError::BindingNotFound { .. } => ErrorCode::BindingNotFound,
            ConfigError::NoSuchMember { .. } => ErrorCode::NoSuchMember,
            ConfigError::NotResolvable { .. } => ErrorCode::NotResolvable,
            ConfigError::FileMissing { .. } => ErrorCode::FileMissing,
            ConfigError::Source { .. } => ErrorCode::SourceError,
            ConfigError::Io(_) => ErrorCode::IoError,
            ConfigError::Manifest(_) => ErrorCode::ManifestError,
        }
    }

    // Convenience constructors

    pub fn undefined(name: &str) -> Self {
        ConfigError::Undefined {
            name: name.to_string(),
        }
    }

    pub fn not_writable(target: impl Into<String>) -> Self {
        ConfigError::NotWritable {
            target: target.into(),
        }
    }

    pub fn source(kind: &str, err: impl std::fmt::Display) -> Self {
        ConfigError::Source {
            kind: kind.to_string(),
            message: err.to_string(),
        }
    }

    pub fn no_such_member(namespace: &str, name: &str) -> Self {
        ConfigError::NoSuchMember {
            namespace: namespace.to_string(),
            name: name.to_string(),
        }
    }

    pub fn not_resolvable(name: &str, reason: impl Into<String>) -> Self {
        ConfigError::NotResolvable {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
