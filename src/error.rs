//! Error types for the hide-target engine.
//!
//! Every failure the engine can report stays distinguishable all the way to
//! the control socket, so clients can render precise feedback instead of a
//! generic "operation failed".

use crate::protocol::Status;
use std::fmt;

/// Main error type for hide-list operations.
#[derive(Debug)]
pub enum HideError {
    /// Malformed package or process name, rejected before any mutation
    InvalidInput { package: String, process: String },
    /// Duplicate rule on add, missing rule on remove
    Conflict(ConflictKind),
    /// The operation cannot run in the current state
    Precondition(PreconditionKind),
    /// Reading or writing the rule database failed
    Persistence(rusqlite::Error),
    /// I/O errors
    Io(std::io::Error),
    /// Thread or resource allocation failure
    Operational(String),
    /// Configuration-related errors
    Config(ConfigError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConflictKind {
    ItemExists,
    ItemNotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreconditionKind {
    AlreadyEnabled,
    NoNamespaceSupport,
}

/// Problems loading the daemon configuration.
#[derive(Debug)]
pub enum ConfigError {
    /// Not YAML, or fields of the wrong type
    InvalidYaml(serde_yaml::Error),
    /// `--config` names a path that does not exist
    FileNotFound(std::path::PathBuf),
    /// Parsed, but a value is out of range
    Validation(String),
}

impl HideError {
    /// Wire status reported to control clients for this error.
    pub fn status(&self) -> Status {
        match self {
            HideError::InvalidInput { .. } => Status::InvalidPackage,
            HideError::Conflict(ConflictKind::ItemExists) => Status::ItemExists,
            HideError::Conflict(ConflictKind::ItemNotFound) => Status::ItemNotExist,
            HideError::Precondition(PreconditionKind::AlreadyEnabled) => Status::IsEnabled,
            HideError::Precondition(PreconditionKind::NoNamespaceSupport) => Status::NoNamespace,
            HideError::Persistence(_)
            | HideError::Io(_)
            | HideError::Operational(_)
            | HideError::Config(_) => Status::Error,
        }
    }

    pub fn invalid_input(package: &str, process: &str) -> Self {
        HideError::InvalidInput {
            package: package.to_string(),
            process: process.to_string(),
        }
    }
}

impl fmt::Display for HideError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HideError::InvalidInput { package, process } => {
                write!(f, "Invalid hide rule: [{}/{}]", package, process)
            }
            HideError::Conflict(kind) => write!(f, "{}", kind),
            HideError::Precondition(kind) => write!(f, "{}", kind),
            HideError::Persistence(err) => write!(f, "Database error: {}", err),
            HideError::Io(err) => write!(f, "I/O error: {}", err),
            HideError::Operational(msg) => write!(f, "Operational error: {}", msg),
            HideError::Config(err) => write!(f, "{}", err),
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::ItemExists => write!(f, "Target already exists in hide list"),
            ConflictKind::ItemNotFound => write!(f, "Target does not exist in hide list"),
        }
    }
}

impl fmt::Display for PreconditionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreconditionKind::AlreadyEnabled => write!(f, "Hiding is already enabled"),
            PreconditionKind::NoNamespaceSupport => {
                write!(f, "Kernel does not support mount namespaces")
            }
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidYaml(err) => write!(f, "unreadable hidelist config: {}", err),
            ConfigError::FileNotFound(path) => {
                write!(f, "no hidelist config at {}", path.display())
            }
            ConfigError::Validation(msg) => write!(f, "bad hidelist config value: {}", msg),
        }
    }
}

impl std::error::Error for HideError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            HideError::Persistence(err) => Some(err),
            HideError::Io(err) => Some(err),
            HideError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        if let ConfigError::InvalidYaml(err) = self {
            Some(err)
        } else {
            None
        }
    }
}

impl From<std::io::Error> for HideError {
    fn from(err: std::io::Error) -> Self {
        HideError::Io(err)
    }
}

impl From<rusqlite::Error> for HideError {
    fn from(err: rusqlite::Error) -> Self {
        HideError::Persistence(err)
    }
}

impl From<serde_yaml::Error> for HideError {
    fn from(err: serde_yaml::Error) -> Self {
        HideError::Config(ConfigError::InvalidYaml(err))
    }
}

impl From<ConfigError> for HideError {
    fn from(err: ConfigError) -> Self {
        HideError::Config(err)
    }
}

impl From<ConflictKind> for HideError {
    fn from(kind: ConflictKind) -> Self {
        HideError::Conflict(kind)
    }
}

impl From<PreconditionKind> for HideError {
    fn from(kind: PreconditionKind) -> Self {
        HideError::Precondition(kind)
    }
}

/// Convenience type alias for Results using HideError
pub type Result<T> = std::result::Result<T, HideError>;
