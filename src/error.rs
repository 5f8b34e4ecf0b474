use std::path::{Path, PathBuf};
use thiserror::Error;

/// Unified error type for release-tasks operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Git operation failed: {0}")]
    Git(#[from] git2::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No version declaration found in '{}'", path.display())]
    ParseMismatch { path: PathBuf },

    #[error("Not on a release version: {value} (in '{}')", path.display())]
    FormatViolation { path: PathBuf, value: String },

    #[error("Version {value} cannot be advanced: patch number overflows")]
    VersionOverflow { value: String },

    #[error("Found {count} version declarations in '{}' but strict mode allows one", path.display())]
    MultipleVersionLines { path: PathBuf, count: usize },

    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Precondition '{check}' failed: {reason}")]
    PreconditionFailed { check: &'static str, reason: String },

    #[error("Command failed: {0}")]
    Command(String),

    #[error("Tag error: {0}")]
    Tag(String),

    #[error("Remote operation failed: {0}")]
    Remote(String),
}

/// Convenience type alias for Results in release-tasks
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        ReleaseError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub fn parse_mismatch(path: impl AsRef<Path>) -> Self {
        ReleaseError::ParseMismatch {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn format_violation(path: impl AsRef<Path>, value: impl Into<String>) -> Self {
        ReleaseError::FormatViolation {
            path: path.as_ref().to_path_buf(),
            value: value.into(),
        }
    }

    pub fn precondition(check: &'static str, reason: impl Into<String>) -> Self {
        ReleaseError::PreconditionFailed {
            check,
            reason: reason.into(),
        }
    }

    /// Create a command error with context
    pub fn command(msg: impl Into<String>) -> Self {
        ReleaseError::Command(msg.into())
    }

    /// Create a tag error with context
    pub fn tag(msg: impl Into<String>) -> Self {
        ReleaseError::Tag(msg.into())
    }

    /// Create a remote error with context
    pub fn remote(msg: impl Into<String>) -> Self {
        ReleaseError::Remote(msg.into())
    }
}
