use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for release-flow operations
#[derive(Error, Debug)]
pub enum ReleaseError {
    #[error("Invalid version format: '{0}' - expected X.Y.Z")]
    InvalidFormat(String),

    #[error("Cannot bump {kind} version of {version}: component is at its maximum")]
    VersionOverflow { version: String, kind: String },

    #[error("Could not find version in {0}")]
    VersionNotFound(String),

    #[error("Version control command failed: {command} (code {code}): {stderr}")]
    VcsCommandFailed {
        command: String,
        code: i32,
        stderr: String,
    },

    #[error("Out of order: {0}")]
    OutOfOrder(String),

    #[error("Failed to download archive {url} after {attempts} attempts: {last_error}")]
    ArchiveUnavailable {
        url: String,
        attempts: u32,
        last_error: String,
    },

    #[error("External checkout not found: {}", .path.display())]
    MissingExternalCheckout { path: PathBuf },

    #[error("Release publishing failed: {0}")]
    PublishFailed(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Convenience type alias for Results in release-flow
pub type Result<T> = std::result::Result<T, ReleaseError>;

impl ReleaseError {
    /// Create a configuration error with context
    pub fn config(msg: impl Into<String>) -> Self {
        ReleaseError::Config(msg.into())
    }

    /// Create an ordering violation error
    pub fn out_of_order(msg: impl Into<String>) -> Self {
        ReleaseError::OutOfOrder(msg.into())
    }

    /// Create a publishing error with context
    pub fn publish(msg: impl Into<String>) -> Self {
        ReleaseError::PublishFailed(msg.into())
    }

    /// Wrap a libgit2 failure for the named operation
    pub fn vcs(command: impl Into<String>, err: git2::Error) -> Self {
        ReleaseError::VcsCommandFailed {
            command: command.into(),
            code: err.raw_code(),
            stderr: err.message().to_string(),
        }
    }
}
