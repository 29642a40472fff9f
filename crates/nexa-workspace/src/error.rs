//! Error types for the workspace core.

use thiserror::Error;

/// Result type alias using the workspace error.
pub type Result<T> = std::result::Result<T, WorkspaceError>;

/// Failures of a single workspace operation.
///
/// Every variant is reported to the user and leaves the session usable.
/// A declined confirmation is not an error; see [`crate::Outcome::Declined`].
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// The operation references a path absent from the registry.
    #[error("File not found: {path}")]
    NotFound { path: String },

    /// The path or new name is empty, escapes its folder, or contains separators.
    #[error("Invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// The backend file service did not confirm the operation.
    #[error("Remote {operation} failed for {path}: {source}")]
    Remote {
        operation: &'static str,
        path: String,
        #[source]
        source: RemoteError,
    },

    /// The snapshot slot could not be written.
    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

impl WorkspaceError {
    pub(crate) fn not_found(path: impl Into<String>) -> Self {
        Self::NotFound { path: path.into() }
    }

    pub(crate) fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidName { name: name.into(), reason }
    }

    pub(crate) fn remote(operation: &'static str, path: impl Into<String>, source: RemoteError) -> Self {
        Self::Remote { operation, path: path.into(), source }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote { .. })
    }
}

/// Failures of the remote sync client. None of them are retried.
#[derive(Error, Debug)]
pub enum RemoteError {
    /// The request never produced a response (connection refused, timeout).
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("service returned {status}: {message}")]
    Status { status: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// The service is unreachable by configuration (offline double).
    #[error("remote unavailable: {0}")]
    Unavailable(String),
}
