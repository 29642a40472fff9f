//! Start-up errors of the backend. Per-request failures are `IdeError`s.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required setting is absent from both flags and environment.
    #[error("{0} is missing (set it in the environment or pass the flag)")]
    Missing(&'static str),

    #[error("Invalid {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Invalid listen address: {0}")]
    Address(#[from] std::net::AddrParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Service '{namespace}' failed to initialize: {message}")]
    Init { namespace: String, message: String },
}
