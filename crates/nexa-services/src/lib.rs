//! Nexa backend services
//!
//! Each service implements the `Service` trait and handles a namespace of
//! methods. Services are registered with the Nexa server router, which
//! dispatches requests by method prefix. The object store and bucket
//! provisioning underneath them are plain async APIs.

pub mod project;
pub mod provision;
pub mod storage;

use nexa_protocol::{HandlerResult, IdeError};
use serde::Deserialize;

pub use project::ProjectFileService;
pub use provision::{provision, ProvisionReport, REQUIRED_FOLDERS};
pub use storage::{ObjectStore, ObjectSummary, StorageError, StoredObject};

/// Trait implemented by all Nexa services.
///
/// Each service handles a namespace of methods (e.g., "files/*").
pub trait Service: Send + Sync {
    /// The namespace prefix this service handles (e.g., "files").
    fn namespace(&self) -> &str;

    /// Handle a request within this service's namespace.
    ///
    /// `method` is the full method string (e.g., "files/read").
    /// `params` is the optional JSON body.
    fn handle(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> impl std::future::Future<Output = HandlerResult> + Send;

    /// Initialize the service (called once at startup).
    fn init(&self) -> impl std::future::Future<Output = Result<(), Box<dyn std::error::Error + Send + Sync>>> + Send {
        async { Ok(()) }
    }

    /// Shutdown the service (called once at server shutdown).
    fn shutdown(&self) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }
}

pub(crate) fn parse_params<T: for<'de> Deserialize<'de>>(params: Option<serde_json::Value>) -> Result<T, IdeError> {
    match params {
        Some(v) => serde_json::from_value(v)
            .map_err(|e| IdeError::invalid_params(format!("Invalid parameters: {e}"))),
        None => Err(IdeError::invalid_params("Parameters required")),
    }
}

/// Like [`parse_params`], but a missing body means all-defaults.
pub(crate) fn parse_params_optional<T: for<'de> Deserialize<'de> + Default>(
    params: Option<serde_json::Value>,
) -> Result<T, IdeError> {
    match params {
        Some(serde_json::Value::Null) | None => Ok(T::default()),
        Some(v) => serde_json::from_value(v)
            .map_err(|e| IdeError::invalid_params(format!("Invalid parameters: {e}"))),
    }
}
