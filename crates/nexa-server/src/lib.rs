//! Nexa server: routes file-service requests to backend services.
//!
//! The server owns all services, manages the middleware chain, and
//! implements the `RequestHandler` the HTTP transport calls for every
//! REST request.

pub mod config;
pub mod error;
pub mod http;
pub mod middleware;
pub mod router;

pub use config::StorageConfig;
pub use error::{ConfigError, ServerError};
pub use http::{HttpConfig, HttpServer, RequestHandler};
pub use middleware::{PathGuard, RequestLog};
pub use router::NexaServer;
