//! Nexa server router: dispatches requests to services by namespace.

use nexa_protocol::{HandlerResult, IdeError, Methods};
use nexa_services::Service;
use parking_lot::RwLock;
use serde_json::{json, Value};
use tracing::info;

use crate::error::ServerError;
use crate::http::RequestHandler;
use crate::middleware::{Middleware, MiddlewareChain};

/// The Nexa server. Owns services and routes requests.
pub struct NexaServer {
    /// Registered services (boxed for object safety)
    services: Vec<Box<dyn ServiceDyn>>,
    /// Middleware chain
    middleware: MiddlewareChain,
    /// Server state; shutdown happens through a shared handle
    state: RwLock<ServerState>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ServerState {
    Uninitialized,
    Running,
    Shutdown,
}

impl ServerState {
    fn as_str(self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::Running => "running",
            Self::Shutdown => "shutdown",
        }
    }
}

/// Object-safe wrapper for the Service trait.
trait ServiceDyn: Send + Sync {
    fn namespace_dyn(&self) -> &str;
    fn handle_dyn<'a>(
        &'a self,
        method: &'a str,
        params: Option<Value>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = HandlerResult> + Send + 'a>>;
    fn init_dyn(
        &self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), Box<dyn std::error::Error + Send + Sync>>> + Send + '_>>;
    fn shutdown_dyn(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>>;
}

impl<T: Service> ServiceDyn for T {
    fn namespace_dyn(&self) -> &str {
        self.namespace()
    }
    fn handle_dyn<'a>(
        &'a self,
        method: &'a str,
        params: Option<Value>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = HandlerResult> + Send + 'a>> {
        Box::pin(self.handle(method, params))
    }
    fn init_dyn(
        &self,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<(), Box<dyn std::error::Error + Send + Sync>>> + Send + '_>> {
        Box::pin(self.init())
    }
    fn shutdown_dyn(&self) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + '_>> {
        Box::pin(self.shutdown())
    }
}

impl NexaServer {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
            middleware: MiddlewareChain::new(),
            state: RwLock::new(ServerState::Uninitialized),
        }
    }

    /// Register a service with the server.
    pub fn register_service<S: Service + 'static>(&mut self, service: S) {
        info!("Registering service: {}", service.namespace());
        self.services.push(Box::new(service));
    }

    pub fn add_middleware<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middleware.add(middleware);
    }

    /// Initialize all services; the server accepts requests afterwards.
    pub async fn initialize(&mut self) -> Result<(), ServerError> {
        for service in &self.services {
            service.init_dyn().await.map_err(|e| ServerError::Init {
                namespace: service.namespace_dyn().to_string(),
                message: e.to_string(),
            })?;
        }

        *self.state.write() = ServerState::Running;
        info!("Nexa server initialized ({} services)", self.services.len());
        Ok(())
    }

    /// Shutdown all services. Later requests fail with `ServerShuttingDown`.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.write();
            if *state == ServerState::Shutdown {
                return;
            }
            *state = ServerState::Shutdown;
        }

        info!("Shutting down Nexa server...");
        for service in &self.services {
            service.shutdown_dyn().await;
        }
        info!("Nexa server shutdown complete");
    }

    pub fn is_running(&self) -> bool {
        *self.state.read() == ServerState::Running
    }

    fn info(&self) -> Value {
        json!({
            "name": "nexa-ide",
            "version": env!("CARGO_PKG_VERSION"),
            "state": self.state.read().as_str(),
            "services": self.services.iter().map(|s| s.namespace_dyn()).collect::<Vec<_>>(),
            "middleware": self.middleware.names(),
        })
    }

    /// Route a request to the service owning its namespace.
    async fn route_request(&self, method: &str, params: Option<Value>) -> HandlerResult {
        if method == Methods::SERVER_INFO {
            return Ok(self.info());
        }

        let namespace = method.split('/').next().unwrap_or("");
        for service in &self.services {
            if service.namespace_dyn() == namespace {
                return service.handle_dyn(method, params).await;
            }
        }

        Err(IdeError::method_not_found(method))
    }
}

impl Default for NexaServer {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestHandler for NexaServer {
    async fn handle_request(&self, method: &str, params: Option<Value>) -> HandlerResult {
        // Copy the state out; the guard must not live across an await.
        let state = *self.state.read();
        match state {
            ServerState::Shutdown => return Err(IdeError::shutting_down()),
            ServerState::Uninitialized => return Err(IdeError::not_initialized()),
            ServerState::Running => {}
        }

        let mw_result = self.middleware.run_before(method, params).await;
        if !mw_result.allowed {
            return Err(mw_result
                .error
                .unwrap_or_else(|| IdeError::server_error("Request blocked by middleware")));
        }

        let final_params = mw_result.params;
        let result = self.route_request(method, final_params.clone()).await;

        if let Ok(ref value) = result {
            let params_value = final_params.unwrap_or(Value::Null);
            self.middleware.run_after(method, &params_value, value).await;
        }

        result
    }
}
