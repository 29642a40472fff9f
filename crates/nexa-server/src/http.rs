//! HTTP transport using Axum.
//!
//! Maps the REST surface of the file service onto service methods and
//! turns `IdeError`s into `{ "error", "code" }` bodies with a matching
//! HTTP status.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use nexa_protocol::{HandlerResult, IdeError, Methods, Routes};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::error::ServerError;

/// Implemented by the Nexa server to handle incoming requests.
/// The transport calls this once per REST request.
pub trait RequestHandler: Send + Sync + 'static {
    fn handle_request(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> impl std::future::Future<Output = HandlerResult> + Send;
}

/// HTTP transport configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
    /// Answer cross-origin requests from any origin
    pub enable_cors: bool,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            port: 5000,
            hostname: "127.0.0.1".into(),
            enable_cors: false,
        }
    }
}

/// The HTTP server; owns the listener task.
pub struct HttpServer {
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound port
    port: u16,
}

impl HttpServer {
    /// Bind and start serving in a background task.
    pub async fn start<H: RequestHandler>(config: HttpConfig, handler: Arc<H>) -> Result<Self, ServerError> {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let app = router(handler, config.enable_cors);
        let addr: SocketAddr = format!("{}:{}", config.hostname, config.port).parse()?;
        let listener = tokio::net::TcpListener::bind(addr).await?;
        let actual_port = listener.local_addr()?.port();

        info!("Nexa file service listening on http://{}:{}", config.hostname, actual_port);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await
                .ok();
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            port: actual_port,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Nexa HTTP server stopped");
    }
}

/// Build the REST router around a request handler.
pub fn router<H: RequestHandler>(handler: Arc<H>, enable_cors: bool) -> Router {
    let app = Router::new()
        .route(
            Routes::IDE_FILES,
            get(list_files::<H>)
                .post(create_file::<H>)
                .put(update_file::<H>)
                .delete(delete_file::<H>),
        )
        .route(Routes::LOAD_WORKSPACE_PROJECT, post(load_workspace::<H>))
        .route(Routes::HEALTH, get(health::<H>))
        .with_state(handler);

    if enable_cors {
        app.layer(ServiceBuilder::new().layer(CorsLayer::permissive()))
    } else {
        app
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP Handlers
// ─────────────────────────────────────────────────────────────────────────────

async fn list_files<H: RequestHandler>(State(handler): State<Arc<H>>) -> Response {
    respond(handler.handle_request(Methods::FILES_LIST, None).await)
}

async fn create_file<H: RequestHandler>(State(handler): State<Arc<H>>, body: Bytes) -> Response {
    dispatch(&*handler, Methods::FILES_CREATE, &body).await
}

async fn update_file<H: RequestHandler>(State(handler): State<Arc<H>>, body: Bytes) -> Response {
    dispatch(&*handler, Methods::FILES_UPDATE, &body).await
}

async fn delete_file<H: RequestHandler>(State(handler): State<Arc<H>>, body: Bytes) -> Response {
    dispatch(&*handler, Methods::FILES_DELETE, &body).await
}

async fn load_workspace<H: RequestHandler>(State(handler): State<Arc<H>>, body: Bytes) -> Response {
    dispatch(&*handler, Methods::FILES_LOAD, &body).await
}

async fn health<H: RequestHandler>(State(handler): State<Arc<H>>) -> Response {
    match handler.handle_request(Methods::SERVER_INFO, None).await {
        Ok(info) => Json(json!({ "status": "ok", "server": info })).into_response(),
        Err(e) => error_response(e),
    }
}

/// Parse an optional JSON body and hand it to the handler.
async fn dispatch<H: RequestHandler>(handler: &H, method: &str, body: &[u8]) -> Response {
    let params = if body.iter().all(u8::is_ascii_whitespace) {
        None
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => Some(value),
            Err(e) => return error_response(IdeError::parse_error(format!("Invalid JSON body: {e}"))),
        }
    };
    respond(handler.handle_request(method, params).await)
}

fn respond(result: HandlerResult) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => error_response(e),
    }
}

fn error_response(error: IdeError) -> Response {
    let status = StatusCode::from_u16(error.error_code().http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error)).into_response()
}
