//! Middleware chain for request processing.
//!
//! Middleware can inspect/modify requests before routing and inspect
//! results after execution. They run in priority order.

use nexa_protocol::{IdeError, Methods};
use serde_json::Value;
use tracing::{debug, info};

/// Middleware result: whether to allow or reject the request.
pub struct MiddlewareResult {
    /// Whether the request should proceed
    pub allowed: bool,
    /// Optionally modified params
    pub params: Option<Value>,
    /// Error returned to the caller if rejected
    pub error: Option<IdeError>,
}

impl MiddlewareResult {
    pub fn allow(params: Option<Value>) -> Self {
        Self {
            allowed: true,
            params,
            error: None,
        }
    }

    pub fn reject(error: IdeError) -> Self {
        Self {
            allowed: false,
            params: None,
            error: Some(error),
        }
    }
}

/// Trait for request middleware.
pub trait Middleware: Send + Sync {
    /// Process a request before it reaches the service.
    fn before(
        &self,
        method: &str,
        params: Option<Value>,
    ) -> impl std::future::Future<Output = MiddlewareResult> + Send;

    /// Process a result after the service returns (optional).
    fn after(
        &self,
        _method: &str,
        _params: &Value,
        _result: &Value,
    ) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }

    /// Middleware name for debugging.
    fn name(&self) -> &str;

    /// Priority (lower runs first).
    fn priority(&self) -> i32 {
        0
    }
}

/// A chain of middleware executed in priority order.
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn MiddlewareDyn>>,
}

/// Object-safe version of Middleware trait; all refs share lifetime `'a`.
trait MiddlewareDyn: Send + Sync {
    fn before_dyn<'a>(
        &'a self,
        method: &'a str,
        params: Option<Value>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = MiddlewareResult> + Send + 'a>>;

    fn after_dyn<'a>(
        &'a self,
        method: &'a str,
        params: &'a Value,
        result: &'a Value,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>>;

    fn name_dyn(&self) -> &str;
    fn priority_dyn(&self) -> i32;
}

impl<T: Middleware> MiddlewareDyn for T {
    fn before_dyn<'a>(
        &'a self,
        method: &'a str,
        params: Option<Value>,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = MiddlewareResult> + Send + 'a>> {
        Box::pin(self.before(method, params))
    }

    fn after_dyn<'a>(
        &'a self,
        method: &'a str,
        params: &'a Value,
        result: &'a Value,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(self.after(method, params, result))
    }

    fn name_dyn(&self) -> &str {
        self.name()
    }

    fn priority_dyn(&self) -> i32 {
        self.priority()
    }
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware + 'static>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
        self.middlewares.sort_by_key(|m| m.priority_dyn());
    }

    /// Run the before-chain. Returns the (possibly modified) params or a rejection.
    pub async fn run_before(&self, method: &str, mut params: Option<Value>) -> MiddlewareResult {
        for mw in &self.middlewares {
            let result = mw.before_dyn(method, params.clone()).await;
            if !result.allowed {
                return result;
            }
            if let Some(modified) = result.params {
                params = Some(modified);
            }
        }
        MiddlewareResult::allow(params)
    }

    /// Run the after-chain.
    pub async fn run_after(&self, method: &str, params: &Value, result: &Value) {
        for mw in &self.middlewares {
            mw.after_dyn(method, params, result).await;
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name_dyn()).collect()
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Path guard
// ─────────────────────────────────────────────────────────────────────────────

/// Validates `file_path` on every per-file method before it reaches storage.
///
/// One leading `./` is stripped; empty or absolute paths, backslashes and
/// `.`, `..` or empty segments are rejected with `InvalidParams`.
pub struct PathGuard;

impl PathGuard {
    fn guards(method: &str) -> bool {
        matches!(
            method,
            Methods::FILES_READ | Methods::FILES_CREATE | Methods::FILES_UPDATE | Methods::FILES_DELETE
        )
    }

    /// The accepted form of `path`, or the reason it is refused.
    pub fn check(path: &str) -> Result<&str, &'static str> {
        let path = path.strip_prefix("./").unwrap_or(path);
        if path.is_empty() {
            return Err("file_path is empty");
        }
        if path.starts_with('/') {
            return Err("file_path must be relative");
        }
        if path.contains('\\') {
            return Err("backslashes are not allowed");
        }
        if path.split('/').any(|s| s.is_empty() || s == "." || s == "..") {
            return Err("file_path has an empty or relative segment");
        }
        Ok(path)
    }
}

impl Middleware for PathGuard {
    async fn before(&self, method: &str, params: Option<Value>) -> MiddlewareResult {
        if !Self::guards(method) {
            return MiddlewareResult::allow(params);
        }
        let Some(mut params) = params else {
            return MiddlewareResult::allow(None);
        };
        let Some(raw) = params.get("file_path").and_then(Value::as_str) else {
            // Missing or non-string paths are reported by the service's own parsing.
            return MiddlewareResult::allow(Some(params));
        };
        let rewritten = match Self::check(raw) {
            Ok(clean) => (clean != raw).then(|| clean.to_string()),
            Err(reason) => {
                debug!("Rejected {method}: {reason} ({raw})");
                return MiddlewareResult::reject(IdeError::invalid_params(format!(
                    "Invalid file_path '{raw}': {reason}"
                )));
            }
        };
        if let Some(clean) = rewritten {
            params["file_path"] = Value::String(clean);
        }
        MiddlewareResult::allow(Some(params))
    }

    fn name(&self) -> &str {
        "path-guard"
    }

    fn priority(&self) -> i32 {
        -10
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Request log
// ─────────────────────────────────────────────────────────────────────────────

/// Logs every request, and each completed write at info level.
pub struct RequestLog;

impl Middleware for RequestLog {
    async fn before(&self, method: &str, params: Option<Value>) -> MiddlewareResult {
        debug!("→ {method}");
        MiddlewareResult::allow(params)
    }

    async fn after(&self, method: &str, params: &Value, _result: &Value) {
        if matches!(method, Methods::FILES_CREATE | Methods::FILES_UPDATE | Methods::FILES_DELETE) {
            let path = params.get("file_path").and_then(Value::as_str).unwrap_or("?");
            info!("{method} {path}");
        }
    }

    fn name(&self) -> &str {
        "request-log"
    }

    fn priority(&self) -> i32 {
        100
    }
}
