//! Route paths and service method names.
//!
//! The HTTP layer maps each REST route onto one service method; the router
//! dispatches methods by their namespace prefix (`files/*`, `server/*`).

/// HTTP routes exposed by the backend file service.
pub struct Routes;

impl Routes {
    pub const IDE_FILES: &str = "/api/ide/files";
    pub const LOAD_WORKSPACE_PROJECT: &str = "/api/ide/load_workspace_project";
    pub const HEALTH: &str = "/health";
}

/// All service method names, grouped by namespace.
pub struct Methods;

impl Methods {
    // ── Files ───────────────────────────────────────────────────────────
    pub const FILES_LIST: &str = "files/list";
    pub const FILES_LOAD: &str = "files/load";
    pub const FILES_READ: &str = "files/read";
    pub const FILES_CREATE: &str = "files/create";
    pub const FILES_UPDATE: &str = "files/update";
    pub const FILES_DELETE: &str = "files/delete";

    // ── Server ──────────────────────────────────────────────────────────
    pub const SERVER_INFO: &str = "server/info";
}

/// Returns true if the given string belongs to a known namespace.
pub fn is_known_method(method: &str) -> bool {
    matches!(method.split('/').next(), Some("files") | Some("server"))
}
