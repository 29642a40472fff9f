//! Request and response bodies of the backend file service.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::IdeError;

/// One stored file as returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    pub content: String,
    pub last_modified: DateTime<Utc>,
}

/// `GET /api/ide/files` → `{ "files": { "<path>": { content, last_modified } } }`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkspaceFiles {
    #[serde(default)]
    pub files: BTreeMap<String, RemoteFile>,
}

/// `POST /api/ide/load_workspace_project` body. Every field is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoadWorkspaceRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
}

/// `POST /api/ide/load_workspace_project` response.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadWorkspaceResponse {
    #[serde(default)]
    pub files: BTreeMap<String, RemoteFile>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub count: usize,
}

/// `POST`/`PUT /api/ide/files` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpsertFileRequest {
    pub file_path: String,
    pub content: String,
}

/// `DELETE /api/ide/files` body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFileRequest {
    pub file_path: String,
}

/// Result from a backend service handler.
pub type HandlerResult = Result<serde_json::Value, IdeError>;
