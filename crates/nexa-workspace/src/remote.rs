//! Remote sync client: the boundary to the backend file service.
//!
//! Every operation is a single request/response. Nothing is retried,
//! coalesced or queued; a failure is terminal for that one call.

use std::collections::{BTreeMap, BTreeSet};
use std::future::Future;

use chrono::Utc;
use nexa_protocol::{
    DeleteFileRequest, IdeError, LoadWorkspaceRequest, LoadWorkspaceResponse, RemoteFile, Routes,
    UpsertFileRequest, WorkspaceFiles,
};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::RemoteError;

/// Operations the editor session needs from the file service.
pub trait RemoteSync: Send + Sync {
    /// Bulk load of the whole project. An empty map means "nothing to load".
    fn load_workspace(&self) -> impl Future<Output = Result<LoadWorkspaceResponse, RemoteError>> + Send;

    /// Current listing of stored files.
    fn list(&self) -> impl Future<Output = Result<BTreeMap<String, RemoteFile>, RemoteError>> + Send;

    fn create(&self, path: &str, content: &str) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn update(&self, path: &str, content: &str) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn delete(&self, path: &str) -> impl Future<Output = Result<(), RemoteError>> + Send;
}

// ─────────────────────────────────────────────────────────────────────────────
// HTTP client
// ─────────────────────────────────────────────────────────────────────────────

/// REST client for the backend file service.
pub struct HttpRemote {
    client: reqwest::Client,
    base_url: String,
    project_id: Option<String>,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            client,
            base_url,
            project_id: None,
        }
    }

    /// Ask the service to switch to this project on workspace load.
    pub fn with_project(mut self, project_id: impl Into<String>) -> Self {
        self.project_id = Some(project_id.into());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, route: &str) -> String {
        format!("{}{route}", self.base_url)
    }

    async fn upsert(&self, method: reqwest::Method, path: &str, content: &str) -> Result<(), RemoteError> {
        let body = UpsertFileRequest {
            file_path: path.to_string(),
            content: content.to_string(),
        };
        let resp = self
            .client
            .request(method, self.url(Routes::IDE_FILES))
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

impl RemoteSync for HttpRemote {
    async fn load_workspace(&self) -> Result<LoadWorkspaceResponse, RemoteError> {
        let body = LoadWorkspaceRequest {
            project_id: self.project_id.clone(),
        };
        let resp = self
            .client
            .post(self.url(Routes::LOAD_WORKSPACE_PROJECT))
            .json(&body)
            .send()
            .await?;
        let loaded: LoadWorkspaceResponse = decode(check(resp).await?).await?;
        debug!("Loaded {} files: {}", loaded.count, loaded.message);
        Ok(loaded)
    }

    async fn list(&self) -> Result<BTreeMap<String, RemoteFile>, RemoteError> {
        let resp = self.client.get(self.url(Routes::IDE_FILES)).send().await?;
        let listing: WorkspaceFiles = decode(check(resp).await?).await?;
        Ok(listing.files)
    }

    async fn create(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        self.upsert(reqwest::Method::POST, path, content).await
    }

    async fn update(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        self.upsert(reqwest::Method::PUT, path, content).await
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        let body = DeleteFileRequest {
            file_path: path.to_string(),
        };
        let resp = self
            .client
            .delete(self.url(Routes::IDE_FILES))
            .json(&body)
            .send()
            .await?;
        check(resp).await?;
        Ok(())
    }
}

/// Turn a non-success status into `RemoteError::Status`, keeping the
/// service's error message when the body carries one.
async fn check(resp: reqwest::Response) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    let message = serde_json::from_str::<IdeError>(&body)
        .map(|e| e.message)
        .unwrap_or(body);
    Err(RemoteError::Status {
        status: status.as_u16(),
        message,
    })
}

async fn decode<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, RemoteError> {
    let text = resp.text().await?;
    serde_json::from_str(&text).map_err(|e| RemoteError::Decode(e.to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// In-memory remote
// ─────────────────────────────────────────────────────────────────────────────

/// File service held in memory, for offline sessions.
///
/// Individual operations can be switched to fail, which lets a front-end
/// simulate an unreachable backend.
#[derive(Default)]
pub struct MemoryRemote {
    files: Mutex<BTreeMap<String, RemoteFile>>,
    failing: Mutex<BTreeSet<&'static str>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files<I, P, C>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, C)>,
        P: Into<String>,
        C: Into<String>,
    {
        let remote = Self::new();
        {
            let mut stored = remote.files.lock();
            for (path, content) in files {
                stored.insert(
                    path.into(),
                    RemoteFile {
                        content: content.into(),
                        last_modified: Utc::now(),
                    },
                );
            }
        }
        remote
    }

    /// Make every future call of `operation` fail until [`Self::recover`].
    /// Operation names: `load`, `list`, `create`, `update`, `delete`.
    pub fn fail_operation(&self, operation: &'static str) {
        self.failing.lock().insert(operation);
    }

    pub fn recover(&self) {
        self.failing.lock().clear();
    }

    /// Stored content of one file.
    pub fn content(&self, path: &str) -> Option<String> {
        self.files.lock().get(path).map(|f| f.content.clone())
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.lock().keys().cloned().collect()
    }

    /// Calls received so far, as `"<operation> <path>"`.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn enter(&self, operation: &'static str, path: &str) -> Result<(), RemoteError> {
        let entry = if path.is_empty() {
            operation.to_string()
        } else {
            format!("{operation} {path}")
        };
        self.calls.lock().push(entry);
        if self.failing.lock().contains(operation) {
            return Err(RemoteError::Unavailable(format!("{operation} is switched off")));
        }
        Ok(())
    }

    fn store(&self, path: &str, content: &str) {
        self.files.lock().insert(
            path.to_string(),
            RemoteFile {
                content: content.to_string(),
                last_modified: Utc::now(),
            },
        );
    }
}

impl RemoteSync for MemoryRemote {
    async fn load_workspace(&self) -> Result<LoadWorkspaceResponse, RemoteError> {
        self.enter("load", "")?;
        let files = self.files.lock().clone();
        let count = files.len();
        Ok(LoadWorkspaceResponse {
            files,
            message: format!("Loaded {count} files from memory"),
            count,
        })
    }

    async fn list(&self) -> Result<BTreeMap<String, RemoteFile>, RemoteError> {
        self.enter("list", "")?;
        Ok(self.files.lock().clone())
    }

    async fn create(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        self.enter("create", path)?;
        self.store(path, content);
        Ok(())
    }

    async fn update(&self, path: &str, content: &str) -> Result<(), RemoteError> {
        self.enter("update", path)?;
        self.store(path, content);
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), RemoteError> {
        self.enter("delete", path)?;
        self.files.lock().remove(path);
        Ok(())
    }
}
