//! Project file service: one user's project files in the object store.
//!
//! Files live under `projects/{user_id}/{project_id}/{file_path}`. The
//! service answers the `files/*` methods the HTTP layer routes to it.

use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use nexa_protocol::{
    DeleteFileRequest, HandlerResult, IdeError, LoadWorkspaceRequest, LoadWorkspaceResponse, Methods,
    RemoteFile, UpsertFileRequest, WorkspaceFiles,
};
use parking_lot::RwLock;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use crate::storage::{ObjectStore, StorageError};
use crate::{parse_params, parse_params_optional, Service};

/// Top-level folder that holds every project.
pub const PROJECTS_FOLDER: &str = "projects/";

pub struct ProjectFileService {
    store: Arc<ObjectStore>,
    bucket: String,
    user_id: String,
    project_id: RwLock<String>,
}

impl ProjectFileService {
    pub fn new(
        store: Arc<ObjectStore>,
        bucket: impl Into<String>,
        user_id: impl Into<String>,
        project_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            bucket: bucket.into(),
            user_id: user_id.into(),
            project_id: RwLock::new(project_id.into()),
        }
    }

    pub fn project_id(&self) -> String {
        self.project_id.read().clone()
    }

    pub fn set_project(&self, project_id: impl Into<String>) {
        *self.project_id.write() = project_id.into();
    }

    fn prefix(&self) -> String {
        format!("{PROJECTS_FOLDER}{}/{}/", self.user_id, self.project_id.read())
    }

    fn key(&self, file_path: &str) -> String {
        format!("{}{file_path}", self.prefix())
    }

    /// Every file of the active project keyed by its project-relative path.
    pub async fn list_files(&self) -> Result<BTreeMap<String, RemoteFile>, IdeError> {
        let prefix = self.prefix();
        let objects = self
            .store
            .list_objects(&self.bucket, &prefix)
            .await
            .map_err(storage_error)?;

        let mut files = BTreeMap::new();
        for obj in objects {
            let relative = &obj.key[prefix.len()..];
            if relative.is_empty() || relative.ends_with('/') {
                continue;
            }
            let Some(stored) = self
                .store
                .get_object(&self.bucket, &obj.key)
                .await
                .map_err(storage_error)?
            else {
                continue;
            };
            files.insert(
                relative.to_string(),
                RemoteFile {
                    content: String::from_utf8_lossy(&stored.body).into_owned(),
                    last_modified: stored.last_modified,
                },
            );
        }
        Ok(files)
    }

    async fn upsert(&self, req: UpsertFileRequest) -> HandlerResult {
        self.store
            .put_object(&self.bucket, &self.key(&req.file_path), Bytes::from(req.content))
            .await
            .map_err(storage_error)?;
        Ok(json!({ "success": true, "file_path": req.file_path }))
    }
}

impl Service for ProjectFileService {
    fn namespace(&self) -> &str {
        "files"
    }

    async fn handle(&self, method: &str, params: Option<serde_json::Value>) -> HandlerResult {
        match method {
            Methods::FILES_LIST => {
                let files = self.list_files().await?;
                let count = files.len();
                let mut body = serde_json::to_value(WorkspaceFiles { files })
                    .map_err(|e| IdeError::internal(e.to_string()))?;
                body["count"] = json!(count);
                Ok(body)
            }

            Methods::FILES_LOAD => {
                let req: LoadWorkspaceRequest = parse_params_optional(params)?;
                if let Some(project_id) = req.project_id.filter(|p| !p.is_empty()) {
                    if project_id.contains(['/', '\\']) || project_id == "." || project_id == ".." {
                        return Err(IdeError::invalid_path(&project_id, "project id must be a single segment"));
                    }
                    info!("Switching project to {project_id}");
                    self.set_project(project_id);
                }
                let files = self.list_files().await?;
                let count = files.len();
                let resp = LoadWorkspaceResponse {
                    message: format!("Loaded {count} files from project {}", self.project_id()),
                    files,
                    count,
                };
                serde_json::to_value(resp).map_err(|e| IdeError::internal(e.to_string()))
            }

            Methods::FILES_READ => {
                let p: FilePathParam = parse_params(params)?;
                let stored = self
                    .store
                    .get_object(&self.bucket, &self.key(&p.file_path))
                    .await
                    .map_err(storage_error)?
                    .ok_or_else(|| IdeError::file_not_found(&p.file_path))?;
                Ok(json!({
                    "file_path": p.file_path,
                    "content": String::from_utf8_lossy(&stored.body),
                    "last_modified": stored.last_modified,
                }))
            }

            Methods::FILES_CREATE => {
                let req: UpsertFileRequest = parse_params(params)?;
                debug!("Creating {}", req.file_path);
                self.upsert(req).await
            }

            Methods::FILES_UPDATE => {
                let req: UpsertFileRequest = parse_params(params)?;
                debug!("Updating {}", req.file_path);
                self.upsert(req).await
            }

            Methods::FILES_DELETE => {
                let req: DeleteFileRequest = parse_params(params)?;
                let existed = self
                    .store
                    .delete_object(&self.bucket, &self.key(&req.file_path))
                    .await
                    .map_err(storage_error)?;
                debug!("Deleted {} (existed: {existed})", req.file_path);
                Ok(json!({ "success": true, "file_path": req.file_path }))
            }

            _ => Err(IdeError::method_not_found(method)),
        }
    }

    async fn init(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        if !self.store.bucket_exists(&self.bucket).await? {
            return Err(Box::new(StorageError::NoSuchBucket(self.bucket.clone())));
        }
        info!(
            "Project files: bucket={} prefix={}",
            self.bucket,
            self.prefix()
        );
        Ok(())
    }
}

#[derive(Deserialize)]
struct FilePathParam {
    file_path: String,
}

fn storage_error(e: StorageError) -> IdeError {
    match e {
        StorageError::InvalidKey { key, reason } => IdeError::invalid_path(&key, reason),
        other => IdeError::storage(other.to_string()),
    }
}
