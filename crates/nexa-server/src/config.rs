//! Storage configuration resolved from flags and environment.

use std::path::PathBuf;

use crate::error::ConfigError;

pub const DEFAULT_STORE_ROOT: &str = "./nexa-data";
pub const DEFAULT_USER_ID: &str = "local";
pub const DEFAULT_PROJECT_ID: &str = "default";

/// Where project files are kept and whose project is served.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub bucket: String,
    pub store_root: PathBuf,
    pub user_id: String,
    pub project_id: String,
}

impl StorageConfig {
    /// Resolve every setting, failing when the bucket name is missing.
    ///
    /// `store_url` is a directory path or a `file://` URL; remote object
    /// store endpoints are not supported by the directory-backed store.
    pub fn resolve(
        bucket: Option<String>,
        store_url: Option<String>,
        user_id: Option<String>,
        project_id: Option<String>,
    ) -> Result<Self, ConfigError> {
        let bucket = non_empty(bucket).ok_or(ConfigError::Missing("BUCKET_NAME"))?;
        let store_root = match non_empty(store_url) {
            Some(url) => store_root_from_url(&url)?,
            None => PathBuf::from(DEFAULT_STORE_ROOT),
        };
        let user_id = non_empty(user_id).unwrap_or_else(|| DEFAULT_USER_ID.to_string());
        let project_id = non_empty(project_id).unwrap_or_else(|| DEFAULT_PROJECT_ID.to_string());

        for (name, value) in [("NEXA_USER_ID", &user_id), ("NEXA_PROJECT_ID", &project_id)] {
            if value.contains(['/', '\\']) || value == "." || value == ".." {
                return Err(ConfigError::Invalid {
                    name,
                    reason: format!("'{value}' must be a single path segment"),
                });
            }
        }

        Ok(Self {
            bucket,
            store_root,
            user_id,
            project_id,
        })
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Directory behind a store URL.
pub fn store_root_from_url(url: &str) -> Result<PathBuf, ConfigError> {
    if let Some(path) = url.strip_prefix("file://") {
        if path.is_empty() {
            return Err(ConfigError::Invalid {
                name: "S3_URL",
                reason: "file:// URL has no path".into(),
            });
        }
        return Ok(PathBuf::from(path));
    }
    if url.contains("://") {
        return Err(ConfigError::Invalid {
            name: "S3_URL",
            reason: format!("unsupported store endpoint '{url}' (use a directory or file:// URL)"),
        });
    }
    Ok(PathBuf::from(url))
}
