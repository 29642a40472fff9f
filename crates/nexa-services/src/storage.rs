//! Object store: S3-style buckets, keys and prefixes over a local directory.
//!
//! A bucket is a directory under the store root. Every key segment but the
//! last becomes a `<segment>.dir` directory and the object body is stored as
//! `<leaf>.obj`, so `a` and `a/b.txt` can both exist as they can on S3.
//! Keys ending in `/` are folder markers: zero-byte objects stored as a
//! `.folder` file inside the folder's directory, so they survive even while
//! the folder is otherwise empty.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;
use tracing::debug;

/// File that stands for a folder-marker object on disk.
const MARKER_FILE: &str = ".folder";

/// On-disk suffix of a key segment that has keys below it.
const DIR_SUFFIX: &str = ".dir";

/// On-disk suffix of an object body.
const OBJECT_SUFFIX: &str = ".obj";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid bucket name '{0}'")]
    InvalidBucket(String),

    #[error("Invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: &'static str },

    #[error("No such bucket: {0}")]
    NoSuchBucket(String),
}

/// One object returned by `get_object`.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub body: Bytes,
    pub last_modified: DateTime<Utc>,
}

/// One entry of a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectSummary {
    pub key: String,
    pub size: u64,
    pub last_modified: DateTime<Utc>,
}

/// Directory-backed object store.
#[derive(Debug, Clone)]
pub struct ObjectStore {
    root: PathBuf,
}

impl ObjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        if bucket.is_empty()
            || bucket == "."
            || bucket == ".."
            || bucket.contains(['/', '\\'])
        {
            return Err(StorageError::InvalidBucket(bucket.to_string()));
        }
        Ok(self.root.join(bucket))
    }

    async fn existing_bucket(&self, bucket: &str) -> Result<PathBuf, StorageError> {
        let dir = self.bucket_dir(bucket)?;
        if !tokio::fs::try_exists(&dir).await? {
            return Err(StorageError::NoSuchBucket(bucket.to_string()));
        }
        Ok(dir)
    }

    // ── Buckets ─────────────────────────────────────────────────────────

    pub async fn list_buckets(&self) -> Result<Vec<String>, StorageError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };
        let mut buckets = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                buckets.push(entry.file_name().to_string_lossy().to_string());
            }
        }
        buckets.sort();
        Ok(buckets)
    }

    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool, StorageError> {
        let dir = self.bucket_dir(bucket)?;
        Ok(tokio::fs::try_exists(&dir).await?)
    }

    pub async fn create_bucket(&self, bucket: &str) -> Result<(), StorageError> {
        let dir = self.bucket_dir(bucket)?;
        tokio::fs::create_dir_all(&dir).await?;
        debug!("Created bucket directory {}", dir.display());
        Ok(())
    }

    // ── Objects ─────────────────────────────────────────────────────────

    /// Store an object, replacing any previous body.
    pub async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> Result<(), StorageError> {
        let dir = self.existing_bucket(bucket).await?;
        validate_key(key)?;

        let path = object_path(&dir, key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &body).await?;
        Ok(())
    }

    /// `None` when no object is stored under `key`.
    pub async fn get_object(&self, bucket: &str, key: &str) -> Result<Option<StoredObject>, StorageError> {
        let dir = self.existing_bucket(bucket).await?;
        validate_key(key)?;
        let path = object_path(&dir, key);

        let meta = match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => meta,
            Ok(_) => return Ok(None),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let body = tokio::fs::read(&path).await?;
        Ok(Some(StoredObject {
            body: Bytes::from(body),
            last_modified: modified_at(&meta),
        }))
    }

    /// Remove an object. Deleting a missing key succeeds and returns false.
    pub async fn delete_object(&self, bucket: &str, key: &str) -> Result<bool, StorageError> {
        let dir = self.existing_bucket(bucket).await?;
        validate_key(key)?;
        let path = object_path(&dir, key);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => {}
            Ok(_) => return Ok(false),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(e) => return Err(e.into()),
        }
        tokio::fs::remove_file(&path).await?;
        prune_empty_dirs(&dir, path.parent()).await;
        Ok(true)
    }

    /// Every object whose key starts with `prefix`, sorted by key.
    /// Folder markers are listed under their `/`-terminated key.
    pub async fn list_objects(&self, bucket: &str, prefix: &str) -> Result<Vec<ObjectSummary>, StorageError> {
        let dir = self.existing_bucket(bucket).await?;
        let mut out = Vec::new();
        let mut pending = vec![(dir, String::new())];

        while let Some((current, key_prefix)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&current).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name().to_string_lossy().to_string();
                let meta = entry.metadata().await?;
                if meta.is_dir() {
                    if let Some(segment) = name.strip_suffix(DIR_SUFFIX) {
                        pending.push((entry.path(), format!("{key_prefix}{segment}/")));
                    }
                    continue;
                }
                let key = if name == MARKER_FILE {
                    if key_prefix.is_empty() {
                        continue;
                    }
                    key_prefix.clone()
                } else if let Some(leaf) = name.strip_suffix(OBJECT_SUFFIX) {
                    format!("{key_prefix}{leaf}")
                } else {
                    continue;
                };
                if key.starts_with(prefix) {
                    out.push(ObjectSummary {
                        key,
                        size: meta.len(),
                        last_modified: modified_at(&meta),
                    });
                }
            }
        }

        out.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(out)
    }

    /// Common prefixes one level below `prefix`, split on `delimiter`.
    pub async fn list_prefixes(
        &self,
        bucket: &str,
        prefix: &str,
        delimiter: char,
    ) -> Result<Vec<String>, StorageError> {
        let objects = self.list_objects(bucket, prefix).await?;
        let prefixes: BTreeSet<String> = objects
            .iter()
            .filter_map(|obj| {
                let rest = &obj.key[prefix.len()..];
                rest.find(delimiter)
                    .map(|idx| format!("{prefix}{}", &rest[..idx + delimiter.len_utf8()]))
            })
            .collect();
        Ok(prefixes.into_iter().collect())
    }
}

/// Keys are relative, slash-separated, and never escape the bucket.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason| StorageError::InvalidKey {
        key: key.to_string(),
        reason,
    };
    if key.is_empty() {
        return Err(invalid("key is empty"));
    }
    if key.starts_with('/') {
        return Err(invalid("key must be relative"));
    }
    if key.contains('\\') {
        return Err(invalid("backslashes are not allowed"));
    }
    let body = key.strip_suffix('/').unwrap_or(key);
    for segment in body.split('/') {
        match segment {
            "" => return Err(invalid("empty key segment")),
            "." | ".." => return Err(invalid("relative segments are not allowed")),
            _ => {}
        }
    }
    Ok(())
}

/// On-disk location of a validated key. Folder markers (`a/b/`) live inside
/// the folder's directory.
fn object_path(bucket_dir: &Path, key: &str) -> PathBuf {
    let (folders, leaf) = match key.strip_suffix('/') {
        Some(folder) => (folder, None),
        None => match key.rsplit_once('/') {
            Some((folders, leaf)) => (folders, Some(leaf)),
            None => ("", Some(key)),
        },
    };
    let mut path = bucket_dir.to_path_buf();
    for segment in folders.split('/').filter(|s| !s.is_empty()) {
        path.push(format!("{segment}{DIR_SUFFIX}"));
    }
    match leaf {
        Some(leaf) => path.push(format!("{leaf}{OBJECT_SUFFIX}")),
        None => path.push(MARKER_FILE),
    }
    path
}

fn modified_at(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.modified().map(DateTime::<Utc>::from).unwrap_or_else(|_| Utc::now())
}

/// Remove directories left empty by a delete, stopping at the bucket.
async fn prune_empty_dirs(bucket_dir: &Path, from: Option<&Path>) {
    let mut current = from.map(Path::to_path_buf);
    while let Some(dir) = current {
        if dir == bucket_dir || !dir.starts_with(bucket_dir) {
            break;
        }
        // Fails on non-empty directories, which ends the walk.
        if tokio::fs::remove_dir(&dir).await.is_err() {
            break;
        }
        current = dir.parent().map(Path::to_path_buf);
    }
}
