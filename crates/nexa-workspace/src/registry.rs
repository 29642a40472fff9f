//! File registry: the authoritative in-memory file store.
//!
//! Paths are the only identity a file has. Folders exist implicitly as
//! path prefixes; an explicit folder entry is kept only for folders that
//! were created empty.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, WorkspaceError};
use crate::language::detect_language;

// ─────────────────────────────────────────────────────────────────────────────
// Paths
// ─────────────────────────────────────────────────────────────────────────────

/// Normalize a user-supplied path into a registry key.
///
/// A single leading `./` is dropped. Absolute paths, trailing slashes,
/// empty, `.` or `..` segments and backslashes are rejected.
pub fn normalize_path(path: &str) -> Result<String> {
    let trimmed = path.strip_prefix("./").unwrap_or(path);
    if trimmed.is_empty() {
        return Err(WorkspaceError::invalid_name(path, "path is empty"));
    }
    if trimmed.starts_with('/') {
        return Err(WorkspaceError::invalid_name(path, "path must be relative"));
    }
    if trimmed.contains('\\') {
        return Err(WorkspaceError::invalid_name(path, "backslashes are not allowed"));
    }
    for segment in trimmed.split('/') {
        match segment {
            "" => return Err(WorkspaceError::invalid_name(path, "empty path segment")),
            "." | ".." => {
                return Err(WorkspaceError::invalid_name(path, "relative segments are not allowed"));
            }
            _ => {}
        }
    }
    Ok(trimmed.to_string())
}

/// Validate a bare file name used by rename.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(WorkspaceError::invalid_name(name, "name is empty"));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(WorkspaceError::invalid_name(name, "name must not contain a path separator"));
    }
    if name == "." || name == ".." {
        return Err(WorkspaceError::invalid_name(name, "name must not be a relative segment"));
    }
    Ok(())
}

/// Last segment of a path.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

/// Folder portion of a path including the trailing slash, or `""` at the root.
pub fn parent_prefix(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..=idx],
        None => "",
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// FileRecord
// ─────────────────────────────────────────────────────────────────────────────

/// One tracked file. `name` and `language` are derived from `path`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "RawFileRecord")]
pub struct FileRecord {
    path: String,
    name: String,
    content: String,
    language: String,
    last_modified: DateTime<Utc>,
}

/// Snapshot shape of a record; derived fields are recomputed on load.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawFileRecord {
    path: String,
    #[serde(default)]
    content: String,
    #[serde(default = "Utc::now")]
    last_modified: DateTime<Utc>,
}

impl TryFrom<RawFileRecord> for FileRecord {
    type Error = WorkspaceError;

    fn try_from(raw: RawFileRecord) -> Result<Self> {
        let path = normalize_path(&raw.path)?;
        Ok(Self::with_timestamp(path, raw.content, raw.last_modified))
    }
}

impl FileRecord {
    /// Create a record stamped with the current time.
    pub fn new(path: &str, content: impl Into<String>) -> Result<Self> {
        let path = normalize_path(path)?;
        Ok(Self::with_timestamp(path, content.into(), Utc::now()))
    }

    /// Build from an already-normalized path.
    pub(crate) fn with_timestamp(path: String, content: String, last_modified: DateTime<Utc>) -> Self {
        let name = file_name(&path).to_string();
        let language = detect_language(&path).to_string();
        Self {
            path,
            name,
            content,
            language,
            last_modified,
        }
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn last_modified(&self) -> DateTime<Utc> {
        self.last_modified
    }

    /// Accept saved content and bump the modification time.
    pub(crate) fn set_content(&mut self, content: String) {
        self.content = content;
        self.last_modified = Utc::now();
    }

    /// The same record under another path.
    pub(crate) fn moved_to(&self, new_path: String) -> Self {
        Self::with_timestamp(new_path, self.content.clone(), self.last_modified)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry
// ─────────────────────────────────────────────────────────────────────────────

/// Mapping from path to file record, plus the set of dirty paths.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    files: BTreeMap<String, FileRecord>,
    folders: BTreeSet<String>,
    dirty: BTreeSet<String>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite the record stored under its path.
    pub fn put(&mut self, record: FileRecord) -> Option<FileRecord> {
        self.files.insert(record.path.clone(), record)
    }

    /// Delete a key. Also drops it from the dirty set; the caller owns the
    /// session references (`openFiles`, `activeFile`).
    pub fn remove(&mut self, path: &str) -> Option<FileRecord> {
        self.dirty.remove(path);
        self.files.remove(path)
    }

    pub fn get(&self, path: &str) -> Option<&FileRecord> {
        self.files.get(path)
    }

    pub(crate) fn get_mut(&mut self, path: &str) -> Option<&mut FileRecord> {
        self.files.get_mut(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn records(&self) -> impl Iterator<Item = &FileRecord> {
        self.files.values()
    }

    /// Resolve the path a rename would produce.
    ///
    /// `Ok(None)` signals a no-op (the new name equals the current one).
    pub fn rename_target(&self, old_path: &str, new_name: &str) -> Result<Option<String>> {
        validate_name(new_name)?;
        let record = self.get(old_path).ok_or_else(|| WorkspaceError::not_found(old_path))?;
        if record.name == new_name {
            return Ok(None);
        }
        Ok(Some(format!("{}{new_name}", parent_prefix(old_path))))
    }

    /// Move a record to a sibling name, overwriting any record at the target.
    ///
    /// Returns the new path, or `None` when the name is unchanged. Dirty
    /// state does not follow the file; callers close it beforehand.
    pub fn rename(&mut self, old_path: &str, new_name: &str) -> Result<Option<String>> {
        let Some(new_path) = self.rename_target(old_path, new_name)? else {
            return Ok(None);
        };
        if let Some(record) = self.remove(old_path) {
            self.dirty.remove(&new_path);
            self.put(record.moved_to(new_path.clone()));
        }
        Ok(Some(new_path))
    }

    // ── Dirty tracking ──────────────────────────────────────────────────

    /// Returns false when the path is not in the registry.
    pub fn mark_dirty(&mut self, path: &str) -> bool {
        if !self.files.contains_key(path) {
            return false;
        }
        self.dirty.insert(path.to_string());
        true
    }

    pub fn clear_dirty(&mut self, path: &str) -> bool {
        if !self.files.contains_key(path) {
            return false;
        }
        self.dirty.remove(path)
    }

    pub fn is_dirty(&self, path: &str) -> bool {
        self.dirty.contains(path)
    }

    pub fn dirty_paths(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(String::as_str)
    }

    // ── Explicit folders ────────────────────────────────────────────────

    /// Record an empty folder. Returns false if it was already present.
    pub fn add_folder(&mut self, path: &str) -> Result<bool> {
        let path = normalize_path(path)?;
        Ok(self.folders.insert(path))
    }

    pub fn remove_folder(&mut self, path: &str) -> bool {
        self.folders.remove(path)
    }

    pub fn folders(&self) -> impl Iterator<Item = &str> {
        self.folders.iter().map(String::as_str)
    }

    /// Empty everything, files, folders and dirty set alike.
    pub fn clear(&mut self) {
        self.files.clear();
        self.folders.clear();
        self.dirty.clear();
    }
}
