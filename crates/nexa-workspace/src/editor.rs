//! Editor session controller.
//!
//! Owns the registry, the tab session and the drafts of dirty files, and
//! sequences every mutation with the remote file service: the remote call
//! goes first and local state is committed only once it succeeds, so a
//! failed call leaves the session exactly as it was.
//!
//! Per open file the controller tracks `Clean` ↔ `Dirty`; a file that is
//! not open is `Closed`. Destructive steps ask the [`Confirm`] source once.

use std::collections::BTreeMap;

use nexa_protocol::RemoteFile;
use tracing::{debug, info, warn};

use crate::confirm::{Confirm, Prompt};
use crate::error::{Result, WorkspaceError};
use crate::language::{file_icon, template_for};
use crate::registry::{normalize_path, FileRecord, Registry};
use crate::remote::RemoteSync;
use crate::session::Session;
use crate::snapshot::Snapshot;
use crate::tree::{self, TreeNode};

/// How an operation ended when it did not fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// State changed.
    Applied,
    /// Nothing to do (already closed, same name, no active file).
    Unchanged,
    /// The user declined the confirmation; nothing changed.
    Declined,
}

/// Editor state of one path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileState {
    Closed,
    Clean,
    Dirty,
}

/// Which projections need re-rendering since the last
/// [`EditorSession::take_view_changes`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ViewChanges {
    pub tree: bool,
    pub tabs: bool,
    pub editor: bool,
}

impl ViewChanges {
    pub fn any(&self) -> bool {
        self.tree || self.tabs || self.editor
    }
}

/// One editor tab as the view renders it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    pub path: String,
    pub name: String,
    pub icon: &'static str,
    pub active: bool,
    pub dirty: bool,
}

/// The editor session: registry, tabs, drafts and the remote they sync with.
pub struct EditorSession<R: RemoteSync, C: Confirm> {
    registry: Registry,
    session: Session,
    /// Unsaved editor content; keys mirror the registry's dirty set.
    drafts: BTreeMap<String, String>,
    remote: R,
    confirm: C,
    changes: ViewChanges,
    revision: u64,
}

impl<R: RemoteSync, C: Confirm> EditorSession<R, C> {
    /// Empty registry, no tabs, no active file.
    pub fn new(remote: R, confirm: C) -> Self {
        Self {
            registry: Registry::new(),
            session: Session::new(),
            drafts: BTreeMap::new(),
            remote,
            confirm,
            changes: ViewChanges::default(),
            revision: 0,
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn remote(&self) -> &R {
        &self.remote
    }

    pub fn confirm_mut(&mut self) -> &mut C {
        &mut self.confirm
    }

    /// Bumped by every mutation; the snapshot writer compares it.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn take_view_changes(&mut self) -> ViewChanges {
        std::mem::take(&mut self.changes)
    }

    fn touch(&mut self, tree: bool, tabs: bool, editor: bool) {
        self.revision += 1;
        self.changes.tree |= tree;
        self.changes.tabs |= tabs;
        self.changes.editor |= editor;
    }

    // ── Projections ─────────────────────────────────────────────────────

    pub fn active_file(&self) -> Option<&str> {
        self.session.active_file()
    }

    pub fn is_dirty(&self, path: &str) -> bool {
        self.registry.is_dirty(path)
    }

    pub fn state_of(&self, path: &str) -> FileState {
        if !self.session.is_open(path) {
            FileState::Closed
        } else if self.registry.is_dirty(path) {
            FileState::Dirty
        } else {
            FileState::Clean
        }
    }

    /// Current text of a file: its draft if dirty, else the saved content.
    pub fn text_of(&self, path: &str) -> Option<&str> {
        match self.drafts.get(path) {
            Some(draft) => Some(draft),
            None => self.registry.get(path).map(FileRecord::content),
        }
    }

    /// Text shown in the editor; `None` means the placeholder overlay.
    pub fn editor_text(&self) -> Option<&str> {
        self.active_file().and_then(|path| self.text_of(path))
    }

    pub fn tree(&self) -> Vec<TreeNode> {
        tree::registry_tree(&self.registry)
    }

    pub fn render_tree(&self) -> String {
        tree::render(&self.tree(), &|path| self.registry.is_dirty(path))
    }

    /// Tabs in open order. Dangling tab paths are skipped.
    pub fn tabs(&self) -> Vec<Tab> {
        self.session
            .open_files()
            .iter()
            .filter_map(|path| self.registry.get(path))
            .map(|record| Tab {
                path: record.path().to_string(),
                name: record.name().to_string(),
                icon: file_icon(record.name()),
                active: self.session.is_active(record.path()),
                dirty: self.registry.is_dirty(record.path()),
            })
            .collect()
    }

    // ── Workspace load ──────────────────────────────────────────────────

    /// Replace everything with the remote project. On failure nothing changes.
    pub async fn load_workspace(&mut self) -> Result<usize> {
        let loaded = self
            .remote
            .load_workspace()
            .await
            .map_err(|e| WorkspaceError::remote("load", "workspace", e))?;
        self.reset();
        self.registry = registry_from_remote(loaded.files);
        info!("Workspace loaded: {} ({} files)", loaded.message, self.registry.len());
        Ok(self.registry.len())
    }

    /// Re-list the remote files. Dirty files keep their drafts, their tab and
    /// their record even when the remote copy is gone, so the next save
    /// writes them back. Tabs of clean files that disappeared are closed.
    pub async fn refresh(&mut self) -> Result<usize> {
        let files = self
            .remote
            .list()
            .await
            .map_err(|e| WorkspaceError::remote("list", "workspace", e))?;
        let mut registry = registry_from_remote(files);
        for folder in self.registry.folders() {
            let _ = registry.add_folder(folder);
        }
        for path in self.drafts.keys() {
            if registry.contains(path) {
                continue;
            }
            if let Some(record) = self.registry.get(path) {
                debug!("Keeping unsaved {path} missing from the remote listing");
                registry.put(record.clone());
            }
        }
        self.drafts.retain(|path, _| registry.mark_dirty(path));
        let dropped = self.session.retain(|path| registry.contains(path));
        if !dropped.is_empty() {
            debug!("Refresh closed {} tab(s) for removed files", dropped.len());
        }
        self.registry = registry;
        self.touch(true, true, true);
        Ok(self.registry.len())
    }

    /// Clear registry, tabs and drafts.
    pub fn reset(&mut self) {
        self.registry.clear();
        self.session.clear();
        self.drafts.clear();
        self.touch(true, true, true);
    }

    // ── Tabs and editing ────────────────────────────────────────────────

    /// Open (or focus) a file in the editor.
    pub fn open(&mut self, path: &str) -> Result<()> {
        let path = &lookup_key(path);
        if !self.registry.contains(path) {
            return Err(WorkspaceError::not_found(path));
        }
        self.session.open_tab(path);
        self.session.activate(path);
        self.touch(true, true, true);
        Ok(())
    }

    /// Editor content changed. Returns false when no file is active.
    pub fn edit(&mut self, content: impl Into<String>) -> bool {
        let Some(active) = self.session.active_file().map(str::to_string) else {
            return false;
        };
        if !self.registry.mark_dirty(&active) {
            return false;
        }
        self.drafts.insert(active, content.into());
        self.touch(true, true, true);
        true
    }

    /// Save the active file; `Unchanged` when none is active.
    pub async fn save(&mut self) -> Result<Outcome> {
        match self.session.active_file().map(str::to_string) {
            Some(path) => self.save_path(&path).await,
            None => Ok(Outcome::Unchanged),
        }
    }

    /// Push a file's current text to the remote; it stays dirty if that fails.
    pub async fn save_path(&mut self, path: &str) -> Result<Outcome> {
        let path = &lookup_key(path);
        let content = self
            .text_of(path)
            .ok_or_else(|| WorkspaceError::not_found(path))?
            .to_string();

        if let Err(e) = self.remote.update(path, &content).await {
            warn!("Save of {path} failed: {e}");
            return Err(WorkspaceError::remote("update", path, e));
        }

        if let Some(record) = self.registry.get_mut(path) {
            record.set_content(content);
        }
        self.drafts.remove(path);
        self.registry.clear_dirty(path);
        self.touch(true, true, true);
        info!("Saved {path}");
        Ok(Outcome::Applied)
    }

    /// Close a tab, asking first if it has unsaved edits (which are discarded).
    pub async fn close(&mut self, path: &str) -> Result<Outcome> {
        let path = &lookup_key(path);
        if !self.session.is_open(path) {
            return Ok(Outcome::Unchanged);
        }
        if self.registry.is_dirty(path) {
            let prompt = Prompt::DiscardChanges { path: path.to_string() };
            if !self.confirm.confirm(&prompt).await {
                return Ok(Outcome::Declined);
            }
        }
        self.discard_and_close(path);
        Ok(Outcome::Applied)
    }

    fn discard_and_close(&mut self, path: &str) {
        self.drafts.remove(path);
        self.registry.clear_dirty(path);
        self.session.close_tab(path);
        self.touch(true, true, true);
    }

    // ── Create / delete / rename ────────────────────────────────────────

    /// Create a file (overwriting after confirmation) and open it.
    pub async fn create(&mut self, path: &str, content: impl Into<String>) -> Result<Outcome> {
        let path = normalize_path(path)?;
        let content = content.into();

        if self.registry.contains(&path) {
            let prompt = Prompt::Overwrite { path: path.clone() };
            if !self.confirm.confirm(&prompt).await {
                return Ok(Outcome::Declined);
            }
        }

        self.remote
            .create(&path, &content)
            .await
            .map_err(|e| WorkspaceError::remote("create", path.as_str(), e))?;

        self.drafts.remove(&path);
        self.registry.put(FileRecord::new(&path, content)?);
        self.registry.clear_dirty(&path);
        self.open(&path)?;
        info!("Created {path}");
        Ok(Outcome::Applied)
    }

    /// Create a file seeded with its language template.
    pub async fn create_from_template(&mut self, path: &str) -> Result<Outcome> {
        let content = template_for(path);
        self.create(path, content).await
    }

    /// Record an empty folder. Local only; the file service has no folders.
    pub fn create_folder(&mut self, path: &str) -> Result<Outcome> {
        if !self.registry.add_folder(path)? {
            return Ok(Outcome::Unchanged);
        }
        self.touch(true, false, false);
        Ok(Outcome::Applied)
    }

    /// Forget an explicitly created empty folder.
    pub fn remove_folder(&mut self, path: &str) -> Outcome {
        if !self.registry.remove_folder(path) {
            return Outcome::Unchanged;
        }
        self.touch(true, false, false);
        Outcome::Applied
    }

    /// Delete a file after one confirmation, closing it if open.
    pub async fn delete(&mut self, path: &str) -> Result<Outcome> {
        let path = &lookup_key(path);
        if !self.registry.contains(path) {
            return Err(WorkspaceError::not_found(path));
        }
        let prompt = Prompt::Delete {
            path: path.to_string(),
            unsaved: self.registry.is_dirty(path),
        };
        if !self.confirm.confirm(&prompt).await {
            return Ok(Outcome::Declined);
        }

        self.remote
            .delete(path)
            .await
            .map_err(|e| WorkspaceError::remote("delete", path, e))?;

        self.discard_and_close(path);
        self.registry.remove(path);
        info!("Deleted {path}");
        Ok(Outcome::Applied)
    }

    /// Rename a file within its folder.
    ///
    /// The old path is closed first; unsaved edits and an existing file at
    /// the new path are given up only after one confirmation. Remotely this
    /// is a create of the new path followed by a delete of the old one.
    pub async fn rename(&mut self, old_path: &str, new_name: &str) -> Result<Outcome> {
        let old_path = &lookup_key(old_path);
        let Some(new_path) = self.registry.rename_target(old_path, new_name)? else {
            return Ok(Outcome::Unchanged);
        };

        let unsaved = self.registry.is_dirty(old_path);
        let replaced = self.registry.get(&new_path).map(|r| r.content().to_string());
        if unsaved || replaced.is_some() {
            let prompt = Prompt::Rename {
                path: old_path.to_string(),
                new_path: new_path.clone(),
                unsaved,
                overwrite: replaced.is_some(),
            };
            if !self.confirm.confirm(&prompt).await {
                return Ok(Outcome::Declined);
            }
        }

        let content = self
            .registry
            .get(old_path)
            .map(|r| r.content().to_string())
            .unwrap_or_default();

        self.remote
            .create(&new_path, &content)
            .await
            .map_err(|e| WorkspaceError::remote("create", new_path.as_str(), e))?;

        if let Err(e) = self.remote.delete(old_path).await {
            // Undo the copy so the remote keeps a single version of the file.
            let undo = match &replaced {
                Some(previous) => self.remote.update(&new_path, previous).await,
                None => self.remote.delete(&new_path).await,
            };
            if let Err(undo_err) = undo {
                warn!("Could not undo remote copy to {new_path}: {undo_err}");
            }
            return Err(WorkspaceError::remote("delete", old_path, e));
        }

        self.discard_and_close(old_path);
        if self.session.is_open(&new_path) {
            self.discard_and_close(&new_path);
        }
        self.drafts.remove(&new_path);
        self.registry.rename(old_path, new_name)?;
        self.touch(true, true, true);
        info!("Renamed {old_path} to {new_path}");
        Ok(Outcome::Applied)
    }

    // ── Snapshot ────────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            files: self
                .registry
                .records()
                .map(|r| (r.path().to_string(), r.clone()))
                .collect(),
            open_files: self.session.open_files().to_vec(),
            active_file: self.session.active_file().map(str::to_string),
            folders: self.registry.folders().map(str::to_string).collect(),
            drafts: self.drafts.clone(),
        }
    }

    /// Overwrite the whole session from a snapshot.
    ///
    /// References to files the snapshot does not contain are dropped and
    /// returned. The active file is reopened so the editor shows it again.
    pub fn restore(&mut self, snapshot: Snapshot) -> Vec<String> {
        let mut dropped = Vec::new();

        self.registry.clear();
        self.drafts.clear();
        for record in snapshot.files.into_values() {
            self.registry.put(record);
        }
        for folder in snapshot.folders {
            if self.registry.add_folder(&folder).is_err() {
                dropped.push(folder);
            }
        }
        for (path, draft) in snapshot.drafts {
            if self.registry.mark_dirty(&path) {
                self.drafts.insert(path, draft);
            } else {
                dropped.push(path);
            }
        }

        let registry = &self.registry;
        let mut open_files = Vec::new();
        for path in snapshot.open_files {
            if registry.contains(&path) {
                open_files.push(path);
            } else {
                dropped.push(path);
            }
        }
        let active = match snapshot.active_file {
            Some(path) if open_files.contains(&path) => Some(path),
            Some(path) => {
                dropped.push(path);
                None
            }
            None => None,
        };
        self.session = Session::from_parts(open_files, None);

        if !dropped.is_empty() {
            warn!("Snapshot referenced {} missing path(s); dropped", dropped.len());
        }
        self.touch(true, true, true);
        if let Some(active) = active {
            // Present in the registry: checked above.
            let _ = self.open(&active);
        }
        dropped
    }
}

/// Registry key for a user-supplied path. Paths that fail normalization are
/// kept as given and simply match nothing.
fn lookup_key(path: &str) -> String {
    normalize_path(path).unwrap_or_else(|_| path.to_string())
}

/// Registry built from a remote listing; invalid paths are skipped.
fn registry_from_remote(files: BTreeMap<String, RemoteFile>) -> Registry {
    let mut registry = Registry::new();
    for (path, file) in files {
        match normalize_path(&path) {
            Ok(path) => {
                registry.put(FileRecord::with_timestamp(path, file.content, file.last_modified));
            }
            Err(e) => warn!("Skipping remote file: {e}"),
        }
    }
    registry
}
