//! Session snapshot store, which survives reloads of the front-end.
//!
//! The snapshot carries the registry contents, tab order, active file and
//! the drafts of dirty files. It is written on a fixed interval and after
//! every mutating operation; reading it never fails hard: an absent or
//! unreadable slot means "no snapshot" and the caller loads the workspace
//! from the remote service instead.

use std::collections::BTreeMap;
use std::future::Future;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Result, WorkspaceError};
use crate::registry::FileRecord;

/// Storage key of the snapshot; also the slot file stem.
pub const SNAPSHOT_KEY: &str = "nexa_ide_project";

/// Interval of the unconditional background snapshot.
pub const AUTOSAVE_INTERVAL: Duration = Duration::from_secs(30);

/// Serialized session state.
///
/// Field names are camelCase (`files`, `openFiles`, `activeFile`);
/// `folders` and `drafts` are optional, so snapshots without them still load.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub files: BTreeMap<String, FileRecord>,
    #[serde(default)]
    pub open_files: Vec<String>,
    #[serde(default)]
    pub active_file: Option<String>,
    /// Explicitly created empty folders.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub folders: Vec<String>,
    /// Unsaved editor content keyed by path; its keys are the dirty set.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub drafts: BTreeMap<String, String>,
}

// ─────────────────────────────────────────────────────────────────────────────
// Slots
// ─────────────────────────────────────────────────────────────────────────────

/// One client-local persistence slot holding a single string.
///
/// A write replaces the whole value in one step.
pub trait SnapshotSlot: Send + Sync {
    fn read(&self) -> impl Future<Output = io::Result<Option<String>>> + Send;
    fn write(&self, data: &str) -> impl Future<Output = io::Result<()>> + Send;
    fn clear(&self) -> impl Future<Output = io::Result<()>> + Send;
}

/// Slot backed by a JSON file, replaced atomically via rename.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `<dir>/nexa_ide_project.json`
    pub fn in_dir(dir: &Path) -> Self {
        Self::new(dir.join(format!("{SNAPSHOT_KEY}.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotSlot for FileSlot {
    async fn read(&self) -> io::Result<Option<String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn write(&self, data: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, data).await?;
        tokio::fs::rename(&tmp, &self.path).await
    }

    async fn clear(&self) -> io::Result<()> {
        match tokio::fs::remove_file(&self.path).await {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

/// Slot kept in memory; lives as long as the process.
#[derive(Debug, Default)]
pub struct MemorySlot {
    value: Mutex<Option<String>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotSlot for MemorySlot {
    async fn read(&self) -> io::Result<Option<String>> {
        Ok(self.value.lock().clone())
    }

    async fn write(&self, data: &str) -> io::Result<()> {
        *self.value.lock() = Some(data.to_string());
        Ok(())
    }

    async fn clear(&self) -> io::Result<()> {
        *self.value.lock() = None;
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store
// ─────────────────────────────────────────────────────────────────────────────

/// Serializes snapshots into a slot and back.
pub struct SnapshotStore<S: SnapshotSlot> {
    slot: S,
}

impl<S: SnapshotSlot> SnapshotStore<S> {
    pub fn new(slot: S) -> Self {
        Self { slot }
    }

    pub fn slot(&self) -> &S {
        &self.slot
    }

    pub async fn save(&self, snapshot: &Snapshot) -> Result<()> {
        let json = serde_json::to_string(snapshot)
            .map_err(|e| WorkspaceError::Snapshot(format!("Serialize error: {e}")))?;
        self.slot
            .write(&json)
            .await
            .map_err(|e| WorkspaceError::Snapshot(format!("Write error: {e}")))?;
        debug!("Snapshot saved ({} files)", snapshot.files.len());
        Ok(())
    }

    /// `None` when the slot is empty, unreadable, or holds unparsable data.
    pub async fn restore(&self) -> Option<Snapshot> {
        let content = match self.slot.read().await {
            Ok(Some(content)) => content,
            Ok(None) => return None,
            Err(e) => {
                warn!("Snapshot slot unreadable: {e}");
                return None;
            }
        };
        match serde_json::from_str(&content) {
            Ok(snapshot) => Some(snapshot),
            Err(e) => {
                warn!("Discarding unparsable snapshot: {e}");
                None
            }
        }
    }

    pub async fn clear(&self) -> Result<()> {
        self.slot
            .clear()
            .await
            .map_err(|e| WorkspaceError::Snapshot(format!("Clear error: {e}")))
    }
}

/// Save a snapshot on every tick of `interval`, unconditionally.
///
/// `take` produces the snapshot; the task runs until aborted.
pub fn spawn_autosave<S, F, Fut>(
    store: Arc<SnapshotStore<S>>,
    interval: Duration,
    mut take: F,
) -> tokio::task::JoinHandle<()>
where
    S: SnapshotSlot + 'static,
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Snapshot> + Send,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let snapshot = take().await;
            if let Err(e) = store.save(&snapshot).await {
                warn!("Autosave failed: {e}");
            }
        }
    })
}
