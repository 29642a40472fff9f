//! Nexa IDE workspace core.
//!
//! A flat registry of files keyed by slash-separated path, the editor
//! session that opens, edits, saves and closes them, and the projections
//! (file tree, tabs, editor buffer) the front-end renders. Persistence is
//! split in two: the remote file service is authoritative for saved
//! content, the snapshot slot keeps the whole session across reloads.

pub mod confirm;
pub mod editor;
pub mod error;
pub mod language;
pub mod registry;
pub mod remote;
pub mod session;
pub mod snapshot;
pub mod terminal;
pub mod tree;

pub use confirm::{AlwaysConfirm, Confirm, Prompt};
pub use editor::{EditorSession, FileState, Outcome, Tab, ViewChanges};
pub use error::{RemoteError, WorkspaceError};
pub use registry::{FileRecord, Registry};
pub use remote::{HttpRemote, MemoryRemote, RemoteSync};
pub use session::Session;
pub use snapshot::{FileSlot, MemorySlot, Snapshot, SnapshotSlot, SnapshotStore};
pub use terminal::{Command, Flow, Terminal};
pub use tree::{build_tree, TreeNode};
