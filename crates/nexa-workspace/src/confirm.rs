//! Confirmation prompts for destructive actions.
//!
//! Each destructive action asks exactly one question, even when it implies
//! another destructive step (deleting a dirty file also discards its edits).

use std::future::Future;

/// A question put to the user before a destructive action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Prompt {
    /// Close a file whose edits have not been saved.
    DiscardChanges { path: String },
    /// Delete a file; `unsaved` is set when its edits will be lost too.
    Delete { path: String, unsaved: bool },
    /// Replace an existing file with new content.
    Overwrite { path: String },
    /// Rename that loses unsaved edits, replaces an existing file, or both.
    Rename {
        path: String,
        new_path: String,
        unsaved: bool,
        overwrite: bool,
    },
}

impl Prompt {
    pub fn message(&self) -> String {
        match self {
            Self::DiscardChanges { path } => {
                format!("{path} has unsaved changes. Close anyway?")
            }
            Self::Delete { path, unsaved: false } => format!("Delete {path}?"),
            Self::Delete { path, unsaved: true } => {
                format!("Delete {path}? Its unsaved changes will be lost.")
            }
            Self::Overwrite { path } => format!("{path} already exists. Overwrite?"),
            Self::Rename { path, new_path, unsaved, overwrite } => {
                let mut msg = format!("Rename {path} to {new_path}?");
                if *unsaved {
                    msg.push_str(" Its unsaved changes will be lost.");
                }
                if *overwrite {
                    msg.push_str(&format!(" {new_path} will be replaced."));
                }
                msg
            }
        }
    }
}

/// Source of yes/no answers (stdin, a dialog, a test script).
pub trait Confirm: Send {
    fn confirm(&mut self, prompt: &Prompt) -> impl Future<Output = bool> + Send;
}

/// Answers yes to everything (`--yes`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

impl Confirm for AlwaysConfirm {
    async fn confirm(&mut self, _prompt: &Prompt) -> bool {
        true
    }
}
