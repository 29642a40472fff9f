//! PathTree builder: nests a flat path set into folders and files.
//!
//! The tree is a pure projection: rebuilt from the registry whenever the
//! view needs it, never stored or persisted.

use std::collections::BTreeMap;

use crate::language::{file_icon, FOLDER_ICON};
use crate::registry::Registry;

/// A folder or file in the projected tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Folder {
        name: String,
        /// Full folder path without trailing slash.
        path: String,
        children: Vec<TreeNode>,
    },
    File {
        name: String,
        path: String,
    },
}

impl TreeNode {
    pub fn name(&self) -> &str {
        match self {
            Self::Folder { name, .. } | Self::File { name, .. } => name,
        }
    }

    pub fn path(&self) -> &str {
        match self {
            Self::Folder { path, .. } | Self::File { path, .. } => path,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder { .. })
    }

    pub fn children(&self) -> &[TreeNode] {
        match self {
            Self::Folder { children, .. } => children,
            Self::File { .. } => &[],
        }
    }

    /// Every file path below (and including) this node.
    pub fn leaf_paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect(self, &mut out, false);
        out
    }

    /// Every folder path below (and including) this node.
    pub fn folder_paths(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect(self, &mut out, true);
        out
    }
}

fn collect<'a>(node: &'a TreeNode, out: &mut Vec<&'a str>, folders: bool) {
    match node {
        TreeNode::Folder { path, children, .. } => {
            if folders {
                out.push(path);
            }
            for child in children {
                collect(child, out, folders);
            }
        }
        TreeNode::File { path, .. } => {
            if !folders {
                out.push(path);
            }
        }
    }
}

/// Folders order before files; the derived `Ord` does the sorting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Kind {
    Folder,
    File,
}

#[derive(Default)]
struct Level {
    entries: BTreeMap<(Kind, String), Entry>,
}

enum Entry {
    Folder(Level),
    File(String),
}

impl Level {
    fn folder(&mut self, name: &str) -> &mut Level {
        let entry = self
            .entries
            .entry((Kind::Folder, name.to_string()))
            .or_insert_with(|| Entry::Folder(Level::default()));
        match entry {
            Entry::Folder(level) => level,
            Entry::File(_) => unreachable!("folder key always maps to a folder entry"),
        }
    }

    fn into_nodes(self, prefix: &str) -> Vec<TreeNode> {
        self.entries
            .into_iter()
            .map(|((_, name), entry)| match entry {
                Entry::Folder(level) => {
                    let path = format!("{prefix}{name}");
                    let children = level.into_nodes(&format!("{path}/"));
                    TreeNode::Folder { name, path, children }
                }
                Entry::File(path) => TreeNode::File { name, path },
            })
            .collect()
    }
}

/// Build the tree for a set of file paths and explicit (possibly empty) folders.
///
/// A file `a` and a folder `a/` (from `a/b`) are kept side by side; the
/// ambiguity is not reconciled.
pub fn build_tree<'a>(
    files: impl IntoIterator<Item = &'a str>,
    folders: impl IntoIterator<Item = &'a str>,
) -> Vec<TreeNode> {
    let mut root = Level::default();

    for path in files {
        let mut segments: Vec<&str> = path.split('/').collect();
        let Some(leaf) = segments.pop() else { continue };
        let mut level = &mut root;
        for segment in segments {
            level = level.folder(segment);
        }
        level
            .entries
            .insert((Kind::File, leaf.to_string()), Entry::File(path.to_string()));
    }

    for path in folders {
        let mut level = &mut root;
        for segment in path.split('/') {
            level = level.folder(segment);
        }
    }

    root.into_nodes("")
}

/// Build the tree for everything in a registry.
pub fn registry_tree(registry: &Registry) -> Vec<TreeNode> {
    build_tree(registry.paths(), registry.folders())
}

/// Indented text rendering with icons; dirty files carry a `●` marker.
pub fn render(nodes: &[TreeNode], is_dirty: &dyn Fn(&str) -> bool) -> String {
    let mut out = String::new();
    render_level(nodes, 0, is_dirty, &mut out);
    out
}

fn render_level(nodes: &[TreeNode], depth: usize, is_dirty: &dyn Fn(&str) -> bool, out: &mut String) {
    let indent = "  ".repeat(depth);
    for node in nodes {
        match node {
            TreeNode::Folder { name, children, .. } => {
                out.push_str(&format!("{indent}{FOLDER_ICON} {name}\n"));
                render_level(children, depth + 1, is_dirty, out);
            }
            TreeNode::File { name, path } => {
                let marker = if is_dirty(path) { " ●" } else { "" };
                out.push_str(&format!("{indent}{} {name}{marker}\n", file_icon(name)));
            }
        }
    }
}
