//! Editor session: open tabs in order and the active one.

/// Tab order and active file.
///
/// `active_file`, when set, is always an element of `open_files`, and
/// `open_files` never holds duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Session {
    open_files: Vec<String>,
    active_file: Option<String>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted parts, dropping duplicates and an active
    /// file that is not among the open ones.
    pub fn from_parts(open_files: Vec<String>, active_file: Option<String>) -> Self {
        let mut session = Self::new();
        for path in open_files {
            session.open_tab(&path);
        }
        if let Some(active) = active_file {
            session.activate(&active);
        }
        session
    }

    pub fn open_files(&self) -> &[String] {
        &self.open_files
    }

    pub fn active_file(&self) -> Option<&str> {
        self.active_file.as_deref()
    }

    pub fn is_open(&self, path: &str) -> bool {
        self.open_files.iter().any(|p| p == path)
    }

    pub fn is_active(&self, path: &str) -> bool {
        self.active_file.as_deref() == Some(path)
    }

    /// Append a tab to the right. Returns false if it was already open.
    pub fn open_tab(&mut self, path: &str) -> bool {
        if self.is_open(path) {
            return false;
        }
        self.open_files.push(path.to_string());
        true
    }

    /// Make an open tab active. Returns false if the path is not open.
    pub fn activate(&mut self, path: &str) -> bool {
        if !self.is_open(path) {
            return false;
        }
        self.active_file = Some(path.to_string());
        true
    }

    /// Remove a tab. Closing the active tab leaves no tab active.
    pub fn close_tab(&mut self, path: &str) -> bool {
        let before = self.open_files.len();
        self.open_files.retain(|p| p != path);
        if self.is_active(path) {
            self.active_file = None;
        }
        self.open_files.len() != before
    }

    /// Keep only tabs satisfying the predicate; returns the dropped paths.
    pub fn retain(&mut self, mut keep: impl FnMut(&str) -> bool) -> Vec<String> {
        let mut dropped = Vec::new();
        self.open_files.retain(|p| {
            let k = keep(p);
            if !k {
                dropped.push(p.clone());
            }
            k
        });
        if let Some(active) = self.active_file.as_deref() {
            if !self.open_files.iter().any(|p| p == active) {
                self.active_file = None;
            }
        }
        dropped
    }

    pub fn clear(&mut self) {
        self.open_files.clear();
        self.active_file = None;
    }
}
