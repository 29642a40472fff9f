//! Simulated terminal: line commands that drive the editor session.
//!
//! Nothing here executes processes. Each command maps onto one editor
//! operation; its output, and any failure, is appended to a bounded
//! scroll-back so a failed command never ends the session.

use std::collections::VecDeque;

use crate::confirm::Confirm;
use crate::editor::{EditorSession, Outcome};
use crate::remote::RemoteSync;

/// Lines kept in the scroll-back before the oldest are dropped.
pub const SCROLLBACK_LIMIT: usize = 1000;

const HELP: &str = "\
Available commands:
  help                      show this help
  clear                     clear the terminal
  ls                        list files (● marks unsaved)
  tree                      show the file tree
  open <path>               open a file in the editor
  cat [path]                print a file (default: active file)
  write <text>              replace the active file's text (\\n for newline)
  append <text>             append a line to the active file
  save                      save the active file
  close [path]              close a tab (default: active file)
  touch <path> [content]    create a file
  mkdir <path>              create an empty folder
  rm <path>                 delete a file
  mv <path> <new-name>      rename a file within its folder
  status                    show tabs and unsaved files
  reload                    re-list files from the server
  exit                      leave the shell";

/// A parsed terminal command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Clear,
    Ls,
    Tree,
    Open(String),
    Cat(Option<String>),
    Write(String),
    Append(String),
    Save,
    Close(Option<String>),
    Touch { path: String, content: Option<String> },
    Mkdir(String),
    Rm(String),
    Mv { path: String, new_name: String },
    Status,
    Reload,
    Exit,
}

impl Command {
    /// Parse one input line. `Ok(None)` for a blank line; `Err` carries the
    /// message to show for unknown commands or missing arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, String> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        let (name, rest) = match line.split_once(char::is_whitespace) {
            Some((name, rest)) => (name, rest.trim()),
            None => (line, ""),
        };
        let arg = (!rest.is_empty()).then(|| rest.to_string());
        let required = |usage: &str| arg.clone().ok_or_else(|| format!("usage: {usage}"));

        let cmd = match name {
            "help" => Self::Help,
            "clear" => Self::Clear,
            "ls" => Self::Ls,
            "tree" => Self::Tree,
            "open" => Self::Open(required("open <path>")?),
            "cat" => Self::Cat(arg),
            "write" => Self::Write(unescape(rest)),
            "append" => Self::Append(unescape(rest)),
            "save" => Self::Save,
            "close" => Self::Close(arg),
            "touch" => {
                let rest = required("touch <path> [content]")?;
                match rest.split_once(char::is_whitespace) {
                    Some((path, content)) => Self::Touch {
                        path: path.to_string(),
                        content: Some(unescape(content.trim_start())),
                    },
                    None => Self::Touch { path: rest, content: None },
                }
            }
            "mkdir" => Self::Mkdir(required("mkdir <path>")?),
            "rm" => Self::Rm(required("rm <path>")?),
            "mv" => {
                let mut parts = rest.split_whitespace();
                match (parts.next(), parts.next(), parts.next()) {
                    (Some(path), Some(new_name), None) => Self::Mv {
                        path: path.to_string(),
                        new_name: new_name.to_string(),
                    },
                    _ => return Err("usage: mv <path> <new-name>".to_string()),
                }
            }
            "status" => Self::Status,
            "reload" => Self::Reload,
            "exit" | "quit" => Self::Exit,
            other => return Err(format!("command not found: {other}")),
        };
        Ok(Some(cmd))
    }
}

fn unescape(text: &str) -> String {
    text.replace("\\n", "\n").replace("\\t", "\t")
}

/// Whether the shell keeps reading input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Scroll-back plus the command interpreter.
#[derive(Debug)]
pub struct Terminal {
    lines: VecDeque<String>,
    limit: usize,
    /// Lines ever pushed, including evicted and cleared ones.
    written: u64,
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl Terminal {
    pub fn new() -> Self {
        Self::with_limit(SCROLLBACK_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            lines: VecDeque::new(),
            limit: limit.max(1),
            written: 0,
        }
    }

    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.lines.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Append output; multi-line text becomes several scroll-back lines.
    pub fn push(&mut self, text: impl AsRef<str>) {
        for line in text.as_ref().lines() {
            if self.lines.len() == self.limit {
                self.lines.pop_front();
            }
            self.lines.push_back(line.to_string());
            self.written += 1;
        }
    }

    /// Position to pass to [`Self::since`] later.
    pub fn mark(&self) -> u64 {
        self.written
    }

    /// Lines pushed after `mark` that are still in the scroll-back.
    pub fn since(&self, mark: u64) -> impl Iterator<Item = &str> {
        let fresh = self.written.saturating_sub(mark).min(self.lines.len() as u64) as usize;
        self.lines.iter().skip(self.lines.len() - fresh).map(String::as_str)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    /// Run one input line against the editor, echoing it first.
    pub async fn execute<R, C>(&mut self, editor: &mut EditorSession<R, C>, line: &str) -> Flow
    where
        R: RemoteSync,
        C: Confirm,
    {
        self.push(format!("$ {}", line.trim()));
        let cmd = match Command::parse(line) {
            Ok(Some(cmd)) => cmd,
            Ok(None) => return Flow::Continue,
            Err(message) => {
                self.push(message);
                return Flow::Continue;
            }
        };
        match self.run(editor, cmd).await {
            Ok(flow) => flow,
            Err(message) => {
                self.push(format!("error: {message}"));
                Flow::Continue
            }
        }
    }

    async fn run<R, C>(&mut self, editor: &mut EditorSession<R, C>, cmd: Command) -> Result<Flow, String>
    where
        R: RemoteSync,
        C: Confirm,
    {
        match cmd {
            Command::Help => self.push(HELP),
            Command::Clear => self.clear(),
            Command::Ls => {
                if editor.registry().is_empty() {
                    self.push("(no files)");
                }
                let listing: Vec<String> = editor
                    .registry()
                    .paths()
                    .map(|path| {
                        if editor.is_dirty(path) {
                            format!("{path} ●")
                        } else {
                            path.to_string()
                        }
                    })
                    .collect();
                for entry in listing {
                    self.push(entry);
                }
            }
            Command::Tree => {
                let rendered = editor.render_tree();
                if rendered.is_empty() {
                    self.push("(empty workspace)");
                } else {
                    self.push(rendered);
                }
            }
            Command::Open(path) => {
                editor.open(&path).map_err(|e| e.to_string())?;
                self.push(format!("Opened {path}"));
            }
            Command::Cat(path) => {
                let path = match path.or_else(|| editor.active_file().map(str::to_string)) {
                    Some(path) => path,
                    None => return Err("no file is open".to_string()),
                };
                let text = editor
                    .text_of(&path)
                    .ok_or_else(|| format!("File not found: {path}"))?
                    .to_string();
                self.push(text);
            }
            Command::Write(text) => {
                if !editor.edit(text) {
                    return Err("no file is open".to_string());
                }
            }
            Command::Append(text) => {
                let mut current = editor.editor_text().ok_or("no file is open")?.to_string();
                if !current.is_empty() && !current.ends_with('\n') {
                    current.push('\n');
                }
                current.push_str(&text);
                current.push('\n');
                editor.edit(current);
            }
            Command::Save => match editor.save().await.map_err(|e| e.to_string())? {
                Outcome::Unchanged => return Err("no file is open".to_string()),
                _ => self.push(format!("Saved {}", editor.active_file().unwrap_or_default())),
            },
            Command::Close(path) => {
                let path = match path.or_else(|| editor.active_file().map(str::to_string)) {
                    Some(path) => path,
                    None => return Err("no file is open".to_string()),
                };
                let outcome = editor.close(&path).await.map_err(|e| e.to_string())?;
                self.report(outcome, format!("Closed {path}"), format!("{path} is not open"));
            }
            Command::Touch { path, content } => {
                let outcome = match content {
                    Some(content) => editor.create(&path, content).await,
                    None => editor.create_from_template(&path).await,
                }
                .map_err(|e| e.to_string())?;
                self.report(outcome, format!("Created {path}"), String::new());
            }
            Command::Mkdir(path) => {
                let outcome = editor.create_folder(&path).map_err(|e| e.to_string())?;
                self.report(outcome, format!("Created folder {path}"), format!("{path} already exists"));
            }
            Command::Rm(path) => {
                let outcome = editor.delete(&path).await.map_err(|e| e.to_string())?;
                self.report(outcome, format!("Deleted {path}"), String::new());
            }
            Command::Mv { path, new_name } => {
                let outcome = editor.rename(&path, &new_name).await.map_err(|e| e.to_string())?;
                self.report(outcome, format!("Renamed {path} to {new_name}"), "name unchanged".to_string());
            }
            Command::Status => self.status(editor),
            Command::Reload => {
                let count = editor.refresh().await.map_err(|e| e.to_string())?;
                self.push(format!("Reloaded {count} files"));
            }
            Command::Exit => return Ok(Flow::Exit),
        }
        Ok(Flow::Continue)
    }

    fn report(&mut self, outcome: Outcome, applied: String, unchanged: String) {
        match outcome {
            Outcome::Applied => self.push(applied),
            Outcome::Unchanged => self.push(unchanged),
            Outcome::Declined => self.push("Cancelled"),
        }
    }

    fn status<R: RemoteSync, C: Confirm>(&mut self, editor: &EditorSession<R, C>) {
        self.push(format!(
            "{} files, active: {}",
            editor.registry().len(),
            editor.active_file().unwrap_or("(none)")
        ));
        for tab in editor.tabs() {
            let active = if tab.active { "*" } else { " " };
            let dirty = if tab.dirty { " ●" } else { "" };
            self.push(format!("{active} {} {}{dirty}", tab.icon, tab.path));
        }
        let unsaved = editor.registry().dirty_paths().count();
        if unsaved > 0 {
            self.push(format!("{unsaved} unsaved file(s)"));
        }
    }
}
