//! Workspace core tests: tree projection, registry, editor session state
//! machine, snapshots and the simulated terminal.
//!
//! Editor tests run against the in-memory remote so every remote call and
//! every failure can be observed.

use std::collections::VecDeque;

use nexa_workspace::{
    AlwaysConfirm, Confirm, EditorSession, FileRecord, FileState, MemoryRemote, Outcome, Prompt, Registry,
    RemoteSync, Snapshot, WorkspaceError,
};

/// Answers confirmations from a script and records every prompt.
#[derive(Default)]
struct Scripted {
    answers: VecDeque<bool>,
    asked: Vec<Prompt>,
}

impl Scripted {
    fn answering(answers: &[bool]) -> Self {
        Self {
            answers: answers.iter().copied().collect(),
            asked: Vec::new(),
        }
    }
}

impl Confirm for Scripted {
    async fn confirm(&mut self, prompt: &Prompt) -> bool {
        self.asked.push(prompt.clone());
        self.answers.pop_front().unwrap_or(false)
    }
}

async fn loaded<C: Confirm>(files: &[(&str, &str)], confirm: C) -> EditorSession<MemoryRemote, C> {
    let remote = MemoryRemote::with_files(files.iter().map(|(p, c)| (p.to_string(), c.to_string())));
    let mut editor = EditorSession::new(remote, confirm);
    editor.load_workspace().await.unwrap();
    editor
}

// ─────────────────────────────────────────────────────────────────────────────
// Tree
// ─────────────────────────────────────────────────────────────────────────────

mod tree {
    use nexa_workspace::tree::render;
    use nexa_workspace::{build_tree, TreeNode};

    fn leaves(nodes: &[TreeNode]) -> Vec<String> {
        let mut out: Vec<String> = nodes
            .iter()
            .flat_map(|n| n.leaf_paths())
            .map(str::to_string)
            .collect();
        out.sort();
        out
    }

    fn folders(nodes: &[TreeNode]) -> Vec<String> {
        let mut out: Vec<String> = nodes
            .iter()
            .flat_map(|n| n.folder_paths())
            .map(str::to_string)
            .collect();
        out.sort();
        out
    }

    #[test]
    fn leaves_are_the_paths_and_folders_the_proper_prefixes() {
        let paths = ["src/main.py", "src/util/io.py", "README.md", "docs/guide/intro.md"];
        let nodes = build_tree(paths, []);

        let mut expected: Vec<String> = paths.iter().map(|p| p.to_string()).collect();
        expected.sort();
        assert_eq!(leaves(&nodes), expected);
        assert_eq!(folders(&nodes), vec!["docs", "docs/guide", "src", "src/util"]);
    }

    #[test]
    fn folders_sort_before_files_then_by_name() {
        let nodes = build_tree(["b.txt", "a.txt", "z/x.txt", "c/y.txt"], []);
        let names: Vec<&str> = nodes.iter().map(TreeNode::name).collect();
        assert_eq!(names, vec!["c", "z", "a.txt", "b.txt"]);
        assert!(nodes[0].is_folder());
        assert!(!nodes[2].is_folder());
    }

    #[test]
    fn nested_folder_paths() {
        let nodes = build_tree(["a/b/c.txt"], []);
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].path(), "a");
        let b = &nodes[0].children()[0];
        assert_eq!(b.path(), "a/b");
        assert_eq!(b.children()[0].path(), "a/b/c.txt");
        assert_eq!(b.children()[0].name(), "c.txt");
    }

    #[test]
    fn file_and_folder_with_same_name_coexist() {
        let nodes = build_tree(["a", "a/b"], []);
        assert_eq!(nodes.len(), 2);
        assert!(nodes[0].is_folder());
        assert_eq!(nodes[0].name(), "a");
        assert!(!nodes[1].is_folder());
        assert_eq!(nodes[1].path(), "a");
    }

    #[test]
    fn empty_folders_come_from_explicit_entries() {
        let nodes = build_tree(["src/main.py"], ["assets/img", "src"]);
        assert_eq!(folders(&nodes), vec!["assets", "assets/img", "src"]);
        assert_eq!(leaves(&nodes), vec!["src/main.py"]);
    }

    #[test]
    fn building_is_deterministic() {
        let a = build_tree(["x/1", "y", "x/2"], []);
        let b = build_tree(["x/2", "x/1", "y"], []);
        assert_eq!(a, b);
    }

    #[test]
    fn render_marks_dirty_files() {
        let nodes = build_tree(["src/main.py", "notes.txt"], []);
        let text = render(&nodes, &|path| path == "src/main.py");
        assert_eq!(text, "📁 src\n  🐍 main.py ●\n📄 notes.txt\n");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Registry and paths
// ─────────────────────────────────────────────────────────────────────────────

mod registry {
    use super::*;
    use nexa_workspace::registry::{normalize_path, parent_prefix};

    fn registry_with(paths: &[&str]) -> Registry {
        let mut reg = Registry::new();
        for path in paths {
            reg.put(FileRecord::new(path, format!("content of {path}")).unwrap());
        }
        reg
    }

    #[test]
    fn normalize_accepts_relative_paths() {
        assert_eq!(normalize_path("a/b.txt").unwrap(), "a/b.txt");
        assert_eq!(normalize_path("./a/b.txt").unwrap(), "a/b.txt");
    }

    #[test]
    fn normalize_rejects_bad_paths() {
        for bad in ["", "./", "/etc/passwd", "a/../b", "a//b", "a/", "a\\b", ".", ".."] {
            let err = normalize_path(bad).unwrap_err();
            assert!(matches!(err, WorkspaceError::InvalidName { .. }), "{bad:?} gave {err}");
        }
    }

    #[test]
    fn parent_prefix_keeps_trailing_slash() {
        assert_eq!(parent_prefix("a/b/c.txt"), "a/b/");
        assert_eq!(parent_prefix("c.txt"), "");
    }

    #[test]
    fn record_derives_name_and_language() {
        let record = FileRecord::new("src/app.tsx", "").unwrap();
        assert_eq!(record.name(), "app.tsx");
        assert_eq!(record.language(), "typescript");
        assert_eq!(FileRecord::new("Makefile", "").unwrap().language(), "text");
    }

    #[test]
    fn put_overwrites_and_remove_drops_dirty() {
        let mut reg = registry_with(&["a.txt"]);
        let previous = reg.put(FileRecord::new("a.txt", "new").unwrap());
        assert_eq!(previous.unwrap().content(), "content of a.txt");
        assert!(reg.mark_dirty("a.txt"));

        reg.remove("a.txt");
        assert!(!reg.contains("a.txt"));
        assert!(!reg.is_dirty("a.txt"));
    }

    #[test]
    fn dirty_marks_ignore_absent_paths() {
        let mut reg = registry_with(&["a.txt"]);
        assert!(!reg.mark_dirty("ghost.txt"));
        assert!(!reg.is_dirty("ghost.txt"));
        assert!(!reg.clear_dirty("ghost.txt"));
        assert_eq!(reg.dirty_paths().count(), 0);
    }

    #[test]
    fn rename_moves_within_folder() {
        let mut reg = registry_with(&["src/old.py"]);
        let new_path = reg.rename("src/old.py", "new.py").unwrap();
        assert_eq!(new_path.as_deref(), Some("src/new.py"));
        assert!(!reg.contains("src/old.py"));
        let record = reg.get("src/new.py").unwrap();
        assert_eq!(record.name(), "new.py");
        assert_eq!(record.content(), "content of src/old.py");
    }

    #[test]
    fn rename_to_same_name_is_noop() {
        let mut reg = registry_with(&["a.txt"]);
        reg.mark_dirty("a.txt");
        let before = reg.clone();
        assert_eq!(reg.rename("a.txt", "a.txt").unwrap(), None);
        assert_eq!(reg, before);
    }

    #[test]
    fn rename_rejects_separators_and_traversal() {
        let mut reg = registry_with(&["a.txt"]);
        for bad in ["x/y.txt", "..", ".", "", "x\\y"] {
            assert!(matches!(
                reg.rename("a.txt", bad),
                Err(WorkspaceError::InvalidName { .. })
            ));
        }
        assert!(reg.contains("a.txt"));
    }

    #[test]
    fn rename_missing_is_not_found() {
        let mut reg = Registry::new();
        assert!(matches!(reg.rename("nope.txt", "b.txt"), Err(WorkspaceError::NotFound { .. })));
    }

    #[test]
    fn explicit_folders() {
        let mut reg = Registry::new();
        assert!(reg.add_folder("assets").unwrap());
        assert!(!reg.add_folder("./assets").unwrap());
        assert!(reg.add_folder("../up").is_err());
        assert_eq!(reg.folders().collect::<Vec<_>>(), vec!["assets"]);
        assert!(reg.remove_folder("assets"));
        assert!(reg.is_empty());
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

mod session {
    use nexa_workspace::Session;

    #[test]
    fn tabs_open_to_the_right_without_duplicates() {
        let mut s = Session::new();
        assert!(s.open_tab("a"));
        assert!(s.open_tab("b"));
        assert!(!s.open_tab("a"));
        assert_eq!(s.open_files(), ["a", "b"]);
    }

    #[test]
    fn activate_requires_open_tab() {
        let mut s = Session::new();
        assert!(!s.activate("a"));
        s.open_tab("a");
        assert!(s.activate("a"));
        assert_eq!(s.active_file(), Some("a"));
    }

    #[test]
    fn closing_active_tab_selects_nothing() {
        let mut s = Session::from_parts(vec!["a".into(), "b".into()], Some("b".into()));
        assert!(s.close_tab("b"));
        assert_eq!(s.active_file(), None);
        assert_eq!(s.open_files(), ["a"]);
    }

    #[test]
    fn from_parts_drops_invalid_active() {
        let s = Session::from_parts(vec!["a".into(), "a".into()], Some("zzz".into()));
        assert_eq!(s.open_files(), ["a"]);
        assert_eq!(s.active_file(), None);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Language lookups
// ─────────────────────────────────────────────────────────────────────────────

mod language {
    use nexa_workspace::language::{detect_language, file_icon, template_for};

    #[test]
    fn languages_by_extension() {
        assert_eq!(detect_language("a.py"), "python");
        assert_eq!(detect_language("a.jsx"), "javascript");
        assert_eq!(detect_language("dir.d/a.ts"), "typescript");
        assert_eq!(detect_language("index.html"), "html");
        assert_eq!(detect_language("README.md"), "markdown");
        assert_eq!(detect_language("data.json"), "json");
        assert_eq!(detect_language("dir.d/noext"), "text");
    }

    #[test]
    fn icons_fall_back_to_generic() {
        assert_eq!(file_icon("main.rs"), "🦀");
        assert_eq!(file_icon("photo.jpeg"), "🖼️");
        assert_eq!(file_icon("unknown.xyz"), "📄");
    }

    #[test]
    fn templates() {
        assert!(template_for("main.py").contains("def main()"));
        assert!(template_for("site/about.html").contains("<title>about</title>"));
        assert_eq!(template_for("docs/notes.md"), "# notes\n");
        assert_eq!(template_for("data.csv"), "");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Editor session state machine
// ─────────────────────────────────────────────────────────────────────────────

mod editor {
    use super::*;

    #[tokio::test]
    async fn starts_empty_with_placeholder() {
        let editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        assert!(editor.registry().is_empty());
        assert!(editor.session().open_files().is_empty());
        assert_eq!(editor.active_file(), None);
        assert_eq!(editor.editor_text(), None);
    }

    #[tokio::test]
    async fn load_workspace_replaces_state() {
        let mut editor = loaded(&[("main.py", "print(1)"), ("lib/util.py", "")], AlwaysConfirm).await;
        assert_eq!(editor.registry().len(), 2);

        editor.open("main.py").unwrap();
        editor.remote().fail_operation("load");
        assert!(editor.load_workspace().await.unwrap_err().is_remote());
        // A failed load leaves the session alone.
        assert_eq!(editor.active_file(), Some("main.py"));

        editor.remote().recover();
        assert_eq!(editor.load_workspace().await.unwrap(), 2);
        assert_eq!(editor.active_file(), None);
    }

    #[tokio::test]
    async fn empty_workspace_is_not_an_error() {
        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        assert_eq!(editor.load_workspace().await.unwrap(), 0);
        assert!(editor.tree().is_empty());
    }

    #[tokio::test]
    async fn invalid_remote_paths_are_skipped() {
        let editor = loaded(&[("ok.txt", ""), ("/abs.txt", ""), ("a/../b", "")], AlwaysConfirm).await;
        assert_eq!(editor.registry().paths().collect::<Vec<_>>(), vec!["ok.txt"]);
    }

    #[tokio::test]
    async fn open_missing_path_changes_nothing() {
        let mut editor = loaded(&[("a.txt", "")], AlwaysConfirm).await;
        editor.open("a.txt").unwrap();
        editor.take_view_changes();

        let err = editor.open("missing.txt").unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { ref path } if path == "missing.txt"));
        assert_eq!(editor.session().open_files(), ["a.txt"]);
        assert_eq!(editor.active_file(), Some("a.txt"));
        assert!(!editor.take_view_changes().any());
    }

    #[tokio::test]
    async fn open_appends_tabs_and_activates() {
        let mut editor = loaded(&[("a.txt", "A"), ("b.txt", "B")], AlwaysConfirm).await;
        editor.open("a.txt").unwrap();
        editor.open("b.txt").unwrap();
        editor.open("a.txt").unwrap();

        assert_eq!(editor.session().open_files(), ["a.txt", "b.txt"]);
        assert_eq!(editor.active_file(), Some("a.txt"));
        assert_eq!(editor.editor_text(), Some("A"));

        let tabs = editor.tabs();
        assert_eq!(tabs.len(), 2);
        assert!(tabs[0].active);
        assert!(!tabs[1].active);
        assert_eq!(tabs[1].icon, "📄");
    }

    #[tokio::test]
    async fn edit_marks_active_file_dirty() {
        let mut editor = loaded(&[("a.txt", "A")], AlwaysConfirm).await;
        assert!(!editor.edit("ignored"));

        editor.open("a.txt").unwrap();
        assert_eq!(editor.state_of("a.txt"), FileState::Clean);
        assert!(editor.edit("A2"));
        assert!(editor.edit("A3"));
        assert_eq!(editor.state_of("a.txt"), FileState::Dirty);
        assert_eq!(editor.editor_text(), Some("A3"));
        // The saved content is untouched until a save succeeds.
        assert_eq!(editor.registry().get("a.txt").unwrap().content(), "A");
        assert!(editor.tabs()[0].dirty);
    }

    #[tokio::test]
    async fn drafts_survive_tab_switches() {
        let mut editor = loaded(&[("a.txt", "A"), ("b.txt", "B")], AlwaysConfirm).await;
        editor.open("a.txt").unwrap();
        editor.edit("draft A");
        editor.open("b.txt").unwrap();
        assert_eq!(editor.editor_text(), Some("B"));
        editor.open("a.txt").unwrap();
        assert_eq!(editor.editor_text(), Some("draft A"));
    }

    #[tokio::test]
    async fn save_without_active_file_is_noop() {
        let mut editor = loaded(&[("a.txt", "A")], AlwaysConfirm).await;
        assert_eq!(editor.save().await.unwrap(), Outcome::Unchanged);
        assert_eq!(editor.remote().calls(), vec!["load"]);
    }

    #[tokio::test]
    async fn save_then_close_never_prompts() {
        let mut editor = loaded(&[("a.txt", "A")], Scripted::default()).await;
        editor.open("a.txt").unwrap();
        editor.edit("A2");

        let before = editor.registry().get("a.txt").unwrap().last_modified();
        assert_eq!(editor.save().await.unwrap(), Outcome::Applied);
        assert_eq!(editor.state_of("a.txt"), FileState::Clean);
        assert_eq!(editor.remote().content("a.txt").as_deref(), Some("A2"));
        let record = editor.registry().get("a.txt").unwrap();
        assert_eq!(record.content(), "A2");
        assert!(record.last_modified() >= before);

        assert_eq!(editor.close("a.txt").await.unwrap(), Outcome::Applied);
        assert!(editor.confirm_mut().asked.is_empty());
        assert_eq!(editor.state_of("a.txt"), FileState::Closed);
    }

    #[tokio::test]
    async fn failed_save_keeps_file_dirty() {
        let mut editor = loaded(&[("a.txt", "A")], AlwaysConfirm).await;
        editor.open("a.txt").unwrap();
        editor.edit("A2");
        editor.remote().fail_operation("update");

        let err = editor.save().await.unwrap_err();
        assert!(err.is_remote());
        assert!(err.to_string().contains("Remote update failed for a.txt"));
        assert!(editor.is_dirty("a.txt"));
        assert_eq!(editor.registry().get("a.txt").unwrap().content(), "A");
        assert_eq!(editor.editor_text(), Some("A2"));
        assert_eq!(editor.remote().content("a.txt").as_deref(), Some("A"));

        // A manual retry succeeds once the service is back.
        editor.remote().recover();
        editor.save().await.unwrap();
        assert!(!editor.is_dirty("a.txt"));
    }

    #[tokio::test]
    async fn closing_non_active_tab_keeps_active() {
        let mut editor = loaded(&[("a.txt", ""), ("b.txt", "")], AlwaysConfirm).await;
        editor.open("a.txt").unwrap();
        editor.open("b.txt").unwrap();

        assert_eq!(editor.close("a.txt").await.unwrap(), Outcome::Applied);
        assert_eq!(editor.session().open_files(), ["b.txt"]);
        assert_eq!(editor.active_file(), Some("b.txt"));
    }

    #[tokio::test]
    async fn closing_active_tab_shows_placeholder() {
        let mut editor = loaded(&[("a.txt", ""), ("b.txt", "")], AlwaysConfirm).await;
        editor.open("a.txt").unwrap();
        editor.open("b.txt").unwrap();

        editor.close("b.txt").await.unwrap();
        assert_eq!(editor.active_file(), None);
        assert_eq!(editor.editor_text(), None);
        assert_eq!(editor.session().open_files(), ["a.txt"]);
    }

    #[tokio::test]
    async fn close_dirty_asks_once_and_respects_decline() {
        let mut editor = loaded(&[("a.txt", "A")], Scripted::answering(&[false, true])).await;
        editor.open("a.txt").unwrap();
        editor.edit("A2");

        assert_eq!(editor.close("a.txt").await.unwrap(), Outcome::Declined);
        assert_eq!(editor.state_of("a.txt"), FileState::Dirty);
        assert_eq!(editor.editor_text(), Some("A2"));

        assert_eq!(editor.close("a.txt").await.unwrap(), Outcome::Applied);
        assert_eq!(editor.state_of("a.txt"), FileState::Closed);
        assert!(!editor.is_dirty("a.txt"));
        // The draft is discarded; reopening shows the saved content.
        editor.open("a.txt").unwrap();
        assert_eq!(editor.editor_text(), Some("A"));

        assert_eq!(
            editor.confirm_mut().asked,
            vec![
                Prompt::DiscardChanges { path: "a.txt".into() },
                Prompt::DiscardChanges { path: "a.txt".into() },
            ]
        );
    }

    #[tokio::test]
    async fn close_of_closed_file_is_unchanged() {
        let mut editor = loaded(&[("a.txt", "")], AlwaysConfirm).await;
        assert_eq!(editor.close("a.txt").await.unwrap(), Outcome::Unchanged);
    }

    #[tokio::test]
    async fn create_nested_file_in_empty_registry() {
        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        assert_eq!(editor.create("a/b.txt", "").await.unwrap(), Outcome::Applied);

        assert_eq!(editor.registry().paths().collect::<Vec<_>>(), vec!["a/b.txt"]);
        let tree = editor.tree();
        assert_eq!(tree.len(), 1);
        assert!(tree[0].is_folder());
        assert_eq!(tree[0].name(), "a");
        assert_eq!(tree[0].children()[0].name(), "b.txt");
        assert_eq!(tree[0].children()[0].path(), "a/b.txt");
        assert_eq!(editor.session().open_files(), ["a/b.txt"]);
        assert_eq!(editor.active_file(), Some("a/b.txt"));
        assert_eq!(editor.remote().calls(), vec!["create a/b.txt"]);
    }

    #[tokio::test]
    async fn create_normalizes_and_rejects_paths() {
        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        editor.create("./notes.txt", "n").await.unwrap();
        assert!(editor.registry().contains("notes.txt"));

        let err = editor.create("../escape.txt", "").await.unwrap_err();
        assert!(matches!(err, WorkspaceError::InvalidName { .. }));
        assert_eq!(editor.remote().calls(), vec!["create notes.txt"]);
    }

    #[tokio::test]
    async fn create_existing_asks_to_overwrite() {
        let mut editor = loaded(&[("a.txt", "old")], Scripted::answering(&[false, true])).await;

        assert_eq!(editor.create("a.txt", "new").await.unwrap(), Outcome::Declined);
        assert_eq!(editor.registry().get("a.txt").unwrap().content(), "old");
        assert_eq!(editor.remote().calls(), vec!["load"]);

        assert_eq!(editor.create("a.txt", "new").await.unwrap(), Outcome::Applied);
        assert_eq!(editor.registry().get("a.txt").unwrap().content(), "new");
        assert_eq!(editor.remote().content("a.txt").as_deref(), Some("new"));
        assert_eq!(editor.confirm_mut().asked[0], Prompt::Overwrite { path: "a.txt".into() });
    }

    #[tokio::test]
    async fn failed_create_leaves_registry_untouched() {
        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        editor.remote().fail_operation("create");
        assert!(editor.create("a.txt", "").await.unwrap_err().is_remote());
        assert!(editor.registry().is_empty());
        assert!(editor.session().open_files().is_empty());
    }

    #[tokio::test]
    async fn create_from_template_seeds_content() {
        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        editor.create_from_template("docs/guide.md").await.unwrap();
        assert_eq!(editor.editor_text(), Some("# guide\n"));
        assert_eq!(editor.remote().content("docs/guide.md").as_deref(), Some("# guide\n"));
    }

    #[tokio::test]
    async fn folders_are_local_markers() {
        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        assert_eq!(editor.create_folder("assets/img").unwrap(), Outcome::Applied);
        assert_eq!(editor.create_folder("assets/img").unwrap(), Outcome::Unchanged);

        assert!(editor.registry().is_empty());
        assert!(editor.remote().calls().is_empty());
        let tree = editor.tree();
        assert_eq!(tree[0].folder_paths(), vec!["assets", "assets/img"]);

        assert_eq!(editor.remove_folder("assets/img"), Outcome::Applied);
        assert!(editor.tree().is_empty());
    }

    #[tokio::test]
    async fn delete_dirty_open_file_asks_once() {
        let mut editor = loaded(&[("main.py", "print(1)"), ("other.py", "")], Scripted::answering(&[true])).await;
        editor.open("main.py").unwrap();
        editor.edit("print(2)");

        assert_eq!(editor.delete("main.py").await.unwrap(), Outcome::Applied);
        assert!(!editor.registry().contains("main.py"));
        assert!(!editor.is_dirty("main.py"));
        assert_eq!(editor.active_file(), None);
        assert!(editor.session().open_files().is_empty());
        assert_eq!(editor.remote().content("main.py"), None);
        assert_eq!(
            editor.confirm_mut().asked,
            vec![Prompt::Delete {
                path: "main.py".into(),
                unsaved: true
            }]
        );
    }

    #[tokio::test]
    async fn declined_delete_changes_nothing() {
        let mut editor = loaded(&[("a.txt", "A")], Scripted::answering(&[false])).await;
        editor.open("a.txt").unwrap();
        assert_eq!(editor.delete("a.txt").await.unwrap(), Outcome::Declined);
        assert!(editor.registry().contains("a.txt"));
        assert_eq!(editor.active_file(), Some("a.txt"));
        assert_eq!(editor.remote().calls(), vec!["load"]);
    }

    #[tokio::test]
    async fn failed_delete_keeps_local_file() {
        let mut editor = loaded(&[("a.txt", "A")], AlwaysConfirm).await;
        editor.open("a.txt").unwrap();
        editor.edit("A2");
        editor.remote().fail_operation("delete");

        assert!(editor.delete("a.txt").await.unwrap_err().is_remote());
        assert!(editor.registry().contains("a.txt"));
        assert_eq!(editor.state_of("a.txt"), FileState::Dirty);
        assert_eq!(editor.editor_text(), Some("A2"));
    }

    #[tokio::test]
    async fn delete_missing_is_not_found() {
        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        assert!(matches!(
            editor.delete("nope").await,
            Err(WorkspaceError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn rename_to_same_name_is_noop() {
        let mut editor = loaded(&[("src/a.py", "A")], Scripted::default()).await;
        editor.open("src/a.py").unwrap();
        editor.edit("A2");
        let snapshot = editor.snapshot();

        assert_eq!(editor.rename("src/a.py", "a.py").await.unwrap(), Outcome::Unchanged);
        assert_eq!(editor.snapshot(), snapshot);
        assert!(editor.confirm_mut().asked.is_empty());
        assert_eq!(editor.remote().calls(), vec!["load"]);
    }

    #[tokio::test]
    async fn rename_clean_file_moves_it_remotely() {
        let mut editor = loaded(&[("src/a.py", "A")], Scripted::default()).await;
        editor.open("src/a.py").unwrap();

        assert_eq!(editor.rename("src/a.py", "b.py").await.unwrap(), Outcome::Applied);
        assert!(!editor.registry().contains("src/a.py"));
        assert_eq!(editor.registry().get("src/b.py").unwrap().content(), "A");
        assert!(editor.session().open_files().is_empty());
        assert_eq!(editor.active_file(), None);
        assert_eq!(editor.remote().paths(), vec!["src/b.py"]);
        assert_eq!(editor.remote().calls(), vec!["load", "create src/b.py", "delete src/a.py"]);
        assert!(editor.confirm_mut().asked.is_empty());
    }

    #[tokio::test]
    async fn rename_dirty_file_discards_edits_after_confirmation() {
        let mut editor = loaded(&[("a.txt", "saved")], Scripted::answering(&[true])).await;
        editor.open("a.txt").unwrap();
        editor.edit("unsaved");

        assert_eq!(editor.rename("a.txt", "b.txt").await.unwrap(), Outcome::Applied);
        assert_eq!(editor.registry().get("b.txt").unwrap().content(), "saved");
        assert!(!editor.is_dirty("b.txt"));
        assert_eq!(editor.registry().dirty_paths().count(), 0);
        assert_eq!(
            editor.confirm_mut().asked,
            vec![Prompt::Rename {
                path: "a.txt".into(),
                new_path: "b.txt".into(),
                unsaved: true,
                overwrite: false,
            }]
        );
    }

    #[tokio::test]
    async fn rename_onto_existing_asks_to_overwrite() {
        let mut editor = loaded(&[("a.txt", "A"), ("b.txt", "B")], Scripted::answering(&[false, true])).await;

        assert_eq!(editor.rename("a.txt", "b.txt").await.unwrap(), Outcome::Declined);
        assert_eq!(editor.registry().len(), 2);

        assert_eq!(editor.rename("a.txt", "b.txt").await.unwrap(), Outcome::Applied);
        assert_eq!(editor.registry().len(), 1);
        assert_eq!(editor.registry().get("b.txt").unwrap().content(), "A");
        assert_eq!(editor.remote().content("b.txt").as_deref(), Some("A"));
    }

    #[tokio::test]
    async fn rename_rejects_bad_names_before_any_call() {
        let mut editor = loaded(&[("a.txt", "A")], AlwaysConfirm).await;
        assert!(matches!(
            editor.rename("a.txt", "../b.txt").await,
            Err(WorkspaceError::InvalidName { .. })
        ));
        assert_eq!(editor.remote().calls(), vec!["load"]);
    }

    #[tokio::test]
    async fn failed_rename_delete_is_compensated() {
        let mut editor = loaded(&[("a.txt", "A")], AlwaysConfirm).await;
        editor.remote().fail_operation("delete");

        let err = editor.rename("a.txt", "b.txt").await.unwrap_err();
        assert!(err.is_remote());
        assert!(editor.registry().contains("a.txt"));
        assert!(!editor.registry().contains("b.txt"));
        // The compensating delete also failed, so the copy stays remotely.
        assert_eq!(
            editor.remote().calls(),
            vec!["load", "create b.txt", "delete a.txt", "delete b.txt"]
        );
    }

    #[tokio::test]
    async fn failed_rename_restores_replaced_target() {
        let mut editor = loaded(&[("a.txt", "A"), ("b.txt", "B")], AlwaysConfirm).await;
        editor.remote().fail_operation("delete");

        assert!(editor.rename("a.txt", "b.txt").await.is_err());
        assert_eq!(editor.remote().content("b.txt").as_deref(), Some("B"));
        assert_eq!(editor.registry().get("b.txt").unwrap().content(), "B");
    }

    #[tokio::test]
    async fn refresh_keeps_drafts_and_drops_vanished_tabs() {
        let mut editor = loaded(&[("a.txt", "A"), ("b.txt", "B")], AlwaysConfirm).await;
        editor.create_folder("empty").unwrap();
        editor.open("b.txt").unwrap();
        editor.open("a.txt").unwrap();
        editor.edit("draft");

        // Another client removes b.txt and adds c.txt.
        editor.remote().delete("b.txt").await.unwrap();
        editor.remote().create("c.txt", "C").await.unwrap();

        assert_eq!(editor.refresh().await.unwrap(), 2);
        assert_eq!(editor.registry().paths().collect::<Vec<_>>(), vec!["a.txt", "c.txt"]);
        assert_eq!(editor.session().open_files(), ["a.txt"]);
        assert_eq!(editor.editor_text(), Some("draft"));
        assert!(editor.is_dirty("a.txt"));
        assert_eq!(editor.registry().folders().collect::<Vec<_>>(), vec!["empty"]);
    }

    #[tokio::test]
    async fn refresh_keeps_unsaved_file_removed_remotely() {
        let mut editor = loaded(&[("main.py", "print(1)")], Scripted::default()).await;
        editor.open("main.py").unwrap();
        editor.edit("precious unsaved work");

        editor.remote().delete("main.py").await.unwrap();
        editor.refresh().await.unwrap();

        assert!(editor.is_dirty("main.py"));
        assert_eq!(editor.state_of("main.py"), FileState::Dirty);
        assert_eq!(editor.session().open_files(), ["main.py"]);
        assert_eq!(editor.editor_text(), Some("precious unsaved work"));
        assert!(editor.confirm_mut().asked.is_empty());

        // Saving writes the file back.
        assert_eq!(editor.save().await.unwrap(), Outcome::Applied);
        assert_eq!(
            editor.remote().content("main.py").as_deref(),
            Some("precious unsaved work")
        );
        assert!(!editor.is_dirty("main.py"));
    }

    #[tokio::test]
    async fn refresh_drops_clean_file_removed_remotely() {
        let mut editor = loaded(&[("a.txt", "A"), ("b.txt", "B")], AlwaysConfirm).await;
        editor.open("a.txt").unwrap();
        editor.remote().delete("a.txt").await.unwrap();

        assert_eq!(editor.refresh().await.unwrap(), 1);
        assert!(!editor.registry().contains("a.txt"));
        assert!(editor.session().open_files().is_empty());
        assert_eq!(editor.editor_text(), None);
    }

    #[tokio::test]
    async fn failed_refresh_changes_nothing() {
        let mut editor = loaded(&[("a.txt", "A")], AlwaysConfirm).await;
        editor.open("a.txt").unwrap();
        editor.edit("draft");
        editor.take_view_changes();
        let before = editor.snapshot();

        editor.remote().fail_operation("list");
        assert!(matches!(
            editor.refresh().await,
            Err(WorkspaceError::Remote { operation: "list", .. })
        ));
        assert_eq!(editor.snapshot(), before);
        assert!(!editor.take_view_changes().any());
    }

    #[tokio::test]
    async fn operations_accept_leading_dot_slash() {
        let mut editor = loaded(&[("a.txt", "A"), ("src/b.py", "B")], AlwaysConfirm).await;

        editor.open("./a.txt").unwrap();
        assert_eq!(editor.active_file(), Some("a.txt"));
        editor.edit("A2");
        assert_eq!(editor.save_path("./a.txt").await.unwrap(), Outcome::Applied);
        assert_eq!(editor.remote().content("a.txt").as_deref(), Some("A2"));
        assert_eq!(editor.close("./a.txt").await.unwrap(), Outcome::Applied);
        assert!(editor.session().open_files().is_empty());

        assert_eq!(editor.rename("./src/b.py", "c.py").await.unwrap(), Outcome::Applied);
        assert!(editor.registry().contains("src/c.py"));

        assert_eq!(editor.delete("./a.txt").await.unwrap(), Outcome::Applied);
        assert!(!editor.registry().contains("a.txt"));

        let err = editor.open("../a.txt").unwrap_err();
        assert!(matches!(err, WorkspaceError::NotFound { ref path } if path == "../a.txt"));
    }

    #[tokio::test]
    async fn view_changes_are_taken_once() {
        let mut editor = loaded(&[("a.txt", "")], AlwaysConfirm).await;
        editor.take_view_changes();
        let revision = editor.revision();

        editor.open("a.txt").unwrap();
        let changes = editor.take_view_changes();
        assert!(changes.tree && changes.tabs && changes.editor);
        assert!(!editor.take_view_changes().any());
        assert!(editor.revision() > revision);

        editor.create_folder("docs").unwrap();
        let changes = editor.take_view_changes();
        assert!(changes.tree);
        assert!(!changes.tabs);
    }

    #[tokio::test]
    async fn render_tree_marks_dirty() {
        let mut editor = loaded(&[("src/main.py", "")], AlwaysConfirm).await;
        editor.open("src/main.py").unwrap();
        editor.edit("x");
        assert!(editor.render_tree().contains("main.py ●"));
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Snapshots
// ─────────────────────────────────────────────────────────────────────────────

mod snapshot {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use nexa_workspace::snapshot::{spawn_autosave, SNAPSHOT_KEY};
    use nexa_workspace::{FileSlot, MemorySlot, SnapshotSlot, SnapshotStore};
    use serde_json::json;
    use tempfile::TempDir;

    async fn busy_editor() -> EditorSession<MemoryRemote, AlwaysConfirm> {
        let mut editor = loaded(&[("src/main.py", "print(1)"), ("README.md", "# hi"), ("b.txt", "B")], AlwaysConfirm).await;
        editor.create_folder("assets").unwrap();
        editor.open("README.md").unwrap();
        editor.open("src/main.py").unwrap();
        editor.edit("print(2)");
        editor.open("b.txt").unwrap();
        editor
    }

    #[tokio::test]
    async fn restore_of_snapshot_round_trips() {
        let editor = busy_editor().await;
        let snapshot = editor.snapshot();

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: Snapshot = serde_json::from_str(&json).unwrap();

        let mut restored = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        assert!(restored.restore(parsed).is_empty());
        assert_eq!(restored.snapshot(), snapshot);
        assert_eq!(restored.active_file(), Some("b.txt"));
        assert_eq!(restored.editor_text(), Some("B"));
        assert!(restored.is_dirty("src/main.py"));
        assert_eq!(restored.text_of("src/main.py"), Some("print(2)"));
    }

    #[tokio::test]
    async fn restore_drops_dangling_references() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "files": {
                "a.txt": { "path": "a.txt", "content": "A", "lastModified": "2024-01-01T00:00:00Z" }
            },
            "openFiles": ["a.txt", "ghost.txt"],
            "activeFile": "ghost.txt",
            "drafts": { "ghost.txt": "boo" },
        }))
        .unwrap();

        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        let dropped = editor.restore(snapshot);
        assert!(!dropped.is_empty());
        assert!(dropped.iter().all(|p| p == "ghost.txt"));
        assert_eq!(editor.session().open_files(), ["a.txt"]);
        assert_eq!(editor.active_file(), None);
        assert_eq!(editor.registry().dirty_paths().count(), 0);
    }

    #[tokio::test]
    async fn snapshot_without_optional_fields_loads() {
        let snapshot: Snapshot = serde_json::from_value(json!({
            "files": {
                "main.py": {
                    "path": "main.py",
                    "name": "main.py",
                    "content": "x = 1",
                    "language": "python",
                    "lastModified": "2024-01-01T00:00:00Z"
                }
            },
            "openFiles": ["main.py"],
            "activeFile": "main.py"
        }))
        .unwrap();

        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        editor.restore(snapshot);
        assert_eq!(editor.editor_text(), Some("x = 1"));
        assert_eq!(editor.registry().get("main.py").unwrap().language(), "python");
    }

    #[tokio::test]
    async fn snapshot_with_invalid_path_is_unparsable() {
        let result: Result<Snapshot, _> = serde_json::from_value(json!({
            "files": { "x": { "path": "../x", "content": "" } }
        }));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn file_slot_save_restore_clear() {
        let dir = TempDir::new().unwrap();
        let store = SnapshotStore::new(FileSlot::in_dir(dir.path()));
        assert!(store.restore().await.is_none());

        let snapshot = busy_editor().await.snapshot();
        store.save(&snapshot).await.unwrap();
        assert!(dir.path().join(format!("{SNAPSHOT_KEY}.json")).exists());
        assert_eq!(store.restore().await, Some(snapshot));

        store.clear().await.unwrap();
        assert!(store.restore().await.is_none());
        // Clearing an empty slot is fine.
        store.clear().await.unwrap();
    }

    #[tokio::test]
    async fn unparsable_slot_means_no_snapshot() {
        let dir = TempDir::new().unwrap();
        let slot = FileSlot::in_dir(dir.path());
        slot.write("{ not json").await.unwrap();
        let store = SnapshotStore::new(slot);
        assert!(store.restore().await.is_none());
    }

    #[tokio::test]
    async fn autosave_writes_on_interval() {
        let store = Arc::new(SnapshotStore::new(MemorySlot::new()));
        let handle = spawn_autosave(store.clone(), Duration::from_millis(20), || async {
            Snapshot {
                open_files: vec!["a.txt".into()],
                ..Default::default()
            }
        });

        tokio::time::sleep(Duration::from_millis(120)).await;
        handle.abort();

        let restored = store.restore().await.unwrap();
        assert_eq!(restored.open_files, vec!["a.txt"]);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Terminal
// ─────────────────────────────────────────────────────────────────────────────

mod terminal {
    use super::*;
    use nexa_workspace::{Command, Flow, Terminal};

    async fn run(
        terminal: &mut Terminal,
        editor: &mut EditorSession<MemoryRemote, AlwaysConfirm>,
        line: &str,
    ) -> Vec<String> {
        let mark = terminal.mark();
        terminal.execute(editor, line).await;
        terminal.since(mark).map(str::to_string).collect()
    }

    #[test]
    fn parse_commands() {
        assert_eq!(Command::parse("   ").unwrap(), None);
        assert_eq!(Command::parse("ls").unwrap(), Some(Command::Ls));
        assert_eq!(
            Command::parse("touch a.txt hello world").unwrap(),
            Some(Command::Touch {
                path: "a.txt".into(),
                content: Some("hello world".into())
            })
        );
        assert_eq!(
            Command::parse("touch a.py").unwrap(),
            Some(Command::Touch {
                path: "a.py".into(),
                content: None
            })
        );
        assert_eq!(Command::parse("write a\\nb").unwrap(), Some(Command::Write("a\nb".into())));
        assert_eq!(Command::parse("close").unwrap(), Some(Command::Close(None)));
        assert_eq!(Command::parse("mv a.txt").unwrap_err(), "usage: mv <path> <new-name>");
        assert_eq!(Command::parse("open").unwrap_err(), "usage: open <path>");
        assert_eq!(Command::parse("rmrf /").unwrap_err(), "command not found: rmrf");
    }

    #[tokio::test]
    async fn create_write_save_cat() {
        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        let mut term = Terminal::new();

        let out = run(&mut term, &mut editor, "touch src/app.py print(1)").await;
        assert_eq!(out, vec!["$ touch src/app.py print(1)", "Created src/app.py"]);

        run(&mut term, &mut editor, "write line one\\nline two").await;
        let out = run(&mut term, &mut editor, "append line three").await;
        assert_eq!(out.len(), 1);
        assert!(editor.is_dirty("src/app.py"));

        let out = run(&mut term, &mut editor, "save").await;
        assert_eq!(out[1], "Saved src/app.py");
        assert_eq!(
            editor.remote().content("src/app.py").as_deref(),
            Some("line one\nline two\nline three\n")
        );

        let out = run(&mut term, &mut editor, "cat").await;
        assert_eq!(out[1..], ["line one", "line two", "line three"]);
    }

    #[tokio::test]
    async fn errors_become_lines() {
        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        let mut term = Terminal::new();

        let out = run(&mut term, &mut editor, "open missing.txt").await;
        assert_eq!(out[1], "error: File not found: missing.txt");

        let out = run(&mut term, &mut editor, "save").await;
        assert_eq!(out[1], "error: no file is open");

        let out = run(&mut term, &mut editor, "frobnicate").await;
        assert_eq!(out[1], "command not found: frobnicate");

        run(&mut term, &mut editor, "touch a.txt x").await;
        run(&mut term, &mut editor, "write y").await;
        editor.remote().fail_operation("update");
        let out = run(&mut term, &mut editor, "save").await;
        assert!(out[1].starts_with("error: Remote update failed for a.txt"));
    }

    #[tokio::test]
    async fn listing_status_and_tree() {
        let mut editor = loaded(&[("src/main.py", ""), ("README.md", "")], AlwaysConfirm).await;
        let mut term = Terminal::new();
        run(&mut term, &mut editor, "open src/main.py").await;
        run(&mut term, &mut editor, "write x").await;

        let out = run(&mut term, &mut editor, "ls").await;
        assert_eq!(out[1..], ["README.md", "src/main.py ●"]);

        let out = run(&mut term, &mut editor, "status").await;
        assert_eq!(out[1], "2 files, active: src/main.py");
        assert_eq!(out[2], "* 🐍 src/main.py ●");
        assert_eq!(out[3], "1 unsaved file(s)");

        let out = run(&mut term, &mut editor, "tree").await;
        assert_eq!(out[1..], ["📁 src", "  🐍 main.py ●", "📖 README.md"]);
    }

    #[tokio::test]
    async fn mv_rm_mkdir_reload() {
        let mut editor = loaded(&[("a.txt", "A")], AlwaysConfirm).await;
        let mut term = Terminal::new();

        let out = run(&mut term, &mut editor, "mv a.txt b.txt").await;
        assert_eq!(out[1], "Renamed a.txt to b.txt");
        let out = run(&mut term, &mut editor, "mv b.txt b.txt").await;
        assert_eq!(out[1], "name unchanged");

        let out = run(&mut term, &mut editor, "mkdir docs").await;
        assert_eq!(out[1], "Created folder docs");

        let out = run(&mut term, &mut editor, "rm b.txt").await;
        assert_eq!(out[1], "Deleted b.txt");
        assert!(editor.registry().is_empty());

        editor.remote().create("c.txt", "C").await.unwrap();
        let out = run(&mut term, &mut editor, "reload").await;
        assert_eq!(out[1], "Reloaded 1 files");
    }

    #[tokio::test]
    async fn clear_and_exit() {
        let mut editor = EditorSession::new(MemoryRemote::new(), AlwaysConfirm);
        let mut term = Terminal::new();
        run(&mut term, &mut editor, "help").await;
        assert!(term.len() > 5);

        run(&mut term, &mut editor, "clear").await;
        assert!(term.is_empty());

        assert_eq!(term.execute(&mut editor, "exit").await, Flow::Exit);
        assert_eq!(term.execute(&mut editor, "ls").await, Flow::Continue);
    }

    #[test]
    fn scrollback_is_bounded() {
        let mut term = Terminal::with_limit(3);
        let mark = term.mark();
        term.push("1\n2\n3\n4");
        term.push("5");
        assert_eq!(term.lines().collect::<Vec<_>>(), vec!["3", "4", "5"]);
        // Evicted lines are gone even though they were pushed after the mark.
        assert_eq!(term.since(mark).collect::<Vec<_>>(), vec!["3", "4", "5"]);
    }
}
