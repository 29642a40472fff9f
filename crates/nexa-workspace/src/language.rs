//! Extension lookups: editor language, explorer icon, new-file template.

fn extension(name: &str) -> &str {
    let base = name.rsplit('/').next().unwrap_or(name);
    match base.rsplit_once('.') {
        Some((_, ext)) => ext,
        None => "",
    }
}

/// Language tag for a path; `"text"` for unknown extensions.
pub fn detect_language(path: &str) -> &'static str {
    match extension(path) {
        "py" => "python",
        "js" | "jsx" => "javascript",
        "ts" | "tsx" => "typescript",
        "html" => "html",
        "css" => "css",
        "json" => "json",
        "md" => "markdown",
        _ => "text",
    }
}

/// Explorer and tab icon for a file name.
pub fn file_icon(name: &str) -> &'static str {
    match extension(name) {
        "py" => "🐍",
        "js" => "📜",
        "jsx" | "tsx" => "⚛️",
        "ts" => "📘",
        "java" => "☕",
        "cpp" | "c" => "⚙️",
        "cs" => "🔷",
        "php" => "🐘",
        "rb" => "💎",
        "go" => "🐹",
        "rs" => "🦀",
        "html" => "🌐",
        "css" | "scss" => "🎨",
        "json" => "📋",
        "md" => "📖",
        "png" | "jpg" | "jpeg" => "🖼️",
        _ => "📄",
    }
}

pub const FOLDER_ICON: &str = "📁";

/// Starter content for a file created without explicit content.
pub fn template_for(path: &str) -> String {
    let name = path.rsplit('/').next().unwrap_or(path);
    let stem = name.rsplit_once('.').map(|(s, _)| s).unwrap_or(name);
    match detect_language(path) {
        "python" => "def main():\n    pass\n\n\nif __name__ == \"__main__\":\n    main()\n".to_string(),
        "html" => format!(
            "<!DOCTYPE html>\n<html>\n<head>\n  <title>{stem}</title>\n</head>\n<body>\n</body>\n</html>\n"
        ),
        "markdown" => format!("# {stem}\n"),
        _ => String::new(),
    }
}
