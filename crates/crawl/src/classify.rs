//! File eligibility and language detection.
//!
//! Both functions only look at the path; they never touch the source.

use std::path::Path;

/// Directories that are never descended into, wherever they appear.
pub const IGNORED_DIRS: [&str; 4] = [".git", ".idea", ".vscode", "__pycache__"];

/// Files (matched on base name) that are never ingested.
pub const IGNORED_FILES: [&str; 5] = [".gitignore", ".gitattributes", "package-lock.json", "uv.lock", "Cargo.lock"];

pub const CODE_EXTENSIONS: [&str; 17] = [
    "py", "rs", "c", "h", "cpp", "hpp", "cxx", "cc", "js", "ts", "cs", "php", "r", "vue", "html", "css", "sh",
];

pub const DOC_EXTENSIONS: [&str; 8] = ["md", "txt", "yaml", "yml", "json", "toml", "conf", "cfg"];

/// Whether a directory with this base name should be skipped entirely.
pub fn is_ignored_dir(name: &str) -> bool {
    IGNORED_DIRS.contains(&name)
}

/// Lowercase extension of the final path segment, without the leading dot.
///
/// Dotfiles such as `.bashrc` have no extension.
fn extension(path: &str) -> Option<String> {
    let name = path.rsplit('/').next()?;
    Path::new(name).extension().and_then(|ext| ext.to_str()).map(str::to_lowercase)
}

/// Decide whether the file at `path` (relative, `/`-separated) is ingested.
///
/// Rejects anything inside an ignored directory and any ignored file name,
/// then accepts only known code and documentation extensions.
///
/// # Examples
///
/// ```
/// use trawl_crawl::should_process;
///
/// assert!(should_process("src/main.rs"));
/// assert!(!should_process("node_modules/.git/config"));
/// assert!(!should_process("Cargo.lock"));
/// assert!(!should_process("LICENSE"));
/// ```
pub fn should_process(path: &str) -> bool {
    if path.split('/').any(is_ignored_dir) {
        return false;
    }
    let name = path.rsplit('/').next().unwrap_or_default();
    if IGNORED_FILES.contains(&name) {
        return false;
    }
    extension(path).is_some_and(|ext| CODE_EXTENSIONS.contains(&ext.as_str()) || DOC_EXTENSIONS.contains(&ext.as_str()))
}

/// Human-readable language name for a file, from its extension.
pub fn language_for(path: &str) -> Option<&'static str> {
    let language = match extension(path)?.as_str() {
        "py" => "Python",
        "rs" => "Rust",
        "c" | "h" => "C",
        "cpp" | "hpp" | "cxx" | "cc" => "C++",
        "js" => "JavaScript",
        "ts" => "TypeScript",
        "cs" => "C#",
        "php" => "PHP",
        "r" => "R",
        "vue" => "Vue",
        "html" => "HTML",
        "css" => "CSS",
        "sh" => "Shell",
        "md" => "Markdown",
        "txt" => "Text",
        "yaml" | "yml" => "YAML",
        "json" => "JSON",
        "toml" => "TOML",
        "conf" | "cfg" => "Config",
        _ => return None,
    };
    Some(language)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("main.py")]
    #[case("src/lib.rs")]
    #[case("include/util.h")]
    #[case("web/App.vue")]
    #[case("analysis/model.R")]
    #[case("README.MD")]
    #[case("docs/guide.md")]
    #[case("config/settings.yml")]
    #[case("pyproject.toml")]
    #[case("deep/ly/nested/path/to/notes.txt")]
    fn test_should_process_accepts(#[case] path: &str) {
        assert!(should_process(path));
    }

    #[rstest]
    #[case(".git/config.json")]
    #[case("src/.git/hooks/run.sh")]
    #[case(".idea/workspace.json")]
    #[case(".vscode/settings.json")]
    #[case("pkg/__pycache__/mod.py")]
    #[case(".gitignore")]
    #[case("sub/.gitattributes")]
    #[case("package-lock.json")]
    #[case("frontend/package-lock.json")]
    #[case("uv.lock")]
    #[case("Cargo.lock")]
    fn test_should_process_rejects_ignored(#[case] path: &str) {
        assert!(!should_process(path));
    }

    #[rstest]
    #[case("LICENSE")]
    #[case("Makefile")]
    #[case("image.png")]
    #[case("archive.tar.gz")]
    #[case("notebook.ipynb")]
    #[case(".bashrc")]
    #[case("trailing.")]
    #[case("")]
    #[case("/")]
    #[case("a//b")]
    fn test_should_process_rejects_unknown(#[case] path: &str) {
        assert!(!should_process(path));
    }

    #[test]
    fn test_ignored_dir_must_be_whole_segment() {
        assert!(should_process("my.git/readme.md"));
        assert!(should_process("not__pycache__/a.py"));
    }

    #[rstest]
    #[case("src/a.py", Some("Python"))]
    #[case("lib.RS", Some("Rust"))]
    #[case("x.hpp", Some("C++"))]
    #[case("README.md", Some("Markdown"))]
    #[case("ci.yaml", Some("YAML"))]
    #[case("setup.cfg", Some("Config"))]
    #[case("logo.svg", None)]
    #[case("Dockerfile", None)]
    fn test_language_for(#[case] path: &str, #[case] expected: Option<&str>) {
        assert_eq!(language_for(path), expected);
    }

    #[test]
    fn test_every_accepted_extension_has_a_language() {
        for ext in CODE_EXTENSIONS.iter().chain(DOC_EXTENSIONS.iter()) {
            assert!(language_for(&format!("file.{ext}")).is_some(), "no language for .{ext}");
        }
    }
}
