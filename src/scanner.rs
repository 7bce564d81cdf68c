use crate::{
    config::ScanOptions,
    file::relative_path_string,
    ignore_rules::IgnoreRules,
};
use ignore::{DirEntry, WalkBuilder};
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};

static LANGUAGE_EXTENSIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("py", "Python"),
        ("js", "JavaScript"),
        ("ts", "TypeScript"),
        ("java", "Java"),
        ("go", "Go"),
        ("rs", "Rust"),
        ("cpp", "C++"),
        ("c", "C"),
        ("cs", "C#"),
        ("php", "PHP"),
        ("rb", "Ruby"),
        ("sh", "Shell"),
        ("yaml", "YAML"),
        ("yml", "YAML"),
        ("json", "JSON"),
        ("md", "Markdown"),
        ("dockerfile", "Docker"),
        ("sql", "SQL"),
    ]
    .into_iter()
    .collect()
});

/// File names reported as key files wherever they appear in the tree.
pub const KEY_FILES: &[&str] = &[
    "README.md",
    "readme.md",
    "README.txt",
    "package.json",
    "requirements.txt",
    "Cargo.toml",
    "go.mod",
    "pom.xml",
    "build.gradle",
    "composer.json",
    "Dockerfile",
    "docker-compose.yml",
    "docker-compose.yaml",
    ".env.example",
    "config.yml",
    "config.yaml",
    "config.json",
];

/// Returns the language name for a file, if its extension is recognised.
#[must_use]
pub fn detect_language(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    LANGUAGE_EXTENSIONS.get(ext.as_str()).copied()
}

/// One directory of the scanned tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryNode {
    /// Path relative to the root, empty for the root itself
    pub path: String,
    /// Names of kept subdirectories
    pub directories: Vec<String>,
    /// Names of kept files
    pub files: Vec<String>,
}

/// Directory listing in walk order (parents before children, names sorted).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DirectoryTree {
    nodes: Vec<DirectoryNode>,
}

impl DirectoryTree {
    /// All directories in walk order.
    #[must_use]
    pub fn nodes(&self) -> &[DirectoryNode] {
        &self.nodes
    }

    /// Looks up a directory by its relative path.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&DirectoryNode> {
        self.nodes.iter().find(|n| n.path == path)
    }

    /// Total number of files kept in the tree.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.nodes.iter().map(|n| n.files.len()).sum()
    }
}

/// Everything the directory walk produces.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ScanResult {
    /// Directory tree
    pub tree: DirectoryTree,
    /// Language name to number of files
    pub languages: BTreeMap<String, usize>,
    /// Relative paths of key files
    pub key_files: Vec<String>,
    /// Relative paths of every file the walk kept, in walk order
    pub files: Vec<String>,
}

/// Walks a repository once, applying ignore rules to directories and files.
pub(crate) struct Scanner {
    root_dir: PathBuf,
    rules: IgnoreRules,
    respect_gitignore: bool,
}

impl Scanner {
    /// Creates a new scanner.
    pub(crate) fn new(root_dir: &Path, options: &ScanOptions) -> Self {
        Self {
            root_dir: root_dir.to_path_buf(),
            rules: options.ignore_rules(),
            respect_gitignore: options.respect_gitignore,
        }
    }

    /// The compiled ignore rules, shared with the sampler.
    pub(crate) const fn rules(&self) -> &IgnoreRules {
        &self.rules
    }

    /// Scans the root directory. Unreadable entries are logged and skipped.
    pub(crate) fn scan(&self) -> ScanResult {
        debug!("Starting scan of {}", self.root_dir.display());

        let rules = self.rules.clone();
        let walker = WalkBuilder::new(&self.root_dir)
            .standard_filters(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .require_git(false)
            .follow_links(false)
            .sort_by_file_name(|a, b| a.cmp(b))
            .filter_entry(move |entry| keep_entry(entry, &rules))
            .build();

        let mut result = ScanResult::default();
        let mut index: HashMap<String, usize> = HashMap::new();

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!("Walk error: {}", e);
                    continue;
                }
            };

            let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
            let relative = relative_path_string(entry.path(), &self.root_dir);
            let name = entry.file_name().to_string_lossy().into_owned();

            if is_dir {
                index.insert(relative.clone(), result.tree.nodes.len());
                result.tree.nodes.push(DirectoryNode {
                    path: relative.clone(),
                    ..DirectoryNode::default()
                });
                if entry.depth() > 0 {
                    if let Some(parent) = parent_node(&mut result.tree, &index, &relative) {
                        parent.directories.push(name);
                    }
                }
                continue;
            }

            if self.rules.ignores_file(&name) {
                trace!("Ignoring file {}", relative);
                continue;
            }

            if let Some(language) = detect_language(entry.path()) {
                *result.languages.entry(language.to_string()).or_default() += 1;
            }

            if KEY_FILES.contains(&name.as_str()) {
                result.key_files.push(relative.clone());
            }

            if let Some(parent) = parent_node(&mut result.tree, &index, &relative) {
                parent.files.push(name);
            }
            result.files.push(relative);
        }

        debug!(
            "Scan complete: {} directories, {} files, {} languages, {} key files",
            result.tree.nodes.len(),
            result.tree.file_count(),
            result.languages.len(),
            result.key_files.len()
        );

        result
    }
}

fn keep_entry(entry: &DirEntry, rules: &IgnoreRules) -> bool {
    if entry.depth() == 0 {
        return true;
    }
    let is_dir = entry.file_type().is_some_and(|ft| ft.is_dir());
    !is_dir || !rules.ignores_dir(&entry.file_name().to_string_lossy())
}

fn parent_node<'a>(
    tree: &'a mut DirectoryTree,
    index: &HashMap<String, usize>,
    relative: &str,
) -> Option<&'a mut DirectoryNode> {
    let parent = relative.rsplit_once('/').map_or("", |(parent, _)| parent);
    let position = *index.get(parent)?;
    tree.nodes.get_mut(position)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ignore_rules::DirectoryMatch;
    use assert_fs::prelude::*;

    fn scan(root: &Path) -> ScanResult {
        Scanner::new(root, &ScanOptions::default()).scan()
    }

    #[test]
    fn test_scanner_builds_tree() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("README.md").write_str("# demo").unwrap();
        temp.child("src/main.rs").write_str("fn main() {}").unwrap();
        temp.child("src/util/mod.rs").write_str("").unwrap();

        let result = scan(temp.path());
        let tree = &result.tree;

        let paths: Vec<_> = tree.nodes().iter().map(|n| n.path.as_str()).collect();
        assert_eq!(paths, vec!["", "src", "src/util"]);
        assert_eq!(tree.get("").unwrap().directories, vec!["src"]);
        assert_eq!(tree.get("").unwrap().files, vec!["README.md"]);
        assert_eq!(tree.get("src").unwrap().directories, vec!["util"]);
        assert_eq!(tree.get("src").unwrap().files, vec!["main.rs"]);
        assert_eq!(tree.file_count(), 3);
    }

    #[test]
    fn test_literal_patterns_exclude_dirs_and_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("node_modules/left-pad/index.js").write_str("x").unwrap();
        temp.child(".DS_Store").write_str("x").unwrap();
        temp.child("index.js").write_str("x").unwrap();

        let result = scan(temp.path());

        assert!(result.tree.get("node_modules").is_none());
        assert!(result.tree.get("").unwrap().directories.is_empty());
        assert_eq!(result.tree.get("").unwrap().files, vec!["index.js"]);
        assert_eq!(result.languages.get("JavaScript"), Some(&1));
    }

    #[test]
    fn test_extension_patterns_exclude_everywhere() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("app.py").write_str("x").unwrap();
        temp.child("app.pyc").write_str("x").unwrap();
        temp.child("config.json.log").write_str("x").unwrap();

        let options = ScanOptions {
            extra_ignores: vec!["*.md".to_string()],
            ..ScanOptions::default()
        };
        temp.child("README.md").write_str("# hi").unwrap();
        let result = Scanner::new(temp.path(), &options).scan();

        assert_eq!(result.tree.get("").unwrap().files, vec!["app.py"]);
        assert_eq!(result.languages.len(), 1);
        assert!(result.key_files.is_empty());
    }

    #[test]
    fn test_language_counts_sum_to_recognised_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("a.py").write_str("").unwrap();
        temp.child("b.PY").write_str("").unwrap();
        temp.child("lib/c.ts").write_str("").unwrap();
        temp.child("lib/d.yml").write_str("").unwrap();
        temp.child("lib/e.yaml").write_str("").unwrap();
        temp.child("notes.txt").write_str("").unwrap();
        temp.child("Makefile").write_str("").unwrap();
        temp.child("build/out.js").write_str("").unwrap();

        let result = scan(temp.path());

        assert_eq!(result.languages.get("Python"), Some(&2));
        assert_eq!(result.languages.get("TypeScript"), Some(&1));
        assert_eq!(result.languages.get("YAML"), Some(&2));
        assert_eq!(result.languages.values().sum::<usize>(), 5);
    }

    #[test]
    fn test_key_files_found_in_subdirectories() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("package.json").write_str("{}").unwrap();
        temp.child("services/api/Dockerfile").write_str("FROM alpine").unwrap();
        temp.child("dist/package.json").write_str("{}").unwrap();

        let result = scan(temp.path());

        assert_eq!(result.key_files, vec!["package.json", "services/api/Dockerfile"]);
    }

    #[test]
    fn test_exact_directory_match_keeps_github() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".github/workflows/ci.yml").write_str("on: push").unwrap();

        let result = scan(temp.path());
        assert!(result.tree.get(".github/workflows").is_some());
    }

    #[test]
    fn test_prefix_directory_match_prunes_github() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".github/workflows/ci.yml").write_str("on: push").unwrap();
        temp.child("src/lib.rs").write_str("").unwrap();

        let options = ScanOptions {
            directory_match: DirectoryMatch::Prefix,
            ..ScanOptions::default()
        };
        let result = Scanner::new(temp.path(), &options).scan();

        assert!(result.tree.get(".github").is_none());
        assert_eq!(result.tree.get("").unwrap().directories, vec!["src"]);
        assert_eq!(result.languages.get("YAML"), None);
    }

    #[test]
    fn test_root_named_like_pattern_is_scanned() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("build/main.go").write_str("package main").unwrap();

        let result = scan(&temp.path().join("build"));
        assert_eq!(result.tree.get("").unwrap().files, vec!["main.go"]);
    }

    #[test]
    fn test_gitignore_respected_when_enabled() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("generated/\n").unwrap();
        temp.child("generated/schema.sql").write_str("").unwrap();
        temp.child("main.go").write_str("").unwrap();

        let without = scan(temp.path());
        assert!(without.tree.get("generated").is_some());

        let options = ScanOptions {
            respect_gitignore: true,
            ..ScanOptions::default()
        };
        let with = Scanner::new(temp.path(), &options).scan();
        assert!(with.tree.get("generated").is_none());
        assert_eq!(with.languages.get("SQL"), None);
    }

    #[test]
    fn test_empty_directory() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = scan(temp.path());

        assert_eq!(result.tree.nodes().len(), 1);
        assert!(result.languages.is_empty());
        assert!(result.key_files.is_empty());
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language(Path::new("x.rs")), Some("Rust"));
        assert_eq!(detect_language(Path::new("X.CPP")), Some("C++"));
        assert_eq!(detect_language(Path::new("Dockerfile")), None);
        assert_eq!(detect_language(Path::new("app.dockerfile")), Some("Docker"));
        assert_eq!(detect_language(Path::new(".bashrc")), None);
    }
}
