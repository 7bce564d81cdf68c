//! Name-based ignore rules shared by every stage of repository analysis.
//!
//! A pattern is either a literal name (`node_modules`) or an extension
//! wildcard (`*.pyc`). Files are matched by exact name or suffix. Directories
//! follow the same rule unless [`DirectoryMatch::Prefix`] is selected.

use std::path::{Component, Path};

/// Patterns excluded from every analysis unless overridden.
pub const DEFAULT_IGNORE_PATTERNS: &[&str] = &[
    ".git",
    "__pycache__",
    "node_modules",
    ".venv",
    "venv",
    "*.pyc",
    "*.pyo",
    "*.pyd",
    ".DS_Store",
    "*.log",
    "target",
    "build",
    "dist",
    ".idea",
    ".vscode",
];

/// How directory names are compared against ignore patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DirectoryMatch {
    /// Same rule as files: exact name or `*.ext` suffix.
    #[default]
    Exact,
    /// A directory is pruned when its name starts with the pattern stripped
    /// of trailing `*`. `.git` then also prunes `.github`.
    Prefix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Pattern {
    Name(String),
    /// Suffix including the leading dot.
    Extension(String),
}

impl Pattern {
    fn parse(raw: &str) -> Self {
        match raw.strip_prefix('*') {
            Some(suffix) if suffix.starts_with('.') => Self::Extension(suffix.to_string()),
            _ => Self::Name(raw.to_string()),
        }
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            Self::Name(literal) => name == literal,
            Self::Extension(suffix) => name.ends_with(suffix.as_str()),
        }
    }
}

/// Compiled ignore patterns.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    raw: Vec<String>,
    patterns: Vec<Pattern>,
    directory_match: DirectoryMatch,
}

impl Default for IgnoreRules {
    fn default() -> Self {
        Self::new(DEFAULT_IGNORE_PATTERNS.iter().copied(), DirectoryMatch::Exact)
    }
}

impl IgnoreRules {
    /// Builds rules from raw pattern strings.
    pub fn new<I, S>(patterns: I, directory_match: DirectoryMatch) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let raw: Vec<String> = patterns
            .into_iter()
            .map(|p| p.as_ref().trim().to_string())
            .filter(|p| !p.is_empty())
            .collect();
        let patterns = raw.iter().map(|p| Pattern::parse(p)).collect();

        Self {
            raw,
            patterns,
            directory_match,
        }
    }

    /// Returns a copy with additional patterns appended.
    #[must_use]
    pub fn with_patterns<I, S>(self, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw = self.raw;
        raw.extend(extra.into_iter().map(|p| p.as_ref().to_string()));
        Self::new(raw, self.directory_match)
    }

    /// The raw patterns in the order they were given.
    #[must_use]
    pub fn patterns(&self) -> &[String] {
        &self.raw
    }

    /// The directory matching mode.
    #[must_use]
    pub const fn directory_match(&self) -> DirectoryMatch {
        self.directory_match
    }

    /// Returns true if a file with this name is excluded.
    #[must_use]
    pub fn ignores_file(&self, name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(name))
    }

    /// Returns true if a directory with this name must not be traversed.
    #[must_use]
    pub fn ignores_dir(&self, name: &str) -> bool {
        match self.directory_match {
            DirectoryMatch::Exact => self.ignores_file(name),
            DirectoryMatch::Prefix => self
                .raw
                .iter()
                .any(|p| name.starts_with(p.trim_end_matches('*'))),
        }
    }

    /// Returns true if a root-relative file path is excluded, either by its
    /// own name or by any directory it sits under.
    #[must_use]
    pub fn ignores_path(&self, relative: &Path) -> bool {
        let names: Vec<&str> = relative
            .components()
            .filter_map(|c| match c {
                Component::Normal(name) => name.to_str(),
                _ => None,
            })
            .collect();

        let Some((file, dirs)) = names.split_last() else {
            return false;
        };

        dirs.iter().any(|d| self.ignores_dir(d)) || self.ignores_file(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern_matches_exact_name_only() {
        let rules = IgnoreRules::default();
        assert!(rules.ignores_file(".DS_Store"));
        assert!(!rules.ignores_file(".DS_Store.bak"));
        assert!(rules.ignores_dir("node_modules"));
        assert!(!rules.ignores_dir("node_modules_old"));
    }

    #[test]
    fn test_extension_pattern_matches_suffix() {
        let rules = IgnoreRules::default();
        assert!(rules.ignores_file("module.pyc"));
        assert!(rules.ignores_file("server.log"));
        assert!(!rules.ignores_file("module.py"));
        assert!(!rules.ignores_file("logbook.txt"));
    }

    #[test]
    fn test_exact_mode_keeps_similar_directories() {
        let rules = IgnoreRules::default();
        assert!(rules.ignores_dir(".git"));
        assert!(!rules.ignores_dir(".github"));
        assert!(!rules.ignores_dir("targets"));
        assert!(!rules.ignores_dir("buildkite"));
    }

    #[test]
    fn test_prefix_mode_prunes_by_prefix() {
        let rules = IgnoreRules::new(DEFAULT_IGNORE_PATTERNS.iter().copied(), DirectoryMatch::Prefix);
        assert!(rules.ignores_dir(".git"));
        assert!(rules.ignores_dir(".github"));
        assert!(rules.ignores_dir("venv-tools"));
        assert!(!rules.ignores_dir("src"));
        // File matching is unaffected by the directory mode.
        assert!(!rules.ignores_file(".github"));
    }

    #[test]
    fn test_with_patterns_appends() {
        let rules = IgnoreRules::default().with_patterns(["fixtures", "*.snap"]);
        assert!(rules.ignores_dir("fixtures"));
        assert!(rules.ignores_file("output.snap"));
        assert!(rules.ignores_file("debug.log"));
        assert_eq!(rules.patterns().len(), DEFAULT_IGNORE_PATTERNS.len() + 2);
    }

    #[test]
    fn test_ignores_path_checks_ancestors() {
        let rules = IgnoreRules::default();
        assert!(rules.ignores_path(Path::new("node_modules/lib/index.js")));
        assert!(rules.ignores_path(Path::new("src/cache.pyc")));
        assert!(!rules.ignores_path(Path::new("src/lib/index.js")));
        assert!(!rules.ignores_path(Path::new("")));
    }

    #[test]
    fn test_blank_patterns_are_dropped() {
        let rules = IgnoreRules::new(["", "  ", "dist"], DirectoryMatch::Exact);
        assert_eq!(rules.patterns(), ["dist".to_string()]);
    }
}
