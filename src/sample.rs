//! Bounded content samples from well-known files.
//!
//! Two passes feed one list: root-level entry points and manifests first,
//! then source and test directories. A global cap stops both passes.

use crate::config::SamplingConfig;
use crate::error::Result;
use crate::file::{read_text, relative_path_string};
use crate::ignore_rules::IgnoreRules;
use serde::Serialize;
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, trace};
use walkdir::WalkDir;

/// Root-level files sampled first, in this order.
pub const ENTRY_FILES: &[&str] = &[
    "main.py",
    "app.py",
    "index.js",
    "server.js",
    "main.go",
    "main.rs",
    "package.json",
    "requirements.txt",
    "go.mod",
    "Cargo.toml",
    "Dockerfile",
    "docker-compose.yml",
    ".env.example",
    "config.py",
    "config.js",
    "config.go",
];

/// Entry files that are included without truncation.
pub const MANIFEST_FILES: &[&str] = &[
    "package.json",
    "requirements.txt",
    "go.mod",
    "Cargo.toml",
    ".env.example",
];

/// Conventional source and test directories searched recursively.
pub const SOURCE_DIRS: &[&str] = &[
    "src", "lib", "internal", "pkg", "test", "spec", "__test__", "tests",
];

/// Extensions sampled from [`SOURCE_DIRS`].
pub const SOURCE_EXTENSIONS: &[&str] = &["py", "js", "ts", "go", "rs", "java"];

/// Line and character cap for one sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SampleLimit {
    /// Maximum number of lines kept
    pub max_lines: usize,
    /// Maximum number of characters kept, applied after the line cap
    pub max_chars: usize,
}

impl SampleLimit {
    /// Creates a new limit.
    #[must_use]
    pub const fn new(max_lines: usize, max_chars: usize) -> Self {
        Self {
            max_lines,
            max_chars,
        }
    }

    /// Cuts `content` to the first `max_lines` lines, then to the first
    /// `max_chars` characters. Returns the kept text and whether anything
    /// was removed.
    #[must_use]
    pub fn apply<'a>(&self, content: &'a str) -> (&'a str, bool) {
        let by_lines = if self.max_lines == 0 {
            ""
        } else {
            match memchr::memchr_iter(b'\n', content.as_bytes()).nth(self.max_lines - 1) {
                Some(end) => &content[..end],
                None => content,
            }
        };

        let kept = match by_lines.char_indices().nth(self.max_chars) {
            Some((end, _)) => &by_lines[..end],
            None => by_lines,
        };

        (kept, kept.len() < content.len())
    }
}

/// A sampled file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileSample {
    /// Path relative to the repository root, `/`-separated
    pub path: String,
    /// Possibly truncated content
    pub content: String,
    /// Whether the content was cut
    pub truncated: bool,
}

impl FileSample {
    fn read(path: &Path, root: &Path, limit: Option<SampleLimit>) -> Result<Self> {
        let content = read_text(path)?;
        let (content, truncated) = match limit {
            Some(limit) => {
                let (kept, truncated) = limit.apply(&content);
                (kept.to_string(), truncated)
            }
            None => (content, false),
        };

        Ok(Self {
            path: relative_path_string(path, root),
            content,
            truncated,
        })
    }
}

/// Collects samples according to a [`SamplingConfig`].
pub(crate) struct Sampler<'a> {
    root: &'a Path,
    rules: &'a IgnoreRules,
    config: SamplingConfig,
    visible: Option<HashSet<&'a str>>,
}

impl<'a> Sampler<'a> {
    pub(crate) const fn new(root: &'a Path, rules: &'a IgnoreRules, config: SamplingConfig) -> Self {
        Self {
            root,
            rules,
            config,
            visible: None,
        }
    }

    /// Only samples files whose relative path is in `files`.
    #[must_use]
    pub(crate) fn visible_files(mut self, files: &'a [String]) -> Self {
        self.visible = Some(files.iter().map(String::as_str).collect());
        self
    }

    fn is_visible(&self, relative: &str) -> bool {
        match &self.visible {
            Some(files) => files.contains(relative),
            None => true,
        }
    }

    /// Runs both passes. Unreadable files are skipped.
    pub(crate) fn collect(&self) -> Vec<FileSample> {
        let mut samples = Vec::new();

        self.collect_entry_files(&mut samples);
        if samples.len() < self.config.max_samples {
            self.collect_source_files(&mut samples);
        }

        debug!("Collected {} file samples", samples.len());
        samples
    }

    fn collect_entry_files(&self, samples: &mut Vec<FileSample>) {
        for name in ENTRY_FILES {
            if samples.len() >= self.config.max_samples {
                return;
            }

            let path = self.root.join(name);
            if !path.is_file() || self.rules.ignores_file(name) || !self.is_visible(name) {
                continue;
            }

            let limit = if MANIFEST_FILES.contains(name) {
                None
            } else {
                Some(self.config.entry)
            };

            match FileSample::read(&path, self.root, limit) {
                Ok(sample) => samples.push(sample),
                Err(e) => debug!("Skipping sample {}: {}", path.display(), e),
            }
        }
    }

    fn collect_source_files(&self, samples: &mut Vec<FileSample>) {
        for dir in SOURCE_DIRS {
            if self.rules.ignores_dir(dir) {
                continue;
            }

            let dir_path = self.root.join(dir);
            if !dir_path.is_dir() {
                continue;
            }

            let rules = self.rules;
            let walker = WalkDir::new(&dir_path)
                .sort_by_file_name()
                .into_iter()
                .filter_entry(|e| {
                    e.depth() == 0
                        || !e.file_type().is_dir()
                        || !rules.ignores_dir(&e.file_name().to_string_lossy())
                });

            for entry in walker.filter_map(std::result::Result::ok) {
                if !entry.file_type().is_file() {
                    continue;
                }

                let name = entry.file_name().to_string_lossy();
                if self.rules.ignores_file(&name) || !has_source_extension(entry.path()) {
                    continue;
                }

                if !self.is_visible(&relative_path_string(entry.path(), self.root)) {
                    trace!("Not in scan, skipping {}", entry.path().display());
                    continue;
                }

                trace!("Sampling {}", entry.path().display());
                match FileSample::read(entry.path(), self.root, Some(self.config.module)) {
                    Ok(sample) => samples.push(sample),
                    Err(e) => {
                        debug!("Skipping sample {}: {}", entry.path().display(), e);
                        continue;
                    }
                }

                if samples.len() >= self.config.max_samples {
                    return;
                }
            }
        }
    }
}

fn has_source_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext.as_str()))
}
