//! Housekeeping tasks for a documenthor checkout.
//!
//! Every path is resolved against a root directory so the tasks can run
//! against any working tree.

use crate::error::{Error, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Training files superseded by newer formats.
pub const OBSOLETE_TRAINING_FILES: &[&str] = &[
    "training/examples.json",
    "training/simple_examples.json",
    "training/test_modelfile",
];

/// Files and directories copied by [`Maintenance::backup_config`].
pub const CONFIG_PATHS: &[&str] = &["Cargo.toml", "Makefile", ".env.example", "k8s"];

/// Where configuration backups are stored.
pub const BACKUP_DIR: &str = "backups/config";

/// Training file rewritten by [`Maintenance::optimize_training`].
pub const DETAILED_TRAINING_FILE: &str = "training/examples_detailed.json";

/// Patterns removed by [`Maintenance::clean_cache`].
pub const CACHE_PATTERNS: &[&str] = &[
    "**/__pycache__",
    "**/*.pyc",
    "**/*.pyo",
    "**/*.tmp",
    "**/README.md.backup",
    ".pytest_cache",
];

const MAX_CONTENT_CHARS: usize = 8000;
const MAX_CONTENT_LINES: usize = 150;
const TRUNCATION_MARKER: &str = "\n... (truncated)";

/// A file or directory copied into the backup directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    /// Path relative to the root
    pub source: String,
    /// Absolute destination path
    pub destination: PathBuf,
}

/// Outcome of [`Maintenance::optimize_training`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptimizeReport {
    /// Number of examples in the file
    pub examples: usize,
    /// Number of file contents that were cut
    pub truncated: usize,
    /// Copy of the original file
    pub backup: PathBuf,
}

/// Maintenance tasks bound to one root directory.
#[derive(Debug, Clone)]
pub struct Maintenance {
    root: PathBuf,
}

impl Maintenance {
    /// Creates maintenance tasks for `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Removes [`OBSOLETE_TRAINING_FILES`] that exist.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be removed.
    pub fn clean_training(&self) -> Result<Vec<String>> {
        let mut removed = Vec::new();

        for relative in OBSOLETE_TRAINING_FILES {
            let path = self.root.join(relative);
            if !path.exists() {
                continue;
            }
            fs::remove_file(&path).map_err(|e| Error::io(&path, e))?;
            info!("Removed {}", relative);
            removed.push((*relative).to_string());
        }

        Ok(removed)
    }

    /// Copies [`CONFIG_PATHS`] into [`BACKUP_DIR`] with a local timestamp.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be created or a copy
    /// fails.
    pub fn backup_config(&self) -> Result<Vec<BackupEntry>> {
        let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S").to_string();
        self.backup_config_at(&timestamp)
    }

    /// Same as [`Maintenance::backup_config`] with an explicit timestamp
    /// suffix.
    ///
    /// # Errors
    ///
    /// Returns an error if the backup directory cannot be created or a copy
    /// fails.
    pub fn backup_config_at(&self, timestamp: &str) -> Result<Vec<BackupEntry>> {
        let backup_dir = self.root.join(BACKUP_DIR);
        fs::create_dir_all(&backup_dir).map_err(|e| Error::io(&backup_dir, e))?;

        let mut entries = Vec::new();
        for relative in CONFIG_PATHS {
            let source = self.root.join(relative);
            if !source.exists() {
                continue;
            }

            let destination = backup_dir.join(format!("{relative}_{timestamp}"));
            if source.is_dir() {
                copy_dir(&source, &destination)?;
            } else {
                fs::copy(&source, &destination).map_err(|e| Error::io(&destination, e))?;
            }

            info!("Backed up {}", relative);
            entries.push(BackupEntry {
                source: (*relative).to_string(),
                destination,
            });
        }

        Ok(entries)
    }

    /// Cuts oversized file contents in [`DETAILED_TRAINING_FILE`].
    ///
    /// A `repository_structure` value longer than 8000 characters and 150
    /// lines keeps its first 150 lines. The original is kept next to the
    /// file with a `.backup` suffix. Returns `None` when the file is absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not a JSON array, or
    /// cannot be written back.
    pub fn optimize_training(&self) -> Result<Option<OptimizeReport>> {
        let path = self.root.join(DETAILED_TRAINING_FILE);
        if !path.is_file() {
            warn!("Training file not found: {}", path.display());
            return Ok(None);
        }

        let content = fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
        let mut data: Value = serde_json::from_str(&content)?;
        let Some(examples) = data.as_array_mut() else {
            return Err(Error::Serialization {
                message: format!("{} must contain a JSON array", path.display()),
            });
        };

        let mut truncated = 0;
        for example in examples.iter_mut() {
            let Some(structure) = example
                .get_mut("repository_structure")
                .and_then(Value::as_object_mut)
            else {
                continue;
            };

            for (name, value) in structure.iter_mut() {
                let Some(text) = value.as_str() else {
                    continue;
                };
                if let Some(cut) = truncate_content(text) {
                    debug!("Truncated {}", name);
                    *value = Value::String(cut);
                    truncated += 1;
                }
            }
        }
        let count = examples.len();

        let mut backup = path.clone().into_os_string();
        backup.push(".backup");
        let backup = PathBuf::from(backup);
        fs::copy(&path, &backup).map_err(|e| Error::io(&backup, e))?;

        let optimized = serde_json::to_string_pretty(&data)?;
        fs::write(&path, optimized).map_err(|e| Error::io(&path, e))?;

        info!("Optimized {} examples, truncated {} files", count, truncated);
        Ok(Some(OptimizeReport {
            examples: count,
            truncated,
            backup,
        }))
    }

    /// Removes caches and temporary files matching [`CACHE_PATTERNS`].
    ///
    /// Matching directories are removed whole. With `dry_run` nothing is
    /// deleted. Returns the matched paths relative to the root.
    ///
    /// # Errors
    ///
    /// Returns an error if a matched path cannot be removed.
    pub fn clean_cache(&self, dry_run: bool) -> Result<Vec<PathBuf>> {
        let patterns = build_globset(CACHE_PATTERNS)?;
        let mut matched = Vec::new();

        let mut walker = WalkDir::new(&self.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let Ok(relative) = entry.path().strip_prefix(&self.root) else {
                continue;
            };
            if !patterns.is_match(relative) {
                continue;
            }

            let is_dir = entry.file_type().is_dir();
            if is_dir {
                walker.skip_current_dir();
            }

            if dry_run {
                info!("Would remove {}", relative.display());
            } else {
                remove_path(entry.path(), is_dir)?;
                info!("Removed {}", relative.display());
            }
            matched.push(relative.to_path_buf());
        }

        Ok(matched)
    }
}

fn truncate_content(text: &str) -> Option<String> {
    if text.chars().count() <= MAX_CONTENT_CHARS {
        return None;
    }

    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() <= MAX_CONTENT_LINES {
        return None;
    }

    Some(format!(
        "{}{}",
        lines[..MAX_CONTENT_LINES].join("\n"),
        TRUNCATION_MARKER
    ))
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let glob = Glob::new(pattern)
            .map_err(|e| Error::config(format!("Invalid glob pattern '{pattern}': {e}")))?;
        builder.add(glob);
    }

    builder
        .build()
        .map_err(|e| Error::config(format!("Failed to build glob set: {e}")))
}

fn remove_path(path: &Path, is_dir: bool) -> Result<()> {
    let result = if is_dir {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    result.map_err(|e| Error::io(path, e))
}

fn copy_dir(source: &Path, destination: &Path) -> Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.map_err(|e| Error::Io {
            path: source.to_path_buf(),
            message: e.to_string(),
        })?;

        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        } else {
            fs::copy(entry.path(), &target).map_err(|e| Error::io(&target, e))?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use predicates::prelude::*;

    #[test]
    fn test_clean_training_removes_obsolete_files() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("training/examples.json").write_str("[]").unwrap();
        temp.child("training/test_modelfile").write_str("FROM x").unwrap();
        temp.child("training/examples_detailed.json").write_str("[]").unwrap();

        let removed = Maintenance::new(temp.path()).clean_training().unwrap();

        assert_eq!(removed, vec!["training/examples.json", "training/test_modelfile"]);
        temp.child("training/examples.json").assert(predicate::path::missing());
        temp.child("training/examples_detailed.json").assert(predicate::path::exists());
    }

    #[test]
    fn test_clean_training_nothing_to_do() {
        let temp = assert_fs::TempDir::new().unwrap();

        let removed = Maintenance::new(temp.path()).clean_training().unwrap();

        assert!(removed.is_empty());
    }

    #[test]
    fn test_backup_config_copies_files_and_dirs() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("Cargo.toml").write_str("[package]").unwrap();
        temp.child("k8s/deploy.yaml").write_str("kind: Deployment").unwrap();
        temp.child("k8s/base/svc.yaml").write_str("kind: Service").unwrap();

        let entries = Maintenance::new(temp.path())
            .backup_config_at("20240102_030405")
            .unwrap();

        let sources: Vec<_> = entries.iter().map(|e| e.source.as_str()).collect();
        assert_eq!(sources, vec!["Cargo.toml", "k8s"]);

        let backups = temp.child("backups/config");
        backups.child("Cargo.toml_20240102_030405").assert("[package]");
        backups
            .child("k8s_20240102_030405/deploy.yaml")
            .assert("kind: Deployment");
        backups
            .child("k8s_20240102_030405/base/svc.yaml")
            .assert("kind: Service");
        backups
            .child("Makefile_20240102_030405")
            .assert(predicate::path::missing());
    }

    #[test]
    fn test_optimize_training_truncates_long_content() {
        let temp = assert_fs::TempDir::new().unwrap();
        let long_lines: Vec<String> = (0..200).map(|i| format!("{i:0>60}")).collect();
        let long = long_lines.join("\n");
        let wide = "x".repeat(9000);

        let data = serde_json::json!([
            {
                "repository_name": "big",
                "repository_structure": {"main.py": long, "one_line.txt": wide, "small.py": "pass"},
                "expected_readme": "# Big"
            },
            {"input": "q", "output": "a"}
        ]);
        temp.child(DETAILED_TRAINING_FILE)
            .write_str(&data.to_string())
            .unwrap();

        let report = Maintenance::new(temp.path())
            .optimize_training()
            .unwrap()
            .unwrap();

        assert_eq!(report.examples, 2);
        assert_eq!(report.truncated, 1);
        assert!(report.backup.ends_with("examples_detailed.json.backup"));
        temp.child("training/examples_detailed.json.backup")
            .assert(data.to_string());

        let written: Value =
            serde_json::from_str(&fs::read_to_string(temp.child(DETAILED_TRAINING_FILE).path()).unwrap())
                .unwrap();
        let structure = &written[0]["repository_structure"];
        let main = structure["main.py"].as_str().unwrap();
        assert!(main.ends_with("\n... (truncated)"));
        assert_eq!(main.lines().count(), 151);
        assert_eq!(structure["one_line.txt"].as_str().unwrap().len(), 9000);
        assert_eq!(structure["small.py"], "pass");
        assert_eq!(written[1]["output"], "a");
    }

    #[test]
    fn test_optimize_training_missing_file() {
        let temp = assert_fs::TempDir::new().unwrap();

        assert_eq!(Maintenance::new(temp.path()).optimize_training().unwrap(), None);
    }

    #[test]
    fn test_optimize_training_rejects_non_array() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(DETAILED_TRAINING_FILE).write_str(r#"{"a": 1}"#).unwrap();

        let err = Maintenance::new(temp.path()).optimize_training().unwrap_err();

        assert!(err.to_string().contains("JSON array"));
    }

    fn cache_fixture() -> assert_fs::TempDir {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("__pycache__/mod.cpython-312.pyc").write_str("").unwrap();
        temp.child("pkg/__pycache__/a.pyc").write_str("").unwrap();
        temp.child("pkg/b.pyo").write_str("").unwrap();
        temp.child("pkg/keep.py").write_str("").unwrap();
        temp.child("scratch.tmp").write_str("").unwrap();
        temp.child("docs/README.md.backup").write_str("").unwrap();
        temp.child(".pytest_cache/v/cache").write_str("").unwrap();
        temp.child("nested/.pytest_cache/x").write_str("").unwrap();
        temp
    }

    #[test]
    fn test_clean_cache_dry_run_keeps_files() {
        let temp = cache_fixture();

        let matched = Maintenance::new(temp.path()).clean_cache(true).unwrap();

        assert_eq!(
            matched,
            vec![
                PathBuf::from(".pytest_cache"),
                PathBuf::from("__pycache__"),
                PathBuf::from("docs/README.md.backup"),
                PathBuf::from("pkg/__pycache__"),
                PathBuf::from("pkg/b.pyo"),
                PathBuf::from("scratch.tmp"),
            ]
        );
        temp.child("pkg/b.pyo").assert(predicate::path::exists());
        temp.child("__pycache__").assert(predicate::path::exists());
    }

    #[test]
    fn test_clean_cache_removes_matches() {
        let temp = cache_fixture();

        let matched = Maintenance::new(temp.path()).clean_cache(false).unwrap();

        assert_eq!(matched.len(), 6);
        temp.child("pkg/__pycache__").assert(predicate::path::missing());
        temp.child(".pytest_cache").assert(predicate::path::missing());
        temp.child("scratch.tmp").assert(predicate::path::missing());
        temp.child("pkg/keep.py").assert(predicate::path::exists());
        temp.child("nested/.pytest_cache/x").assert(predicate::path::exists());
    }
}
