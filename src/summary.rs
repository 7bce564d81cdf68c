use crate::{
    config::Config,
    manifest::Dependencies,
    sample::{FileSample, Sampler},
    scanner::{DirectoryTree, ScanResult, Scanner},
    vcs::GitInfo,
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{info, instrument};

/// Everything known about a repository, gathered once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RepositorySummary {
    tree: DirectoryTree,
    languages: BTreeMap<String, usize>,
    key_files: Vec<String>,
    dependencies: Dependencies,
    git: Option<GitInfo>,
    samples: Vec<FileSample>,
}

impl RepositorySummary {
    /// Analyzes the repository described by `config`.
    ///
    /// None of the stages fail: unreadable files, broken manifests and
    /// missing git metadata all degrade to empty values.
    #[instrument(skip(config), fields(root_dir = %config.root_dir.display()))]
    #[must_use]
    pub fn analyze(config: &Config) -> Self {
        let root = config.root_dir.as_path();

        let scanner = Scanner::new(root, &config.scan);
        let ScanResult {
            tree,
            languages,
            key_files,
            files,
        } = scanner.scan();

        let samples = Sampler::new(root, scanner.rules(), config.sampling)
            .visible_files(&files)
            .collect();
        let dependencies = Dependencies::collect(root);
        let git = GitInfo::discover(root);

        info!(
            "Analyzed {} files: {} languages, {} key files, {} samples",
            tree.file_count(),
            languages.len(),
            key_files.len(),
            samples.len()
        );

        Self {
            tree,
            languages,
            key_files,
            dependencies,
            git,
            samples,
        }
    }

    /// Assembles a summary from parts already gathered.
    #[must_use]
    pub fn from_parts(
        scan: ScanResult,
        dependencies: Dependencies,
        git: Option<GitInfo>,
        samples: Vec<FileSample>,
    ) -> Self {
        Self {
            tree: scan.tree,
            languages: scan.languages,
            key_files: scan.key_files,
            dependencies,
            git,
            samples,
        }
    }

    /// Directory tree.
    #[must_use]
    pub const fn tree(&self) -> &DirectoryTree {
        &self.tree
    }

    /// Language name to file count.
    #[must_use]
    pub const fn languages(&self) -> &BTreeMap<String, usize> {
        &self.languages
    }

    /// Relative paths of key files.
    #[must_use]
    pub fn key_files(&self) -> &[String] {
        &self.key_files
    }

    /// Parsed dependency manifests.
    #[must_use]
    pub const fn dependencies(&self) -> &Dependencies {
        &self.dependencies
    }

    /// Git metadata, if the root is a usable repository.
    #[must_use]
    pub const fn git(&self) -> Option<&GitInfo> {
        self.git.as_ref()
    }

    /// Sampled file contents in collection order.
    #[must_use]
    pub fn samples(&self) -> &[FileSample] {
        &self.samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_analyze_fixture_repository() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("package.json")
            .write_str(r#"{"dependencies": {"express": "^4.18.2", "cors": "^2.8.5"}}"#)
            .unwrap();
        temp.child("src/server.js").write_str("const express = require('express');").unwrap();
        temp.child("node_modules/express/index.js").write_str("module.exports = {}").unwrap();

        let config = Config::builder().root_dir(temp.path()).build().unwrap();
        let summary = RepositorySummary::analyze(&config);

        assert_eq!(summary.languages().get("JavaScript"), Some(&1));
        assert_eq!(summary.languages().get("JSON"), Some(&1));
        assert_eq!(summary.key_files(), ["package.json"]);
        assert_eq!(summary.dependencies().node.as_ref().unwrap().dependencies.len(), 2);
        assert!(summary.git().is_none());

        let sampled: Vec<_> = summary.samples().iter().map(|s| s.path.as_str()).collect();
        assert_eq!(sampled, vec!["package.json", "src/server.js"]);
    }

    #[test]
    fn test_excluded_paths_never_appear() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("src/vendor/lib.rs").write_str("").unwrap();
        temp.child("src/main.rs").write_str("fn main() {}").unwrap();
        temp.child("src/trace.log").write_str("").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .exclude(vec!["vendor".to_string()])
            .build()
            .unwrap();
        let summary = RepositorySummary::analyze(&config);

        let json = serde_json::to_string(&summary).unwrap();
        assert!(!json.contains("vendor"));
        assert!(!json.contains("trace.log"));
        assert!(json.contains("main.rs"));
    }

    #[test]
    fn test_gitignored_paths_are_not_sampled() {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child(".gitignore").write_str("src/generated/\nmain.py\n").unwrap();
        temp.child("main.py").write_str("print('hidden')").unwrap();
        temp.child("src/generated/secret.rs").write_str("const KEY: &str = \"x\";").unwrap();
        temp.child("src/lib.rs").write_str("pub fn lib() {}").unwrap();

        let config = Config::builder()
            .root_dir(temp.path())
            .respect_gitignore(true)
            .build()
            .unwrap();
        let summary = RepositorySummary::analyze(&config);

        assert_eq!(summary.tree().get("").unwrap().files, vec![".gitignore"]);
        assert_eq!(summary.tree().get("src").unwrap().files, vec!["lib.rs"]);

        let sampled: Vec<_> = summary.samples().iter().map(|s| s.path.as_str()).collect();
        assert_eq!(sampled, vec!["src/lib.rs"]);
    }
}
