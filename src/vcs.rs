//! Git metadata for the analyzed repository.

use chrono::{DateTime, FixedOffset};
use git2::Repository;
use serde::Serialize;
use std::path::Path;
use tracing::debug;

/// The commit HEAD points at.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitInfo {
    /// Full hex object id
    pub hash: String,
    /// Commit message without surrounding whitespace
    pub message: String,
    /// Author name
    pub author: String,
    /// Commit time in RFC 3339 with the committer's offset
    pub date: String,
}

/// Remote, branch and last commit of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GitInfo {
    /// URL of the `origin` remote
    pub remote_url: String,
    /// Name of the checked-out branch
    pub branch: String,
    /// HEAD commit
    pub last_commit: CommitInfo,
}

impl GitInfo {
    /// Reads git metadata from the repository at `path`.
    ///
    /// # Errors
    ///
    /// Fails when `path` is not a repository, has no `origin` remote, HEAD
    /// is detached, or the branch has no commits.
    pub fn read(path: &Path) -> Result<Self, git2::Error> {
        let repo = Repository::open(path)?;

        let remote = repo.find_remote("origin")?;
        let remote_url = remote.url().unwrap_or_default().to_string();

        let head = repo.head()?;
        if !head.is_branch() {
            return Err(git2::Error::from_str("HEAD is detached"));
        }
        let branch = head.shorthand().unwrap_or_default().to_string();

        let commit = head.peel_to_commit()?;
        let time = commit.time();

        Ok(Self {
            remote_url,
            branch,
            last_commit: CommitInfo {
                hash: commit.id().to_string(),
                message: commit.message().unwrap_or_default().trim().to_string(),
                author: commit.author().name().unwrap_or_default().to_string(),
                date: format_commit_time(time.seconds(), time.offset_minutes()),
            },
        })
    }

    /// Reads git metadata, returning `None` on any failure.
    #[must_use]
    pub fn discover(path: &Path) -> Option<Self> {
        match Self::read(path) {
            Ok(info) => Some(info),
            Err(e) => {
                debug!("No git information for {}: {}", path.display(), e.message());
                None
            }
        }
    }

    /// First eight characters of the HEAD hash.
    #[must_use]
    pub fn short_hash(&self) -> &str {
        let hash = &self.last_commit.hash;
        hash.get(..8).unwrap_or(hash)
    }
}

fn format_commit_time(seconds: i64, offset_minutes: i32) -> String {
    let offset = FixedOffset::east_opt(offset_minutes * 60);
    let utc = DateTime::from_timestamp(seconds, 0);

    match (utc, offset) {
        (Some(utc), Some(offset)) => utc.with_timezone(&offset).to_rfc3339(),
        (Some(utc), None) => utc.to_rfc3339(),
        _ => seconds.to_string(),
    }
}
