//! Dependency manifests found at the repository root.
//!
//! Only `requirements.txt` and `package.json` are understood. Each reader
//! returns `Ok(None)` when the file is absent and an error when it is
//! present but unusable; [`Dependencies::collect`] turns errors into a
//! missing entry.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// `dependencies` and `devDependencies` of a `package.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeDependencies {
    /// Runtime dependencies, name to version spec
    pub dependencies: BTreeMap<String, String>,

    /// Development dependencies, name to version spec
    #[serde(rename = "devDependencies")]
    pub dev_dependencies: BTreeMap<String, String>,
}

/// Dependencies per ecosystem. An ecosystem is `None` when its manifest is
/// absent or could not be parsed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Dependencies {
    /// Entries from `requirements.txt`, in file order
    pub python: Option<Vec<String>>,

    /// Entries from `package.json`
    pub node: Option<NodeDependencies>,
}

impl Dependencies {
    /// Reads every supported manifest under `root`, degrading to a missing
    /// entry on error.
    #[must_use]
    pub fn collect(root: &Path) -> Self {
        let python = read_requirements(root).unwrap_or_else(|e| {
            warn!("Ignoring requirements.txt: {}", e);
            None
        });
        let node = read_package_json(root).unwrap_or_else(|e| {
            warn!("Ignoring package.json: {}", e);
            None
        });

        debug!(
            "Dependencies: python={}, node={}",
            python.is_some(),
            node.is_some()
        );

        Self { python, node }
    }

    /// Returns true if no ecosystem was detected.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.python.is_none() && self.node.is_none()
    }
}

/// Parses `requirements.txt`: every non-blank line that is not a comment.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read.
pub fn read_requirements(root: &Path) -> Result<Option<Vec<String>>> {
    let path = root.join("requirements.txt");
    if !path.is_file() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    Ok(Some(parse_requirements(&content)))
}

fn parse_requirements(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[derive(Deserialize)]
struct PackageJson {
    #[serde(default)]
    dependencies: BTreeMap<String, serde_json::Value>,
    #[serde(default, rename = "devDependencies")]
    dev_dependencies: BTreeMap<String, serde_json::Value>,
}

/// Parses the dependency sections of `package.json`.
///
/// # Errors
///
/// Returns an error if the file exists but cannot be read or is not valid
/// JSON.
pub fn read_package_json(root: &Path) -> Result<Option<NodeDependencies>> {
    let path = root.join("package.json");
    if !path.is_file() {
        return Ok(None);
    }

    let content = std::fs::read_to_string(&path).map_err(|e| Error::io(&path, e))?;
    let package: PackageJson = serde_json::from_str(&content)?;

    Ok(Some(NodeDependencies {
        dependencies: version_specs(package.dependencies),
        dev_dependencies: version_specs(package.dev_dependencies),
    }))
}

fn version_specs(raw: BTreeMap<String, serde_json::Value>) -> BTreeMap<String, String> {
    raw.into_iter()
        .map(|(name, spec)| {
            let spec = match spec {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            (name, spec)
        })
        .collect()
}
