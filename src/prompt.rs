//! Renders a [`RepositorySummary`] into the prompt sent to the model.

use crate::{
    error::{Error, Result},
    manifest::Dependencies,
    sample::FileSample,
    scanner::DirectoryTree,
    summary::RepositorySummary,
    vcs::GitInfo,
};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tera::{Context, Tera, Value};

/// System instruction sent alongside every documentation prompt.
pub const SYSTEM_PROMPT: &str = "You are a technical documentation expert. Generate clear, \
comprehensive README files for software projects.
Focus on:
- Clear project description and purpose
- Installation instructions
- Usage examples with code snippets
- API documentation if applicable
- Contributing guidelines
- License information

Use proper Markdown formatting and be concise but thorough.";

/// README sections requested in generate mode, as (heading, detail).
pub const REQUIRED_SECTIONS: &[(&str, &str)] = &[
    (
        "Project Title & Description",
        "Clear, compelling description of what this project does",
    ),
    ("Features", "Bullet points of key capabilities"),
    ("Prerequisites", "System requirements, dependencies"),
    ("Installation", "Step-by-step setup instructions"),
    ("Usage", "Code examples and usage patterns"),
    (
        "API Documentation",
        "If applicable, document endpoints/functions",
    ),
    ("Configuration", "Environment variables, config files"),
    ("Testing", "How to run tests"),
    ("Development", "Setup for contributors"),
    ("Deployment", "Production deployment instructions"),
    ("License", "License information"),
];

/// Tasks listed in update mode.
pub const UPDATE_TASKS: &[&str] = &[
    "Update outdated information",
    "Add documentation for new features/files",
    "Update installation instructions if dependencies changed",
    "Ensure all sections are current and accurate",
    "Maintain the existing structure and tone",
];

const GENERATE_TEMPLATE: &str = "generate";
const UPDATE_TEMPLATE: &str = "update";

/// Which prompt to build.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMode<'a> {
    /// Write a README from scratch.
    Generate,
    /// Refresh an existing README.
    Update {
        /// Current README text, embedded verbatim
        existing_readme: &'a str,
    },
}

#[derive(Serialize)]
struct Section {
    title: &'static str,
    detail: &'static str,
}

#[derive(Serialize)]
struct PromptContext<'a> {
    languages: String,
    languages_inline: String,
    structure: String,
    tree_line_limit: usize,
    dependencies: String,
    dependencies_inline: String,
    key_files: String,
    key_files_inline: String,
    samples: String,
    git: String,
    sections: Vec<Section>,
    tasks: &'static [&'static str],
    existing_readme: &'a str,
}

/// Tera-backed prompt renderer.
pub struct PromptFormatter {
    tera: Tera,
    tree_line_limit: usize,
}

impl PromptFormatter {
    /// Creates a formatter that keeps at most `tree_line_limit` tree lines.
    ///
    /// # Errors
    ///
    /// Returns an error if a built-in template fails to parse.
    pub fn new(tree_line_limit: usize) -> Result<Self> {
        let mut tera = Tera::default();

        tera.add_raw_template(GENERATE_TEMPLATE, include_str!("../templates/generate.tera"))
            .map_err(|e| Error::template(GENERATE_TEMPLATE, e))?;
        tera.add_raw_template(UPDATE_TEMPLATE, include_str!("../templates/update.tera"))
            .map_err(|e| Error::template(UPDATE_TEMPLATE, e))?;

        tera.register_filter("truncate_lines", Self::truncate_lines_filter);

        Ok(Self {
            tera,
            tree_line_limit,
        })
    }

    /// Renders the prompt for `summary`.
    ///
    /// # Errors
    ///
    /// Returns an error if template rendering fails.
    pub fn render(&self, summary: &RepositorySummary, mode: PromptMode<'_>) -> Result<String> {
        let (template, existing_readme) = match mode {
            PromptMode::Generate => (GENERATE_TEMPLATE, ""),
            PromptMode::Update { existing_readme } => (UPDATE_TEMPLATE, existing_readme),
        };

        let context = PromptContext {
            languages: format_languages(summary.languages()),
            languages_inline: inline_languages(summary.languages()),
            structure: format_structure(summary.tree()),
            tree_line_limit: self.tree_line_limit,
            dependencies: format_dependencies(summary.dependencies()),
            dependencies_inline: inline_dependencies(summary.dependencies()),
            key_files: format_key_files(summary.key_files()),
            key_files_inline: inline_list(summary.key_files()),
            samples: format_samples(summary.samples()),
            git: format_git(summary.git()),
            sections: REQUIRED_SECTIONS
                .iter()
                .map(|&(title, detail)| Section { title, detail })
                .collect(),
            tasks: UPDATE_TASKS,
            existing_readme,
        };

        let mut tera_context = Context::new();
        tera_context.insert("ctx", &context);

        self.tera
            .render(template, &tera_context)
            .map_err(|e| Error::template(template, e))
    }

    /// Keeps the first `max` lines.
    fn truncate_lines_filter(value: &Value, args: &HashMap<String, Value>) -> tera::Result<Value> {
        let max_lines = args
            .get("max")
            .and_then(Value::as_u64)
            .map_or(100, |v| usize::try_from(v).unwrap_or(usize::MAX));

        let Some(s) = value.as_str() else {
            return Ok(value.clone());
        };

        let lines: Vec<&str> = s.lines().collect();
        if lines.len() <= max_lines {
            return Ok(value.clone());
        }

        Ok(Value::String(lines[..max_lines].join("\n")))
    }
}

/// Renders a summary with the given mode and tree limit.
///
/// # Errors
///
/// Returns an error if template setup or rendering fails.
pub fn format_prompt(
    summary: &RepositorySummary,
    mode: PromptMode<'_>,
    tree_line_limit: usize,
) -> Result<String> {
    PromptFormatter::new(tree_line_limit)?.render(summary, mode)
}

fn format_languages(languages: &BTreeMap<String, usize>) -> String {
    if languages.is_empty() {
        return "No programming languages detected.".to_string();
    }

    let total: usize = languages.values().sum();
    let mut sorted: Vec<_> = languages.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1));

    sorted
        .into_iter()
        .map(|(language, &count)| {
            let percentage = count as f64 / total as f64 * 100.0;
            format!("- {language}: {count} files ({percentage:.1}%)")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn inline_languages(languages: &BTreeMap<String, usize>) -> String {
    if languages.is_empty() {
        return "none detected".to_string();
    }

    let mut sorted: Vec<_> = languages.iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(a.1));
    sorted
        .into_iter()
        .map(|(language, count)| format!("{language} ({count})"))
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_structure(tree: &DirectoryTree) -> String {
    let mut lines = Vec::new();
    for node in tree.nodes() {
        if !node.path.is_empty() {
            lines.push(format!("{}/", node.path));
        }
        lines.extend(node.directories.iter().map(|d| format!("  {d}/")));
        lines.extend(node.files.iter().map(|f| format!("  {f}")));
    }
    lines.join("\n")
}

fn format_dependencies(dependencies: &Dependencies) -> String {
    if dependencies.is_empty() {
        return "No dependencies detected.".to_string();
    }

    let mut lines = Vec::new();

    if let Some(python) = &dependencies.python {
        lines.push("Python Dependencies:".to_string());
        lines.extend(python.iter().map(|dep| format!("  - {dep}")));
    }

    if let Some(node) = &dependencies.node {
        if !lines.is_empty() {
            lines.push(String::new());
        }
        lines.push("Node Dependencies:".to_string());
        for (label, deps) in [
            ("dependencies", &node.dependencies),
            ("devDependencies", &node.dev_dependencies),
        ] {
            if deps.is_empty() {
                continue;
            }
            lines.push(format!("  {label}:"));
            lines.extend(deps.iter().map(|(name, version)| format!("    - {name}: {version}")));
        }
    }

    lines.join("\n")
}

fn inline_dependencies(dependencies: &Dependencies) -> String {
    let mut parts = Vec::new();

    if let Some(python) = &dependencies.python {
        parts.push(format!("python: {}", inline_list(python)));
    }
    if let Some(node) = &dependencies.node {
        let names: Vec<String> = node
            .dependencies
            .keys()
            .chain(node.dev_dependencies.keys())
            .cloned()
            .collect();
        parts.push(format!("node: {}", inline_list(&names)));
    }

    if parts.is_empty() {
        "none detected".to_string()
    } else {
        parts.join("; ")
    }
}

fn format_key_files(key_files: &[String]) -> String {
    if key_files.is_empty() {
        return "No key files detected.".to_string();
    }
    key_files
        .iter()
        .map(|f| format!("- {f}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn inline_list(items: &[String]) -> String {
    if items.is_empty() {
        "none".to_string()
    } else {
        items.join(", ")
    }
}

fn format_samples(samples: &[FileSample]) -> String {
    if samples.is_empty() {
        return "No code samples available.".to_string();
    }

    samples
        .iter()
        .map(|sample| format!("--- {} ---\n{}\n", sample.path, sample.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn format_git(git: Option<&GitInfo>) -> String {
    let Some(git) = git else {
        return "No git information available.".to_string();
    };

    let mut lines = Vec::new();
    if !git.remote_url.is_empty() {
        lines.push(format!("Repository URL: {}", git.remote_url));
    }
    if !git.branch.is_empty() {
        lines.push(format!("Current Branch: {}", git.branch));
    }
    lines.push(format!(
        "Latest Commit: {} - {}",
        git.short_hash(),
        git.last_commit.message
    ));
    lines.join("\n")
}
