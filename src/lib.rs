//! # documenthor
//!
//! Generates and refreshes README files for local repositories with a
//! locally hosted Ollama model.
//!
//! ## Features
//!
//! - Directory scanning with literal and `*.ext` ignore patterns
//! - Language histogram, key files, dependency manifests and git metadata
//! - Bounded code samples from entry points and source directories
//! - Generate and update prompts rendered from Tera templates
//! - Modelfile builder for fine-tuning on example documentation
//!
//! ## Quick Start
//!
//! ```no_run
//! use documenthor::{Config, Mode, OllamaSettings};
//!
//! # fn main() -> anyhow::Result<()> {
//! let config = Config::builder()
//!     .root_dir("./my-project")
//!     .ollama(OllamaSettings::resolve(None, None))
//!     .build()?;
//!
//! documenthor::run(config, Mode::Generate)?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! The library follows a pipeline architecture:
//! 1. **Scanner**: walks the tree and applies ignore rules
//! 2. **Summary**: adds samples, manifests and git metadata
//! 3. **Prompt**: renders the summary for the model
//! 4. **Client**: sends the prompt to Ollama
//! 5. **Writer**: replaces the output file

#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery
)]
#![allow(clippy::module_name_repetitions)]

mod client;
mod config;
mod error;
mod file;
mod ignore_rules;
mod manifest;
mod pipeline;
mod prompt;
mod sample;
mod scanner;
mod summary;
mod vcs;
mod writer;

pub mod finetune;
pub mod maintenance;

pub use client::{
    GenerationOptions, GenerationRequest, ModelInfo, OllamaClient, PullEvent, TextGenerator,
};
pub use config::{
    Config, ConfigBuilder, OllamaSettings, SamplingConfig, ScanOptions, DEFAULT_MODEL,
    DEFAULT_OLLAMA_HOST, HOST_ENV, MODEL_ENV,
};
pub use error::{Error, Result, Severity};
pub use ignore_rules::{DirectoryMatch, IgnoreRules, DEFAULT_IGNORE_PATTERNS};
pub use manifest::{read_package_json, read_requirements, Dependencies, NodeDependencies};
pub use pipeline::{Mode, Pipeline, RunStats};
pub use prompt::{
    format_prompt, PromptFormatter, PromptMode, REQUIRED_SECTIONS, SYSTEM_PROMPT, UPDATE_TASKS,
};
pub use sample::{
    FileSample, SampleLimit, ENTRY_FILES, MANIFEST_FILES, SOURCE_DIRS, SOURCE_EXTENSIONS,
};
pub use scanner::{detect_language, DirectoryNode, DirectoryTree, ScanResult, KEY_FILES};
pub use summary::RepositorySummary;
pub use vcs::{CommitInfo, GitInfo};
pub use writer::write_document;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Runs the documentation pipeline against the configured Ollama host.
///
/// This is the main entry point for the library.
///
/// # Errors
///
/// Returns an error if:
/// - Configuration is invalid
/// - The existing README cannot be read
/// - The Ollama request fails (fatal)
/// - The output file cannot be written
pub fn run(config: Config, mode: Mode) -> Result<RunStats> {
    let client = OllamaClient::new(&config.ollama)?;
    Pipeline::new(config, mode, client)?.run()
}

/// Installs a stderr `tracing` subscriber whose level follows the number of
/// `-v` flags. `RUST_LOG` takes precedence when set.
pub fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("documenthor={level}")));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_writer(std::io::stderr),
        )
        .init();
}
