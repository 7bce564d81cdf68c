use crate::error::{Error, Result};
use crate::ignore_rules::{DirectoryMatch, IgnoreRules};
use crate::sample::SampleLimit;
use std::path::PathBuf;
use std::time::Duration;

/// Ollama host used when neither an argument nor `OLLAMA_HOST` is given.
pub const DEFAULT_OLLAMA_HOST: &str = "http://localhost:11434";
/// Model used when neither an argument nor `OLLAMA_MODEL` is given.
pub const DEFAULT_MODEL: &str = "llama3.2:3b";
/// Environment variable consulted for the host.
pub const HOST_ENV: &str = "OLLAMA_HOST";
/// Environment variable consulted for the model.
pub const MODEL_ENV: &str = "OLLAMA_MODEL";

const DEFAULT_TIMEOUT_SECS: u64 = 300;
const DEFAULT_OUTPUT: &str = "README.md";
const DEFAULT_TREE_LINE_LIMIT: usize = 100;
const DEFAULT_MAX_SAMPLES: usize = 10;

/// Connection settings for the Ollama service.
///
/// Resolved once at startup and handed to every component that talks to the
/// service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OllamaSettings {
    /// Base URL, without a trailing slash
    pub host: String,

    /// Model identifier used for generation
    pub model: String,

    /// Timeout for the generation request
    pub timeout: Duration,
}

impl Default for OllamaSettings {
    fn default() -> Self {
        Self {
            host: DEFAULT_OLLAMA_HOST.to_string(),
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl OllamaSettings {
    /// Resolves host and model from explicit values, then the process
    /// environment, then built-in defaults.
    #[must_use]
    pub fn resolve(host: Option<String>, model: Option<String>) -> Self {
        Self::resolve_with(host, model, |key| std::env::var(key).ok())
    }

    /// Same as [`OllamaSettings::resolve`] with an injectable environment.
    #[must_use]
    pub fn resolve_with(
        host: Option<String>,
        model: Option<String>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let non_empty = |v: String| if v.trim().is_empty() { None } else { Some(v) };

        let host = host
            .and_then(non_empty)
            .or_else(|| lookup(HOST_ENV).and_then(non_empty))
            .unwrap_or_else(|| DEFAULT_OLLAMA_HOST.to_string());
        let model = model
            .and_then(non_empty)
            .or_else(|| lookup(MODEL_ENV).and_then(non_empty))
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

        Self {
            host: host.trim_end_matches('/').to_string(),
            model,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Sets the generation timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Full URL for an API path such as `/api/generate`.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.host, path)
    }

    /// Validates the settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the host is not an http(s) URL, the model is
    /// empty, or the timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if !(self.host.starts_with("http://") || self.host.starts_with("https://")) {
            return Err(Error::config(format!(
                "Ollama host must be an http(s) URL, got '{}'",
                self.host
            )));
        }

        if self.model.trim().is_empty() {
            return Err(Error::config("model must not be empty"));
        }

        if self.timeout.is_zero() {
            return Err(Error::config("timeout must be greater than 0"));
        }

        Ok(())
    }
}

/// Options controlling the directory walk.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Patterns added to the default ignore list
    pub extra_ignores: Vec<String>,

    /// How directory names are matched against patterns
    pub directory_match: DirectoryMatch,

    /// Also honour `.gitignore` files found in the tree
    pub respect_gitignore: bool,
}

impl ScanOptions {
    /// Compiles the effective ignore rules.
    #[must_use]
    pub fn ignore_rules(&self) -> IgnoreRules {
        IgnoreRules::new(
            crate::ignore_rules::DEFAULT_IGNORE_PATTERNS.iter().copied(),
            self.directory_match,
        )
        .with_patterns(&self.extra_ignores)
    }
}

/// Size caps applied when sampling file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingConfig {
    /// Cap for root-level entry-point files
    pub entry: SampleLimit,

    /// Cap for files found under source and test directories
    pub module: SampleLimit,

    /// Maximum number of samples across both passes
    pub max_samples: usize,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            entry: SampleLimit::new(100, 5_000),
            module: SampleLimit::new(80, 4_000),
            max_samples: DEFAULT_MAX_SAMPLES,
        }
    }
}

/// Configuration for a documentation run.
///
/// Use [`Config::builder()`] to construct a new configuration.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct Config {
    /// Repository to analyze
    pub root_dir: PathBuf,

    /// Output file, relative to `root_dir` unless absolute
    pub output: PathBuf,

    /// Ollama connection settings
    pub ollama: OllamaSettings,

    /// Directory walk options
    pub scan: ScanOptions,

    /// Sampling caps
    pub sampling: SamplingConfig,

    /// Number of directory-tree lines included in prompts
    pub tree_line_limit: usize,

    /// Dry run mode (render the prompt, skip generation and writes)
    pub dry_run: bool,
}

impl Config {
    /// Creates a new configuration builder.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use documenthor::Config;
    ///
    /// let config = Config::builder()
    ///     .root_dir("./my-project")
    ///     .model("codellama:7b")
    ///     .build()
    ///     .expect("valid configuration");
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Root directory doesn't exist or is not a directory
    /// - Ollama settings are invalid
    /// - Any sampling or tree limit is zero
    pub fn validate(&self) -> Result<()> {
        if !self.root_dir.exists() {
            return Err(Error::config(format!(
                "Repository path does not exist: {}",
                self.root_dir.display()
            )));
        }

        if !self.root_dir.is_dir() {
            return Err(Error::config(format!(
                "Repository path is not a directory: {}",
                self.root_dir.display()
            )));
        }

        self.ollama.validate()?;

        if self.sampling.max_samples == 0 {
            return Err(Error::config("max_samples must be greater than 0"));
        }

        for (name, limit) in [("entry", self.sampling.entry), ("module", self.sampling.module)] {
            if limit.max_lines == 0 || limit.max_chars == 0 {
                return Err(Error::config(format!(
                    "{name} sample limit must allow at least one line and one character"
                )));
            }
        }

        if self.tree_line_limit == 0 {
            return Err(Error::config("tree_line_limit must be greater than 0"));
        }

        Ok(())
    }

    /// Path the generated document is written to.
    #[must_use]
    pub fn output_path(&self) -> PathBuf {
        self.root_dir.join(&self.output)
    }

    /// Path of the README read in update mode.
    #[must_use]
    pub fn existing_readme_path(&self) -> PathBuf {
        self.root_dir.join(DEFAULT_OUTPUT)
    }
}

/// Builder for creating a [`Config`].
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    root_dir: Option<PathBuf>,
    output: Option<PathBuf>,
    ollama: Option<OllamaSettings>,
    model: Option<String>,
    timeout: Option<Duration>,
    scan: ScanOptions,
    sampling: Option<SamplingConfig>,
    tree_line_limit: Option<usize>,
    dry_run: bool,
}

impl ConfigBuilder {
    /// Sets the repository root to analyze.
    #[must_use]
    pub fn root_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.root_dir = Some(path.into());
        self
    }

    /// Sets the output file path.
    #[must_use]
    pub fn output(mut self, path: impl Into<PathBuf>) -> Self {
        self.output = Some(path.into());
        self
    }

    /// Sets fully resolved Ollama settings.
    #[must_use]
    pub fn ollama(mut self, settings: OllamaSettings) -> Self {
        self.ollama = Some(settings);
        self
    }

    /// Overrides the model of the Ollama settings.
    #[must_use]
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Overrides the generation timeout.
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Adds extra ignore patterns.
    #[must_use]
    pub fn exclude(mut self, patterns: Vec<String>) -> Self {
        self.scan.extra_ignores.extend(patterns);
        self
    }

    /// Selects how directory names are matched.
    #[must_use]
    pub fn directory_match(mut self, mode: DirectoryMatch) -> Self {
        self.scan.directory_match = mode;
        self
    }

    /// Enables or disables `.gitignore` support.
    #[must_use]
    pub fn respect_gitignore(mut self, enabled: bool) -> Self {
        self.scan.respect_gitignore = enabled;
        self
    }

    /// Sets the sampling caps.
    #[must_use]
    pub fn sampling(mut self, sampling: SamplingConfig) -> Self {
        self.sampling = Some(sampling);
        self
    }

    /// Sets the number of tree lines included in prompts.
    #[must_use]
    pub fn tree_line_limit(mut self, lines: usize) -> Self {
        self.tree_line_limit = Some(lines);
        self
    }

    /// Enables dry run mode.
    #[must_use]
    pub fn dry_run(mut self, enabled: bool) -> Self {
        self.dry_run = enabled;
        self
    }

    /// Builds the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if validation fails.
    pub fn build(self) -> Result<Config> {
        let mut ollama = self.ollama.unwrap_or_default();
        if let Some(model) = self.model {
            ollama.model = model;
        }
        if let Some(timeout) = self.timeout {
            ollama.timeout = timeout;
        }

        let config = Config {
            root_dir: self.root_dir.unwrap_or_else(|| PathBuf::from(".")),
            output: self.output.unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT)),
            ollama,
            scan: self.scan,
            sampling: self.sampling.unwrap_or_default(),
            tree_line_limit: self.tree_line_limit.unwrap_or(DEFAULT_TREE_LINE_LIMIT),
            dry_run: self.dry_run,
        };

        config.validate()?;
        Ok(config)
    }
}
