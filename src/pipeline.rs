use crate::{
    client::TextGenerator,
    config::Config,
    error::{Error, Result},
    prompt::{PromptFormatter, PromptMode, SYSTEM_PROMPT},
    summary::RepositorySummary,
    writer::write_document,
};
use serde::Serialize;
use std::fs;
use std::time::{Duration, Instant};
use tracing::{info, instrument, warn};

/// Whether to write a README from scratch or refresh the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Generate a new README
    Generate,
    /// Update the README at the repository root
    Update,
}

impl Mode {
    /// "generated" or "updated", for user-facing messages.
    #[must_use]
    pub const fn past_tense(self) -> &'static str {
        match self {
            Self::Generate => "generated",
            Self::Update => "updated",
        }
    }
}

/// Statistics collected during a documentation run.
#[derive(Debug, Clone, Serialize)]
pub struct RunStats {
    /// Mode requested on the command line
    pub requested_mode: Mode,

    /// Mode actually used
    pub mode: Mode,

    /// Model used for generation
    pub model: String,

    /// Number of files in the directory tree
    pub files_scanned: usize,

    /// Number of detected languages
    pub languages: usize,

    /// Number of key files found
    pub key_files: usize,

    /// Number of sampled files
    pub samples: usize,

    /// Prompt length in characters
    pub prompt_chars: usize,

    /// Generated document length in characters
    pub output_chars: usize,

    /// Target path of the document
    pub output_path: String,

    /// Whether the document was written
    pub written: bool,

    /// Total execution time
    pub duration: Duration,

    /// Time spent analyzing the repository
    pub analyze_duration: Duration,

    /// Time spent waiting for the model
    pub generate_duration: Duration,
}

impl RunStats {
    /// Prints a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n╔═══════════════════════════════════════════════════════╗");
        println!("║              Documentation Run Summary                ║");
        println!("╠═══════════════════════════════════════════════════════╣");
        println!("║ Files Scanned:        {:>8}                        ║", self.files_scanned);
        println!("║ Languages:            {:>8}                        ║", self.languages);
        println!("║ Key Files:            {:>8}                        ║", self.key_files);
        println!("║ Code Samples:         {:>8}                        ║", self.samples);
        println!("║                                                       ║");
        println!("║ Prompt Length:        {:>8} chars                  ║", self.prompt_chars);
        println!("║ Output Length:        {:>8} chars                  ║", self.output_chars);
        println!("║                                                       ║");
        println!("║ Timing Breakdown:                                     ║");
        println!(
            "║   - Analysis:         {:>8.2}s                     ║",
            self.analyze_duration.as_secs_f64()
        );
        println!(
            "║   - Generation:       {:>8.2}s                     ║",
            self.generate_duration.as_secs_f64()
        );
        println!(
            "║   - Total:            {:>8.2}s                     ║",
            self.duration.as_secs_f64()
        );
        println!("╚═══════════════════════════════════════════════════════╝\n");
    }
}

/// Orchestrates analysis, prompt rendering, generation and writing.
pub struct Pipeline<G> {
    config: Config,
    mode: Mode,
    generator: G,
    formatter: PromptFormatter,
}

impl<G: TextGenerator> Pipeline<G> {
    /// Creates a new pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the prompt
    /// templates fail to load.
    pub fn new(config: Config, mode: Mode, generator: G) -> Result<Self> {
        config.validate()?;
        let formatter = PromptFormatter::new(config.tree_line_limit)?;

        Ok(Self {
            config,
            mode,
            generator,
            formatter,
        })
    }

    /// Runs the pipeline and returns statistics.
    ///
    /// # Process
    ///
    /// 1. **Analyze**: scan the tree, read manifests, git metadata and samples
    /// 2. **Prompt**: render the generate or update prompt
    /// 3. **Generate**: send the prompt to the model
    /// 4. **Write**: replace the output file with the model's answer
    ///
    /// In dry-run mode the prompt is printed and steps 3 and 4 are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing README cannot be read, the prompt
    /// cannot be rendered, generation fails, or the output cannot be written.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use documenthor::{Config, Mode, OllamaClient, Pipeline};
    ///
    /// # fn main() -> anyhow::Result<()> {
    /// let config = Config::builder().root_dir("./my-project").build()?;
    /// let client = OllamaClient::new(&config.ollama)?;
    ///
    /// let stats = Pipeline::new(config, Mode::Generate, client)?.run()?;
    /// stats.print_summary();
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip(self), fields(root_dir = %self.config.root_dir.display(), mode = ?self.mode))]
    pub fn run(self) -> Result<RunStats> {
        let start_time = Instant::now();

        info!("Stage 1/4: Analyzing repository...");
        let analyze_start = Instant::now();
        let summary = RepositorySummary::analyze(&self.config);
        let analyze_duration = analyze_start.elapsed();

        info!(
            "✓ Found {} programming languages and {} key files",
            summary.languages().len(),
            summary.key_files().len()
        );

        info!("Stage 2/4: Building prompt...");
        let existing_readme = self.existing_readme()?;
        let (mode, prompt_mode) = match (&self.mode, existing_readme.as_deref()) {
            (Mode::Update, Some(text)) => (Mode::Update, PromptMode::Update { existing_readme: text }),
            (Mode::Update, None) => {
                warn!("No existing README found, switching to generate mode");
                (Mode::Generate, PromptMode::Generate)
            }
            (Mode::Generate, _) => (Mode::Generate, PromptMode::Generate),
        };
        let prompt = self.formatter.render(&summary, prompt_mode)?;

        let output_path = self.config.output_path();
        let mut stats = RunStats {
            requested_mode: self.mode,
            mode,
            model: self.generator.model().to_string(),
            files_scanned: summary.tree().file_count(),
            languages: summary.languages().len(),
            key_files: summary.key_files().len(),
            samples: summary.samples().len(),
            prompt_chars: prompt.chars().count(),
            output_chars: 0,
            output_path: output_path.display().to_string(),
            written: false,
            duration: Duration::ZERO,
            analyze_duration,
            generate_duration: Duration::ZERO,
        };

        if self.config.dry_run {
            warn!("Dry run mode enabled - prompt printed, nothing sent or written");
            println!("{prompt}");
            stats.duration = start_time.elapsed();
            return Ok(stats);
        }

        info!(
            "Stage 3/4: Generating documentation using model: {}",
            self.generator.model()
        );
        let generate_start = Instant::now();
        let document = self.generator.generate(&prompt, Some(SYSTEM_PROMPT))?;
        stats.generate_duration = generate_start.elapsed();
        stats.output_chars = document.chars().count();

        info!("Stage 4/4: Writing {}...", output_path.display());
        write_document(&output_path, &document)?;
        stats.written = true;
        stats.duration = start_time.elapsed();

        info!(
            "✓ Documentation {}: {} in {:.2}s",
            mode.past_tense(),
            output_path.display(),
            stats.duration.as_secs_f64()
        );

        Ok(stats)
    }

    /// Reads the README at the repository root when updating.
    fn existing_readme(&self) -> Result<Option<String>> {
        if self.mode != Mode::Update {
            return Ok(None);
        }

        let path = self.config.existing_readme_path();
        if !path.is_file() {
            return Ok(None);
        }

        fs::read_to_string(&path)
            .map(Some)
            .map_err(|e| Error::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;
    use std::cell::RefCell;

    struct FakeGenerator {
        reply: Result<String>,
        prompts: RefCell<Vec<String>>,
    }

    impl FakeGenerator {
        fn replying(text: &str) -> Self {
            Self {
                reply: Ok(text.to_string()),
                prompts: RefCell::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                reply: Err(Error::generation("http://mock/api/generate", "500 Internal Server Error")),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for &FakeGenerator {
        fn generate(&self, prompt: &str, system: Option<&str>) -> Result<String> {
            assert_eq!(system, Some(SYSTEM_PROMPT));
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply.clone()
        }

        fn model(&self) -> &str {
            "fake:1b"
        }
    }

    fn fixture() -> assert_fs::TempDir {
        let temp = assert_fs::TempDir::new().unwrap();
        temp.child("package.json")
            .write_str(r#"{"dependencies": {"express": "^4.18.2", "cors": "^2.8.5"}}"#)
            .unwrap();
        temp.child("src/server.js").write_str("app.listen(3000);").unwrap();
        temp
    }

    fn config(root: &std::path::Path) -> Config {
        Config::builder().root_dir(root).build().unwrap()
    }

    #[test]
    fn test_generate_writes_readme() {
        let temp = fixture();
        let generator = FakeGenerator::replying("# Generated");

        let stats = Pipeline::new(config(temp.path()), Mode::Generate, &generator)
            .unwrap()
            .run()
            .unwrap();

        temp.child("README.md").assert("# Generated");
        assert!(stats.written);
        assert_eq!(stats.mode, Mode::Generate);
        assert_eq!(stats.model, "fake:1b");
        assert_eq!(stats.output_chars, 11);

        let prompts = generator.prompts.borrow();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("express"));
        assert!(prompts[0].contains("cors"));
        assert!(prompts[0].contains("server.js"));
        assert!(prompts[0].contains("**Installation**"));
    }

    #[test]
    fn test_update_embeds_existing_readme() {
        let temp = fixture();
        temp.child("README.md").write_str("# Old readme").unwrap();
        let generator = FakeGenerator::replying("# Refreshed");

        let stats = Pipeline::new(config(temp.path()), Mode::Update, &generator)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(stats.mode, Mode::Update);
        assert!(generator.prompts.borrow()[0].contains("```markdown\n# Old readme\n```"));
        temp.child("README.md").assert("# Refreshed");
    }

    #[test]
    fn test_update_without_readme_switches_to_generate() {
        let temp = fixture();
        let generator = FakeGenerator::replying("# New");

        let stats = Pipeline::new(config(temp.path()), Mode::Update, &generator)
            .unwrap()
            .run()
            .unwrap();

        assert_eq!(stats.requested_mode, Mode::Update);
        assert_eq!(stats.mode, Mode::Generate);
        assert!(generator.prompts.borrow()[0].contains("REQUIREMENTS:"));
    }

    #[test]
    fn test_custom_output_path() {
        let temp = fixture();
        let generator = FakeGenerator::replying("docs");
        let config = Config::builder()
            .root_dir(temp.path())
            .output("docs/OVERVIEW.md")
            .build()
            .unwrap();

        Pipeline::new(config, Mode::Generate, &generator)
            .unwrap()
            .run()
            .unwrap();

        temp.child("docs/OVERVIEW.md").assert("docs");
        temp.child("README.md").assert(predicates::path::missing());
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let temp = fixture();
        let generator = FakeGenerator::replying("unused");
        let config = Config::builder()
            .root_dir(temp.path())
            .dry_run(true)
            .build()
            .unwrap();

        let stats = Pipeline::new(config, Mode::Generate, &generator)
            .unwrap()
            .run()
            .unwrap();

        assert!(!stats.written);
        assert!(stats.prompt_chars > 0);
        assert!(generator.prompts.borrow().is_empty());
        temp.child("README.md").assert(predicates::path::missing());
    }

    #[test]
    fn test_generation_failure_is_fatal_and_writes_nothing() {
        let temp = fixture();
        temp.child("README.md").write_str("keep me").unwrap();
        let generator = FakeGenerator::failing();

        let err = Pipeline::new(config(temp.path()), Mode::Update, &generator)
            .unwrap()
            .run()
            .unwrap_err();

        assert!(err.is_fatal());
        temp.child("README.md").assert("keep me");
    }
}
