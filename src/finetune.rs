//! Builds an Ollama Modelfile from example documentation and installs it
//! into a Kubernetes-hosted Ollama instance.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, info, instrument, warn};

/// System instruction baked into every generated Modelfile.
pub const MODELFILE_SYSTEM_PROMPT: &str = "You are an expert technical documentation writer. \
You specialize in creating clear, comprehensive README files for software projects. \
Your documentation should be:

1. Clear and well-structured with proper Markdown formatting
2. Include practical examples and code snippets
3. Cover installation, usage, and API documentation
4. Professional yet accessible tone
5. Based on actual code analysis, not assumptions

Always analyze the repository structure, dependencies, and code to provide accurate documentation.";

/// Examples embedded in a Modelfile.
pub const MAX_EXAMPLES: usize = 2;

/// Files whose content is quoted from repository examples.
pub const CONTEXT_FILES: &[&str] = &["package.json", "requirements.txt", "app.py", "index.js"];

const SIMPLE_INPUT_LIMIT: usize = 1500;
const SIMPLE_OUTPUT_LIMIT: usize = 2000;
const CONTEXT_FILE_LIMIT: usize = 400;
const REPOSITORY_PROMPT_LIMIT: usize = 1200;
const REPOSITORY_README_LIMIT: usize = 1800;

/// Name of the file written into the training directory.
pub const MODELFILE_NAME: &str = "Modelfile";

/// Namespace the Ollama deployment runs in.
pub const OLLAMA_NAMESPACE: &str = "ollama";

const POD_MODELFILE_PATH: &str = "/tmp/Modelfile";
const POD_NAME_JSONPATH: &str = "jsonpath={.items[0].metadata.name}";

/// One prompt/answer pair used to steer the model.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum TrainingExample {
    /// A ready-made prompt and the README it should produce.
    Simple {
        /// Prompt text
        input: String,
        /// Expected README
        output: String,
    },
    /// A repository snapshot and its README.
    Repository {
        /// Display name of the repository
        repository_name: String,
        /// Relative file path to file content
        repository_structure: BTreeMap<String, String>,
        /// Expected README
        expected_readme: String,
    },
}

impl TrainingExample {
    /// Renders the example as a (user, assistant) message pair.
    #[must_use]
    pub fn to_messages(&self) -> (String, String) {
        match self {
            Self::Simple { input, output } => (
                clip(input, SIMPLE_INPUT_LIMIT),
                clip(output, SIMPLE_OUTPUT_LIMIT),
            ),
            Self::Repository {
                repository_name,
                repository_structure,
                expected_readme,
            } => {
                let mut context = format!("Repository: {repository_name}\n\nKey Files:\n");
                for name in CONTEXT_FILES {
                    if let Some(content) = repository_structure.get(*name) {
                        let head: String = content.chars().take(CONTEXT_FILE_LIMIT).collect();
                        context.push_str(&format!("\n{name}: {head}...\n"));
                    }
                }

                let prompt = format!(
                    "Analyze this repository and generate a comprehensive README.md:\n\n{context}"
                );
                (
                    clip(&prompt, REPOSITORY_PROMPT_LIMIT),
                    clip(expected_readme, REPOSITORY_README_LIMIT),
                )
            }
        }
    }
}

/// Keeps the first `max` characters, marking the cut with `...`.
fn clip(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

/// Loads every training example under `dir`.
///
/// `*.json` files are read in name order, each holding one example or an
/// array of them. Unparseable files and unrecognised items are skipped.
/// Every direct subdirectory with a `README.md` then contributes one
/// example built from its top-level entries.
///
/// # Errors
///
/// Returns an error if `dir` cannot be listed.
#[instrument]
pub fn load_training_data(dir: &Path) -> Result<Vec<TrainingExample>> {
    let mut entries: Vec<PathBuf> = fs::read_dir(dir)
        .map_err(|e| Error::io(dir, e))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .collect();
    entries.sort();

    let mut examples = Vec::new();

    for path in entries.iter().filter(|p| p.is_file()) {
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match read_examples_file(path) {
            Ok(found) => {
                debug!("{} examples from {}", found.len(), path.display());
                examples.extend(found);
            }
            Err(e) => warn!("Error reading {}: {}", path.display(), e),
        }
    }

    for path in entries.iter().filter(|p| p.is_dir()) {
        if !path.join("README.md").is_file() {
            continue;
        }
        match example_from_repository(path) {
            Ok(example) => examples.push(example),
            Err(e) => warn!("Error processing {}: {}", path.display(), e),
        }
    }

    info!("Loaded {} training examples", examples.len());
    Ok(examples)
}

fn read_examples_file(path: &Path) -> Result<Vec<TrainingExample>> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;

    let items = match value {
        serde_json::Value::Array(items) => items,
        other => vec![other],
    };

    Ok(items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(example) => Some(example),
            Err(e) => {
                debug!("Dropping unrecognised item in {}: {}", path.display(), e);
                None
            }
        })
        .collect())
}

fn example_from_repository(dir: &Path) -> Result<TrainingExample> {
    let readme_path = dir.join("README.md");
    let output = fs::read_to_string(&readme_path).map_err(|e| Error::io(&readme_path, e))?;

    let mut names: Vec<String> = fs::read_dir(dir)
        .map_err(|e| Error::io(dir, e))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .filter(|name| !name.starts_with('.'))
        .collect();
    names.sort();

    let input = format!(
        "Analyze this repository and generate a README:\n\n\
         Repository structure: {}\n\n\
         Generate a comprehensive README.md file.",
        names.join(", ")
    );

    Ok(TrainingExample::Simple { input, output })
}

/// Renders a Modelfile for `base_model` with up to [`MAX_EXAMPLES`]
/// message pairs.
#[must_use]
pub fn build_modelfile(base_model: &str, examples: &[TrainingExample]) -> String {
    let mut modelfile = format!("FROM {base_model}\n\nSYSTEM \"\"\"{MODELFILE_SYSTEM_PROMPT}\"\"\"\n\n");

    for example in examples.iter().take(MAX_EXAMPLES) {
        let (user, assistant) = example.to_messages();
        modelfile.push_str(&format!(
            "MESSAGE user \"\"\"{user}\"\"\"\nMESSAGE assistant \"\"\"{assistant}\"\"\"\n\n"
        ));
    }

    modelfile
}

/// Captured result of an external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Process exit code, `-1` when killed by a signal
    pub exit_code: i32,
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

impl CommandOutput {
    /// Returns true if the process exited with status zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Runs external programs.
pub trait CommandRunner {
    /// Runs `program` with `args` and captures its output.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Command`] if the program cannot be started.
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput>;
}

/// Runs programs with [`std::process::Command`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        debug!("Running {} {}", program, args.join(" "));

        let output = Command::new(program)
            .args(args)
            .output()
            .map_err(|e| Error::command(command_line(program, args), e.to_string()))?;

        Ok(CommandOutput {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}

fn command_line(program: &str, args: &[&str]) -> String {
    std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Creates models inside the Ollama pod through `kubectl`.
pub struct ModelInstaller<R> {
    runner: R,
    namespace: String,
}

impl<R: CommandRunner> ModelInstaller<R> {
    /// Creates an installer targeting the default namespace.
    pub fn new(runner: R) -> Self {
        Self {
            runner,
            namespace: OLLAMA_NAMESPACE.to_string(),
        }
    }

    fn run_checked(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let output = self.runner.run(program, args)?;
        if output.success() {
            Ok(output)
        } else {
            Err(Error::command(
                command_line(program, args),
                format!("exit code {}: {}", output.exit_code, output.stderr.trim()),
            ))
        }
    }

    /// Name of the Ollama pod: the one labelled `name=ollama`, else the
    /// first pod in the namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if `kubectl` fails or no pod exists.
    pub fn find_pod(&self) -> Result<String> {
        let ns = self.namespace.as_str();

        let labelled = self.run_checked(
            "kubectl",
            &["get", "pod", "-n", ns, "-l", "name=ollama", "-o", POD_NAME_JSONPATH],
        )?;
        let pod = labelled.stdout.trim();
        if !pod.is_empty() {
            return Ok(pod.to_string());
        }

        debug!("No pod labelled name=ollama, falling back to first pod");
        let any = self.run_checked("kubectl", &["get", "pods", "-n", ns, "-o", POD_NAME_JSONPATH])?;
        let pod = any.stdout.trim();
        if pod.is_empty() {
            return Err(Error::command(
                format!("kubectl get pods -n {ns}"),
                "no Ollama pod found",
            ));
        }
        Ok(pod.to_string())
    }

    /// Copies `modelfile` into the pod and runs `ollama create`.
    ///
    /// # Errors
    ///
    /// Returns an error if any `kubectl` step fails.
    pub fn install(&self, modelfile: &Path, model_name: &str) -> Result<Installation> {
        let pod = self.find_pod()?;
        info!("Using Ollama pod: {}", pod);

        let source = modelfile.to_string_lossy();
        let target = format!("{}/{}:{}", self.namespace, pod, POD_MODELFILE_PATH);
        self.run_checked("kubectl", &["cp", source.as_ref(), target.as_str()])?;

        let output = self.run_checked(
            "kubectl",
            &[
                "exec",
                "-n",
                self.namespace.as_str(),
                pod.as_str(),
                "--",
                "ollama",
                "create",
                model_name,
                "-f",
                POD_MODELFILE_PATH,
            ],
        )?;

        Ok(Installation { pod, output })
    }
}

/// Result of a successful model installation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Installation {
    /// Pod the model was created in
    pub pod: String,
    /// Output of `ollama create`
    pub output: CommandOutput,
}

/// A complete fine-tune run.
#[derive(Debug, Clone)]
pub struct FineTuneJob {
    /// Directory holding training data; the Modelfile is written here
    pub training_dir: PathBuf,
    /// Model the Modelfile builds on
    pub base_model: String,
    /// Name of the model to create
    pub output_model: String,
    /// Stop after writing the Modelfile
    pub dry_run: bool,
}

/// What a fine-tune run did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineTuneReport {
    /// Number of examples loaded
    pub examples: usize,
    /// Path of the written Modelfile
    pub modelfile: PathBuf,
    /// Installation details, absent in dry-run mode
    pub installation: Option<Installation>,
}

impl FineTuneJob {
    /// Loads training data, writes the Modelfile and installs the model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoTrainingData`] when nothing usable was found, or
    /// an IO or command error from the later steps.
    #[instrument(skip(self, runner), fields(base = %self.base_model, output = %self.output_model))]
    pub fn run<R: CommandRunner>(&self, runner: R) -> Result<FineTuneReport> {
        if !self.training_dir.is_dir() {
            return Err(Error::config(format!(
                "Training directory does not exist: {}",
                self.training_dir.display()
            )));
        }

        let examples = load_training_data(&self.training_dir)?;
        if examples.is_empty() {
            return Err(Error::no_training_data(&self.training_dir));
        }

        let modelfile = self.training_dir.join(MODELFILE_NAME);
        let content = build_modelfile(&self.base_model, &examples);
        fs::write(&modelfile, content).map_err(|e| Error::io(&modelfile, e))?;
        info!("Created Modelfile: {}", modelfile.display());

        let installation = if self.dry_run {
            info!("Dry run: skipping model creation");
            None
        } else {
            Some(ModelInstaller::new(runner).install(&modelfile, &self.output_model)?)
        };

        Ok(FineTuneReport {
            examples: examples.len(),
            modelfile,
            installation,
        })
    }
}
