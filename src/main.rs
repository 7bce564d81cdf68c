use anyhow::{bail, Context};
use clap::Parser;
use documenthor::{
    init_tracing, Config, DirectoryMatch, Mode, OllamaClient, OllamaSettings, Pipeline,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "documenthor",
    version,
    author,
    about = "Generate or update a repository README with a local Ollama model",
    long_about = "Analyzes a repository (file tree, languages, dependency manifests, git \
    metadata and code samples) and asks a locally hosted Ollama model to write or refresh \
    its README.\n\n\
    USAGE EXAMPLES:\n  \
      # Write a new README\n  \
      documenthor --repo-path ./my-project --generate\n\n  \
      # Refresh the existing README with another model\n  \
      documenthor --repo-path ./my-project --update --model codellama:7b\n\n  \
      # Inspect the prompt without calling the model\n  \
      documenthor --repo-path ./my-project --generate --dry-run\n\n  \
      # Show installed models\n  \
      documenthor --list-models"
)]
struct Cli {
    /// Repository to analyze
    #[arg(long, value_name = "PATH", required_unless_present = "list_models")]
    repo_path: Option<PathBuf>,

    /// Output file, relative to the repository
    #[arg(long, default_value = "README.md", value_name = "PATH")]
    output: PathBuf,

    /// Ollama model to use [default: $OLLAMA_MODEL or llama3.2:3b]
    #[arg(long)]
    model: Option<String>,

    /// Ollama base URL [default: $OLLAMA_HOST or http://localhost:11434]
    #[arg(long, value_name = "URL")]
    host: Option<String>,

    /// Generate a new README
    #[arg(long, conflicts_with = "update")]
    generate: bool,

    /// Update the existing README
    #[arg(long)]
    update: bool,

    /// List available Ollama models and exit
    #[arg(long)]
    list_models: bool,

    /// Print the prompt instead of calling the model
    #[arg(long)]
    dry_run: bool,

    /// Extra ignore patterns: exact names or `*.ext` (repeatable, comma separated)
    #[arg(long, value_delimiter = ',', value_name = "PATTERN")]
    exclude: Vec<String>,

    /// Also honour .gitignore files
    #[arg(long)]
    respect_gitignore: bool,

    /// How directory names are matched against ignore patterns
    #[arg(long, value_enum, default_value = "exact")]
    dir_match: CliDirectoryMatch,

    /// Generation timeout in seconds
    #[arg(long, default_value_t = 300, value_name = "SECS")]
    timeout: u64,

    /// Print run statistics when done
    #[arg(long)]
    stats: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
enum CliDirectoryMatch {
    /// Directory name equals a pattern
    Exact,
    /// Directory name starts with a pattern
    Prefix,
}

impl From<CliDirectoryMatch> for DirectoryMatch {
    fn from(m: CliDirectoryMatch) -> Self {
        match m {
            CliDirectoryMatch::Exact => Self::Exact,
            CliDirectoryMatch::Prefix => Self::Prefix,
        }
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let settings = OllamaSettings::resolve(cli.host, cli.model)
        .with_timeout(Duration::from_secs(cli.timeout));

    if cli.list_models {
        let client = OllamaClient::new(&settings).context("Failed to create Ollama client")?;
        println!("Available models:");
        for model in client.list_models() {
            println!("  - {}", model.name);
        }
        return Ok(());
    }

    let mode = match (cli.generate, cli.update) {
        (true, _) => Mode::Generate,
        (_, true) => Mode::Update,
        _ => bail!("Please specify --generate or --update"),
    };

    let repo_path = cli
        .repo_path
        .context("--repo-path is required unless --list-models is given")?;

    let config = Config::builder()
        .root_dir(&repo_path)
        .output(cli.output)
        .ollama(settings)
        .exclude(cli.exclude)
        .respect_gitignore(cli.respect_gitignore)
        .directory_match(cli.dir_match.into())
        .dry_run(cli.dry_run)
        .build()
        .context("Failed to build configuration")?;

    println!("Analyzing repository: {}", repo_path.display());

    let output = config.output_path();
    let client = OllamaClient::new(&config.ollama).context("Failed to create Ollama client")?;
    let stats = match Pipeline::new(config, mode, client)
        .context("Failed to create pipeline")?
        .run()
    {
        Ok(stats) => stats,
        Err(e) if e.is_fatal() => {
            error!("Generation aborted, {} was left untouched", output.display());
            return Err(e).context("Generation aborted, no documentation was written");
        }
        Err(e) => return Err(e).context("Documentation generation failed"),
    };

    if stats.requested_mode != stats.mode {
        println!("No existing README found, switched to generate mode");
    }

    if stats.written {
        println!(
            "Documentation {}: {}",
            stats.mode.past_tense(),
            stats.output_path
        );
    }

    if cli.stats {
        stats.print_summary();
    }

    Ok(())
}
