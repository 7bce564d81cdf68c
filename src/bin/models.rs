use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use documenthor::{init_tracing, OllamaClient, OllamaSettings};
use std::io::{self, BufRead, Write};

#[derive(Parser, Debug)]
#[command(
    name = "documenthor-models",
    version,
    about = "Manage Ollama models for documenthor"
)]
struct Cli {
    /// Ollama base URL [default: $OLLAMA_HOST or http://localhost:11434]
    #[arg(long, global = true, value_name = "URL")]
    host: Option<String>,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List all available models
    List,
    /// Pull a model from the registry
    Pull {
        /// Model name, e.g. codellama:7b
        model_name: String,
    },
    /// Delete a model
    Delete {
        /// Model name
        model_name: String,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show recommended models for documentation
    Recommended,
}

const RECOMMENDED: &[(&str, &str)] = &[
    ("codellama:7b", "Code-focused model, good for technical docs"),
    ("llama2:7b", "General purpose, good balance"),
    ("mistral:7b", "Fast and efficient"),
    ("llama2:13b", "Larger model, better quality (requires more RAM)"),
];

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let settings = OllamaSettings::resolve(cli.host, None);
    let client = || OllamaClient::new(&settings).context("Failed to create Ollama client");

    match cli.command {
        Command::List => {
            let models = client()?.list_models();
            if models.is_empty() {
                println!("No models found");
            } else {
                println!("Available models:");
                for model in models {
                    println!("  - {} ({})", model.name, model.size);
                }
            }
        }
        Command::Pull { model_name } => {
            println!("Pulling {model_name}...");
            client()?
                .pull_model(&model_name, |event| {
                    if let Some(error) = &event.error {
                        eprintln!("Error: {error}");
                    }
                    if let Some(status) = &event.status {
                        println!("Status: {status}");
                        if let Some(progress) = event.progress() {
                            println!("Progress: {progress:.1}%");
                        }
                    }
                })
                .with_context(|| format!("Error pulling model {model_name}"))?;
            println!("Successfully pulled {model_name}");
        }
        Command::Delete { model_name, yes } => {
            if !yes && !confirm("Are you sure you want to delete this model?")? {
                bail!("Aborted!");
            }
            client()?
                .delete_model(&model_name)
                .with_context(|| format!("Error deleting model {model_name}"))?;
            println!("Successfully deleted {model_name}");
        }
        Command::Recommended => {
            println!("Recommended models for documentation:");
            for (name, description) in RECOMMENDED {
                println!("  {name} - {description}");
            }
            println!();
            println!("To pull a model:");
            println!("  documenthor-models pull codellama:7b");
        }
    }

    Ok(())
}

fn confirm(question: &str) -> anyhow::Result<bool> {
    print!("{question} [y/N]: ");
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
}
