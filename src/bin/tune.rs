use anyhow::{bail, Context};
use clap::Parser;
use documenthor::finetune::{FineTuneJob, SystemRunner};
use documenthor::{init_tracing, OllamaClient, OllamaSettings, DEFAULT_MODEL};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "documenthor-tune",
    version,
    about = "Build a documentation Modelfile from training data and create the model in Ollama"
)]
struct Cli {
    /// Directory containing training data
    #[arg(long, value_name = "PATH")]
    training_dir: PathBuf,

    /// Base model to fine-tune
    #[arg(long, default_value = DEFAULT_MODEL)]
    base_model: String,

    /// Name for the fine-tuned model
    #[arg(long)]
    output_model: String,

    /// Ollama base URL used to confirm the new model
    #[arg(long, value_name = "URL")]
    ollama_host: Option<String>,

    /// Write the Modelfile without creating the model
    #[arg(long)]
    dry_run: bool,

    /// Verbose output
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    if !cli.training_dir.exists() {
        bail!(
            "Training directory does not exist: {}",
            cli.training_dir.display()
        );
    }

    println!("Fine-tuning {} -> {}", cli.base_model, cli.output_model);
    println!("Training data directory: {}", cli.training_dir.display());

    let job = FineTuneJob {
        training_dir: cli.training_dir,
        base_model: cli.base_model,
        output_model: cli.output_model,
        dry_run: cli.dry_run,
    };
    let report = job.run(SystemRunner).context("Fine-tuning failed")?;

    println!("Loaded {} training examples", report.examples);
    println!("Created Modelfile: {}", report.modelfile.display());

    let Some(installation) = report.installation else {
        println!("Dry run: model not created");
        return Ok(());
    };

    println!("Using Ollama pod: {}", installation.pod);
    println!("Model creation output:");
    println!("{}", installation.output.stdout);
    if !installation.output.stderr.trim().is_empty() {
        println!("Warnings: {}", installation.output.stderr);
    }

    let settings = OllamaSettings::resolve(cli.ollama_host, None);
    let client = OllamaClient::new(&settings).context("Failed to create Ollama client")?;
    let available = client
        .list_models()
        .iter()
        .any(|m| m.name == job.output_model || m.name == format!("{}:latest", job.output_model));
    if !available {
        println!(
            "Model {} is not listed at {} yet",
            job.output_model,
            client.host()
        );
    }

    println!("Fine-tuning completed successfully!");
    println!("You can now use the model: {}", job.output_model);
    Ok(())
}
