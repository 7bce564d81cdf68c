use anyhow::Context;
use clap::{Parser, Subcommand};
use documenthor::init_tracing;
use documenthor::maintenance::Maintenance;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "documenthor-maint",
    version,
    about = "Documenthor maintenance utilities"
)]
struct Cli {
    /// Directory the tasks operate on
    #[arg(long, global = true, default_value = ".", value_name = "PATH")]
    root: PathBuf,

    /// Verbose output
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Remove outdated training files
    CleanTraining,
    /// Back up current configuration files
    BackupConfig,
    /// Truncate oversized file contents in the detailed training data
    OptimizeTraining,
    /// Clean up cache and temporary files
    CleanCache {
        /// Show what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    init_tracing(cli.verbose);

    let tasks = Maintenance::new(&cli.root);

    match cli.command {
        Command::CleanTraining => {
            let removed = tasks.clean_training().context("Failed to clean training files")?;
            if removed.is_empty() {
                println!("No obsolete files to remove");
            } else {
                for path in &removed {
                    println!("Removed: {path}");
                }
                println!("Removed {} obsolete files", removed.len());
            }
        }
        Command::BackupConfig => {
            let entries = tasks.backup_config().context("Failed to back up configuration")?;
            for entry in &entries {
                println!("Backed up: {} -> {}", entry.source, entry.destination.display());
            }
            if entries.is_empty() {
                println!("No configuration files found");
            }
        }
        Command::OptimizeTraining => {
            match tasks
                .optimize_training()
                .context("Failed to optimize training data")?
            {
                Some(report) => println!(
                    "Optimized training data: {} examples, {} files truncated (backup saved as {})",
                    report.examples,
                    report.truncated,
                    report.backup.display()
                ),
                None => println!("Training file not found"),
            }
        }
        Command::CleanCache { dry_run } => {
            let matched = tasks.clean_cache(dry_run).context("Failed to clean cache")?;
            for path in &matched {
                if dry_run {
                    println!("Would remove: {}", path.display());
                } else {
                    println!("Removed: {}", path.display());
                }
            }

            if matched.is_empty() {
                println!("No cache files to remove");
            } else if dry_run {
                println!(
                    "Would remove {} files (use without --dry-run to execute)",
                    matched.len()
                );
            } else {
                println!("Removed {} cache files", matched.len());
            }
        }
    }

    Ok(())
}
