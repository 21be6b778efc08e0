use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tagsmith::engine::{RunOptions, TagEngine};
use tagsmith::llm::ProviderKind;
use tagsmith::progress::{NoProgress, ProgressReporter, StderrProgress};
use tagsmith::vault::VaultStore;
use tagsmith::{EngineConfig, FsVault};

/// tagsmith - LLM-driven tag generation for markdown vaults
#[derive(Parser)]
#[command(name = "tagsmith")]
#[command(about = "Generates and maintains a consistent tag vocabulary for a markdown vault")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand)]
enum Commands {
    /// Tag every document in a vault
    Run(RunCommand),
    /// Tag a single document
    File(FileCommand),
    /// Print the vault's current tag vocabulary
    Vocab(VocabCommand),
}

#[derive(Parser)]
struct RunCommand {
    /// Vault root directory
    #[arg(value_name = "VAULT")]
    vault: PathBuf,

    /// Restrict the run to one vault subfolder
    #[arg(long, value_name = "FOLDER")]
    folder: Option<String>,

    /// Primary provider (claude or openai)
    #[arg(short, long, value_name = "PROVIDER")]
    provider: Option<String>,

    /// Prefix applied to every written tag (e.g. "ai/")
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Generate tags without writing any document
    #[arg(long)]
    dry_run: bool,

    /// Suppress progress output
    #[arg(short, long)]
    quiet: bool,
}

#[derive(Parser)]
struct FileCommand {
    /// Vault root directory
    #[arg(value_name = "VAULT")]
    vault: PathBuf,

    /// Vault-relative document path
    #[arg(value_name = "FILE")]
    file: String,

    /// Primary provider (claude or openai)
    #[arg(short, long, value_name = "PROVIDER")]
    provider: Option<String>,

    /// Prefix applied to every written tag (e.g. "ai/")
    #[arg(long, value_name = "PREFIX")]
    prefix: Option<String>,

    /// Generate tags without writing the document
    #[arg(long)]
    dry_run: bool,
}

#[derive(Parser)]
struct VocabCommand {
    /// Vault root directory
    #[arg(value_name = "VAULT")]
    vault: PathBuf,
}

fn main() {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Run(cmd) => handle_run(cmd),
        Commands::File(cmd) => handle_file(cmd),
        Commands::Vocab(cmd) => handle_vocab(cmd),
    };

    if let Err(e) = result {
        // Determine exit code based on error type
        let exit_code = if is_user_error(&e) { 1 } else { 2 };
        eprintln!("Error: {e}");
        std::process::exit(exit_code);
    }
}

/// Determines if an error is a user error (vs internal error).
///
/// User errors include bad provider names, missing credentials, and missing
/// documents. Internal errors include provider and I/O failures.
fn is_user_error(error: &anyhow::Error) -> bool {
    let error_msg = error.to_string();
    error_msg.contains("unknown provider")
        || error_msg.contains("no provider credentials")
        || error_msg.contains("not found")
}

fn parse_provider(input: Option<&str>) -> Result<Option<ProviderKind>> {
    input
        .map(|name| {
            ProviderKind::from_str(name)
                .map_err(|_| anyhow::anyhow!("unknown provider: {name}"))
        })
        .transpose()
}

fn open_vault(root: &PathBuf, folder: Option<&str>) -> Result<FsVault> {
    let vault = match folder {
        Some(folder) => FsVault::open_folder(root, folder),
        None => FsVault::open(root),
    };
    vault.context("Failed to open vault")
}

fn handle_run(cmd: &RunCommand) -> Result<()> {
    let vault = open_vault(&cmd.vault, cmd.folder.as_deref())?;
    let mut engine = TagEngine::new(EngineConfig::from_env())?;

    let options = RunOptions {
        provider: parse_provider(cmd.provider.as_deref())?,
        prefix: cmd.prefix.clone(),
        dry_run: cmd.dry_run,
    };
    let reporter: Box<dyn ProgressReporter> = if cmd.quiet {
        Box::new(NoProgress)
    } else {
        Box::new(StderrProgress)
    };

    let documents = vault
        .list_documents()
        .context("Failed to scan vault documents")?;
    let outcome = engine.run_batch(&vault, &documents, reporter.as_ref(), &options)?;
    engine.shutdown();

    if outcome.errors > 0 && cmd.quiet {
        eprintln!("{} of {} documents failed", outcome.errors, outcome.total);
    }
    Ok(())
}

fn handle_file(cmd: &FileCommand) -> Result<()> {
    let vault = open_vault(&cmd.vault, None)?;
    let mut engine = TagEngine::new(EngineConfig::from_env())?;

    let options = RunOptions {
        provider: parse_provider(cmd.provider.as_deref())?,
        prefix: cmd.prefix.clone(),
        dry_run: cmd.dry_run,
    };
    let tags = engine.run_document(&vault, &cmd.file, &options)?;
    engine.shutdown();

    println!("{}: {}", cmd.file, tags.join(", "));
    Ok(())
}

fn handle_vocab(cmd: &VocabCommand) -> Result<()> {
    let vault = open_vault(&cmd.vault, None)?;
    let engine = TagEngine::new(EngineConfig::from_env())?;

    for tag in engine.vocabulary(&vault)? {
        println!("{tag}");
    }
    Ok(())
}
