//! LexChat CLI
//!
//! Main entry point for the lexchat command-line tool: a question-answering
//! assistant over a pre-built legal document index.

mod commands;

use anyhow::Context;
use clap::{Parser, Subcommand};
use commands::{AskCommand, ChatCommand, IndexCommand};
use lexchat_core::{config::AppConfig, logging};
use std::path::PathBuf;

/// LexChat - retrieval-augmented answers over a local document index
#[derive(Parser, Debug)]
#[command(name = "lexchat")]
#[command(about = "Retrieval-augmented answers over a local document index", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to workspace directory (default: current directory)
    #[arg(short, long, global = true, env = "LEXCHAT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Path to config file
    #[arg(short, long, global = true, env = "LEXCHAT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Generation provider (gemini, ollama)
    #[arg(short, long, global = true)]
    provider: Option<String>,

    /// Model identifier
    #[arg(short, long, global = true)]
    model: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Interactive conversation
    Chat(ChatCommand),

    /// Answer a single question
    Ask(AskCommand),

    /// Show information about the loaded index
    Index(IndexCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // The config file location depends on the workspace flag, so both go in up front
    let config = AppConfig::load_with(cli.workspace.clone(), cli.config.clone())
        .context("Failed to load configuration")?;

    let config = config.with_overrides(
        cli.workspace,
        cli.config,
        cli.provider,
        cli.model,
        cli.log_level,
        cli.verbose,
        cli.no_color,
    );

    logging::init_logging(config.log_level.as_deref(), config.no_color)
        .context("Failed to initialize logging")?;

    tracing::info!("LexChat CLI starting");
    tracing::debug!("Workspace: {:?}", config.workspace);
    tracing::debug!("Provider: {}", config.provider);
    tracing::debug!("Model: {}", config.model);

    let command_name = match &cli.command {
        Commands::Chat(_) => "chat",
        Commands::Ask(_) => "ask",
        Commands::Index(_) => "index",
    };
    let _span = tracing::info_span!("command", name = command_name).entered();

    let result = match cli.command {
        Commands::Chat(cmd) => cmd.execute(&config).await,
        Commands::Ask(cmd) => cmd.execute(&config).await,
        Commands::Index(cmd) => cmd.execute(&config),
    };

    match &result {
        Ok(_) => tracing::info!("Command completed successfully"),
        Err(e) => tracing::error!("Command failed: {}", e),
    }

    result.with_context(|| format!("lexchat {} failed", command_name))
}
