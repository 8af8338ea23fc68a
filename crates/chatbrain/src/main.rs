//! Chatbrain CLI - staged analysis of chat conversations.
//!
//! Chatbrain sends screenshots, an audio recording, or pasted text to an
//! analysis service in two stages: a structural pass that extracts the
//! participants and transcript, then a semantic pass that scores the
//! conversation and writes insights.
//!
//! # Usage
//!
//! ```bash
//! # Analyze a set of screenshots
//! chatbrain analyze shot1.png shot2.png
//!
//! # Analyze pasted text, streaming state changes as JSON Lines
//! chatbrain analyze --text "alice: hi\nbob: hello" --format jsonl
//!
//! # View configuration
//! chatbrain config show
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;
mod logging;

/// Chatbrain - staged analysis of chat conversations.
#[derive(Parser, Debug)]
#[command(name = "chatbrain")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Read configuration from this file instead of the default location
    #[arg(long, global = true, env = "CHATBRAIN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Analyze a conversation from files or text
    Analyze(cli::analyze::AnalyzeArgs),

    /// View and manage configuration
    Config(cli::config::ConfigArgs),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln.
    let config = match cli::load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `chatbrain config path`."
            );
            chatbrain_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("Chatbrain v{}", chatbrain_core::VERSION);

    match cli.command {
        Commands::Analyze(args) => cli::analyze::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, cli.config.as_deref()).await,
    }
}
