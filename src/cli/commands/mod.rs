//! CLI commands implementation.
//!
//! This module contains the CLI parser and dispatches to command-specific
//! modules.

mod check;
mod extract;
mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::config::Settings;

#[derive(Parser)]
#[command(name = "textlift")]
#[command(about = "Document image text extraction with vision-LLM OCR and local fallback")]
#[command(version)]
pub struct Cli {
    /// Config file path (overrides TEXTLIFT_CONFIG and auto-discovery)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Start the extraction web server
    Serve {
        /// Bind address: host:port, a bare host, or a bare port
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Extract text from an image file
    Extract {
        /// Image file to process
        file: PathBuf,

        /// Print the full result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Check extraction engine availability
    Check,
}

/// Parse arguments and run the selected command.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Serve { bind } => serve::cmd_serve(settings, bind.as_deref()).await,
        Commands::Extract { file, json } => extract::cmd_extract(settings, &file, json).await,
        Commands::Check => check::cmd_check(&settings),
    }
}
