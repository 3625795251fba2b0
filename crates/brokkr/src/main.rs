//! Brokkr CLI - Policy-gated runtime artifact downloads
//!
//! This is the main entry point for the Brokkr command-line interface.

mod cli;
mod commands;
mod output;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize rustls crypto provider (required for rustls 0.23+)
    // This must be done before any TLS operations
    let _ = rustls::crypto::aws_lc_rs::default_provider().install_default();

    // Parse CLI args
    let cli = Cli::parse();

    // Initialize tracing
    init_tracing(cli.verbose, cli.quiet);

    // Run command
    match cli.command {
        Commands::List(args) => commands::list::run(args, cli.config.as_deref()).await,
        Commands::Download(args) => {
            commands::download::run(args, cli.config.as_deref(), cli.quiet).await
        }
        Commands::Verify(args) => commands::verify::run(args, cli.config.as_deref()).await,
        Commands::Policy(args) => {
            commands::policy::handle_policy_command(args, cli.config.as_deref()).await
        }
        Commands::Ledger(args) => commands::ledger::handle_ledger_command(args).await,
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .init();
}
