//! # Spaceship Main Entry Point
//!
//! File: cli/src/main.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! This file serves as the main entry point for the Spaceship CLI application.
//! It handles:
//! - Command-line argument parsing using Clap
//! - Setting up the logging system based on verbosity flags
//! - Loading the configuration and routing execution to the command handlers
//!
//! ## Architecture
//!
//! Each top-level command (`deploy`, `log`, `status`, ...) is a variant of the
//! `Commands` enum and maps to a handler in `commands`. Handlers write their
//! report to stdout; logs go to stderr. All errors are propagated to this
//! level for consistent handling.
//!
//! ## Examples
//!
//! ```bash
//! # Get help
//! spaceship --help
//!
//! # Deploy with increased verbosity
//! spaceship -vv deploy ubuntu@10.0.0.5 --key ~/.ssh/id_ed25519 --chain-id mars
//! ```
//!
//! Command processing flow:
//! 1. Parse command-line args via Clap
//! 2. Configure logging based on verbosity level
//! 3. Load `.spaceship.toml` and the user configuration
//! 4. Route to the command handler
//! 5. Display any error that occurs and exit with status 1 (130 when interrupted)
//!
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

mod commands; // Command handlers (deploy, log, chain control, faucet)
mod common; // Shared utilities (ssh, fetch, archive, fs, ui)
mod core; // Core infrastructure (errors, config, templating)

use commands::chain::ChainArgs;
use common::ssh::process::ScriptVerb;
use crate::core::error::{is_error_kind, SpaceshipError};

/// Defines the top-level command-line arguments structure using Clap's derive macros.
#[derive(Parser, Debug)]
#[command(
    name = "spaceship",
    about = "🚀 Spaceship: deploy and run a chain node on a remote host over SSH",
    long_about = "Build a chain, ship it to a remote server over SSH and control it there.\n\
                  Manages the chain node, its faucet and their logs in an isolated remote workspace.",
    propagate_version = true,
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

/// Enum defining all available top-level commands.
#[derive(Parser, Debug)]
enum Commands {
    /// Build, upload and start the chain on a remote host.
    #[command(alias = "d")]
    Deploy(commands::deploy::DeployArgs),
    /// Print or follow the latest chain or faucet log.
    #[command(alias = "l")]
    Log(commands::log::LogArgs),
    /// Show whether the chain and the faucet are running.
    Status(ChainArgs),
    /// Restart the chain and the faucet.
    Restart(ChainArgs),
    /// Stop the chain and the faucet.
    Stop(ChainArgs),
    /// Control the faucet on its own.
    Faucet(commands::faucet::FaucetArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    tracing::debug!("Parsed CLI arguments: {:?}", cli);

    if let Err(e) = run(cli.command).await {
        if is_error_kind(&e, |k| matches!(k, SpaceshipError::Cancelled)) {
            eprintln!("Interrupted");
            std::process::exit(130);
        }
        tracing::error!("Command execution failed: {:?}", e);
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

async fn run(command: Commands) -> anyhow::Result<()> {
    let config = crate::core::config::load_config()?;
    let mut stdout = std::io::stdout();
    let out = &mut stdout;
    match command {
        Commands::Deploy(args) => commands::deploy::handle_deploy(args, &config, out).await,
        Commands::Log(args) => commands::log::handle_log(args, &config, out).await,
        Commands::Status(args) => {
            commands::chain::handle_chain(ScriptVerb::Status, args, &config, out).await
        }
        Commands::Restart(args) => {
            commands::chain::handle_chain(ScriptVerb::Restart, args, &config, out).await
        }
        Commands::Stop(args) => {
            commands::chain::handle_chain(ScriptVerb::Stop, args, &config, out).await
        }
        Commands::Faucet(args) => commands::faucet::handle_faucet(args, &config, out).await,
    }
}
