//! # Deploy Command Handler
//!
//! File: cli/src/commands/deploy.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! This module implements `spaceship deploy`, which takes a chain from source
//! to a running node on a remote host in one step.
//!
//! ## Architecture
//!
//! 1. Connect and detect the remote OS and architecture.
//! 2. Build a release tarball for that platform with `ignite` and extract the
//!    chain daemon from it, or take a prebuilt `--binary`.
//! 3. Upload the binary into the workspace `bin/`.
//! 4. If `--init-chain` is set or the remote has no genesis file, initialize
//!    a chain home locally (or take `--home`) and upload it.
//! 5. Render `run.sh` and `faucet.sh` and upload both.
//! 6. Fetch the faucet release for the platform (cached locally) and upload it.
//! 7. Start the chain, and the faucet too with `--faucet`.
//!
//! Local artifacts live in a temporary directory removed when the command
//! ends. A failure aborts the deploy and leaves the remote host as the last
//! successful step left it. Running deploy again overwrites every file.
//!
//! ## Usage
//!
//! ```bash
//! # Build from the current directory and deploy to a fresh workspace
//! spaceship deploy ubuntu@10.0.0.5 --key ~/.ssh/id_ed25519 --chain-id mars
//!
//! # Reset the chain state and also start the faucet on port 8001
//! spaceship deploy 10.0.0.5 --chain-id mars --init-chain --faucet --faucet-port 8001
//!
//! # Deploy a prebuilt binary and home directory
//! spaceship deploy 10.0.0.5 --chain-id mars --binary ./build/marsd --home ~/.mars
//! ```
//!
use crate::commands::{connect, ctrl_c_token, disconnect, SshArgs};
use crate::common::archive::tar::extract_file;
use crate::common::fetch::{BinarySpec, Fetcher};
use crate::common::process::{chain_binary_name, ChainBuilder, IgniteBuilder};
use crate::common::ssh::session::Session;
use crate::common::ssh::upload::ProgressCallback;
use crate::common::ui::progress::UploadProgress;
use crate::core::config::Config;
use crate::core::error::{Result, SpaceshipError};
use crate::core::templating::{render_run_scripts, ScriptParams};
use anyhow::{anyhow, Context};
use clap::Parser;
use std::io::{IsTerminal, Write};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

#[derive(Parser, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub ssh: SshArgs,

    /// Initialize a new chain home and upload it, replacing the remote state.
    #[arg(long)]
    pub init_chain: bool,

    /// Also start the faucet.
    #[arg(long)]
    pub faucet: bool,

    /// Port the faucet listens on (default: faucet.port from the configuration).
    #[arg(long)]
    pub faucet_port: Option<u16>,

    /// Deploy this prebuilt chain binary instead of building one.
    #[arg(long)]
    pub binary: Option<PathBuf>,

    /// Upload this chain home directory instead of running `ignite chain init`.
    #[arg(long)]
    pub home: Option<PathBuf>,

    /// Path of the chain source tree (default: chain.app_path from the configuration).
    #[arg(long)]
    pub app_path: Option<PathBuf>,

    /// The Ignite CLI used to build and initialize the chain.
    #[arg(long, env = "SPACESHIP_IGNITE", default_value = "ignite")]
    pub ignite: String,
}

/// What to deploy, resolved from the flags and the configuration.
#[derive(Debug, Clone)]
pub struct DeployPlan {
    pub binary: Option<PathBuf>,
    pub home: Option<PathBuf>,
    pub init_chain: bool,
    pub start_faucet: bool,
    pub faucet_port: u16,
    pub faucet_account: String,
    pub denom: String,
    pub faucet: BinarySpec,
}

impl DeployPlan {
    pub fn new(args: &DeployArgs, config: &Config) -> Self {
        Self {
            binary: args.binary.clone(),
            home: args.home.clone(),
            init_chain: args.init_chain,
            start_faucet: args.faucet,
            faucet_port: args.faucet_port.unwrap_or(config.faucet.port),
            faucet_account: config.chain.faucet_account.clone(),
            denom: config.chain.denom.clone(),
            faucet: BinarySpec::faucet(&config.faucet),
        }
    }
}

pub async fn handle_deploy(args: DeployArgs, config: &Config, out: &mut dyn Write) -> Result<()> {
    info!("Handling deploy command");
    let plan = DeployPlan::new(&args, config);
    let app_path = args
        .app_path
        .clone()
        .unwrap_or_else(|| PathBuf::from(&config.chain.app_path));
    let builder = IgniteBuilder::new(app_path)
        .with_program(&args.ignite)
        .verbose(tracing::enabled!(tracing::Level::DEBUG));
    let fetcher = Fetcher::from_default_dirs()?;

    let ssh = args.ssh.ssh_config(config)?;
    let session = connect(ssh, args.ssh.password).await?;
    let cancel = ctrl_c_token();
    let progress = if std::io::stderr().is_terminal() {
        UploadProgress::new()
    } else {
        UploadProgress::hidden()
    };
    // The token replaces the default Ctrl-C behaviour, so every step has to observe it.
    let result = tokio::select! {
        result = run_deploy(
            &session,
            &plan,
            &builder,
            &fetcher,
            Some(progress.callback()),
            &progress,
            out,
            &cancel,
        ) => result,
        _ = cancel.cancelled() => Err(SpaceshipError::Cancelled.into()),
    };
    disconnect(session).await;
    result
}

/// Runs the deploy steps on an open session.
///
/// # Arguments
///
/// * `session` - Connected session. Its workspace receives every file.
/// * `plan` - What to deploy.
/// * `builder` - Builds the release tarball and the chain home.
/// * `fetcher` - Provides the faucet binary.
/// * `callback` / `progress` - Upload progress reporting and its label.
/// * `out` - Receives the human readable report.
/// * `cancel` - Aborts the home directory upload.
#[allow(clippy::too_many_arguments)]
pub async fn run_deploy(
    session: &Session,
    plan: &DeployPlan,
    builder: &dyn ChainBuilder,
    fetcher: &Fetcher,
    callback: Option<ProgressCallback>,
    progress: &UploadProgress,
    out: &mut dyn Write,
    cancel: &CancellationToken,
) -> Result<()> {
    let scratch = tempfile::Builder::new()
        .prefix("spaceship")
        .tempdir()
        .context("Failed to create a local scratch directory")?;
    let bin_dir = scratch.path().join("bin");

    let platform = session.target().await?;
    writeln!(out, "Remote platform: {}", platform)?;

    // Chain binary.
    let binary = match &plan.binary {
        Some(binary) => binary.clone(),
        None => {
            writeln!(out, "Building chain binary using Ignite...")?;
            std::fs::create_dir_all(&bin_dir)
                .with_context(|| format!("Failed to create {:?}", bin_dir))?;
            let tarball = builder.build(&platform, &bin_dir).await?;
            let name = chain_binary_name(&tarball, &platform)?;
            extract_file(&tarball, &name, &bin_dir)?
        }
    };
    let binary_name = binary
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("'{}' has no file name", binary.display()))?;

    progress.describe("Uploading chain binary");
    let bin_path = session.upload_binary(&binary, callback.clone()).await?;
    writeln!(out, "Chain binary uploaded to '{}'", bin_path)?;

    // Chain home.
    if plan.init_chain || !session.has_genesis().await {
        let home = match &plan.home {
            Some(home) => home.clone(),
            None => {
                writeln!(out, "Initializing the chain home folder using Ignite...")?;
                let home = scratch.path().join("home");
                builder.init(&home).await?;
                home
            }
        };
        progress.describe("Uploading chain home");
        let files = session.upload_home(&home, callback.clone(), cancel).await?;
        writeln!(out, "Uploaded files:\n- {}", files.join("\n- "))?;
    } else {
        debug!("Remote genesis present, keeping the chain home");
    }

    // Runner scripts.
    let params = ScriptParams::new(
        session.workspace(),
        &binary_name,
        &plan.faucet_account,
        &plan.denom,
        plan.faucet_port,
    );
    let scripts = render_run_scripts(&params, &scratch.path().join("scripts"))?;
    let uploaded = session.upload_scripts(&scripts).await?;
    writeln!(out, "Runner scripts uploaded: {}", uploaded.join(", "))?;

    // Faucet binary.
    let faucet = fetcher.fetch(&plan.faucet, &platform).await?;
    progress.describe("Uploading faucet binary");
    session.upload_faucet_binary(&faucet, callback).await?;

    writeln!(out, "Running chain {}", binary_name)?;
    let started = session.start().await?;
    writeln!(out, "{}", started)?;

    if plan.start_faucet {
        writeln!(out, "Running chain {} faucet", binary_name)?;
        let started = session.faucet_start(plan.faucet_port).await?;
        writeln!(out, "{}", started)?;
    }

    let id = session
        .workspace()
        .root()
        .rsplit('/')
        .next()
        .unwrap_or_default();
    writeln!(
        out,
        "Deployed to workspace '{}'. Use --chain-id {} with the other commands.",
        session.workspace().root(),
        id
    )?;
    Ok(())
}
