//! # Chain Build Collaborator (`common::process`)
//!
//! File: cli/src/common/process.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! `spaceship deploy` does not compile the chain itself. It delegates to a
//! [`ChainBuilder`], which produces a release tarball for the remote platform
//! and initializes a fresh chain home directory. The default implementation,
//! [`IgniteBuilder`], shells out to the `ignite` CLI:
//!
//! ```bash
//! ignite chain build -p <app> -o <out_dir> --release --release.targets <os>:<arch> [--verbose]
//! ignite chain init -p <app> --home <home_dir>
//! ```
//!
//! The release tarball is named `<app>_<os>_<arch>.tar.gz` and contains the
//! chain daemon `<app>d`. See [`chain_binary_name`].
//!
//! ## Error Handling
//!
//! A command that cannot be spawned fails with context naming the program. A
//! non-zero exit is `SpaceshipError::ExternalCommand` carrying the combined
//! output, since the output is captured rather than streamed.
//!
use crate::common::ssh::platform::Platform;
use crate::core::error::{Result, SpaceshipError};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tracing::{debug, error, info, instrument};

/// Builds release binaries and chain home directories.
#[async_trait]
pub trait ChainBuilder: Send + Sync {
    /// Builds a release tarball for `platform` into `out_dir` and returns its path.
    async fn build(&self, platform: &Platform, out_dir: &Path) -> Result<PathBuf>;

    /// Initializes a chain home directory (config, genesis, keys) at `home`.
    async fn init(&self, home: &Path) -> Result<()>;
}

/// [`ChainBuilder`] backed by the `ignite` CLI.
#[derive(Debug, Clone)]
pub struct IgniteBuilder {
    program: String,
    app_path: PathBuf,
    verbose: bool,
}

impl IgniteBuilder {
    pub fn new(app_path: impl Into<PathBuf>) -> Self {
        Self {
            program: "ignite".to_string(),
            app_path: app_path.into(),
            verbose: false,
        }
    }

    /// Passes `--verbose` to the build.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Runs `program` instead of `ignite` found on `PATH`.
    pub fn with_program(mut self, program: &str) -> Self {
        self.program = program.to_string();
        self
    }

    fn build_args(&self, platform: &Platform, out_dir: &Path) -> Vec<String> {
        let mut args = vec![
            "chain".to_string(),
            "build".to_string(),
            "-p".to_string(),
            self.app_path.display().to_string(),
            "-o".to_string(),
            out_dir.display().to_string(),
            "--release".to_string(),
            "--release.targets".to_string(),
            platform.build_target(),
        ];
        if self.verbose {
            args.push("--verbose".to_string());
        }
        args
    }

    fn init_args(&self, home: &Path) -> Vec<String> {
        vec![
            "chain".to_string(),
            "init".to_string(),
            "-p".to_string(),
            self.app_path.display().to_string(),
            "--home".to_string(),
            home.display().to_string(),
        ]
    }
}

#[async_trait]
impl ChainBuilder for IgniteBuilder {
    #[instrument(skip(self, out_dir), fields(app = %self.app_path.display()))]
    async fn build(&self, platform: &Platform, out_dir: &Path) -> Result<PathBuf> {
        run_external_command(&self.program, &self.build_args(platform, out_dir)).await?;
        find_release_tarball(out_dir, platform)
    }

    #[instrument(skip(self, home), fields(app = %self.app_path.display()))]
    async fn init(&self, home: &Path) -> Result<()> {
        run_external_command(&self.program, &self.init_args(home)).await?;
        Ok(())
    }
}

/// Name of the chain daemon inside a release tarball: `<app>_<os>_<arch>.tar.gz`
/// holds `<app>d`.
pub fn chain_binary_name(tarball: &Path, platform: &Platform) -> Result<String> {
    let suffix = format!("_{}.tar.gz", platform.tarball_suffix());
    tarball
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| n.strip_suffix(&suffix))
        .filter(|app| !app.is_empty())
        .map(|app| format!("{}d", app))
        .ok_or_else(|| {
            anyhow!(
                "'{}' is not a release tarball for {}",
                tarball.display(),
                platform
            )
        })
}

/// Finds the `*_<os>_<arch>.tar.gz` file a release build left in `out_dir`.
fn find_release_tarball(out_dir: &Path, platform: &Platform) -> Result<PathBuf> {
    let suffix = format!("_{}.tar.gz", platform.tarball_suffix());
    let entries = std::fs::read_dir(out_dir)
        .with_context(|| format!("Failed to read build output directory {:?}", out_dir))?;
    for entry in entries {
        let path = entry?.path();
        let matches = path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.ends_with(&suffix));
        if matches && path.is_file() {
            debug!("Found release tarball {:?}", path);
            return Ok(path);
        }
    }
    Err(SpaceshipError::Archive(format!(
        "no release tarball for {} in {:?}",
        platform, out_dir
    ))
    .into())
}

/// Runs a local command, capturing its output.
async fn run_external_command(program: &str, args: &[String]) -> Result<String> {
    info!("Executing command: {} {}", program, args.join(" "));
    let output = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .kill_on_drop(true)
        .output()
        .await
        .with_context(|| format!("Failed to execute command '{}'. Is it installed and in PATH?", program))?;

    let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
    combined.push_str(&String::from_utf8_lossy(&output.stderr));

    if !output.status.success() {
        let exit_code = output
            .status
            .code()
            .map_or("?".to_string(), |c| c.to_string());
        error!("Command '{}' failed with exit code {}", program, exit_code);
        return Err(SpaceshipError::ExternalCommand {
            cmd: format!("{} {}", program, args.join(" ")),
            status: exit_code,
            output: combined.trim().to_string(),
        }
        .into());
    }
    debug!("Command '{}' output:\n{}", program, combined.trim());
    Ok(combined)
}
