//! # Spaceship Runner Script Templates
//!
//! File: cli/src/core/templating.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! This module renders the two shell scripts that control processes on the
//! remote host: `run.sh` for the chain node and `faucet.sh` for the faucet.
//! Both scripts accept a single verb (`start`, `stop`, `restart`, `status`) and
//! print a human readable result line. They are rendered locally and then
//! uploaded by the uploader.
//!
//! ## Architecture
//!
//! The templates live in `cli/templates/*.sh.tera` and are embedded into the
//! binary with `include_str!`, so a deploy never depends on files next to the
//! executable. Rendering uses `Tera::one_off` with a context built from
//! [`ScriptParams`] via serde. Autoescaping is disabled since the output is a
//! shell script, not HTML.
//!
//! ## Examples
//!
//! ```rust
//! let params = ScriptParams::new(session.workspace(), "marsd", "alice", "umars", 4500);
//! let rendered = templating::render_run_scripts(&params, scratch.path())?;
//! session.upload_scripts(&rendered).await?;
//! ```
//!
use crate::common::fs::io::{ensure_dir_exists, set_executable, write_string_to_file};
use crate::common::ssh::session::Workspace;
use crate::core::error::{Result, SpaceshipError};
use anyhow::anyhow;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tera::Tera;
use tracing::{debug, info};

const RUN_SCRIPT_TEMPLATE: &str = include_str!("../../templates/run.sh.tera");
const FAUCET_SCRIPT_TEMPLATE: &str = include_str!("../../templates/faucet.sh.tera");

/// File name of the chain runner script, inside the workspace root.
pub const RUN_SCRIPT_NAME: &str = "run.sh";
/// File name of the faucet runner script, inside the workspace root.
pub const FAUCET_SCRIPT_NAME: &str = "faucet.sh";

/// Values substituted into the runner script templates.
///
/// All paths are remote paths relative to the login directory of the SSH user.
#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct ScriptParams {
    /// Workspace root (`spaceship/<id>`).
    pub path: String,
    /// Log directory.
    pub log: String,
    /// Chain home directory.
    pub home: String,
    /// Directory holding the chain and faucet binaries.
    pub bin_dir: String,
    /// Remote path of the chain binary.
    pub chain_bin_path: String,
    /// Remote path of the faucet binary.
    pub faucet_bin_path: String,
    /// File name of the chain binary, used as the faucet's `--cli-name`.
    pub binary: String,
    /// Account the faucet sends funds from.
    pub account: String,
    /// Comma separated denominations the faucet hands out.
    pub denoms: String,
    /// Port the faucet listens on when none is passed to `faucet.sh start`.
    pub default_port: u16,
}

impl ScriptParams {
    /// Derives script parameters from the remote workspace layout.
    ///
    /// # Arguments
    ///
    /// * `workspace` - The remote workspace the scripts will run in.
    /// * `chain_binary` - File name of the chain binary inside the workspace `bin` directory.
    /// * `account` - The faucet account name.
    /// * `denoms` - The denominations handed out by the faucet.
    /// * `default_port` - The faucet port used when none is given on the command line.
    pub fn new(
        workspace: &Workspace,
        chain_binary: &str,
        account: &str,
        denoms: &str,
        default_port: u16,
    ) -> Self {
        Self {
            path: workspace.root().to_string(),
            log: workspace.log(),
            home: workspace.home(),
            bin_dir: workspace.bin(),
            chain_bin_path: workspace.bin_path(chain_binary),
            faucet_bin_path: workspace.bin_path("faucet"),
            binary: chain_binary.to_string(),
            account: account.to_string(),
            denoms: denoms.to_string(),
            default_port,
        }
    }
}

/// Local paths of the rendered runner scripts.
#[derive(Debug, Clone)]
pub struct RenderedScripts {
    pub runner: PathBuf,
    pub faucet: PathBuf,
}

/// Renders `run.sh` and `faucet.sh` into `out_dir`.
///
/// # Arguments
///
/// * `params` - Values substituted into both templates.
/// * `out_dir` - Local directory that receives the scripts. Created if missing.
///
/// # Returns
///
/// * `Result<RenderedScripts>` - The paths of the written scripts.
///
/// # Errors
///
/// Returns `SpaceshipError::Template` if rendering fails, or an I/O error if the
/// output directory or files cannot be written.
pub fn render_run_scripts(params: &ScriptParams, out_dir: &Path) -> Result<RenderedScripts> {
    info!("Rendering runner scripts into '{}'", out_dir.display());
    ensure_dir_exists(out_dir)?;

    let context = tera::Context::from_serialize(params).map_err(|e| {
        anyhow!(SpaceshipError::Template { source: e })
            .context("Failed to create Tera context from script parameters")
    })?;

    let runner = out_dir.join(RUN_SCRIPT_NAME);
    render_one(RUN_SCRIPT_TEMPLATE, &context, &runner)?;
    let faucet = out_dir.join(FAUCET_SCRIPT_NAME);
    render_one(FAUCET_SCRIPT_TEMPLATE, &context, &faucet)?;

    Ok(RenderedScripts { runner, faucet })
}

fn render_one(template: &str, context: &tera::Context, target: &Path) -> Result<()> {
    let rendered = Tera::one_off(template, context, false).map_err(|e| {
        anyhow!(SpaceshipError::Template { source: e }).context(format!(
            "Tera rendering failed for script '{}'",
            target.display()
        ))
    })?;
    write_string_to_file(target, &rendered)?;
    set_executable(target)?;
    debug!("Rendered script '{}'", target.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn params() -> ScriptParams {
        let workspace = Workspace::new("mars");
        ScriptParams::new(&workspace, "marsd", "bob", "umars", 4500)
    }

    #[test]
    fn test_params_follow_workspace_layout() {
        let p = params();
        assert_eq!(p.path, "spaceship/mars");
        assert_eq!(p.home, "spaceship/mars/home");
        assert_eq!(p.log, "spaceship/mars/log");
        assert_eq!(p.chain_bin_path, "spaceship/mars/bin/marsd");
        assert_eq!(p.faucet_bin_path, "spaceship/mars/bin/faucet");
    }

    #[test]
    fn test_render_run_scripts() -> Result<()> {
        let out = tempdir()?;
        let rendered = render_run_scripts(&params(), &out.path().join("scripts"))?;

        let runner = fs::read_to_string(&rendered.runner)?;
        assert!(runner.starts_with("#!/bin/sh"));
        assert!(runner.contains("HOME_DIR=\"spaceship/mars/home\""));
        assert!(runner.contains("BINARY=\"spaceship/mars/bin/marsd\""));
        assert!(runner.contains("LOG_DIR/chain_"));
        assert!(!runner.contains("{{"));

        let faucet = fs::read_to_string(&rendered.faucet)?;
        assert!(faucet.contains("--account-name \"bob\""));
        assert!(faucet.contains("--denoms \"umars\""));
        assert!(faucet.contains("--cli-name \"marsd\""));
        assert!(faucet.contains("PORT=\"${2:-4500}\""));
        assert!(faucet.contains("LOG_DIR/faucet_"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = fs::metadata(&rendered.runner)?.permissions().mode();
            assert_eq!(mode & 0o777, 0o755);
        }
        Ok(())
    }

    #[test]
    fn test_render_invalid_template_syntax() {
        let out = tempdir().unwrap();
        let context = tera::Context::from_serialize(params()).unwrap();
        let result = render_one("echo {{ path", &context, &out.path().join("broken.sh"));
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Tera rendering failed"));
        assert!(err
            .chain()
            .any(|c| matches!(c.downcast_ref::<SpaceshipError>(), Some(SpaceshipError::Template { .. }))));
        assert!(!out.path().join("broken.sh").exists());
    }
}
