//! # SSH Session (`common::ssh::session`)
//!
//! File: cli/src/common/ssh/session.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! A [`Session`] is one authenticated connection to a deployment host together
//! with the remote [`Workspace`] it operates in. The uploader, the process
//! controller and the log tailer are implemented as further `impl Session`
//! blocks in their own modules.
//!
//! ## Lifecycle
//!
//! 1. [`Session::new`] validates the options. No network activity happens here,
//!    so conflicting credentials are reported before anything is contacted.
//! 2. If [`Session::needs_user_password`] is true the caller prompts once and
//!    calls [`Session::set_password`].
//! 3. [`Session::connect`] performs the handshake and bootstraps the workspace:
//!    `bin/`, `home/` and `log/` are created and the optional companion binary is
//!    installed and verified.
//! 4. [`Session::close`] releases the transport.
//!
//! ## Workspace layout
//!
//! ```text
//! spaceship/<id>/
//! ├── bin/            chain and faucet binaries
//! ├── home/           chain data directory
//! │   └── config/genesis.json
//! ├── log/            <app>_<timestamp>.log files
//! ├── run.sh          chain runner script
//! └── faucet.sh       faucet runner script
//! ```
//!
//! Every path is derived from the workspace root and never stored on its own.
//!
use crate::common::ssh::options::SshConfig;
use crate::common::ssh::platform::Platform;
use crate::common::ssh::remote::{Remote, SshRemote};
use crate::core::error::{Result, SpaceshipError};
use anyhow::{anyhow, Context};
use rand::distr::Alphanumeric;
use rand::Rng;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Fixed directory, relative to the login directory, holding every workspace.
pub const WORKDIR: &str = "spaceship";
const WORKSPACE_ID_LEN: usize = 10;

/// The remote directory tree of one deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: String,
}

impl Workspace {
    /// Workspace `spaceship/<id>`.
    pub fn new(id: &str) -> Self {
        Self {
            root: format!("{}/{}", WORKDIR, id),
        }
    }

    /// Workspace with a random 10 character alphanumeric identifier.
    pub fn random() -> Self {
        let id: String = rand::rng()
            .sample_iter(&Alphanumeric)
            .take(WORKSPACE_ID_LEN)
            .map(char::from)
            .collect();
        Self::new(&id)
    }

    pub fn root(&self) -> &str {
        &self.root
    }

    pub fn home(&self) -> String {
        format!("{}/home", self.root)
    }

    pub fn genesis(&self) -> String {
        format!("{}/config/genesis.json", self.home())
    }

    pub fn runner_script(&self) -> String {
        format!("{}/run.sh", self.root)
    }

    pub fn faucet_script(&self) -> String {
        format!("{}/faucet.sh", self.root)
    }

    pub fn bin(&self) -> String {
        format!("{}/bin", self.root)
    }

    /// Path of a binary inside `bin/`.
    pub fn bin_path(&self, name: &str) -> String {
        format!("{}/{}", self.bin(), name)
    }

    pub fn log(&self) -> String {
        format!("{}/log", self.root)
    }
}

/// An SSH connection to a deployment host plus its remote workspace.
pub struct Session {
    config: SshConfig,
    workspace: Workspace,
    remote: Option<Arc<dyn Remote>>,
}

impl Session {
    /// Builds an unconnected session.
    ///
    /// # Errors
    ///
    /// Returns `SpaceshipError::Config` if the options are invalid, see
    /// [`SshConfig::validate`].
    pub fn new(config: SshConfig) -> Result<Self> {
        config.validate()?;
        let workspace = match config.workspace() {
            Some(id) => Workspace::new(id),
            None => Workspace::random(),
        };
        debug!("Using remote workspace '{}'", workspace.root());
        Ok(Self {
            config,
            workspace,
            remote: None,
        })
    }

    pub fn config(&self) -> &SshConfig {
        &self.config
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    /// True when no credential is configured. Checked before [`Session::connect`].
    pub fn needs_user_password(&self) -> bool {
        self.config.needs_user_password()
    }

    pub fn set_password(&mut self, password: SecretString) {
        self.config.set_password(password);
    }

    /// Connects, authenticates and bootstraps the remote workspace.
    ///
    /// # Errors
    ///
    /// Transport, authentication and bootstrap failures are returned as they are.
    /// Nothing is retried.
    pub async fn connect(&mut self) -> Result<()> {
        let remote = SshRemote::connect(&self.config).await?;
        self.attach(Arc::new(remote)).await
    }

    async fn attach(&mut self, remote: Arc<dyn Remote>) -> Result<()> {
        self.remote = Some(remote);
        self.ensure_environment().await
    }

    /// Creates the workspace directories and installs the companion binary if one
    /// is configured.
    #[instrument(skip(self), fields(workspace = %self.workspace.root()))]
    async fn ensure_environment(&self) -> Result<()> {
        let remote = self.remote()?;
        for dir in [self.workspace.bin(), self.workspace.home(), self.workspace.log()] {
            remote
                .mkdir_all(&dir)
                .await
                .with_context(|| format!("failed to create remote directory {}", dir))?;
        }

        if let Some(companion) = self.config.companion().cloned() {
            let name = companion
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    SpaceshipError::Config(format!(
                        "Companion binary path '{}' has no file name",
                        companion.display()
                    ))
                })?;
            let remote_path = self.workspace.bin_path(&name);
            if !self.file_exists(&remote_path).await {
                info!("Installing companion binary '{}' on the remote host", name);
                self.upload_binary(&companion, None).await?;
            }
            remote.chmod(&remote_path, 0o755).await?;
            let output = match remote.exec(&format!("{} --help", remote_path)).await {
                Ok(output) => output,
                Err(e) => {
                    debug!("'{} --help' failed: {:#}", remote_path, e);
                    String::new()
                }
            };
            if output.trim().is_empty() {
                return Err(SpaceshipError::BinaryMissing { name }.into());
            }
        }
        Ok(())
    }

    /// The connected transport.
    ///
    /// # Errors
    ///
    /// Fails if [`Session::connect`] has not completed.
    pub fn remote(&self) -> Result<&Arc<dyn Remote>> {
        self.remote.as_ref().ok_or_else(|| {
            anyhow!(
                "SSH session to {} is not connected",
                self.config.host()
            )
        })
    }

    /// Releases the transport. Closing an unconnected session is a no-op.
    pub async fn close(&mut self) -> Result<()> {
        match self.remote.take() {
            Some(remote) => remote.close().await,
            None => Ok(()),
        }
    }

    /// Runs a command on the remote host and returns its trimmed combined output.
    pub async fn run_command(&self, command: &str) -> Result<String> {
        self.remote()?.exec(command).await
    }

    /// Detects the operating system and architecture of the remote host.
    pub async fn target(&self) -> Result<Platform> {
        Platform::detect(self.remote()?.as_ref()).await
    }

    /// Attaches an already connected transport and runs the bootstrap.
    #[cfg(test)]
    pub async fn connect_with(config: SshConfig, remote: Arc<dyn Remote>) -> Result<Self> {
        let mut session = Self::new(config)?;
        session.attach(remote).await?;
        Ok(session)
    }
}
