//! # Spaceship Configuration System
//!
//! File: cli/src/core/config.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! This module implements configuration loading for Spaceship. Configuration
//! provides defaults for the SSH connection, the chain being deployed and the
//! faucet companion process, so that commands like `spaceship status <host>`
//! don't need a long list of flags every time.
//!
//! ## Architecture
//!
//! Configuration sources (in order of precedence):
//! 1. Command-line flags (applied by the command handlers, not here)
//! 2. Project-specific `.spaceship.toml` in the current directory or ancestors
//! 3. User-specific `<config dir>/spaceship/config.toml`
//! 4. Default values defined in the code
//!
//! After merging, `~` in paths is expanded and the result is validated.
//!
//! ## Examples
//!
//! ```toml
//! [ssh]
//! user = "ubuntu"
//! port = 2222
//! key = "~/.ssh/deploy_ed25519"
//!
//! [chain]
//! id = "mars"
//! app_path = "~/src/mars"
//! faucet_account = "bob"
//! denom = "umars"
//!
//! [faucet]
//! port = 4500
//! ```
//!
use crate::core::error::{Result, SpaceshipError};
use anyhow::{anyhow, Context};
use directories::ProjectDirs;
use serde::Deserialize;
use std::{
    fs,
    path::{Path, PathBuf},
};
use tracing::{debug, info, warn};

/// Release location of the faucet companion binary.
pub const FAUCET_RELEASE_URL: &str = "https://github.com/ignite/faucet/releases/download";

/// The resolved configuration every command reads.
#[derive(Debug, Default, Clone)]
pub struct Config {
    pub ssh: SshDefaults,
    pub chain: ChainConfig,
    pub faucet: FaucetConfig,
}

/// Default SSH connection settings. Every field can be overridden by a CLI flag.
#[derive(Deserialize, Debug, Default, Clone, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct SshDefaults {
    /// Remote login user.
    pub user: Option<String>,
    /// Remote SSH port.
    pub port: Option<u16>,
    /// Path to a private key file (can use ~).
    pub key: Option<String>,
    /// Local path of a companion CLI binary that must be present on the remote host.
    pub companion: Option<String>,
}

/// Settings describing the chain being deployed.
#[derive(Debug, Clone)]
pub struct ChainConfig {
    /// Chain identifier. Also names the remote workspace (`spaceship/<id>`).
    pub id: Option<String>,
    /// Local path of the chain source tree (can use ~).
    pub app_path: String,
    /// Account the faucet sends funds from.
    pub faucet_account: String,
    /// Base denomination handed out by the faucet.
    pub denom: String,
}

/// Settings for the faucet companion process.
#[derive(Debug, Clone)]
pub struct FaucetConfig {
    /// Port the remote faucet listens on.
    pub port: u16,
    /// Faucet release version to fetch.
    pub version: String,
    /// Base URL of the faucet releases.
    pub release_url: String,
    /// Optional SHA-256 (hex) of the faucet binary, verified on download and cache hits.
    pub sha256: Option<String>,
}

/// One configuration file as written on disk. Unset keys stay `None`, so a
/// value set explicitly in the project file wins even when it equals the default.
#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default)]
    ssh: SshDefaults,
    #[serde(default)]
    chain: ChainFile,
    #[serde(default)]
    faucet: FaucetFile,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct ChainFile {
    id: Option<String>,
    app_path: Option<String>,
    faucet_account: Option<String>,
    denom: Option<String>,
}

#[derive(Deserialize, Debug, Default, Clone)]
#[serde(deny_unknown_fields)]
struct FaucetFile {
    port: Option<u16>,
    version: Option<String>,
    release_url: Option<String>,
    sha256: Option<String>,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            id: None,
            app_path: default_app_path(),
            faucet_account: default_faucet_account(),
            denom: default_denom(),
        }
    }
}

impl Default for FaucetConfig {
    fn default() -> Self {
        Self {
            port: default_faucet_port(),
            version: default_faucet_version(),
            release_url: default_faucet_release_url(),
            sha256: None,
        }
    }
}

fn default_app_path() -> String {
    ".".to_string()
}
fn default_faucet_account() -> String {
    "alice".to_string()
}
fn default_denom() -> String {
    "token".to_string()
}
fn default_faucet_port() -> u16 {
    4500
}
fn default_faucet_version() -> String {
    "0.0.3".to_string()
}
fn default_faucet_release_url() -> String {
    FAUCET_RELEASE_URL.to_string()
}

const PROJECT_CONFIG_FILENAME: &str = ".spaceship.toml";

/// Returns the project directories used for the user config file and the binary cache.
pub fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "Spaceship", "spaceship")
}

/// Loads, merges, expands and validates the configuration.
pub fn load_config() -> Result<Config> {
    let user_config = load_user_config()?;
    let project_config = load_project_config()?;
    let mut merged_config = merge_configs(user_config, project_config);
    expand_config_paths(&mut merged_config).context("Failed to expand paths in configuration")?;
    validate_config(&merged_config).context("Configuration validation failed")?;
    debug!("Final loaded configuration: {:?}", merged_config);
    Ok(merged_config)
}

fn load_user_config() -> Result<Option<ConfigFile>> {
    if let Some(proj_dirs) = project_dirs() {
        let config_path = proj_dirs.config_dir().join("config.toml");
        if config_path.exists() {
            info!("Loading user configuration from: {}", config_path.display());
            load_config_from_path(&config_path).map(Some)
        } else {
            debug!(
                "User configuration file not found at {}",
                config_path.display()
            );
            Ok(None)
        }
    } else {
        warn!("Could not determine user config directory.");
        Ok(None)
    }
}

fn load_project_config() -> Result<Option<ConfigFile>> {
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;
    if let Some(project_config_path) = find_project_config_path(&current_dir) {
        info!(
            "Loading project configuration from: {}",
            project_config_path.display()
        );
        load_config_from_path(&project_config_path).map(Some)
    } else {
        debug!("No project configuration file (.spaceship.toml) found.");
        Ok(None)
    }
}

/// Walks from `start` up to the filesystem root looking for `.spaceship.toml`,
/// stopping at the first directory that contains `.git`.
fn find_project_config_path(start: &Path) -> Option<PathBuf> {
    let mut path = start;
    loop {
        let project_config = path.join(PROJECT_CONFIG_FILENAME);
        if project_config.is_file() {
            return Some(project_config);
        }
        if path.join(".git").is_dir() {
            debug!(
                "Found .git directory at {}, stopping project config search.",
                path.display()
            );
            return None;
        }
        path = path.parent()?;
    }
}

fn load_config_from_path(path: &Path) -> Result<ConfigFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read configuration file: {}", path.display()))?;
    toml::from_str(&content)
        .with_context(|| format!("Failed to parse TOML from file: {}", path.display()))
}

/// Merges the two files field by field: project, then user, then the built-in default.
fn merge_configs(user: Option<ConfigFile>, project: Option<ConfigFile>) -> Config {
    let user = user.unwrap_or_default();
    let project = project.unwrap_or_default();
    Config {
        ssh: SshDefaults {
            user: project.ssh.user.or(user.ssh.user),
            port: project.ssh.port.or(user.ssh.port),
            key: project.ssh.key.or(user.ssh.key),
            companion: project.ssh.companion.or(user.ssh.companion),
        },
        chain: ChainConfig {
            id: project.chain.id.or(user.chain.id),
            app_path: project
                .chain
                .app_path
                .or(user.chain.app_path)
                .unwrap_or_else(default_app_path),
            faucet_account: project
                .chain
                .faucet_account
                .or(user.chain.faucet_account)
                .unwrap_or_else(default_faucet_account),
            denom: project
                .chain
                .denom
                .or(user.chain.denom)
                .unwrap_or_else(default_denom),
        },
        faucet: FaucetConfig {
            port: project
                .faucet
                .port
                .or(user.faucet.port)
                .unwrap_or_else(default_faucet_port),
            version: project
                .faucet
                .version
                .or(user.faucet.version)
                .unwrap_or_else(default_faucet_version),
            release_url: project
                .faucet
                .release_url
                .or(user.faucet.release_url)
                .unwrap_or_else(default_faucet_release_url),
            sha256: project.faucet.sha256.or(user.faucet.sha256),
        },
    }
}

fn expand_config_paths(config: &mut Config) -> Result<()> {
    config.chain.app_path = shellexpand::tilde(&config.chain.app_path).into_owned();
    if let Some(key) = config.ssh.key.as_mut() {
        *key = shellexpand::tilde(key).into_owned();
    }
    if let Some(companion) = config.ssh.companion.as_mut() {
        *companion = shellexpand::tilde(companion).into_owned();
    }
    debug!("Expanded app path: {}", config.chain.app_path);
    Ok(())
}

fn validate_config(config: &Config) -> Result<()> {
    if config.ssh.port == Some(0) {
        return Err(anyhow!(SpaceshipError::Config(
            "ssh.port must be between 1 and 65535".to_string()
        )));
    }
    if config.faucet.port == 0 {
        return Err(anyhow!(SpaceshipError::Config(
            "faucet.port must be between 1 and 65535".to_string()
        )));
    }
    if config.chain.denom.trim().is_empty() {
        return Err(anyhow!(SpaceshipError::Config(
            "chain.denom cannot be empty".to_string()
        )));
    }
    if let Some(id) = &config.chain.id {
        if id.trim().is_empty() || id.contains('/') {
            return Err(anyhow!(SpaceshipError::Config(format!(
                "Invalid chain.id '{}': must be non-empty and contain no '/'",
                id
            ))));
        }
    }
    if let Some(sha) = &config.faucet.sha256 {
        if sha.len() != 64 || !sha.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(anyhow!(SpaceshipError::Config(format!(
                "faucet.sha256 '{}' is not a hex encoded SHA-256 digest",
                sha
            ))));
        }
    }
    Ok(())
}
