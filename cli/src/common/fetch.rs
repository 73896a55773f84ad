//! # Release Binary Fetcher (`common::fetch`)
//!
//! File: cli/src/common/fetch.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! Some binaries deployed next to the chain are not built locally but taken from
//! a published release, the faucet being the main one. The [`Fetcher`] turns a
//! [`BinarySpec`] plus the remote [`Platform`] into a local executable path:
//!
//! 1. The cache file `<cache dir>/<name>_<version>` is returned as is if it
//!    exists. With a SHA-256 pin the file is verified first and deleted when it
//!    does not match.
//! 2. Otherwise `<release_url>/v<version>/<name>_<version>_<os>_<arch>.tar.gz`
//!    is downloaded. Anything but `200 OK` is a fetch error.
//! 3. The body must be gzip data. The entry named `<name>` is extracted into a
//!    scratch directory inside the cache, verified against the pin, then moved
//!    to the cache path and marked executable.
//!
//! Nothing is retried. The default cache directory is `<cache dir>/spaceship/bin`.
//!
use crate::common::archive::tar::extract_entry;
use crate::common::fs::io::{ensure_dir_exists, set_executable, sha256_file};
use crate::common::ssh::platform::Platform;
use crate::core::config::{project_dirs, FaucetConfig};
use crate::core::error::{Result, SpaceshipError};
use anyhow::{anyhow, Context};
use reqwest::StatusCode;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);
const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Name of the faucet binary inside its release tarball and on the remote host.
pub const FAUCET_BINARY_NAME: &str = "faucet";

/// A released binary identified by name and version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinarySpec {
    pub name: String,
    pub version: String,
    /// Base URL the `v<version>/...` path is appended to.
    pub release_url: String,
    /// Lowercase hex SHA-256 the binary must match, if pinned.
    pub expected_sha256: Option<String>,
}

impl BinarySpec {
    /// The faucet release described by the `[faucet]` configuration section.
    pub fn faucet(config: &FaucetConfig) -> Self {
        Self {
            name: FAUCET_BINARY_NAME.to_string(),
            version: config.version.clone(),
            release_url: config.release_url.clone(),
            expected_sha256: config.sha256.clone(),
        }
    }

    pub fn cache_file_name(&self) -> String {
        format!("{}_{}", self.name, self.version)
    }

    pub fn archive_name(&self, platform: &Platform) -> String {
        format!(
            "{}_{}_{}.tar.gz",
            self.name,
            self.version,
            platform.tarball_suffix()
        )
    }

    pub fn download_url(&self, platform: &Platform) -> String {
        format!(
            "{}/v{}/{}",
            self.release_url.trim_end_matches('/'),
            self.version,
            self.archive_name(platform)
        )
    }
}

/// Downloads release tarballs and keeps the extracted binaries in a local cache.
pub struct Fetcher {
    cache_dir: PathBuf,
    client: reqwest::Client,
}

impl Fetcher {
    /// Creates a fetcher caching binaries in `cache_dir`.
    pub fn new(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("spaceship/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            cache_dir: cache_dir.into(),
            client,
        })
    }

    /// Creates a fetcher using the platform cache directory.
    pub fn from_default_dirs() -> Result<Self> {
        let dirs = project_dirs()
            .ok_or_else(|| anyhow!("Could not determine the user cache directory"))?;
        Self::new(dirs.cache_dir().join("bin"))
    }

    pub fn cache_path(&self, spec: &BinarySpec) -> PathBuf {
        self.cache_dir.join(spec.cache_file_name())
    }

    /// Returns a local executable path for `spec` built for `platform`.
    ///
    /// # Errors
    ///
    /// - `SpaceshipError::Fetch` for request failures, non-200 responses and
    ///   checksum mismatches of a fresh download.
    /// - `SpaceshipError::Archive` if the body is not a gzip tarball or lacks
    ///   the binary.
    #[instrument(skip(self, spec), fields(binary = %spec.cache_file_name(), platform = %platform))]
    pub async fn fetch(&self, spec: &BinarySpec, platform: &Platform) -> Result<PathBuf> {
        let cached = self.cache_path(spec);
        if cached.is_file() {
            let valid = match &spec.expected_sha256 {
                None => true,
                Some(expected) => checksum_matches(&cached, expected)?,
            };
            if valid {
                debug!("Using cached binary {:?}", cached);
                return Ok(cached);
            }
            warn!("Cached binary {:?} fails its checksum, downloading again", cached);
            fs::remove_file(&cached).with_context(|| format!("Failed to remove {:?}", cached))?;
        }

        ensure_dir_exists(&self.cache_dir)?;
        let url = spec.download_url(platform);
        info!("Downloading {}", url);
        let body = self.download(&url).await?;
        if !body.starts_with(&GZIP_MAGIC) {
            return Err(SpaceshipError::Archive(format!(
                "unexpected format for {}: expected .tar.gz",
                url
            ))
            .into());
        }

        let scratch = tempfile::Builder::new()
            .prefix(".download")
            .tempdir_in(&self.cache_dir)
            .with_context(|| format!("Failed to create a scratch directory in {:?}", self.cache_dir))?;
        let name = spec.name.clone();
        let out_dir = scratch.path().to_path_buf();
        let extracted =
            tokio::task::spawn_blocking(move || extract_entry(body.as_slice(), &name, &out_dir))
                .await
                .context("extraction task failed")??;

        if let Some(expected) = &spec.expected_sha256 {
            if !checksum_matches(&extracted, expected)? {
                return Err(SpaceshipError::Fetch(format!(
                    "checksum mismatch for {} downloaded from {}",
                    spec.name, url
                ))
                .into());
            }
        }

        fs::rename(&extracted, &cached)
            .with_context(|| format!("Failed to move {:?} to {:?}", extracted, cached))?;
        set_executable(&cached)?;
        info!("Cached {} at {:?}", spec.cache_file_name(), cached);
        Ok(cached)
    }

    async fn download(&self, url: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SpaceshipError::Fetch(format!("failed to download {}: {}", url, e)))?;
        if response.status() != StatusCode::OK {
            return Err(SpaceshipError::Fetch(format!(
                "failed to fetch {}: {} status",
                url,
                response.status()
            ))
            .into());
        }
        let body = response
            .bytes()
            .await
            .map_err(|e| SpaceshipError::Fetch(format!("failed to read {}: {}", url, e)))?;
        Ok(body.to_vec())
    }
}

fn checksum_matches(path: &Path, expected: &str) -> Result<bool> {
    Ok(sha256_file(path)?.eq_ignore_ascii_case(expected.trim()))
}
