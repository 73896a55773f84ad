//! # Uploader (`common::ssh::upload`)
//!
//! File: cli/src/common/ssh/upload.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! Copies local files and directory trees into the remote workspace.
//! [`Session::upload`] is the general operation; binaries, runner scripts and
//! the chain home directory are thin specializations of it.
//!
//! ## Architecture
//!
//! A directory upload runs in two passes:
//!
//! 1. **Scan.** Walk the source tree and record every regular file with its
//!    size. Any path with a component starting with `.` is skipped, so hidden
//!    files and directories are never uploaded. The sum of the sizes is the
//!    total reported to the progress callback.
//! 2. **Transfer.** Dispatch one task per file into a `JoinSet` holding at most
//!    [`MAX_CONCURRENT_UPLOADS`] tasks. Each task creates the remote parent
//!    directory on demand and streams the file through a [`ProgressReader`].
//!
//! All tasks share one byte counter behind a `Mutex`. The lock is held while the
//! callback runs, so the callback sees a strictly ordered, non-decreasing
//! sequence of `(uploaded, total)` pairs.
//!
//! The first failing task cancels a job-scoped `CancellationToken`. Running
//! tasks stop at their next chunk, no further tasks are dispatched, and that
//! first error is returned. Files already written stay on the remote host.
//!
use crate::common::ssh::remote::Remote;
use crate::common::ssh::session::Session;
use crate::core::error::{Result, SpaceshipError};
use crate::core::templating::RenderedScripts;
use anyhow::{anyhow, Context};
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};
use walkdir::WalkDir;

/// Maximum number of files transferred at the same time.
pub const MAX_CONCURRENT_UPLOADS: usize = 5;

/// Receives `(bytes uploaded so far, total bytes)`. Returning an error aborts the upload.
pub type ProgressCallback = Arc<dyn Fn(u64, u64) -> Result<()> + Send + Sync>;

/// Byte counter shared by every task of one upload.
struct Progress {
    uploaded: Mutex<u64>,
    total: u64,
    callback: Option<ProgressCallback>,
}

impl Progress {
    fn new(total: u64, callback: Option<ProgressCallback>) -> Self {
        Self {
            uploaded: Mutex::new(0),
            total,
            callback,
        }
    }

    fn advance(&self, bytes: u64) -> io::Result<()> {
        let mut uploaded = self.uploaded.lock().unwrap_or_else(|e| e.into_inner());
        *uploaded += bytes;
        if let Some(callback) = &self.callback {
            callback(*uploaded, self.total).map_err(|e| io::Error::other(e.to_string()))?;
        }
        Ok(())
    }
}

/// Counts bytes as they are read and stops once the upload is cancelled.
struct ProgressReader<R> {
    inner: R,
    progress: Arc<Progress>,
    cancel: CancellationToken,
}

impl<R: Read> Read for ProgressReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.cancel.is_cancelled() {
            return Err(io::Error::other(SpaceshipError::Cancelled));
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.progress.advance(n as u64)?;
        }
        Ok(n)
    }
}

/// A file found by the scan pass.
#[derive(Debug, Clone)]
struct LocalFile {
    path: PathBuf,
    /// Path relative to the source root, `/` separated.
    relative: String,
    size: u64,
}

fn is_hidden(name: &std::ffi::OsStr) -> bool {
    name.to_string_lossy().starts_with('.')
}

/// Pass 1: every non-hidden regular file below `src`, in file name order.
fn scan(src: &Path) -> Result<Vec<LocalFile>> {
    let mut files = Vec::new();
    let walker = WalkDir::new(src)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_hidden(e.file_name()));
    for entry in walker {
        let entry =
            entry.with_context(|| format!("Failed to walk directory '{}'", src.display()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry
            .path()
            .strip_prefix(src)
            .with_context(|| {
                format!(
                    "Could not determine relative path for '{}'",
                    entry.path().display()
                )
            })?
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let size = entry
            .metadata()
            .with_context(|| format!("Failed to stat '{}'", entry.path().display()))?
            .len();
        files.push(LocalFile {
            path: entry.path().to_path_buf(),
            relative,
            size,
        });
    }
    Ok(files)
}

fn remote_join(dir: &str, relative: &str) -> String {
    if dir.is_empty() {
        relative.to_string()
    } else {
        format!("{}/{}", dir.trim_end_matches('/'), relative)
    }
}

fn remote_parent(path: &str) -> Option<&str> {
    path.rsplit_once('/')
        .map(|(parent, _)| parent)
        .filter(|p| !p.is_empty())
}

/// Transfers one file. Returns the remote path on success.
async fn upload_one(
    remote: Arc<dyn Remote>,
    local: PathBuf,
    remote_path: String,
    progress: Arc<Progress>,
    cancel: CancellationToken,
) -> Result<String> {
    if cancel.is_cancelled() {
        return Err(SpaceshipError::Cancelled.into());
    }
    if let Some(parent) = remote_parent(&remote_path) {
        remote.mkdir_all(parent).await?;
    }
    let file = File::open(&local)
        .with_context(|| format!("Failed to open local file '{}'", local.display()))?;
    let reader = ProgressReader {
        inner: file,
        progress,
        cancel,
    };
    let written = remote
        .write_file(&remote_path, Box::new(reader))
        .await
        .with_context(|| format!("failed to upload {} to {}", local.display(), remote_path))?;
    debug!("Uploaded {} bytes to {}", written, remote_path);
    Ok(remote_path)
}

fn file_name(local: &Path) -> Result<String> {
    local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| anyhow!("'{}' has no file name", local.display()))
}

impl Session {
    /// Uploads the directory tree at `src` into the remote directory `dst`.
    ///
    /// # Arguments
    ///
    /// * `src` - Local directory to copy.
    /// * `dst` - Remote destination directory.
    /// * `progress` - Optional callback receiving `(uploaded, total)` byte counts.
    /// * `cancel` - Cancelling this token stops the upload with `SpaceshipError::Cancelled`.
    ///
    /// # Returns
    ///
    /// * `Result<Vec<String>>` - The remote paths of the transferred files.
    ///
    /// # Errors
    ///
    /// Returns the first scan or transfer error. Remaining transfers are cancelled.
    #[instrument(skip(self, src, progress, cancel), fields(src = %src.display()))]
    pub async fn upload(
        &self,
        src: &Path,
        dst: &str,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let remote = self.remote()?.clone();
        let files = scan(src)?;
        let total: u64 = files.iter().map(|f| f.size).sum();
        info!(
            "Uploading {} files ({} bytes) from '{}' to '{}'",
            files.len(),
            total,
            src.display(),
            dst
        );

        let progress = Arc::new(Progress::new(total, progress));
        let job = cancel.child_token();
        let mut tasks = JoinSet::new();
        let mut uploaded = Vec::with_capacity(files.len());
        let mut first_error: Option<anyhow::Error> = None;

        let mut record = |result: std::result::Result<Result<String>, tokio::task::JoinError>,
                          first_error: &mut Option<anyhow::Error>| {
            let outcome = match result {
                Ok(outcome) => outcome,
                Err(e) => Err(anyhow!(e).context("upload task failed")),
            };
            match outcome {
                Ok(path) => uploaded.push(path),
                Err(e) => {
                    if first_error.is_none() {
                        warn!("Upload failed, cancelling remaining transfers: {:#}", e);
                        job.cancel();
                        *first_error = Some(e);
                    }
                }
            }
        };

        for file in files {
            if job.is_cancelled() {
                break;
            }
            if tasks.len() >= MAX_CONCURRENT_UPLOADS {
                if let Some(result) = tasks.join_next().await {
                    record(result, &mut first_error);
                }
                if job.is_cancelled() {
                    break;
                }
            }
            tasks.spawn(upload_one(
                remote.clone(),
                file.path,
                remote_join(dst, &file.relative),
                progress.clone(),
                job.clone(),
            ));
        }
        while let Some(result) = tasks.join_next().await {
            record(result, &mut first_error);
        }

        if let Some(e) = first_error {
            return Err(e);
        }
        if cancel.is_cancelled() {
            return Err(SpaceshipError::Cancelled.into());
        }
        Ok(uploaded)
    }

    /// Uploads a single file to `remote_path`, creating its parent directory.
    pub async fn upload_file(
        &self,
        local: &Path,
        remote_path: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<String> {
        let size = std::fs::metadata(local)
            .with_context(|| format!("Failed to stat '{}'", local.display()))?
            .len();
        upload_one(
            self.remote()?.clone(),
            local.to_path_buf(),
            remote_path.to_string(),
            Arc::new(Progress::new(size, progress)),
            CancellationToken::new(),
        )
        .await
    }

    /// Uploads a binary into the workspace `bin/` directory under its own file
    /// name and marks it executable.
    pub async fn upload_binary(
        &self,
        local: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<String> {
        let name = file_name(local)?;
        self.upload_binary_as(local, &name, progress).await
    }

    /// Uploads a binary into `bin/<name>` and marks it executable.
    pub async fn upload_binary_as(
        &self,
        local: &Path,
        name: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<String> {
        let remote_path = self.workspace().bin_path(name);
        self.upload_executable(local, &remote_path, progress).await
    }

    /// Uploads the faucet binary as `bin/faucet`.
    pub async fn upload_faucet_binary(
        &self,
        local: &Path,
        progress: Option<ProgressCallback>,
    ) -> Result<String> {
        self.upload_binary_as(local, "faucet", progress).await
    }

    /// Uploads the chain runner script to the workspace root and marks it executable.
    pub async fn upload_runner_script(&self, local: &Path) -> Result<String> {
        let remote_path = self.workspace().runner_script();
        self.upload_executable(local, &remote_path, None).await
    }

    /// Uploads the faucet runner script to the workspace root and marks it executable.
    pub async fn upload_faucet_script(&self, local: &Path) -> Result<String> {
        let remote_path = self.workspace().faucet_script();
        self.upload_executable(local, &remote_path, None).await
    }

    /// Uploads both rendered runner scripts.
    pub async fn upload_scripts(&self, scripts: &RenderedScripts) -> Result<Vec<String>> {
        Ok(vec![
            self.upload_runner_script(&scripts.runner).await?,
            self.upload_faucet_script(&scripts.faucet).await?,
        ])
    }

    /// Uploads a local chain home directory into the workspace `home/`.
    pub async fn upload_home(
        &self,
        local_home: &Path,
        progress: Option<ProgressCallback>,
        cancel: &CancellationToken,
    ) -> Result<Vec<String>> {
        let dst = self.workspace().home();
        self.upload(local_home, &dst, progress, cancel).await
    }

    async fn upload_executable(
        &self,
        local: &Path,
        remote_path: &str,
        progress: Option<ProgressCallback>,
    ) -> Result<String> {
        let path = self.upload_file(local, remote_path, progress).await?;
        self.remote()?
            .chmod(&path, 0o755)
            .await
            .with_context(|| format!("failed to make {} executable", path))?;
        Ok(path)
    }
}
