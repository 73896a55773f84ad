//! # Filesystem I/O Operations
//!
//! File: cli/src/common/fs/io.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!

//! ## Overview
//!
//! This module centralizes the local filesystem operations Spaceship performs
//! while preparing a deployment: creating scratch and cache directories, writing
//! rendered scripts, marking files executable and hashing cached binaries.
//!
//! ## Architecture
//!
//! - **`ensure_dir_exists`**: Creates a directory and its parents if missing, and
//!   fails if the path exists but is not a directory.
//! - **`write_string_to_file`**: Writes a string, creating the parent directory first.
//! - **`set_executable`**: Sets mode `0755` on Unix. A no-op elsewhere.
//! - **`sha256_file`**: Lowercase hex SHA-256 of a file, streamed with `sha2`.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::fs::io;
//! use std::path::Path;
//!
//! let cache = Path::new("/home/me/.cache/spaceship/bin");
//! io::ensure_dir_exists(cache)?;
//! io::write_string_to_file(&cache.join("notes.txt"), "cached binaries")?;
//! let digest = io::sha256_file(&cache.join("faucet_0.0.3"))?;
//! ```
//!
use crate::core::error::Result;
use anyhow::Context;
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io;
use std::path::Path;
use tracing::{debug, info};

/// Ensures that a directory exists at the specified path.
///
/// If the path does not exist, this function attempts to create the directory,
/// including any necessary parent directories (similar to `mkdir -p`).
///
/// # Arguments
///
/// * `path` - A `&Path` reference to the directory path to ensure exists.
///
/// # Errors
///
/// Returns an `Err` if:
/// - The path exists but is not a directory.
/// - Creating the directory fails (e.g., due to permissions).
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {:?}", path))?;
        info!("Created directory: {:?}", path);
    } else if !path.is_dir() {
        anyhow::bail!("Path exists but is not a directory: {:?}", path);
    } else {
        debug!("Directory already exists: {:?}", path);
    }
    Ok(())
}

/// Writes string content to a file, overwriting it if it exists.
///
/// The parent directory is created first with [`ensure_dir_exists`].
pub fn write_string_to_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir_exists(parent)?;
    }
    fs::write(path, content).with_context(|| format!("Failed to write to file {:?}", path))?;
    debug!("Wrote content to file: {:?}", path);
    Ok(())
}

/// Marks a local file executable (`0755`).
#[cfg(unix)]
pub fn set_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    fs::set_permissions(path, fs::Permissions::from_mode(0o755))
        .with_context(|| format!("Failed to mark {:?} executable", path))
}

#[cfg(not(unix))]
pub fn set_executable(_path: &Path) -> Result<()> {
    Ok(())
}

/// Computes the lowercase hex SHA-256 digest of a file.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher).with_context(|| format!("Failed to read {:?}", path))?;
    Ok(hex::encode(hasher.finalize()))
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_ensure_dir_exists_creates_new() -> Result<()> {
        let base_dir = tempdir()?;
        let new_dir = base_dir.path().join("cache/spaceship/bin");
        assert!(!new_dir.exists());
        ensure_dir_exists(&new_dir)?;
        assert!(new_dir.is_dir());
        // Second call is a no-op.
        ensure_dir_exists(&new_dir)?;
        Ok(())
    }

    #[test]
    fn test_ensure_dir_exists_path_is_file() -> Result<()> {
        let base_dir = tempdir()?;
        let file_path = base_dir.path().join("a_file.txt");
        fs::write(&file_path, "hello")?;
        let result = ensure_dir_exists(&file_path);
        assert!(result
            .unwrap_err()
            .to_string()
            .contains("Path exists but is not a directory"));
        Ok(())
    }

    #[test]
    fn test_write_string_creates_parent() -> Result<()> {
        let base_dir = tempdir()?;
        let file_path = base_dir.path().join("scripts/run.sh");
        write_string_to_file(&file_path, "#!/bin/sh\n")?;
        assert_eq!(fs::read_to_string(&file_path)?, "#!/bin/sh\n");
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_set_executable() -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let base_dir = tempdir()?;
        let file_path = base_dir.path().join("faucet");
        fs::write(&file_path, "bin")?;
        set_executable(&file_path)?;
        assert_eq!(fs::metadata(&file_path)?.permissions().mode() & 0o777, 0o755);
        Ok(())
    }

    #[test]
    fn test_sha256_file() -> Result<()> {
        let base_dir = tempdir()?;
        let file_path = base_dir.path().join("hello");
        fs::write(&file_path, "hello")?;
        assert_eq!(
            sha256_file(&file_path)?,
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
        Ok(())
    }
}
