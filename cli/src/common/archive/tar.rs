//! # TAR Archive Extraction (`common::archive::tar`)
//!
//! File: cli/src/common/archive/tar.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! This module extracts a single named file from a gzipped tarball (`.tar.gz`).
//! Release archives are not consistent about their layout: some put the binary
//! at the top level (`faucet`), others inside a directory (`faucet_0.0.3/faucet`).
//! An entry matches when its path equals the requested name or ends with
//! `/<name>`, so both layouts work.
//!
//! ## Architecture
//!
//! The module leverages the `flate2` crate for Gzip decompression and the `tar`
//! crate for walking the archive entries.
//!
//! - The input is a stream, so the fetcher can extract straight from the HTTP
//!   response body without buffering the archive on disk first.
//! - Directory entries are never matched.
//! - Entry paths that are absolute or contain `..` are rejected before anything
//!   is written, whether or not they match.
//! - The file is written to `<out_dir>/<name>`.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive::tar;
//! use std::fs::File;
//! use std::path::Path;
//!
//! let archive = File::open("faucet_0.0.3_linux_amd64.tar.gz")?;
//! let binary = tar::extract_entry(archive, "faucet", Path::new("/tmp/faucet"))?;
//! println!("Extracted {}", binary.display());
//! ```
//!
use crate::core::error::{Result, SpaceshipError}; // Use the standard Result type from the core module
use anyhow::Context; // For adding contextual information to errors
use flate2::read::GzDecoder;
use std::fs::{self, File};
use std::io::{self, Read};
use std::path::{Component, Path, PathBuf}; // Filesystem path types
use tracing::debug;

/// True if `entry` is `name` itself or a path ending in `/<name>`.
fn entry_matches(entry: &str, name: &str) -> bool {
    entry == name || entry.ends_with(&format!("/{}", name))
}

/// Rejects entry paths that could write outside the extraction directory.
fn check_entry_path(path: &Path) -> Result<()> {
    let escapes = path.components().any(|c| {
        matches!(
            c,
            Component::ParentDir | Component::RootDir | Component::Prefix(_)
        )
    });
    if escapes {
        return Err(SpaceshipError::Archive(format!(
            "invalid path in tarball: {}",
            path.display()
        ))
        .into());
    }
    Ok(())
}

/// # Extract One Entry (`extract_entry`)
///
/// Reads a gzipped TAR stream and writes the first regular file matching `name`
/// to `out_dir/<name>`.
///
/// ## Arguments
///
/// * `reader` - The `.tar.gz` byte stream (a local file or an HTTP body).
/// * `name` - File name to look for. Matches an entry named exactly `name` or
///   ending in `/<name>`.
/// * `out_dir` - Directory the file is written to. Created if missing.
///
/// ## Returns
///
/// * `Result<PathBuf>` - Path of the extracted file.
///
/// ## Errors
///
/// Returns `SpaceshipError::Archive` if:
/// - The stream is not valid gzip or not a valid tar archive.
/// - An entry path is absolute or escapes through `..`.
/// - No regular file in the archive matches `name`.
///
/// Writing the extracted file can also fail with an I/O error.
pub fn extract_entry<R: Read>(reader: R, name: &str, out_dir: &Path) -> Result<PathBuf> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let entries = archive
        .entries()
        .map_err(|e| SpaceshipError::Archive(format!("not a gzip tar archive: {}", e)))?;

    for entry in entries {
        let mut entry =
            entry.map_err(|e| SpaceshipError::Archive(format!("corrupt tarball: {}", e)))?;
        let path = entry
            .path()
            .map_err(|e| SpaceshipError::Archive(format!("unreadable entry path: {}", e)))?
            .into_owned();
        check_entry_path(&path)?;

        if !entry.header().entry_type().is_file() {
            continue;
        }
        let entry_name = path.to_string_lossy().replace('\\', "/");
        if !entry_matches(&entry_name, name) {
            continue;
        }

        fs::create_dir_all(out_dir)
            .with_context(|| format!("Failed to create directory {:?}", out_dir))?;
        let target = out_dir.join(name);
        let mut file = File::create(&target)
            .with_context(|| format!("Failed to create {:?}", target))?;
        io::copy(&mut entry, &mut file)
            .map_err(|e| SpaceshipError::Archive(format!("failed to extract {}: {}", entry_name, e)))?;
        debug!("Extracted '{}' to {:?}", entry_name, target);
        return Ok(target);
    }

    Err(SpaceshipError::Archive(format!("'{}' not found in tarball", name)).into())
}

/// Opens a local `.tar.gz` file and extracts `name` from it.
/// See [`extract_entry`].
pub fn extract_file(tarball: &Path, name: &str, out_dir: &Path) -> Result<PathBuf> {
    let file = File::open(tarball)
        .with_context(|| format!("Failed to open tarball {:?}", tarball))?;
    extract_entry(file, name, out_dir)
        .with_context(|| format!("Failed to extract '{}' from {:?}", name, tarball))
}

/// Builds a `.tar.gz` in memory from `(path, content)` pairs.
#[cfg(test)]
pub(crate) fn test_tarball(files: &[(&str, &[u8])]) -> Vec<u8> {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
    for (path, content) in files {
        let mut header = tar::Header::new_gnu();
        header.set_size(content.len() as u64);
        header.set_mode(0o755);
        header.set_entry_type(tar::EntryType::Regular);
        builder.append_data(&mut header, path, *content).unwrap();
    }
    builder.into_inner().unwrap().finish().unwrap()
}

// --- Unit Tests ---
#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::is_error_kind;
    use flate2::write::GzEncoder;
    use flate2::Compression;
    use tempfile::tempdir;

    /// A tarball whose single entry has a raw, unvalidated name.
    fn tarball_with_raw_name(name: &str) -> Vec<u8> {
        let mut header = tar::Header::new_old();
        header.as_old_mut().name[..name.len()].copy_from_slice(name.as_bytes());
        header.set_size(2);
        header.set_mode(0o644);
        header.set_entry_type(tar::EntryType::Regular);
        header.set_cksum();
        let mut builder = tar::Builder::new(GzEncoder::new(Vec::new(), Compression::default()));
        builder.append(&header, &b"hi"[..]).unwrap();
        builder.into_inner().unwrap().finish().unwrap()
    }

    #[test]
    fn test_entry_matches() {
        assert!(entry_matches("faucet", "faucet"));
        assert!(entry_matches("faucet_0.0.3/faucet", "faucet"));
        assert!(!entry_matches("faucet.md", "faucet"));
        assert!(!entry_matches("myfaucet", "faucet"));
    }

    #[test]
    fn test_extract_top_level_entry() -> Result<()> {
        let out = tempdir()?;
        let data = test_tarball(&[("README.md", &b"docs"[..]), ("faucet", &b"\x7fELF faucet"[..])]);
        let path = extract_entry(data.as_slice(), "faucet", out.path())?;
        assert_eq!(path, out.path().join("faucet"));
        assert_eq!(fs::read(&path)?, b"\x7fELF faucet");
        Ok(())
    }

    #[test]
    fn test_extract_nested_entry_by_suffix() -> Result<()> {
        let out = tempdir()?;
        let data = test_tarball(&[("release/bin/marsd", &b"mars binary"[..])]);
        let path = extract_entry(data.as_slice(), "marsd", out.path())?;
        assert_eq!(fs::read(path)?, b"mars binary");
        Ok(())
    }

    #[test]
    fn test_missing_entry() {
        let out = tempdir().unwrap();
        let data = test_tarball(&[("other", &b"x"[..])]);
        let err = extract_entry(data.as_slice(), "faucet", out.path()).unwrap_err();
        assert!(is_error_kind(&err, |e| matches!(e, SpaceshipError::Archive(m) if m.contains("not found"))));
    }

    #[test]
    fn test_not_gzip() {
        let out = tempdir().unwrap();
        let err = extract_entry(&b"PK\x03\x04 zip file"[..], "faucet", out.path()).unwrap_err();
        assert!(is_error_kind(&err, |e| matches!(e, SpaceshipError::Archive(_))));
    }

    #[test]
    fn test_rejects_parent_escape() {
        let out = tempdir().unwrap();
        let data = tarball_with_raw_name("../faucet");
        let err = extract_entry(data.as_slice(), "faucet", out.path()).unwrap_err();
        assert!(is_error_kind(&err, |e| matches!(e, SpaceshipError::Archive(m) if m.contains("invalid path"))));
        assert!(!out.path().join("faucet").exists());
    }

    #[test]
    fn test_rejects_absolute_path() {
        let out = tempdir().unwrap();
        let data = tarball_with_raw_name("/usr/bin/faucet");
        let err = extract_entry(data.as_slice(), "faucet", out.path()).unwrap_err();
        assert!(is_error_kind(&err, |e| matches!(e, SpaceshipError::Archive(_))));
    }

    #[test]
    fn test_extract_file_from_disk() -> Result<()> {
        let dir = tempdir()?;
        let archive = dir.path().join("mars_linux_amd64.tar.gz");
        fs::write(&archive, test_tarball(&[("marsd", &b"bin"[..])]))?;
        let path = extract_file(&archive, "marsd", &dir.path().join("out"))?;
        assert_eq!(fs::read(path)?, b"bin");
        Ok(())
    }
}
