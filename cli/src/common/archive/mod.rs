//! # Archive Utilities Module (`common::archive`)
//!
//! File: cli/src/common/archive/mod.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! Spaceship receives binaries packed as gzip-compressed tarballs in two places:
//! the release tarball of the faucet downloaded by the fetcher, and the tarball
//! produced by `ignite chain build --release` for the chain binary. Both only
//! need a single named file out of the archive.
//!
//! ## Architecture
//!
//! - **`tar`**: Locates one entry inside a `.tar.gz` stream and writes it to a
//!   directory, refusing entries that would escape that directory.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::archive;
//! use std::path::Path;
//!
//! let binary = archive::tar::extract_file(
//!     Path::new("release/mars_linux_amd64.tar.gz"),
//!     "marsd",
//!     Path::new("release"),
//! )?;
//! ```
//!

pub mod tar;
