//! # Spaceship Common Utilities (`common`)
//!
//! File: cli/src/common/mod.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!

//! ## Overview
//!
//! This module is the root of the shared building blocks the command handlers
//! are assembled from. Everything that touches the network, the local
//! filesystem or the terminal lives here, while `commands::` only sequences
//! these pieces and `core::` holds configuration, errors and templates.
//!
//! ## Architecture
//!
//! - **`ssh`**: The SSH session and everything done through it: uploads, remote
//!   process control, log tailing, platform detection.
//! - **`fetch`**: Downloads and caches released binaries such as the faucet.
//! - **`archive`**: Extracts a named file from a `.tar.gz` stream.
//! - **`process`**: The `ChainBuilder` seam and its `ignite` implementation.
//! - **`fs`**: Local directory, file, permission and hashing helpers.
//! - **`ui`**: Progress bar and password prompt.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::{fetch, ssh};
//!
//! let platform = session.target().await?;
//! let faucet = fetch::Fetcher::from_default_dirs()?
//!     .fetch(&fetch::BinarySpec::faucet(&config.faucet), &platform)
//!     .await?;
//! session.upload_faucet_binary(&faucet, None).await?;
//! ```
//!

/// Extraction of single files from gzipped tarballs.
pub mod archive;
/// Release binary download and local cache.
pub mod fetch;
/// Local filesystem helpers.
pub mod fs;
/// Local chain build and init through `ignite`.
pub mod process;
/// SSH session, uploads, remote processes and logs.
pub mod ssh;
/// Progress bar and prompts.
pub mod ui;
