//! # SSH Deployment Utilities (`common::ssh`)
//!
//! File: cli/src/common/ssh/mod.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! Everything Spaceship does on a remote host goes through this module. The
//! central type is [`session::Session`]; the other submodules add capabilities to
//! it with their own `impl Session` blocks.
//!
//! ## Architecture
//!
//! - **`options`**: `SshConfig`, the builder and validation for connection settings.
//! - **`remote`**: The `Remote` transport trait and its `ssh2` implementation.
//! - **`session`**: `Session` and the remote `Workspace` layout; connect and bootstrap.
//! - **`platform`**: Remote OS/architecture detection from `uname`.
//! - **`upload`**: Bounded-concurrency directory uploads with byte-level progress.
//! - **`process`**: Start/stop/restart/status through the runner scripts, existence probes.
//! - **`log`**: Latest log lookup and follow mode.
//!
//! ## Usage
//!
//! ```rust
//! use crate::common::ssh::{options::SshConfig, session::Session};
//!
//! let config = SshConfig::from_uri("ubuntu@10.0.0.5")?.with_key("~/.ssh/id_ed25519");
//! let mut session = Session::new(config.with_workspace("mars"))?;
//! session.connect().await?;
//! let output = session.status().await?;
//! session.close().await?;
//! ```
//!

pub mod log;
pub mod options;
pub mod platform;
pub mod process;
pub mod remote;
pub mod session;
pub mod upload;
