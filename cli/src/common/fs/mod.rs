//! # Filesystem Utilities (`common::fs`)
//!
//! File: cli/src/common/fs/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Local filesystem helpers shared by the fetcher, the script renderer and the
//! deploy command. Callers import from the submodule directly, e.g.
//! `crate::common::fs::io::ensure_dir_exists`.
//!

/// Directory creation, file writes, permissions and hashing.
pub mod io;
