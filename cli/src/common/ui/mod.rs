//! # Terminal UI Utilities (`common::ui`)
//!
//! File: cli/src/common/ui/mod.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Interactive pieces of the command-line experience, kept away from the
//! command handlers so those stay testable with a plain writer.
//!
//! - **`progress`**: An `indicatif` byte progress bar that plugs into the
//!   uploader as a progress callback.
//! - **`prompt`**: The `dialoguer` password prompt used when no SSH credential
//!   was supplied.
//!

pub mod progress;
pub mod prompt;
