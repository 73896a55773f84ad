//! # Spaceship Error Types
//!
//! File: cli/src/core/error.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! This module defines the error types used throughout Spaceship. Every failure
//! that can happen while deploying to or observing a remote host falls into one
//! of a handful of classes, and each class has a dedicated variant so callers
//! (and tests) can tell them apart by downcasting.
//!
//! ## Architecture
//!
//! The error system consists of two main components:
//! - `SpaceshipError`: A custom error enum using `thiserror` for specific error types
//! - `Result<T>`: A type alias for `anyhow::Result<T>` for flexible error handling
//!
//! The error classes are:
//! - Configuration errors (conflicting or missing SSH options), raised before any network activity
//! - Transport and authentication errors from the SSH handshake
//! - Remote command errors (non-zero exit or failed execution of a remote command)
//! - Transfer errors during uploads
//! - Fetch and archive errors while retrieving release binaries
//!
//! ## Examples
//!
//! ```rust
//! // Return a specific error type
//! return Err(SpaceshipError::Config("ssh username is required".into()).into());
//!
//! // Add context to errors using anyhow
//! let content = fs::read_to_string(&path)
//!     .with_context(|| format!("Failed to read file: {}", path.display()))?;
//!
//! // Pattern matching on error types
//! match session.latest_log(LogType::Chain).await {
//!     Err(e) if matches!(e.downcast_ref::<SpaceshipError>(), Some(SpaceshipError::NoLogFiles { .. })) => {
//!         println!("Nothing deployed yet.");
//!     }
//!     other => { /* ... */ }
//! }
//! ```
//!
use thiserror::Error;

/// Custom error type for the Spaceship application.
#[derive(Error, Debug)]
pub enum SpaceshipError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to connect to {host}: {message}")]
    Transport { host: String, message: String },

    #[error("SSH authentication failed for {user}@{host}")]
    Auth { user: String, host: String },

    #[error("Remote command failed: {cmd}\n{output}")]
    RemoteCommand { cmd: String, output: String },

    #[error("Transfer of '{path}' failed: {message}")]
    Transfer { path: String, message: String },

    #[error("Fetch error: {0}")]
    Fetch(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Binary '{name}' is missing or does not run on the remote host")]
    BinaryMissing { name: String },

    #[error("No log files found in '{dir}'")]
    NoLogFiles { dir: String },

    #[error("Server not initialized. Run `spaceship deploy` first.")]
    ServerNotInitialized,

    #[error("Template rendering error: {source}")]
    Template {
        #[from]
        source: tera::Error,
    },

    #[error("External command failed: {cmd}, Status: {status}, Output:\n{output}")]
    ExternalCommand {
        cmd: String,
        status: String,
        output: String,
    },

    #[error("Operation cancelled")]
    Cancelled,
}

/// Type alias for Result using anyhow::Error for broad compatibility.
/// Anyhow allows for easy context addition and flexible error handling.
pub type Result<T> = anyhow::Result<T>;

/// Returns `true` if the error (or any error in its context chain) is the given
/// `SpaceshipError` class.
pub fn is_error_kind(err: &anyhow::Error, pred: impl Fn(&SpaceshipError) -> bool) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<SpaceshipError>())
        .any(pred)
}
