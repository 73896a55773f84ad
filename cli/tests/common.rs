//! # Spaceship CLI Integration Test Common Helpers
//!
//! File: cli/tests/common.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Shared helpers for the integration tests in `cli/tests/`. Each test runs
//! the compiled `spaceship` binary inside a throwaway directory that doubles
//! as `HOME`, so neither the user configuration nor the binary cache of the
//! machine running the tests is touched.
//!

// Different test files use different helpers.
#![allow(dead_code)]

pub use assert_cmd::Command;
use std::fs;
use tempfile::TempDir;

/// An isolated working directory for one invocation.
pub struct Sandbox {
    dir: TempDir,
}

impl Sandbox {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("Failed to create sandbox directory");
        // Stops the project config search from walking above the sandbox.
        fs::create_dir(dir.path().join(".git")).expect("Failed to create .git marker");
        Self { dir }
    }

    /// Writes `.spaceship.toml` into the sandbox.
    pub fn with_project_config(self, content: &str) -> Self {
        fs::write(self.dir.path().join(".spaceship.toml"), content)
            .expect("Failed to write project configuration");
        self
    }

    /// A `spaceship` command running in the sandbox.
    pub fn cmd(&self) -> Command {
        let root = self.dir.path();
        let mut cmd = spaceship_cmd();
        cmd.current_dir(root)
            .env("HOME", root)
            .env("XDG_CONFIG_HOME", root.join(".config"))
            .env("XDG_CACHE_HOME", root.join(".cache"))
            .env_remove("SPACESHIP_SSH_PASSWORD")
            .env_remove("SPACESHIP_SSH_RAW_KEY")
            .env_remove("RUST_LOG");
        cmd
    }
}

/// # Get Spaceship Command (`spaceship_cmd`)
///
/// Creates an `assert_cmd::Command` for the compiled `spaceship` binary.
///
/// ## Panics
/// Panics if the binary cannot be found via `Command::cargo_bin`.
pub fn spaceship_cmd() -> Command {
    Command::cargo_bin("spaceship").expect("Failed to find spaceship binary for testing")
}
