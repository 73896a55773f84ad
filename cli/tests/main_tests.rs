//! # Spaceship CLI Main Integration Tests
//!
//! File: cli/tests/main_tests.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Verifies the top-level behavior of the `spaceship` command-line interface:
//! `--version`, `--help`, the `help` subcommand and argument errors.
//!
mod common;
use common::*;
use predicates::prelude::*;

#[test]
fn test_version_flag() {
    spaceship_cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

/// Every top-level command is listed in the help output.
#[test]
fn test_help_lists_commands() {
    let assert = spaceship_cmd().arg("--help").assert().success();
    let stdout = String::from_utf8_lossy(&assert.get_output().stdout).to_string();
    for command in ["deploy", "log", "status", "restart", "stop", "faucet"] {
        assert!(stdout.contains(command), "help is missing '{}'", command);
    }
}

#[test]
fn test_help_subcommand() {
    spaceship_cmd()
        .args(["help", "deploy"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--init-chain"))
        .stdout(predicate::str::contains("--faucet-port"));
}

#[test]
fn test_unknown_command_fails() {
    spaceship_cmd()
        .arg("launch")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unrecognized subcommand"));
}

#[test]
fn test_missing_host_fails() {
    spaceship_cmd()
        .arg("status")
        .assert()
        .failure()
        .stderr(predicate::str::contains("<HOST>"));
}
