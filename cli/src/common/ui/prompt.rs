//! # Password Prompt (`common::ui::prompt`)
//!
//! File: cli/src/common/ui/prompt.rs
//! Author: Christi Mahu
//!
use crate::core::error::{Result, SpaceshipError};
use dialoguer::Password;
use secrecy::SecretString;
use std::io::IsTerminal;

/// Asks for the SSH password of `user@host` without echoing it.
///
/// # Errors
///
/// Returns `SpaceshipError::Config` when stdin is not a terminal, so scripted
/// runs fail fast instead of hanging on a prompt.
pub fn ask_password(user: &str, host: &str) -> Result<SecretString> {
    if !std::io::stdin().is_terminal() {
        return Err(SpaceshipError::Config(format!(
            "no credential for {}@{} and no terminal to prompt on, pass --password, --key or --raw-key",
            user, host
        ))
        .into());
    }
    let password = Password::new()
        .with_prompt(format!("Password for {}@{}", user, host))
        .allow_empty_password(false)
        .interact()?;
    Ok(SecretString::from(password))
}
