//! # Faucet Command Group
//!
//! File: cli/src/commands/faucet.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! `spaceship faucet <status|start|restart|stop> <host>` controls the faucet on
//! its own, through the `faucet.sh` runner script uploaded by `deploy`. `start`
//! and `restart` take `--faucet-port`, falling back to `faucet.port` from the
//! configuration.
//!
use crate::commands::{connect, disconnect, ensure_initialized, SshArgs};
use crate::common::ssh::log::LogType;
use crate::common::ssh::process::ScriptVerb;
use crate::common::ssh::session::Session;
use crate::core::config::Config;
use crate::core::error::Result;
use clap::{Parser, Subcommand};
use std::io::Write;
use tracing::info;

#[derive(Parser, Debug)]
pub struct FaucetArgs {
    #[command(subcommand)]
    command: FaucetCommand,
}

#[derive(Subcommand, Debug)]
enum FaucetCommand {
    /// Show whether the faucet is running.
    Status(FaucetTarget),
    /// Start the faucet.
    Start(FaucetPortArgs),
    /// Restart the faucet.
    Restart(FaucetPortArgs),
    /// Stop the faucet.
    Stop(FaucetTarget),
}

#[derive(Parser, Debug)]
struct FaucetTarget {
    #[command(flatten)]
    ssh: SshArgs,
}

#[derive(Parser, Debug)]
struct FaucetPortArgs {
    #[command(flatten)]
    ssh: SshArgs,

    /// Port the faucet listens on (default: faucet.port from the configuration).
    #[arg(long)]
    faucet_port: Option<u16>,
}

/// Routes `spaceship faucet <subcommand>`.
pub async fn handle_faucet(args: FaucetArgs, config: &Config, out: &mut dyn Write) -> Result<()> {
    let (verb, ssh, port) = match args.command {
        FaucetCommand::Status(a) => (ScriptVerb::Status, a.ssh, None),
        FaucetCommand::Start(a) => (ScriptVerb::Start, a.ssh, a.faucet_port),
        FaucetCommand::Restart(a) => (ScriptVerb::Restart, a.ssh, a.faucet_port),
        FaucetCommand::Stop(a) => (ScriptVerb::Stop, a.ssh, None),
    };
    info!("Handling faucet {} command", verb.as_str());
    let port = port.unwrap_or(config.faucet.port);

    let session = connect(ssh.existing_workspace_config(config)?, ssh.password).await?;
    let result = run_faucet(&session, verb, port, out).await;
    disconnect(session).await;
    result
}

/// Runs `verb` through the faucet runner script on an open session.
pub async fn run_faucet(
    session: &Session,
    verb: ScriptVerb,
    port: u16,
    out: &mut dyn Write,
) -> Result<()> {
    ensure_initialized(session, LogType::Faucet).await?;
    let output = match verb {
        ScriptVerb::Start => session.faucet_start(port).await?,
        ScriptVerb::Stop => session.faucet_stop().await?,
        ScriptVerb::Restart => session.faucet_restart(port).await?,
        ScriptVerb::Status => session.faucet_status().await?,
    };
    writeln!(out, "{}", output)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::test_support::{deployed, session_with};
    use crate::common::ssh::remote::mock::MockRemote;
    use crate::common::ssh::session::Workspace;
    use crate::core::error::{is_error_kind, SpaceshipError};
    use std::sync::Arc;

    #[test]
    fn test_parse_subcommands() {
        let args = FaucetArgs::try_parse_from(["faucet", "start", "10.0.0.5", "--faucet-port", "8001"])
            .unwrap();
        match args.command {
            FaucetCommand::Start(a) => {
                assert_eq!(a.ssh.host, "10.0.0.5");
                assert_eq!(a.faucet_port, Some(8001));
            }
            other => panic!("unexpected subcommand {:?}", other),
        }
        assert!(FaucetArgs::try_parse_from(["faucet", "stop", "10.0.0.5", "--faucet-port", "1"]).is_err());
    }

    #[tokio::test]
    async fn test_start_uses_port() {
        let remote = Arc::new(MockRemote::new());
        deployed(&remote);
        remote.respond("spaceship/mars/faucet.sh start 8001", "faucet started on port 8001");
        let session = session_with(remote).await;

        let mut out = Vec::new();
        run_faucet(&session, ScriptVerb::Start, 8001, &mut out)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "faucet started on port 8001\n");
    }

    #[tokio::test]
    async fn test_requires_faucet_script() {
        let remote = Arc::new(MockRemote::new());
        // Only the chain runner script exists.
        remote.put_file(&Workspace::new("mars").runner_script(), b"#!/bin/sh", 1);
        let session = session_with(remote).await;

        let mut out = Vec::new();
        let err = run_faucet(&session, ScriptVerb::Status, 4500, &mut out)
            .await
            .unwrap_err();
        assert!(is_error_kind(&err, |e| matches!(
            e,
            SpaceshipError::ServerNotInitialized
        )));
    }
}
