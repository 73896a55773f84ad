//! # Log Command Handler
//!
//! File: cli/src/commands/log.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! `spaceship log <host>` prints the last `--lines` lines of the newest log
//! file of the chain (or the faucet, with `--app faucet`). With `--real-time`
//! it keeps following that file until interrupted with Ctrl-C.
//!
//! ## Architecture
//!
//! Following runs two futures side by side on the current task: the log tailer
//! sends lines into a bounded channel and the printer drains it into the
//! output writer. Cancelling the token stops the tailer, which drops the
//! sender and lets the printer finish. An interrupted follow is reported as
//! `SpaceshipError::Cancelled`, like every other interrupted command.
//!
use crate::commands::{connect, ctrl_c_token, disconnect, ensure_initialized, SshArgs};
use crate::common::ssh::log::{last_lines, LogType, DEFAULT_POLL_INTERVAL};
use crate::common::ssh::session::Session;
use crate::core::config::Config;
use crate::core::error::{Result, SpaceshipError};
use clap::Parser;
use std::io::Write;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::info;

const FOLLOW_BUFFER: usize = 100;

#[derive(Parser, Debug)]
pub struct LogArgs {
    #[command(flatten)]
    pub ssh: SshArgs,

    /// Number of lines to print from the end of the latest log.
    #[arg(long, default_value_t = 100)]
    pub lines: usize,

    /// Keep printing new lines as they are written.
    #[arg(long)]
    pub real_time: bool,

    /// Which log to read: chain or faucet.
    #[arg(long, default_value = "chain")]
    pub app: LogType,
}

pub async fn handle_log(args: LogArgs, config: &Config, out: &mut dyn Write) -> Result<()> {
    info!("Handling log command for the {} log", args.app);
    let ssh = args.ssh.existing_workspace_config(config)?;
    let session = connect(ssh, args.ssh.password).await?;
    let cancel = ctrl_c_token();
    let result = run_log(
        &session,
        &args,
        out,
        cancel,
        DEFAULT_POLL_INTERVAL,
    )
    .await;
    disconnect(session).await;
    result
}

/// Prints the tail of the latest log and optionally follows it.
///
/// # Errors
///
/// `SpaceshipError::ServerNotInitialized` if the app was never deployed and
/// `SpaceshipError::NoLogFiles` if it has not written a log yet.
pub async fn run_log(
    session: &Session,
    args: &LogArgs,
    out: &mut dyn Write,
    cancel: CancellationToken,
    interval: Duration,
) -> Result<()> {
    ensure_initialized(session, args.app).await?;

    let content = session.latest_log(args.app).await?;
    let tail = last_lines(&content, args.lines);
    if !tail.is_empty() {
        writeln!(out, "{}", tail)?;
    }
    out.flush()?;

    if !args.real_time {
        return Ok(());
    }

    let (tx, mut rx) = mpsc::channel(FOLLOW_BUFFER);
    let follow = session.follow_log(args.app, tx, cancel.clone(), interval);
    let print = async {
        while let Some(line) = rx.recv().await {
            writeln!(out, "{}", line)?;
            out.flush()?;
        }
        Ok::<(), std::io::Error>(())
    };
    let (followed, printed) = tokio::join!(follow, print);
    printed?;
    followed?;
    // Without cancellation following only stops on an error.
    if cancel.is_cancelled() {
        return Err(SpaceshipError::Cancelled.into());
    }
    Ok(())
}
