//! # Log Tailer (`common::ssh::log`)
//!
//! File: cli/src/common/ssh/log.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! The runner scripts write one log file per start into the workspace `log/`
//! directory, named `<app>_<timestamp>.log`. This module finds the most
//! recently modified one for an app and either returns its content or follows
//! it, sending new lines to a channel.
//!
//! ## Behavior
//!
//! - Only non-directory entries named `<app>_*.log` are considered.
//! - The newest file wins. Equal modification times are broken by the
//!   lexicographically greatest path, so the choice is deterministic.
//! - Zero matching files is `SpaceshipError::NoLogFiles`, so callers can tell
//!   "nothing deployed yet" apart from "deployed but silent".
//! - Follow mode polls the file size once per interval, starting at the size
//!   it had when following began. A partial trailing line is buffered until its
//!   newline arrives. If the file shrinks it is read again from the start.
//!   Cancelling the token ends the loop at the next poll.
//!
use crate::common::ssh::remote::RemoteEntry;
use crate::common::ssh::session::Session;
use crate::core::error::{Result, SpaceshipError};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const LOG_EXTENSION: &str = ".log";

/// Poll interval used by `spaceship log --real-time`.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// The process a log file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogType {
    Chain,
    Faucet,
}

impl LogType {
    pub fn all() -> [LogType; 2] {
        [LogType::Chain, LogType::Faucet]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogType::Chain => "chain",
            LogType::Faucet => "faucet",
        }
    }

    fn matches(&self, file_name: &str) -> bool {
        file_name.starts_with(&format!("{}_", self.as_str())) && file_name.ends_with(LOG_EXTENSION)
    }
}

impl fmt::Display for LogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogType {
    type Err = SpaceshipError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        LogType::all()
            .into_iter()
            .find(|t| t.as_str() == s.trim().to_lowercase())
            .ok_or_else(|| {
                let valid: Vec<_> = LogType::all().iter().map(|t| t.as_str()).collect();
                SpaceshipError::Config(format!(
                    "invalid log type '{}', expected one of: {}",
                    s,
                    valid.join(", ")
                ))
            })
    }
}

/// Picks the newest entry, breaking ties by the greatest path.
fn select_latest(entries: Vec<RemoteEntry>) -> Option<RemoteEntry> {
    entries
        .into_iter()
        .max_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.path.cmp(&b.path)))
}

/// Returns the last `n` lines of `content`.
pub fn last_lines(content: &[u8], n: usize) -> String {
    let text = String::from_utf8_lossy(content);
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}

impl Session {
    async fn log_files(&self, log_type: LogType) -> Result<Vec<RemoteEntry>> {
        let entries = self.remote()?.read_dir(&self.workspace().log()).await?;
        Ok(entries
            .into_iter()
            .filter(|e| !e.is_dir && log_type.matches(&e.name))
            .collect())
    }

    /// The most recently modified log file of `log_type`.
    ///
    /// # Errors
    ///
    /// Returns `SpaceshipError::NoLogFiles` if there is none.
    pub async fn latest_log_entry(&self, log_type: LogType) -> Result<RemoteEntry> {
        let files = self.log_files(log_type).await?;
        debug!("Found {} {} log files", files.len(), log_type);
        select_latest(files).ok_or_else(|| {
            SpaceshipError::NoLogFiles {
                dir: self.workspace().log(),
            }
            .into()
        })
    }

    /// Content of the most recently modified log file of `log_type`.
    pub async fn latest_log(&self, log_type: LogType) -> Result<Vec<u8>> {
        let entry = self.latest_log_entry(log_type).await?;
        info!("Reading log file {}", entry.path);
        self.remote()?.read_file(&entry.path).await
    }

    /// Sends every new line of the latest log file to `lines` until `cancel` fires
    /// or the receiver is dropped.
    ///
    /// # Arguments
    ///
    /// * `log_type` - Which app's log to follow.
    /// * `lines` - Receives complete lines without their trailing newline.
    /// * `cancel` - Ends the loop, checked between polls.
    /// * `interval` - Time between two polls.
    ///
    /// # Errors
    ///
    /// Returns `SpaceshipError::NoLogFiles` if there is no log to follow, or the
    /// first transport error while polling.
    pub async fn follow_log(
        &self,
        log_type: LogType,
        lines: mpsc::Sender<String>,
        cancel: CancellationToken,
        interval: Duration,
    ) -> Result<()> {
        let entry = self.latest_log_entry(log_type).await?;
        let remote = self.remote()?.clone();
        let mut offset = remote.stat_size(&entry.path).await?;
        let mut partial: Vec<u8> = Vec::new();
        info!("Following {} from byte {}", entry.path, offset);

        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = ticker.tick() => {}
            }

            let size = remote.stat_size(&entry.path).await?;
            if size < offset {
                debug!("{} was truncated, reading from the start", entry.path);
                offset = 0;
                partial.clear();
            }
            if size == offset {
                continue;
            }

            let chunk = remote.read_from(&entry.path, offset).await?;
            offset += chunk.len() as u64;
            partial.extend_from_slice(&chunk);

            // Decode only whole lines, a poll can end inside a multi-byte character.
            while let Some(pos) = partial.iter().position(|&b| b == b'\n') {
                let raw: Vec<u8> = partial.drain(..=pos).collect();
                let line = String::from_utf8_lossy(&raw)
                    .trim_end_matches(['\n', '\r'])
                    .to_string();
                tokio::select! {
                    _ = cancel.cancelled() => return Ok(()),
                    sent = lines.send(line) => {
                        if sent.is_err() {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
