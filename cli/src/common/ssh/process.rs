//! # Remote Process Controller (`common::ssh::process`)
//!
//! File: cli/src/common/ssh/process.rs
//! Author: Christi Mahu
//!
//! ## Overview
//!
//! Starts, stops, restarts and queries the chain node and the faucet on the
//! remote host. Every operation is a single invocation of an uploaded runner
//! script with one verb argument (`run.sh start`, `faucet.sh status`, ...). The
//! script's combined output is returned unchanged. Supervision beyond what the
//! script does is out of scope: no retries, no restart on crash.
//!
//! Existence probes (`has_runner_script`, `has_faucet_script`, `has_genesis`)
//! run `[ -f 'path' ] && echo 'true'` and treat any failure as "absent".
//!
use crate::common::ssh::session::Session;
use crate::core::error::Result;
use tracing::{debug, instrument};

/// Verbs understood by the runner scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptVerb {
    Start,
    Stop,
    Restart,
    Status,
}

impl ScriptVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScriptVerb::Start => "start",
            ScriptVerb::Stop => "stop",
            ScriptVerb::Restart => "restart",
            ScriptVerb::Status => "status",
        }
    }
}

/// Wraps a path in single quotes for the remote shell.
fn quote(path: &str) -> String {
    format!("'{}'", path.replace('\'', r"'\''"))
}

impl Session {
    /// Starts the chain node.
    pub async fn start(&self) -> Result<String> {
        self.run_script(ScriptVerb::Start).await
    }

    pub async fn stop(&self) -> Result<String> {
        self.run_script(ScriptVerb::Stop).await
    }

    pub async fn restart(&self) -> Result<String> {
        self.run_script(ScriptVerb::Restart).await
    }

    pub async fn status(&self) -> Result<String> {
        self.run_script(ScriptVerb::Status).await
    }

    /// Starts the faucet listening on `port`.
    pub async fn faucet_start(&self, port: u16) -> Result<String> {
        self.run_faucet_script(ScriptVerb::Start, Some(port)).await
    }

    pub async fn faucet_stop(&self) -> Result<String> {
        self.run_faucet_script(ScriptVerb::Stop, None).await
    }

    /// Restarts the faucet listening on `port`.
    pub async fn faucet_restart(&self, port: u16) -> Result<String> {
        self.run_faucet_script(ScriptVerb::Restart, Some(port)).await
    }

    pub async fn faucet_status(&self) -> Result<String> {
        self.run_faucet_script(ScriptVerb::Status, None).await
    }

    /// Runs the chain runner script with `verb`.
    ///
    /// # Errors
    ///
    /// A non-zero exit or a transport failure is returned as it is.
    #[instrument(skip(self))]
    pub async fn run_script(&self, verb: ScriptVerb) -> Result<String> {
        let command = format!("{} {}", self.workspace().runner_script(), verb.as_str());
        self.run_command(&command).await
    }

    #[instrument(skip(self))]
    async fn run_faucet_script(&self, verb: ScriptVerb, port: Option<u16>) -> Result<String> {
        let mut command = format!("{} {}", self.workspace().faucet_script(), verb.as_str());
        if let Some(port) = port {
            command.push_str(&format!(" {}", port));
        }
        self.run_command(&command).await
    }

    pub async fn has_runner_script(&self) -> bool {
        self.file_exists(&self.workspace().runner_script()).await
    }

    pub async fn has_faucet_script(&self) -> bool {
        self.file_exists(&self.workspace().faucet_script()).await
    }

    pub async fn has_genesis(&self) -> bool {
        self.file_exists(&self.workspace().genesis()).await
    }

    /// True if a regular file exists at `path`. Never fails.
    pub async fn file_exists(&self, path: &str) -> bool {
        self.exists(path, "-f").await
    }

    async fn exists(&self, path: &str, test: &str) -> bool {
        let command = format!("[ {} {} ] && echo 'true'", test, quote(path));
        match self.run_command(&command).await {
            Ok(output) => output == "true",
            Err(e) => {
                debug!("Existence probe for '{}' failed: {:#}", path, e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::ssh::options::SshConfig;
    use crate::common::ssh::remote::mock::MockRemote;
    use crate::common::ssh::session::Workspace;
    use crate::core::error::{is_error_kind, SpaceshipError};
    use std::sync::Arc;

    async fn session_with(remote: Arc<MockRemote>) -> Session {
        let config = SshConfig::from_uri("10.0.0.5")
            .unwrap()
            .with_password("pw")
            .with_workspace("mars");
        Session::connect_with(config, remote).await.unwrap()
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote("spaceship/x/run.sh"), "'spaceship/x/run.sh'");
        assert_eq!(quote("it's"), r"'it'\''s'");
    }

    #[tokio::test]
    async fn test_start_returns_script_output_unchanged() {
        let remote = Arc::new(MockRemote::new());
        remote.respond(
            "spaceship/mars/run.sh start",
            "marsd started (pid 4242), logging to spaceship/mars/log/chain_1.log",
        );
        let session = session_with(remote.clone()).await;

        let output = session.start().await.unwrap();
        assert_eq!(
            output,
            "marsd started (pid 4242), logging to spaceship/mars/log/chain_1.log"
        );
        assert_eq!(
            remote.commands().last().unwrap(),
            "spaceship/mars/run.sh start"
        );
    }

    #[tokio::test]
    async fn test_all_verbs() {
        let remote = Arc::new(MockRemote::new());
        let session = session_with(remote.clone()).await;
        session.stop().await.unwrap();
        session.restart().await.unwrap();
        session.status().await.unwrap();
        session.faucet_start(4500).await.unwrap();
        session.faucet_restart(4600).await.unwrap();
        session.faucet_stop().await.unwrap();
        session.faucet_status().await.unwrap();
        assert_eq!(
            remote.commands(),
            vec![
                "spaceship/mars/run.sh stop",
                "spaceship/mars/run.sh restart",
                "spaceship/mars/run.sh status",
                "spaceship/mars/faucet.sh start 4500",
                "spaceship/mars/faucet.sh restart 4600",
                "spaceship/mars/faucet.sh stop",
                "spaceship/mars/faucet.sh status",
            ]
        );
    }

    #[tokio::test]
    async fn test_script_failure_is_surfaced() {
        let remote = Arc::new(MockRemote::new());
        remote.fail("spaceship/mars/run.sh stop", "exit status 1: kill: permission denied");
        let session = session_with(remote).await;
        let err = session.stop().await.unwrap_err();
        assert!(is_error_kind(&err, |e| matches!(
            e,
            SpaceshipError::RemoteCommand { output, .. } if output.contains("permission denied")
        )));
    }

    #[tokio::test]
    async fn test_probes() {
        let remote = Arc::new(MockRemote::new());
        let session = session_with(remote.clone()).await;
        let ws = Workspace::new("mars");

        assert!(!session.has_runner_script().await);
        assert!(!session.has_genesis().await);
        remote.put_file(&ws.runner_script(), b"#!/bin/sh", 1);
        remote.put_file(&ws.genesis(), b"{}", 1);
        assert!(session.has_runner_script().await);
        assert!(session.has_genesis().await);
        assert!(!session.has_faucet_script().await);
        assert!(remote.has_dir(&ws.home()));
        assert!(
            remote
                .commands()
                .contains(&"[ -f 'spaceship/mars/run.sh' ] && echo 'true'".to_string())
        );
    }

    #[tokio::test]
    async fn test_probe_failure_degrades_to_false() {
        let remote = Arc::new(MockRemote::new());
        let session = session_with(remote.clone()).await;
        remote.put_file("spaceship/mars/home/config/genesis.json", b"{}", 1);
        remote.fail(
            "[ -f 'spaceship/mars/home/config/genesis.json' ] && echo 'true'",
            "connection reset",
        );
        assert!(!session.has_genesis().await);

        // Unexpected output is not "true" either.
        remote.respond("[ -f 'spaceship/mars/run.sh' ] && echo 'true'", "yes");
        assert!(!session.has_runner_script().await);
    }
}
