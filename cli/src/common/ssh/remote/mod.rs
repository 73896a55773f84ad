//! # Remote Transport (`common::ssh::remote`)
//!
//! File: cli/src/common/ssh/remote/mod.rs
//! Author: Christi Mahu
//!
//! **DISCLAIMER:** This repository is in the early phases of development
//! and is not suitable for production deployments yet.
//!
//! ## Overview
//!
//! Defines the [`Remote`] trait, the narrow set of operations the uploader, the
//! process controller and the log tailer need from a connected host, and
//! [`SshRemote`], its implementation over `ssh2` (channel exec plus SFTP).
//!
//! ## Architecture
//!
//! `ssh2` is a blocking library. Every call runs inside
//! `tokio::task::spawn_blocking` on a clone of the session handle. SFTP file
//! operations use independent handles and can run concurrently. Command
//! execution is serialized through an async mutex, so only one remote command
//! is in flight per session.
//!
//! Remote paths are POSIX strings. Relative paths resolve against the login
//! directory of the SSH user.
//!
//! The `mock` submodule (tests only) provides an in-memory implementation.
//!
use crate::common::ssh::options::{Auth, SshConfig};
use crate::core::error::{Result, SpaceshipError};
use anyhow::{anyhow, Context};
use async_trait::async_trait;
use secrecy::ExposeSecret;
use ssh2::{FileStat, KeyboardInteractivePrompt, Prompt, Session, Sftp};
use std::io::{Read, Seek, SeekFrom};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

#[cfg(test)]
pub mod mock;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// A directory entry on the remote host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteEntry {
    pub name: String,
    pub path: String,
    pub is_dir: bool,
    pub size: u64,
    /// Modification time in seconds since the Unix epoch.
    pub modified: u64,
}

/// Operations on a connected remote host.
#[async_trait]
pub trait Remote: Send + Sync {
    /// Runs a shell command and returns its combined stdout/stderr, trimmed.
    ///
    /// A non-zero exit status is a `SpaceshipError::RemoteCommand` carrying the output.
    async fn exec(&self, command: &str) -> Result<String>;

    /// Creates a directory and all missing parents. Existing directories are not an error.
    async fn mkdir_all(&self, path: &str) -> Result<()>;

    /// Creates or truncates `path` and streams `reader` into it. Returns the bytes written.
    async fn write_file(&self, path: &str, reader: Box<dyn Read + Send>) -> Result<u64>;

    async fn chmod(&self, path: &str, mode: u32) -> Result<()>;

    async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>>;

    /// Reads a whole file at its current size.
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        self.read_from(path, 0).await
    }

    /// Reads a file from `offset` to its current end.
    async fn read_from(&self, path: &str, offset: u64) -> Result<Vec<u8>>;

    async fn stat_size(&self, path: &str) -> Result<u64>;

    async fn close(&self) -> Result<()>;
}

/// [`Remote`] over an authenticated `ssh2` session.
pub struct SshRemote {
    host: String,
    session: Session,
    sftp: Arc<Sftp>,
    exec_lock: Mutex<()>,
}

impl SshRemote {
    /// Opens the TCP connection, performs the SSH handshake, authenticates and
    /// opens the SFTP subsystem.
    ///
    /// # Errors
    ///
    /// * `SpaceshipError::Transport` if the host cannot be reached or the handshake fails.
    /// * `SpaceshipError::Auth` if the server rejects the credential.
    pub async fn connect(config: &SshConfig) -> Result<Self> {
        let host = config.host().to_string();
        let port = config.port();
        let user = config.user().to_string();
        let auth = config.auth();
        info!("Connecting to {}@{}:{}", user, host, port);
        tokio::task::spawn_blocking(move || Self::connect_blocking(host, port, user, auth))
            .await
            .context("SSH connect task failed")?
    }

    fn connect_blocking(host: String, port: u16, user: String, auth: Auth) -> Result<Self> {
        let transport = |message: String| SpaceshipError::Transport {
            host: host.clone(),
            message,
        };

        let addr = (host.as_str(), port)
            .to_socket_addrs()
            .map_err(|e| transport(e.to_string()))?
            .next()
            .ok_or_else(|| transport("host did not resolve to any address".to_string()))?;
        let tcp = TcpStream::connect_timeout(&addr, CONNECT_TIMEOUT)
            .map_err(|e| transport(e.to_string()))?;

        let mut session = Session::new().map_err(|e| transport(e.to_string()))?;
        session.set_tcp_stream(tcp);
        session.set_timeout(CONNECT_TIMEOUT.as_millis() as u32);
        session.handshake().map_err(|e| transport(e.to_string()))?;

        authenticate(&session, &user, &auth);
        if !session.authenticated() {
            return Err(SpaceshipError::Auth { user, host }.into());
        }
        // Remote commands like `run.sh stop` may legitimately block for a while.
        session.set_timeout(0);
        debug!("Authenticated as {}@{}", user, host);

        let sftp = session
            .sftp()
            .map_err(|e| transport(format!("failed to open SFTP channel: {}", e)))?;

        Ok(Self {
            host,
            session,
            sftp: Arc::new(sftp),
            exec_lock: Mutex::new(()),
        })
    }
}

/// Tries the resolved credential. Success is checked by the caller through
/// `Session::authenticated`.
fn authenticate(session: &Session, user: &str, auth: &Auth) {
    let outcome = match auth {
        Auth::RawKey { key, passphrase } => session.userauth_pubkey_memory(
            user,
            None,
            key.expose_secret(),
            passphrase.as_ref().map(|p| p.expose_secret()),
        ),
        Auth::KeyFile { path, passphrase } => session.userauth_pubkey_file(
            user,
            None,
            path,
            passphrase.as_ref().map(|p| p.expose_secret()),
        ),
        Auth::Password(password) => session
            .userauth_password(user, password.expose_secret())
            .or_else(|_| {
                let mut prompter = PasswordPrompter(password.expose_secret().to_string());
                session.userauth_keyboard_interactive(user, &mut prompter)
            }),
        Auth::Interactive => {
            let mut prompter = PasswordPrompter(String::new());
            session.userauth_keyboard_interactive(user, &mut prompter)
        }
    };
    if let Err(e) = outcome {
        debug!("Authentication attempt failed: {}", e);
    }
}

/// Answers every keyboard-interactive prompt with the same password.
struct PasswordPrompter(String);

impl KeyboardInteractivePrompt for PasswordPrompter {
    fn prompt<'a>(
        &mut self,
        _username: &str,
        _instructions: &str,
        prompts: &[Prompt<'a>],
    ) -> Vec<String> {
        prompts.iter().map(|_| self.0.clone()).collect()
    }
}

async fn blocking<T, F>(f: F) -> Result<T>
where
    F: FnOnce() -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .context("SSH worker task failed")?
}

fn transfer_error(path: &str, message: impl ToString) -> anyhow::Error {
    anyhow!(SpaceshipError::Transfer {
        path: path.to_string(),
        message: message.to_string(),
    })
}

/// Maps an I/O error raised while streaming a file. A `SpaceshipError` carried
/// inside the I/O error (for example `Cancelled` from the progress reader) is
/// returned unchanged.
pub(crate) fn io_transfer_error(path: &str, err: std::io::Error) -> anyhow::Error {
    let message = err.to_string();
    match err.into_inner() {
        Some(inner) => match inner.downcast::<SpaceshipError>() {
            Ok(err) => anyhow!(*err),
            Err(other) => transfer_error(path, other),
        },
        None => transfer_error(path, message),
    }
}

fn sftp_mkdir_all(sftp: &Sftp, path: &str) -> Result<()> {
    let mut current = String::new();
    if path.starts_with('/') {
        current.push('/');
    }
    for component in path.split('/').filter(|c| !c.is_empty() && *c != ".") {
        if !current.is_empty() && !current.ends_with('/') {
            current.push('/');
        }
        current.push_str(component);
        let dir = Path::new(&current);
        if sftp.stat(dir).is_ok() {
            continue;
        }
        if let Err(e) = sftp.mkdir(dir, 0o755) {
            // Another worker may have created it in the meantime.
            if !sftp.stat(dir).map(|s| s.is_dir()).unwrap_or(false) {
                return Err(transfer_error(&current, format!("mkdir failed: {}", e)));
            }
        }
    }
    Ok(())
}

#[async_trait]
impl Remote for SshRemote {
    #[instrument(skip(self), fields(host = %self.host))]
    async fn exec(&self, command: &str) -> Result<String> {
        let _guard = self.exec_lock.lock().await;
        let session = self.session.clone();
        let cmd = command.to_string();
        blocking(move || {
            let run = || -> std::result::Result<(String, i32), String> {
                let mut channel = session.channel_session().map_err(|e| e.to_string())?;
                channel
                    .handle_extended_data(ssh2::ExtendedData::Merge)
                    .map_err(|e| e.to_string())?;
                channel.exec(&cmd).map_err(|e| e.to_string())?;
                let mut raw = Vec::new();
                channel.read_to_end(&mut raw).map_err(|e| e.to_string())?;
                channel.wait_close().map_err(|e| e.to_string())?;
                let status = channel.exit_status().map_err(|e| e.to_string())?;
                Ok((String::from_utf8_lossy(&raw).into_owned(), status))
            };
            match run() {
                Ok((output, 0)) => Ok(output.trim().to_string()),
                Ok((output, status)) => Err(SpaceshipError::RemoteCommand {
                    cmd: cmd.clone(),
                    output: format!("exit status {}: {}", status, output.trim()),
                }
                .into()),
                Err(message) => Err(SpaceshipError::RemoteCommand {
                    cmd: cmd.clone(),
                    output: message,
                }
                .into()),
            }
        })
        .await
    }

    async fn mkdir_all(&self, path: &str) -> Result<()> {
        let sftp = self.sftp.clone();
        let path = path.to_string();
        blocking(move || sftp_mkdir_all(&sftp, &path)).await
    }

    async fn write_file(&self, path: &str, mut reader: Box<dyn Read + Send>) -> Result<u64> {
        let sftp = self.sftp.clone();
        let path = path.to_string();
        blocking(move || {
            let mut file = sftp
                .create(Path::new(&path))
                .map_err(|e| transfer_error(&path, format!("create failed: {}", e)))?;
            std::io::copy(&mut reader, &mut file).map_err(|e| io_transfer_error(&path, e))
        })
        .await
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        let sftp = self.sftp.clone();
        let path = path.to_string();
        blocking(move || {
            let stat = FileStat {
                size: None,
                uid: None,
                gid: None,
                perm: Some(mode),
                atime: None,
                mtime: None,
            };
            sftp.setstat(Path::new(&path), stat)
                .map_err(|e| transfer_error(&path, format!("chmod {:o} failed: {}", mode, e)))
        })
        .await
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let sftp = self.sftp.clone();
        let dir = path.to_string();
        blocking(move || {
            let entries = sftp
                .readdir(Path::new(&dir))
                .with_context(|| format!("Failed to read remote directory '{}'", dir))?;
            Ok(entries
                .into_iter()
                .filter_map(|(path, stat)| {
                    let name = path.file_name()?.to_string_lossy().into_owned();
                    Some(RemoteEntry {
                        path: format!("{}/{}", dir.trim_end_matches('/'), name),
                        name,
                        is_dir: stat.is_dir(),
                        size: stat.size.unwrap_or(0),
                        modified: stat.mtime.unwrap_or(0),
                    })
                })
                .collect())
        })
        .await
    }

    async fn read_from(&self, path: &str, offset: u64) -> Result<Vec<u8>> {
        let sftp = self.sftp.clone();
        let path = path.to_string();
        blocking(move || {
            let mut file = sftp
                .open(Path::new(&path))
                .with_context(|| format!("Failed to open remote file '{}'", path))?;
            if offset > 0 {
                file.seek(SeekFrom::Start(offset))
                    .with_context(|| format!("Failed to seek in '{}'", path))?;
            }
            let mut buffer = Vec::new();
            file.read_to_end(&mut buffer)
                .with_context(|| format!("Failed to read remote file '{}'", path))?;
            Ok(buffer)
        })
        .await
    }

    async fn stat_size(&self, path: &str) -> Result<u64> {
        let sftp = self.sftp.clone();
        let path = path.to_string();
        blocking(move || {
            let stat = sftp
                .stat(Path::new(&path))
                .with_context(|| format!("Failed to stat remote file '{}'", path))?;
            Ok(stat.size.unwrap_or(0))
        })
        .await
    }

    async fn close(&self) -> Result<()> {
        let session = self.session.clone();
        let host = self.host.clone();
        blocking(move || {
            session
                .disconnect(None, "closing connection", None)
                .map_err(|e| {
                    anyhow!(SpaceshipError::Transport {
                        host,
                        message: e.to_string(),
                    })
                })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_transfer_error_keeps_cancellation() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, SpaceshipError::Cancelled);
        let err = io_transfer_error("spaceship/x/bin/app", io);
        assert!(matches!(
            err.downcast_ref::<SpaceshipError>(),
            Some(SpaceshipError::Cancelled)
        ));
    }

    #[test]
    fn test_io_transfer_error_wraps_plain_io() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err = io_transfer_error("spaceship/x/bin/app", io);
        match err.downcast_ref::<SpaceshipError>() {
            Some(SpaceshipError::Transfer { path, message }) => {
                assert_eq!(path, "spaceship/x/bin/app");
                assert!(message.contains("pipe closed"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_password_prompter_answers_every_prompt() {
        let mut prompter = PasswordPrompter("hunter2".to_string());
        let prompts = [
            Prompt {
                text: "Password: ".into(),
                echo: false,
            },
            Prompt {
                text: "Token: ".into(),
                echo: false,
            },
        ];
        assert_eq!(
            prompter.prompt("root", "", &prompts),
            vec!["hunter2".to_string(), "hunter2".to_string()]
        );
    }
}
