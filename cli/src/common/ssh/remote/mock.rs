//! In-memory [`Remote`] used by unit tests.
//!
//! File: cli/src/common/ssh/remote/mock.rs
//!
//! Keeps files and directories in maps, answers scripted commands, records
//! every executed command and tracks how many writes were in flight at once.
//! Existence probes of the form `[ -f 'path' ] && echo 'true'` (and `-d`) are
//! answered from the in-memory filesystem when no response was scripted.

use super::{io_transfer_error, Remote, RemoteEntry};
use crate::core::error::{Result, SpaceshipError};
use anyhow::anyhow;
use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::Read;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
struct MockFile {
    data: Vec<u8>,
    mode: u32,
    modified: u64,
}

#[derive(Default)]
struct State {
    files: BTreeMap<String, MockFile>,
    dirs: BTreeSet<String>,
    responses: HashMap<String, std::result::Result<String, String>>,
    commands: Vec<String>,
    failing_writes: BTreeSet<String>,
    in_flight: usize,
    max_in_flight: usize,
    closed: bool,
}

#[derive(Default)]
pub struct MockRemote {
    state: Mutex<State>,
    write_delay: Option<Duration>,
}

fn parent(path: &str) -> &str {
    path.rsplit_once('/').map(|(p, _)| p).unwrap_or("")
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delays every write so concurrent uploads overlap.
    pub fn with_write_delay(mut self, delay: Duration) -> Self {
        self.write_delay = Some(delay);
        self
    }

    fn state(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Scripts a successful response for an exact command line.
    pub fn respond(&self, command: &str, output: &str) {
        self.state()
            .responses
            .insert(command.to_string(), Ok(output.to_string()));
    }

    /// Scripts a failing response for an exact command line.
    pub fn fail(&self, command: &str, output: &str) {
        self.state()
            .responses
            .insert(command.to_string(), Err(output.to_string()));
    }

    /// Makes every write to `path` fail.
    pub fn fail_write(&self, path: &str) {
        self.state().failing_writes.insert(path.to_string());
    }

    /// Creates a file (and its parent directories) with a modification time.
    pub fn put_file(&self, path: &str, data: &[u8], modified: u64) {
        let mut state = self.state();
        insert_dirs(&mut state, parent(path));
        state.files.insert(
            path.to_string(),
            MockFile {
                data: data.to_vec(),
                mode: 0o644,
                modified,
            },
        );
    }

    pub fn append(&self, path: &str, data: &[u8]) {
        let mut state = self.state();
        if let Some(file) = state.files.get_mut(path) {
            file.data.extend_from_slice(data);
        }
    }

    pub fn put_dir(&self, path: &str) {
        insert_dirs(&mut self.state(), path);
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state().files.get(path).map(|f| f.data.clone())
    }

    pub fn mode(&self, path: &str) -> Option<u32> {
        self.state().files.get(path).map(|f| f.mode)
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state().dirs.contains(path)
    }

    pub fn file_paths(&self) -> Vec<String> {
        self.state().files.keys().cloned().collect()
    }

    pub fn commands(&self) -> Vec<String> {
        self.state().commands.clone()
    }

    pub fn max_in_flight(&self) -> usize {
        self.state().max_in_flight
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }
}

fn insert_dirs(state: &mut State, path: &str) {
    let mut current = String::new();
    for component in path.split('/').filter(|c| !c.is_empty()) {
        if !current.is_empty() {
            current.push('/');
        }
        current.push_str(component);
        state.dirs.insert(current.clone());
    }
}

fn probe_target(command: &str) -> Option<String> {
    let rest = command.strip_prefix("[ -f '")?;
    let path = rest.strip_suffix("' ] && echo 'true'")?;
    Some(path.to_string())
}

#[async_trait]
impl Remote for MockRemote {
    async fn exec(&self, command: &str) -> Result<String> {
        let mut state = self.state();
        state.commands.push(command.to_string());
        let failed = |output: String| -> anyhow::Error {
            anyhow!(SpaceshipError::RemoteCommand {
                cmd: command.to_string(),
                output,
            })
        };
        if let Some(response) = state.responses.get(command) {
            return response.clone().map_err(failed);
        }
        if let Some(path) = probe_target(command) {
            return if state.files.contains_key(&path) {
                Ok("true".to_string())
            } else {
                Err(failed("exit status 1: ".to_string()))
            };
        }
        Ok(String::new())
    }

    async fn mkdir_all(&self, path: &str) -> Result<()> {
        insert_dirs(&mut self.state(), path);
        Ok(())
    }

    async fn write_file(&self, path: &str, mut reader: Box<dyn Read + Send>) -> Result<u64> {
        {
            let mut state = self.state();
            let dir = parent(path);
            if !dir.is_empty() && !state.dirs.contains(dir) {
                return Err(anyhow!(SpaceshipError::Transfer {
                    path: path.to_string(),
                    message: format!("no such directory '{}'", dir),
                }));
            }
            state.in_flight += 1;
            state.max_in_flight = state.max_in_flight.max(state.in_flight);
        }
        if let Some(delay) = self.write_delay {
            tokio::time::sleep(delay).await;
        }

        let mut data = Vec::new();
        let read = reader.read_to_end(&mut data);
        let mut state = self.state();
        state.in_flight -= 1;
        read.map_err(|e| io_transfer_error(path, e))?;
        if state.failing_writes.contains(path) {
            return Err(anyhow!(SpaceshipError::Transfer {
                path: path.to_string(),
                message: "injected failure".to_string(),
            }));
        }
        let written = data.len() as u64;
        state.files.insert(
            path.to_string(),
            MockFile {
                data,
                mode: 0o644,
                modified: 0,
            },
        );
        Ok(written)
    }

    async fn chmod(&self, path: &str, mode: u32) -> Result<()> {
        let mut state = self.state();
        let file = state
            .files
            .get_mut(path)
            .ok_or_else(|| anyhow!("no such file '{}'", path))?;
        file.mode = mode;
        Ok(())
    }

    async fn read_dir(&self, path: &str) -> Result<Vec<RemoteEntry>> {
        let state = self.state();
        if !state.dirs.contains(path) {
            return Err(anyhow!("Failed to read remote directory '{}'", path));
        }
        let mut entries: Vec<RemoteEntry> = state
            .files
            .iter()
            .filter(|(p, _)| parent(p) == path)
            .map(|(p, f)| RemoteEntry {
                name: p.rsplit('/').next().unwrap_or(p).to_string(),
                path: p.clone(),
                is_dir: false,
                size: f.data.len() as u64,
                modified: f.modified,
            })
            .collect();
        entries.extend(state.dirs.iter().filter(|d| parent(d) == path).map(|d| {
            RemoteEntry {
                name: d.rsplit('/').next().unwrap_or(d).to_string(),
                path: d.clone(),
                is_dir: true,
                size: 0,
                modified: 0,
            }
        }));
        Ok(entries)
    }

    async fn read_from(&self, path: &str, offset: u64) -> Result<Vec<u8>> {
        let state = self.state();
        let file = state
            .files
            .get(path)
            .ok_or_else(|| anyhow!("Failed to open remote file '{}'", path))?;
        let start = (offset as usize).min(file.data.len());
        Ok(file.data[start..].to_vec())
    }

    async fn stat_size(&self, path: &str) -> Result<u64> {
        self.state()
            .files
            .get(path)
            .map(|f| f.data.len() as u64)
            .ok_or_else(|| anyhow!("Failed to stat remote file '{}'", path))
    }

    async fn close(&self) -> Result<()> {
        self.state().closed = true;
        Ok(())
    }
}
