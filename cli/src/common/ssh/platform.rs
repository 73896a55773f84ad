//! # Remote Platform Detection (`common::ssh::platform`)
//!
//! File: cli/src/common/ssh/platform.rs
//! Author: Christi Mahu
//!
//! Identifies the operating system and CPU architecture of the remote host from
//! `uname` output, using the naming convention of release tarballs
//! (`linux`, `amd64`, `arm64`, ...).

use crate::common::ssh::remote::Remote;
use crate::core::error::Result;
use std::fmt;

/// Operating system and architecture of a host, in release naming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Platform {
    pub os: String,
    pub arch: String,
}

/// Maps `uname -m` machine names to release architecture names. Unknown names
/// are used as they are.
fn normalize_arch(machine: &str) -> &str {
    match machine {
        "x86_64" => "amd64",
        "aarch64" => "arm64",
        "i386" => "386",
        "armv7l" | "armv6l" => "arm",
        other => other,
    }
}

impl Platform {
    /// Builds a platform from raw `uname` and `uname -m` output.
    pub fn from_uname(os: &str, machine: &str) -> Self {
        let machine = machine.trim();
        Self {
            os: os.trim().to_lowercase(),
            arch: normalize_arch(machine).to_lowercase(),
        }
    }

    /// Queries the remote host.
    pub async fn detect(remote: &dyn Remote) -> Result<Self> {
        let os = remote.exec("uname").await?;
        let machine = remote.exec("uname -m").await?;
        Ok(Self::from_uname(&os, &machine))
    }

    /// Suffix used in release tarball names, e.g. `linux_amd64`.
    pub fn tarball_suffix(&self) -> String {
        format!("{}_{}", self.os, self.arch)
    }

    /// Target passed to the chain build, e.g. `linux:amd64`.
    pub fn build_target(&self) -> String {
        format!("{}:{}", self.os, self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.arch)
    }
}
