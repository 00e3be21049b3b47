//! Platform detection and normalization.
//!
//! Release assets are conventionally named with Go-style platform tokens
//! (`linux_amd64`, `darwin_arm64`), so the platform is expressed in that
//! vocabulary regardless of the Rust target names.

use std::fmt;

use crate::{Error, Result};

/// The operating system and architecture tokens used to pick release assets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Platform {
    /// Operating system token (linux, darwin, windows).
    pub os: String,
    /// Architecture token (amd64, arm64, 386).
    pub arch: String,
}

impl Platform {
    /// Create a new platform, normalizing both tokens.
    #[must_use]
    pub fn new(os: impl Into<String>, arch: impl Into<String>) -> Self {
        Self {
            os: normalize_os(&os.into()),
            arch: normalize_arch(&arch.into()),
        }
    }

    /// Get the platform this process is running on.
    #[must_use]
    pub fn current() -> Self {
        Self::new(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Parse a platform tag such as `linux_amd64`, `darwin-arm64` or `linux/amd64`.
    pub fn parse(s: &str) -> Result<Self> {
        let mut parts = s.split(['_', '-', '/']);
        match (parts.next(), parts.next(), parts.next()) {
            (Some(os), Some(arch), None) if !os.is_empty() && !arch.is_empty() => {
                Ok(Self::new(os, arch))
            }
            // x86_64 contains the separator itself
            (Some(os), Some("x86"), Some("64")) if !os.is_empty() => Ok(Self::new(os, "x86_64")),
            _ => Err(Error::parse(s, "expected a platform tag like linux_amd64")),
        }
    }

    /// Whether an asset name carries both the OS and the architecture token.
    #[must_use]
    pub fn matches(&self, asset_name: &str) -> bool {
        asset_name.contains(&self.os) && asset_name.contains(&self.arch)
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os, self.arch)
    }
}

/// Normalize an operating system name to its release-asset token.
#[must_use]
pub fn normalize_os(os: &str) -> String {
    match os.to_lowercase().as_str() {
        "macos" | "osx" => "darwin".to_string(),
        other => other.to_string(),
    }
}

/// Normalize an architecture name to its release-asset token.
#[must_use]
pub fn normalize_arch(arch: &str) -> String {
    match arch.to_lowercase().as_str() {
        "x86_64" | "x64" => "amd64".to_string(),
        "aarch64" => "arm64".to_string(),
        "x86" | "i386" | "i686" => "386".to_string(),
        other => other.to_string(),
    }
}
