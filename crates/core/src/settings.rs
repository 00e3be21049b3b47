//! Runtime settings shared by the commands.

use std::path::PathBuf;
use std::time::Duration;

use crate::install::InstallOptions;
use crate::platform::Platform;
use crate::repository::REGISTRY_FILE_NAME;
use crate::{Error, Result};

/// Environment variables consulted for a fallback credential, in order.
pub const TOKEN_ENV_VARS: [&str; 2] = ["GITHUB_TOKEN", "GH_TOKEN"];

/// Default timeout for provider HTTP requests.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Paths and limits used by a fetcher invocation.
#[derive(Debug, Clone)]
pub struct Settings {
    /// The persisted repository registry.
    pub registry_path: PathBuf,
    /// Install destination, if one could be determined.
    pub install_dir: Option<PathBuf>,
    /// Directory downloaded assets are written to.
    pub download_dir: PathBuf,
    /// Directory scratch extraction directories are created under.
    pub scratch_root: PathBuf,
    /// Timeout for each provider request.
    pub http_timeout: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            registry_path: PathBuf::from(REGISTRY_FILE_NAME),
            install_dir: None,
            download_dir: PathBuf::from("."),
            scratch_root: std::env::temp_dir(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl Settings {
    /// Build install options for `platform`.
    ///
    /// Fails with [`Error::Destination`] when no install directory is set.
    pub fn install_options(&self, platform: Platform) -> Result<InstallOptions> {
        let destination = self
            .install_dir
            .clone()
            .filter(|dir| !dir.as_os_str().is_empty())
            .ok_or_else(|| Error::destination("no install directory configured"))?;

        Ok(InstallOptions::new(destination)
            .with_download_dir(&self.download_dir)
            .with_scratch_root(&self.scratch_root)
            .with_platform(platform))
    }
}

/// Read the fallback credential from the environment.
///
/// Empty values are ignored.
#[must_use]
pub fn token_from_env() -> Option<String> {
    TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.is_empty())
}
