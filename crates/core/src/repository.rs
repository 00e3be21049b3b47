//! Tapped repositories and their persisted state.
//!
//! The registry file is a JSON document holding every tapped repository in
//! insertion order:
//!
//! ```json
//! {
//!   "repositories": [
//!     {
//!       "url": "https://github.com/acme/widget",
//!       "installed_filename": "widget_linux_amd64.tar.gz",
//!       "installed_tag_name": "v1.2.0",
//!       "token": ""
//!     }
//!   ]
//! }
//! ```
//!
//! The file is read once per invocation and rewritten after every mutating
//! operation. There is no cross-process locking: two invocations mutating
//! the same file concurrently can lose an update.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use url::Url;

use crate::{Error, Result};

/// Default filename of the registry, relative to the working directory.
pub const REGISTRY_FILE_NAME: &str = "fetcher.json";

/// A tapped repository.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Repository {
    /// Canonical repository URL.
    pub url: String,
    /// Asset filename of the last install, empty if never installed.
    #[serde(default)]
    pub installed_filename: String,
    /// Release tag of the last install, empty if never installed.
    #[serde(default)]
    pub installed_tag_name: String,
    /// Access token for this repository, empty to use the environment.
    #[serde(default)]
    pub token: String,
}

impl Repository {
    /// Create a repository entry with no installed state.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Whether this repository is addressed by `name`, either by its full
    /// URL or by a trailing path suffix such as `widget` or `acme/widget`.
    #[must_use]
    pub fn matches(&self, name: &str) -> bool {
        !name.is_empty() && (self.url == name || self.url.ends_with(&format!("/{name}")))
    }

    /// The repository's own token, if one is configured.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        Some(self.token.as_str()).filter(|t| !t.is_empty())
    }

    /// Whether a release has been installed from this repository.
    #[must_use]
    pub fn is_installed(&self) -> bool {
        !self.installed_tag_name.is_empty()
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    repositories: Vec<Repository>,
}

/// The persisted set of tapped repositories.
#[derive(Debug)]
pub struct RepositoryRegistry {
    path: PathBuf,
    repositories: Vec<Repository>,
}

impl RepositoryRegistry {
    /// Create an empty registry backed by `path`, without touching the disk.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            repositories: Vec::new(),
        }
    }

    /// Load the registry from `path`.
    ///
    /// A missing file yields an empty registry. A file that exists but
    /// cannot be read or parsed is a [`Error::CorruptState`].
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No registry file found");
                return Ok(Self::new(path));
            }
            Err(e) => {
                return Err(Error::corrupt_state(&path, format!("failed to read: {e}")));
            }
        };

        let document: RegistryDocument = serde_json::from_str(&content)
            .map_err(|e| Error::corrupt_state(&path, format!("failed to parse: {e}")))?;

        debug!(
            path = %path.display(),
            count = document.repositories.len(),
            "Loaded repository registry"
        );

        Ok(Self {
            path,
            repositories: document.repositories,
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist the full registry.
    ///
    /// Writes to a temporary sibling file first, then renames it over the
    /// target so readers never observe a partial document.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::io("create_dir_all", parent, e))?;
        }

        let document = RegistryDocument {
            repositories: self.repositories.clone(),
        };
        let content = serde_json::to_string_pretty(&document)
            .map_err(|e| Error::corrupt_state(&self.path, format!("failed to serialize: {e}")))?;

        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, content).map_err(|e| Error::io("write", &temp_path, e))?;
        std::fs::rename(&temp_path, &self.path)
            .map_err(|e| Error::io("rename", &self.path, e))?;

        debug!(path = %self.path.display(), count = self.repositories.len(), "Saved repository registry");
        Ok(())
    }

    /// Tap a repository and persist the registry.
    ///
    /// The URL must be an absolute URL or an scp-like SSH remote, and must
    /// not match an already tapped repository.
    pub fn add(&mut self, url: &str) -> Result<&Repository> {
        validate_url(url)?;

        if self.lookup(url).is_some() {
            return Err(Error::Duplicate {
                url: url.to_string(),
            });
        }

        self.repositories.push(Repository::new(url));
        if let Err(e) = self.save() {
            self.repositories.pop();
            return Err(e);
        }
        info!(%url, "Tapped repository");

        let index = self.repositories.len() - 1;
        Ok(&self.repositories[index])
    }

    /// Find a repository by full URL or trailing path suffix.
    pub fn find(&self, name: &str) -> Result<&Repository> {
        self.lookup(name).ok_or_else(|| Error::RepositoryNotFound {
            name: name.to_string(),
        })
    }

    /// Record the release installed for a repository.
    ///
    /// Only updates memory; call [`save`](Self::save) to persist.
    pub fn record_install(&mut self, name: &str, tag_name: &str, filename: &str) -> Result<()> {
        let repository = self
            .repositories
            .iter_mut()
            .find(|r| r.matches(name))
            .ok_or_else(|| Error::RepositoryNotFound {
                name: name.to_string(),
            })?;
        repository.installed_tag_name = tag_name.to_string();
        repository.installed_filename = filename.to_string();
        Ok(())
    }

    /// All tapped repositories in insertion order.
    #[must_use]
    pub fn list(&self) -> &[Repository] {
        &self.repositories
    }

    /// Get the number of tapped repositories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.repositories.len()
    }

    /// Check if no repository has been tapped.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.repositories.is_empty()
    }

    fn lookup(&self, name: &str) -> Option<&Repository> {
        self.repositories.iter().find(|r| r.matches(name))
    }
}

fn validate_url(url: &str) -> Result<()> {
    if url.trim().is_empty() {
        return Err(Error::parse(url, "url is required"));
    }
    match Url::parse(url) {
        Ok(parsed) if parsed.host_str().is_some_and(|h| !h.is_empty()) => Ok(()),
        Ok(_) => Err(Error::parse(url, "URL has no host")),
        // scp-like SSH remotes are not RFC 3986 URLs but are valid taps
        Err(_) => crate::provider::host_of(url).map(|_| ()),
    }
}
