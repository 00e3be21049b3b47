//! Provider registry and host dispatch.
//!
//! Providers are kept in registration order and resolved by a linear scan:
//! the first provider with a host pattern contained in the URL's host wins.

use std::sync::Arc;

use tracing::debug;
use url::Url;

use super::ReleaseProvider;
use crate::{Error, Result};

struct Registration {
    provider: Arc<dyn ReleaseProvider>,
    hosts: Vec<String>,
}

/// Ordered registry of release providers.
///
/// Built once at process start and passed by reference into the pipeline.
#[derive(Default)]
pub struct ProviderRegistry {
    registrations: Vec<Registration>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a provider under its name, bound to the given host patterns.
    ///
    /// Registration order is significant: when several providers could
    /// handle a host, the one registered first is used.
    pub fn register<P: ReleaseProvider + 'static>(
        &mut self,
        provider: P,
        hosts: &[&str],
    ) -> Result<()> {
        self.register_arc(Arc::new(provider), hosts)
    }

    /// Register a provider wrapped in Arc.
    pub fn register_arc(&mut self, provider: Arc<dyn ReleaseProvider>, hosts: &[&str]) -> Result<()> {
        let name = provider.name();
        if self.get(name).is_some() {
            return Err(Error::DuplicateProvider {
                name: name.to_string(),
            });
        }
        self.registrations.push(Registration {
            provider,
            hosts: hosts.iter().map(|h| (*h).to_string()).collect(),
        });
        Ok(())
    }

    /// Get a provider by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ReleaseProvider>> {
        self.registrations
            .iter()
            .find(|r| r.provider.name() == name)
            .map(|r| &r.provider)
    }

    /// Find the provider responsible for a repository URL.
    pub fn resolve(&self, repo_url: &str) -> Result<Arc<dyn ReleaseProvider>> {
        let unsupported = || Error::UnsupportedProvider {
            url: repo_url.to_string(),
        };
        let host = host_of(repo_url).map_err(|_| unsupported())?;

        let registration = self
            .registrations
            .iter()
            .find(|r| r.hosts.iter().any(|pattern| host.contains(pattern.as_str())))
            .ok_or_else(unsupported)?;

        debug!(%repo_url, %host, provider = registration.provider.name(), "Resolved provider");
        Ok(Arc::clone(&registration.provider))
    }

    /// Provider names in registration order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.registrations.iter().map(|r| r.provider.name()).collect()
    }

    /// Get the number of registered providers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

/// Extract the host component of a repository URL.
///
/// Accepts absolute URLs as well as scp-like SSH remotes (`git@host:owner/repo`).
pub fn host_of(repo_url: &str) -> Result<String> {
    if let Ok(url) = Url::parse(repo_url) {
        return url
            .host_str()
            .filter(|h| !h.is_empty())
            .map(str::to_string)
            .ok_or_else(|| Error::parse(repo_url, "URL has no host"));
    }

    if !repo_url.contains("://")
        && let Some((user_host, path)) = repo_url.split_once(':')
        && !path.is_empty()
    {
        let host = user_host.rsplit('@').next().unwrap_or(user_host);
        if !host.is_empty() && !host.contains('/') {
            return Ok(host.to_string());
        }
    }

    Err(Error::parse(repo_url, "not a valid repository URL"))
}
