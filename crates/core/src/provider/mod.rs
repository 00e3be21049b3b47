//! Release provider system.
//!
//! A provider knows how to talk to one source-control host: it fetches the
//! latest release of a repository and the bytes of that release's assets.
//!
//! # Architecture
//!
//! - [`ReleaseProvider`] - Trait implemented by each host backend (GitHub, ...)
//! - [`ProviderRegistry`] - Ordered collection of providers, dispatched by URL host
//! - [`Release`], [`Asset`] - Provider-neutral release snapshot
//!
//! # Example
//!
//! ```ignore
//! use fetcher_core::provider::ProviderRegistry;
//!
//! let mut registry = ProviderRegistry::new();
//! registry.register(GitHubProvider::builder().build()?, &["github.com"])?;
//!
//! let provider = registry.resolve("https://github.com/acme/widget")?;
//! let release = provider.latest_release("https://github.com/acme/widget", None).await?;
//! ```

mod registry;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use registry::{ProviderRegistry, host_of};

/// Snapshot of a repository's latest release at fetch time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Tag the release was published under.
    pub tag_name: String,
    /// Assets in the order the provider returned them.
    pub assets: Vec<Asset>,
}

impl Release {
    /// Names of every asset, in provider order.
    #[must_use]
    pub fn asset_names(&self) -> Vec<String> {
        self.assets.iter().map(|a| a.name.clone()).collect()
    }
}

/// A single downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    /// File name, e.g. `tool_linux_amd64.tar.gz`.
    pub name: String,
    /// Locator the provider uses to fetch the asset bytes.
    pub url: String,
    /// Direct browser download URL, when the provider exposes one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub browser_download_url: Option<String>,
}

/// A backend for one family of source-control hosts.
///
/// Providers are stateless beyond their configuration and are shared
/// read-only by every repository that resolves to them.
#[async_trait]
pub trait ReleaseProvider: Send + Sync {
    /// Unique name identifying this provider (e.g., "github").
    fn name(&self) -> &'static str;

    /// Human-readable description.
    fn description(&self) -> &'static str;

    /// Fetch the latest release of the repository at `repo_url`.
    ///
    /// `token` is sent as a bearer credential when present.
    async fn latest_release(&self, repo_url: &str, token: Option<&str>) -> Result<Release>;

    /// Fetch the raw bytes of a release asset.
    async fn fetch_asset(&self, asset: &Asset, token: Option<&str>) -> Result<Bytes>;
}
