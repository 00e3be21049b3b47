//! GitHub releases provider for fetcher.
//!
//! [`GitHubProvider`] implements [`ReleaseProvider`] against the GitHub REST
//! API: it resolves `releases/latest` for a repository and downloads release
//! assets through their API URL.

#![warn(missing_docs)]

mod remote;

pub use remote::{RepoPath, parse_github_remote};

use async_trait::async_trait;
use bytes::Bytes;
use fetcher_core::provider::{Asset, Release, ReleaseProvider};
use fetcher_core::{Error, Result};
use reqwest::{Client, RequestBuilder, Response, header};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

/// Base URL of the repositories API.
pub const DEFAULT_API_BASE: &str = "https://api.github.com/repos";

/// Host patterns the provider is registered for.
pub const HOST_PATTERNS: &[&str] = &["github.com"];

const PROVIDER_NAME: &str = "github";
const API_VERSION: &str = "2022-11-28";
const ACCEPT_JSON: &str = "application/vnd.github+json";
const ACCEPT_BINARY: &str = "application/octet-stream";

#[derive(Debug, Deserialize)]
struct ReleaseDocument {
    tag_name: String,
    #[serde(default)]
    assets: Vec<AssetDocument>,
}

#[derive(Debug, Deserialize)]
struct AssetDocument {
    name: String,
    url: String,
    #[serde(default)]
    browser_download_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

impl From<ReleaseDocument> for Release {
    fn from(doc: ReleaseDocument) -> Self {
        Self {
            tag_name: doc.tag_name,
            assets: doc
                .assets
                .into_iter()
                .map(|a| Asset {
                    name: a.name,
                    url: a.url,
                    browser_download_url: a.browser_download_url,
                })
                .collect(),
        }
    }
}

/// Builder for [`GitHubProvider`].
#[derive(Debug, Clone)]
pub struct GitHubProviderBuilder {
    api_base: String,
    timeout: Option<Duration>,
    user_agent: String,
}

impl Default for GitHubProviderBuilder {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            timeout: None,
            user_agent: "fetcher".to_string(),
        }
    }
}

impl GitHubProviderBuilder {
    /// Use a different repositories API base, e.g. a GitHub Enterprise host
    /// or a mock server.
    #[must_use]
    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Abort requests that take longer than `timeout`.
    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Send a different `User-Agent` header.
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Build the provider.
    pub fn build(self) -> Result<GitHubProvider> {
        let mut builder = Client::builder().user_agent(self.user_agent);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build().map_err(|e| {
            Error::provider_request(PROVIDER_NAME, format!("failed to create HTTP client: {e}"))
        })?;

        Ok(GitHubProvider {
            client,
            api_base: self.api_base,
        })
    }
}

/// Release provider for repositories hosted on GitHub.
#[derive(Debug, Clone)]
pub struct GitHubProvider {
    client: Client,
    api_base: String,
}

impl GitHubProvider {
    /// Start building a provider.
    #[must_use]
    pub fn builder() -> GitHubProviderBuilder {
        GitHubProviderBuilder::default()
    }

    /// The `releases/latest` endpoint for a repository URL.
    pub fn latest_release_url(&self, repo_url: &str) -> Result<String> {
        let path = parse_github_remote(repo_url)?;
        Ok(format!("{}/{}/releases/latest", self.api_base, path))
    }

    async fn send(&self, request: RequestBuilder, what: &str) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            Error::provider_request(PROVIDER_NAME, format!("failed to fetch {what}: {e}"))
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        // GitHub explains most failures in a JSON `message` field
        let body = response.text().await.unwrap_or_default();
        let reason = serde_json::from_str::<ApiError>(&body)
            .map(|e| e.message)
            .unwrap_or_else(|_| status.canonical_reason().unwrap_or("unknown").to_string());
        Err(Error::provider_response(PROVIDER_NAME, status.as_u16(), reason))
    }
}

#[async_trait]
impl ReleaseProvider for GitHubProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn description(&self) -> &'static str {
        "Fetch release assets from GitHub"
    }

    async fn latest_release(&self, repo_url: &str, token: Option<&str>) -> Result<Release> {
        let url = self.latest_release_url(repo_url)?;
        debug!(%url, "Fetching GitHub release");

        let mut request = self
            .client
            .get(&url)
            .header(header::ACCEPT, ACCEPT_JSON)
            .header("X-GitHub-Api-Version", API_VERSION);
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = self.send(request, "release").await?;
        let status = response.status().as_u16();
        let document: ReleaseDocument = response.json().await.map_err(|e| {
            Error::provider_response(PROVIDER_NAME, status, format!("malformed release: {e}"))
        })?;

        info!(repo = %repo_url, tag = %document.tag_name, "Found GitHub release");
        Ok(document.into())
    }

    async fn fetch_asset(&self, asset: &Asset, token: Option<&str>) -> Result<Bytes> {
        debug!(url = %asset.url, name = %asset.name, "Downloading GitHub asset");

        let mut request = self
            .client
            .get(&asset.url)
            .header(header::ACCEPT, ACCEPT_BINARY);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("token {token}"));
        }

        let response = self.send(request, "asset").await?;
        response.bytes().await.map_err(|e| {
            Error::provider_request(PROVIDER_NAME, format!("failed to read asset body: {e}"))
        })
    }
}
