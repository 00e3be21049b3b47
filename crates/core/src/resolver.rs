//! Release resolution and platform asset selection.

use bytes::Bytes;
use tracing::{debug, info};

use crate::platform::Platform;
use crate::provider::{Asset, ProviderRegistry, Release};
use crate::repository::Repository;
use crate::{Error, Result};

/// Resolves the latest release of a repository through its provider.
///
/// The credential sent to the provider is the repository's own token when
/// one is configured, otherwise the fallback token (usually taken from the
/// environment), otherwise none.
#[derive(Debug)]
pub struct ReleaseResolver<'a> {
    providers: &'a ProviderRegistry,
    fallback_token: Option<String>,
}

impl<'a> ReleaseResolver<'a> {
    /// Create a resolver with no fallback credential.
    #[must_use]
    pub fn new(providers: &'a ProviderRegistry) -> Self {
        Self {
            providers,
            fallback_token: None,
        }
    }

    /// Set the credential used for repositories without their own token.
    #[must_use]
    pub fn with_fallback_token(mut self, token: Option<String>) -> Self {
        self.fallback_token = token.filter(|t| !t.is_empty());
        self
    }

    /// The credential to send for `repository`.
    #[must_use]
    pub fn credential<'r>(&'r self, repository: &'r Repository) -> Option<&'r str> {
        repository.token().or(self.fallback_token.as_deref())
    }

    /// Fetch the latest release of a repository.
    pub async fn latest_release(&self, repository: &Repository) -> Result<Release> {
        let provider = self.providers.resolve(&repository.url)?;
        debug!(url = %repository.url, provider = provider.name(), "Fetching latest release");

        let release = provider
            .latest_release(&repository.url, self.credential(repository))
            .await?;

        info!(
            url = %repository.url,
            tag = %release.tag_name,
            assets = release.assets.len(),
            "Resolved latest release"
        );
        Ok(release)
    }

    /// Fetch the bytes of one asset of a repository's release.
    pub async fn fetch_asset(&self, repository: &Repository, asset: &Asset) -> Result<Bytes> {
        let provider = self.providers.resolve(&repository.url)?;
        debug!(asset = %asset.name, url = %asset.url, "Fetching asset");
        provider
            .fetch_asset(asset, self.credential(repository))
            .await
    }
}

/// Pick the asset to install for `platform`.
///
/// Keeps the assets whose name contains both the OS and the architecture
/// token and returns the first of them in provider order.
pub fn select_installable_asset<'r>(release: &'r Release, platform: &Platform) -> Result<&'r Asset> {
    release
        .assets
        .iter()
        .find(|asset| platform.matches(&asset.name))
        .ok_or_else(|| Error::NoMatchingAsset {
            platform: platform.to_string(),
            available: release.asset_names(),
        })
}

/// Every asset of the release, unfiltered.
#[must_use]
pub fn downloadable_assets(release: &Release) -> &[Asset] {
    &release.assets
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ReleaseProvider;
    use async_trait::async_trait;
    use std::sync::Mutex;

    fn asset(name: &str) -> Asset {
        Asset {
            name: name.to_string(),
            url: format!("https://api.example.com/assets/{name}"),
            browser_download_url: None,
        }
    }

    fn release(names: &[&str]) -> Release {
        Release {
            tag_name: "v1.0.0".to_string(),
            assets: names.iter().map(|n| asset(n)).collect(),
        }
    }

    #[derive(Default)]
    struct RecordingProvider {
        tokens: Mutex<Vec<Option<String>>>,
    }

    #[async_trait]
    impl ReleaseProvider for RecordingProvider {
        fn name(&self) -> &'static str {
            "recording"
        }

        fn description(&self) -> &'static str {
            "Records the credentials it receives"
        }

        async fn latest_release(&self, _repo_url: &str, token: Option<&str>) -> Result<Release> {
            self.tokens
                .lock()
                .unwrap()
                .push(token.map(str::to_string));
            Ok(release(&["tool_linux_amd64.tar.gz"]))
        }

        async fn fetch_asset(&self, asset: &Asset, _token: Option<&str>) -> Result<Bytes> {
            Ok(Bytes::from(asset.name.clone()))
        }
    }

    #[test]
    fn test_select_first_matching_asset() {
        let release = release(&[
            "tool_darwin_amd64.tar.gz",
            "tool_linux_arm64.tar.gz",
            "tool_linux_amd64.tar.gz",
            "tool_linux_amd64.zip",
        ]);
        let platform = Platform::new("linux", "amd64");

        let selected = select_installable_asset(&release, &platform).unwrap();
        assert_eq!(selected.name, "tool_linux_amd64.tar.gz");

        // Deterministic across calls
        for _ in 0..3 {
            let again = select_installable_asset(&release, &platform).unwrap();
            assert_eq!(again, selected);
        }
    }

    #[test]
    fn test_select_no_match() {
        let release = release(&["tool_darwin_arm64.zip", "tool_windows_amd64.zip"]);
        let platform = Platform::parse("linux_amd64").unwrap();

        let err = select_installable_asset(&release, &platform).unwrap_err();
        match err {
            Error::NoMatchingAsset {
                platform,
                available,
            } => {
                assert_eq!(platform, "linux_amd64");
                assert_eq!(available.len(), 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_select_requires_both_tokens() {
        let release = release(&["tool_linux.tar.gz", "tool_amd64.tar.gz"]);
        let platform = Platform::new("linux", "amd64");
        assert!(select_installable_asset(&release, &platform).is_err());
    }

    #[test]
    fn test_downloadable_assets_unfiltered() {
        let release = release(&["a_darwin_arm64.zip", "checksums.txt"]);
        assert_eq!(downloadable_assets(&release).len(), 2);
    }

    fn providers_with(provider: RecordingProvider) -> (ProviderRegistry, std::sync::Arc<RecordingProvider>) {
        let provider = std::sync::Arc::new(provider);
        let mut registry = ProviderRegistry::new();
        registry
            .register_arc(provider.clone(), &["example.com"])
            .unwrap();
        (registry, provider)
    }

    #[tokio::test]
    async fn test_repository_token_wins_over_fallback() {
        let (registry, provider) = providers_with(RecordingProvider::default());
        let resolver = ReleaseResolver::new(&registry).with_fallback_token(Some("env".into()));

        let mut repo = Repository::new("https://example.com/acme/widget");
        repo.token = "repo".to_string();
        resolver.latest_release(&repo).await.unwrap();

        let plain = Repository::new("https://example.com/acme/other");
        resolver.latest_release(&plain).await.unwrap();

        let tokens = provider.tokens.lock().unwrap().clone();
        assert_eq!(tokens, vec![Some("repo".to_string()), Some("env".to_string())]);
    }

    #[tokio::test]
    async fn test_no_credential_when_none_configured() {
        let (registry, provider) = providers_with(RecordingProvider::default());
        let resolver = ReleaseResolver::new(&registry).with_fallback_token(Some(String::new()));

        let repo = Repository::new("https://example.com/acme/widget");
        resolver.latest_release(&repo).await.unwrap();

        assert_eq!(provider.tokens.lock().unwrap().clone(), vec![None]);
    }

    #[tokio::test]
    async fn test_unsupported_host() {
        let (registry, _) = providers_with(RecordingProvider::default());
        let resolver = ReleaseResolver::new(&registry);

        let repo = Repository::new("https://github.com/acme/widget");
        let err = resolver.latest_release(&repo).await.unwrap_err();
        assert!(matches!(err, Error::UnsupportedProvider { .. }));
    }

    #[tokio::test]
    async fn test_fetch_asset_dispatches_to_provider() {
        let (registry, _) = providers_with(RecordingProvider::default());
        let resolver = ReleaseResolver::new(&registry);
        let repo = Repository::new("https://example.com/acme/widget");

        let bytes = resolver
            .fetch_asset(&repo, &asset("tool_linux_amd64.tar.gz"))
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"tool_linux_amd64.tar.gz");
    }
}
