//! Install orchestration.
//!
//! An install runs a fixed sequence of steps for one repository:
//!
//! 1. resolve the latest release and pick the asset for the platform
//! 2. download the asset into the download directory
//! 3. extract it into a fresh scratch directory under the scratch root
//! 4. copy the extracted tree into the install destination
//! 5. record the installed tag and filename and persist the registry
//!
//! Any step can fail; the scratch directory is removed on every exit path.
//! Copying is best-effort per entry: an entry that cannot be copied is
//! reported in the [`CopyReport`] and the remaining entries still install.

use serde::Serialize;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::extract::{extract, strip_archive_suffix};
use crate::platform::Platform;
use crate::provider::Asset;
use crate::repository::{Repository, RepositoryRegistry};
use crate::resolver::{ReleaseResolver, downloadable_assets, select_installable_asset};
use crate::{Error, Result};

/// Where an install reads from and writes to.
#[derive(Debug, Clone)]
pub struct InstallOptions {
    /// Directory the extracted files are copied into.
    pub destination: PathBuf,
    /// Directory downloaded assets are written to.
    pub download_dir: PathBuf,
    /// Directory scratch directories are created under.
    pub scratch_root: PathBuf,
    /// Platform used to pick the asset to install.
    pub platform: Platform,
}

impl InstallOptions {
    /// Options for installing into `destination`, downloading into the
    /// working directory and extracting under the system temp directory.
    #[must_use]
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            download_dir: PathBuf::from("."),
            scratch_root: std::env::temp_dir(),
            platform: Platform::current(),
        }
    }

    /// Write downloaded assets into `dir`.
    #[must_use]
    pub fn with_download_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.download_dir = dir.into();
        self
    }

    /// Create scratch directories under `dir`.
    #[must_use]
    pub fn with_scratch_root(mut self, dir: impl Into<PathBuf>) -> Self {
        self.scratch_root = dir.into();
        self
    }

    /// Select assets for `platform` instead of the running one.
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}

/// An entry that could not be copied into the install destination.
#[derive(Debug)]
pub struct CopyFailure {
    /// Source path of the entry.
    pub path: PathBuf,
    /// Why the copy failed.
    pub error: std::io::Error,
}

impl fmt::Display for CopyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Outcome of a best-effort directory copy.
#[derive(Debug, Default)]
pub struct CopyReport {
    /// Number of files copied.
    pub copied: usize,
    /// Entries that failed, in traversal order.
    pub failures: Vec<CopyFailure>,
}

impl CopyReport {
    /// Whether every entry was copied.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    /// Escalate any failure to an [`Error::Copy`].
    pub fn into_result(self) -> Result<usize> {
        if self.failures.is_empty() {
            Ok(self.copied)
        } else {
            Err(Error::Copy {
                failures: self.failures,
            })
        }
    }

    fn record(&mut self, path: PathBuf, error: std::io::Error) {
        warn!(path = %path.display(), %error, "Failed to copy entry");
        self.failures.push(CopyFailure { path, error });
    }
}

/// Summary of a completed install.
#[derive(Debug)]
pub struct InstallReport {
    /// URL of the repository installed from.
    pub repository: String,
    /// Tag of the installed release.
    pub tag_name: String,
    /// Name of the installed asset.
    pub asset: String,
    /// Where the downloaded archive was written.
    pub archive_path: PathBuf,
    /// Result of copying into the destination.
    pub copy: CopyReport,
}

/// JSON-friendly view of an [`InstallReport`].
#[derive(Debug, Serialize)]
pub struct InstallSummary<'a> {
    /// URL of the repository installed from.
    pub repository: &'a str,
    /// Tag of the installed release.
    pub tag_name: &'a str,
    /// Name of the installed asset.
    pub asset: &'a str,
    /// Number of files copied.
    pub copied: usize,
    /// Entries that failed to copy.
    pub failures: Vec<String>,
}

impl InstallReport {
    /// Borrow the report as a serializable summary.
    #[must_use]
    pub fn summary(&self) -> InstallSummary<'_> {
        InstallSummary {
            repository: &self.repository,
            tag_name: &self.tag_name,
            asset: &self.asset,
            copied: self.copy.copied,
            failures: self.copy.failures.iter().map(ToString::to_string).collect(),
        }
    }
}

/// A temporary extraction directory, removed when dropped.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create `<root>/<archive name without suffix>`.
    ///
    /// Fails if the directory already exists, in which case nothing is
    /// removed on drop.
    pub fn create(root: &Path, archive: &Path) -> Result<Self> {
        let base = archive
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let path = root.join(strip_archive_suffix(&base));

        fs::create_dir(&path).map_err(|source| Error::ScratchDir {
            path: path.clone(),
            source,
        })?;
        debug!(path = %path.display(), "Created scratch directory");
        Ok(Self { path })
    }

    /// Path of the scratch directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(error) = fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), %error, "Failed to remove scratch directory");
        } else {
            debug!(path = %self.path.display(), "Removed scratch directory");
        }
    }
}

/// Recursively copy the contents of `src` into `dest`, preserving file modes.
///
/// Directories that already exist under `dest`, `dest` included, keep their
/// own mode; only directories created by the copy take the source mode.
///
/// Failing to read `src` or to create `dest` is an error. Failures on
/// individual entries below them are collected in the report instead.
pub fn copy_dir(src: &Path, dest: &Path) -> Result<CopyReport> {
    let metadata = fs::metadata(src).map_err(|e| Error::io("stat", src, e))?;
    ensure_dir(dest, &metadata).map_err(|e| Error::io("create_dir_all", dest, e))?;

    let mut report = CopyReport::default();
    copy_entries(src, dest, &mut report).map_err(|e| Error::io("read_dir", src, e))?;
    Ok(report)
}

fn copy_entries(src: &Path, dest: &Path, report: &mut CopyReport) -> std::io::Result<()> {
    for entry in fs::read_dir(src)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(error) => {
                report.record(src.to_path_buf(), error);
                continue;
            }
        };
        let src_path = entry.path();
        let dest_path = dest.join(entry.file_name());

        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir {
            let created =
                fs::metadata(&src_path).and_then(|metadata| ensure_dir(&dest_path, &metadata));
            match created.and_then(|()| copy_entries(&src_path, &dest_path, report)) {
                Ok(()) => {}
                Err(error) => report.record(src_path, error),
            }
        } else {
            // fs::copy carries the permission bits over
            match fs::copy(&src_path, &dest_path) {
                Ok(_) => {
                    debug!(from = %src_path.display(), to = %dest_path.display(), "Copied file");
                    report.copied += 1;
                }
                Err(error) => report.record(src_path, error),
            }
        }
    }
    Ok(())
}

fn ensure_dir(path: &Path, metadata: &fs::Metadata) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path)?;
    preserve_permissions(path, metadata);
    Ok(())
}

fn preserve_permissions(path: &Path, metadata: &fs::Metadata) {
    if let Err(error) = fs::set_permissions(path, metadata.permissions()) {
        debug!(path = %path.display(), %error, "Could not preserve directory permissions");
    }
}

/// Extract `archive` into a scratch directory under `scratch_root` and copy
/// the result into `destination`.
///
/// The scratch directory is removed before returning, whether or not the
/// extraction or copy succeeded.
pub fn install_archive(archive: &Path, scratch_root: &Path, destination: &Path) -> Result<CopyReport> {
    let scratch = ScratchDir::create(scratch_root, archive)?;
    extract(archive, scratch.path())?;
    let report = copy_dir(scratch.path(), destination)?;

    info!(
        archive = %archive.display(),
        destination = %destination.display(),
        copied = report.copied,
        failed = report.failures.len(),
        "Installed archive"
    );
    Ok(report)
}

/// Drives downloads and installs for tapped repositories.
#[derive(Debug)]
pub struct Installer<'a> {
    repositories: &'a mut RepositoryRegistry,
    resolver: ReleaseResolver<'a>,
    options: InstallOptions,
}

impl<'a> Installer<'a> {
    /// Create an installer over a loaded registry.
    pub fn new(
        repositories: &'a mut RepositoryRegistry,
        resolver: ReleaseResolver<'a>,
        options: InstallOptions,
    ) -> Self {
        Self {
            repositories,
            resolver,
            options,
        }
    }

    /// Install the platform asset of the latest release of `name`.
    ///
    /// On success the repository's installed tag and filename are updated
    /// and the registry is saved.
    pub async fn install(&mut self, name: &str) -> Result<InstallReport> {
        if self.options.destination.as_os_str().is_empty() {
            return Err(Error::destination("no install directory configured"));
        }

        let repository = self.repositories.find(name)?.clone();
        let release = self.resolver.latest_release(&repository).await?;
        let asset = select_installable_asset(&release, &self.options.platform)?.clone();
        info!(
            repository = %repository.url,
            tag = %release.tag_name,
            asset = %asset.name,
            platform = %self.options.platform,
            "Installing release asset"
        );

        let archive_path = self.download_asset(&repository, &asset).await?;
        let copy = install_archive(
            &archive_path,
            &self.options.scratch_root,
            &self.options.destination,
        )?;

        self.repositories
            .record_install(&repository.url, &release.tag_name, &asset.name)?;
        self.repositories.save()?;

        Ok(InstallReport {
            repository: repository.url,
            tag_name: release.tag_name,
            asset: asset.name,
            archive_path,
            copy,
        })
    }

    /// Download every asset of the latest release of `name` into the
    /// download directory, returning the written paths.
    pub async fn download(&self, name: &str) -> Result<Vec<PathBuf>> {
        let repository = self.repositories.find(name)?;
        let release = self.resolver.latest_release(repository).await?;

        let mut written = Vec::new();
        for asset in downloadable_assets(&release) {
            written.push(self.download_asset(repository, asset).await?);
        }

        info!(
            repository = %repository.url,
            tag = %release.tag_name,
            count = written.len(),
            "Downloaded release assets"
        );
        Ok(written)
    }

    async fn download_asset(
        &self,
        repository: &Repository,
        asset: &Asset,
    ) -> Result<PathBuf> {
        let file_name = Path::new(&asset.name)
            .file_name()
            .filter(|n| *n == asset.name.as_str())
            .ok_or_else(|| Error::UnsafeArchiveEntry {
                entry: asset.name.clone(),
            })?;

        let bytes = self.resolver.fetch_asset(repository, asset).await?;

        let dir = &self.options.download_dir;
        fs::create_dir_all(dir).map_err(|e| Error::io("create_dir_all", dir, e))?;
        let path = dir.join(file_name);
        fs::write(&path, &bytes).map_err(|e| Error::io("write", &path, e))?;

        info!(asset = %asset.name, path = %path.display(), bytes = bytes.len(), "Downloaded asset");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::tests::{create_tar_gz, create_zip};
    use crate::provider::{ProviderRegistry, Release, ReleaseProvider};
    use crate::repository::REGISTRY_FILE_NAME;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tempfile::TempDir;

    const REPO: &str = "https://github.com/acme/widget";

    struct MockProvider {
        release: Release,
        contents: HashMap<String, Bytes>,
        fetched: Mutex<Vec<String>>,
    }

    impl MockProvider {
        fn new(tag: &str, assets: Vec<(&str, Vec<u8>)>) -> Self {
            Self {
                release: Release {
                    tag_name: tag.to_string(),
                    assets: assets
                        .iter()
                        .map(|(name, _)| Asset {
                            name: (*name).to_string(),
                            url: format!("https://api.github.com/assets/{name}"),
                            browser_download_url: None,
                        })
                        .collect(),
                },
                contents: assets
                    .into_iter()
                    .map(|(name, data)| (name.to_string(), Bytes::from(data)))
                    .collect(),
                fetched: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ReleaseProvider for MockProvider {
        fn name(&self) -> &'static str {
            "mock"
        }

        fn description(&self) -> &'static str {
            "In-memory releases"
        }

        async fn latest_release(&self, _repo_url: &str, _token: Option<&str>) -> Result<Release> {
            Ok(self.release.clone())
        }

        async fn fetch_asset(&self, asset: &Asset, _token: Option<&str>) -> Result<Bytes> {
            self.fetched.lock().unwrap().push(asset.name.clone());
            self.contents
                .get(&asset.name)
                .cloned()
                .ok_or_else(|| Error::provider_response("mock", 404, "Not Found"))
        }
    }

    struct Fixture {
        temp: TempDir,
        providers: ProviderRegistry,
        mock: std::sync::Arc<MockProvider>,
        repositories: RepositoryRegistry,
    }

    impl Fixture {
        fn new(mock: MockProvider) -> Self {
            let temp = TempDir::new().unwrap();
            for dir in ["bin", "downloads", "scratch"] {
                fs::create_dir(temp.path().join(dir)).unwrap();
            }
            let mock = std::sync::Arc::new(mock);
            let mut providers = ProviderRegistry::new();
            providers.register_arc(mock.clone(), &["github.com"]).unwrap();

            let mut repositories =
                RepositoryRegistry::load(temp.path().join(REGISTRY_FILE_NAME)).unwrap();
            repositories.add(REPO).unwrap();

            Self {
                temp,
                providers,
                mock,
                repositories,
            }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.temp.path().join(rel)
        }

        fn options(&self) -> InstallOptions {
            InstallOptions::new(self.path("bin"))
                .with_download_dir(self.path("downloads"))
                .with_scratch_root(self.path("scratch"))
                .with_platform(Platform::new("linux", "amd64"))
        }

        fn scratch_is_empty(&self) -> bool {
            fs::read_dir(self.path("scratch")).unwrap().next().is_none()
        }
    }

    fn tar_gz_bytes(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("archive.tar.gz");
        create_tar_gz(&path, entries);
        fs::read(path).unwrap()
    }

    fn zip_bytes(entries: &[(&str, &[u8], u32)]) -> Vec<u8> {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("archive.zip");
        create_zip(&path, entries);
        fs::read(path).unwrap()
    }

    #[tokio::test]
    async fn test_install_end_to_end() {
        let linux = tar_gz_bytes(&[("widget", b"linux widget", 0o755)]);
        let darwin = tar_gz_bytes(&[("widget", b"darwin widget", 0o755)]);
        let mut fx = Fixture::new(MockProvider::new(
            "v1.2.0",
            vec![
                ("widget_linux_amd64.tar.gz", linux),
                ("widget_darwin_amd64.tar.gz", darwin),
            ],
        ));

        let repo = fx.repositories.find(REPO).unwrap();
        assert!(repo.installed_tag_name.is_empty());
        assert!(repo.installed_filename.is_empty());

        let options = fx.options();
        let resolver = ReleaseResolver::new(&fx.providers);
        let mut installer = Installer::new(&mut fx.repositories, resolver, options);
        let report = installer.install("widget").await.unwrap();

        assert_eq!(report.tag_name, "v1.2.0");
        assert_eq!(report.asset, "widget_linux_amd64.tar.gz");
        assert_eq!(report.copy.copied, 1);
        assert!(report.copy.is_clean());
        assert_eq!(fs::read(fx.path("bin/widget")).unwrap(), b"linux widget");
        assert!(fx.path("downloads/widget_linux_amd64.tar.gz").exists());
        assert!(!fx.path("downloads/widget_darwin_amd64.tar.gz").exists());
        assert_eq!(
            fx.mock.fetched.lock().unwrap().clone(),
            vec!["widget_linux_amd64.tar.gz".to_string()]
        );
        assert!(fx.scratch_is_empty());

        let reloaded = RepositoryRegistry::load(fx.path(REGISTRY_FILE_NAME)).unwrap();
        let repo = reloaded.find("widget").unwrap();
        assert_eq!(repo.installed_tag_name, "v1.2.0");
        assert_eq!(repo.installed_filename, "widget_linux_amd64.tar.gz");
    }

    #[tokio::test]
    async fn test_install_zip_asset() {
        let archive = zip_bytes(&[("bin/", b"", 0o755), ("bin/widget", b"zipped", 0o755)]);
        let mut fx = Fixture::new(MockProvider::new(
            "v2.0.0",
            vec![("widget_linux_amd64.zip", archive)],
        ));

        let options = fx.options();
        let resolver = ReleaseResolver::new(&fx.providers);
        let mut installer = Installer::new(&mut fx.repositories, resolver, options);
        installer.install(REPO).await.unwrap();

        assert_eq!(fs::read(fx.path("bin/bin/widget")).unwrap(), b"zipped");
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_install_no_matching_asset_downloads_nothing() {
        let mut fx = Fixture::new(MockProvider::new(
            "v1.0.0",
            vec![
                ("widget_darwin_arm64.zip", Vec::new()),
                ("widget_windows_amd64.zip", Vec::new()),
            ],
        ));

        let options = fx.options();
        let resolver = ReleaseResolver::new(&fx.providers);
        let mut installer = Installer::new(&mut fx.repositories, resolver, options);
        let err = installer.install("widget").await.unwrap_err();

        assert!(matches!(err, Error::NoMatchingAsset { .. }));
        assert!(fx.mock.fetched.lock().unwrap().is_empty());
        assert!(!fx.repositories.find("widget").unwrap().is_installed());
    }

    #[tokio::test]
    async fn test_install_corrupt_archive_cleans_scratch() {
        let mut fx = Fixture::new(MockProvider::new(
            "v1.0.0",
            vec![("widget_linux_amd64.tar.gz", b"garbage".to_vec())],
        ));

        let options = fx.options();
        let resolver = ReleaseResolver::new(&fx.providers);
        let mut installer = Installer::new(&mut fx.repositories, resolver, options);
        let err = installer.install("widget").await.unwrap_err();

        assert!(matches!(err, Error::Extraction { .. }));
        assert!(fx.scratch_is_empty());

        let reloaded = RepositoryRegistry::load(fx.path(REGISTRY_FILE_NAME)).unwrap();
        assert!(!reloaded.find("widget").unwrap().is_installed());
    }

    #[tokio::test]
    async fn test_install_unsupported_format_cleans_scratch() {
        let mut fx = Fixture::new(MockProvider::new(
            "v1.0.0",
            vec![("widget_linux_amd64.tar.xz", b"xz".to_vec())],
        ));

        let options = fx.options();
        let resolver = ReleaseResolver::new(&fx.providers);
        let mut installer = Installer::new(&mut fx.repositories, resolver, options);
        let err = installer.install("widget").await.unwrap_err();

        assert!(matches!(err, Error::UnsupportedFormat { .. }));
        assert!(fx.scratch_is_empty());
    }

    #[tokio::test]
    async fn test_install_existing_scratch_dir_is_error() {
        let archive = tar_gz_bytes(&[("widget", b"w", 0o755)]);
        let mut fx = Fixture::new(MockProvider::new(
            "v1.0.0",
            vec![("widget_linux_amd64.tar.gz", archive)],
        ));
        let leftover = fx.path("scratch/widget_linux_amd64");
        fs::create_dir(&leftover).unwrap();
        fs::write(leftover.join("keep"), b"keep").unwrap();

        let options = fx.options();
        let resolver = ReleaseResolver::new(&fx.providers);
        let mut installer = Installer::new(&mut fx.repositories, resolver, options);
        let err = installer.install("widget").await.unwrap_err();

        assert!(matches!(err, Error::ScratchDir { .. }));
        assert!(leftover.join("keep").exists());
        assert!(!fx.path("bin/widget").exists());
    }

    #[tokio::test]
    async fn test_install_without_destination_fetches_nothing() {
        let mut fx = Fixture::new(MockProvider::new(
            "v1.0.0",
            vec![("widget_linux_amd64.tar.gz", Vec::new())],
        ));

        let options = InstallOptions {
            destination: PathBuf::new(),
            ..fx.options()
        };
        let resolver = ReleaseResolver::new(&fx.providers);
        let mut installer = Installer::new(&mut fx.repositories, resolver, options);
        let err = installer.install("widget").await.unwrap_err();

        assert!(matches!(err, Error::Destination { .. }));
        assert!(fx.mock.fetched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_install_unknown_repository() {
        let mut fx = Fixture::new(MockProvider::new("v1.0.0", Vec::new()));

        let options = fx.options();
        let resolver = ReleaseResolver::new(&fx.providers);
        let mut installer = Installer::new(&mut fx.repositories, resolver, options);
        let err = installer.install("gadget").await.unwrap_err();
        assert!(matches!(err, Error::RepositoryNotFound { .. }));
    }

    #[tokio::test]
    async fn test_download_fetches_every_asset() {
        let mut fx = Fixture::new(MockProvider::new(
            "v1.0.0",
            vec![
                ("widget_linux_amd64.tar.gz", b"one".to_vec()),
                ("widget_darwin_arm64.zip", b"two".to_vec()),
                ("checksums.txt", b"three".to_vec()),
            ],
        ));

        let options = fx.options();
        let resolver = ReleaseResolver::new(&fx.providers);
        let installer = Installer::new(&mut fx.repositories, resolver, options);
        let written = installer.download("widget").await.unwrap();

        assert_eq!(written.len(), 3);
        assert_eq!(fs::read(fx.path("downloads/checksums.txt")).unwrap(), b"three");
        assert!(!fx.repositories.find("widget").unwrap().is_installed());
    }

    #[tokio::test]
    async fn test_download_rejects_path_like_asset_name() {
        let mut fx = Fixture::new(MockProvider::new(
            "v1.0.0",
            vec![("../widget_linux_amd64.tar.gz", b"x".to_vec())],
        ));

        let options = fx.options();
        let resolver = ReleaseResolver::new(&fx.providers);
        let installer = Installer::new(&mut fx.repositories, resolver, options);
        let err = installer.download("widget").await.unwrap_err();

        assert!(matches!(err, Error::UnsafeArchiveEntry { .. }));
        assert!(!fx.path("widget_linux_amd64.tar.gz").exists());
    }

    #[test]
    fn test_copy_dir_is_best_effort() {
        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        let dest = temp.path().join("dest");
        fs::create_dir_all(src.join("sub")).unwrap();
        fs::write(src.join("blocked"), b"file").unwrap();
        fs::write(src.join("ok"), b"ok").unwrap();
        fs::write(src.join("sub/nested"), b"nested").unwrap();

        // A directory where a file should go cannot be overwritten
        fs::create_dir_all(dest.join("blocked")).unwrap();

        let report = copy_dir(&src, &dest).unwrap();
        assert_eq!(report.copied, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, src.join("blocked"));
        assert_eq!(fs::read(dest.join("ok")).unwrap(), b"ok");
        assert_eq!(fs::read(dest.join("sub/nested")).unwrap(), b"nested");

        let err = report.into_result().unwrap_err();
        assert!(matches!(err, Error::Copy { ref failures } if failures.len() == 1));
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_preserves_modes() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir(&src).unwrap();
        fs::write(src.join("tool"), b"bin").unwrap();
        fs::set_permissions(src.join("tool"), fs::Permissions::from_mode(0o755)).unwrap();

        let dest = temp.path().join("dest");
        copy_dir(&src, &dest).unwrap().into_result().unwrap();

        let mode = fs::metadata(dest.join("tool")).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o755);
    }

    #[cfg(unix)]
    #[test]
    fn test_copy_dir_keeps_existing_directory_modes() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        let src = temp.path().join("src");
        fs::create_dir_all(src.join("share")).unwrap();
        fs::create_dir_all(src.join("lib")).unwrap();
        fs::write(src.join("share/doc"), b"doc").unwrap();
        fs::write(src.join("lib/libwidget"), b"lib").unwrap();
        for dir in [&src, &src.join("share"), &src.join("lib")] {
            fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
        }

        let dest = temp.path().join("bin");
        fs::create_dir_all(dest.join("share")).unwrap();
        fs::set_permissions(&dest, fs::Permissions::from_mode(0o700)).unwrap();
        fs::set_permissions(dest.join("share"), fs::Permissions::from_mode(0o750)).unwrap();

        copy_dir(&src, &dest).unwrap().into_result().unwrap();

        let mode = |p: &Path| fs::metadata(p).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode(&dest), 0o700);
        assert_eq!(mode(&dest.join("share")), 0o750);
        assert_eq!(mode(&dest.join("lib")), 0o755);
        assert_eq!(fs::read(dest.join("share/doc")).unwrap(), b"doc");
    }

    #[test]
    fn test_copy_dir_missing_source() {
        let temp = TempDir::new().unwrap();
        let err = copy_dir(&temp.path().join("absent"), &temp.path().join("dest")).unwrap_err();
        assert!(matches!(err, Error::Io { .. }));
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let temp = TempDir::new().unwrap();
        let path = {
            let scratch =
                ScratchDir::create(temp.path(), Path::new("/downloads/tool_linux_amd64.tar.gz"))
                    .unwrap();
            fs::write(scratch.path().join("file"), b"x").unwrap();
            assert_eq!(scratch.path(), temp.path().join("tool_linux_amd64"));
            scratch.path().to_path_buf()
        };
        assert!(!path.exists());
    }
}
