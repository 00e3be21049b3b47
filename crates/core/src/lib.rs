//! Core library for fetcher.
//!
//! Fetcher keeps a list of tapped source repositories, resolves their latest
//! releases through host-specific providers and installs the release asset
//! built for the current platform:
//! - [`repository`] - the persisted list of tapped repositories
//! - [`provider`] - the provider trait and host dispatch
//! - [`resolver`] - credential handling and platform asset selection
//! - [`extract`] - `.tar.gz` and `.zip` extraction
//! - [`install`] - the download, extract and copy pipeline
//! - [`settings`] - paths, timeouts and the fallback credential

#![warn(missing_docs)]

mod error;
pub mod extract;
pub mod install;
pub mod platform;
pub mod provider;
pub mod repository;
pub mod resolver;
pub mod settings;

pub use error::{Error, Result};
pub use install::{CopyFailure, CopyReport, InstallOptions, InstallReport, Installer};
pub use platform::Platform;
pub use provider::{Asset, ProviderRegistry, Release, ReleaseProvider};
pub use repository::{REGISTRY_FILE_NAME, Repository, RepositoryRegistry};
pub use resolver::ReleaseResolver;
pub use settings::{Settings, token_from_env};
