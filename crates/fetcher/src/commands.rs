//! Command implementations.
//!
//! Each command returns a [`CommandOutput`] holding both the human-readable
//! text and the JSON payload; the binary decides which one to print.

use fetcher_core::{
    InstallReport, Installer, Platform, ProviderRegistry, ReleaseResolver, RepositoryRegistry,
    Settings, token_from_env,
};
use fetcher_github::{GitHubProvider, HOST_PATTERNS};
use serde_json::{Value, json};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{info, instrument};

use crate::cli::{CliError, Commands};

/// Result of a successful command.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandOutput {
    /// Text printed in normal mode
    pub text: String,
    /// Payload wrapped in an ok envelope in JSON mode
    pub data: Value,
}

/// Build the provider registry used by every command.
pub fn provider_registry(settings: &Settings) -> Result<ProviderRegistry, CliError> {
    let github = GitHubProvider::builder()
        .timeout(settings.http_timeout)
        .build()?;

    let mut providers = ProviderRegistry::new();
    providers.register(github, HOST_PATTERNS)?;
    Ok(providers)
}

/// Run a command against the given settings and providers.
#[instrument(name = "command", skip_all, fields(command = ?command))]
pub async fn execute(
    command: &Commands,
    settings: &Settings,
    providers: &ProviderRegistry,
) -> Result<CommandOutput, CliError> {
    match command {
        Commands::Tap { repo } => {
            tap(settings, repo).map_err(|e| e.context(format!("Error saving repository {repo}")))
        }
        Commands::List => list(settings),
        Commands::Download { repo } => download(settings, providers, repo)
            .await
            .map_err(|e| e.context(format!("Error retrieving latest release {repo}"))),
        Commands::Install { repo, strict } => install(settings, providers, repo, *strict)
            .await
            .map_err(|e| e.context(format!("Error installing release {repo}"))),
    }
}

fn tap(settings: &Settings, url: &str) -> Result<CommandOutput, CliError> {
    let mut repositories = RepositoryRegistry::load(&settings.registry_path)?;
    let repository = repositories.add(url)?;

    let mut text = format!("Tapped {}", repository.url);
    if repository.token().is_none() {
        let _ = write!(
            text,
            "\nUpdate {} to add your token",
            settings.registry_path.display()
        );
    }

    Ok(CommandOutput {
        text,
        data: json!({ "url": repository.url }),
    })
}

fn list(settings: &Settings) -> Result<CommandOutput, CliError> {
    let repositories = RepositoryRegistry::load(&settings.registry_path)?;

    let text = if repositories.is_empty() {
        "No tapped repositories".to_string()
    } else {
        let mut text = String::from("Tapped repositories:");
        for repository in repositories.list() {
            let _ = write!(text, "\n{}", repository.url);
            if repository.is_installed() {
                let _ = write!(text, " ({})", repository.installed_tag_name);
            }
        }
        text
    };

    let data = repositories
        .list()
        .iter()
        .map(|r| {
            json!({
                "url": r.url,
                "installed_tag_name": r.installed_tag_name,
                "installed_filename": r.installed_filename,
            })
        })
        .collect::<Vec<_>>();

    Ok(CommandOutput {
        text,
        data: Value::Array(data),
    })
}

async fn download(
    settings: &Settings,
    providers: &ProviderRegistry,
    name: &str,
) -> Result<CommandOutput, CliError> {
    let mut repositories = RepositoryRegistry::load(&settings.registry_path)?;
    let resolver = ReleaseResolver::new(providers).with_fallback_token(token_from_env());

    // Downloads never need the install directory
    let options = fetcher_core::InstallOptions::new(PathBuf::new())
        .with_download_dir(&settings.download_dir)
        .with_scratch_root(&settings.scratch_root);
    let installer = Installer::new(&mut repositories, resolver, options);
    let paths = installer.download(name).await?;

    let mut text = String::new();
    for path in &paths {
        let _ = writeln!(text, "Downloaded {}", path.display());
    }
    let text = text.trim_end().to_string();

    Ok(CommandOutput {
        text,
        data: json!({
            "files": paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>(),
        }),
    })
}

async fn install(
    settings: &Settings,
    providers: &ProviderRegistry,
    name: &str,
    strict: bool,
) -> Result<CommandOutput, CliError> {
    // Resolve the destination before touching the registry or the network
    let options = settings.install_options(Platform::current())?;
    let destination = options.destination.clone();

    let mut repositories = RepositoryRegistry::load(&settings.registry_path)?;
    let resolver = ReleaseResolver::new(providers).with_fallback_token(token_from_env());
    let mut installer = Installer::new(&mut repositories, resolver, options);
    let report = installer.install(name).await?;

    info!(
        repository = %report.repository,
        tag = %report.tag_name,
        copied = report.copy.copied,
        "Install finished"
    );

    let output = install_output(&report, &destination);
    if strict {
        report.copy.into_result()?;
    }
    Ok(output)
}

fn install_output(report: &InstallReport, destination: &std::path::Path) -> CommandOutput {
    let mut text = format!(
        "Installed {} {} ({}) into {}",
        report.repository,
        report.tag_name,
        report.asset,
        destination.display()
    );
    if !report.copy.is_clean() {
        let _ = write!(
            text,
            "\nWarning: {} entries could not be copied:",
            report.copy.failures.len()
        );
        for failure in &report.copy.failures {
            let _ = write!(text, "\n  {failure}");
        }
    }

    CommandOutput {
        text,
        data: serde_json::to_value(report.summary()).unwrap_or(Value::Null),
    }
}
