use clap::{Parser, Subcommand};
use fetcher_core::settings::DEFAULT_HTTP_TIMEOUT;
use fetcher_core::{REGISTRY_FILE_NAME, Settings};
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Exit codes for the CLI application
pub const EXIT_OK: i32 = 0;
/// Runtime failure exit code (network, archive, filesystem)
pub const EXIT_RUNTIME: i32 = 1;
/// CLI or configuration error exit code
pub const EXIT_CLI: i32 = 2;

/// CLI-specific error types with proper exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Usage or configuration error (exit code 2)
    #[error("{message}")]
    #[diagnostic(code(fetcher::cli::config))]
    Config {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// Failure while talking to a provider or touching the filesystem (exit code 1)
    #[error("{message}")]
    #[diagnostic(code(fetcher::cli::runtime))]
    Runtime {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a new configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            help: None,
        }
    }

    /// Create a new runtime error
    #[must_use]
    pub fn runtime(message: impl Into<String>) -> Self {
        Self::Runtime {
            message: message.into(),
            help: None,
        }
    }

    /// Add help text to an existing error, returning a new error with the help text set.
    #[must_use]
    pub fn with_help(self, help_text: impl Into<String>) -> Self {
        let help = Some(help_text.into());
        match self {
            Self::Config { message, .. } => Self::Config { message, help },
            Self::Runtime { message, .. } => Self::Runtime { message, help },
        }
    }

    /// Prefix the message with what the command was doing.
    #[must_use]
    pub fn context(self, context: impl std::fmt::Display) -> Self {
        match self {
            Self::Config { message, help } => Self::Config {
                message: format!("{context}: {message}"),
                help,
            },
            Self::Runtime { message, help } => Self::Runtime {
                message: format!("{context}: {message}"),
                help,
            },
        }
    }
}

/// Convert `fetcher_core::Error` to the matching `CliError` variant.
///
/// Problems the user can fix by changing arguments or the registry file
/// are configuration errors; everything else is a runtime failure.
impl From<fetcher_core::Error> for CliError {
    fn from(err: fetcher_core::Error) -> Self {
        use fetcher_core::Error as E;

        let help = Diagnostic::help(&err).map(|h| h.to_string());
        let message = err.to_string();
        let cli = match err {
            E::Parse { .. }
            | E::UnsupportedProvider { .. }
            | E::DuplicateProvider { .. }
            | E::RepositoryNotFound { .. }
            | E::Duplicate { .. }
            | E::Destination { .. }
            | E::CorruptState { .. } => Self::config(message),
            E::NoMatchingAsset { .. }
            | E::ProviderRequest { .. }
            | E::ProviderResponse { .. }
            | E::UnsupportedFormat { .. }
            | E::Extraction { .. }
            | E::UnsafeArchiveEntry { .. }
            | E::ScratchDir { .. }
            | E::Io { .. } => Self::runtime(message),
            E::Copy { failures } => {
                let details = failures
                    .iter()
                    .map(|f| format!("  {f}"))
                    .collect::<Vec<_>>()
                    .join("\n");
                Self::runtime(format!("{message}:\n{details}"))
            }
        };
        match help {
            Some(help) => cli.with_help(help),
            None => cli,
        }
    }
}

/// Map CLI error to appropriate exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Config { .. } => EXIT_CLI,
        CliError::Runtime { .. } => EXIT_RUNTIME,
    }
}

/// Render error appropriately based on JSON flag
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let error_envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Config { .. } => "config",
                CliError::Runtime { .. } => "runtime",
            },
            "message": err.to_string()
        }));

        match serde_json::to_string(&error_envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator - always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator - always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Fetch and install the latest release of tapped repositories.
#[derive(Parser, Debug)]
#[command(name = "fetcher")]
#[command(about = "Fetcher is a tool for fetching and installing releases")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        help = "Set logging level",
        default_value = "warn",
        value_enum
    )]
    pub level: crate::tracing::LogLevel,

    /// Log output format.
    #[arg(long, global = true, default_value = "compact", value_enum)]
    pub log_format: crate::tracing::TracingFormat,

    /// Emit JSON envelopes on stdout.
    #[arg(long, global = true, help = "Emit JSON envelope on stdout")]
    pub json: bool,

    /// Repository registry file.
    #[arg(long, global = true, env = "FETCHER_REGISTRY", default_value = REGISTRY_FILE_NAME)]
    pub registry: PathBuf,

    /// Directory releases are installed into. Defaults to `$GOPATH/bin`.
    #[arg(long, global = true, env = "FETCHER_INSTALL_DIR")]
    pub install_dir: Option<PathBuf>,

    /// Directory downloaded assets are written to.
    #[arg(long, global = true, env = "FETCHER_DOWNLOAD_DIR", default_value = ".")]
    pub download_dir: PathBuf,

    /// Timeout for each provider request, in seconds.
    #[arg(long, global = true, env = "FETCHER_HTTP_TIMEOUT", default_value_t = DEFAULT_HTTP_TIMEOUT.as_secs())]
    pub timeout: u64,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Save a repository to the registry.
    #[command(about = "Saves a repository")]
    Tap {
        /// Repository URL, e.g. https://github.com/owner/repo
        repo: String,
    },
    /// List tapped repositories.
    #[command(about = "Lists all saved repositories")]
    List,
    /// Download every asset of the latest release.
    #[command(about = "Fetches the latest release assets for a repository")]
    Download {
        /// Repository URL or short name
        repo: String,
    },
    /// Install the asset of the latest release built for this platform.
    #[command(about = "Installs the latest release assets for a repository")]
    Install {
        /// Repository URL or short name
        repo: String,
        /// Fail when any extracted entry could not be copied.
        #[arg(long)]
        strict: bool,
    },
}

impl Cli {
    /// Settings for this invocation.
    ///
    /// The install directory falls back to `$GOPATH/bin` when neither the
    /// flag nor `FETCHER_INSTALL_DIR` is set.
    #[must_use]
    pub fn settings(&self) -> Settings {
        Settings {
            registry_path: self.registry.clone(),
            install_dir: resolve_install_dir(
                self.install_dir.clone(),
                std::env::var_os("GOPATH"),
            ),
            download_dir: self.download_dir.clone(),
            http_timeout: Duration::from_secs(self.timeout),
            ..Settings::default()
        }
    }
}

/// Pick the install directory from an explicit value or a `GOPATH`.
#[must_use]
pub fn resolve_install_dir(explicit: Option<PathBuf>, gopath: Option<OsString>) -> Option<PathBuf> {
    explicit
        .filter(|dir| !dir.as_os_str().is_empty())
        .or_else(|| {
            gopath
                .filter(|path| !path.is_empty())
                .map(|path| PathBuf::from(path).join("bin"))
        })
}

/// Parse command line arguments.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
