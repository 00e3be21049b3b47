//! fetcher - install the latest release of tapped GitHub repositories.
//!
//! The binary is a thin shell over this library: [`cli`] parses arguments
//! and maps errors to exit codes, [`commands`] runs `tap`, `list`,
//! `download` and `install` against [`fetcher_core`].

// Commands print their results to stdout and errors to stderr
#![allow(clippy::print_stdout, clippy::print_stderr)]

/// CLI argument parsing and exit codes.
pub mod cli;
/// Command implementations.
pub mod commands;
/// Tracing and logging configuration.
pub mod tracing;

pub use cli::{CliError, Commands};
pub use commands::{CommandOutput, execute, provider_registry};
