//! fetcher CLI application.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use fetcher::cli::{self, CliError, EXIT_OK, OkEnvelope, exit_code_for, render_error};
use fetcher::commands::{self, CommandOutput};
use fetcher::tracing::{TracingConfig, init_tracing};

fn main() {
    let cli = cli::parse();

    if let Err(e) = init_tracing(TracingConfig {
        format: cli.log_format,
        level: cli.level.into(),
    }) {
        eprintln!("Failed to initialize tracing: {e}");
    }

    let json_mode = cli.json;
    let exit_code = match run(&cli) {
        Ok(output) => {
            print_output(&output, json_mode);
            EXIT_OK
        }
        Err(err) => {
            render_error(&err, json_mode);
            exit_code_for(&err)
        }
    };
    std::process::exit(exit_code);
}

/// Commands run one at a time, so a current-thread runtime is enough.
fn run(cli: &cli::Cli) -> Result<CommandOutput, CliError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| CliError::runtime(format!("Failed to create tokio runtime: {e}")))?;

    let settings = cli.settings();
    let providers = commands::provider_registry(&settings)?;
    runtime.block_on(commands::execute(&cli.command, &settings, &providers))
}

fn print_output(output: &CommandOutput, json_mode: bool) {
    if json_mode {
        match serde_json::to_string(&OkEnvelope::new(&output.data)) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error serializing response: {e}"),
        }
    } else if !output.text.is_empty() {
        println!("{}", output.text);
    }
}
