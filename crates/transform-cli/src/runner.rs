//! Command dispatch and logging initialization.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::actions::ConfigAction;
use crate::cli::Commands;
use crate::commands;
use crate::commands::config::Config;
use crate::output::{ExitCode, OutputFormat};

/// Initializes logging to stderr.
///
/// `--verbose` forces debug; otherwise `RUST_LOG` wins over the configured
/// level.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: bool, log_level: &str) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
        .context("failed to initialize logging")
}

/// Resolves the output format: the flag wins over the config file.
///
/// # Errors
///
/// Returns an error for an unknown format name.
pub fn resolve_format(flag: Option<&str>, config: &Config) -> Result<OutputFormat> {
    let name = flag.unwrap_or(&config.general.default_format);
    name.parse::<OutputFormat>().map_err(|e| anyhow::anyhow!("{e}"))
}

/// Loads the configuration a command runs with.
///
/// `config init` starts from the defaults so that it can replace a file
/// that no longer parses or validates.
///
/// # Errors
///
/// Returns an error if the file at `path` is unreadable or invalid.
pub fn load_config(command: &Commands, path: &Path) -> Result<Config> {
    match command {
        Commands::Config {
            action: ConfigAction::Init { .. },
        } => Ok(Config::default()),
        _ => Config::load_from(path),
    }
}

/// Executes the specified command.
///
/// `config_path` is the configuration file the `config` subcommands act on.
///
/// # Errors
///
/// Returns an error if the command fails outside its reported outcomes.
pub fn execute_command(
    command: &Commands,
    output_format: OutputFormat,
    config: &Config,
    config_path: &Path,
) -> Result<ExitCode> {
    match command {
        Commands::Run(args) => commands::run::run(args, &config.runtime, output_format),
        Commands::Kinds => commands::kinds::run(output_format),
        Commands::Config { action } => commands::config::run(config_path, *action, output_format),
    }
}
