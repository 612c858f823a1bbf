//! WASM transform CLI.
//!
//! # Examples
//!
//! ```bash
//! # List the transform kinds
//! wasm-transform kinds
//!
//! # Apply a kind to a file
//! wasm-transform run --module transform_guest.wasm --kind TrueToFalse Program.cs
//!
//! # Write a default config file
//! wasm-transform config init
//! ```

use anyhow::Result;
use clap::Parser;
use colored::Colorize;
use transform_cli::cli::Cli;
use transform_cli::commands::config::config_path;
use transform_cli::output::ExitCode;
use transform_cli::runner::{execute_command, init_logging, load_config, resolve_format};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_file = match config_path() {
        Ok(path) => path,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            std::process::exit(ExitCode::INVALID_INPUT.as_i32());
        }
    };

    let config = match load_config(&cli.command, &config_file) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {e:#}", "error:".red().bold());
            std::process::exit(ExitCode::INVALID_INPUT.as_i32());
        }
    };

    init_logging(cli.verbose, &config.general.log_level)?;

    let output_format = match resolve_format(cli.format.as_deref(), &config) {
        Ok(format) => format,
        Err(e) => {
            eprintln!("{} {e}", "error:".red().bold());
            std::process::exit(ExitCode::INVALID_INPUT.as_i32());
        }
    };

    let exit_code = execute_command(&cli.command, output_format, &config, &config_file)?;
    std::process::exit(exit_code.as_i32());
}
