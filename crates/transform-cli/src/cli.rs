//! CLI argument definitions and parsing.

use clap::{Parser, Subcommand};

use crate::actions::ConfigAction;
use crate::commands::run::RunArgs;

/// Apply source transforms through a sandboxed WASM guest.
///
/// The guest module exports `transform`, `alloc`, `dealloc` and `memory`;
/// `--name-selector` and `--allocated-result` pick the calling convention
/// it was built with.
#[derive(Parser, Debug)]
#[command(name = "wasm-transform")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (json, text, pretty); defaults to the config file value
    #[arg(long = "format", global = true)]
    pub format: Option<String>,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply a transform kind to files, or to stdin when no files are given.
    ///
    /// # Examples
    ///
    /// ```bash
    /// # Print the transformed file
    /// wasm-transform run -m transform_guest.wasm -k TrueToFalse Program.cs
    ///
    /// # Rewrite every C# file in place
    /// wasm-transform run -m transform_guest.wasm -k IntTypeToLongType --write --cs-only src/*
    ///
    /// # Filter stdin through a name-selector build
    /// cat Program.cs | wasm-transform run -m guest.wasm -k Identity --name-selector
    /// ```
    Run(RunArgs),

    /// List transform kinds with their ordinals and names.
    Kinds,

    /// Show or initialise the configuration file.
    Config {
        /// Configuration action
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_cli_parsing_run() {
        let cli = Cli::parse_from([
            "wasm-transform",
            "run",
            "--module",
            "guest.wasm",
            "--kind",
            "TrueToFalse",
            "a.cs",
            "b.cs",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("Expected Run command");
        };
        assert_eq!(args.module, PathBuf::from("guest.wasm"));
        assert_eq!(args.kind, "TrueToFalse");
        assert_eq!(args.files, vec![PathBuf::from("a.cs"), PathBuf::from("b.cs")]);
        assert!(!args.write);
        assert!(!args.cs_only);
    }

    #[test]
    fn test_cli_parsing_run_flags() {
        let cli = Cli::parse_from([
            "wasm-transform",
            "run",
            "-m",
            "guest.wasm",
            "-k",
            "Identity",
            "--write",
            "--cs-only",
            "--name-selector",
            "--allocated-result",
            "--heap-size",
            "4096",
            "--fuel",
            "1000000",
            "--wasi",
            "--stats",
        ]);
        let Commands::Run(args) = cli.command else {
            panic!("Expected Run command");
        };
        assert!(args.files.is_empty());
        assert!(args.write && args.cs_only && args.wasi && args.stats);
        assert!(args.name_selector && args.allocated_result);
        assert_eq!(args.heap_size, Some(4096));
        assert_eq!(args.fuel, Some(1_000_000));
    }

    #[test]
    fn test_cli_run_requires_kind() {
        let result = Cli::try_parse_from(["wasm-transform", "run", "--module", "guest.wasm"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parsing_kinds() {
        let cli = Cli::parse_from(["wasm-transform", "kinds", "--format", "json"]);
        assert!(matches!(cli.command, Commands::Kinds));
        assert_eq!(cli.format.as_deref(), Some("json"));
    }

    #[test]
    fn test_cli_parsing_config() {
        let cli = Cli::parse_from(["wasm-transform", "config", "init", "--force"]);
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Init { force: true }
            }
        ));

        let cli = Cli::parse_from(["wasm-transform", "-v", "config", "show"]);
        assert!(cli.verbose);
        assert!(cli.format.is_none());
    }
}
