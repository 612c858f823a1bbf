//! Command-line driver for WASM text transform guests.
//!
//! Exposes the command implementations so they can be tested without
//! spawning the binary.

#![allow(clippy::format_push_string)]
#![allow(clippy::missing_errors_doc)]

pub mod actions;
pub mod cli;
pub mod commands;
pub mod formatters;
pub mod output;
pub mod runner;

pub use actions::ConfigAction;
pub use output::{ExitCode, OutputFormat};
