//! Config command and the CLI configuration file.
//!
//! Configuration is stored in TOML format at:
//! - Linux: `~/.config/wasm-transform/config.toml`
//! - macOS: `~/Library/Application Support/wasm-transform/config.toml`
//! - Windows: `%APPDATA%\wasm-transform\config.toml`
//!
//! Command-line flags override file values.

use crate::actions::ConfigAction;
use crate::output::{ExitCode, OutputFormat};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use transform_core::{KindSelector, ResultEncoding, WireContract};
use transform_host::{HostConfig, HostConfigBuilder};

/// CLI configuration.
///
/// # Examples
///
/// ```toml
/// [general]
/// default_format = "pretty"
/// log_level = "info"
///
/// [runtime]
/// selector = "ordinal"
/// encoding = "length-prefixed"
/// heap_size = 1000000
/// memory_limit_mb = 64
/// max_fuel = 100000000
/// enable_wasi = false
/// preserve_bom = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Config {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Guest runtime settings
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

/// General configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct GeneralConfig {
    /// Default output format (json, text, pretty)
    pub default_format: String,

    /// Logging level (trace, debug, info, warn, error)
    pub log_level: String,
}

/// Guest runtime configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Kind selector convention the guest was built with
    pub selector: KindSelector,

    /// Result encoding the guest was built with
    pub encoding: ResultEncoding,

    /// Bytes reserved in the guest for source text and in-place results
    pub heap_size: usize,

    /// Guest memory limit in MB
    pub memory_limit_mb: usize,

    /// Fuel budget per guest call; absent disables metering
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_fuel: Option<u64>,

    /// Link WASI preview 1 imports
    pub enable_wasi: bool,

    /// Restore a byte order mark the guest dropped
    pub preserve_bom: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_format: "pretty".to_string(),
            log_level: "info".to_string(),
        }
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        let host = HostConfig::default();
        Self {
            selector: host.contract().selector,
            encoding: host.contract().encoding,
            heap_size: host.heap_size(),
            memory_limit_mb: HostConfig::DEFAULT_MEMORY_LIMIT_MB,
            max_fuel: host.max_fuel(),
            enable_wasi: host.enable_wasi(),
            preserve_bom: host.preserve_bom(),
        }
    }
}

impl RuntimeConfig {
    /// Returns a host config builder seeded with these settings.
    #[must_use]
    pub fn host_builder(&self) -> HostConfigBuilder {
        let builder = HostConfig::builder()
            .contract(WireContract::new(self.selector, self.encoding))
            .heap_size(self.heap_size)
            .memory_limit_mb(self.memory_limit_mb)
            .enable_wasi(self.enable_wasi)
            .preserve_bom(self.preserve_bom);
        match self.max_fuel {
            Some(fuel) => builder.max_fuel(fuel),
            None => builder.unlimited_fuel(),
        }
    }
}

impl Config {
    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error naming the first invalid value.
    pub fn validate(&self) -> Result<()> {
        if self
            .general
            .default_format
            .parse::<OutputFormat>()
            .is_err()
        {
            anyhow::bail!(
                "invalid general.default_format '{}', must be one of: {}",
                self.general.default_format,
                OutputFormat::NAMES.join(", ")
            );
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            anyhow::bail!(
                "invalid general.log_level '{}', must be one of: {}",
                self.general.log_level,
                valid_levels.join(", ")
            );
        }

        self.runtime
            .host_builder()
            .build()
            .context("invalid [runtime] settings")?;

        Ok(())
    }

    /// Loads the configuration at `path`, or the defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;
        config.validate()?;

        Ok(config)
    }

    /// Validates and writes the configuration to `path`, creating parent
    /// directories.
    ///
    /// # Errors
    ///
    /// Returns an error if validation, serialization or the write fails.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        self.validate()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("failed to create config directory")?;
        }
        let toml_str = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(path, toml_str).context("failed to write config file")?;

        debug!("Saved config to {}", path.display());
        Ok(())
    }
}

/// Returns the platform config file path.
///
/// # Errors
///
/// Returns an error if the platform has no config directory.
pub fn config_path() -> Result<PathBuf> {
    let config_dir = dirs::config_dir().context("failed to determine config directory")?;
    Ok(config_dir.join("wasm-transform").join("config.toml"))
}

/// Result of `config init`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct InitResult {
    /// Whether a file was written
    pub created: bool,
    /// Status message
    pub message: String,
    /// Config file path
    pub path: String,
}

/// Runs the config command against the file at `path`.
///
/// # Errors
///
/// Returns an error if the configuration cannot be read or written.
pub fn run(path: &Path, action: ConfigAction, output_format: OutputFormat) -> Result<ExitCode> {
    info!("Config action: {:?}", action);

    match action {
        ConfigAction::Show => show_config(path, output_format),
        ConfigAction::Init { force } => {
            let result = init_config(path, force)?;
            print_report(&result, output_format)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Writes a default configuration to `path`.
///
/// An existing file is kept unless `force` is set.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn init_config(path: &Path, force: bool) -> Result<InitResult> {
    if path.exists() && !force {
        return Ok(InitResult {
            created: false,
            message: "configuration file already exists (use --force to overwrite)".to_string(),
            path: path.display().to_string(),
        });
    }

    Config::default().save_to(path)?;

    Ok(InitResult {
        created: true,
        message: "configuration file created with default values".to_string(),
        path: path.display().to_string(),
    })
}

fn show_config(path: &Path, output_format: OutputFormat) -> Result<ExitCode> {
    let config = Config::load_from(path)?;
    print_report(&config, output_format)?;
    Ok(ExitCode::SUCCESS)
}

fn print_report<T: Serialize>(report: &T, output_format: OutputFormat) -> Result<()> {
    let formatted = crate::formatters::format_output(report, output_format)
        .context("failed to format configuration")?;
    println!("{formatted}");
    Ok(())
}
