//! Run command: applies a transform kind to files or stdin through a guest
//! module.

use crate::commands::config::RuntimeConfig;
use crate::output::{ExitCode, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};
use transform_core::{KindSelector, ResultEncoding, TransformKind};
use transform_host::{HostConfig, TransformEngine, TransformInstance, TransformStats};

/// Arguments of the run command.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// Guest module (.wasm)
    #[arg(short, long, env = "WASM_TRANSFORM_MODULE")]
    pub module: PathBuf,

    /// Transform kind name (see `wasm-transform kinds`)
    #[arg(short, long)]
    pub kind: String,

    /// Source files; reads stdin when none are given
    pub files: Vec<PathBuf>,

    /// Rewrite changed files in place instead of printing results
    #[arg(short, long)]
    pub write: bool,

    /// Skip files without a .cs extension
    #[arg(long)]
    pub cs_only: bool,

    /// The guest reads the kind as a name pointer
    #[arg(long)]
    pub name_selector: bool,

    /// The guest returns freshly allocated NUL-terminated results
    #[arg(long)]
    pub allocated_result: bool,

    /// Bytes reserved in the guest for the source text
    #[arg(long)]
    pub heap_size: Option<usize>,

    /// Fuel budget per guest call
    #[arg(long)]
    pub fuel: Option<u64>,

    /// Link WASI preview 1 imports
    #[arg(long)]
    pub wasi: bool,

    /// Include runtime statistics in the report
    #[arg(long)]
    pub stats: bool,
}

impl RunArgs {
    /// Builds the host configuration: file settings, then flag overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the combined settings are invalid.
    pub fn host_config(&self, runtime: &RuntimeConfig) -> transform_core::Result<HostConfig> {
        let mut builder = runtime.host_builder();
        if self.name_selector {
            builder = builder.selector(KindSelector::Name);
        }
        if self.allocated_result {
            builder = builder.encoding(ResultEncoding::NulTerminated);
        }
        if let Some(heap_size) = self.heap_size {
            builder = builder.heap_size(heap_size);
        }
        if let Some(fuel) = self.fuel {
            builder = builder.max_fuel(fuel);
        }
        if self.wasi {
            builder = builder.enable_wasi(true);
        }
        builder.build()
    }

    fn wants(&self, path: &Path) -> bool {
        !self.cs_only
            || path
                .extension()
                .is_some_and(|ext| ext.eq_ignore_ascii_case("cs"))
    }
}

/// What happened to one file.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    /// The transform changed the text
    Changed,
    /// The transform returned the text unchanged
    Unchanged,
    /// Filtered out by `--cs-only`
    Skipped,
    /// Reading, transforming or writing failed
    Failed,
}

/// Per-file result.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FileOutcome {
    /// File path as given
    pub path: String,
    /// Outcome
    pub status: FileStatus,
    /// Failure description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FileOutcome {
    fn new(path: &Path, status: FileStatus) -> Self {
        Self {
            path: path.display().to_string(),
            status,
            error: None,
        }
    }

    fn failed(path: &Path, error: impl ToString) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::new(path, FileStatus::Failed)
        }
    }
}

/// Summary of a run over files.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RunReport {
    /// Kind that was applied
    pub kind: &'static str,
    /// Wire contract used with the guest
    pub contract: String,
    /// Per-file results in argument order
    pub files: Vec<FileOutcome>,
    /// Runtime statistics, with `--stats`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<TransformStats>,
}

impl RunReport {
    /// Returns how many files have `status`.
    #[must_use]
    pub fn count(&self, status: FileStatus) -> usize {
        self.files.iter().filter(|file| file.status == status).count()
    }

    /// Exit code for the report: failure if any file failed.
    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        if self.count(FileStatus::Failed) > 0 {
            ExitCode::ERROR
        } else {
            ExitCode::SUCCESS
        }
    }
}

/// Runs the run command.
///
/// Invalid kinds, settings and modules exit with
/// [`ExitCode::INVALID_INPUT`]; a failed transform exits with
/// [`ExitCode::ERROR`].
///
/// # Errors
///
/// Returns an error if stdin or stdout fail or the report cannot be formatted.
pub fn run(args: &RunArgs, runtime: &RuntimeConfig, output_format: OutputFormat) -> Result<ExitCode> {
    let kind = match args.kind.parse::<TransformKind>() {
        Ok(kind) => kind,
        Err(e) => return Ok(invalid_input(&e)),
    };
    let config = match args.host_config(runtime) {
        Ok(config) => config,
        Err(e) => return Ok(invalid_input(&e)),
    };
    info!("Applying {kind} with {} guest contract", config.contract());

    let (engine, mut instance) = match open_instance(&args.module, config) {
        Ok(opened) => opened,
        Err(e) => return Ok(invalid_input(&e)),
    };

    if args.files.is_empty() {
        return transform_stdin(&mut instance, kind, args.stats.then_some(&engine));
    }

    let files = args
        .files
        .iter()
        .map(|path| process_file(&mut instance, path, kind, args))
        .collect();
    let report = RunReport {
        kind: kind.name(),
        contract: instance.contract().to_string(),
        files,
        stats: args.stats.then(|| engine.collect_stats()),
    };

    let formatted = crate::formatters::format_output(&report, output_format)
        .context("failed to format run report")?;
    // printed results own stdout unless files were rewritten
    if args.write {
        println!("{formatted}");
    } else {
        eprintln!("{formatted}");
    }

    if let Err(e) = instance.close() {
        warn!("Failed to release guest heap: {e}");
    }
    Ok(report.exit_code())
}

fn open_instance(
    module: &Path,
    config: HostConfig,
) -> transform_core::Result<(TransformEngine, TransformInstance)> {
    let engine = TransformEngine::new(config)?;
    let module = engine.load_file(module)?;
    let instance = engine.instantiate(&module)?;
    Ok((engine, instance))
}

/// Transforms one file, printing or rewriting the result.
pub fn process_file(
    instance: &mut TransformInstance,
    path: &Path,
    kind: TransformKind,
    args: &RunArgs,
) -> FileOutcome {
    if !args.wants(path) {
        debug!("Skipping {}", path.display());
        return FileOutcome::new(path, FileStatus::Skipped);
    }

    let source = match fs::read(path) {
        Ok(source) => source,
        Err(e) => return report_failure(path, format!("failed to read: {e}")),
    };
    let result = match instance.transform_bytes(&source, kind) {
        Ok(result) => result,
        Err(e) => return report_failure(path, e),
    };

    let status = if result.as_bytes() == source.as_slice() {
        FileStatus::Unchanged
    } else {
        FileStatus::Changed
    };

    if !args.write {
        print!("{result}");
    } else if status == FileStatus::Changed {
        if let Err(e) = fs::write(path, &result) {
            return report_failure(path, format!("failed to write: {e}"));
        }
        info!("Rewrote {}", path.display());
    }

    FileOutcome::new(path, status)
}

fn transform_stdin(
    instance: &mut TransformInstance,
    kind: TransformKind,
    engine: Option<&TransformEngine>,
) -> Result<ExitCode> {
    let mut source = Vec::new();
    std::io::stdin()
        .read_to_end(&mut source)
        .context("failed to read stdin")?;

    let code = match instance.transform_bytes(&source, kind) {
        Ok(result) => {
            let mut stdout = std::io::stdout().lock();
            stdout
                .write_all(result.as_bytes())
                .and_then(|()| stdout.flush())
                .context("failed to write stdout")?;
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Transform failed: {e}");
            eprintln!("{} {e}", "error:".red().bold());
            ExitCode::ERROR
        }
    };

    if let Some(engine) = engine {
        let stats = crate::formatters::format_output(&engine.collect_stats(), OutputFormat::Text)?;
        eprintln!("{stats}");
    }
    Ok(code)
}

fn report_failure(path: &Path, error: impl ToString) -> FileOutcome {
    let outcome = FileOutcome::failed(path, error);
    warn!(
        "{}: {}",
        outcome.path,
        outcome.error.as_deref().unwrap_or_default()
    );
    outcome
}

fn invalid_input(error: &dyn std::fmt::Display) -> ExitCode {
    error!("{error}");
    eprintln!("{} {error}", "error:".red().bold());
    ExitCode::INVALID_INPUT
}
