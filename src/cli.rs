//! Command-line interface module for watchdawg.
//!
//! This module handles all CLI-related functionality including:
//! - Argument parsing
//! - Logging setup
//! - Startup (configuration, root resolution, folder bootstrap)
//! - Running either a single sweep or the watch loop until a termination signal

use crate::config::{Config, ConfigError};
use crate::file_category::CategoryTable;
use crate::file_organizer::{FileOrganizer, OrganizeError, TransientFilter};
use crate::output::OutputFormatter;
use crate::watcher::{self, LoopStats, SweepReport, Sweeper, WatchError, WatchLoop};
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Watch a downloads folder and sort new files into category folders.
#[derive(Debug, Clone, Default, Parser)]
#[command(name = "watchdawg", version, about)]
pub struct Cli {
    /// Path to the configuration file (JSON, or TOML with a .toml extension)
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Folder to watch, overriding the configuration and ~/Downloads
    #[arg(short, long, value_name = "DIR")]
    pub folder: Option<PathBuf>,

    /// Sort the folder once and exit instead of watching it
    #[arg(long)]
    pub once: bool,

    /// Print debug diagnostics
    #[arg(short, long)]
    pub verbose: bool,
}

/// Fatal startup errors. Anything that happens after the loop starts is
/// reported and survived instead.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Organize(#[from] OrganizeError),
    #[error(transparent)]
    Watch(#[from] WatchError),
}

/// What a run ended with.
#[derive(Debug)]
pub enum RunSummary {
    /// `--once`: the result of the single sweep.
    Sweep(SweepReport),
    /// The watch loop stopped after a termination signal.
    Watched(LoopStats),
}

/// Everything needed to start sweeping, built from the configuration.
#[derive(Debug)]
pub struct Startup {
    pub config: Config,
    pub root: PathBuf,
    pub sweeper: Sweeper,
}

/// Loads configuration, resolves the root, and creates category folders.
///
/// The root is made absolute against the current directory, so every path
/// reported afterwards is absolute.
///
/// # Errors
///
/// Every failure here is fatal: missing or malformed configuration, an
/// unknown home directory, or a category folder that can't be created.
pub fn prepare(cli: &Cli) -> Result<Startup, CliError> {
    let config = Config::load(cli.config.as_deref())?;
    config.validate()?;
    let table = CategoryTable::new(&config.filetypes)?;
    let root = config.resolve_root(cli.folder.as_deref())?;
    let root = std::path::absolute(&root).map_err(|source| OrganizeError::InvalidBasePath {
        path: root.clone(),
        source,
    })?;

    for rule in table.rules() {
        tracing::debug!(
            name = %rule.rule().name,
            extension = rule.extension(),
            category = rule.category(),
            "loaded rule"
        );
    }

    OutputFormatter::info("Watch Dawg started...");
    OutputFormatter::plain("Checking category folders...");
    let created = FileOrganizer::ensure_category_folders(&root, &table)?;
    for folder in &created {
        OutputFormatter::plain(&format!("  created {}", folder.display()));
    }
    OutputFormatter::success("Done!");

    let transient = TransientFilter::new(config.transient_suffixes.iter().cloned());
    let sweeper = Sweeper::new(&root, table, transient);

    Ok(Startup {
        config,
        root,
        sweeper,
    })
}

/// Runs the application for already-parsed arguments.
///
/// With `--once` this performs one sweep and returns. Otherwise it
/// subscribes to the root, installs the termination handler, and blocks in
/// the watch loop until SIGINT or SIGTERM.
pub fn run_cli(cli: &Cli) -> Result<RunSummary, CliError> {
    let startup = prepare(cli)?;

    if cli.once {
        let report = startup.sweeper.sweep();
        OutputFormatter::sweep_summary(&report);
        if !report.failures.is_empty() {
            OutputFormatter::warning("Some files could not be sorted. Please review errors above.");
        }
        OutputFormatter::plain(&format!(
            "Sorted {} file(s), {} failed.",
            report.moved.len(),
            report.failures.len()
        ));
        return Ok(RunSummary::Sweep(report));
    }

    // Keep the watcher alive until the loop returns.
    let (_watcher, events) = watcher::subscribe(startup.sweeper.root())?;
    let shutdown = watcher::shutdown_channel()?;

    OutputFormatter::watching(startup.sweeper.root());

    let mut watch_loop = WatchLoop::new(startup.sweeper, events, shutdown)
        .with_debounce(startup.config.debounce());
    let stats = watch_loop.run();

    OutputFormatter::header("Shutting down Watch Dawg.");
    OutputFormatter::plain(&format!(
        "{} event(s), {} sweep(s), {} file(s) moved.",
        stats.events, stats.sweeps, stats.moved
    ));
    Ok(RunSummary::Watched(stats))
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` wins when set; otherwise `--verbose` selects debug output for
/// this crate and the default is warnings only.
pub fn init_logging(verbose: bool) {
    let default = if verbose { "watchdawg=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
