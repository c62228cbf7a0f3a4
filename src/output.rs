//! Output formatting and styling module.
//!
//! Provides a centralized interface for all user-facing output: status lines,
//! per-event notices, sweep summaries, and errors. Every error goes to stderr
//! with the same `ERROR:` tag so it can be grepped out of a service log.

use crate::watcher::SweepReport;
use colored::*;
use std::path::Path;

/// Prefix tag for every error line.
pub const ERROR_TAG: &str = "ERROR:";

/// Manages all CLI output with consistent styling and formatting.
pub struct OutputFormatter;

impl OutputFormatter {
    /// Prints a success message in green with a checkmark.
    pub fn success(message: &str) {
        println!("{} {}", "✓".green(), message);
    }

    /// Prints an error message to stderr, tagged with [`ERROR_TAG`].
    ///
    /// # Example
    ///
    /// ```no_run
    /// use watchdawg::output::OutputFormatter;
    /// OutputFormatter::error("can't open config.json");
    /// ```
    pub fn error(message: &str) {
        eprintln!("{} {}", ERROR_TAG.red().bold(), message);
    }

    /// Prints a warning message in yellow with a warning symbol.
    pub fn warning(message: &str) {
        println!("{} {}", "⚠".yellow(), message);
    }

    /// Prints an info message in cyan.
    pub fn info(message: &str) {
        println!("{}", message.cyan());
    }

    /// Prints a regular message without styling.
    pub fn plain(message: &str) {
        println!("{}", message);
    }

    /// Prints a section header.
    pub fn header(header: &str) {
        println!("\n{}", header.bold());
    }

    /// Prints a timestamped line for a received filesystem event.
    pub fn event(description: &str) {
        let now = chrono::Local::now().format("%H:%M:%S");
        println!("{} {}", format!("[{}]", now).dimmed(), description);
    }

    /// Prints the startup banner for the watched folder.
    pub fn watching(root: &Path) {
        println!(
            "{} {}",
            "Observing download folder:".bold(),
            root.display().to_string().cyan()
        );
    }

    /// Prints one line per move and per failure of a sweep.
    ///
    /// Sweeps that did nothing print nothing, so redundant sweeps triggered
    /// by our own renames stay quiet.
    pub fn sweep_summary(report: &SweepReport) {
        for op in &report.moved {
            let name = op
                .new_path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            Self::success(&format!("Moved {} to {}/", name, op.category));
        }
        for failure in &report.failures {
            Self::error(&failure.to_string());
        }
    }
}
