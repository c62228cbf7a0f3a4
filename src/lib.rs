//! watchdawg - A downloads folder organizer
//!
//! This library watches a single folder for filesystem changes and, on every
//! change, moves top-level files into category subfolders according to an
//! extension-to-category table loaded from a JSON (or TOML) configuration file.
//! In-progress browser downloads are left alone until they finish.

pub mod cli;
pub mod config;
pub mod file_category;
pub mod file_organizer;
pub mod matcher;
pub mod output;
pub mod watcher;

pub use config::{CategoryRule, Config, ConfigError};
pub use file_category::{CategoryTable, CompiledRule};
pub use file_organizer::{FileOrganizer, MoveOutcome, OrganizeError, TransientFilter};
pub use watcher::{LoopState, SweepReport, Sweeper, WatchLoop};

pub use cli::{Cli, run_cli};
