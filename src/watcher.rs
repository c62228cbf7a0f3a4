//! Event-driven sweep loop over the watched folder.
//!
//! Every filesystem change under the root triggers a full sweep: each
//! category rule rescans the root's top level and moves whatever matches.
//! The event payload is only a trigger; it is never correlated with a rule.
//! Sweeps run one at a time on the thread that owns the loop.

use crate::file_category::CategoryTable;
use crate::file_organizer::{FileOrganizer, MoveOutcome, Operation, OrganizeError, TransientFilter};
use crate::matcher::find_matches;
use crate::output::OutputFormatter;
use crossbeam_channel::{Receiver, TryRecvError, select};
use notify::event::{AccessKind, AccessMode};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Errors that prevent the watch loop from starting.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The notification subscription on the root could not be set up.
    #[error("can't watch {}: {source}", path.display())]
    Subscribe {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },
    /// The termination signal handler could not be installed.
    #[error("can't install signal handler: {0}")]
    Signal(#[from] ctrlc::Error),
}

/// Outcome of one sweep over all rules.
#[derive(Debug, Default)]
pub struct SweepReport {
    /// Files moved into category folders.
    pub moved: Vec<Operation>,
    /// In-progress downloads that matched a rule and were left alone.
    pub skipped: usize,
    /// Scans and moves that failed. None of them stopped the sweep.
    pub failures: Vec<OrganizeError>,
    /// The sweep stopped early because shutdown was requested.
    pub interrupted: bool,
}

impl SweepReport {
    /// True if the sweep neither moved nor failed anything.
    pub fn is_quiet(&self) -> bool {
        self.moved.is_empty() && self.failures.is_empty()
    }
}

/// Runs full sweeps of a root against a category table.
#[derive(Debug, Clone)]
pub struct Sweeper {
    root: PathBuf,
    table: CategoryTable,
    transient: TransientFilter,
}

impl Sweeper {
    pub fn new(root: impl Into<PathBuf>, table: CategoryTable, transient: TransientFilter) -> Self {
        Self {
            root: root.into(),
            table,
            transient,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn table(&self) -> &CategoryTable {
        &self.table
    }

    /// Scans the root once per rule and relocates every match.
    ///
    /// Failures are collected rather than returned so that one bad file or
    /// one failed scan never stops the rest of the sweep.
    pub fn sweep(&self) -> SweepReport {
        self.sweep_until(|| false)
    }

    /// Like [`Sweeper::sweep`], but asks `stop` before each rule and each
    /// file and returns early once it answers true.
    pub fn sweep_until(&self, mut stop: impl FnMut() -> bool) -> SweepReport {
        let mut report = SweepReport::default();

        'rules: for rule in self.table.rules() {
            if stop() {
                report.interrupted = true;
                break;
            }

            let matches = match find_matches(&self.root, rule.pattern()) {
                Ok(matches) => matches,
                Err(e) => {
                    report.failures.push(OrganizeError::ScanFailed {
                        root: self.root.clone(),
                        pattern: rule.pattern().to_string(),
                        source: e,
                    });
                    continue;
                }
            };

            for file in matches {
                if stop() {
                    report.interrupted = true;
                    break 'rules;
                }
                match FileOrganizer::relocate(&self.root, rule.category(), &file, &self.transient)
                {
                    Ok(MoveOutcome::Moved(op)) => report.moved.push(op),
                    Ok(MoveOutcome::SkippedTransient) => report.skipped += 1,
                    Err(e) => report.failures.push(e),
                }
            }
        }

        tracing::debug!(
            moved = report.moved.len(),
            skipped = report.skipped,
            failed = report.failures.len(),
            "sweep finished"
        );
        report
    }
}

/// Subscribes to change notifications on `root`, without recursion.
///
/// The returned watcher must be kept alive for as long as events are wanted.
pub fn subscribe(
    root: &Path,
) -> Result<(RecommendedWatcher, Receiver<notify::Result<Event>>), WatchError> {
    let (tx, rx) = crossbeam_channel::unbounded();
    let subscribe_error = |source| WatchError::Subscribe {
        path: root.to_path_buf(),
        source,
    };

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let _ = tx.send(res);
    })
    .map_err(subscribe_error)?;

    watcher
        .watch(root, RecursiveMode::NonRecursive)
        .map_err(subscribe_error)?;

    Ok((watcher, rx))
}

/// Installs a SIGINT/SIGTERM handler and returns the channel it signals on.
///
/// Can only be called once per process.
pub fn shutdown_channel() -> Result<Receiver<()>, WatchError> {
    let (tx, rx) = crossbeam_channel::bounded(1);
    ctrlc::set_handler(move || {
        let _ = tx.try_send(());
    })?;
    Ok(rx)
}

/// Reads and opens don't change the folder, and our own scans produce them.
fn is_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Access(AccessKind::Close(AccessMode::Write)) => true,
        EventKind::Access(_) => false,
        _ => true,
    }
}

/// Where the loop currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Waiting for the next event or a termination request.
    Idle,
    /// Running a sweep in response to an event.
    Reacting,
    /// Terminated; `run` has returned.
    Shutdown,
}

/// Counters accumulated over the lifetime of a loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct LoopStats {
    pub events: usize,
    pub sweeps: usize,
    pub moved: usize,
    pub failures: usize,
}

/// Single-consumer loop driving sweeps from filesystem events.
pub struct WatchLoop {
    sweeper: Sweeper,
    events: Receiver<notify::Result<Event>>,
    shutdown: Receiver<()>,
    debounce: Option<Duration>,
    state: LoopState,
    stats: LoopStats,
}

impl WatchLoop {
    pub fn new(
        sweeper: Sweeper,
        events: Receiver<notify::Result<Event>>,
        shutdown: Receiver<()>,
    ) -> Self {
        Self {
            sweeper,
            events,
            shutdown,
            debounce: None,
            state: LoopState::Idle,
            stats: LoopStats::default(),
        }
    }

    /// Coalesces events arriving within `window` of a trigger into its sweep.
    pub fn with_debounce(mut self, window: Option<Duration>) -> Self {
        self.debounce = window;
        self
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn stats(&self) -> LoopStats {
        self.stats
    }

    /// Processes events until shutdown is requested or the event source closes.
    ///
    /// A message on the shutdown channel, or the channel disconnecting, ends
    /// the loop. Shutdown is also checked while waiting out the debounce
    /// window and between files of a sweep, so a running sweep stops after
    /// its current file. Notification errors are reported and the loop keeps
    /// going.
    pub fn run(&mut self) -> LoopStats {
        let events = self.events.clone();
        let shutdown = self.shutdown.clone();

        loop {
            self.state = LoopState::Idle;

            let keep_going = select! {
                recv(shutdown) -> _ => false,
                recv(events) -> message => match message {
                    Ok(Ok(event)) => self.react(event),
                    Ok(Err(e)) => {
                        self.report_watch_error(&e);
                        true
                    }
                    Err(_) => {
                        tracing::warn!("event source closed, stopping watch loop");
                        false
                    }
                },
            };

            if !keep_going {
                break;
            }
        }

        self.state = LoopState::Shutdown;
        self.stats
    }

    /// Sweeps in response to one event. Returns false once shutdown was requested.
    fn react(&mut self, event: Event) -> bool {
        self.stats.events += 1;
        if !is_change(&event.kind) {
            tracing::trace!(kind = ?event.kind, "ignoring non-change event");
            return true;
        }

        OutputFormatter::event(&format!("Event: {:?} {:?}", event.kind, event.paths));
        let Some(coalesced) = self.drain_burst() else {
            return false;
        };
        if coalesced > 0 {
            tracing::debug!(coalesced, "coalesced burst of events");
        }

        self.state = LoopState::Reacting;
        let shutdown = &self.shutdown;
        let report = self.sweeper.sweep_until(|| shutdown_requested(shutdown));
        self.stats.sweeps += 1;
        self.stats.moved += report.moved.len();
        self.stats.failures += report.failures.len();
        OutputFormatter::sweep_summary(&report);

        if report.interrupted {
            tracing::debug!("sweep interrupted by shutdown request");
        }
        !report.interrupted
    }

    /// Swallows events that arrive within the debounce window.
    ///
    /// Returns `None` if shutdown was requested while waiting.
    fn drain_burst(&mut self) -> Option<usize> {
        let Some(window) = self.debounce else {
            return Some(0);
        };

        let events = self.events.clone();
        let shutdown = self.shutdown.clone();
        let deadline = Instant::now() + window;
        let mut drained = 0;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            select! {
                recv(shutdown) -> _ => return None,
                recv(events) -> message => match message {
                    Ok(Ok(_)) => {
                        self.stats.events += 1;
                        drained += 1;
                    }
                    Ok(Err(e)) => {
                        self.stats.events += 1;
                        self.report_watch_error(&e);
                    }
                    Err(_) => return Some(drained),
                },
                default(remaining) => return Some(drained),
            }
        }
    }

    fn report_watch_error(&mut self, error: &notify::Error) {
        self.stats.failures += 1;
        OutputFormatter::error(&format!("watch error: {}", error));
    }
}

/// A pending message or a dropped sender both mean stop.
fn shutdown_requested(shutdown: &Receiver<()>) -> bool {
    matches!(
        shutdown.try_recv(),
        Ok(()) | Err(TryRecvError::Disconnected)
    )
}
