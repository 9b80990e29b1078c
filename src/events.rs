//! Append-only event log for backup runs
//!
//! Every externally visible step of a run is recorded as a `(message,
//! severity)` pair through the [`EventSink`] trait. The sink is an audit
//! trail for operators, distinct from the developer-facing `tracing` output:
//! the orchestrator logs an `Attempt` before each phase and a `Success` or
//! `Failure` after it, and workers log `Warning` for per-item failures.
//!
//! Sinks must never raise. [`CsvEventLog`] swallows I/O errors on append;
//! a log that cannot be written must not take the backup down with it.

use chrono::Local;
use colored::Colorize;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;

/// Severity of a logged event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    /// A phase is about to run
    Attempt,
    /// A phase or step completed
    Success,
    /// A per-item failure; the run continues
    Warning,
    /// A fatal failure; the run is aborting
    Failure,
}

impl Severity {
    /// Fixed-width label used for console echo
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Attempt => "ATTEMPT",
            Severity::Success => "SUCCESS",
            Severity::Warning => "WARNING",
            Severity::Failure => "FAILURE",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Severity::Attempt => "Attempt",
            Severity::Success => "Success",
            Severity::Warning => "Warning",
            Severity::Failure => "Failure",
        };
        write!(f, "{}", name)
    }
}

/// Sink accepting backup run events
///
/// Implementations must be infallible from the caller's perspective and
/// safe to share across the worker threads of a parallel phase.
pub trait EventSink: Send + Sync {
    /// Record one event. Must never panic or propagate errors.
    fn log(&self, message: &str, severity: Severity);
}

/// CSV-file event log, one `date,time,severity,message` row per event
///
/// Rows are appended with local timestamps. Optionally echoes each row to
/// the console with a colorized severity label; colorization is purely a
/// presentation concern of this sink and never reaches the core.
#[derive(Debug)]
pub struct CsvEventLog {
    path: PathBuf,
    echo: bool,
}

impl CsvEventLog {
    /// Create a sink appending to `path` (created on first event)
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            echo: false,
        }
    }

    /// Also echo each event to stdout with a colorized severity label
    pub fn with_echo(mut self, echo: bool) -> Self {
        self.echo = echo;
        self
    }
}

impl EventSink for CsvEventLog {
    fn log(&self, message: &str, severity: Severity) {
        let now = Local::now();
        let date = now.format("%Y-%m-%d");
        let time = now.format("%H:%M:%S");

        let row = format!("{},{},{},{}\n", date, time, severity, message);
        // Append errors are swallowed: the sink must never raise.
        if let Ok(mut file) = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
        {
            let _ = file.write_all(row.as_bytes());
        }

        if self.echo {
            let label = match severity {
                Severity::Attempt => severity.label().normal(),
                Severity::Success => severity.label().white().on_green(),
                Severity::Warning => severity.label().black().on_yellow(),
                Severity::Failure => severity.label().white().on_red(),
            };
            println!("[{} {}] [{}] {}", date, time, label, message);
        }
    }
}

/// In-memory event sink
///
/// Collects events for later inspection. Useful for embedding the library
/// and asserting on run behavior in tests.
#[derive(Debug, Default)]
pub struct MemorySink {
    events: Mutex<Vec<(String, Severity)>>,
}

impl MemorySink {
    /// Create an empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events logged so far, in order
    pub fn events(&self) -> Vec<(String, Severity)> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of events logged with the given severity
    pub fn count(&self, severity: Severity) -> usize {
        self.events()
            .iter()
            .filter(|(_, s)| *s == severity)
            .count()
    }
}

impl EventSink for MemorySink {
    fn log(&self, message: &str, severity: Severity) {
        if let Ok(mut events) = self.events.lock() {
            events.push((message.to_string(), severity));
        }
    }
}
