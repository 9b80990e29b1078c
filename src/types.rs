//! Core data types shared across snapvault components

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicI64, Ordering};

/// Latest generation timestamp handed out, in milliseconds since the epoch
static LAST_GENERATION_MILLIS: AtomicI64 = AtomicI64::new(0);

/// Identifier for one completed backup run
///
/// Timestamp-derived (`%Y-%m-%d-%H%M%S%.3f`, UTC) with fixed-width fields,
/// so lexicographic order equals chronological order; the ledger relies on
/// this when listing generations oldest-first. Identifiers are clamped to
/// be strictly increasing within a process, so two runs starting in the
/// same instant still get distinct generations. A generation is created
/// when a session commits, is never mutated, and is deleted (together with
/// its ledger rows and archive file) by rotation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Generation(String);

impl Generation {
    /// Generation identifier for a run starting now
    pub fn now() -> Self {
        let mut candidate = Utc::now().timestamp_millis();
        loop {
            let last = LAST_GENERATION_MILLIS.load(Ordering::SeqCst);
            if candidate <= last {
                candidate = last + 1;
            }
            if LAST_GENERATION_MILLIS
                .compare_exchange(last, candidate, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break;
            }
        }

        let stamp = Utc
            .timestamp_millis_opt(candidate)
            .single()
            .unwrap_or_else(Utc::now);
        Generation(stamp.format("%Y-%m-%d-%H%M%S%.3f").to_string())
    }

    /// Wrap an identifier read back from the ledger
    pub fn from_string(id: String) -> Self {
        Generation(id)
    }

    /// The identifier as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Summary of one completed backup session
///
/// Returned by the orchestrator on success; serializable for the CLI's
/// `--json` output.
#[derive(Debug, Clone, Serialize)]
pub struct SessionReport {
    /// Generation committed by this run
    pub generation: Generation,
    /// Files discovered while scanning source paths
    pub files_scanned: usize,
    /// Files successfully hashed into the tracker
    pub files_tracked: usize,
    /// Files selected for backup by the diff engine
    pub targets: usize,
    /// Files successfully copied into the staging tree
    pub files_copied: usize,
    /// Path of the archive produced by this run
    pub archive_path: PathBuf,
    /// Old archive files deleted by rotation
    pub archives_pruned: usize,
    /// Ledger generation deleted by rotation, if any
    pub generation_pruned: Option<Generation>,
    /// Per-item warnings accumulated over the run
    pub warnings: usize,
    /// Wall-clock duration of the run in milliseconds
    pub elapsed_ms: u64,
}
