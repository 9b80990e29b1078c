//! Backup session orchestration
//!
//! A session walks a linear state machine with no cycles:
//!
//! ```text
//! Idle → ScanningSources → Hashing → Diffing → StagingCopy → Archiving
//!      → CommittingLedger → Rotating → CleaningUp → Done
//! ```
//!
//! with an absorbing `Failed` state reachable from any step. Every phase
//! logs an `Attempt` event before it runs and a `Success` or `Failure`
//! event after. If the run fails once staging has begun, cleanup of the
//! session directory is still attempted before the error is returned.
//!
//! The coordinator thread owns the ledger and the tracker outright. The
//! two parallel phases (hashing, staging copy) fan out over worker shards
//! and fan back in before the next phase starts; they are never fused,
//! since the set of files to copy is only known after hashing has been
//! diffed against the ledger.
//!
//! Concurrent sessions against the same target are not supported; callers
//! must serialize runs externally (e.g. with a run lock).

use crate::archive::Archiver;
use crate::config::RunConfig;
use crate::diff;
use crate::distributor;
use crate::error::Result;
use crate::events::{EventSink, Severity};
use crate::hasher;
use crate::ledger::Ledger;
use crate::rotation;
use crate::scan;
use crate::staging::{self, Copier};
use crate::tracker::Tracker;
use crate::types::{Generation, SessionReport};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::fs;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{info, instrument};

/// Phase of a backup session
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    /// Session constructed, nothing run yet
    Idle,
    /// Enumerating files under the source paths
    ScanningSources,
    /// Hashing scanned files into the tracker (parallel)
    Hashing,
    /// Joining the tracker against the ledger
    Diffing,
    /// Copying selected files into the staging tree (parallel)
    StagingCopy,
    /// Producing the session archive
    Archiving,
    /// Recording archived digests in the ledger
    CommittingLedger,
    /// Applying the retention policy
    Rotating,
    /// Removing the session staging directory
    CleaningUp,
    /// Session completed successfully
    Done,
    /// Session aborted; absorbing
    Failed,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Idle => "Idle",
            SessionState::ScanningSources => "Scanning sources",
            SessionState::Hashing => "Hashing",
            SessionState::Diffing => "Diffing",
            SessionState::StagingCopy => "Staging copy",
            SessionState::Archiving => "Archiving",
            SessionState::CommittingLedger => "Committing ledger",
            SessionState::Rotating => "Rotating",
            SessionState::CleaningUp => "Cleaning up",
            SessionState::Done => "Done",
            SessionState::Failed => "Failed",
        };
        f.write_str(name)
    }
}

/// One backup run against one target
///
/// Collaborators are injected so the copy transport and archiver can be
/// replaced in tests; the session itself only sequences phases and owns
/// the run's state.
pub struct Session<'a> {
    config: &'a RunConfig,
    copier: &'a dyn Copier,
    archiver: &'a dyn Archiver,
    sink: &'a dyn EventSink,
    state: SessionState,
    generation: Generation,
}

impl<'a> Session<'a> {
    /// Create a session for one run; the generation is fixed at creation
    pub fn new(
        config: &'a RunConfig,
        copier: &'a dyn Copier,
        archiver: &'a dyn Archiver,
        sink: &'a dyn EventSink,
    ) -> Self {
        Self {
            config,
            copier,
            archiver,
            sink,
            state: SessionState::Idle,
            generation: Generation::now(),
        }
    }

    /// Current phase
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Generation this run will commit
    pub fn generation(&self) -> &Generation {
        &self.generation
    }

    /// Execute the full backup session
    ///
    /// On success the session ends in `Done` and returns its report. On
    /// failure the session ends in `Failed`; if staging had already begun,
    /// removal of the session directory is attempted first (cleanup
    /// failures are warnings, never escalated).
    #[instrument(skip(self), fields(target = %self.config.target, generation = %self.generation))]
    pub fn run(&mut self) -> Result<SessionReport> {
        let started = Instant::now();
        match self.execute(started) {
            Ok(report) => {
                self.state = SessionState::Done;
                info!("Backup run completed in {} ms", report.elapsed_ms);
                Ok(report)
            }
            Err(err) => {
                self.sink
                    .log(&format!("{} failed: {}", self.state, err), Severity::Failure);
                if self.state >= SessionState::StagingCopy {
                    self.cleanup_staging();
                }
                self.state = SessionState::Failed;
                Err(err)
            }
        }
    }

    fn execute(&mut self, started: Instant) -> Result<SessionReport> {
        let mut warnings = 0;

        // Archive retention is measured against the count of archives that
        // exist before this run adds its own.
        let archive_dir = self.config.archive_dir();
        let archive_excess = if self.config.rotate {
            self.sink
                .log("Checking number of previous backups...", Severity::Attempt);
            let existing = rotation::list_archives(&archive_dir).len();
            let excess = rotation::pending_excess(existing, self.config.retain);
            self.sink.log("Previous backups checked.", Severity::Success);
            excess
        } else {
            0
        };

        self.enter(SessionState::ScanningSources, "Scanning source paths...");
        let (files, scan_warnings) = scan::scan_sources(&self.config.sources, self.sink);
        warnings += scan_warnings;
        let files_scanned = files.len();
        self.succeed(&format!("File list generated ({} files).", files_scanned));

        self.enter(SessionState::Hashing, "Generating hashes...");
        let sink = self.sink;
        let digests: HashMap<PathBuf, String> =
            distributor::run_sharded(files, self.config.workers, |_, shard| {
                let mut partial = HashMap::new();
                for path in shard {
                    match hasher::hash_file(&path) {
                        Ok(digest) => {
                            partial.insert(path, digest);
                        }
                        Err(_) => {
                            sink.log(
                                &format!("Couldn't generate hash for {}", path.display()),
                                Severity::Warning,
                            );
                        }
                    }
                }
                partial
            })?;
        let mut tracker = Tracker::new();
        for (path, digest) in digests {
            tracker.insert(path, digest);
        }
        let files_tracked = tracker.len();
        warnings += files_scanned - files_tracked;
        self.succeed(&format!("Hashes generated for {} files.", files_tracked));

        self.enter(SessionState::Diffing, "Checking previous backup hashes...");
        let mut ledger = Ledger::open(&self.config.ledger_path())?;
        let covered = if self.config.incremental {
            ledger.covered_digests()?
        } else {
            HashSet::new()
        };
        let targets = diff::select_targets(&tracker, &covered, self.config.incremental);
        let target_count = targets.len();
        self.succeed(&format!(
            "{} of {} files need backup.",
            target_count, files_tracked
        ));

        self.enter(SessionState::StagingCopy, "Copying files to staging...");
        let session_dir = self.session_dir();
        fs::create_dir_all(&session_dir)?;
        let (copied, copy_warnings) = staging::stage_targets(
            targets,
            &session_dir,
            self.config.workers,
            self.copier,
            self.sink,
        )?;
        warnings += copy_warnings;
        let files_copied = copied.len();
        self.succeed("Finished copying files.");

        self.enter(SessionState::Archiving, "Creating archive...");
        fs::create_dir_all(&archive_dir)?;
        let archive_path = archive_dir.join(format!("{}.7z", self.generation));
        self.archiver
            .archive(&session_dir, &archive_path, &self.config.archive_password)?;
        self.succeed("Archive created.");

        self.enter(SessionState::CommittingLedger, "Recording archived hashes...");
        let archived: Vec<String> = copied.into_keys().collect();
        if !archived.is_empty() {
            ledger.record_generation(&self.generation, &archived)?;
        }
        self.succeed(&format!(
            "Recorded {} hashes under generation {}.",
            archived.len(),
            self.generation
        ));

        self.enter(SessionState::Rotating, "Applying rotation policy...");
        let (archives_pruned, generation_pruned) = if self.config.rotate {
            let archives_pruned =
                rotation::prune_archives(&archive_dir, archive_excess, self.sink)?;
            let generation_pruned = if self.config.incremental {
                rotation::prune_ledger(&mut ledger, self.config.retain)?
            } else {
                None
            };
            (archives_pruned, generation_pruned)
        } else {
            self.sink.log("No rotation required.", Severity::Success);
            (0, None)
        };
        self.succeed("Rotation policy applied.");

        self.enter(SessionState::CleaningUp, "Deleting temporary files...");
        if let Err(err) = fs::remove_dir_all(&session_dir) {
            self.sink.log(
                &format!(
                    "Error deleting staging directory {}: {}",
                    session_dir.display(),
                    err
                ),
                Severity::Warning,
            );
            warnings += 1;
        }
        ledger.close();
        self.succeed("Temporary files deleted.");

        Ok(SessionReport {
            generation: self.generation.clone(),
            files_scanned,
            files_tracked,
            targets: target_count,
            files_copied,
            archive_path,
            archives_pruned,
            generation_pruned,
            warnings,
            elapsed_ms: started.elapsed().as_millis() as u64,
        })
    }

    fn session_dir(&self) -> PathBuf {
        self.config.staging_root.join(self.generation.as_str())
    }

    fn enter(&mut self, state: SessionState, message: &str) {
        self.state = state;
        self.sink.log(message, Severity::Attempt);
    }

    fn succeed(&self, message: &str) {
        self.sink.log(message, Severity::Success);
    }

    /// Best-effort removal of the session staging directory after failure
    fn cleanup_staging(&self) {
        let session_dir = self.session_dir();
        if !session_dir.exists() {
            return;
        }
        self.sink
            .log("Deleting temporary files...", Severity::Attempt);
        match fs::remove_dir_all(&session_dir) {
            Ok(()) => self
                .sink
                .log("Temporary files successfully deleted.", Severity::Success),
            Err(err) => self.sink.log(
                &format!(
                    "Error deleting staging directory {}: {}",
                    session_dir.display(),
                    err
                ),
                Severity::Warning,
            ),
        }
    }
}
