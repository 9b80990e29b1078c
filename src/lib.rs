//! # Snapvault - Incremental deduplicated archive backups
//!
//! Snapvault backs up a configured set of source paths into a single
//! password-protected archive per run, copying only content that has not
//! been archived before.
//!
//! ## Overview
//!
//! Each run (a *session*) walks a fixed sequence:
//!
//! 1. **Scan** the source paths into a file list
//! 2. **Hash** every file in parallel into the per-run tracker
//! 3. **Diff** the tracker against the durable ledger of already-archived
//!    digests to select what needs backing up
//! 4. **Stage** the selected files, in parallel, into a session directory
//!    mirroring their original structure
//! 5. **Archive** the session directory through the external archiver
//! 6. **Commit** the successfully copied digests to the ledger under a new
//!    generation
//! 7. **Rotate** old archives and ledger generations past the retention
//!    bound
//! 8. **Clean up** the staging directory
//!
//! Deduplication is by content across generations: a digest archived under
//! any prior generation is skipped in incremental mode regardless of the
//! path it was seen at.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use snapvault::{
//!     CsvEventLog, FileConfig, Overrides, RunConfig, Session, SevenZipArchiver, StdCopier,
//! };
//! use std::path::Path;
//!
//! # fn main() -> snapvault::Result<()> {
//! let file = FileConfig::load(Path::new("snapvault.toml"))?;
//! let config = RunConfig::resolve(file, Overrides::default())?;
//!
//! let sink = CsvEventLog::new("snapvault_log.csv");
//! let archiver = SevenZipArchiver::new();
//! let mut session = Session::new(&config, &StdCopier, &archiver, &sink);
//! let report = session.run()?;
//! println!("archived {} files", report.files_copied);
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! One coordinating thread plus a bounded worker pool per parallel phase
//! (hashing, copying): two sequential fan-out/fan-in episodes per run that
//! never overlap. Workers own their shard exclusively and return plain
//! result maps merged by the coordinator; the ledger and tracker are only
//! ever touched by the coordinator. Concurrent runs against the same
//! target name are not supported and must be serialized externally.
//!
//! ## Error Handling
//!
//! Operations return [`Result<T, SnapvaultError>`](SnapvaultError).
//! Per-item failures (an unreadable file during hashing or copying) are
//! logged as warnings through the [`EventSink`] and the item is skipped;
//! phase failures (a crashed worker, an unopenable ledger, a failed
//! archiver) abort the run after best-effort staging cleanup.

pub mod archive;
pub mod config;
pub mod diff;
pub mod distributor;
pub mod error;
pub mod events;
pub mod hasher;
pub mod ledger;
pub mod rotation;
pub mod scan;
pub mod session;
pub mod staging;
pub mod tracker;
pub mod types;

// Re-export main types for convenience
pub use archive::{Archiver, SevenZipArchiver};
pub use config::{FileConfig, Overrides, RunConfig};
pub use diff::{select_targets, BackupTarget};
pub use error::{Result, SnapvaultError};
pub use events::{CsvEventLog, EventSink, MemorySink, Severity};
pub use ledger::Ledger;
pub use session::{Session, SessionState};
pub use staging::{Copier, StdCopier};
pub use tracker::Tracker;
pub use types::{Generation, SessionReport};
