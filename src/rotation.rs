//! Retention and rotation policy
//!
//! Two retention sites share the "keep newest K" shape but intentionally
//! differ in aggressiveness:
//!
//! - **Archive rotation** may delete several files in one run: the excess is
//!   measured against the archive count *before* this run's archive exists,
//!   and that many oldest files are removed after it is created.
//! - **Ledger rotation** deletes at most the single oldest generation per
//!   run, and only in incremental mode.
//!
//! The asymmetry is preserved deliberately; see DESIGN.md.

use crate::error::Result;
use crate::events::{EventSink, Severity};
use crate::ledger::Ledger;
use crate::types::Generation;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Extension of archive files produced by the archiver collaborator
const ARCHIVE_EXTENSION: &str = "7z";

/// Enumerate existing archive files under a target's archive directory
///
/// Missing directories yield an empty list (first run against a target).
pub fn list_archives(archive_dir: &Path) -> Vec<PathBuf> {
    if !archive_dir.is_dir() {
        return Vec::new();
    }
    WalkDir::new(archive_dir)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .map(|ext| ext == ARCHIVE_EXTENSION)
                .unwrap_or(false)
        })
        .collect()
}

/// Number of archive files to delete after this run's archive is created
///
/// Measured against the count of archives existing *before* the run adds
/// its own: once `existing >= retain - 1`, the excess beyond that threshold
/// must go so the post-run count lands back at `retain`.
pub fn pending_excess(existing: usize, retain: u32) -> usize {
    let keep = retain.saturating_sub(1) as usize;
    existing.saturating_sub(keep)
}

/// Delete the `excess` oldest archive files under `archive_dir`
///
/// Files are ranked by filesystem creation time (modification time where
/// creation time is unsupported), ties broken by path order so tests are
/// deterministic. Returns the number of files deleted.
pub fn prune_archives(archive_dir: &Path, excess: usize, sink: &dyn EventSink) -> Result<usize> {
    if excess == 0 {
        sink.log("No backup rotation required.", Severity::Success);
        return Ok(0);
    }

    let mut ranked: Vec<(SystemTime, PathBuf)> = list_archives(archive_dir)
        .into_iter()
        .map(|path| (file_age(&path), path))
        .collect();
    ranked.sort();

    let mut deleted = 0;
    for (_, path) in ranked.into_iter().take(excess) {
        fs::remove_file(&path)?;
        info!("Rotated out old archive {:?}", path);
        deleted += 1;
    }

    sink.log(
        "Old backups deleted in line with rotation configuration.",
        Severity::Success,
    );
    Ok(deleted)
}

/// Delete the single oldest ledger generation when over the retention bound
///
/// Runs only in incremental mode; prunes exactly one generation per run by
/// design, unlike the archive side which may delete several at once.
/// Returns the pruned generation, if any.
pub fn prune_ledger(ledger: &mut Ledger, retain: u32) -> Result<Option<Generation>> {
    let generations = ledger.generations_oldest_first()?;
    let keep = retain.saturating_sub(1) as usize;
    if generations.len() <= keep {
        debug!(
            "Ledger holds {} generations, within retention of {}",
            generations.len(),
            retain
        );
        return Ok(None);
    }

    let Some(oldest) = generations.into_iter().next() else {
        return Ok(None);
    };
    ledger.delete_generation(&oldest)?;
    info!("Rotated out ledger generation {}", oldest);
    Ok(Some(oldest))
}

fn file_age(path: &Path) -> SystemTime {
    fs::metadata(path)
        .and_then(|meta| meta.created().or_else(|_| meta.modified()))
        .unwrap_or(SystemTime::UNIX_EPOCH)
}
