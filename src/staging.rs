//! Staging tree construction
//!
//! Selected files are copied into a per-session directory that mirrors
//! their original structure (root separators and drive prefixes stripped),
//! so the archive of the session directory preserves provenance. The copy
//! transport is a collaborator behind the [`Copier`] trait: the core hands
//! it a source directory, a pre-created destination directory, and a file
//! name, and only looks at success or failure.

use crate::diff::BackupTarget;
use crate::distributor;
use crate::error::{Result, SnapvaultError};
use crate::events::{EventSink, Severity};
use std::collections::HashMap;
use std::ffi::OsStr;
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

/// File-copy transport invoked once per staged file
pub trait Copier: Send + Sync {
    /// Copy `filename` from `source_dir` into `dest_dir`
    ///
    /// `dest_dir` is guaranteed to exist; the orchestrator pre-creates the
    /// staging tree before the copy pass starts.
    fn copy(&self, source_dir: &Path, dest_dir: &Path, filename: &OsStr) -> Result<()>;
}

/// Default transport backed by `std::fs::copy`
#[derive(Debug, Default)]
pub struct StdCopier;

impl Copier for StdCopier {
    fn copy(&self, source_dir: &Path, dest_dir: &Path, filename: &OsStr) -> Result<()> {
        let from = source_dir.join(filename);
        let to = dest_dir.join(filename);
        fs::copy(&from, &to).map_err(|source| SnapvaultError::Copy { path: from, source })?;
        Ok(())
    }
}

/// Location a source file occupies inside the session directory
///
/// Built from structured path components: normal components are kept,
/// root separators dropped, and drive prefixes reduced to their letter
/// (`C:` becomes `C`), mirroring the source layout without any string
/// surgery on separators.
pub fn staged_path(session_dir: &Path, source_path: &Path) -> PathBuf {
    let mut staged = session_dir.to_path_buf();
    for component in source_path.components() {
        match component {
            Component::Normal(part) => staged.push(part),
            Component::Prefix(prefix) => {
                let cleaned = prefix.as_os_str().to_string_lossy().replace(':', "");
                if !cleaned.is_empty() {
                    staged.push(cleaned);
                }
            }
            Component::RootDir | Component::CurDir | Component::ParentDir => {}
        }
    }
    staged
}

/// Copy all backup targets into the session directory in parallel
///
/// Destination directories are created up front by the coordinator; the
/// workers then only invoke the copier. Per-file copy failures are logged
/// as warnings and the file is omitted from the result, so its digest will
/// not be committed to the ledger and the file is retried naturally on the
/// next run. Returns digest → staged path for every successful copy,
/// plus the warning count.
pub fn stage_targets(
    targets: Vec<BackupTarget>,
    session_dir: &Path,
    workers: usize,
    copier: &dyn Copier,
    sink: &dyn EventSink,
) -> Result<(HashMap<String, PathBuf>, usize)> {
    for target in &targets {
        if let Some(dir) = staged_path(session_dir, &target.source_path).parent() {
            fs::create_dir_all(dir)?;
        }
    }

    let expected = targets.len();
    let copied = distributor::run_sharded(targets, workers, |_, shard| {
        let mut copied = HashMap::new();
        for target in shard {
            let staged = staged_path(session_dir, &target.source_path);
            let source_dir = target.source_path.parent();
            let filename = target.source_path.file_name();
            let dest_dir = staged.parent();

            let (Some(source_dir), Some(filename), Some(dest_dir)) =
                (source_dir, filename, dest_dir)
            else {
                sink.log(
                    &format!("Error copying {}: invalid path", target.source_path.display()),
                    Severity::Warning,
                );
                continue;
            };

            match copier.copy(source_dir, dest_dir, filename) {
                Ok(()) => {
                    copied.insert(target.digest, staged);
                }
                Err(err) => {
                    sink.log(
                        &format!("Error copying {}: {}", target.source_path.display(), err),
                        Severity::Warning,
                    );
                }
            }
        }
        copied
    })?;

    let warnings = expected - copied.len();
    debug!("Staged {} of {} targets", copied.len(), expected);
    Ok((copied, warnings))
}
