//! Source path enumeration

use crate::events::{EventSink, Severity};
use std::path::PathBuf;
use tracing::debug;
use walkdir::WalkDir;

/// Recursively enumerate all files under the configured source paths
///
/// Unreadable entries (permission errors, vanished files, broken links) are
/// logged as warnings and skipped; enumeration itself never fails the run.
/// Returns the sorted file list plus the number of warnings emitted.
pub fn scan_sources(sources: &[PathBuf], sink: &dyn EventSink) -> (Vec<PathBuf>, usize) {
    let mut files = Vec::new();
    let mut warnings = 0;

    for source in sources {
        for entry in WalkDir::new(source) {
            match entry {
                Ok(entry) if entry.file_type().is_file() => files.push(entry.into_path()),
                Ok(_) => {}
                Err(err) => {
                    sink.log(
                        &format!("Skipping unreadable entry under {}: {}", source.display(), err),
                        Severity::Warning,
                    );
                    warnings += 1;
                }
            }
        }
    }

    // Sorted so sharding sees the same order every run.
    files.sort();
    debug!("Scanned {} files from {} source paths", files.len(), sources.len());
    (files, warnings)
}
