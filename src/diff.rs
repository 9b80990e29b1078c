//! Incremental-backup decision engine
//!
//! Joins the current run's [`Tracker`] against the ledger's covered-digest
//! set to decide which files need backing up. Dedup is by content across
//! generations: a file whose digest was archived under *any* prior
//! generation is skipped in incremental mode, even if its path changed.
//!
//! Files whose hash failed never reached the tracker, so they can neither
//! be selected nor mistaken for covered; the hashing pass surfaces each as
//! a warning when it happens.

use crate::tracker::Tracker;
use std::collections::HashSet;
use std::path::PathBuf;
use tracing::debug;

/// A file selected for backup this session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupTarget {
    /// Absolute path of the source file
    pub source_path: PathBuf,
    /// Content digest recorded by the hashing pass
    pub digest: String,
}

/// Select the files to back up this session
///
/// In incremental mode a tracked file becomes a target only when its digest
/// is absent from `covered`; in full mode every tracked file is a target
/// unconditionally. Output is ordered by source path.
pub fn select_targets(
    tracker: &Tracker,
    covered: &HashSet<String>,
    incremental: bool,
) -> Vec<BackupTarget> {
    let targets: Vec<BackupTarget> = tracker
        .iter()
        .filter(|(_, digest)| !incremental || !covered.contains(*digest))
        .map(|(path, digest)| BackupTarget {
            source_path: path.to_path_buf(),
            digest: digest.to_string(),
        })
        .collect();

    debug!(
        "Selected {} of {} tracked files (incremental={})",
        targets.len(),
        tracker.len(),
        incremental
    );
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tracker_with(entries: &[(&str, &str)]) -> Tracker {
        let mut tracker = Tracker::new();
        for (path, digest) in entries {
            tracker.insert(PathBuf::from(path), digest.to_string());
        }
        tracker
    }

    #[test]
    fn test_covered_digests_are_skipped_incrementally() {
        let tracker = tracker_with(&[
            ("/data/a.txt", "da"),
            ("/data/b.txt", "db"),
            ("/data/c.txt", "dc"),
        ]);
        let covered: HashSet<String> = ["db".to_string()].into_iter().collect();

        let targets = select_targets(&tracker, &covered, true);
        let paths: Vec<&str> = targets
            .iter()
            .map(|t| t.source_path.to_str().unwrap())
            .collect();
        assert_eq!(paths, vec!["/data/a.txt", "/data/c.txt"]);
    }

    #[test]
    fn test_full_mode_ignores_ledger() {
        let tracker = tracker_with(&[("/data/a.txt", "da"), ("/data/b.txt", "db")]);
        let covered: HashSet<String> = ["da".to_string(), "db".to_string()].into_iter().collect();

        assert_eq!(select_targets(&tracker, &covered, false).len(), 2);
    }

    #[test]
    fn test_dedup_is_by_content_not_path() {
        // Same content at a new path: already covered, so not a target.
        let tracker = tracker_with(&[("/data/renamed.txt", "da")]);
        let covered: HashSet<String> = ["da".to_string()].into_iter().collect();

        assert!(select_targets(&tracker, &covered, true).is_empty());
    }

    #[test]
    fn test_empty_ledger_selects_everything() {
        let tracker = tracker_with(&[("/data/a.txt", "da"), ("/data/b.txt", "db")]);
        let covered = HashSet::new();

        assert_eq!(select_targets(&tracker, &covered, true).len(), 2);
    }
}
