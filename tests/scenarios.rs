//! End-to-end backup session scenarios
//!
//! These exercise the full scan → hash → diff → stage → archive → commit →
//! rotate → cleanup sequence with a stub archiver, asserting the incremental
//! and rotation behavior observable from the outside: ledger contents,
//! archive files on disk, and the session report.

mod common;

use common::{archive_files, run_session, test_config, StubArchiver};
use snapvault::Ledger;
use std::fs;
use tempfile::TempDir;

/// Empty ledger, incremental mode, three distinct files: everything is
/// selected, and one generation with three digests is committed.
#[test]
fn scenario_a_first_incremental_run_backs_up_everything() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("data/sub")).unwrap();
    fs::write(root.join("data/a.txt"), "alpha").unwrap();
    fs::write(root.join("data/b.txt"), "bravo").unwrap();
    fs::write(root.join("data/sub/c.txt"), "charlie").unwrap();

    let config = test_config(root, true, None);
    let archiver = StubArchiver::new();
    let (result, _sink) = run_session(&config, &archiver);
    let report = result.unwrap();

    assert_eq!(report.files_scanned, 3);
    assert_eq!(report.files_tracked, 3);
    assert_eq!(report.targets, 3);
    assert_eq!(report.files_copied, 3);
    assert!(report.archive_path.exists());

    let ledger = Ledger::open(&config.ledger_path()).unwrap();
    let generations = ledger.generations_oldest_first().unwrap();
    assert_eq!(generations, vec![report.generation.clone()]);
    assert_eq!(ledger.covered_digests().unwrap().len(), 3);
}

/// Running again with nothing changed selects zero targets, but the
/// archive step still runs and produces an archive of the empty session
/// tree (skipping empty archives is a non-goal).
#[test]
fn scenario_b_unchanged_rerun_selects_nothing_but_still_archives() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data/a.txt"), "alpha").unwrap();
    fs::write(root.join("data/b.txt"), "bravo").unwrap();

    let config = test_config(root, true, None);
    let archiver = StubArchiver::new();

    let (first, _) = run_session(&config, &archiver);
    first.unwrap();

    let (second, _) = run_session(&config, &archiver);
    let report = second.unwrap();

    assert_eq!(report.targets, 0);
    assert_eq!(report.files_copied, 0);
    assert_eq!(archiver.invocations(), 2);
    assert!(report.archive_path.exists());

    // No digests were copied, so no second generation was committed.
    let ledger = Ledger::open(&config.ledger_path()).unwrap();
    assert_eq!(ledger.generations_oldest_first().unwrap().len(), 1);
}

/// A modified file is re-selected on the next incremental run; unchanged
/// content stays covered.
#[test]
fn incremental_rerun_picks_up_only_changed_content() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data/a.txt"), "alpha").unwrap();
    fs::write(root.join("data/b.txt"), "bravo").unwrap();

    let config = test_config(root, true, None);
    let archiver = StubArchiver::new();
    run_session(&config, &archiver).0.unwrap();

    fs::write(root.join("data/b.txt"), "bravo v2").unwrap();
    let (result, _) = run_session(&config, &archiver);
    let report = result.unwrap();

    assert_eq!(report.targets, 1);
    assert_eq!(report.files_copied, 1);

    let ledger = Ledger::open(&config.ledger_path()).unwrap();
    assert_eq!(ledger.generations_oldest_first().unwrap().len(), 2);
}

/// With incremental mode off, every tracked file is selected regardless of
/// what the ledger already covers.
#[test]
fn full_mode_ignores_ledger_coverage() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data/a.txt"), "alpha").unwrap();
    fs::write(root.join("data/b.txt"), "bravo").unwrap();

    let config = test_config(root, false, None);
    let archiver = StubArchiver::new();

    run_session(&config, &archiver).0.unwrap();
    let (second, _) = run_session(&config, &archiver);
    let report = second.unwrap();

    assert_eq!(report.targets, 2);
    assert_eq!(report.files_copied, 2);
}

/// retain=2 with three prior archives: after the run, exactly two archive
/// files remain: this run's new archive plus the single newest prior one.
#[test]
fn scenario_c_archive_rotation_prunes_down_to_retain_count() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data/a.txt"), "alpha").unwrap();

    let config = test_config(root, true, Some(2));

    // Three prior archives, created oldest-name-first so creation order
    // matches the generation naming.
    let archive_dir = config.archive_dir();
    fs::create_dir_all(&archive_dir).unwrap();
    for name in [
        "2026-01-01-000000.7z",
        "2026-01-02-000000.7z",
        "2026-01-03-000000.7z",
    ] {
        fs::write(archive_dir.join(name), b"old-archive").unwrap();
    }

    let archiver = StubArchiver::new();
    let (result, _) = run_session(&config, &archiver);
    let report = result.unwrap();

    assert_eq!(report.archives_pruned, 2);
    let mut remaining = archive_files(&config);
    remaining.sort();
    assert_eq!(remaining.len(), 2);
    assert!(remaining.contains(&archive_dir.join("2026-01-03-000000.7z")));
    assert!(remaining.contains(&report.archive_path));
}

/// One unreadable file out of ten: nine digests are tracked, one warning
/// is logged, and the run still completes.
#[test]
#[cfg(unix)]
fn scenario_d_unreadable_file_warns_and_is_skipped() {
    use snapvault::Severity;
    use std::os::unix::fs::PermissionsExt;

    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("data")).unwrap();
    for i in 0..9 {
        fs::write(root.join(format!("data/file{i}.txt")), format!("content {i}")).unwrap();
    }
    let locked = root.join("data/locked.txt");
    fs::write(&locked, "no peeking").unwrap();
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    // Permission bits do not stop a privileged user; skip where they
    // cannot make the file unreadable.
    if fs::File::open(&locked).is_ok() {
        return;
    }

    let config = test_config(root, true, None);
    let archiver = StubArchiver::new();
    let (result, sink) = run_session(&config, &archiver);
    let report = result.unwrap();

    assert_eq!(report.files_scanned, 10);
    assert_eq!(report.files_tracked, 9);
    assert_eq!(report.files_copied, 9);
    assert_eq!(report.warnings, 1);
    assert_eq!(sink.count(Severity::Warning), 1);
    assert_eq!(sink.count(Severity::Failure), 0);
}

/// Repeated rotated runs stay within the retention bound on both sites:
/// at most K archive files, and at most K ledger generations.
#[test]
fn rotation_bound_holds_across_repeated_runs() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("data")).unwrap();

    let retain = 2u32;
    let config = test_config(root, true, Some(retain));
    let archiver = StubArchiver::new();

    for round in 0..4 {
        // New content every round so each run commits a generation.
        fs::write(root.join("data/doc.txt"), format!("round {round}")).unwrap();
        run_session(&config, &archiver).0.unwrap();

        let ledger = Ledger::open(&config.ledger_path()).unwrap();
        let generations = ledger.generations_oldest_first().unwrap().len();
        assert!(
            generations <= retain as usize,
            "round {round}: {generations} ledger generations exceed retain={retain}"
        );
        assert!(
            archive_files(&config).len() <= retain as usize,
            "round {round}: archive count exceeds retain={retain}"
        );
    }
}

/// Staging directories are removed after both successful and failed runs.
#[test]
fn staging_root_holds_only_the_ledger_after_runs() {
    let temp_dir = TempDir::new().unwrap();
    let root = temp_dir.path();
    fs::create_dir_all(root.join("data")).unwrap();
    fs::write(root.join("data/a.txt"), "alpha").unwrap();

    let config = test_config(root, true, None);
    let archiver = StubArchiver::new();
    run_session(&config, &archiver).0.unwrap();
    run_session(&config, &archiver).0.unwrap();

    let entries: Vec<_> = fs::read_dir(root.join("staging"))
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.file_name())
        .collect();
    assert_eq!(entries, vec![std::ffi::OsString::from("itest.db")]);
}
