//! Shared fixtures for integration tests

use snapvault::{
    Archiver, FileConfig, MemorySink, Overrides, Result, RunConfig, Session, SessionReport,
    StdCopier,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Archiver that writes a placeholder file instead of invoking 7z,
/// counting how often it is called.
#[derive(Default)]
pub struct StubArchiver {
    invocations: AtomicUsize,
}

impl StubArchiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn invocations(&self) -> usize {
        self.invocations.load(Ordering::SeqCst)
    }
}

impl Archiver for StubArchiver {
    fn archive(&self, _source_dir: &Path, dest_archive: &Path, _password: &str) -> Result<()> {
        self.invocations.fetch_add(1, Ordering::SeqCst);
        std::fs::write(dest_archive, b"stub-archive")?;
        Ok(())
    }
}

/// Build a resolved configuration rooted in a test directory.
///
/// Sources point at `<root>/data`; staging and archives live under the
/// same root so everything is cleaned up with the TempDir.
pub fn test_config(root: &Path, incremental: bool, rotate_retain: Option<u32>) -> RunConfig {
    let file = FileConfig {
        target: Some("itest".to_string()),
        sources: vec![root.join("data")],
        staging_root: Some(root.join("staging")),
        archive_root: Some(root.join("archives")),
        archive_password: Some("pw".to_string()),
        incremental,
        rotate: rotate_retain.is_some(),
        retain: rotate_retain,
        workers: Some(2),
    };
    RunConfig::resolve(file, Overrides::default()).expect("test config resolves")
}

/// Run one session against the config, returning the report and the sink.
pub fn run_session(
    config: &RunConfig,
    archiver: &dyn Archiver,
) -> (Result<SessionReport>, MemorySink) {
    let sink = MemorySink::new();
    let result = Session::new(config, &StdCopier, archiver, &sink).run();
    (result, sink)
}

/// Archive files currently present for the config's target.
pub fn archive_files(config: &RunConfig) -> Vec<std::path::PathBuf> {
    snapvault::rotation::list_archives(&config.archive_dir())
}
