//! Run configuration
//!
//! Configuration is merged once, before the orchestrator starts, from a
//! TOML file and command-line overrides into an immutable [`RunConfig`].
//! CLI values win over file values via plain precedence; nothing mutates
//! the configuration after resolution. Missing or invalid required values
//! are configuration-fatal and reported before any backup state is touched.

use crate::error::{Result, SnapvaultError};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// On-disk configuration file shape
///
/// Everything is optional here; requiredness is enforced during
/// [`RunConfig::resolve`] so a partial file plus CLI flags can still form a
/// complete configuration.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    /// Backup target name scoping the ledger and archive directory
    #[serde(default)]
    pub target: Option<String>,

    /// Source directories to back up
    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// Root under which per-session staging directories are created
    pub staging_root: Option<PathBuf>,

    /// Root under which per-target archive directories live
    pub archive_root: Option<PathBuf>,

    /// Password handed through to the archive collaborator
    pub archive_password: Option<String>,

    /// Incremental mode flag
    #[serde(default)]
    pub incremental: bool,

    /// Rotation flag
    #[serde(default)]
    pub rotate: bool,

    /// Number of backups retained when rotation is enabled
    pub retain: Option<u32>,

    /// Worker thread count for the parallel phases
    pub workers: Option<usize>,
}

impl FileConfig {
    /// Load a configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        let config = toml::from_str(&content)?;
        debug!("Loaded configuration from {:?}", path);
        Ok(config)
    }
}

/// Command-line overrides applied on top of the file configuration
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    /// Override the target name
    pub target: Option<String>,
    /// Read the source list from a plain-text file, one path per line
    pub list_file: Option<PathBuf>,
    /// Force incremental mode on (the flag cannot turn it off)
    pub incremental: bool,
    /// Enable rotation and set the retain count in one step
    pub rotate_retain: Option<u32>,
    /// Override the worker thread count
    pub workers: Option<usize>,
}

/// Immutable configuration for one backup run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Name scoping this target's ledger and archive directory
    pub target: String,
    /// Source directories to back up
    pub sources: Vec<PathBuf>,
    /// Root for per-session staging directories; also holds the ledger
    pub staging_root: PathBuf,
    /// Root for per-target archive directories
    pub archive_root: PathBuf,
    /// Password handed through to the archive collaborator
    pub archive_password: String,
    /// Incremental mode
    pub incremental: bool,
    /// Rotation enabled
    pub rotate: bool,
    /// Backups retained when rotation is enabled
    pub retain: u32,
    /// Worker thread count for the parallel phases
    pub workers: usize,
}

impl RunConfig {
    /// Merge file and CLI values into a validated, immutable configuration
    pub fn resolve(file: FileConfig, overrides: Overrides) -> Result<Self> {
        let target = overrides
            .target
            .or(file.target)
            .or_else(default_target)
            .ok_or_else(|| {
                SnapvaultError::config("no target name configured and hostname unavailable")
            })?;
        if target.trim().is_empty() {
            return Err(SnapvaultError::config("target name must not be empty"));
        }

        let sources = match overrides.list_file {
            Some(list_file) => read_source_list(&list_file)?,
            None => file.sources,
        };
        if sources.is_empty() {
            return Err(SnapvaultError::config("no source paths configured"));
        }

        let staging_root = file
            .staging_root
            .ok_or_else(|| SnapvaultError::config("staging_root is required"))?;
        let archive_root = file
            .archive_root
            .ok_or_else(|| SnapvaultError::config("archive_root is required"))?;
        let archive_password = file
            .archive_password
            .filter(|password| !password.is_empty())
            .ok_or_else(|| SnapvaultError::config("archive_password is required"))?;

        let incremental = file.incremental || overrides.incremental;

        let (rotate, retain) = match overrides.rotate_retain {
            Some(retain) => (true, retain),
            None => (file.rotate, file.retain.unwrap_or(0)),
        };
        if rotate && retain == 0 {
            return Err(SnapvaultError::config(
                "retain must be at least 1 when rotation is enabled",
            ));
        }

        let workers = overrides
            .workers
            .or(file.workers)
            .unwrap_or_else(num_cpus::get);
        if workers == 0 {
            return Err(SnapvaultError::config("workers must be at least 1"));
        }

        Ok(RunConfig {
            target,
            sources,
            staging_root,
            archive_root,
            archive_password,
            incremental,
            rotate,
            retain,
            workers,
        })
    }

    /// Ledger database path for this target
    ///
    /// Lives under the staging root, which persists across runs; only the
    /// per-session directories beneath it are temporary.
    pub fn ledger_path(&self) -> PathBuf {
        self.staging_root.join(format!("{}.db", self.target))
    }

    /// Archive directory for this target
    pub fn archive_dir(&self) -> PathBuf {
        self.archive_root.join(&self.target)
    }
}

/// Default target name: the machine's hostname
fn default_target() -> Option<String> {
    hostname::get().ok().and_then(|name| name.into_string().ok())
}

/// Read a plain-text source list, one path per line, blank lines skipped
fn read_source_list(path: &Path) -> Result<Vec<PathBuf>> {
    let content = fs::read_to_string(path)?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PathBuf::from)
        .collect())
}
