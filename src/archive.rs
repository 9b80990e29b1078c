//! Archive collaborator
//!
//! Turning a staged session directory into a single encrypted, compressed
//! archive is delegated to an external tool behind the [`Archiver`] trait.
//! The core treats the call as atomic: success means the archive exists at
//! the destination path, failure is phase-fatal.

use crate::error::{Result, SnapvaultError};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info};

/// External archive producer
pub trait Archiver: Send + Sync {
    /// Archive `source_dir` into `dest_archive`, encrypted with `password`
    fn archive(&self, source_dir: &Path, dest_archive: &Path, password: &str) -> Result<()>;
}

/// Archiver invoking the `7z` binary
///
/// The subprocess is launched with an argument array and no shell, so
/// paths containing spaces or quoting metacharacters pass through
/// untouched. Header compression and header encryption are enabled so the
/// archived file listing is itself protected; `-mmt` lets 7-Zip use its
/// own multithreading.
#[derive(Debug, Clone)]
pub struct SevenZipArchiver {
    binary: PathBuf,
}

impl SevenZipArchiver {
    /// Archiver using `7z` from `PATH`
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("7z"),
        }
    }

    /// Archiver using an explicit binary location
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

impl Default for SevenZipArchiver {
    fn default() -> Self {
        Self::new()
    }
}

impl Archiver for SevenZipArchiver {
    fn archive(&self, source_dir: &Path, dest_archive: &Path, password: &str) -> Result<()> {
        debug!("Archiving {:?} to {:?}", source_dir, dest_archive);

        let status = Command::new(&self.binary)
            .arg("a")
            .arg("-t7z")
            .arg("-mhc=on")
            .arg("-mhe=on")
            .arg("-mmt")
            .arg(format!("-p{password}"))
            .arg(dest_archive)
            .arg(source_dir)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map_err(|e| {
                SnapvaultError::archive(format!(
                    "failed to launch {}: {e}",
                    self.binary.display()
                ))
            })?;

        if !status.success() {
            return Err(SnapvaultError::archive(format!(
                "archiver exited with {} for {}",
                status,
                dest_archive.display()
            )));
        }

        info!("Created archive {:?}", dest_archive);
        Ok(())
    }
}
