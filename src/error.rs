//! Error types for the snapvault library
//!
//! All fallible operations return [`Result<T>`]. The error taxonomy follows
//! the run model: per-item failures (an unreadable file during hashing or
//! copying) are logged and absorbed at the call site and never appear here;
//! everything that does surface as a [`SnapvaultError`] is fatal to the
//! current phase and aborts the run after best-effort cleanup.

use std::path::PathBuf;
use thiserror::Error;

/// Type alias for Results in the snapvault library
pub type Result<T> = std::result::Result<T, SnapvaultError>;

/// Main error type for all snapvault operations
#[derive(Debug, Error)]
pub enum SnapvaultError {
    /// I/O errors during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors from the ledger database
    #[error("Ledger error: {0}")]
    Ledger(#[from] rusqlite::Error),

    /// Configuration file could not be parsed
    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// Missing or invalid configuration values
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A file could not be opened or read while hashing
    #[error("Failed to hash {path:?}: {source}")]
    Hash {
        /// Path of the file that could not be hashed
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// A file could not be copied into the staging tree
    #[error("Failed to copy {path:?}: {source}")]
    Copy {
        /// Path of the file that could not be copied
        path: PathBuf,
        /// Underlying I/O failure
        source: std::io::Error,
    },

    /// The archive collaborator reported failure
    #[error("Archive error: {0}")]
    Archive(String),

    /// A parallel worker terminated abnormally
    #[error("Worker error: {0}")]
    Worker(String),
}

impl SnapvaultError {
    /// Create a configuration error with a custom message
    pub fn config(msg: impl Into<String>) -> Self {
        SnapvaultError::Config(msg.into())
    }

    /// Create an archive error with a custom message
    pub fn archive(msg: impl Into<String>) -> Self {
        SnapvaultError::Archive(msg.into())
    }

    /// Create a worker error with a custom message
    pub fn worker(msg: impl Into<String>) -> Self {
        SnapvaultError::Worker(msg.into())
    }

    /// Check if this error was raised before any backup state was touched
    ///
    /// Configuration errors are reported to the caller without any cleanup,
    /// since nothing has been created yet.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            SnapvaultError::Config(_) | SnapvaultError::ConfigParse(_)
        )
    }
}
