//! Durable ledger of archived content digests
//!
//! The ledger is the only state shared across runs: a single SQLite table of
//! `(generation, digest)` rows recording which content digests were archived
//! under which backup generation. The diff engine consults it to decide what
//! still needs backing up; rotation deletes whole generations from it.
//!
//! One database file exists per backup target and is opened and closed
//! within a single run. Concurrent runs against the same target are not
//! supported and must be serialized by the caller (e.g. with a run lock).
//!
//! The same digest may legitimately appear under several generations: dedup
//! happens at backup-selection time against the union of covered digests,
//! not at insert time.

use crate::error::Result;
use crate::types::Generation;
use rusqlite::{params, Connection};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Handle to one target's ledger database
#[derive(Debug)]
pub struct Ledger {
    conn: Connection,
    path: PathBuf,
}

impl Ledger {
    /// Open (creating if absent) the ledger at `path`
    ///
    /// Idempotent: safe to call against a database that already holds
    /// generations. Parent directories are created as needed.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS ledger (
                 generation TEXT NOT NULL,
                 digest     TEXT NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_ledger_digest ON ledger (digest);",
        )?;

        debug!("Opened ledger at {:?}", path);
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Record every digest archived by a completed session
    ///
    /// One row per digest, inserted in a single transaction: either all
    /// digests for the session are recorded or none are.
    pub fn record_generation(&mut self, generation: &Generation, digests: &[String]) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO ledger (generation, digest) VALUES (?1, ?2)")?;
            for digest in digests {
                stmt.execute(params![generation.as_str(), digest])?;
            }
        }
        tx.commit()?;

        debug!(
            "Recorded {} digests under generation {}",
            digests.len(),
            generation
        );
        Ok(())
    }

    /// Distinct generations, oldest first
    pub fn generations_oldest_first(&self) -> Result<Vec<Generation>> {
        let mut stmt = self
            .conn
            .prepare("SELECT DISTINCT generation FROM ledger ORDER BY generation ASC")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut generations = Vec::new();
        for row in rows {
            generations.push(Generation::from_string(row?));
        }
        Ok(generations)
    }

    /// Delete every row belonging to one generation
    pub fn delete_generation(&self, generation: &Generation) -> Result<usize> {
        let deleted = self.conn.execute(
            "DELETE FROM ledger WHERE generation = ?1",
            params![generation.as_str()],
        )?;
        debug!("Deleted {} rows for generation {}", deleted, generation);
        Ok(deleted)
    }

    /// Union of digests archived under any generation
    ///
    /// Materialized as a set so the diff engine can do one hashed lookup per
    /// tracked file instead of a relational join.
    pub fn covered_digests(&self) -> Result<HashSet<String>> {
        let mut stmt = self.conn.prepare("SELECT DISTINCT digest FROM ledger")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut digests = HashSet::new();
        for row in rows {
            digests.insert(row?);
        }
        Ok(digests)
    }

    /// Filesystem path of the underlying database
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the underlying handle
    ///
    /// Close failures are logged and swallowed; by this point the run's
    /// writes have already been committed.
    pub fn close(self) {
        let path = self.path;
        if let Err((_conn, err)) = self.conn.close() {
            warn!("Failed to close ledger at {:?}: {}", path, err);
        }
    }
}
