//! Content hashing for change detection
//!
//! Files are fingerprinted with SHA-256, streamed in bounded chunks so
//! memory use stays flat regardless of file size. The digest covers the
//! entire content; the chunk size is a performance tuning knob and has no
//! effect on the resulting digest.

use crate::error::{Result, SnapvaultError};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Read buffer size for streaming file content through the hasher
const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Hash a file's content using SHA-256
///
/// Returns the digest as a 64-character hexadecimal string. Fails with
/// [`SnapvaultError::Hash`] carrying the path if the file cannot be opened
/// or read; callers treat that as a per-item warning and exclude the file
/// from the run's tracker.
pub fn hash_file(path: &Path) -> Result<String> {
    let mut file = File::open(path).map_err(|source| SnapvaultError::Hash {
        path: path.to_path_buf(),
        source,
    })?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];

    loop {
        let bytes_read = file.read(&mut buffer).map_err(|source| SnapvaultError::Hash {
            path: path.to_path_buf(),
            source,
        })?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Hash arbitrary in-memory data using SHA-256
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_rehash_is_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("file.txt");
        fs::write(&path, b"unchanged bytes").unwrap();

        let first = hash_file(&path).unwrap();
        let second = hash_file(&path).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 64);
    }

    #[test]
    fn test_digest_spans_chunk_boundaries() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("big.bin");
        // Larger than one read buffer so the streaming loop iterates.
        let data = vec![0xabu8; HASH_CHUNK_SIZE * 2 + 17];
        fs::write(&path, &data).unwrap();

        assert_eq!(hash_file(&path).unwrap(), hash_bytes(&data));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("absent.txt");

        match hash_file(&path) {
            Err(SnapvaultError::Hash { path: reported, .. }) => assert_eq!(reported, path),
            other => panic!("expected hash error, got {:?}", other),
        }
    }

    #[test]
    fn test_hash_bytes_matches_known_content() {
        let a = hash_bytes(b"content1");
        let b = hash_bytes(b"content1");
        let c = hash_bytes(b"content2");
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
