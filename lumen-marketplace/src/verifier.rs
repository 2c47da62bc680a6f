//! Plugin verification: streaming SHA-512 digests
//!
//! Downloaded binaries are hashed in 8 KiB chunks so large modules never
//! have to be held in memory. Digests are lower-case hex; comparison with the
//! published digest ignores case.

use sdk::errors::HostError;
use sha2::{Digest, Sha512};
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

const CHUNK_SIZE: usize = 8192;

/// Compute the SHA-512 digest of `data` and return it as lower-case hex
pub fn compute_hash(data: &[u8]) -> String {
    let mut hasher = Sha512::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Compute the SHA-512 digest of a file, reading it in chunks
pub fn digest_file(path: &Path) -> Result<String, HostError> {
    let mut file = File::open(path)?;
    let mut hasher = Sha512::new();

    let mut buffer = [0u8; CHUNK_SIZE];
    loop {
        let bytes_read = file.read(&mut buffer)?;
        if bytes_read == 0 {
            break;
        }
        hasher.update(&buffer[..bytes_read]);
    }

    Ok(hex::encode(hasher.finalize()))
}

/// Verify that the file at `path` has the expected digest
///
/// On mismatch the file is deleted and both digests are logged. The file
/// contents are never logged.
pub fn verify_file(path: &Path, expected: &str) -> Result<(), HostError> {
    tracing::debug!("Verifying file hash: {}", path.display());

    let actual = digest_file(path)?;
    if actual.eq_ignore_ascii_case(expected.trim()) {
        tracing::debug!("File hash verified: {}", path.display());
        return Ok(());
    }

    tracing::error!(
        "Hash mismatch for {}: expected {}, got {}",
        path.display(),
        expected,
        actual
    );

    if let Err(e) = std::fs::remove_file(path) {
        tracing::warn!("Failed to delete unverified file {}: {}", path.display(), e);
    }

    Err(HostError::HashMismatch {
        path: path.to_path_buf(),
        expected: expected.to_string(),
        actual,
    })
}

/// Run [`verify_file`] on the blocking pool
pub async fn verify_file_async(path: PathBuf, expected: String) -> Result<(), HostError> {
    tokio::task::spawn_blocking(move || verify_file(&path, &expected))
        .await
        .map_err(|e| HostError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HELLO_SHA512: &str = "309ecc489c12d6eb4cc40f50c902f2b4d0ed77ee511a7c7a9bcd3ca86d4cd86f989dd35bc5ff499670da34255b45b0cfd830e81f605dcf7dc5542e93ae9cd76f";

    #[test]
    fn test_compute_hash_known_vector() {
        assert_eq!(compute_hash(b"hello world"), HELLO_SHA512);
    }

    #[test]
    fn test_digest_file_matches_in_memory_hash_across_chunks() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("big.bin");
        let data: Vec<u8> = (0..(CHUNK_SIZE * 3 + 17)).map(|i| (i % 251) as u8).collect();
        std::fs::File::create(&path).unwrap().write_all(&data).unwrap();

        assert_eq!(digest_file(&path).unwrap(), compute_hash(&data));
    }

    #[test]
    fn test_verify_file_is_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libclock.so");
        std::fs::write(&path, b"hello world").unwrap();

        assert!(verify_file(&path, &HELLO_SHA512.to_uppercase()).is_ok());
        assert!(path.exists());
    }

    #[test]
    fn test_verify_file_mismatch_deletes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libclock.so");
        std::fs::write(&path, b"tampered").unwrap();

        let err = verify_file(&path, HELLO_SHA512).unwrap_err();
        match err {
            HostError::HashMismatch { expected, actual, .. } => {
                assert_eq!(expected, HELLO_SHA512);
                assert_eq!(actual, compute_hash(b"tampered"));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_digest_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = digest_file(&dir.path().join("missing")).unwrap_err();
        assert!(matches!(err, HostError::Io(_)));
    }

    #[tokio::test]
    async fn test_verify_file_async() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("libclock.so");
        std::fs::write(&path, b"hello world").unwrap();

        verify_file_async(path, HELLO_SHA512.to_string()).await.unwrap();
    }
}
