//! Chunked file hashing: SHA-256, SHA-1, and MD5 in one pass

use dossier_core::{Error, Result};
use md5::Md5;
use sha1::Sha1;
use sha2::{Digest, Sha256};
use std::path::Path;
use tokio::io::AsyncReadExt;

const CHUNK_SIZE: usize = 8 * 1024;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileHashes {
    pub sha256: String,
    pub sha1: String,
    pub md5: String,
}

/// Streams the file once, feeding all three digests per chunk. SHA-1
/// and MD5 are kept for lookups against legacy indicator feeds, not as
/// identities.
pub async fn hash_file(path: &Path) -> Result<FileHashes> {
    let mut file = tokio::fs::File::open(path)
        .await
        .map_err(|e| Error::Extraction(format!("cannot open {}: {}", path.display(), e)))?;

    let mut sha256 = Sha256::new();
    let mut sha1 = Sha1::new();
    let mut md5 = Md5::new();
    let mut buf = [0u8; CHUNK_SIZE];
    let mut total = 0u64;

    loop {
        let n = file
            .read(&mut buf)
            .await
            .map_err(|e| Error::Extraction(format!("read failed on {}: {}", path.display(), e)))?;
        if n == 0 {
            break;
        }
        sha256.update(&buf[..n]);
        sha1.update(&buf[..n]);
        md5.update(&buf[..n]);
        total += n as u64;
    }

    if total == 0 {
        return Err(Error::Extraction(format!(
            "{} is empty, nothing to hash",
            path.display()
        )));
    }

    Ok(FileHashes {
        sha256: hex::encode(sha256.finalize()),
        sha1: hex::encode(sha1.finalize()),
        md5: hex::encode(md5.finalize()),
    })
}

// ============================================================================
// Tests
// ============================================================================
