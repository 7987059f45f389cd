//! Content digest computation using BLAKE3
//!
//! Files are read in fixed-size chunks so memory use is independent of file
//! size. Same content always produces the same digest.

use crate::types::Digest;
use blake3::Hasher;
use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

/// Fixed read chunk size for streaming file digests.
const CHUNK_SIZE: usize = 64 * 1024;

/// Compute the content digest of a file by streaming it in fixed-size chunks.
///
/// Fails with an `io::Error` if the file cannot be opened or a read fails
/// mid-stream (e.g. the file was deleted between listing and hashing). The
/// caller records this per file and continues the walk.
pub fn digest_file(path: &Path) -> io::Result<Digest> {
    let mut file = File::open(path)?;
    let mut hasher = Hasher::new();
    let mut buf = vec![0u8; CHUNK_SIZE];

    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }

    Ok(*hasher.finalize().as_bytes())
}

/// Compute the digest of an in-memory byte slice.
pub fn digest_bytes(data: &[u8]) -> Digest {
    let mut hasher = Hasher::new();
    hasher.update(data);
    *hasher.finalize().as_bytes()
}
