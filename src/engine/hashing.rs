//! File hashing utilities

use blake3::Hasher;
use memmap2::Mmap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::error::ScanError;
use crate::utils::config::HashingConsts;

/// Hash a file with blake3 and return the hex digest. Uses memory-mapped I/O for files above
/// threshold, chunked reading otherwise. Any I/O failure is a [`ScanError::TransientIo`].
pub fn hash_file(path: &Path) -> Result<String, ScanError> {
    let file = File::open(path).map_err(|e| ScanError::io(path, e))?;
    let size = file.metadata().map_err(|e| ScanError::io(path, e))?.len();
    let mut hasher = Hasher::new();

    if size > HashingConsts::HASH_MMAP_THRESHOLD {
        // Memory-mapped I/O for large files (Blake3 already uses SIMD internally)
        let mmap = unsafe { Mmap::map(&file).map_err(|e| ScanError::io(path, e))? };
        hasher.update(&mmap);
    } else {
        let mut reader =
            std::io::BufReader::with_capacity(HashingConsts::HASH_READ_CHUNK_SIZE, file);
        let mut buffer = vec![0u8; HashingConsts::HASH_READ_CHUNK_SIZE];
        loop {
            let n = reader.read(&mut buffer).map_err(|e| ScanError::io(path, e))?;
            if n == 0 {
                break;
            }
            hasher.update(&buffer[..n]);
        }
    }

    Ok(hasher.finalize().to_hex().to_string())
}

/// Hash in-memory content the same way [`hash_file`] hashes a file.
pub fn hash_bytes(data: &[u8]) -> String {
    blake3::hash(data).to_hex().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_hash_matches_content_hash() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.php");
        std::fs::write(&path, b"<?php echo 1;").unwrap();
        assert_eq!(hash_file(&path).unwrap(), hash_bytes(b"<?php echo 1;"));
    }

    #[test]
    fn missing_file_is_transient() {
        let err = hash_file(Path::new("/definitely/not/here.php")).unwrap_err();
        assert!(matches!(err, ScanError::TransientIo { .. }));
    }
}
