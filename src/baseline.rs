//! Baseline recording for one directory.

use anyhow::Result;
use log::debug;
use rayon::prelude::*;
use std::path::{Path, PathBuf};

use crate::engine::enumerator::TreeEnumerator;
use crate::engine::hashing::hash_file;
use crate::engine::store::HashStore;
use crate::engine::tools::path_to_db_string;
use crate::error::ScanError;

/// Hash the eligible files of `dir` on the rayon pool. Unreadable files are logged and left out.
pub(crate) fn hash_dir_files(
    enumerator: &TreeEnumerator<'_>,
    dir: &Path,
) -> Vec<(PathBuf, String)> {
    let files = match enumerator.list_files(dir) {
        Ok(files) => files,
        Err(err) => {
            debug!("skipping directory: {}", err);
            return Vec::new();
        }
    };
    hash_listed_files(files)
}

/// Files may vanish or turn unreadable after listing; those are dropped, the rest still hashed.
fn hash_listed_files(files: Vec<PathBuf>) -> Vec<(PathBuf, String)> {
    let hashed: Vec<(PathBuf, Result<String, ScanError>)> = files
        .into_par_iter()
        .map(|f| {
            let h = hash_file(&f);
            (f, h)
        })
        .collect();
    hashed
        .into_iter()
        .filter_map(|(path, h)| match h {
            Ok(h) => Some((path, h)),
            Err(err) => {
                debug!("skipping file: {}", err);
                None
            }
        })
        .collect()
}

/// Record the current hash of every eligible file in `dir` with drift marker 0.
///
/// Existing records are overwritten, which also clears the drift marker of a file that was
/// flagged earlier. Returns how many files were recorded. Only store failures are errors.
pub fn build_hashes_for_dir<S: HashStore + ?Sized>(
    store: &S,
    enumerator: &TreeEnumerator<'_>,
    dir: &Path,
) -> Result<usize> {
    let hashed = hash_dir_files(enumerator, dir);
    for (path, hash) in &hashed {
        store.upsert_record(&path_to_db_string(path), hash, 0)?;
    }
    Ok(hashed.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::hashing::hash_bytes;

    #[test]
    fn file_gone_after_listing_is_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let kept = tmp.path().join("a.php");
        let gone = tmp.path().join("b.php");
        std::fs::write(&kept, b"a").unwrap();
        std::fs::write(&gone, b"b").unwrap();
        let listed = vec![kept.clone(), gone.clone()];
        std::fs::remove_file(&gone).unwrap();

        let hashed = hash_listed_files(listed);
        assert_eq!(hashed, vec![(kept, hash_bytes(b"a"))]);
    }
}
