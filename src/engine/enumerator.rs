//! Tree enumerator: the ordered directory list a phase indexes into, and the files of one directory.

use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::engine::classifier::PathClassifier;
use crate::error::ScanError;

pub struct TreeEnumerator<'a> {
    classifier: &'a PathClassifier,
}

impl<'a> TreeEnumerator<'a> {
    pub fn new(classifier: &'a PathClassifier) -> Self {
        Self { classifier }
    }

    /// Root first, then every qualifying subdirectory depth-first, siblings sorted by name.
    /// Directories down to the depth cap are listed; only those above it are expanded.
    /// Stable for an unchanged tree, since the batch driver stores an index into it.
    pub fn list_directories(&self) -> Vec<PathBuf> {
        let root = self.classifier.root();
        let classifier = self.classifier;
        let mut dirs = Vec::new();
        let walker = WalkDir::new(root)
            .follow_links(false)
            .max_depth(classifier.depth_cap())
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| {
                e.depth() == 0 || (e.file_type().is_dir() && !classifier.should_skip(e.path()))
            });
        for entry in walker {
            match entry {
                Ok(entry) => dirs.push(entry.into_path()),
                Err(err) => debug!("skipping unreadable directory: {}", err),
            }
        }
        dirs
    }

    /// Eligible files directly in `dir`, sorted. A directory at the depth cap is a leaf of the
    /// directory list, so files below it are gathered here too.
    pub fn list_files(&self, dir: &Path) -> Result<Vec<PathBuf>, ScanError> {
        if !dir.is_dir() {
            return Err(ScanError::io(
                dir,
                std::io::Error::new(std::io::ErrorKind::NotFound, "directory vanished"),
            ));
        }
        let classifier = self.classifier;
        let max_depth = if classifier.should_recurse(dir) { 1 } else { usize::MAX };
        let mut files = Vec::new();
        let walker = WalkDir::new(dir)
            .follow_links(false)
            .min_depth(1)
            .max_depth(max_depth)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !classifier.should_skip(e.path()));
        for entry in walker {
            match entry {
                Ok(entry) => {
                    if entry.file_type().is_file() && classifier.is_eligible_file(entry.path()) {
                        files.push(entry.into_path());
                    }
                }
                Err(err) if err.depth() == 0 => {
                    let path = err.path().unwrap_or(dir).to_path_buf();
                    return Err(match err.into_io_error() {
                        Some(io) => ScanError::io(path, io),
                        None => ScanError::io(path, std::io::Error::other("walk error")),
                    });
                }
                Err(err) => debug!("skipping unreadable path: {}", err),
            }
        }
        Ok(files)
    }
}
