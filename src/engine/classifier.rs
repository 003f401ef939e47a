//! Path classifier: skip and recursion decisions for one scan root. Pure over config + path.

use std::path::{Component, Path, PathBuf};

use crate::ScanOpts;
use crate::engine::tools::path_to_db_string;
use crate::utils::exclusions::ExclusionList;

#[derive(Clone, Debug)]
pub struct PathClassifier {
    root: PathBuf,
    exclude: ExclusionList,
    extensions: Vec<String>,
    depth_cap: usize,
}

impl PathClassifier {
    /// `exclude` is the effective list (configured plus persisted).
    pub fn new(root: &Path, opts: &ScanOpts, exclude: ExclusionList) -> Self {
        Self {
            root: root.to_path_buf(),
            exclude,
            extensions: opts
                .extensions
                .iter()
                .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
                .collect(),
            depth_cap: opts.depth,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn depth_cap(&self) -> usize {
        self.depth_cap
    }

    /// True if `path` is excluded or has a segment below the root starting with `.`.
    pub fn should_skip(&self, path: &Path) -> bool {
        let rel = path.strip_prefix(&self.root).unwrap_or(path);
        let hidden = rel.components().any(|c| match c {
            Component::Normal(s) => s.to_string_lossy().starts_with('.'),
            _ => false,
        });
        if hidden {
            return true;
        }
        self.exclude.matches(&path_to_db_string(path))
            || (!rel.as_os_str().is_empty() && self.exclude.matches(&path_to_db_string(rel)))
    }

    /// Depth of `dir` below the root (root is 0). Paths outside the root count from the root of the path.
    pub fn depth(&self, dir: &Path) -> usize {
        let rel = dir.strip_prefix(&self.root).unwrap_or(dir);
        rel.components()
            .filter(|c| matches!(c, Component::Normal(_)))
            .count()
    }

    /// True while `dir` is shallower than the depth cap.
    pub fn should_recurse(&self, dir: &Path) -> bool {
        self.depth(dir) < self.depth_cap
    }

    /// True if the extension is on the allow-list (case-insensitive).
    pub fn is_eligible_file(&self, path: &Path) -> bool {
        path.extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .is_some_and(|ext| self.extensions.iter().any(|allowed| *allowed == ext))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier(exclude: &[&str]) -> PathClassifier {
        PathClassifier::new(
            Path::new("/srv/site"),
            &ScanOpts::default(),
            ExclusionList::new(exclude).unwrap(),
        )
    }

    #[test]
    fn dot_segment_below_root_is_skipped() {
        let c = classifier(&[]);
        assert!(c.should_skip(Path::new("/srv/site/.git/config.php")));
        assert!(c.should_skip(Path::new("/srv/site/a/.hidden.php")));
        assert!(!c.should_skip(Path::new("/srv/site/a/visible.php")));
    }

    #[test]
    fn dot_segment_in_root_itself_is_ignored() {
        let c = PathClassifier::new(
            Path::new("/home/u/.local/site"),
            &ScanOpts::default(),
            ExclusionList::default(),
        );
        assert!(!c.should_skip(Path::new("/home/u/.local/site/index.php")));
    }

    #[test]
    fn recursion_stops_at_cap() {
        let c = classifier(&[]);
        assert!(c.should_recurse(Path::new("/srv/site")));
        assert!(c.should_recurse(Path::new("/srv/site/a/b")));
        assert!(!c.should_recurse(Path::new("/srv/site/a/b/c")));
    }

    #[test]
    fn relative_glob_matches() {
        let c = classifier(&["wp-content/*"]);
        assert!(c.should_skip(Path::new("/srv/site/wp-content/uploads")));
        assert!(!c.should_skip(Path::new("/srv/site/wp-includes/load.php")));
    }
}
