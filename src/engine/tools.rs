//! Path and filter utilities

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Path as stored in the DB: lossy UTF-8 with forward slashes, so keys compare the same on every platform.
pub fn path_to_db_string(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Display form of a stored path: relative to `root` when under it, unchanged otherwise.
pub fn display_relative(path: &str, root: &str) -> String {
    let root = root.trim_end_matches('/');
    match path.strip_prefix(root) {
        Some(rest) if rest.starts_with('/') => rest.trim_start_matches('/').to_string(),
        _ => path.to_string(),
    }
}

/// True if `a` and `b` are the same directory or one contains the other (slash-normalized strings).
pub fn roots_overlap(a: &str, b: &str) -> bool {
    let contains = |outer: &str, inner: &str| {
        let outer = outer.trim_end_matches('/');
        inner == outer || inner.starts_with(&format!("{outer}/"))
    };
    contains(a, b) || contains(b, a)
}

/// Simple glob pattern matching (supports * and ?)
pub fn glob_match(pattern: &str, text: &str) -> bool {
    let mut pattern_chars = pattern.chars().peekable();
    let mut text_chars = text.chars().peekable();

    while let Some(&p) = pattern_chars.peek() {
        match p {
            '*' => {
                pattern_chars.next();
                if pattern_chars.peek().is_none() {
                    return true; // trailing * matches everything
                }
                let rest: String = pattern_chars.clone().collect();
                while text_chars.peek().is_some() {
                    if glob_match(&rest, &text_chars.clone().collect::<String>()) {
                        return true;
                    }
                    text_chars.next();
                }
                return false;
            }
            '?' => {
                pattern_chars.next();
                if text_chars.next().is_none() {
                    return false;
                }
            }
            _ => {
                pattern_chars.next();
                if text_chars.next() != Some(p) {
                    return false;
                }
            }
        }
    }

    text_chars.peek().is_none()
}

/// True if the process is running with effective uid 0 (e.g. via sudo).
#[cfg(unix)]
pub fn running_as_root() -> bool {
    unsafe { libc::geteuid() == 0 }
}

#[cfg(not(unix))]
pub fn running_as_root() -> bool {
    false
}

/// Canonicalize a scan root and return it with its DB key form.
pub fn canonical_root(path: &Path) -> Result<(PathBuf, String)> {
    let path = path
        .canonicalize()
        .with_context(|| format!("canonicalize scan root {}", path.display()))?;
    let key = path_to_db_string(&path);
    Ok((path, key))
}
