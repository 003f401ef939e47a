//! Exclusion patterns: parsed and validated once at the boundary, then matched by the classifier.

use crate::engine::tools::glob_match;
use crate::error::ScanError;

/// A single exclusion. Plain text matches anywhere in the path; `*`/`?` make it a glob that is
/// tried against the file name and the full path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExclusionPattern {
    Substring(String),
    Glob(String),
}

impl ExclusionPattern {
    /// Parse one entry. Trims whitespace, strips every `../`, turns backslashes into slashes.
    /// Returns `Ok(None)` for entries that are empty after cleanup.
    pub fn parse(raw: &str) -> Result<Option<Self>, ScanError> {
        let cleaned = raw.trim().replace('\\', "/").replace("../", "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            return Ok(None);
        }
        // A pattern made only of wildcards and separators would exclude the whole tree.
        if cleaned.chars().all(|c| matches!(c, '*' | '?' | '/' | '.')) {
            return Err(ScanError::InvalidPattern(raw.trim().to_string()));
        }
        if cleaned.contains(['*', '?']) {
            Ok(Some(ExclusionPattern::Glob(cleaned.to_string())))
        } else {
            Ok(Some(ExclusionPattern::Substring(cleaned.to_string())))
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExclusionPattern::Substring(s) | ExclusionPattern::Glob(s) => s,
        }
    }

    /// `path` must be slash-normalized.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            ExclusionPattern::Substring(s) => path.contains(s.as_str()),
            ExclusionPattern::Glob(g) => {
                let name = path.rsplit('/').next().unwrap_or(path);
                glob_match(g, name) || glob_match(g, path)
            }
        }
    }
}

/// Ordered, de-duplicated set of exclusion patterns.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ExclusionList {
    patterns: Vec<ExclusionPattern>,
}

impl ExclusionList {
    /// Build from individual entries. Empty entries are dropped, duplicates collapse.
    pub fn new<I, S>(items: I) -> Result<Self, ScanError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut list = ExclusionList::default();
        for item in items {
            if let Some(p) = ExclusionPattern::parse(item.as_ref())? {
                list.insert(p);
            }
        }
        Ok(list)
    }

    /// Parse a free-text blob: one entry per line, commas also separate.
    pub fn parse_blob(text: &str) -> Result<Self, ScanError> {
        Self::new(text.split(['\n', ',']))
    }

    /// Add a pattern unless an identical one is present. Returns true when added.
    pub fn insert(&mut self, pattern: ExclusionPattern) -> bool {
        if self.patterns.contains(&pattern) {
            return false;
        }
        self.patterns.push(pattern);
        true
    }

    /// Append every pattern of `other` not already present.
    pub fn merge(&mut self, other: &ExclusionList) {
        for p in &other.patterns {
            self.insert(p.clone());
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExclusionPattern> {
        self.patterns.iter()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn to_strings(&self) -> Vec<String> {
        self.patterns.iter().map(|p| p.as_str().to_string()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blob_splits_on_newlines_and_commas() {
        let list = ExclusionList::parse_blob("wp-content/cache\n  a.php , b.php\n\n").unwrap();
        assert_eq!(list.to_strings(), vec!["wp-content/cache", "a.php", "b.php"]);
    }

    #[test]
    fn parent_segments_are_stripped() {
        let p = ExclusionPattern::parse("../../secret/dir").unwrap().unwrap();
        assert_eq!(p, ExclusionPattern::Substring("secret/dir".to_string()));
    }

    #[test]
    fn duplicates_collapse() {
        let list = ExclusionList::new(["x", "x", " x "]).unwrap();
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn wildcard_only_pattern_is_rejected() {
        assert!(matches!(
            ExclusionPattern::parse("*"),
            Err(ScanError::InvalidPattern(_))
        ));
        assert!(ExclusionPattern::parse("/").is_err());
    }

    #[test]
    fn glob_matches_file_name() {
        let p = ExclusionPattern::parse("*.min.js").unwrap().unwrap();
        assert!(p.matches("/srv/site/assets/app.min.js"));
        assert!(!p.matches("/srv/site/assets/app.js"));
    }
}
