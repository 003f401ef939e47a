use hashsentry::ScanError;
use hashsentry::drift::DriftReport;
use hashsentry::engine::tools::{display_relative, glob_match, roots_overlap};
use hashsentry::engine::{
    FileNotifier, HashStore, Notifier, SqliteStore, path_to_db_string, root_key,
};
use hashsentry::utils::{ExclusionList, ExclusionPattern};
use std::path::Path;

// --- path helpers ---

#[test]
fn test_path_to_db_string_normalizes_separators() {
    assert_eq!(path_to_db_string(Path::new("a\\b\\c.php")), "a/b/c.php");
    assert_eq!(path_to_db_string(Path::new("/srv/site/x.js")), "/srv/site/x.js");
}

#[test]
fn test_root_key_drops_trailing_slash() {
    assert_eq!(root_key(Path::new("/srv/site/")), "/srv/site");
    assert_eq!(root_key(Path::new("/")), "/");
}

#[test]
fn test_display_relative() {
    assert_eq!(display_relative("/srv/site/a/b.php", "/srv/site"), "a/b.php");
    assert_eq!(display_relative("/srv/site/a/b.php", "/srv/site/"), "a/b.php");
    assert_eq!(display_relative("/srv/site2/b.php", "/srv/site"), "/srv/site2/b.php");
}

#[test]
fn test_roots_overlap() {
    assert!(roots_overlap("/srv/site", "/srv/site"));
    assert!(roots_overlap("/srv/site", "/srv/site/wp-content/plugins/x"));
    assert!(roots_overlap("/srv/site/wp-content/plugins/x", "/srv/site"));
    assert!(!roots_overlap("/srv/site", "/srv/site2"));
    assert!(!roots_overlap("/srv/a", "/srv/b"));
}

// --- glob_match ---

#[test]
fn test_glob_star_and_question() {
    assert!(glob_match("*.min.js", "app.min.js"));
    assert!(!glob_match("*.min.js", "app.js"));
    assert!(glob_match("cache-?.php", "cache-1.php"));
    assert!(!glob_match("cache-?.php", "cache-12.php"));
    assert!(glob_match("wp-content/*", "wp-content/uploads/a.php"));
}

// --- exclusions ---

#[test]
fn test_exclusion_substring_matches_anywhere() {
    let list = ExclusionList::new(["wp-content/cache"]).unwrap();
    assert!(list.matches("/srv/site/wp-content/cache/page.php"));
    assert!(!list.matches("/srv/site/wp-content/themes/page.php"));
}

#[test]
fn test_exclusion_glob_matches_file_name() {
    let list = ExclusionList::new(["*.min.js"]).unwrap();
    assert!(list.matches("/srv/site/assets/app.min.js"));
    assert!(!list.matches("/srv/site/assets/app.js"));
}

#[test]
fn test_exclusion_rejects_wildcard_only() {
    for raw in ["*", "**", "*/*", "./*", "?"] {
        assert!(
            matches!(ExclusionPattern::parse(raw), Err(ScanError::InvalidPattern(_))),
            "{raw} should be rejected"
        );
    }
}

#[test]
fn test_exclusion_blank_entries_are_dropped() {
    let list = ExclusionList::parse_blob("\n , \n../\nvendor\n").unwrap();
    assert_eq!(list.to_strings(), vec!["vendor"]);
}

#[test]
fn test_exclusion_merge_dedupes() {
    let mut a = ExclusionList::new(["vendor", "cache"]).unwrap();
    let b = ExclusionList::new(["cache", "*.log.php"]).unwrap();
    a.merge(&b);
    assert_eq!(a.to_strings(), vec!["vendor", "cache", "*.log.php"]);
}

// --- drift report ---

#[test]
fn test_report_lists_existing_drifted_files_relative() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let key = path_to_db_string(&root);
    std::fs::write(root.join("a.php"), b"a").unwrap();
    let store = SqliteStore::in_memory().unwrap();
    store
        .upsert_record(&format!("{key}/a.php"), "h", 10)
        .unwrap();
    store
        .upsert_record(&format!("{key}/gone.php"), "h", 10)
        .unwrap();
    store
        .upsert_record(&format!("{key}/clean.php"), "h", 0)
        .unwrap();

    let report = DriftReport::new(&store, &key);
    assert_eq!(report.changed_files().unwrap(), ["a.php".to_string()]);
    let text = report.export_text().unwrap();
    assert!(text.starts_with("Changed files:\na.php\n"));
}

#[test]
fn test_report_summary_is_truncated() {
    let tmp = tempfile::tempdir().unwrap();
    let root = tmp.path().canonicalize().unwrap();
    let key = path_to_db_string(&root);
    let store = SqliteStore::in_memory().unwrap();
    for i in 0..13 {
        let name = format!("f{i:02}.php");
        std::fs::write(root.join(&name), b"x").unwrap();
        store
            .upsert_record(&format!("{key}/{name}"), "h", 1)
            .unwrap();
    }
    let report = DriftReport::new(&store, &key);
    let lines = report.summary_lines(10).unwrap();
    // intro + 10 paths + truncation line
    assert_eq!(lines.len(), 12);
    assert_eq!(lines[1], "f00.php");
    assert!(lines[11].starts_with("...and 3 more."));
}

#[test]
fn test_report_empty_export() {
    let store = SqliteStore::in_memory().unwrap();
    let report = DriftReport::new(&store, "/srv/site");
    assert_eq!(report.export_text().unwrap(), "No changed files found\n");
}

// --- notifier ---

#[test]
fn test_file_notifier_appends() {
    let tmp = tempfile::tempdir().unwrap();
    let path = tmp.path().join("mail.txt");
    let n = FileNotifier::new(&path);
    n.send("Subject one", &["line a".to_string()]).unwrap();
    n.send("Subject two", &["line b".to_string()]).unwrap();
    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.contains("Subject: Subject one"));
    assert!(text.contains("Subject: Subject two"));
    assert!(text.find("line a").unwrap() < text.find("line b").unwrap());
}
