//! DB tests: the SQLite store behind the batch driver (records, cursors, flags, schedule).

use hashsentry::engine::{
    CursorStore, ExclusionStore, FlagStore, HashStore, ScanStore, Scheduler, SqliteStore,
};
use hashsentry::{CURSOR_COMPLETE, Phase, TaskKind};

fn store() -> SqliteStore {
    SqliteStore::in_memory().unwrap()
}

// --- file_hashes ---

#[test]
fn test_upsert_overwrites_hash_and_marker() {
    let s = store();
    s.upsert_record("/site/a.php", "h1", 0).unwrap();
    s.upsert_record("/site/a.php", "h2", 42).unwrap();
    let rec = s.get_record("/site/a.php").unwrap().unwrap();
    assert_eq!(rec.hash, "h2");
    assert_eq!(rec.drift_marker, 42);
    assert_eq!(s.record_count().unwrap(), 1);
}

#[test]
fn test_set_drift_marker_requires_record() {
    let s = store();
    assert!(!s.set_drift_marker("/site/missing.php", 5).unwrap());
    s.upsert_record("/site/a.php", "h", 0).unwrap();
    assert!(s.set_drift_marker("/site/a.php", 5).unwrap());
    let drifted = s.drifted_records().unwrap();
    assert_eq!(drifted.len(), 1);
    assert!(drifted[0].is_drifted());
}

#[test]
fn test_drifted_records_sorted_and_cleared() {
    let s = store();
    s.upsert_record("/site/b.php", "h", 7).unwrap();
    s.upsert_record("/site/a.php", "h", 9).unwrap();
    s.upsert_record("/site/c.php", "h", 0).unwrap();
    let paths: Vec<String> = s.drifted_records().unwrap().into_iter().map(|r| r.path).collect();
    assert_eq!(paths, vec!["/site/a.php", "/site/b.php"]);
    assert_eq!(s.clear_drift_markers().unwrap(), 2);
    assert!(s.drifted_records().unwrap().is_empty());
}

#[test]
fn test_delete_records_under_is_prefix_exact() {
    let s = store();
    s.upsert_record("/site/plugins/x/a.php", "h", 0).unwrap();
    s.upsert_record("/site/plugins/x2/a.php", "h", 0).unwrap();
    s.upsert_record("/site/plugins/X/b.php", "h", 0).unwrap();
    let removed = s.delete_records_under("/site/plugins/x").unwrap();
    assert_eq!(removed, 1);
    assert!(s.get_record("/site/plugins/x2/a.php").unwrap().is_some());
    assert!(s.get_record("/site/plugins/X/b.php").unwrap().is_some());
}

#[test]
fn test_records_by_id_and_delete_by_id() {
    let s = store();
    s.upsert_record("/site/a.php", "h", 0).unwrap();
    s.upsert_record("/site/b.php", "h", 0).unwrap();
    let a = s.get_record("/site/a.php").unwrap().unwrap();
    let found = s.records_by_id(&[a.id, 9999]).unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].path, "/site/a.php");
    assert_eq!(s.delete_records_by_id(&[a.id, 9999]).unwrap(), 1);
    assert_eq!(s.record_count().unwrap(), 1);
}

// --- scan_cursors ---

#[test]
fn test_directory_count_keeps_index() {
    let s = store();
    s.update_directory_count("/site", Phase::Baseline, 10).unwrap();
    assert!(s.advance_phase_index("/site", Phase::Baseline, 0, 4).unwrap());
    s.update_directory_count("/site", Phase::Baseline, 12).unwrap();
    let c = s.get_cursor("/site", Phase::Baseline).unwrap().unwrap();
    assert_eq!((c.directory_count, c.phase_index), (12, 4));
    assert!(c.is_in_progress());
}

#[test]
fn test_advance_is_compare_and_swap() {
    let s = store();
    s.update_directory_count("/site", Phase::Drift, 10).unwrap();
    assert!(s.advance_phase_index("/site", Phase::Drift, 0, 3).unwrap());
    // A second tick that also read index 0 loses.
    assert!(!s.advance_phase_index("/site", Phase::Drift, 0, 3).unwrap());
    assert!(s.advance_phase_index("/site", Phase::Drift, 3, 6).unwrap());
    let c = s.get_cursor("/site", Phase::Drift).unwrap().unwrap();
    assert_eq!(c.phase_index, 6);
}

#[test]
fn test_phases_are_independent_rows() {
    let s = store();
    s.set_phase_index("/site", Phase::Baseline, CURSOR_COMPLETE).unwrap();
    s.update_directory_count("/site", Phase::Drift, 5).unwrap();
    let b = s.get_cursor("/site", Phase::Baseline).unwrap().unwrap();
    assert!(b.is_complete());
    let incomplete = s.incomplete_cursors(Phase::Drift).unwrap();
    assert_eq!(incomplete.len(), 1);
    assert!(s.incomplete_cursors(Phase::Baseline).unwrap().is_empty());
    s.delete_cursor("/site", Phase::Drift).unwrap();
    assert_eq!(s.all_cursors().unwrap().len(), 1);
    s.delete_cursors("/site").unwrap();
    assert!(s.all_cursors().unwrap().is_empty());
}

// --- flags ---

#[test]
fn test_flag_acquire_respects_ttl() {
    let s = store();
    assert!(s.try_acquire_flag("baseline_active:/site", 160, 100).unwrap());
    assert!(!s.try_acquire_flag("baseline_active:/site", 170, 110).unwrap());
    assert!(s.flag_is_set("baseline_active:/site", 159).unwrap());
    assert!(!s.flag_is_set("baseline_active:/site", 160).unwrap());
    // Expired: the next caller takes it over.
    assert!(s.try_acquire_flag("baseline_active:/site", 220, 160).unwrap());
    s.clear_flag("baseline_active:/site").unwrap();
    assert!(!s.flag_is_set("baseline_active:/site", 161).unwrap());
}

#[test]
fn test_flag_without_expiry_is_permanent() {
    let s = store();
    s.set_flag("baselined:/site", None).unwrap();
    assert!(s.flag_is_set("baselined:/site", i64::MAX).unwrap());
    assert!(!s.try_acquire_flag("baselined:/site", 10, 5).unwrap());
}

// --- exclusions ---

#[test]
fn test_append_exclusions_dedupes() {
    let s = store();
    let added = s
        .append_exclusions(&["wp-content/cache".to_string(), "a.php".to_string()])
        .unwrap();
    assert_eq!(added, 2);
    let added = s
        .append_exclusions(&["a.php".to_string(), "b.php".to_string()])
        .unwrap();
    assert_eq!(added, 1);
    assert_eq!(
        s.stored_exclusions().unwrap(),
        vec!["wp-content/cache", "a.php", "b.php"]
    );
}

// --- scheduled_tasks ---

#[test]
fn test_schedule_replaces_and_take_due_pops() {
    let s = store();
    s.schedule(TaskKind::Baseline, "/site", 100).unwrap();
    s.schedule(TaskKind::Baseline, "/site", 130).unwrap();
    s.schedule(TaskKind::Drift, "/other", 50).unwrap();
    assert_eq!(s.pending_tasks(None).unwrap().len(), 2);

    let due = s.take_due(100).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].kind, TaskKind::Drift);
    assert!(!s.is_scheduled(TaskKind::Drift, "/other").unwrap());

    let due = s.take_due(200).unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].due_at, 130);
    assert!(s.pending_tasks(None).unwrap().is_empty());
}

#[test]
fn test_cancel_root_leaves_other_roots() {
    let s = store();
    for kind in TaskKind::ALL {
        s.schedule(kind, "/site", 10).unwrap();
    }
    s.schedule(TaskKind::Drift, "/other", 10).unwrap();
    s.cancel(TaskKind::Drift, "/site").unwrap();
    assert_eq!(s.pending_tasks(Some("/site")).unwrap().len(), 2);
    s.cancel_root("/site").unwrap();
    assert!(s.pending_tasks(Some("/site")).unwrap().is_empty());
    assert!(s.is_scheduled(TaskKind::Drift, "/other").unwrap());
}

#[test]
fn test_purge_keeps_exclusions() {
    let s = store();
    s.upsert_record("/site/a.php", "h", 0).unwrap();
    s.set_phase_index("/site", Phase::Drift, 2).unwrap();
    s.set_flag("notify_cooldown", Some(10)).unwrap();
    s.schedule(TaskKind::Drift, "/site", 10).unwrap();
    s.append_exclusions(&["vendor".to_string()]).unwrap();
    s.purge().unwrap();
    assert_eq!(s.record_count().unwrap(), 0);
    assert!(s.all_cursors().unwrap().is_empty());
    assert!(!s.flag_is_set("notify_cooldown", 0).unwrap());
    assert!(s.pending_tasks(None).unwrap().is_empty());
    assert_eq!(s.stored_exclusions().unwrap(), vec!["vendor"]);
}

#[test]
fn test_file_db_persists_between_opens() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join(".hashsentry.db");
    {
        let s = SqliteStore::open(&path).unwrap();
        s.upsert_record("/site/a.php", "h", 0).unwrap();
        s.schedule(TaskKind::BaselineStart, "/site", 5).unwrap();
    }
    let s = SqliteStore::open(&path).unwrap();
    assert_eq!(s.record_count().unwrap(), 1);
    assert!(s.is_scheduled(TaskKind::BaselineStart, "/site").unwrap());
}
