//! Seams between the batch driver and its persistent collaborators.
//!
//! Every mutation is a single-row upsert or delete keyed by path, id, `(root, phase)`, flag name
//! or `(kind, root)`. [`crate::engine::db_ops::SqliteStore`] implements all of them on one connection.

use anyhow::Result;

use crate::types::{FileRecord, Phase, ScanCursor, ScheduledTask, TaskKind};

/// `(file path → content hash, drift marker)` table.
pub trait HashStore {
    fn get_record(&self, path: &str) -> Result<Option<FileRecord>>;
    fn records_by_id(&self, ids: &[i64]) -> Result<Vec<FileRecord>>;
    /// Insert or update `path` with `hash` and `drift_marker`.
    fn upsert_record(&self, path: &str, hash: &str, drift_marker: i64) -> Result<()>;
    /// Set the drift marker of an existing record. Returns false when no record exists.
    fn set_drift_marker(&self, path: &str, drift_marker: i64) -> Result<bool>;
    /// Records with a non-zero drift marker, ordered by path.
    fn drifted_records(&self) -> Result<Vec<FileRecord>>;
    fn delete_record(&self, path: &str) -> Result<()>;
    fn delete_records_by_id(&self, ids: &[i64]) -> Result<usize>;
    /// Delete every record whose path is `root` or below it.
    fn delete_records_under(&self, root: &str) -> Result<usize>;
    /// Set every drift marker back to 0.
    fn clear_drift_markers(&self) -> Result<usize>;
    fn record_count(&self) -> Result<usize>;
}

/// `(root, phase) → (directory_count, phase_index)` table.
pub trait CursorStore {
    fn get_cursor(&self, root: &str, phase: Phase) -> Result<Option<ScanCursor>>;
    /// Upsert the directory count, keeping the index (new rows start at 0).
    fn update_directory_count(&self, root: &str, phase: Phase, count: i64) -> Result<()>;
    /// Upsert the index unconditionally.
    fn set_phase_index(&self, root: &str, phase: Phase, index: i64) -> Result<()>;
    /// Move the index from `expected` to `index`. Returns false, changing nothing, when the stored
    /// index is no longer `expected` (an absent row counts as 0).
    fn advance_phase_index(&self, root: &str, phase: Phase, expected: i64, index: i64)
    -> Result<bool>;
    fn delete_cursor(&self, root: &str, phase: Phase) -> Result<()>;
    fn delete_cursors(&self, root: &str) -> Result<()>;
    /// Cursors of `phase` with `0 ≤ phase_index < directory_count`.
    fn incomplete_cursors(&self, phase: Phase) -> Result<Vec<ScanCursor>>;
    fn all_cursors(&self) -> Result<Vec<ScanCursor>>;
}

/// Named flags with optional expiry (unix seconds).
pub trait FlagStore {
    /// Set `name` unless it is already set and unexpired. Returns true when this call set it.
    fn try_acquire_flag(&self, name: &str, expires_at: i64, now: i64) -> Result<bool>;
    fn set_flag(&self, name: &str, expires_at: Option<i64>) -> Result<()>;
    fn flag_is_set(&self, name: &str, now: i64) -> Result<bool>;
    fn clear_flag(&self, name: &str) -> Result<()>;
}

/// Exclusions appended at runtime. Merged with configured ones by the driver.
pub trait ExclusionStore {
    fn stored_exclusions(&self) -> Result<Vec<String>>;
    /// Append patterns not yet present. Returns how many were added.
    fn append_exclusions(&self, patterns: &[String]) -> Result<usize>;
}

/// Deferred ticks. At most one pending task per `(kind, root)`.
pub trait Scheduler {
    /// Schedule `(kind, root)` at `due_at`, replacing any pending one.
    fn schedule(&self, kind: TaskKind, root: &str, due_at: i64) -> Result<()>;
    fn is_scheduled(&self, kind: TaskKind, root: &str) -> Result<bool>;
    fn cancel(&self, kind: TaskKind, root: &str) -> Result<()>;
    /// Cancel every pending task for `root`.
    fn cancel_root(&self, root: &str) -> Result<()>;
    fn pending_tasks(&self, root: Option<&str>) -> Result<Vec<ScheduledTask>>;
    /// Remove and return every task due at or before `now`, oldest first.
    fn take_due(&self, now: i64) -> Result<Vec<ScheduledTask>>;
}

/// Everything the driver needs from storage.
pub trait ScanStore: HashStore + CursorStore + FlagStore + ExclusionStore + Scheduler {
    /// Drop all scanner state.
    fn purge(&self) -> Result<()>;
}
