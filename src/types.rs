//! Public and internal types for the hashsentry API and batch driver.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::utils::config::{DEFAULT_EXTENSIONS, NotifyConsts, ScanConsts};
use crate::utils::exclusions::ExclusionList;

/// `phase_index` value meaning "phase complete for this root".
pub const CURSOR_COMPLETE: i64 = -1;

/// One of the two resumable passes over a root.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Record hashes.
    Baseline,
    /// Compare hashes against the recorded baseline.
    Drift,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Baseline => "baseline",
            Phase::Drift => "drift",
        }
    }

    /// The counterpart phase whose completion decides whether cursor rows can be dropped.
    pub fn other(&self) -> Phase {
        match self {
            Phase::Baseline => Phase::Drift,
            Phase::Drift => Phase::Baseline,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "baseline" => Ok(Phase::Baseline),
            "drift" => Ok(Phase::Drift),
            other => Err(anyhow::anyhow!("unknown scan phase: {other}")),
        }
    }
}

/// One row of the hash table.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    pub id: i64,
    /// Absolute, slash-normalized file path (unique key).
    pub path: String,
    /// Blake3 content hash, hex encoded.
    pub hash: String,
    /// Unix seconds when drift was observed, or 0 when the file matches its baseline.
    pub drift_marker: i64,
}

impl FileRecord {
    pub fn is_drifted(&self) -> bool {
        self.drift_marker != 0
    }
}

/// Persisted progress of one phase over one root.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScanCursor {
    pub root: String,
    pub phase: Phase,
    pub directory_count: i64,
    /// Next directory to process, or [`CURSOR_COMPLETE`].
    pub phase_index: i64,
}

impl ScanCursor {
    pub fn is_complete(&self) -> bool {
        self.phase_index == CURSOR_COMPLETE
    }

    pub fn is_in_progress(&self) -> bool {
        self.phase_index >= 0 && self.phase_index < self.directory_count
    }
}

/// A drifted file as returned to the admin surface.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ChangedFile {
    pub id: i64,
    pub path: String,
    /// Unix seconds.
    pub changed_at: i64,
}

/// Kind of a deferred tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TaskKind {
    /// Reset the baseline cursor, then run a baseline tick.
    BaselineStart,
    /// Continue the baseline phase.
    Baseline,
    /// Continue the drift phase.
    Drift,
}

impl TaskKind {
    pub const ALL: [TaskKind; 3] = [TaskKind::BaselineStart, TaskKind::Baseline, TaskKind::Drift];

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskKind::BaselineStart => "baseline_start",
            TaskKind::Baseline => "baseline",
            TaskKind::Drift => "drift",
        }
    }

    pub fn for_phase(phase: Phase) -> TaskKind {
        match phase {
            Phase::Baseline => TaskKind::Baseline,
            Phase::Drift => TaskKind::Drift,
        }
    }
}

impl FromStr for TaskKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TaskKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| anyhow::anyhow!("unknown task kind: {s}"))
    }
}

/// A tick the scheduler should fire at `due_at` (unix seconds).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledTask {
    pub kind: TaskKind,
    pub root: String,
    pub due_at: i64,
}

/// What a single tick did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TickOutcome {
    /// Guard refused to run; retried implicitly by a later tick.
    Blocked,
    /// Root no longer exists; cursors were deleted.
    StaleRoot,
    /// Phase was already complete; nothing was touched.
    AlreadyComplete,
    /// Processed `processed` directories, more remain.
    Advanced {
        processed: usize,
        index: usize,
        count: usize,
    },
    /// Phase reached the end of its directory list.
    Completed { processed: usize, count: usize },
}

/// Cursor and drift summary for one root.
#[derive(Clone, Debug, Default)]
pub struct ScanStatus {
    pub root: String,
    pub baseline: Option<ScanCursor>,
    pub drift: Option<ScanCursor>,
    /// Root has finished at least one baseline since the last reset.
    pub baselined: bool,
    pub changed: usize,
    pub pending_tasks: Vec<ScheduledTask>,
}

impl ScanStatus {
    pub fn in_progress(&self) -> bool {
        self.baseline.as_ref().is_some_and(ScanCursor::is_in_progress)
            || self.drift.as_ref().is_some_and(ScanCursor::is_in_progress)
            || !self.pending_tasks.is_empty()
    }
}

/// Scan options consumed by the classifier, enumerator and batch driver.
#[derive(Clone, Debug)]
pub struct ScanOpts {
    /// Allowed file extensions, lowercase, without the dot.
    pub extensions: Vec<String>,
    /// Configured exclusions (persisted exclusions are merged in per tick).
    pub exclude: ExclusionList,
    /// Directory levels expanded below the root.
    pub depth: usize,
    /// Directories processed per tick.
    pub quota: usize,
    /// Seconds before an unfinished phase is re-invoked.
    pub reschedule_delay_secs: i64,
    /// Minimum seconds between drift notifications.
    pub cooldown_secs: i64,
    /// Lifetime of the per-root active flags.
    pub active_flag_ttl_secs: i64,
}

impl Default for ScanOpts {
    fn default() -> Self {
        Self {
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            exclude: ExclusionList::default(),
            depth: ScanConsts::DIRECTORY_LEVELS,
            quota: ScanConsts::BATCH_QUOTA,
            reschedule_delay_secs: ScanConsts::RESCHEDULE_DELAY_SECS,
            cooldown_secs: NotifyConsts::COOLDOWN_SECS,
            active_flag_ttl_secs: ScanConsts::ACTIVE_FLAG_TTL_SECS,
        }
    }
}

/// Full options (CLI). Use [`ScanOpts`] for lib.
#[derive(Clone, Debug, Default)]
pub struct Opts {
    /// State database path. When None, uses `root.join(<package db filename>)`.
    pub db_path: Option<PathBuf>,
    /// Append drift notifications to this file instead of logging them.
    pub notify_file: Option<PathBuf>,
    /// Debug logging and progress bar.
    pub verbose: bool,
    pub scan: ScanOpts,
}
