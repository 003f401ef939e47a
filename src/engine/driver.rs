//! Batch driver: advances the baseline or drift phase of a root by a bounded number of
//! directories per tick, persists the cursor, then reschedules, hands off or completes.
//!
//! A phase over one root is a cursor `(directory_count, phase_index)`. Each tick recomputes the
//! directory list, processes `[index, index + quota)`, and moves the cursor with a compare-and-swap
//! so two overlapping ticks cannot both claim the same batch. On completion the phase is marked
//! with [`CURSOR_COMPLETE`]; once both phases are complete the rows are dropped entirely.
//! Per-root active flags (with a TTL) keep the two phases from interleaving on the same root.

use anyhow::Result;
use log::{debug, error, info, warn};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::baseline::build_hashes_for_dir;
use crate::drift::{DriftReport, compare_hashes_for_dir, flush_changed_set, notify_if_needed};
use crate::engine::classifier::PathClassifier;
use crate::engine::clock::Clock;
use crate::engine::enumerator::TreeEnumerator;
use crate::engine::notifier::Notifier;
use crate::engine::store::ScanStore;
use crate::engine::tools::{path_to_db_string, roots_overlap};
use crate::error::ScanError;
use crate::types::{
    CURSOR_COMPLETE, ChangedFile, Phase, ScanOpts, ScanStatus, ScheduledTask, TaskKind,
    TickOutcome,
};
use crate::utils::config::{DEFAULT_SEEDED_EXCLUDES, FlagNames, PackagePaths};
use crate::utils::exclusions::{ExclusionList, ExclusionPattern};

/// DB key of a scan root: slash-normalized, no trailing slash.
pub fn root_key(root: &Path) -> String {
    let key = path_to_db_string(root);
    match key.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

/// Result of one task fired by [`BatchDriver::run_due`]. `outcome` is None when the tick failed.
#[derive(Clone, Debug)]
pub struct TaskRun {
    pub task: ScheduledTask,
    pub outcome: Option<TickOutcome>,
}

pub struct BatchDriver<S, N, C> {
    store: S,
    notifier: N,
    clock: C,
    opts: ScanOpts,
}

impl<S: ScanStore, N: Notifier, C: Clock> BatchDriver<S, N, C> {
    pub fn new(store: S, notifier: N, clock: C, opts: ScanOpts) -> Self {
        Self {
            store,
            notifier,
            clock,
            opts,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn opts(&self) -> &ScanOpts {
        &self.opts
    }

    /// Built-in, configured and persisted exclusions. A persisted pattern that no longer parses is skipped.
    pub fn effective_exclusions(&self) -> Result<ExclusionList> {
        let mut list = ExclusionList::new(PackagePaths::get().builtin_exclude_patterns())?;
        list.merge(&self.opts.exclude);
        for raw in self.store.stored_exclusions()? {
            match ExclusionPattern::parse(&raw) {
                Ok(Some(p)) => {
                    list.insert(p);
                }
                Ok(None) => {}
                Err(e) => warn!("ignoring stored exclusion: {}", e),
            }
        }
        Ok(list)
    }

    pub fn classifier(&self, root: &Path) -> Result<PathClassifier> {
        Ok(PathClassifier::new(
            root,
            &self.opts,
            self.effective_exclusions()?,
        ))
    }

    pub fn run_baseline_tick(&self, root: &Path) -> Result<TickOutcome> {
        self.run_tick(root, Phase::Baseline)
    }

    pub fn run_drift_tick(&self, root: &Path) -> Result<TickOutcome> {
        self.run_tick(root, Phase::Drift)
    }

    fn run_tick(&self, root: &Path, phase: Phase) -> Result<TickOutcome> {
        let key = root_key(root);
        let now = self.clock.now();

        // Own flag before the sibling check: of two racing ticks at least one sees the other.
        let flag = active_flag(&key, phase);
        let ttl = self.opts.active_flag_ttl_secs;
        if !self.store.try_acquire_flag(&flag, now + ttl, now)? {
            debug!("{} tick for {} already running", phase, key);
            return Ok(TickOutcome::Blocked);
        }
        let result = self.run_flagged(root, &key, phase, now);
        if let Err(e) = self.store.clear_flag(&flag) {
            warn!("failed to clear {}: {:#}", flag, e);
        }
        result
    }

    fn run_flagged(&self, root: &Path, key: &str, phase: Phase, now: i64) -> Result<TickOutcome> {
        if !self.guard_allows(key, phase, now)? {
            return Ok(TickOutcome::Blocked);
        }
        if !root.is_dir() {
            warn!("{}; dropping its cursors", ScanError::StaleRoot(root.to_path_buf()));
            self.store.delete_cursors(key)?;
            self.store.cancel_root(key)?;
            return Ok(TickOutcome::StaleRoot);
        }
        self.advance(root, key, phase, now)
    }

    /// False when this phase must not run on `key` right now.
    fn guard_allows(&self, key: &str, phase: Phase, now: i64) -> Result<bool> {
        match phase {
            Phase::Baseline => {
                if self.store.flag_is_set(&FlagNames::drift_active(key), now)? {
                    debug!("baseline for {} waits: drift tick running", key);
                    return Ok(false);
                }
                Ok(true)
            }
            Phase::Drift => {
                if self.store.flag_is_set(&FlagNames::baseline_active(key), now)?
                    || self.store.is_scheduled(TaskKind::BaselineStart, key)?
                    || self.store.is_scheduled(TaskKind::Baseline, key)?
                {
                    debug!("drift for {} waits: baseline pending", key);
                    return Ok(false);
                }
                let mut blocked = false;
                for cursor in self.store.incomplete_cursors(Phase::Baseline)? {
                    if roots_overlap(&cursor.root, key) {
                        blocked = true;
                        if !self.store.is_scheduled(TaskKind::Baseline, &cursor.root)? {
                            self.store.schedule(
                                TaskKind::Baseline,
                                &cursor.root,
                                now + self.opts.reschedule_delay_secs,
                            )?;
                        }
                    }
                }
                if blocked {
                    debug!("drift for {} waits: overlapping baseline in progress", key);
                    return Ok(false);
                }
                if !self.store.flag_is_set(&FlagNames::baselined(key), now)? {
                    info!("{} has no baseline yet; scheduling one", key);
                    self.store.schedule(TaskKind::BaselineStart, key, now)?;
                    return Ok(false);
                }
                Ok(true)
            }
        }
    }

    fn advance(&self, root: &Path, key: &str, phase: Phase, now: i64) -> Result<TickOutcome> {
        let cursor = self.store.get_cursor(key, phase)?;
        // Rows are dropped once both phases finish; a baselined root without a baseline row
        // has nothing left to record until a rebuild puts the row back at index 0.
        let complete = match &cursor {
            Some(c) => c.is_complete(),
            None => {
                phase == Phase::Baseline
                    && self.store.flag_is_set(&FlagNames::baselined(key), now)?
            }
        };
        if complete {
            debug!("{} already complete for {}", phase, key);
            return Ok(TickOutcome::AlreadyComplete);
        }

        let classifier = self.classifier(root)?;
        let enumerator = TreeEnumerator::new(&classifier);
        let dirs = enumerator.list_directories();
        let count = dirs.len();
        self.store.update_directory_count(key, phase, count as i64)?;

        let start = cursor.map(|c| c.phase_index.max(0) as usize).unwrap_or(0);
        if start >= count {
            // Tree shrank below the stored index.
            self.complete_phase(key, phase, now)?;
            return Ok(TickOutcome::Completed {
                processed: 0,
                count,
            });
        }
        let end = start.saturating_add(self.opts.quota.max(1)).min(count);

        let mut changed = BTreeSet::new();
        let mut files = 0;
        for dir in &dirs[start..end] {
            files += match phase {
                Phase::Baseline => build_hashes_for_dir(&self.store, &enumerator, dir)?,
                Phase::Drift => {
                    compare_hashes_for_dir(&self.store, &enumerator, dir, now, &mut changed)?
                }
            };
        }
        if phase == Phase::Drift {
            let marked = flush_changed_set(&self.store, &changed, now)?;
            if marked > 0 {
                info!("{} changed file(s) under {}", marked, key);
            }
        }

        if !self
            .store
            .advance_phase_index(key, phase, start as i64, end as i64)?
        {
            return Err(ScanError::CursorRace {
                root: key.to_string(),
                phase,
                expected: start as i64,
            }
            .into());
        }
        debug!(
            "{} {}: directories {}..{} of {} ({} files)",
            phase, key, start, end, count, files
        );

        let processed = end - start;
        if end < count {
            self.store.schedule(
                TaskKind::for_phase(phase),
                key,
                now + self.opts.reschedule_delay_secs,
            )?;
            return Ok(TickOutcome::Advanced {
                processed,
                index: end,
                count,
            });
        }
        self.complete_phase(key, phase, now)?;
        Ok(TickOutcome::Completed { processed, count })
    }

    fn complete_phase(&self, key: &str, phase: Phase, now: i64) -> Result<()> {
        if phase == Phase::Baseline {
            // Drift restarts from the top against the fresh baseline.
            self.store.delete_cursor(key, Phase::Drift)?;
        }
        let other_done = self
            .store
            .get_cursor(key, phase.other())?
            .is_some_and(|c| c.is_complete());
        if other_done {
            self.store.delete_cursors(key)?;
        } else {
            self.store.set_phase_index(key, phase, CURSOR_COMPLETE)?;
        }

        match phase {
            Phase::Baseline => {
                self.store.set_flag(&FlagNames::baselined(key), None)?;
                self.store.cancel(TaskKind::Baseline, key)?;
                self.store.schedule(TaskKind::Drift, key, now)?;
                info!("baseline complete for {}", key);
            }
            Phase::Drift => {
                self.store.cancel(TaskKind::Drift, key)?;
                info!("drift scan complete for {}", key);
                self.notify_if_needed(key, now)?;
            }
        }
        Ok(())
    }

    fn notify_if_needed(&self, key: &str, now: i64) -> Result<bool> {
        let report = DriftReport::new(&self.store, key);
        notify_if_needed(
            &report,
            &self.store,
            &self.notifier,
            now,
            self.opts.cooldown_secs,
        )
    }

    /// Restart the baseline phase of `root` from the first directory and run one tick.
    pub fn start_baseline_full(&self, root: &Path) -> Result<TickOutcome> {
        let key = root_key(root);
        self.store.cancel(TaskKind::BaselineStart, &key)?;
        self.store.cancel(TaskKind::Baseline, &key)?;
        self.store.set_phase_index(&key, Phase::Baseline, 0)?;
        self.run_baseline_tick(root)
    }

    /// Start a fresh drift scan of `root` unless a drift tick is already scheduled.
    pub fn start_drift_full(&self, root: &Path) -> Result<TickOutcome> {
        let key = root_key(root);
        if self.store.is_scheduled(TaskKind::Drift, &key)? {
            debug!("drift scan for {} already scheduled", key);
            return Ok(TickOutcome::Blocked);
        }
        self.store.delete_cursor(&key, Phase::Drift)?;
        self.run_drift_tick(root)
    }

    /// Re-record the baseline of each directory, e.g. after a legitimate update replaced its files.
    /// Clears drift markers of files that are rehashed.
    pub fn rebaseline(&self, dirs: &[PathBuf]) -> Result<Vec<TickOutcome>> {
        let mut outcomes = Vec::with_capacity(dirs.len());
        for dir in dirs {
            outcomes.push(self.start_baseline_full(dir)?);
        }
        Ok(outcomes)
    }

    /// Forget all state for `root` and schedule a fresh baseline.
    pub fn reset_all(&self, root: &Path) -> Result<()> {
        let key = root_key(root);
        self.store.cancel_root(&key)?;
        let removed = self.store.delete_records_under(&key)?;
        self.store.delete_cursors(&key)?;
        self.store.clear_flag(&FlagNames::baselined(&key))?;
        self.store.schedule(
            TaskKind::BaselineStart,
            &key,
            self.clock.now() + self.opts.reschedule_delay_secs,
        )?;
        info!("reset {}: {} record(s) removed, baseline scheduled", key, removed);
        Ok(())
    }

    /// Drop the records for `paths` and persist each as an exclusion unless one already covers it.
    /// Returns how many exclusions were added.
    pub fn exclude_and_forget(&self, paths: &[String]) -> Result<usize> {
        let existing = self.effective_exclusions()?;
        let mut added = Vec::new();
        for path in paths {
            self.store.delete_record(path)?;
            if existing.matches(path) {
                continue;
            }
            match ExclusionPattern::parse(path) {
                Ok(Some(p)) => added.push(p.as_str().to_string()),
                Ok(None) => {}
                Err(e) => warn!("not excluding {}: {}", path, e),
            }
        }
        self.store.append_exclusions(&added)
    }

    /// [`Self::exclude_and_forget`] for record ids. Unknown ids are ignored.
    pub fn exclude_ids(&self, ids: &[i64]) -> Result<usize> {
        let paths: Vec<String> = self
            .store
            .records_by_id(ids)?
            .into_iter()
            .map(|r| r.path)
            .collect();
        self.exclude_and_forget(&paths)
    }

    /// Drifted files that still exist, ordered by path. Records of deleted files are removed.
    pub fn list_drifted(&self) -> Result<Vec<ChangedFile>> {
        self.list_drifted_where(|_| true)
    }

    fn list_drifted_where(&self, keep: impl Fn(&str) -> bool) -> Result<Vec<ChangedFile>> {
        let mut out = Vec::new();
        for rec in self.store.drifted_records()? {
            if !Path::new(&rec.path).exists() {
                debug!("dropping record of deleted file {}", rec.path);
                self.store.delete_record(&rec.path)?;
                continue;
            }
            if !keep(&rec.path) {
                continue;
            }
            out.push(ChangedFile {
                id: rec.id,
                path: rec.path,
                changed_at: rec.drift_marker,
            });
        }
        Ok(out)
    }

    /// Remove records by id. Returns how many were removed.
    pub fn delete(&self, ids: &[i64]) -> Result<usize> {
        self.store.delete_records_by_id(ids)
    }

    /// Seed default exclusions, clear progress and drift markers, and schedule the first baseline.
    pub fn enable(&self, root: &Path) -> Result<()> {
        let key = root_key(root);
        let existing = self.effective_exclusions()?;
        let seeds: Vec<String> = DEFAULT_SEEDED_EXCLUDES
            .iter()
            .filter(|s| !existing.matches(s))
            .map(|s| s.to_string())
            .collect();
        let seeded = self.store.append_exclusions(&seeds)?;
        self.store.delete_cursors(&key)?;
        self.store.set_phase_index(&key, Phase::Baseline, 0)?;
        self.store.clear_drift_markers()?;
        if !self.store.is_scheduled(TaskKind::BaselineStart, &key)? {
            self.store
                .schedule(TaskKind::BaselineStart, &key, self.clock.now())?;
        }
        info!("enabled {} ({} default exclusion(s) added)", key, seeded);
        Ok(())
    }

    /// Cancel every task and drop all records, cursors and flags. Persisted exclusions stay.
    pub fn disable(&self) -> Result<()> {
        self.store.purge()?;
        info!("disabled; scanner state removed");
        Ok(())
    }

    pub fn status(&self, root: &Path) -> Result<ScanStatus> {
        let key = root_key(root);
        let now = self.clock.now();
        Ok(ScanStatus {
            baseline: self.store.get_cursor(&key, Phase::Baseline)?,
            drift: self.store.get_cursor(&key, Phase::Drift)?,
            baselined: self.store.flag_is_set(&FlagNames::baselined(&key), now)?,
            changed: self.list_drifted_where(|path| roots_overlap(path, &key))?.len(),
            pending_tasks: self.store.pending_tasks(Some(&key))?,
            root: key,
        })
    }

    /// Plain-text list of changed files, paths shown relative to `root`.
    pub fn export_changed(&self, root: &Path) -> Result<String> {
        self.list_drifted()?;
        let key = root_key(root);
        DriftReport::new(&self.store, &key).export_text()
    }

    /// Fire every task due now. A blocked or failed tick is scheduled again after the delay.
    pub fn run_due(&self) -> Result<Vec<TaskRun>> {
        let now = self.clock.now();
        let mut runs = Vec::new();
        for task in self.store.take_due(now)? {
            let root = PathBuf::from(&task.root);
            let result = match task.kind {
                TaskKind::BaselineStart => self.start_baseline_full(&root),
                TaskKind::Baseline => self.run_baseline_tick(&root),
                TaskKind::Drift => self.run_drift_tick(&root),
            };
            let outcome = match result {
                Ok(o) => Some(o),
                Err(e) => {
                    error!("{} tick for {} failed: {:#}", task.kind.as_str(), task.root, e);
                    None
                }
            };
            if matches!(outcome, None | Some(TickOutcome::Blocked))
                && !self.store.is_scheduled(task.kind, &task.root)?
            {
                self.store.schedule(
                    task.kind,
                    &task.root,
                    now + self.opts.reschedule_delay_secs,
                )?;
            }
            runs.push(TaskRun { task, outcome });
        }
        Ok(runs)
    }
}

fn active_flag(key: &str, phase: Phase) -> String {
    match phase {
        Phase::Baseline => FlagNames::baseline_active(key),
        Phase::Drift => FlagNames::drift_active(key),
    }
}
