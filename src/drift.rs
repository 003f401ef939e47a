//! Drift detection for one directory, and the reporting built on the stored drift markers.

use anyhow::Result;
use log::{debug, warn};
use std::cell::OnceCell;
use std::collections::BTreeSet;
use std::path::Path;

use crate::baseline::hash_dir_files;
use crate::engine::enumerator::TreeEnumerator;
use crate::engine::notifier::Notifier;
use crate::engine::store::{FlagStore, HashStore};
use crate::engine::tools::{display_relative, path_to_db_string};
use crate::utils::config::{FlagNames, NotifyConsts};

/// Compare every eligible file in `dir` with its stored hash; add mismatches to `changed`.
///
/// A file with no record has no baseline to trust: it is recorded with its current hash and
/// drift marker `now`, and counted as changed. Matching files are not touched. Returns how many
/// files were compared.
pub fn compare_hashes_for_dir<S: HashStore + ?Sized>(
    store: &S,
    enumerator: &TreeEnumerator<'_>,
    dir: &Path,
    now: i64,
    changed: &mut BTreeSet<String>,
) -> Result<usize> {
    let hashed = hash_dir_files(enumerator, dir);
    for (path, hash) in &hashed {
        let key = path_to_db_string(path);
        match store.get_record(&key)? {
            None => {
                debug!("new file without baseline: {}", key);
                store.upsert_record(&key, hash, now)?;
                changed.insert(key);
            }
            Some(rec) if rec.hash != *hash => {
                debug!("hash mismatch: {}", key);
                changed.insert(key);
            }
            Some(_) => {}
        }
    }
    Ok(hashed.len())
}

/// Persist drift markers for `changed`. A path whose file is gone loses its record instead.
/// Returns how many markers were set.
pub fn flush_changed_set<S: HashStore + ?Sized>(
    store: &S,
    changed: &BTreeSet<String>,
    now: i64,
) -> Result<usize> {
    let mut marked = 0;
    for path in changed {
        if !Path::new(path).exists() {
            store.delete_record(path)?;
            continue;
        }
        if store.set_drift_marker(path, now)? {
            marked += 1;
        }
    }
    Ok(marked)
}

/// Changed-file view over the hash store, read at most once.
pub struct DriftReport<'a, S: ?Sized> {
    store: &'a S,
    root: &'a str,
    changed: OnceCell<Vec<String>>,
}

impl<'a, S: HashStore + ?Sized> DriftReport<'a, S> {
    /// `root` is only used to shorten displayed paths.
    pub fn new(store: &'a S, root: &'a str) -> Self {
        Self {
            store,
            root,
            changed: OnceCell::new(),
        }
    }

    /// Display paths of drifted files that still exist.
    pub fn changed_files(&self) -> Result<&[String]> {
        if let Some(v) = self.changed.get() {
            return Ok(v);
        }
        let files = self
            .store
            .drifted_records()?
            .into_iter()
            .filter(|r| Path::new(&r.path).exists())
            .map(|r| display_relative(&r.path, self.root))
            .collect();
        Ok(self.changed.get_or_init(|| files))
    }

    /// Notification body: intro, at most `limit` paths, and a pointer to the full list when cut.
    pub fn summary_lines(&self, limit: usize) -> Result<Vec<String>> {
        let changed = self.changed_files()?;
        let mut lines = vec![
            "The recurring scan detected files that were changed outside plugin, theme or core updates:"
                .to_string(),
        ];
        lines.extend(changed.iter().take(limit).cloned());
        if changed.len() > limit {
            lines.push(format!(
                "...and {} more. Run `{} list` for the full list.",
                changed.len() - limit,
                env!("CARGO_PKG_NAME")
            ));
        }
        Ok(lines)
    }

    /// Plain-text export of the full list.
    pub fn export_text(&self) -> Result<String> {
        let changed = self.changed_files()?;
        let mut out = String::new();
        if changed.is_empty() {
            out.push_str("No changed files found\n");
            return Ok(out);
        }
        out.push_str("Changed files:\n");
        for f in changed {
            out.push_str(f);
            out.push('\n');
        }
        out.push_str(
            "These files were changed outside a normal plugin, theme or core update. \
             If you changed them yourself you can ignore this; otherwise check them with your hosting provider.\n",
        );
        Ok(out)
    }
}

/// Send the drift summary unless nothing changed or a notification went out within the cooldown.
/// A failed send is logged and still starts the cooldown. Returns true when a notification was sent.
pub fn notify_if_needed<S, N>(
    report: &DriftReport<'_, S>,
    store: &S,
    notifier: &N,
    now: i64,
    cooldown_secs: i64,
) -> Result<bool>
where
    S: HashStore + FlagStore + ?Sized,
    N: Notifier + ?Sized,
{
    if report.changed_files()?.is_empty() {
        return Ok(false);
    }
    if store.flag_is_set(FlagNames::NOTIFY_COOLDOWN, now)? {
        debug!("drift notification suppressed: cooldown active");
        return Ok(false);
    }
    let lines = report.summary_lines(NotifyConsts::SUMMARY_LIMIT)?;
    if let Err(e) = notifier.send(NotifyConsts::SUBJECT, &lines) {
        warn!("drift notification failed: {:#}", e);
    }
    store.set_flag(FlagNames::NOTIFY_COOLDOWN, Some(now + cooldown_secs))?;
    Ok(true)
}
