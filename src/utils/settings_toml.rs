//! Load `.hashsentry.toml` from the scan root (CLI only). The lib takes its config through ScanOpts.

use anyhow::Result;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::Opts;
use crate::utils::config::PackagePaths;
use crate::utils::exclusions::ExclusionList;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SettingsToml {
    #[serde(default)]
    settings: SettingsSection,
}

#[derive(Debug, Default, Deserialize)]
struct SettingsSection {
    db_path: Option<String>,
    extensions: Option<Vec<String>>,
    exclude: Option<ExcludeSetting>,
    quota: Option<usize>,
    depth: Option<usize>,
    reschedule_delay: Option<i64>,
    cooldown_days: Option<i64>,
    notify_file: Option<String>,
    verbose: Option<bool>,
}

/// `exclude = ["a", "b"]` or a free-text blob, one pattern per line or comma.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ExcludeSetting {
    List(Vec<String>),
    Blob(String),
}

/// Load the settings file from `dir` if present. Returns None if missing or unparsable.
pub(crate) fn load_settings_toml(dir: &Path) -> Option<SettingsToml> {
    let path = dir.join(PackagePaths::get().settings_filename());
    let s = std::fs::read_to_string(&path).ok()?;
    parse_settings(&s)
        .map_err(|e| log::warn!("{}: {}", path.display(), e))
        .ok()
}

pub(crate) fn parse_settings(s: &str) -> Result<SettingsToml, toml::de::Error> {
    toml::from_str(s)
}

/// Overwrite opts field from file when present.
macro_rules! apply_file_opt {
    ($sec:expr, $opts:expr, $sec_field:ident => $($opts_field:ident).+) => {
        if let Some(v) = $sec.$sec_field {
            $opts.$($opts_field).+ = v;
        }
    };
}

/// Apply file config to opts (only fields present in the file). Call before applying CLI flags.
pub(crate) fn apply_file_to_opts(file: &SettingsToml, opts: &mut Opts) -> Result<()> {
    let sec = &file.settings;
    if let Some(ref p) = sec.db_path {
        opts.db_path = Some(PathBuf::from(p));
    }
    if let Some(ref p) = sec.notify_file {
        opts.notify_file = Some(PathBuf::from(p));
    }
    if let Some(ref exts) = sec.extensions {
        opts.scan.extensions = exts
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .collect();
    }
    match &sec.exclude {
        Some(ExcludeSetting::List(items)) => opts.scan.exclude = ExclusionList::new(items)?,
        Some(ExcludeSetting::Blob(text)) => opts.scan.exclude = ExclusionList::parse_blob(text)?,
        None => {}
    }
    apply_file_opt!(sec, opts, quota => scan.quota);
    apply_file_opt!(sec, opts, depth => scan.depth);
    apply_file_opt!(sec, opts, reschedule_delay => scan.reschedule_delay_secs);
    if let Some(days) = sec.cooldown_days {
        opts.scan.cooldown_secs = days * 24 * 60 * 60;
    }
    apply_file_opt!(sec, opts, verbose => verbose);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_values_override_defaults() {
        let file = parse_settings(
            r#"
[settings]
extensions = [".PHP", "inc"]
exclude = "wp-content/cache, *.min.js"
quota = 5
cooldown_days = 1
"#,
        )
        .unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts).unwrap();
        assert_eq!(opts.scan.extensions, vec!["php", "inc"]);
        assert_eq!(opts.scan.exclude.to_strings(), vec!["wp-content/cache", "*.min.js"]);
        assert_eq!(opts.scan.quota, 5);
        assert_eq!(opts.scan.cooldown_secs, 86_400);
        assert_eq!(opts.scan.depth, 3);
    }

    #[test]
    fn exclude_list_form_is_accepted() {
        let file = parse_settings("[settings]\nexclude = [\"vendor\", \"cache\"]\n").unwrap();
        let mut opts = Opts::default();
        apply_file_to_opts(&file, &mut opts).unwrap();
        assert_eq!(opts.scan.exclude.len(), 2);
    }

    #[test]
    fn wildcard_only_exclude_is_rejected() {
        let file = parse_settings("[settings]\nexclude = [\"*\"]\n").unwrap();
        let mut opts = Opts::default();
        assert!(apply_file_to_opts(&file, &mut opts).is_err());
    }
}
