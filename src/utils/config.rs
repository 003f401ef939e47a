//! Application configuration constants.
//! Scan tuning and thresholds in one place.

use std::sync::OnceLock;

// ---- Package / paths (from CARGO_PKG_NAME, cached) ----

/// Package-derived paths: built once from `CARGO_PKG_NAME`, then cached.
pub struct PackagePaths {
    db_filename: String,
    settings_filename: String,
    report_filename: String,
}

static PACKAGE_PATHS: OnceLock<PackagePaths> = OnceLock::new();

impl PackagePaths {
    /// Build and cache paths from `CARGO_PKG_NAME`. Called once on first use.
    pub fn get() -> &'static PackagePaths {
        PACKAGE_PATHS.get_or_init(|| {
            let pkg = env!("CARGO_PKG_NAME");
            PackagePaths {
                db_filename: format!(".{pkg}.db"),
                settings_filename: format!(".{pkg}.toml"),
                report_filename: format!("{pkg}-changed-files.txt"),
            }
        })
    }

    /// Default state database name, created in the scan root.
    pub fn db_filename(&self) -> &str {
        &self.db_filename
    }

    pub fn settings_filename(&self) -> &str {
        &self.settings_filename
    }

    /// Name of the plain-text export written by `export`.
    pub fn report_filename(&self) -> &str {
        &self.report_filename
    }

    /// Patterns always excluded from enumeration, before any configured ones.
    pub fn builtin_exclude_patterns(&self) -> Vec<String> {
        vec!["node_modules".to_string()]
    }
}

// ---- Batch driver ----

/// Scan cadence and batch sizing.
pub struct ScanConsts;

impl ScanConsts {
    /// Directory levels the enumerator expands below the root.
    pub const DIRECTORY_LEVELS: usize = 3;
    /// Directories processed per tick.
    pub const BATCH_QUOTA: usize = 30;
    /// Delay before the next tick of an unfinished phase (seconds).
    pub const RESCHEDULE_DELAY_SECS: i64 = 30;
    /// Lifetime of the per-root "phase active" flags (seconds). Outlives any single tick.
    pub const ACTIVE_FLAG_TTL_SECS: i64 = 60;
}

/// Default allow-list of file extensions (without the dot).
pub const DEFAULT_EXTENSIONS: &[&str] = &["php", "js"];

/// Exclusions seeded by `enable`. Caches, backups and uploads change constantly; config files are
/// rewritten by the CMS itself.
pub const DEFAULT_SEEDED_EXCLUDES: &[&str] = &[
    "advanced-headers.php",
    "advanced-headers-test.php",
    "advanced-cache.php",
    "wp-content/cache",
    "wp-content/backup",
    "wp-content/uploads",
    "wp-config.php",
];

// ---- Hashing ----

/// Hashing I/O thresholds and buffer sizes.
pub struct HashingConsts;

impl HashingConsts {
    /// File size above which hashing uses memory-mapped I/O (bytes). 100 MB.
    pub const HASH_MMAP_THRESHOLD: u64 = 100 * 1024 * 1024;
    /// Chunk size for reading files below mmap threshold (bytes). 1 MB.
    pub const HASH_READ_CHUNK_SIZE: usize = 1024 * 1024;
}

// ---- Notification ----

/// Drift notification limits.
pub struct NotifyConsts;

impl NotifyConsts {
    /// Minimum gap between two drift notifications (seconds). One week.
    pub const COOLDOWN_SECS: i64 = 7 * 24 * 60 * 60;
    /// Paths listed in one notification before truncating.
    pub const SUMMARY_LIMIT: usize = 10;
    pub const SUBJECT: &'static str = "Security warning: changed files";
}

// ---- Flag names ----

/// Names of rows in the flags table.
pub struct FlagNames;

impl FlagNames {
    pub const NOTIFY_COOLDOWN: &'static str = "notify_cooldown";

    pub fn baseline_active(root: &str) -> String {
        format!("baseline_active:{root}")
    }

    pub fn drift_active(root: &str) -> String {
        format!("drift_active:{root}")
    }

    pub fn baselined(root: &str) -> String {
        format!("baselined:{root}")
    }
}
