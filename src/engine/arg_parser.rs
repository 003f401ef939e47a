use clap::{Parser, Subcommand};
use std::path::PathBuf;

struct DefaultArgs;

impl DefaultArgs {
    pub const ROOT: &'static str = ".";
}

/// Incremental file-integrity scanner: baseline a code tree in small batches, flag drift from it.
#[derive(Clone, Parser)]
#[command(name = "hashsentry")]
#[command(about = "Baseline a code tree in resumable batches and report files changed since.")]
pub struct Cli {
    /// Root directory to watch. Default: current directory.
    #[arg(long, short = 'r', global = true, value_name = "DIR", default_value = DefaultArgs::ROOT)]
    pub root: PathBuf,

    /// Path to the state database. Default: `.hashsentry.db` in the root.
    #[arg(long, short, global = true)]
    pub db: Option<PathBuf>,

    /// Verbose output.
    #[arg(long, short = 'v', global = true, num_args = 0..=1, default_missing_value = "true", value_parser = clap::value_parser!(bool))]
    pub verbose: Option<bool>,

    /// Extra exclusion pattern (substring, or glob with * and ?). Repeat for more.
    #[arg(long, short = 'e', global = true)]
    pub exclude: Vec<String>,

    /// Append drift notifications to this file instead of logging them.
    #[arg(long, global = true)]
    pub notify_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Subcommand)]
pub enum Commands {
    /// Seed default exclusions and schedule the first baseline.
    Enable,
    /// Cancel all tasks and drop all scanner state.
    Disable,
    /// Run every task that is due. Invoke this from cron.
    Tick,
    /// Run ticks back to back until no task is pending (Ctrl+C stops between ticks).
    Run,
    /// Restart the baseline from the first directory and run one tick.
    Baseline,
    /// Start a drift scan and run one tick.
    Detect,
    /// Re-record the baseline of sub-trees after a legitimate update.
    Rebaseline {
        #[arg(required = true, value_name = "DIR")]
        dirs: Vec<PathBuf>,
    },
    /// Forget all records for the root and schedule a fresh baseline.
    Reset,
    /// List changed files.
    List {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
    },
    /// Write the changed-file report. Default: `hashsentry-changed-files.txt` in the root.
    Export {
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Exclude files from future scans and forget their records.
    Exclude {
        #[arg(required = true, value_name = "PATH")]
        paths: Vec<PathBuf>,
    },
    /// Exclude files by record id (as shown by `list`).
    ExcludeIds {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<i64>,
    },
    /// Forget records by id. A file that is still present is picked up again by the next drift scan.
    Delete {
        #[arg(required = true, value_name = "ID")]
        ids: Vec<i64>,
    },
    /// Show cursor progress, changed count and pending tasks.
    Status,
}
