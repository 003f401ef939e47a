//! CLI command handlers. Each builds the driver over the root's state database and runs one command.

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use kdam::Animation;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crate::Opts;
use crate::engine::arg_parser::{Cli, Commands};
use crate::engine::clock::SystemClock;
use crate::engine::db_ops::SqliteStore;
use crate::engine::driver::{BatchDriver, TaskRun};
use crate::engine::notifier::{FileNotifier, LogNotifier, Notifier};
use crate::engine::progress::{
    ProgressBar, ProgressBarConfig, create_progress_bar, finish_bar, set_bar_total,
    update_progress_bar,
};
use crate::engine::store::Scheduler;
use crate::engine::tools::{canonical_root, display_relative, path_to_db_string, running_as_root};
use crate::types::{ScanCursor, ScanStatus, TickOutcome};
use crate::utils::config::PackagePaths;
use crate::utils::exclusions::ExclusionList;
use crate::utils::settings_toml::{apply_file_to_opts, load_settings_toml};
use crate::utils::{Colors, setup_logging};

type CliDriver<'a> = BatchDriver<SqliteStore, &'a dyn Notifier, SystemClock>;

/// Settings file first, then CLI flags on top.
fn setup_opts(cli: &Cli, root: &Path) -> Result<Opts> {
    let mut opts = Opts::default();
    if let Some(file) = load_settings_toml(root) {
        apply_file_to_opts(&file, &mut opts)?;
    }
    if let Some(ref db) = cli.db {
        opts.db_path = Some(db.clone());
    }
    if let Some(v) = cli.verbose {
        opts.verbose = v;
    }
    if !cli.exclude.is_empty() {
        opts.scan.exclude.merge(&ExclusionList::new(&cli.exclude)?);
    }
    if let Some(ref p) = cli.notify_file {
        opts.notify_file = Some(p.clone());
    }
    setup_logging(opts.verbose);
    Ok(opts)
}

/// Entry point used by `main`: load config, open the store, dispatch the subcommand.
pub fn handle_run(cli: &Cli) -> Result<()> {
    let (root, _) = canonical_root(&cli.root)?;
    let mut opts = setup_opts(cli, &root)?;
    if running_as_root() {
        info!("Running as root. The state database will be owned by root.");
    }
    if matches!(cli.command, Commands::Run) {
        // Foreground: no need to space ticks out.
        opts.scan.reschedule_delay_secs = 0;
    }

    let db_path = opts
        .db_path
        .clone()
        .unwrap_or_else(|| root.join(PackagePaths::get().db_filename()));
    let store = SqliteStore::open(&db_path)?;
    let notifier: Box<dyn Notifier> = match opts.notify_file {
        Some(ref p) => Box::new(FileNotifier::new(p)),
        None => Box::new(LogNotifier),
    };
    debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    let driver: CliDriver<'_> =
        BatchDriver::new(store, notifier.as_ref(), SystemClock, opts.scan.clone());

    match &cli.command {
        Commands::Enable => {
            driver.enable(&root)?;
            println!(
                "Scanning enabled for {}. Run `{} tick` from cron to advance it.",
                root.display(),
                env!("CARGO_PKG_NAME")
            );
        }
        Commands::Disable => driver.disable()?,
        Commands::Tick => handle_tick(&driver)?,
        Commands::Run => handle_foreground(&driver, &root, opts.verbose)?,
        Commands::Baseline => report_outcome("baseline", driver.start_baseline_full(&root)?),
        Commands::Detect => report_outcome("drift", driver.start_drift_full(&root)?),
        Commands::Rebaseline { dirs } => {
            let dirs = dirs
                .iter()
                .map(|d| canonical_root(&resolve_under(&root, d)).map(|(p, _)| p))
                .collect::<Result<Vec<_>>>()?;
            for (dir, o) in dirs.iter().zip(driver.rebaseline(&dirs)?) {
                report_outcome(&format!("baseline {}", dir.display()), o);
            }
        }
        Commands::Reset => {
            driver.reset_all(&root)?;
            println!("Reset {}. A fresh baseline is scheduled.", root.display());
        }
        Commands::List { json } => handle_list(&driver, &root, *json)?,
        Commands::Export { output } => {
            let text = driver.export_changed(&root)?;
            let out = output
                .clone()
                .unwrap_or_else(|| root.join(PackagePaths::get().report_filename()));
            std::fs::write(&out, text)
                .with_context(|| format!("write report {}", out.display()))?;
            println!("Report written to {}", out.display());
        }
        Commands::Exclude { paths } => {
            let keys: Vec<String> = paths
                .iter()
                .map(|p| {
                    let p = resolve_under(&root, p);
                    path_to_db_string(&p.canonicalize().unwrap_or(p))
                })
                .collect();
            let added = driver.exclude_and_forget(&keys)?;
            println!("{} exclusion(s) added.", added);
        }
        Commands::ExcludeIds { ids } => {
            let added = driver.exclude_ids(ids)?;
            println!("{} exclusion(s) added.", added);
        }
        Commands::Delete { ids } => {
            let n = driver.delete(ids)?;
            println!("{} record(s) removed.", n);
        }
        Commands::Status => print_status(&driver.status(&root)?),
    }
    Ok(())
}

fn resolve_under(root: &Path, p: &Path) -> PathBuf {
    if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    }
}

fn report_outcome(what: &str, outcome: TickOutcome) {
    match outcome {
        TickOutcome::Blocked => println!("{}: waiting for another scan of this root", what),
        TickOutcome::StaleRoot => println!("{}: root no longer exists", what),
        TickOutcome::AlreadyComplete => println!("{}: already complete", what),
        TickOutcome::Advanced { index, count, .. } => println!(
            "{}: {}/{} directories, next batch scheduled",
            what,
            index,
            count
        ),
        TickOutcome::Completed { count, .. } => {
            println!("{}: complete ({} directories)", what, count)
        }
    }
}

fn handle_tick(driver: &CliDriver<'_>) -> Result<()> {
    let runs = driver.run_due()?;
    if runs.is_empty() {
        debug!("no task due");
    }
    for TaskRun { task, outcome } in runs {
        if let Some(o) = outcome {
            info!("{} {}: {:?}", task.kind.as_str(), task.root, o);
        }
    }
    Ok(())
}

/// Run due tasks until none are pending or Ctrl+C is pressed. Stops only between ticks.
fn handle_foreground(driver: &CliDriver<'_>, root: &Path, verbose: bool) -> Result<()> {
    let cancel_requested = Arc::new(AtomicBool::new(false));
    let cancel_requested_handler = Arc::clone(&cancel_requested);
    ctrlc::set_handler(move || {
        cancel_requested_handler.store(true, Ordering::Relaxed);
    })
    .context("set Ctrl+C handler")?;

    let bar: Option<ProgressBar> = verbose.then(|| {
        create_progress_bar(ProgressBarConfig::new(0, "Scanning", Animation::Classic))
    });
    loop {
        if cancel_requested.load(Ordering::Relaxed) {
            info!("Stopped; progress is saved and `tick` resumes from here.");
            break;
        }
        let runs = driver.run_due()?;
        let mut progressed = false;
        for run in &runs {
            match run.outcome {
                Some(TickOutcome::Advanced {
                    processed, count, ..
                })
                | Some(TickOutcome::Completed { processed, count }) => {
                    progressed = true;
                    if let Some(ref b) = bar {
                        set_bar_total(b, count);
                        update_progress_bar(b, processed);
                    }
                }
                _ => {}
            }
        }
        if driver.store().pending_tasks(None)?.is_empty() {
            break;
        }
        if !progressed {
            std::thread::sleep(Duration::from_secs(1));
        }
    }
    if let Some(ref b) = bar {
        finish_bar(b);
    }
    print_status(&driver.status(root)?);
    Ok(())
}

fn format_time(ts: i64) -> String {
    DateTime::from_timestamp(ts, 0)
        .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| ts.to_string())
}

fn handle_list(driver: &CliDriver<'_>, root: &Path, json: bool) -> Result<()> {
    let changed = driver.list_drifted()?;
    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&changed).context("serialize changed files")?
        );
        return Ok(());
    }
    if changed.is_empty() {
        println!("{}", Colors::colorize(Colors::OK, "No changed files found"));
        return Ok(());
    }
    let root_key = path_to_db_string(root);
    for f in &changed {
        println!(
            "{:>6}  {}  {}",
            f.id,
            format_time(f.changed_at),
            Colors::colorize(
                Colors::CHANGED,
                &display_relative(&f.path, &root_key)
            )
        );
    }
    Ok(())
}

fn cursor_line(cursor: &Option<ScanCursor>) -> String {
    match cursor {
        None => "not started".to_string(),
        Some(c) if c.is_complete() => "complete".to_string(),
        Some(c) => format!("{}/{} directories", c.phase_index, c.directory_count),
    }
}

fn print_status(status: &ScanStatus) {
    println!("root:      {}", status.root);
    println!("baseline:  {}", cursor_line(&status.baseline));
    println!("drift:     {}", cursor_line(&status.drift));
    println!("baselined: {}", status.baselined);
    let changed = format!("{} changed file(s)", status.changed);
    if status.in_progress() {
        println!(
            "changes:   {} {}",
            Colors::colorize(Colors::CHANGED, &changed),
            Colors::colorize(Colors::PENDING, "(scan still in progress)")
        );
    } else if status.changed > 0 {
        println!("changes:   {}", Colors::colorize(Colors::CHANGED, &changed));
    } else {
        println!("changes:   {}", Colors::colorize(Colors::OK, &changed));
    }
    for t in &status.pending_tasks {
        println!("pending:   {} at {}", t.kind.as_str(), format_time(t.due_at));
    }
}
