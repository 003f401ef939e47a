//! Hashsentry: incremental file-integrity scanner.
//!
//! A root is scanned in two resumable phases. The baseline phase records a blake3 hash for every
//! eligible file; the drift phase compares current hashes against it and marks mismatches. Each
//! tick handles a bounded number of directories and persists a cursor, so the work can be spread
//! over many short, externally scheduled invocations.

pub mod baseline;
pub mod drift;
pub mod engine;
pub mod error;
pub mod types;
pub mod utils;

/// Re-export types for API
pub use types::*;

pub use engine::{BatchDriver, SqliteStore};
pub use error::ScanError;

/// Result alias used by public hashsentry API
pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, Error>;

/// Driver over a SQLite state database at `db_path`, logging notifications and using the system clock.
///
/// ```ignore
/// let driver = hashsentry::open_driver(Path::new("/srv/site/.hashsentry.db"), ScanOpts::default())?;
/// driver.enable(Path::new("/srv/site"))?;
/// driver.run_due()?;
/// ```
pub fn open_driver(
    db_path: &std::path::Path,
    opts: ScanOpts,
) -> Result<BatchDriver<SqliteStore, engine::LogNotifier, engine::SystemClock>> {
    let store = SqliteStore::open(db_path)?;
    log::debug!(
        "{} CONFIG:{:#?}",
        env!("CARGO_PKG_NAME").to_uppercase(),
        opts
    );
    Ok(BatchDriver::new(
        store,
        engine::LogNotifier,
        engine::SystemClock,
        opts,
    ))
}
