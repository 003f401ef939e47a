//! Error taxonomy for a scan tick.
//!
//! Per-file and per-directory failures are [`ScanError::TransientIo`] and are swallowed by the
//! driver after logging. A missing root is [`ScanError::StaleRoot`]. Only store-level failures
//! (including a lost cursor race) abort a tick, and they travel as `anyhow::Error`.

use std::path::PathBuf;
use thiserror::Error;

use crate::types::Phase;

#[derive(Error, Debug)]
pub enum ScanError {
    /// Unreadable file or directory. Skipped; retried on the next scan cycle.
    #[error("cannot read {path}: {source}")]
    TransientIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The scan root itself is gone.
    #[error("scan root no longer exists: {0}")]
    StaleRoot(PathBuf),

    /// The cursor moved between read and write, so another tick advanced it.
    #[error("{phase} cursor for {root} moved from {expected} during the tick")]
    CursorRace {
        root: String,
        phase: Phase,
        expected: i64,
    },

    /// Exclusion pattern that cannot be used.
    #[error("invalid exclusion pattern '{0}'")]
    InvalidPattern(String),
}

impl ScanError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ScanError::TransientIo {
            path: path.into(),
            source,
        }
    }
}
