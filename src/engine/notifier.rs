//! Drift notification transports. Fire-and-forget: the driver logs a failed send and moves on.

use anyhow::{Context, Result};
use log::warn;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;

pub trait Notifier {
    fn send(&self, subject: &str, body_lines: &[String]) -> Result<()>;
}

impl<T: Notifier + ?Sized> Notifier for &T {
    fn send(&self, subject: &str, body_lines: &[String]) -> Result<()> {
        (**self).send(subject, body_lines)
    }
}

/// Writes the notification to the log at warn level.
#[derive(Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, subject: &str, body_lines: &[String]) -> Result<()> {
        warn!("{}", subject);
        for line in body_lines {
            warn!("  {}", line);
        }
        Ok(())
    }
}

/// Appends each notification to a file, e.g. a mail spool picked up by another job.
pub struct FileNotifier {
    path: PathBuf,
}

impl FileNotifier {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Notifier for FileNotifier {
    fn send(&self, subject: &str, body_lines: &[String]) -> Result<()> {
        let mut f = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("open notification file {}", self.path.display()))?;
        let stamp = chrono::Local::now().to_rfc2822();
        writeln!(f, "Date: {stamp}")?;
        writeln!(f, "Subject: {subject}")?;
        writeln!(f)?;
        for line in body_lines {
            writeln!(f, "{line}")?;
        }
        writeln!(f)?;
        Ok(())
    }
}
