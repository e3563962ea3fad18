//! Append-only failure log.
//!
//! One delimited line per failed send, with a `Date/Time,Name,Phone,Error`
//! header written on first use. Never mutated or truncated by this process;
//! it accumulates across campaigns and is the durable artifact for post-hoc
//! review. Single-writer by assumption.

use std::io::Write;
use std::path::PathBuf;

use chrono::DateTime;
use chrono_tz::Tz;
use zapdrip_core::error::Result;

const HEADER: &str = "Date/Time,Name,Phone,Error";

/// File-backed failure recorder.
pub struct FailureLog {
    path: PathBuf,
}

impl FailureLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Append one failure record, creating the log (with header) if absent.
    pub fn record(&self, name: &str, phone: &str, reason: &str, when: DateTime<Tz>) -> Result<()> {
        if let Some(dir) = self.path.parent()
            && !dir.as_os_str().is_empty()
        {
            std::fs::create_dir_all(dir)?;
        }

        let fresh = !self.path.exists();
        let mut file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        if fresh {
            writeln!(file, "{HEADER}")?;
        }
        // Commas and newlines inside fields would shear the line.
        let clean = |s: &str| s.replace([',', '\n', '\r'], " ");
        writeln!(
            file,
            "{},{},{},{}",
            when.format("%d/%m/%Y %H:%M:%S"),
            clean(name),
            clean(phone),
            clean(reason)
        )?;
        Ok(())
    }
}
