//! Durable single-record cursor — the resume point across restarts.
//!
//! The record is overwritten wholesale on every save via a temp file in the
//! same directory followed by a rename, so a reader can never observe a
//! half-written record. Losing the very latest save on a crash is acceptable
//! (the in-flight row is re-attempted); trusting a corrupt record is not, so
//! unreadable checkpoints fall back to the default start index with a
//! warning.

use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use zapdrip_core::error::{Result, ZapDripError};

/// The persisted cursor record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Index of the last fully processed row; -1 means "saved before the
    /// first data row" (a window closure right at the start).
    pub last_processed_index: i64,
    /// When this record was written (RFC 3339).
    pub timestamp: String,
    /// Fingerprint of the row set this cursor belongs to. Absent in records
    /// written by older versions; those are trusted on index alone.
    #[serde(default)]
    pub campaign: Option<String>,
}

/// File-backed checkpoint store.
pub struct CheckpointStore {
    path: PathBuf,
    default_start: usize,
}

impl CheckpointStore {
    /// `default_start` is the first real data row (rows above it are sheet
    /// headers), used whenever no trustworthy checkpoint exists.
    pub fn new(path: PathBuf, default_start: usize) -> Self {
        Self { path, default_start }
    }

    pub fn default_start(&self) -> usize {
        self.default_start
    }

    /// Read the checkpoint. Absent → `None`. Unreadable or corrupt → warn
    /// and `None` (never an error): the caller restarts from the default
    /// index, which can duplicate sends — hence the warning.
    pub fn load(&self) -> Option<Checkpoint> {
        if !self.path.exists() {
            return None;
        }
        match std::fs::read_to_string(&self.path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(cp) => Some(cp),
                Err(e) => {
                    tracing::warn!(
                        "⚠️ Corrupt checkpoint at {} ({e}); starting from row {} — earlier rows may be re-sent",
                        self.path.display(),
                        self.default_start + 1
                    );
                    None
                }
            },
            Err(e) => {
                tracing::warn!(
                    "⚠️ Could not read checkpoint at {} ({e}); starting from row {}",
                    self.path.display(),
                    self.default_start + 1
                );
                None
            }
        }
    }

    /// Next row index to process given a loaded checkpoint.
    pub fn resume_index(&self, checkpoint: Option<&Checkpoint>) -> usize {
        match checkpoint {
            Some(cp) if cp.last_processed_index >= 0 => cp.last_processed_index as usize + 1,
            Some(_) => 0,
            None => self.default_start,
        }
    }

    /// Persist the cursor. Full-file overwrite, atomic via rename.
    pub fn save(&self, last_processed: i64, campaign: &str) -> Result<()> {
        let record = Checkpoint {
            last_processed_index: last_processed,
            timestamp: Utc::now().to_rfc3339(),
            campaign: Some(campaign.to_string()),
        };
        let json = serde_json::to_string_pretty(&record)
            .map_err(|e| ZapDripError::Checkpoint(format!("Serialize: {e}")))?;

        let dir = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)
            .map_err(|e| ZapDripError::Checkpoint(format!("Create dir: {e}")))?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| ZapDripError::Checkpoint(format!("Temp file: {e}")))?;
        tmp.write_all(json.as_bytes())
            .map_err(|e| ZapDripError::Checkpoint(format!("Write: {e}")))?;
        tmp.flush()
            .map_err(|e| ZapDripError::Checkpoint(format!("Flush: {e}")))?;
        tmp.as_file_mut()
            .sync_all()
            .map_err(|e| ZapDripError::Checkpoint(format!("Sync: {e}")))?;
        tmp.persist(&self.path)
            .map_err(|e| ZapDripError::Checkpoint(format!("Rename: {e}")))?;

        tracing::debug!("💾 Progress saved: row index {last_processed}");
        Ok(())
    }

    /// Delete the checkpoint; idempotent when already absent.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!("✅ Checkpoint removed — campaign complete");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ZapDripError::Checkpoint(format!("Clear: {e}"))),
        }
    }
}
