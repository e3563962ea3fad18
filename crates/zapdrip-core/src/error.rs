//! ZapDrip error taxonomy.
//!
//! One variant per recovery class: `Fetch` is recovered as "no data this
//! cycle", `Channel` is recovered per-row (failure log + counter), and
//! `Checkpoint` only ever covers writes — corrupt checkpoint *reads* fall
//! back to the default start index and are never surfaced as errors.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ZapDripError>;

#[derive(Debug, Error)]
pub enum ZapDripError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("Row source error: {0}")]
    Fetch(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
