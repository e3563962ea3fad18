//! Boundary traits. The dispatch loop only ever talks to these, which keeps
//! the state machine testable with in-memory stubs and keeps the external
//! collaborators (Sheets, WhatsApp) swappable.

use async_trait::async_trait;

use crate::error::Result;

/// The tabular data feed. Treated as a fallible pure function: each call
/// returns the *current* full row set, which may have grown or changed since
/// the last fetch.
#[async_trait]
pub trait RowSource: Send + Sync {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>>;
}

/// The outbound message channel.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Channel name for narration ("whatsapp", "console", ...).
    fn name(&self) -> &str;

    /// Verify credentials/reachability once, before the first send.
    async fn connect(&mut self) -> Result<()>;

    /// Send one message. `phone` is already normalized to digits with a
    /// country prefix. Success/failure is opaque — any `Err` is recorded by
    /// the caller and never retried within the cycle.
    async fn send(&self, phone: &str, message: &str) -> Result<()>;
}
