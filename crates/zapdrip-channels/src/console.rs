//! Console transport — dry-run mode. Narrates each send instead of touching
//! the network, so an operator can rehearse a campaign (pacing, window
//! behavior, checkpointing) against the real sheet.

use async_trait::async_trait;
use zapdrip_core::error::Result;
use zapdrip_core::traits::Transport;

pub struct ConsoleTransport;

#[async_trait]
impl Transport for ConsoleTransport {
    fn name(&self) -> &str {
        "console"
    }

    async fn connect(&mut self) -> Result<()> {
        tracing::info!("Console transport: dry-run, nothing will be sent");
        Ok(())
    }

    async fn send(&self, phone: &str, message: &str) -> Result<()> {
        tracing::info!("📤 [dry-run] → {phone}: {message}");
        Ok(())
    }
}
