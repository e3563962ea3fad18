//! Outer supervisor — the restart loop around dispatch cycles.
//!
//! Each cycle re-fetches the full row set (the sheet may have changed while
//! the process was paused), runs the dispatch loop, and reacts to how the
//! cycle ended. A campaign is complete only when a cycle walks off the end
//! of a row set; the checkpoint is cleared exactly then, and `run` returns
//! the accumulated totals.

use zapdrip_core::config::DispatchConfig;
use zapdrip_core::error::Result;
use zapdrip_core::traits::{RowSource, Transport};

use crate::checkpoint::CheckpointStore;
use crate::failures::FailureLog;
use crate::runner::{CycleOutcome, CycleTotals, DispatchLoop};
use crate::window::SendWindow;

/// Supervisor states. `Done` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    WaitingForWindow,
    Fetching,
    Dispatching,
    Done,
}

/// Whole-campaign totals, accumulated across cycles.
#[derive(Debug, Clone, Copy, Default)]
pub struct CampaignSummary {
    pub sent: u32,
    pub failed: u32,
    pub skipped: u32,
}

impl CampaignSummary {
    pub fn total_processed(&self) -> u32 {
        self.sent + self.failed + self.skipped
    }

    fn absorb(&mut self, totals: CycleTotals) {
        self.sent += totals.sent;
        self.failed += totals.failed;
        self.skipped += totals.skipped;
    }
}

/// Owns the boundaries and state stores for the lifetime of the process.
pub struct Supervisor {
    source: Box<dyn RowSource>,
    transport: Box<dyn Transport>,
    window: SendWindow,
    checkpoint: CheckpointStore,
    failures: FailureLog,
    config: DispatchConfig,
}

impl Supervisor {
    pub fn new(
        source: Box<dyn RowSource>,
        transport: Box<dyn Transport>,
        window: SendWindow,
        checkpoint: CheckpointStore,
        failures: FailureLog,
        config: DispatchConfig,
    ) -> Self {
        Self {
            source,
            transport,
            window,
            checkpoint,
            failures,
            config,
        }
    }

    /// Run until the campaign completes. Cancellation-safe: every long wait
    /// is an await point, and the checkpoint is only ever written atomically
    /// between rows.
    pub async fn run(&mut self) -> Result<CampaignSummary> {
        self.transport.connect().await?;
        tracing::info!("🤖 Dispatcher started via {}", self.transport.name());

        let mut summary = CampaignSummary::default();
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut state = SupervisorState::WaitingForWindow;

        loop {
            state = match state {
                SupervisorState::WaitingForWindow => {
                    self.window.wait_until_open().await;
                    SupervisorState::Fetching
                }
                SupervisorState::Fetching => match self.fetch().await {
                    Some(fetched) => {
                        rows = fetched;
                        SupervisorState::Dispatching
                    }
                    None => {
                        self.idle().await;
                        SupervisorState::WaitingForWindow
                    }
                },
                SupervisorState::Dispatching => {
                    let runner = DispatchLoop::new(
                        self.transport.as_ref(),
                        &self.window,
                        &self.checkpoint,
                        &self.failures,
                        &self.config,
                    );
                    match runner.run_cycle(&rows).await? {
                        CycleOutcome::Completed(totals) => {
                            summary.absorb(totals);
                            self.checkpoint.clear()?;
                            tracing::info!("🎉 All rows processed — campaign complete");
                            SupervisorState::Done
                        }
                        CycleOutcome::WindowClosed { totals, .. } => {
                            summary.absorb(totals);
                            SupervisorState::WaitingForWindow
                        }
                        CycleOutcome::CaughtUp { .. } => {
                            self.idle().await;
                            SupervisorState::WaitingForWindow
                        }
                    }
                }
                SupervisorState::Done => return Ok(summary),
            };
        }
    }

    /// Fetch the current row set. Any fetch failure is narrated and treated
    /// as "no data this cycle" — never fatal.
    async fn fetch(&self) -> Option<Vec<Vec<String>>> {
        tracing::info!("📊 Fetching rows from the sheet...");
        match self.source.fetch_rows().await {
            Ok(rows) if rows.is_empty() => {
                tracing::info!("⚠️ Sheet returned no rows");
                None
            }
            Ok(rows) => {
                tracing::info!("✅ {} rows loaded", rows.len());
                Some(rows)
            }
            Err(e) => {
                tracing::error!("❌ Fetch failed: {e}");
                None
            }
        }
    }

    /// In-window pause between fetches when there is nothing to dispatch,
    /// so an open window does not hot-loop on an idle sheet.
    async fn idle(&self) {
        tracing::info!(
            "😴 Nothing to dispatch; checking again in {}s",
            self.config.idle_poll_secs
        );
        tokio::time::sleep(std::time::Duration::from_secs(self.config.idle_poll_secs)).await;
    }
}
