//! The dispatch loop — one cycle over one fetched row set.
//!
//! Invariants enforced here:
//! - the gate is re-checked before *every* row, so a cycle stops exactly at
//!   the window edge and the unprocessed row is the resume point;
//! - the cursor is persisted after every row outcome (sent, failed, or
//!   skipped), so a crash loses at most the in-flight row;
//! - a validation skip never reaches the transport and never produces a
//!   failure record; a rejected send produces exactly one.

use sha2::{Digest, Sha256};
use zapdrip_core::config::DispatchConfig;
use zapdrip_core::error::Result;
use zapdrip_core::traits::Transport;
use zapdrip_core::types::Recipient;

use crate::checkpoint::CheckpointStore;
use crate::failures::FailureLog;
use crate::window::SendWindow;

/// Per-cycle counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleTotals {
    pub sent: u32,
    pub failed: u32,
    pub skipped: u32,
}

/// How a cycle over one row set ended.
#[derive(Debug)]
pub enum CycleOutcome {
    /// Walked off the end of the row set — the campaign is complete.
    Completed(CycleTotals),
    /// The window closed mid-batch; `resume_index` is the first unprocessed
    /// row, already persisted as the resume point.
    WindowClosed {
        totals: CycleTotals,
        resume_index: usize,
    },
    /// The cursor is at or past the end of the fetched row set. Not
    /// completion: the sheet may still grow, so the checkpoint is kept.
    CaughtUp { resume_index: usize },
}

/// The per-cycle orchestrator. Borrows its collaborators; the supervisor
/// owns them across cycles.
pub struct DispatchLoop<'a> {
    transport: &'a dyn Transport,
    window: &'a SendWindow,
    checkpoint: &'a CheckpointStore,
    failures: &'a FailureLog,
    config: &'a DispatchConfig,
}

impl<'a> DispatchLoop<'a> {
    pub fn new(
        transport: &'a dyn Transport,
        window: &'a SendWindow,
        checkpoint: &'a CheckpointStore,
        failures: &'a FailureLog,
        config: &'a DispatchConfig,
    ) -> Self {
        Self {
            transport,
            window,
            checkpoint,
            failures,
            config,
        }
    }

    /// Process pending rows from the checkpoint forward.
    pub async fn run_cycle(&self, rows: &[Vec<String>]) -> Result<CycleOutcome> {
        let campaign = campaign_fingerprint(rows, self.config.header_rows);
        let start = self.start_index(&campaign);
        let total = rows.len();

        if start >= total {
            tracing::info!(
                "📭 Cursor at row {} but the sheet has {} rows — caught up, waiting for new rows",
                start + 1,
                total
            );
            return Ok(CycleOutcome::CaughtUp { resume_index: start });
        }

        let mut totals = CycleTotals::default();

        for i in start..total {
            let now = self.window.now();
            if !self.window.is_open_at(&now) {
                // Row i has not been attempted: persist i-1 so the next
                // cycle resumes at exactly this row.
                self.checkpoint.save(i as i64 - 1, &campaign)?;
                tracing::info!(
                    "🕐 Window limit reached ({}h). Progress saved at row {}; pausing until tomorrow",
                    self.window.end_hour(),
                    i + 1
                );
                return Ok(CycleOutcome::WindowClosed {
                    totals,
                    resume_index: i,
                });
            }

            let recipient = Recipient::from_row(&rows[i], &self.config.columns);
            if !recipient.is_sendable() {
                tracing::warn!(
                    "⚠️ Row {}: incomplete data (phone: {}, message: {}) — skipped",
                    i + 1,
                    if recipient.phone.is_empty() { "missing" } else { "ok" },
                    if recipient.message.is_empty() { "missing" } else { "ok" }
                );
                totals.skipped += 1;
                self.checkpoint.save(i as i64, &campaign)?;
                continue;
            }

            let phone = normalize_phone(&recipient.phone, &self.config.country_prefix);
            tracing::info!("📤 Row {}/{}: sending to {} ({})", i + 1, total, recipient.name, phone);

            match self.transport.send(&phone, &recipient.message).await {
                Ok(()) => {
                    totals.sent += 1;
                    tracing::info!("✅ Message sent to {} ({})", recipient.name, recipient.phone);
                }
                Err(e) => {
                    totals.failed += 1;
                    tracing::error!(
                        "❌ Send failed for {} ({}): {e}",
                        recipient.name,
                        recipient.phone
                    );
                    if let Err(log_err) =
                        self.failures
                            .record(&recipient.name, &recipient.phone, &e.to_string(), now)
                    {
                        tracing::warn!("⚠️ Could not record failure: {log_err}");
                    }
                }
            }

            self.checkpoint.save(i as i64, &campaign)?;

            if i + 1 < total {
                tracing::debug!(
                    "⏳ Waiting {}s before the next send",
                    self.config.message_delay_secs
                );
                tokio::time::sleep(std::time::Duration::from_secs(
                    self.config.message_delay_secs,
                ))
                .await;
            }
        }

        Ok(CycleOutcome::Completed(totals))
    }

    /// Resolve where this cycle starts: a checkpoint for the same campaign
    /// resumes; a checkpoint for a different row set is stale and ignored.
    fn start_index(&self, campaign: &str) -> usize {
        match self.checkpoint.load() {
            Some(cp) => {
                let same_campaign = cp.campaign.as_deref().is_none_or(|c| c == campaign);
                if same_campaign {
                    let idx = self.checkpoint.resume_index(Some(&cp));
                    tracing::info!("📍 Checkpoint found — continuing from row {}", idx + 1);
                    idx
                } else {
                    tracing::warn!(
                        "⚠️ Checkpoint belongs to a different row set; starting over from row {}",
                        self.checkpoint.default_start() + 1
                    );
                    self.checkpoint.default_start()
                }
            }
            None => {
                tracing::info!(
                    "📝 No checkpoint — starting from row {}",
                    self.checkpoint.default_start() + 1
                );
                self.checkpoint.default_start()
            }
        }
    }
}

/// Strip everything but digits and prepend the country prefix when absent.
pub fn normalize_phone(raw: &str, country_prefix: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.starts_with(country_prefix) {
        digits
    } else {
        format!("{country_prefix}{digits}")
    }
}

/// Identity of a campaign: the content of its first data row. Appending rows
/// keeps the fingerprint stable (the cursor stays valid); replacing the
/// sheet's contents changes it (the stale cursor is discarded).
pub fn campaign_fingerprint(rows: &[Vec<String>], header_rows: usize) -> String {
    let mut hasher = Sha256::new();
    if let Some(first) = rows.get(header_rows) {
        for field in first {
            hasher.update(field.as_bytes());
            hasher.update([0x1f]);
        }
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use zapdrip_core::config::WindowConfig;
    use zapdrip_core::error::ZapDripError;

    /// Transport stub: records every send, fails numbers on a blocklist.
    struct StubTransport {
        sends: Mutex<Vec<(String, String)>>,
        reject: Vec<String>,
    }

    impl StubTransport {
        fn new() -> Self {
            Self {
                sends: Mutex::new(Vec::new()),
                reject: Vec::new(),
            }
        }

        fn rejecting(phones: &[&str]) -> Self {
            Self {
                sends: Mutex::new(Vec::new()),
                reject: phones.iter().map(|s| s.to_string()).collect(),
            }
        }

        fn sent(&self) -> Vec<(String, String)> {
            self.sends.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for StubTransport {
        fn name(&self) -> &str {
            "stub"
        }

        async fn connect(&mut self) -> zapdrip_core::error::Result<()> {
            Ok(())
        }

        async fn send(&self, phone: &str, message: &str) -> zapdrip_core::error::Result<()> {
            self.sends
                .lock()
                .unwrap()
                .push((phone.to_string(), message.to_string()));
            if self.reject.iter().any(|r| r == phone) {
                return Err(ZapDripError::Channel("rejected by stub".into()));
            }
            Ok(())
        }
    }

    struct Fixture {
        dir: PathBuf,
        window: SendWindow,
        checkpoint: CheckpointStore,
        failures: FailureLog,
        config: DispatchConfig,
    }

    impl Fixture {
        /// Always-open window, zero inter-item delay, no header rows.
        fn new(name: &str) -> Self {
            Self::with_window(name, 0, 24)
        }

        fn with_window(name: &str, start_hour: u32, end_hour: u32) -> Self {
            let dir = std::env::temp_dir().join(format!("zapdrip-runner-{name}"));
            std::fs::remove_dir_all(&dir).ok();
            std::fs::create_dir_all(&dir).ok();
            let window = SendWindow::from_config(&WindowConfig {
                start_hour,
                end_hour,
                timezone: "America/Sao_Paulo".into(),
            })
            .unwrap();
            let config = DispatchConfig {
                message_delay_secs: 0,
                header_rows: 0,
                ..DispatchConfig::default()
            };
            Self {
                checkpoint: CheckpointStore::new(dir.join("progress.json"), config.header_rows),
                failures: FailureLog::new(dir.join("failures.csv")),
                window,
                config,
                dir,
            }
        }

        fn runner<'a>(&'a self, transport: &'a dyn Transport) -> DispatchLoop<'a> {
            DispatchLoop::new(transport, &self.window, &self.checkpoint, &self.failures, &self.config)
        }

        fn failure_lines(&self) -> usize {
            std::fs::read_to_string(self.dir.join("failures.csv"))
                .map(|c| c.lines().count().saturating_sub(1))
                .unwrap_or(0)
        }
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            std::fs::remove_dir_all(&self.dir).ok();
        }
    }

    fn row(name: &str, phone: &str, message: &str) -> Vec<String> {
        vec![
            String::new(),
            String::new(),
            name.to_string(),
            phone.to_string(),
            message.to_string(),
        ]
    }

    #[test]
    fn test_normalize_phone() {
        assert_eq!(normalize_phone("(11) 99999-0000", "55"), "5511999990000");
        assert_eq!(normalize_phone("5511999990000", "55"), "5511999990000");
        assert_eq!(normalize_phone("+55 11 98888-7777", "55"), "5511988887777");
        assert_eq!(normalize_phone("912 345 678", "351"), "351912345678");
    }

    #[test]
    fn test_fingerprint_stable_under_append() {
        let mut rows = vec![row("Ana", "5511999990000", "Olá")];
        let before = campaign_fingerprint(&rows, 0);
        rows.push(row("Bea", "5511988887777", "Oi"));
        assert_eq!(before, campaign_fingerprint(&rows, 0));
    }

    #[test]
    fn test_fingerprint_changes_when_replaced() {
        let old = vec![row("Ana", "5511999990000", "Olá")];
        let new = vec![row("Carla", "5511977776666", "Bom dia")];
        assert_ne!(campaign_fingerprint(&old, 0), campaign_fingerprint(&new, 0));
    }

    // Incomplete rows are skipped, the valid row is attempted, and the
    // cycle completes.
    #[tokio::test]
    async fn test_example_scenario_skip_send_skip() {
        let fx = Fixture::new("example");
        let transport = StubTransport::new();
        let rows = vec![
            row("", "", ""),
            row("Ana", "5511999990000", "Olá"),
            row("Bea", "", "Oi"),
        ];

        let outcome = fx.runner(&transport).run_cycle(&rows).await.unwrap();
        match outcome {
            CycleOutcome::Completed(t) => {
                assert_eq!(t, CycleTotals { sent: 1, failed: 0, skipped: 2 });
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(transport.sent(), vec![("5511999990000".into(), "Olá".into())]);
        assert_eq!(fx.failure_lines(), 0);
    }

    #[tokio::test]
    async fn test_resume_from_checkpoint_is_idempotent() {
        let fx = Fixture::new("resume");
        let rows = vec![
            row("Ana", "5511900000001", "m1"),
            row("Bea", "5511900000002", "m2"),
            row("Caio", "5511900000003", "m3"),
        ];
        // Rows 0 and 1 already processed in a previous run.
        fx.checkpoint
            .save(1, &campaign_fingerprint(&rows, 0))
            .unwrap();

        let transport = StubTransport::new();
        fx.runner(&transport).run_cycle(&rows).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].0, "5511900000003");
    }

    #[tokio::test]
    async fn test_stale_campaign_checkpoint_restarts() {
        let fx = Fixture::new("stale");
        let rows = vec![
            row("Ana", "5511900000001", "m1"),
            row("Bea", "5511900000002", "m2"),
        ];
        fx.checkpoint.save(1, "fingerprint-of-a-finished-campaign").unwrap();

        let transport = StubTransport::new();
        let outcome = fx.runner(&transport).run_cycle(&rows).await.unwrap();

        assert!(matches!(outcome, CycleOutcome::Completed(_)));
        assert_eq!(transport.sent().len(), 2);
    }

    #[tokio::test]
    async fn test_send_failure_records_exactly_one_entry() {
        let fx = Fixture::new("failure");
        let transport = StubTransport::rejecting(&["5511900000002"]);
        let rows = vec![
            row("Ana", "5511900000001", "m1"),
            row("Bea", "5511900000002", "m2"),
            row("Caio", "5511900000003", "m3"),
        ];

        let outcome = fx.runner(&transport).run_cycle(&rows).await.unwrap();
        match outcome {
            CycleOutcome::Completed(t) => {
                assert_eq!(t.sent, 2);
                assert_eq!(t.failed, 1);
                assert_eq!(t.skipped, 0);
            }
            other => panic!("expected Completed, got {other:?}"),
        }
        assert_eq!(fx.failure_lines(), 1);
        // The loop pressed on past the failure.
        assert_eq!(transport.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_closed_window_persists_unprocessed_row_as_resume_point() {
        // [8, 8) is empty, so the gate is closed no matter when this runs.
        let fx = Fixture::with_window("closed", 8, 8);
        let transport = StubTransport::new();
        let rows = vec![
            row("Ana", "5511900000001", "m1"),
            row("Bea", "5511900000002", "m2"),
        ];

        let outcome = fx.runner(&transport).run_cycle(&rows).await.unwrap();
        match outcome {
            CycleOutcome::WindowClosed { totals, resume_index } => {
                assert_eq!(resume_index, 0);
                assert_eq!(totals, CycleTotals::default());
            }
            other => panic!("expected WindowClosed, got {other:?}"),
        }
        assert!(transport.sent().is_empty());
        // Row 0 was never attempted, so the saved cursor points before it.
        let cp = fx.checkpoint.load().unwrap();
        assert_eq!(cp.last_processed_index, -1);
        assert_eq!(fx.checkpoint.resume_index(Some(&cp)), 0);
    }

    #[tokio::test]
    async fn test_cursor_past_row_set_is_caught_up_not_complete() {
        let fx = Fixture::new("caught-up");
        let rows = vec![row("Ana", "5511900000001", "m1")];
        fx.checkpoint
            .save(0, &campaign_fingerprint(&rows, 0))
            .unwrap();

        let transport = StubTransport::new();
        let outcome = fx.runner(&transport).run_cycle(&rows).await.unwrap();
        match outcome {
            CycleOutcome::CaughtUp { resume_index } => assert_eq!(resume_index, 1),
            other => panic!("expected CaughtUp, got {other:?}"),
        }
        // Caught up is not completion: the checkpoint survives.
        assert!(fx.checkpoint.load().is_some());
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_monotonic_checkpoint_through_cycle() {
        let fx = Fixture::new("monotonic");
        let transport = StubTransport::new();
        let rows = vec![
            row("Ana", "5511900000001", "m1"),
            row("", "", ""),
            row("Caio", "5511900000003", "m3"),
        ];

        fx.runner(&transport).run_cycle(&rows).await.unwrap();

        // After the cycle the cursor sits on the last row, ready to be
        // cleared by the supervisor.
        let cp = fx.checkpoint.load().unwrap();
        assert_eq!(cp.last_processed_index, 2);
    }
}
