//! # ZapDrip Dispatch
//!
//! The resumable, time-windowed dispatch loop — the part of the system with
//! real invariants:
//!
//! - exactly-once-per-row *intent*: a row is attempted once per campaign,
//!   with the cursor persisted after every outcome so a crash loses at most
//!   the in-flight row;
//! - monotonic cursor advancement until the campaign completes and the
//!   checkpoint is cleared;
//! - window gating re-checked before *every* row, so a batch stops exactly at
//!   the window edge and resumes at the same row the next day.
//!
//! ## Architecture
//! ```text
//! Supervisor (state machine)
//!   ├── WaitingForWindow → SendWindow::wait_until_open
//!   ├── Fetching         → RowSource::fetch_rows (full re-fetch each cycle)
//!   ├── Dispatching      → DispatchLoop::run_cycle
//!   │                        ├── CheckpointStore (atomic JSON cursor)
//!   │                        └── FailureLog (append-only CSV)
//!   └── Done             → checkpoint cleared, summary returned
//! ```

pub mod checkpoint;
pub mod failures;
pub mod runner;
pub mod supervisor;
pub mod window;

pub use checkpoint::{Checkpoint, CheckpointStore};
pub use failures::FailureLog;
pub use runner::{normalize_phone, CycleOutcome, CycleTotals, DispatchLoop};
pub use supervisor::{CampaignSummary, Supervisor, SupervisorState};
pub use window::SendWindow;
