//! Daily send window in a named reference timezone.
//!
//! The window is `[start_hour, end_hour)` evaluated against wall-clock time
//! in the configured IANA zone. The gate is pure computation over an
//! explicit `now`; only `wait_until_open` touches the clock and the runtime,
//! and it is the single long-duration suspension point in the system — an
//! await under the caller's `tokio::select!`, so cancellation interrupts it
//! with no row in flight and no checkpoint at risk.

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use zapdrip_core::config::WindowConfig;
use zapdrip_core::error::{Result, ZapDripError};

/// The `[start_hour, end_hour)` daily gate.
#[derive(Debug, Clone)]
pub struct SendWindow {
    start_hour: u32,
    end_hour: u32,
    tz: Tz,
}

impl SendWindow {
    pub fn from_config(config: &WindowConfig) -> Result<Self> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|_| ZapDripError::Config(format!("Unknown timezone '{}'", config.timezone)))?;
        Ok(Self {
            start_hour: config.start_hour,
            end_hour: config.end_hour,
            tz,
        })
    }

    pub fn start_hour(&self) -> u32 {
        self.start_hour
    }

    pub fn end_hour(&self) -> u32 {
        self.end_hour
    }

    /// Current instant in the reference zone.
    pub fn now(&self) -> DateTime<Tz> {
        Utc::now().with_timezone(&self.tz)
    }

    pub fn is_open_at(&self, now: &DateTime<Tz>) -> bool {
        let hour = now.hour();
        self.start_hour <= hour && hour < self.end_hour
    }

    pub fn is_open(&self) -> bool {
        self.is_open_at(&self.now())
    }

    /// The next instant the window opens: `start_hour` of the next calendar
    /// day once past `end_hour`, otherwise `start_hour` of the current day
    /// (already in the past when the window is open — callers clamp the wait
    /// to zero).
    pub fn next_open_after(&self, now: &DateTime<Tz>) -> DateTime<Tz> {
        let date = if now.hour() >= self.end_hour {
            now.date_naive() + Duration::days(1)
        } else {
            now.date_naive()
        };
        // A DST gap can swallow the opening instant; the following day's is
        // used instead.
        self.opening_on(date)
            .or_else(|| self.opening_on(date + Duration::days(1)))
            .unwrap_or(*now)
    }

    fn opening_on(&self, date: NaiveDate) -> Option<DateTime<Tz>> {
        let naive = date.and_hms_opt(self.start_hour, 0, 0)?;
        self.tz.from_local_datetime(&naive).earliest()
    }

    /// Block until the window is open. No-op when already open.
    pub async fn wait_until_open(&self) {
        let now = self.now();
        if self.is_open_at(&now) {
            return;
        }
        let target = self.next_open_after(&now);
        let wait = (target - now).to_std().unwrap_or_default();
        let total_mins = wait.as_secs() / 60;
        tracing::info!(
            "⏰ Outside the send window ({}h–{}h). Sleeping until {} (~{}h{:02}m)",
            self.start_hour,
            self.end_hour,
            target.format("%d/%m/%Y %H:%M"),
            total_mins / 60,
            total_mins % 60
        );
        tokio::time::sleep(wait).await;
    }
}
