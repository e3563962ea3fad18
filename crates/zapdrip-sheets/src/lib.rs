//! Google Sheets row source — reads the campaign sheet via the
//! `spreadsheets.values.get` endpoint with an API key.
//!
//! This is a thin read boundary: no caching, no writes, no token lifecycle.
//! The supervisor re-fetches the full range every cycle, so the row set seen
//! by the dispatch loop is always the sheet's current state.

use async_trait::async_trait;
use serde::Deserialize;
use zapdrip_core::config::SheetConfig;
use zapdrip_core::error::{Result, ZapDripError};
use zapdrip_core::traits::RowSource;

/// Google Sheets `values.get` boundary.
pub struct GoogleSheetsSource {
    config: SheetConfig,
    client: reqwest::Client,
}

impl GoogleSheetsSource {
    pub fn new(config: SheetConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn values_url(&self) -> String {
        format!(
            "https://sheets.googleapis.com/v4/spreadsheets/{}/values/{}",
            self.config.spreadsheet_id, self.config.range
        )
    }
}

#[async_trait]
impl RowSource for GoogleSheetsSource {
    async fn fetch_rows(&self) -> Result<Vec<Vec<String>>> {
        if self.config.spreadsheet_id.is_empty() {
            return Err(ZapDripError::Config(
                "Sheets spreadsheet_id not configured".into(),
            ));
        }

        let response = self
            .client
            .get(self.values_url())
            .query(&[
                ("key", self.config.api_key.as_str()),
                ("majorDimension", "ROWS"),
            ])
            .send()
            .await
            .map_err(|e| ZapDripError::Fetch(format!("Sheets request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ZapDripError::Fetch(format!(
                "Sheets API error {status}: {body}"
            )));
        }

        let range: ValueRange = response
            .json()
            .await
            .map_err(|e| ZapDripError::Fetch(format!("Invalid Sheets response: {e}")))?;

        tracing::debug!(
            "📊 Fetched {} rows from range '{}'",
            range.values.len(),
            range.range.as_deref().unwrap_or(&self.config.range)
        );
        Ok(range.values)
    }
}

// --- Sheets API types ---

/// Subset of the `values.get` response we care about. `values` is absent
/// when the range is empty.
#[derive(Debug, Deserialize)]
struct ValueRange {
    range: Option<String>,
    #[serde(default)]
    values: Vec<Vec<String>>,
}
