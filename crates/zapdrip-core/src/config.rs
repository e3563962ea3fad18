//! ZapDrip configuration system.
//!
//! Every operational constant lives here: the spreadsheet coordinates, the
//! WhatsApp credentials, the daily send window, pacing, the positional
//! column mapping, and the on-disk state paths. The config is an immutable
//! value handed to the supervisor at construction.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, ZapDripError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ZapDripConfig {
    #[serde(default)]
    pub sheet: SheetConfig,
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

impl ZapDripConfig {
    /// Load config from the default path (~/.zapdrip/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ZapDripError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| ZapDripError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the dispatcher cannot run with.
    pub fn validate(&self) -> Result<()> {
        let w = &self.window;
        if w.start_hour > 23 || w.end_hour > 24 || w.start_hour >= w.end_hour {
            return Err(ZapDripError::Config(format!(
                "Invalid send window [{}, {}): need start_hour <= 23, end_hour <= 24, start < end",
                w.start_hour, w.end_hour
            )));
        }
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the ZapDrip home directory (~/.zapdrip).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".zapdrip")
    }
}

/// Google Sheets read boundary configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetConfig {
    /// Spreadsheet ID (the long token in the sheet URL).
    #[serde(default)]
    pub spreadsheet_id: String,
    /// A1-notation range to read each cycle.
    #[serde(default = "default_range")]
    pub range: String,
    /// Sheets API key with read access.
    #[serde(default)]
    pub api_key: String,
}

fn default_range() -> String { "Robozinho!A1:E10000".into() }

impl Default for SheetConfig {
    fn default() -> Self {
        Self {
            spreadsheet_id: String::new(),
            range: default_range(),
            api_key: String::new(),
        }
    }
}

/// WhatsApp Business Cloud API configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhatsAppConfig {
    /// Facebook Graph API access token.
    #[serde(default)]
    pub access_token: String,
    /// WhatsApp Phone Number ID.
    #[serde(default)]
    pub phone_number_id: String,
    /// Upper bound on a single send attempt, in seconds.
    #[serde(default = "default_send_timeout")]
    pub send_timeout_secs: u64,
}

fn default_send_timeout() -> u64 { 60 }

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            phone_number_id: String::new(),
            send_timeout_secs: default_send_timeout(),
        }
    }
}

/// Daily send window, in a named reference timezone.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// First hour (inclusive) sends are allowed.
    #[serde(default = "default_start_hour")]
    pub start_hour: u32,
    /// Hour (exclusive) sends stop.
    #[serde(default = "default_end_hour")]
    pub end_hour: u32,
    /// IANA timezone name the window is evaluated in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
}

fn default_start_hour() -> u32 { 8 }
fn default_end_hour() -> u32 { 22 }
fn default_timezone() -> String { "America/Sao_Paulo".into() }

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            start_hour: default_start_hour(),
            end_hour: default_end_hour(),
            timezone: default_timezone(),
        }
    }
}

/// Dispatch loop pacing and row-set shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// Seconds to wait between consecutive sends.
    #[serde(default = "default_message_delay")]
    pub message_delay_secs: u64,
    /// Country prefix prepended to numbers that lack it.
    #[serde(default = "default_country_prefix")]
    pub country_prefix: String,
    /// Rows at the top of the sheet that are headers, not recipients.
    /// Doubles as the default start index when no checkpoint exists.
    #[serde(default = "default_header_rows")]
    pub header_rows: usize,
    /// In-window wait between fetches when the sheet has no pending rows.
    #[serde(default = "default_idle_poll")]
    pub idle_poll_secs: u64,
    /// Which column holds which field.
    #[serde(default)]
    pub columns: ColumnMap,
}

fn default_message_delay() -> u64 { 20 }
fn default_country_prefix() -> String { "55".into() }
fn default_header_rows() -> usize { 5 }
fn default_idle_poll() -> u64 { 300 }

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            message_delay_secs: default_message_delay(),
            country_prefix: default_country_prefix(),
            header_rows: default_header_rows(),
            idle_poll_secs: default_idle_poll(),
            columns: ColumnMap::default(),
        }
    }
}

/// Positional column → field mapping. The only place the "column N means
/// field F" convention exists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnMap {
    #[serde(default = "default_name_col")]
    pub name: usize,
    #[serde(default = "default_phone_col")]
    pub phone: usize,
    #[serde(default = "default_message_col")]
    pub message: usize,
}

fn default_name_col() -> usize { 2 }
fn default_phone_col() -> usize { 3 }
fn default_message_col() -> usize { 4 }

impl Default for ColumnMap {
    fn default() -> Self {
        Self {
            name: default_name_col(),
            phone: default_phone_col(),
            message: default_message_col(),
        }
    }
}

/// On-disk state paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Checkpoint file (single JSON record, overwritten wholesale).
    #[serde(default = "default_checkpoint_file")]
    pub checkpoint_file: PathBuf,
    /// Append-only failure log.
    #[serde(default = "default_failure_log")]
    pub failure_log: PathBuf,
}

fn default_checkpoint_file() -> PathBuf { ZapDripConfig::home_dir().join("progress.json") }
fn default_failure_log() -> PathBuf { ZapDripConfig::home_dir().join("failures.csv") }

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            checkpoint_file: default_checkpoint_file(),
            failure_log: default_failure_log(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ZapDripConfig::default();
        assert_eq!(config.window.start_hour, 8);
        assert_eq!(config.window.end_hour, 22);
        assert_eq!(config.window.timezone, "America/Sao_Paulo");
        assert_eq!(config.dispatch.message_delay_secs, 20);
        assert_eq!(config.dispatch.country_prefix, "55");
        assert_eq!(config.dispatch.header_rows, 5);
        assert_eq!(config.dispatch.columns.phone, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_from_toml() {
        let toml_str = r#"
            [sheet]
            spreadsheet_id = "1PEr-cjNy99QtJWnVAPPwR43NkAesHXQLZSF0QukcLW4"
            api_key = "test-key"

            [window]
            start_hour = 9
            end_hour = 18
            timezone = "America/Bahia"

            [dispatch]
            message_delay_secs = 5
            country_prefix = "351"
        "#;

        let config: ZapDripConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.sheet.spreadsheet_id, "1PEr-cjNy99QtJWnVAPPwR43NkAesHXQLZSF0QukcLW4");
        assert_eq!(config.window.start_hour, 9);
        assert_eq!(config.window.end_hour, 18);
        assert_eq!(config.dispatch.country_prefix, "351");
        // Untouched sections keep defaults
        assert_eq!(config.dispatch.header_rows, 5);
        assert_eq!(config.sheet.range, "Robozinho!A1:E10000");
    }

    #[test]
    fn test_config_missing_fields_use_defaults() {
        let config: ZapDripConfig = toml::from_str("").unwrap();
        assert_eq!(config.window.start_hour, 8);
        assert_eq!(config.whatsapp.send_timeout_secs, 60);
    }

    #[test]
    fn test_invalid_window_rejected() {
        let config: ZapDripConfig = toml::from_str(
            "[window]\nstart_hour = 22\nend_hour = 8\n",
        )
        .unwrap();
        assert!(config.validate().is_err());

        let config: ZapDripConfig = toml::from_str(
            "[window]\nstart_hour = 25\nend_hour = 26\n",
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_home_dir() {
        let home = ZapDripConfig::home_dir();
        assert!(home.to_string_lossy().contains("zapdrip"));
    }
}
