//! Domain records.

use crate::config::ColumnMap;

/// One addressable unit of work: a recipient and their message, extracted
/// from a positional sheet row. Fields are trimmed; anything missing (short
/// row, empty cell) comes through as an empty string and is judged by the
/// dispatch loop's validation step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recipient {
    pub name: String,
    pub phone: String,
    pub message: String,
}

impl Recipient {
    /// Extract a recipient from a raw row using the configured column map.
    pub fn from_row(row: &[String], columns: &ColumnMap) -> Self {
        let field = |idx: usize| -> String {
            row.get(idx).map(|s| s.trim().to_string()).unwrap_or_default()
        };
        Self {
            name: field(columns.name),
            phone: field(columns.phone),
            message: field(columns.message),
        }
    }

    /// A row is sendable iff it has both a phone and a message. Rows failing
    /// this are skipped, not failed.
    pub fn is_sendable(&self) -> bool {
        !self.phone.is_empty() && !self.message.is_empty()
    }
}
