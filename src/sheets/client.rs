use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::SheetsError;

/// Configuration for rate limiting remote calls.
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub requests_per_second: u32,
    pub burst_size: u32,
}

/// Spreadsheet-level metadata: which tabs exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SheetMetadata {
    pub tabs: Vec<String>,
}

impl SheetMetadata {
    pub fn has_tab(&self, name: &str) -> bool {
        self.tabs.iter().any(|t| t == name)
    }
}

/// A block of cell values, rows of strings. The transport may omit empty
/// trailing cells, so rows are not guaranteed to be of equal width.
pub type Rows = Vec<Vec<String>>;

/// One `(range, rows)` pair of a batched value update.
pub type RangeRows = (String, Rows);

/// Opaque remote tabular collaborator. The production implementation
/// speaks the Google Sheets v4 REST API; tests use an in-memory fake.
#[async_trait]
pub trait TabularClient: Send + Sync {
    /// Fetch tab names. A missing spreadsheet surfaces
    /// `SheetsError::SpreadsheetNotFound`.
    async fn get_sheet_metadata(&self, spreadsheet_id: &str) -> Result<SheetMetadata, SheetsError>;

    /// Create a named tab.
    async fn create_tab(&self, spreadsheet_id: &str, name: &str) -> Result<(), SheetsError>;

    /// Read all values of a range.
    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<Rows, SheetsError>;

    /// Clear all values of a range.
    async fn clear_values(&self, spreadsheet_id: &str, range: &str) -> Result<(), SheetsError>;

    /// Overwrite a range with the given rows.
    async fn update_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), SheetsError>;

    /// Overwrite several ranges in one call.
    async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        data: Vec<RangeRows>,
    ) -> Result<(), SheetsError>;

    /// Append rows after the last non-empty row of the ranged table,
    /// letting the remote side find the insertion position.
    async fn append_values(
        &self,
        spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), SheetsError>;
}
