use serde::{Deserialize, Serialize};

/// Where the spreadsheet mirror lives. The two tab names default to the
/// ones the companion sheet template ships with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MirrorConfig {
    pub spreadsheet_id: String,
    pub ledger_tab: String,
    pub taxonomy_tab: String,
}

impl MirrorConfig {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            ledger_tab: "Trades".to_string(),
            taxonomy_tab: "Opcoes".to_string(),
        }
    }
}
