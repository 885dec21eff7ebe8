use thiserror::Error;

#[derive(Error, Debug)]
pub enum SheetsError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The spreadsheet itself is missing. Distinct from a missing tab,
    /// which the reconciler creates on the fly.
    #[error("spreadsheet not found: {0}")]
    SpreadsheetNotFound(String),

    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("invalid API response: {0}")]
    Parse(String),

    #[error("Sheets API error: {code} - {message}")]
    Api { code: u16, message: String },

    #[error("credential store error: {0}")]
    Encryption(String),
}

impl From<serde_json::Error> for SheetsError {
    fn from(err: serde_json::Error) -> Self {
        SheetsError::Parse(err.to_string())
    }
}

impl From<aes_gcm::Error> for SheetsError {
    fn from(err: aes_gcm::Error) -> Self {
        SheetsError::Encryption(err.to_string())
    }
}
