pub mod client;
pub mod credentials;
pub mod error;
pub mod google;
pub mod rate_limiter;
pub mod reconciler;
pub mod taxonomy_sync;

#[cfg(test)]
pub mod fake;

pub use client::{RangeRows, RateLimitConfig, Rows, SheetMetadata, TabularClient};
pub use credentials::{CredentialStore, SHEETS_TOKEN_KEY};
pub use error::SheetsError;
pub use google::GoogleSheetsClient;
pub use rate_limiter::RateLimiter;
pub use reconciler::{LedgerReconciler, PushSummary};
pub use taxonomy_sync::TaxonomySync;
