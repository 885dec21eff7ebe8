//! WDO trading journal core: a deduplicated local trade ledger with
//! derived metrics, CSV interchange, and idempotent reconciliation against
//! a Google Sheets mirror.

pub mod csv_codec;
pub mod insight;
pub mod journal;
pub mod ledger;
pub mod metrics;
pub mod models;
pub mod numeric;
pub mod persist;
pub mod sheets;
pub mod stats;
pub mod sync;

pub use insight::{GeminiClient, InsightGenerator};
pub use journal::{ImportReport, Journal, JournalError};
pub use ledger::Ledger;
pub use metrics::{compute_metrics, TradeMetrics, POINT_VALUE};
pub use models::{
    MirrorConfig, ResultSign, Side, TagKind, TagTaxonomy, Trade, TradeFilters, TradeForm,
    ValidationError,
};
pub use numeric::parse_number;
pub use persist::{KeyValueStore, MemoryStore, SqliteStore};
pub use sheets::{GoogleSheetsClient, SheetsError, TabularClient};
pub use stats::{DashboardStats, EquityCurvePoint};
