pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use log::warn;
use thiserror::Error;

use crate::ledger::Ledger;
use crate::models::TagTaxonomy;

/// Key under which the ledger blob (JSON array of trades) is stored.
pub const LEDGER_KEY: &str = "trades";
/// Key under which the taxonomy blob (JSON object of three arrays) is stored.
pub const TAXONOMY_KEY: &str = "regOptions";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        StorageError::Database(err.to_string())
    }
}

/// Opaque key-value persistence collaborator. Values are opaque string
/// blobs; schema knowledge lives in the load/save helpers below.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

/// Load the ledger blob. A missing or malformed blob falls back to the
/// empty default; corruption is logged, never surfaced.
pub fn load_ledger(store: &dyn KeyValueStore) -> Result<Ledger, StorageError> {
    match store.get(LEDGER_KEY)? {
        Some(blob) => Ok(serde_json::from_str(&blob).unwrap_or_else(|e| {
            warn!("malformed ledger blob, starting empty: {}", e);
            Ledger::default()
        })),
        None => Ok(Ledger::default()),
    }
}

pub fn save_ledger(store: &dyn KeyValueStore, ledger: &Ledger) -> Result<(), StorageError> {
    let blob = serde_json::to_string(ledger)?;
    store.set(LEDGER_KEY, &blob)
}

/// Load the taxonomy blob, falling back to the stock defaults on a missing
/// or malformed value.
pub fn load_taxonomy(store: &dyn KeyValueStore) -> Result<TagTaxonomy, StorageError> {
    match store.get(TAXONOMY_KEY)? {
        Some(blob) => Ok(serde_json::from_str(&blob).unwrap_or_else(|e| {
            warn!("malformed taxonomy blob, using defaults: {}", e);
            TagTaxonomy::default()
        })),
        None => Ok(TagTaxonomy::default()),
    }
}

pub fn save_taxonomy(store: &dyn KeyValueStore, taxonomy: &TagTaxonomy) -> Result<(), StorageError> {
    let blob = serde_json::to_string(taxonomy)?;
    store.set(TAXONOMY_KEY, &blob)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Side, Trade};

    fn sample_trade() -> Trade {
        Trade {
            id: 1710000000000,
            trade_number: 1,
            asset: "WDOFUT".to_string(),
            side: Side::Buy,
            date: "2024-03-11".to_string(),
            lots: 1.0,
            entry_price: 5400.0,
            exit_price: 5410.0,
            points: 10.0,
            result: 100.0,
            notes: String::new(),
            region: String::new(),
            structure: String::new(),
            trigger: String::new(),
        }
    }

    #[test]
    fn ledger_roundtrips_through_store() {
        let store = MemoryStore::new();
        let mut ledger = Ledger::default();
        ledger.add(sample_trade());

        save_ledger(&store, &ledger).unwrap();
        let loaded = load_ledger(&store).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded.trades()[0].id, 1710000000000);
    }

    #[test]
    fn ledger_blob_is_a_json_array() {
        let store = MemoryStore::new();
        let mut ledger = Ledger::default();
        ledger.add(sample_trade());
        save_ledger(&store, &ledger).unwrap();

        let blob = store.get(LEDGER_KEY).unwrap().unwrap();
        assert!(blob.starts_with('['));
    }

    #[test]
    fn malformed_blobs_fall_back_to_defaults() {
        let store = MemoryStore::new();
        store.set(LEDGER_KEY, "{not json").unwrap();
        store.set(TAXONOMY_KEY, "[1,2,3]").unwrap();

        assert!(load_ledger(&store).unwrap().is_empty());
        let taxonomy = load_taxonomy(&store).unwrap();
        assert_eq!(taxonomy, TagTaxonomy::default());
    }

    #[test]
    fn absent_keys_yield_defaults() {
        let store = MemoryStore::new();
        assert!(load_ledger(&store).unwrap().is_empty());
        assert!(!load_taxonomy(&store).unwrap().regions.is_empty());
    }
}
