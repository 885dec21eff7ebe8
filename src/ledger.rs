use serde::{Deserialize, Serialize};

use crate::models::{Trade, TradeFilters};

/// The ordered collection of trade records, single source of truth for the
/// local session. Insertion order is the order CSV export and mirror
/// reconciliation see; the display view is sorted separately.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ledger {
    trades: Vec<Trade>,
}

impl Ledger {
    pub fn from_trades(trades: Vec<Trade>) -> Self {
        Self { trades }
    }

    /// Trades in ledger (insertion) order.
    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    pub fn get(&self, id: i64) -> Option<&Trade> {
        self.trades.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.get(id).is_some()
    }

    /// Next identity: clock-derived, clamped to stay strictly above every
    /// existing id so rapid successive creations never collide.
    pub fn allocate_id(&self, clock_millis: i64) -> i64 {
        let floor = self.trades.iter().map(|t| t.id).max().unwrap_or(0);
        clock_millis.max(floor + 1)
    }

    /// Dense per-ledger sequence number: max existing + 1, or 1 if empty.
    pub fn next_trade_number(&self) -> u32 {
        self.trades.iter().map(|t| t.trade_number).max().unwrap_or(0) + 1
    }

    /// Append a trade. The caller guarantees the id is fresh (identity
    /// generation happens through `allocate_id`); this is not re-checked.
    pub fn add(&mut self, trade: Trade) {
        self.trades.push(trade);
    }

    /// Replace the record with a matching id, preserving its identity and
    /// trade number. Silent no-op when the id is absent; callers validate
    /// existence beforehand via `get`.
    pub fn update(&mut self, id: i64, mut updated: Trade) {
        if let Some(existing) = self.trades.iter_mut().find(|t| t.id == id) {
            updated.id = existing.id;
            updated.trade_number = existing.trade_number;
            *existing = updated;
        }
    }

    /// Delete the record with a matching id. Removal is local-only: the
    /// mirror keeps its row as an audit trail.
    pub fn remove(&mut self, id: i64) -> bool {
        let before = self.trades.len();
        self.trades.retain(|t| t.id != id);
        self.trades.len() != before
    }

    /// Display view: filtered, sorted by descending date. ISO dates sort
    /// lexicographically, ties fall back to newest id first.
    pub fn list(&self, filters: &TradeFilters) -> Vec<Trade> {
        let mut view: Vec<Trade> = self
            .trades
            .iter()
            .filter(|t| filters.matches(t))
            .cloned()
            .collect();
        view.sort_by(|a, b| b.date.cmp(&a.date).then(b.id.cmp(&a.id)));
        view
    }

    /// Merge decoded trades from a CSV import: ids already present are
    /// dropped (re-importing a file is a no-op after the first pass),
    /// survivors are appended and the whole ledger is re-sorted by
    /// ascending id. Imported trade numbers are preserved as-is.
    pub fn merge_imported(&mut self, incoming: Vec<Trade>) -> usize {
        let mut added = 0;
        for trade in incoming {
            if self.contains(trade.id) {
                continue;
            }
            self.trades.push(trade);
            added += 1;
        }
        if added > 0 {
            self.trades.sort_by_key(|t| t.id);
        }
        added
    }
}
