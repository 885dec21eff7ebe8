use std::collections::HashMap;

use log::{debug, info};
use uuid::Uuid;

use crate::csv_codec::{trade_to_row, HEADER_LABELS};
use crate::models::{MirrorConfig, Trade};

use super::client::{RangeRows, Rows, TabularClient};
use super::error::SheetsError;

/// Outcome of one reconciliation pass, mostly for logging and tests:
/// a second pass with no intervening local change reports zero appends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PushSummary {
    pub updated: usize,
    pub appended: usize,
    pub header_rewritten: bool,
}

/// Diffs the ledger against the remote tab and issues the minimal set of
/// update/append calls to converge it. Never deletes remote rows: trades
/// removed locally stay on the sheet as an audit trail.
pub struct LedgerReconciler<'a> {
    client: &'a dyn TabularClient,
    config: &'a MirrorConfig,
}

impl<'a> LedgerReconciler<'a> {
    pub fn new(client: &'a dyn TabularClient, config: &'a MirrorConfig) -> Self {
        Self { client, config }
    }

    /// One full reconciliation pass. Idempotent: re-running with no local
    /// changes rewrites identical rows and appends nothing, so any failure
    /// is safe to retry by running the pass again.
    pub async fn push(&self, trades: &[Trade]) -> Result<PushSummary, SheetsError> {
        let pass_id = Uuid::new_v4();
        info!(
            "mirror pass {}: reconciling {} trades against tab '{}'",
            pass_id,
            trades.len(),
            self.config.ledger_tab
        );

        self.ensure_tab().await?;

        let remote = self
            .client
            .get_values(&self.config.spreadsheet_id, &self.full_range())
            .await?;

        let header_ok = remote.first().map(|r| header_matches(r)).unwrap_or(false);

        // Without a valid header the remote rows cannot be trusted as a
        // table; treat them as absent and force a full rewrite.
        let index = if header_ok {
            identity_index(&remote)
        } else {
            HashMap::new()
        };

        if !header_ok {
            debug!("mirror pass {}: header invalid or missing, rewriting", pass_id);
            self.client
                .update_values(
                    &self.config.spreadsheet_id,
                    &self.header_range(),
                    vec![HEADER_LABELS.iter().map(|l| l.to_string()).collect()],
                )
                .await?;
        }

        let mut updates: Vec<RangeRows> = Vec::new();
        let mut appends: Rows = Vec::new();
        for trade in trades {
            match index.get(trade.id.to_string().as_str()) {
                Some(row) => updates.push((self.row_range(*row), vec![trade_to_row(trade)])),
                None => appends.push(trade_to_row(trade)),
            }
        }

        let summary = PushSummary {
            updated: updates.len(),
            appended: appends.len(),
            header_rewritten: !header_ok,
        };

        if !updates.is_empty() {
            self.client
                .batch_update_values(&self.config.spreadsheet_id, updates)
                .await?;
        }
        if !appends.is_empty() {
            self.client
                .append_values(&self.config.spreadsheet_id, &self.full_range(), appends)
                .await?;
        }

        info!(
            "mirror pass {}: {} updated, {} appended",
            pass_id, summary.updated, summary.appended
        );
        Ok(summary)
    }

    /// Make sure the ledger tab exists. A missing spreadsheet is fatal and
    /// surfaces as `SpreadsheetNotFound` from the metadata call; a missing
    /// tab is simply created.
    async fn ensure_tab(&self) -> Result<(), SheetsError> {
        let meta = self
            .client
            .get_sheet_metadata(&self.config.spreadsheet_id)
            .await?;
        if !meta.has_tab(&self.config.ledger_tab) {
            info!("creating missing mirror tab '{}'", self.config.ledger_tab);
            self.client
                .create_tab(&self.config.spreadsheet_id, &self.config.ledger_tab)
                .await?;
        }
        Ok(())
    }

    fn full_range(&self) -> String {
        format!("'{}'!A1:{}", self.config.ledger_tab, last_column())
    }

    fn header_range(&self) -> String {
        format!("'{}'!A1:{}1", self.config.ledger_tab, last_column())
    }

    fn row_range(&self, row: usize) -> String {
        let col = last_column();
        format!("'{}'!A{}:{}{}", self.config.ledger_tab, row, col, row)
    }
}

fn last_column() -> char {
    (b'A' + (HEADER_LABELS.len() as u8) - 1) as char
}

/// Exact column-for-column header comparison.
fn header_matches(row: &[String]) -> bool {
    row.len() == HEADER_LABELS.len()
        && row.iter().zip(HEADER_LABELS.iter()).all(|(a, b)| a.trim() == *b)
}

/// Map each remote data row's first column (the trade id as a string) to
/// its 1-based sheet row.
fn identity_index(remote: &Rows) -> HashMap<String, usize> {
    remote
        .iter()
        .enumerate()
        .skip(1)
        .filter_map(|(i, row)| {
            row.first()
                .filter(|id| !id.trim().is_empty())
                .map(|id| (id.trim().to_string(), i + 1))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;
    use crate::sheets::fake::FakeTabular;

    fn trade(id: i64, asset: &str) -> Trade {
        Trade {
            id,
            trade_number: 1,
            asset: asset.to_string(),
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

    fn config() -> MirrorConfig {
        MirrorConfig::new("sheet-1")
    }

    #[tokio::test]
    async fn first_push_writes_header_and_appends_all() {
        let fake = FakeTabular::with_tabs(&["Trades"]);
        let cfg = config();
        let trades = vec![trade(1, "WDOFUT"), trade(2, "WINFUT")];

        let summary = LedgerReconciler::new(&fake, &cfg).push(&trades).await.unwrap();
        assert_eq!(summary.appended, 2);
        assert_eq!(summary.updated, 0);
        assert!(summary.header_rewritten);

        let rows = fake.tab_rows("Trades");
        assert_eq!(rows[0][0], "ID");
        assert_eq!(rows[1][0], "1");
        assert_eq!(rows[2][0], "2");
    }

    #[tokio::test]
    async fn second_push_is_idempotent() {
        let fake = FakeTabular::with_tabs(&["Trades"]);
        let cfg = config();
        let trades = vec![trade(1, "WDOFUT"), trade(2, "WINFUT")];

        let reconciler = LedgerReconciler::new(&fake, &cfg);
        reconciler.push(&trades).await.unwrap();
        let second = reconciler.push(&trades).await.unwrap();

        assert_eq!(second.appended, 0);
        assert_eq!(second.updated, 2);
        assert!(!second.header_rewritten);
        // Two data rows, not four.
        assert_eq!(fake.tab_rows("Trades").len(), 3);
    }

    #[tokio::test]
    async fn edit_updates_in_place() {
        let fake = FakeTabular::with_tabs(&["Trades"]);
        let cfg = config();
        let reconciler = LedgerReconciler::new(&fake, &cfg);

        reconciler.push(&[trade(1, "WDOFUT")]).await.unwrap();

        let mut edited = trade(1, "WDOFUT");
        edited.exit_price = 5420.0;
        reconciler.push(&[edited]).await.unwrap();

        let rows = fake.tab_rows("Trades");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][7], "5420");
    }

    #[tokio::test]
    async fn local_delete_never_removes_remote_rows() {
        let fake = FakeTabular::with_tabs(&["Trades"]);
        let cfg = config();
        let reconciler = LedgerReconciler::new(&fake, &cfg);

        reconciler.push(&[trade(1, "WDOFUT"), trade(2, "WINFUT")]).await.unwrap();
        // Trade 1 deleted locally; only trade 2 remains.
        let summary = reconciler.push(&[trade(2, "WINFUT")]).await.unwrap();

        assert_eq!(summary.appended, 0);
        assert_eq!(summary.updated, 1);
        let rows = fake.tab_rows("Trades");
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1][0], "1"); // audit row intact
    }

    #[tokio::test]
    async fn missing_tab_is_created() {
        let fake = FakeTabular::with_tabs(&[]);
        let cfg = config();

        LedgerReconciler::new(&fake, &cfg).push(&[trade(1, "WDOFUT")]).await.unwrap();
        assert!(fake.has_tab("Trades"));
        assert_eq!(fake.tab_rows("Trades").len(), 2);
    }

    #[tokio::test]
    async fn missing_spreadsheet_is_fatal_and_specific() {
        let fake = FakeTabular::missing_spreadsheet();
        let cfg = config();

        let err = LedgerReconciler::new(&fake, &cfg)
            .push(&[trade(1, "WDOFUT")])
            .await
            .unwrap_err();
        assert!(matches!(err, SheetsError::SpreadsheetNotFound(_)));
        // Nothing was written.
        assert!(fake.recorded_calls().iter().all(|c| c.starts_with("metadata")));
    }

    #[tokio::test]
    async fn garbage_header_forces_full_rewrite_classification() {
        let fake = FakeTabular::with_tabs(&["Trades"]);
        fake.seed_rows(
            "Trades",
            vec![
                vec!["wrong".to_string(), "header".to_string()],
                vec!["1".to_string(), "stale".to_string()],
            ],
        );
        let cfg = config();

        let summary = LedgerReconciler::new(&fake, &cfg)
            .push(&[trade(1, "WDOFUT")])
            .await
            .unwrap();

        // Identity index skipped: the one local trade appends even though
        // a row with its id exists under the broken header.
        assert!(summary.header_rewritten);
        assert_eq!(summary.updated, 0);
        assert_eq!(summary.appended, 1);
        let rows = fake.tab_rows("Trades");
        assert_eq!(rows[0][0], "ID");
    }

    #[test]
    fn header_comparison_is_exact() {
        let good: Vec<String> = HEADER_LABELS.iter().map(|l| l.to_string()).collect();
        assert!(header_matches(&good));

        let mut short = good.clone();
        short.pop();
        assert!(!header_matches(&short));

        let mut wrong = good;
        wrong[3] = "Lado".to_string();
        assert!(!header_matches(&wrong));
    }

    #[test]
    fn identity_index_skips_header_and_blank_ids() {
        let rows: Rows = vec![
            HEADER_LABELS.iter().map(|l| l.to_string()).collect(),
            vec!["100".to_string()],
            vec!["".to_string()],
            vec!["200".to_string()],
        ];
        let index = identity_index(&rows);
        assert_eq!(index.get("100"), Some(&2));
        assert_eq!(index.get("200"), Some(&4));
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn ranges_span_the_fourteen_columns() {
        let cfg = config();
        let fake = FakeTabular::with_tabs(&["Trades"]);
        let reconciler = LedgerReconciler::new(&fake, &cfg);
        assert_eq!(reconciler.full_range(), "'Trades'!A1:N");
        assert_eq!(reconciler.row_range(5), "'Trades'!A5:N5");
    }
}
