use std::sync::Arc;

use chrono::Utc;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::csv_codec;
use crate::insight::{InsightError, InsightGenerator};
use crate::ledger::Ledger;
use crate::models::{
    validate, MirrorConfig, TagKind, TagTaxonomy, Trade, TradeFilters, TradeForm, ValidationError,
};
use crate::persist::{self, KeyValueStore, StorageError};
use crate::sheets::{LedgerReconciler, PushSummary, SheetsError, TabularClient, TaxonomySync};
use crate::stats::{self, DashboardStats, EquityCurvePoint};
use crate::sync::SyncGate;

#[derive(Error, Debug)]
pub enum JournalError {
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("trade {0} not found")]
    TradeNotFound(i64),

    #[error("storage failed: {0}")]
    Storage(#[from] StorageError),

    #[error("mirror sync failed: {0}")]
    Sync(#[from] SheetsError),

    #[error("no spreadsheet connection active")]
    MirrorUnavailable,

    #[error("insight generation failed: {0}")]
    Insight(#[from] InsightError),

    #[error("no insight generator configured")]
    InsightUnavailable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportReport {
    pub imported: usize,
    pub duplicates: usize,
    pub skipped: usize,
}

struct MirrorLink {
    client: Arc<dyn TabularClient>,
    config: MirrorConfig,
    gate: SyncGate,
}

/// The application-state object: owns the ledger, the tag taxonomy, the
/// persistence handle and the optional mirror connection. Every triggering
/// action flows through here; stores are mutated synchronously before any
/// remote call goes out, so a reconciliation pass always sees the ledger
/// as of its trigger.
pub struct Journal {
    ledger: Ledger,
    taxonomy: TagTaxonomy,
    store: Arc<dyn KeyValueStore>,
    mirror: Option<MirrorLink>,
    insight: Option<Arc<dyn InsightGenerator>>,
}

impl Journal {
    /// Load state from the persistence collaborator. Missing or malformed
    /// blobs fall back to defaults.
    pub fn open(store: Arc<dyn KeyValueStore>) -> Result<Self, JournalError> {
        let ledger = persist::load_ledger(store.as_ref())?;
        let taxonomy = persist::load_taxonomy(store.as_ref())?;
        info!("journal opened with {} trades", ledger.len());

        Ok(Self {
            ledger,
            taxonomy,
            store,
            mirror: None,
            insight: None,
        })
    }

    pub fn with_insight(mut self, generator: Arc<dyn InsightGenerator>) -> Self {
        self.insight = Some(generator);
        self
    }

    pub fn mirror_connected(&self) -> bool {
        self.mirror.is_some()
    }

    /// Establish the mirror connection and run the initial interactive
    /// sync: taxonomy merge first, then a full ledger reconciliation pass.
    /// On failure the connection is torn down and the error surfaced.
    pub async fn connect_mirror(
        &mut self,
        client: Arc<dyn TabularClient>,
        config: MirrorConfig,
    ) -> Result<(), JournalError> {
        self.mirror = Some(MirrorLink {
            client,
            config,
            gate: SyncGate::new(),
        });

        match self.sync_now().await {
            Ok(_) => Ok(()),
            Err(e) => {
                self.mirror = None;
                Err(e)
            }
        }
    }

    pub fn disconnect_mirror(&mut self) {
        self.mirror = None;
    }

    // ─── Trades ──────────────────────────────────────────────────────────

    /// Validate and append a new trade, then push it to the mirror in the
    /// background.
    pub async fn add_trade(&mut self, form: TradeForm) -> Result<Trade, JournalError> {
        let draft = validate(&form)?;

        let id = self.ledger.allocate_id(Utc::now().timestamp_millis());
        let number = self.ledger.next_trade_number();
        let trade = draft.into_trade(id, number);

        self.ledger.add(trade.clone());
        let new_tags = self.absorb_trade_tags(&trade);
        self.persist_all()?;

        info!("trade {} recorded (#{} {})", trade.id, trade.trade_number, trade.asset);
        self.sync_background(&new_tags).await;
        Ok(trade)
    }

    /// Re-validate and replace an existing trade; identity and trade
    /// number are preserved.
    pub async fn update_trade(&mut self, id: i64, form: TradeForm) -> Result<Trade, JournalError> {
        if !self.ledger.contains(id) {
            return Err(JournalError::TradeNotFound(id));
        }
        let draft = validate(&form)?;

        self.ledger.update(id, draft.into_trade(id, 0));
        let updated = self
            .ledger
            .get(id)
            .cloned()
            .ok_or(JournalError::TradeNotFound(id))?;

        let new_tags = self.absorb_trade_tags(&updated);
        self.persist_all()?;

        self.sync_background(&new_tags).await;
        Ok(updated)
    }

    /// Delete a trade locally. Never propagated to the mirror: the remote
    /// sheet keeps the row as an audit trail.
    pub fn remove_trade(&mut self, id: i64) -> Result<(), JournalError> {
        if !self.ledger.remove(id) {
            return Err(JournalError::TradeNotFound(id));
        }
        self.persist_ledger()?;
        info!("trade {} removed locally, mirror row left intact", id);
        Ok(())
    }

    pub fn get_trade(&self, id: i64) -> Option<Trade> {
        self.ledger.get(id).cloned()
    }

    /// Display view: filtered, newest date first.
    pub fn list_trades(&self, filters: &TradeFilters) -> Vec<Trade> {
        self.ledger.list(filters)
    }

    pub fn trade_count(&self) -> usize {
        self.ledger.len()
    }

    // ─── CSV ─────────────────────────────────────────────────────────────

    /// Encode the whole ledger, in ledger order.
    pub fn export_csv(&self) -> String {
        csv_codec::encode(self.ledger.trades())
    }

    /// Decode and merge a CSV document. Importing the same file twice is a
    /// no-op after the first pass.
    pub async fn import_csv(&mut self, text: &str) -> Result<ImportReport, JournalError> {
        let decoded = csv_codec::decode(text);
        let decoded_count = decoded.trades.len();
        let skipped = decoded.skipped;

        let fresh: Vec<Trade> = decoded
            .trades
            .into_iter()
            .filter(|t| !self.ledger.contains(t.id))
            .collect();

        let mut new_tags = Vec::new();
        for trade in &fresh {
            new_tags.extend(self.absorb_trade_tags(trade));
        }

        let imported = self.ledger.merge_imported(fresh);
        self.persist_all()?;

        let report = ImportReport {
            imported,
            duplicates: decoded_count - imported,
            skipped,
        };
        info!(
            "CSV import: {} new, {} duplicates, {} skipped lines",
            report.imported, report.duplicates, report.skipped
        );

        if imported > 0 {
            self.sync_background(&new_tags).await;
        }
        Ok(report)
    }

    // ─── Taxonomy ────────────────────────────────────────────────────────

    pub fn taxonomy(&self) -> &TagTaxonomy {
        &self.taxonomy
    }

    /// Explicit tag management: add a vocabulary value. Returns false when
    /// it was already present.
    pub async fn add_tag(&mut self, kind: TagKind, value: &str) -> Result<bool, JournalError> {
        if !self.taxonomy.add(kind, value) {
            return Ok(false);
        }
        self.persist_taxonomy()?;

        if let Some(link) = &self.mirror {
            let sync = TaxonomySync::new(link.client.as_ref(), &link.config);
            if let Err(e) = sync.append_tag(kind, value.trim()).await {
                warn!("background taxonomy append for '{}' failed: {}", value, e);
            }
        }
        Ok(true)
    }

    /// Explicit tag management: remove a vocabulary value. The mirror cell
    /// is cleared, its row is not deleted.
    pub async fn remove_tag(&mut self, kind: TagKind, value: &str) -> Result<bool, JournalError> {
        if !self.taxonomy.remove(kind, value) {
            return Ok(false);
        }
        self.persist_taxonomy()?;

        if let Some(link) = &self.mirror {
            let sync = TaxonomySync::new(link.client.as_ref(), &link.config);
            if let Err(e) = sync.remove_tag(kind, value.trim()).await {
                warn!("background taxonomy removal for '{}' failed: {}", value, e);
            }
        }
        Ok(true)
    }

    // ─── Analytics ───────────────────────────────────────────────────────

    pub fn stats(&self) -> DashboardStats {
        stats::dashboard_stats(self.ledger.trades())
    }

    pub fn equity_curve(&self) -> Vec<EquityCurvePoint> {
        stats::equity_curve(self.ledger.trades())
    }

    // ─── Insight ─────────────────────────────────────────────────────────

    /// Ask the insight generator for review text and store it in the
    /// trade's notes.
    pub async fn annotate_trade(&mut self, id: i64) -> Result<Trade, JournalError> {
        let generator = self
            .insight
            .clone()
            .ok_or(JournalError::InsightUnavailable)?;
        let mut trade = self
            .ledger
            .get(id)
            .cloned()
            .ok_or(JournalError::TradeNotFound(id))?;

        trade.notes = generator.generate(&trade).await?;
        self.ledger.update(id, trade);
        let updated = self
            .ledger
            .get(id)
            .cloned()
            .ok_or(JournalError::TradeNotFound(id))?;
        self.persist_ledger()?;

        self.sync_background(&[]).await;
        Ok(updated)
    }

    // ─── Sync ────────────────────────────────────────────────────────────

    /// Interactive sync: taxonomy merge plus a full ledger reconciliation
    /// pass, with errors surfaced. Returns `None` when the ledger pass was
    /// coalesced into one already in flight.
    pub async fn sync_now(&mut self) -> Result<Option<PushSummary>, JournalError> {
        let link = self.mirror.as_ref().ok_or(JournalError::MirrorUnavailable)?;

        let changed = TaxonomySync::new(link.client.as_ref(), &link.config)
            .merge(&mut self.taxonomy)
            .await?;
        if changed {
            self.persist_taxonomy()?;
        }

        let link = self.mirror.as_ref().ok_or(JournalError::MirrorUnavailable)?;
        let client = link.client.as_ref();
        let config = &link.config;
        let trades = self.ledger.trades();
        let outcome = link
            .gate
            .run(|| async move { LedgerReconciler::new(client, config).push(trades).await })
            .await;

        match outcome {
            Some(result) => Ok(Some(result?)),
            None => Ok(None),
        }
    }

    /// Silent best-effort sync after a mutating action: ledger pass through
    /// the single-flight gate, then any newly introduced tags. Failures are
    /// logged and swallowed; the triggering action has already succeeded.
    async fn sync_background(&self, new_tags: &[(TagKind, String)]) {
        let link = match &self.mirror {
            Some(link) => link,
            None => return,
        };

        let client = link.client.as_ref();
        let config = &link.config;
        let trades = self.ledger.trades();
        let outcome = link
            .gate
            .run(|| async move { LedgerReconciler::new(client, config).push(trades).await })
            .await;
        match outcome {
            Some(Ok(summary)) => info!(
                "background mirror sync: {} updated, {} appended",
                summary.updated, summary.appended
            ),
            Some(Err(e)) => warn!("background mirror sync failed: {}", e),
            None => {}
        }

        let sync = TaxonomySync::new(link.client.as_ref(), &link.config);
        for (kind, value) in new_tags {
            if let Err(e) = sync.append_tag(*kind, value).await {
                warn!("background taxonomy append for '{}' failed: {}", value, e);
            }
        }
    }

    // ─── Internals ───────────────────────────────────────────────────────

    /// Tags a trade introduced that the taxonomy did not know yet.
    fn absorb_trade_tags(&mut self, trade: &Trade) -> Vec<(TagKind, String)> {
        let mut added = Vec::new();
        let candidates = [
            (TagKind::Region, trade.region.as_str()),
            (TagKind::Structure, trade.structure.as_str()),
            (TagKind::Trigger, trade.trigger.as_str()),
        ];
        for (kind, value) in candidates {
            if !value.is_empty() && self.taxonomy.absorb(kind, value) {
                added.push((kind, value.to_string()));
            }
        }
        added
    }

    fn persist_ledger(&self) -> Result<(), StorageError> {
        persist::save_ledger(self.store.as_ref(), &self.ledger)
    }

    fn persist_taxonomy(&self) -> Result<(), StorageError> {
        persist::save_taxonomy(self.store.as_ref(), &self.taxonomy)
    }

    fn persist_all(&self) -> Result<(), StorageError> {
        self.persist_ledger()?;
        self.persist_taxonomy()
    }
}
