use log::{debug, info};

use crate::models::{MirrorConfig, TagKind, TagTaxonomy};

use super::client::{Rows, TabularClient};
use super::error::SheetsError;

/// Mirrors the three tag vocabularies to a columnar sheet: one column per
/// vocabulary, one value per row, no cross-row correlation. Rows are
/// aligned by index, not by identity, which is why removal clears a single
/// cell instead of deleting its row.
pub struct TaxonomySync<'a> {
    client: &'a dyn TabularClient,
    config: &'a MirrorConfig,
}

impl<'a> TaxonomySync<'a> {
    pub fn new(client: &'a dyn TabularClient, config: &'a MirrorConfig) -> Self {
        Self { client, config }
    }

    /// Fetch the remote vocabularies and merge them into the local ones
    /// (union, dedupe, lexicographic sort). When the merge changed the
    /// local copy, the remote data range is rewritten to match, row-aligned
    /// by index. Returns whether anything changed.
    pub async fn merge(&self, taxonomy: &mut TagTaxonomy) -> Result<bool, SheetsError> {
        self.ensure_tab().await?;

        let remote = self
            .client
            .get_values(&self.config.spreadsheet_id, &self.data_range())
            .await?;

        let mut changed = false;
        for kind in TagKind::ALL {
            let column = collect_column(&remote, kind.column());
            changed |= taxonomy.merge_remote(kind, &column);
        }

        if changed {
            info!("taxonomy merge changed local vocabularies, rewriting mirror");
            self.rewrite(taxonomy).await?;
        } else {
            debug!("taxonomy merge: nothing to do");
        }
        Ok(changed)
    }

    /// Push one newly added tag as its own blank-padded row. No attempt is
    /// made to pack it into an existing partially-empty row.
    pub async fn append_tag(&self, kind: TagKind, value: &str) -> Result<(), SheetsError> {
        self.ensure_tab().await?;

        let mut row = vec![String::new(), String::new(), String::new()];
        row[kind.column()] = value.to_string();
        self.client
            .append_values(&self.config.spreadsheet_id, &self.full_range(), vec![row])
            .await
    }

    /// Clear the cell holding the exact value in the target column. The
    /// row itself stays, so sibling columns sharing its index are not
    /// disturbed. Returns whether the value was found.
    pub async fn remove_tag(&self, kind: TagKind, value: &str) -> Result<bool, SheetsError> {
        self.ensure_tab().await?;

        let remote = self
            .client
            .get_values(&self.config.spreadsheet_id, &self.data_range())
            .await?;

        let found = remote
            .iter()
            .position(|row| row.get(kind.column()).map(|v| v.trim()) == Some(value));

        match found {
            Some(index) => {
                let cell = format!(
                    "'{}'!{}{}",
                    self.config.taxonomy_tab,
                    column_letter(kind.column()),
                    index + 2
                );
                self.client
                    .clear_values(&self.config.spreadsheet_id, &cell)
                    .await?;
                Ok(true)
            }
            None => {
                debug!("tag '{}' not present on the mirror, nothing to clear", value);
                Ok(false)
            }
        }
    }

    /// Clear-then-write of the whole data range, rows aligned by index and
    /// blank-padded to the longest vocabulary.
    async fn rewrite(&self, taxonomy: &TagTaxonomy) -> Result<(), SheetsError> {
        self.client
            .clear_values(&self.config.spreadsheet_id, &self.data_range())
            .await?;

        let depth = TagKind::ALL
            .iter()
            .map(|k| taxonomy.list(*k).len())
            .max()
            .unwrap_or(0);
        if depth == 0 {
            return Ok(());
        }

        let rows: Rows = (0..depth)
            .map(|i| {
                TagKind::ALL
                    .iter()
                    .map(|k| taxonomy.list(*k).get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        let range = format!("'{}'!A2:C{}", self.config.taxonomy_tab, depth + 1);
        self.client
            .update_values(&self.config.spreadsheet_id, &range, rows)
            .await
    }

    /// Create the tab and its header row when absent; repair a wrong
    /// header in place.
    async fn ensure_tab(&self) -> Result<(), SheetsError> {
        let meta = self
            .client
            .get_sheet_metadata(&self.config.spreadsheet_id)
            .await?;
        if !meta.has_tab(&self.config.taxonomy_tab) {
            info!("creating missing taxonomy tab '{}'", self.config.taxonomy_tab);
            self.client
                .create_tab(&self.config.spreadsheet_id, &self.config.taxonomy_tab)
                .await?;
        }

        let header = self
            .client
            .get_values(&self.config.spreadsheet_id, &self.header_range())
            .await?;
        let expected: Vec<String> = TagKind::ALL.iter().map(|k| k.header().to_string()).collect();
        let current = header.into_iter().next().unwrap_or_default();
        if current != expected {
            self.client
                .update_values(
                    &self.config.spreadsheet_id,
                    &self.header_range(),
                    vec![expected],
                )
                .await?;
        }
        Ok(())
    }

    fn full_range(&self) -> String {
        format!("'{}'!A1:C", self.config.taxonomy_tab)
    }

    fn header_range(&self) -> String {
        format!("'{}'!A1:C1", self.config.taxonomy_tab)
    }

    fn data_range(&self) -> String {
        format!("'{}'!A2:C", self.config.taxonomy_tab)
    }
}

fn collect_column(rows: &Rows, column: usize) -> Vec<String> {
    rows.iter()
        .filter_map(|row| row.get(column))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .collect()
}

fn column_letter(column: usize) -> char {
    (b'A' + column as u8) as char
}
