//! In-memory stand-in for the remote tabular collaborator, with just
//! enough A1-notation handling for the ranges the sync code emits.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::{RangeRows, Rows, SheetMetadata, TabularClient};
use super::error::SheetsError;

#[derive(Default)]
pub struct FakeTabular {
    tabs: Mutex<HashMap<String, Rows>>,
    calls: Mutex<Vec<String>>,
    spreadsheet_missing: bool,
    fail_writes: Mutex<bool>,
}

#[derive(Debug, Clone, Copy)]
struct ParsedRange {
    start_col: usize,
    start_row: usize, // 1-based
    end_col: usize,
    end_row: Option<usize>, // None = unbounded
}

fn parse_cell(cell: &str) -> (usize, Option<usize>) {
    let letters: String = cell.chars().take_while(|c| c.is_ascii_alphabetic()).collect();
    let digits: String = cell.chars().skip_while(|c| c.is_ascii_alphabetic()).collect();
    let col = letters
        .chars()
        .next()
        .map(|c| (c as u8 - b'A') as usize)
        .unwrap_or(0);
    (col, digits.parse::<usize>().ok())
}

fn parse_range(range: &str) -> (String, ParsedRange) {
    let (tab, cells) = range.split_once('!').unwrap_or(("", range));
    let tab = tab.trim_matches('\'').to_string();

    let (start, end) = match cells.split_once(':') {
        Some((s, e)) => (s, Some(e)),
        None => (cells, None),
    };

    let (start_col, start_row) = parse_cell(start);
    let (end_col, end_row) = match end {
        Some(e) => parse_cell(e),
        None => (start_col, parse_cell(start).1),
    };

    (
        tab,
        ParsedRange {
            start_col,
            start_row: start_row.unwrap_or(1),
            end_col,
            end_row,
        },
    )
}

impl FakeTabular {
    pub fn with_tabs(names: &[&str]) -> Self {
        let fake = Self::default();
        {
            let mut tabs = fake.tabs.lock().unwrap();
            for name in names {
                tabs.insert(name.to_string(), Vec::new());
            }
        }
        fake
    }

    pub fn missing_spreadsheet() -> Self {
        FakeTabular {
            spreadsheet_missing: true,
            ..Self::default()
        }
    }

    pub fn seed_rows(&self, tab: &str, rows: Rows) {
        self.tabs.lock().unwrap().insert(tab.to_string(), rows);
    }

    pub fn tab_rows(&self, tab: &str) -> Rows {
        self.tabs.lock().unwrap().get(tab).cloned().unwrap_or_default()
    }

    pub fn has_tab(&self, tab: &str) -> bool {
        self.tabs.lock().unwrap().contains_key(tab)
    }

    pub fn recorded_calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Make every subsequent write operation fail with a generic API error.
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn write_guard(&self) -> Result<(), SheetsError> {
        if *self.fail_writes.lock().unwrap() {
            return Err(SheetsError::Api {
                code: 500,
                message: "injected failure".to_string(),
            });
        }
        Ok(())
    }

    fn write_at(grid: &mut Rows, start_row: usize, start_col: usize, rows: Rows) {
        for (i, row) in rows.into_iter().enumerate() {
            let r = start_row - 1 + i;
            while grid.len() <= r {
                grid.push(Vec::new());
            }
            for (j, value) in row.into_iter().enumerate() {
                let c = start_col + j;
                let target = &mut grid[r];
                while target.len() <= c {
                    target.push(String::new());
                }
                target[c] = value;
            }
        }
    }
}

#[async_trait]
impl TabularClient for FakeTabular {
    async fn get_sheet_metadata(&self, spreadsheet_id: &str) -> Result<SheetMetadata, SheetsError> {
        self.record("metadata".to_string());
        if self.spreadsheet_missing {
            return Err(SheetsError::SpreadsheetNotFound(spreadsheet_id.to_string()));
        }
        Ok(SheetMetadata {
            tabs: self.tabs.lock().unwrap().keys().cloned().collect(),
        })
    }

    async fn create_tab(&self, _spreadsheet_id: &str, name: &str) -> Result<(), SheetsError> {
        self.record(format!("create:{}", name));
        self.write_guard()?;
        self.tabs.lock().unwrap().entry(name.to_string()).or_default();
        Ok(())
    }

    async fn get_values(&self, _spreadsheet_id: &str, range: &str) -> Result<Rows, SheetsError> {
        self.record(format!("get:{}", range));
        let (tab, r) = parse_range(range);
        let tabs = self.tabs.lock().unwrap();
        let grid = tabs.get(&tab).cloned().unwrap_or_default();

        let end_row = r.end_row.unwrap_or(grid.len()).min(grid.len());
        if r.start_row > end_row {
            return Ok(Vec::new());
        }

        Ok(grid[r.start_row - 1..end_row]
            .iter()
            .map(|row| {
                (r.start_col..=r.end_col)
                    .map(|c| row.get(c).cloned().unwrap_or_default())
                    .collect()
            })
            .collect())
    }

    async fn clear_values(&self, _spreadsheet_id: &str, range: &str) -> Result<(), SheetsError> {
        self.record(format!("clear:{}", range));
        self.write_guard()?;
        let (tab, r) = parse_range(range);
        let mut tabs = self.tabs.lock().unwrap();
        if let Some(grid) = tabs.get_mut(&tab) {
            let end_row = r.end_row.unwrap_or(grid.len()).min(grid.len());
            for row in grid.iter_mut().take(end_row).skip(r.start_row - 1) {
                for c in r.start_col..=r.end_col {
                    if let Some(cell) = row.get_mut(c) {
                        cell.clear();
                    }
                }
            }
        }
        Ok(())
    }

    async fn update_values(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), SheetsError> {
        self.record(format!("update:{}", range));
        self.write_guard()?;
        let (tab, r) = parse_range(range);
        let mut tabs = self.tabs.lock().unwrap();
        let grid = tabs.entry(tab).or_default();
        Self::write_at(grid, r.start_row, r.start_col, rows);
        Ok(())
    }

    async fn batch_update_values(
        &self,
        spreadsheet_id: &str,
        data: Vec<RangeRows>,
    ) -> Result<(), SheetsError> {
        self.record(format!("batch:{}", data.len()));
        self.write_guard()?;
        for (range, rows) in data {
            self.update_values(spreadsheet_id, &range, rows).await?;
        }
        Ok(())
    }

    async fn append_values(
        &self,
        _spreadsheet_id: &str,
        range: &str,
        rows: Rows,
    ) -> Result<(), SheetsError> {
        self.record(format!("append:{}", rows.len()));
        self.write_guard()?;
        let (tab, r) = parse_range(range);
        let mut tabs = self.tabs.lock().unwrap();
        let grid = tabs.entry(tab).or_default();

        // Mimic the remote side finding the insertion position: right
        // after the last row that still holds any value.
        while grid
            .last()
            .map(|row| row.iter().all(|c| c.trim().is_empty()))
            .unwrap_or(false)
        {
            grid.pop();
        }
        let next_row = grid.len() + 1;
        Self::write_at(grid, next_row, r.start_col, rows);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn range_parsing_handles_the_emitted_shapes() {
        let (tab, r) = parse_range("'Trades'!A1:N");
        assert_eq!(tab, "Trades");
        assert_eq!((r.start_col, r.start_row, r.end_col, r.end_row), (0, 1, 13, None));

        let (_, r) = parse_range("'Opcoes'!B3");
        assert_eq!((r.start_col, r.start_row, r.end_col, r.end_row), (1, 3, 1, Some(3)));

        let (_, r) = parse_range("'Opcoes'!A2:C5");
        assert_eq!((r.start_col, r.start_row, r.end_col, r.end_row), (0, 2, 2, Some(5)));
    }

    #[tokio::test]
    async fn append_lands_after_last_non_empty_row() {
        let fake = FakeTabular::with_tabs(&["T"]);
        fake.seed_rows(
            "T",
            vec![vec!["a".to_string()], vec!["".to_string()]],
        );
        fake.append_values("s", "'T'!A1:C", vec![vec!["b".to_string()]])
            .await
            .unwrap();
        let rows = fake.tab_rows("T");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1][0], "b");
    }
}
