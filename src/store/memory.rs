//! In-process store with spreadsheet semantics, for tests and local runs

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;

use super::{A1Range, Row, SheetStore, StoreError};

#[derive(Debug, Default)]
pub struct MemoryStore {
    sheets: RwLock<HashMap<String, Vec<Row>>>,
    failing_writes: RwLock<HashSet<String>>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    /// Replaces the whole content of `sheet`.
    pub async fn seed(&self, sheet: &str, rows: Vec<Row>) {
        self.sheets.write().await.insert(sheet.to_string(), rows);
    }

    pub async fn rows(&self, sheet: &str) -> Vec<Row> {
        self.sheets.read().await.get(sheet).cloned().unwrap_or_default()
    }

    /// Makes every later write or append to `sheet` fail until cleared.
    pub async fn fail_writes(&self, sheet: &str, failing: bool) {
        let mut set = self.failing_writes.write().await;
        if failing { set.insert(sheet.to_string()); } else { set.remove(sheet); }
    }

    async fn check_writable(&self, sheet: &str) -> Result<(), StoreError> {
        if self.failing_writes.read().await.contains(sheet) {
            return Err(StoreError::Unavailable(format!("write to {sheet} rejected")));
        }
        Ok(())
    }
}

fn is_blank(row: &Row) -> bool { row.iter().all(|c| c.is_empty()) }

fn slice_columns(row: &Row, first: usize, last: usize) -> Row {
    let mut cells: Row = row.iter().skip(first - 1).take(last + 1 - first).cloned().collect();
    while cells.last().is_some_and(String::is_empty) { cells.pop(); }
    cells
}

impl SheetStore for MemoryStore {
    async fn read_range(&self, sheet: &str, range: A1Range) -> Result<Vec<Row>, StoreError> {
        let sheets = self.sheets.read().await;
        let Some(rows) = sheets.get(sheet) else { return Ok(Vec::new()) };
        let (first, last) = (range.first_col(), range.last_col());
        let mut out: Vec<Row> = match range {
            A1Range::Columns { .. } => rows.iter().map(|r| slice_columns(r, first, last)).collect(),
            A1Range::Block { first_row, last_row, .. } => rows
                .iter()
                .skip(first_row.saturating_sub(1))
                .take((last_row + 1).saturating_sub(first_row.max(1)))
                .map(|r| slice_columns(r, first, last))
                .collect(),
        };
        while out.last().is_some_and(is_blank) { out.pop(); }
        Ok(out)
    }

    async fn write_range(&self, sheet: &str, range: A1Range, rows: Vec<Row>) -> Result<(), StoreError> {
        self.check_writable(sheet).await?;
        let (first_col, first_row) = match range {
            A1Range::Columns { first, .. } => (first, 1),
            A1Range::Block { first_col, first_row, .. } => (first_col, first_row.max(1)),
        };
        let mut sheets = self.sheets.write().await;
        let target = sheets.entry(sheet.to_string()).or_default();
        for (offset, values) in rows.into_iter().enumerate() {
            let index = first_row - 1 + offset;
            if target.len() <= index { target.resize(index + 1, Vec::new()); }
            let row = &mut target[index];
            let end = first_col - 1 + values.len();
            if row.len() < end { row.resize(end, String::new()); }
            for (col, value) in values.into_iter().enumerate() {
                row[first_col - 1 + col] = value;
            }
        }
        Ok(())
    }

    async fn append_rows(&self, sheet: &str, rows: Vec<Row>) -> Result<(), StoreError> {
        self.check_writable(sheet).await?;
        let mut sheets = self.sheets.write().await;
        let target = sheets.entry(sheet.to_string()).or_default();
        while target.last().is_some_and(is_blank) { target.pop(); }
        target.extend(rows);
        Ok(())
    }
}
