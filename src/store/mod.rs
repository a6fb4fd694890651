//! Key-range store the inventory engine persists to.
//!
//! The engine only ever reads whole column ranges, overwrites exact ranges and
//! appends rows. Record semantics (which sheet, which column) live in
//! [`crate::codec`]; stores deal in plain string cells.

use std::future::Future;

use thiserror::Error;

pub mod memory;
pub mod range;
pub mod sheets;

pub use memory::MemoryStore;
pub use range::A1Range;
pub use sheets::{SheetsClient, SheetsStore};

pub type Row = Vec<String>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

pub trait SheetStore: Send + Sync {
    /// Rows of `range` in sheet order. Trailing empty cells may be omitted.
    fn read_range(&self, sheet: &str, range: A1Range) -> impl Future<Output = Result<Vec<Row>, StoreError>> + Send;

    /// Overwrites `range` with `rows`, starting at its top-left cell.
    fn write_range(&self, sheet: &str, range: A1Range, rows: Vec<Row>) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Appends `rows` after the last populated row.
    fn append_rows(&self, sheet: &str, rows: Vec<Row>) -> impl Future<Output = Result<(), StoreError>> + Send;
}

/// The store chosen at startup.
pub enum StoreBackend {
    Memory(MemoryStore),
    Sheets(SheetsStore),
}

impl SheetStore for StoreBackend {
    async fn read_range(&self, sheet: &str, range: A1Range) -> Result<Vec<Row>, StoreError> {
        match self {
            Self::Memory(s) => s.read_range(sheet, range).await,
            Self::Sheets(s) => s.read_range(sheet, range).await,
        }
    }

    async fn write_range(&self, sheet: &str, range: A1Range, rows: Vec<Row>) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.write_range(sheet, range, rows).await,
            Self::Sheets(s) => s.write_range(sheet, range, rows).await,
        }
    }

    async fn append_rows(&self, sheet: &str, rows: Vec<Row>) -> Result<(), StoreError> {
        match self {
            Self::Memory(s) => s.append_rows(sheet, rows).await,
            Self::Sheets(s) => s.append_rows(sheet, rows).await,
        }
    }
}
