//! Amora Inventarios
//!
//! Inventory consistency engine for a footwear shop that keeps its products,
//! sales, exchanges and stock intakes in spreadsheet tabs.
//!
//! ## Features
//! - Positional row codec over three sheet layouts
//! - Variant matching on (model, color, brand, heel)
//! - Stock ledger with clamped and checked decrements
//! - Double-submission guard
//! - Sale, exchange and intake workflows
//! - Google Sheets and in-memory stores

use std::collections::BTreeMap;

use thiserror::Error;

pub mod api;
pub mod clock;
pub mod codec;
pub mod config;
pub mod domain;
pub mod guard;
pub mod ledger;
pub mod matcher;
pub mod store;
pub mod workflow;

use domain::aggregates::StockError;
use domain::value_objects::Size;
use store::StoreError;

/// A submitted form: field name to raw string value.
pub type FormData = BTreeMap<String, String>;

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Validation failed: {reason}")]
    Validation { reason: String, form: FormData },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Insufficient stock for size {size}: requested {requested}, available {available}")]
    InsufficientStock { size: Size, requested: u32, available: u32 },

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),
}

impl InventoryError {
    pub fn validation(reason: impl Into<String>, form: &FormData) -> Self {
        Self::Validation { reason: reason.into(), form: form.clone() }
    }
}

impl From<StoreError> for InventoryError {
    fn from(err: StoreError) -> Self {
        match err { StoreError::Unavailable(msg) => Self::StoreUnavailable(msg) }
    }
}

impl From<StockError> for InventoryError {
    fn from(err: StockError) -> Self {
        match err {
            StockError::InsufficientStock { size, requested, available } => Self::InsufficientStock { size, requested, available },
        }
    }
}

pub type Result<T> = std::result::Result<T, InventoryError>;
