//! Product Variant Aggregate

use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::value_objects::{Size, SizeRange, VariantFields, VariantKey};

/// One row of the product sheet: a variant and its stock per size.
///
/// `total` is private and only ever derived from the size counters, so a
/// variant can never be persisted with a stale total. It is widened to `u64`
/// so that any set of saturated counters still sums exactly.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ProductVariant {
    pub id: String,
    pub variant: VariantFields,
    pub category: String,
    stock: BTreeMap<Size, u32>,
    total: u64,
    pub price: String,
    pub description: String,
}

impl ProductVariant {
    pub fn new(id: impl Into<String>, variant: VariantFields, sizes: &SizeRange) -> Self {
        Self {
            id: id.into(), variant, category: String::new(),
            stock: sizes.iter().map(|s| (s, 0)).collect(), total: 0,
            price: String::new(), description: String::new(),
        }
    }

    /// Sets the given counts; sizes outside the variant's size set are dropped.
    pub fn with_stock(mut self, counts: impl IntoIterator<Item = (Size, u32)>) -> Self {
        for (size, count) in counts {
            if let Some(slot) = self.stock.get_mut(&size) { *slot = count; }
        }
        self.recompute_total();
        self
    }

    pub fn key(&self) -> VariantKey { self.variant.key() }
    pub fn total(&self) -> u64 { self.total }
    pub fn stock(&self, size: Size) -> u32 { self.stock.get(&size).copied().unwrap_or(0) }
    pub fn stock_levels(&self) -> &BTreeMap<Size, u32> { &self.stock }
    pub fn has_size(&self, size: Size) -> bool { self.stock.contains_key(&size) }

    pub fn available_sizes(&self) -> Vec<(Size, u32)> {
        self.stock.iter().filter(|(_, c)| **c > 0).map(|(s, c)| (*s, *c)).collect()
    }

    /// Applies signed deltas, clamping every counter at zero. A decrement
    /// larger than the available stock is absorbed, not rejected.
    pub fn adjust(&self, deltas: &[(Size, i64)]) -> Self {
        let mut next = self.clone();
        for (size, delta) in deltas {
            if let Some(count) = next.stock.get_mut(size) {
                let value = (i64::from(*count) + delta).max(0);
                *count = u32::try_from(value).unwrap_or(u32::MAX);
            }
        }
        next.recompute_total();
        next
    }

    /// Sale policy: refuses to go below zero instead of clamping.
    pub fn decrement_checked(&self, size: Size, quantity: u32) -> Result<Self, StockError> {
        let available = self.stock(size);
        if !self.has_size(size) || available < quantity {
            return Err(StockError::InsufficientStock { size, requested: quantity, available });
        }
        Ok(self.adjust(&[(size, -i64::from(quantity))]))
    }

    fn recompute_total(&mut self) { self.total = self.stock.values().map(|c| u64::from(*c)).sum(); }
}

#[derive(Debug, Clone, PartialEq, Eq)] pub enum StockError { InsufficientStock { size: Size, requested: u32, available: u32 } }
impl std::error::Error for StockError {}
impl std::fmt::Display for StockError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InsufficientStock { size, requested, available } => write!(f, "Insufficient stock for size {size}: requested {requested}, available {available}"),
        }
    }
}
