//! Variant lookup over decoded product rows.
//!
//! Only the full (model, color, brand, heel) tuple identifies a sellable
//! unit. When the sheet holds the same tuple twice the earlier row wins and
//! the later one is never touched; rows are not merged.

use crate::domain::aggregates::ProductVariant;
use crate::domain::value_objects::{normalize, VariantKey};

/// Position of the first product whose normalized tuple equals `key`.
pub fn find_variant_row(products: &[ProductVariant], key: &VariantKey) -> Option<usize> {
    products.iter().position(|p| &p.key() == key)
}

/// Model-only lookup for rows written before the sheets had color, brand and
/// heel columns. Never use it where a full tuple is available.
pub fn find_by_model(products: &[ProductVariant], model: &str) -> Option<usize> {
    let model = normalize(model);
    products.iter().position(|p| p.key().model() == model)
}
