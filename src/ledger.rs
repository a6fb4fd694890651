//! Stock ledger over the product sheet.
//!
//! Every mutation re-reads the sheet, locates the variant row, applies the
//! deltas to a copy and overwrites that one row in full. Nothing is cached and
//! nothing is locked: two adjustments racing on the same row can lose one of
//! the updates.

use std::sync::Arc;

use tracing::{info, warn};

use crate::codec::Codec;
use crate::domain::aggregates::ProductVariant;
use crate::domain::value_objects::{Size, VariantFields};
use crate::matcher::{find_by_model, find_variant_row};
use crate::store::{A1Range, SheetStore};
use crate::{InventoryError, Result};

/// Sheet row number of the data record at `position` (row 1 is the header).
pub fn sheet_row(position: usize) -> usize { position + 2 }

pub struct StockLedger<S> {
    store: Arc<S>,
    sheet: String,
    codec: Codec,
}

impl<S: SheetStore> StockLedger<S> {
    pub fn new(store: Arc<S>, sheet: impl Into<String>, codec: Codec) -> Self {
        Self { store, sheet: sheet.into(), codec }
    }

    pub fn sheet(&self) -> &str { &self.sheet }

    /// All product rows in sheet order, header excluded.
    pub async fn products(&self) -> Result<Vec<ProductVariant>> {
        let rows = self.store.read_range(&self.sheet, A1Range::columns(self.codec.product_width())).await?;
        Ok(rows.iter().skip(1).map(|row| self.codec.decode_product(row)).collect())
    }

    /// Position and current state of the row for `variant`. Variants without
    /// color, brand and heel come from legacy rows and match on model alone.
    pub async fn locate(&self, variant: &VariantFields) -> Result<Option<(usize, ProductVariant)>> {
        let products = self.products().await?;
        let position = if variant.is_model_only() {
            find_by_model(&products, &variant.model)
        } else {
            find_variant_row(&products, &variant.key())
        };
        Ok(position.and_then(|p| products.into_iter().nth(p).map(|product| (p, product))))
    }

    pub async fn require(&self, variant: &VariantFields) -> Result<(usize, ProductVariant)> {
        self.locate(variant).await?.ok_or_else(|| InventoryError::NotFound(format!("product {}", variant.key())))
    }

    /// Row holding product `id`; ids are compared trimmed and the first row wins.
    pub async fn by_id(&self, id: &str) -> Result<(usize, ProductVariant)> {
        let id = id.trim();
        self.products()
            .await?
            .into_iter()
            .enumerate()
            .find(|(_, p)| !id.is_empty() && p.id == id)
            .ok_or_else(|| InventoryError::NotFound(format!("product {id}")))
    }

    /// Applies clamped deltas to the row of `variant` and persists it.
    pub async fn adjust(&self, variant: &VariantFields, deltas: &[(Size, i64)]) -> Result<ProductVariant> {
        let (position, product) = self.require(variant).await?;
        for (size, delta) in deltas.iter().filter(|(size, _)| !self.codec.sizes().contains(*size)) {
            warn!(%size, delta, variant = %variant.key(), "ignoring stock delta for a size outside the size range");
        }
        let updated = product.adjust(deltas);
        self.write(position, &updated).await?;
        info!(variant = %variant.key(), row = sheet_row(position), total = updated.total(), "stock adjusted");
        Ok(updated)
    }

    /// Checks that `quantity` units of `size` are on hand without writing.
    pub async fn check_available(&self, variant: &VariantFields, size: Size, quantity: u32) -> Result<ProductVariant> {
        let (_, product) = self.require(variant).await?;
        product.decrement_checked(size, quantity)?;
        Ok(product)
    }

    /// Sale policy: fails instead of clamping when stock is short.
    pub async fn decrement_checked(&self, variant: &VariantFields, size: Size, quantity: u32) -> Result<ProductVariant> {
        let (position, product) = self.require(variant).await?;
        let updated = product.decrement_checked(size, quantity)?;
        self.write(position, &updated).await?;
        info!(variant = %variant.key(), %size, quantity, row = sheet_row(position), "stock decremented");
        Ok(updated)
    }

    pub async fn write(&self, position: usize, product: &ProductVariant) -> Result<()> {
        let range = A1Range::row(sheet_row(position), self.codec.product_width());
        self.store.write_range(&self.sheet, range, vec![self.codec.encode_product(product)]).await?;
        Ok(())
    }

    pub async fn append(&self, product: &ProductVariant) -> Result<()> {
        self.store.append_rows(&self.sheet, vec![self.codec.encode_product(product)]).await?;
        info!(variant = %product.key(), total = product.total(), "product row appended");
        Ok(())
    }
}
