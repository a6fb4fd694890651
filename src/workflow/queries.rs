//! Read-only views over the sheets

use std::collections::BTreeMap;

use serde::Serialize;

use super::{InventoryService, Positioned};
use crate::clock::Clock;
use crate::domain::aggregates::{Exchange, Intake, ProductVariant, Sale};
use crate::domain::value_objects::{Size, VariantFields};
use crate::matcher::{find_by_model, find_variant_row};
use crate::store::SheetStore;
use crate::{InventoryError, Result};

/// A customer's order and what the same variant still has in stock,
/// for offering a size change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OrderLookup {
    pub sale: Positioned<Sale>,
    pub available_sizes: Vec<(Size, u32)>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct StockLevel {
    pub variant: VariantFields,
    pub stock: BTreeMap<Size, u32>,
    pub total: u64,
}

impl<S: SheetStore, C: Clock> InventoryService<S, C> {
    pub async fn list_products(&self) -> Result<Vec<ProductVariant>> { self.ledger.products().await }

    pub async fn product_by_id(&self, id: &str) -> Result<ProductVariant> { Ok(self.ledger.by_id(id).await?.1) }

    pub async fn list_sales(&self) -> Result<Vec<Positioned<Sale>>> {
        Ok(self.read_sales().await?.into_iter().enumerate().map(|(position, record)| Positioned { position, record }).collect())
    }

    pub async fn list_exchanges(&self) -> Result<Vec<Exchange>> { self.read_exchanges().await }

    pub async fn list_intakes(&self) -> Result<Vec<Intake>> { self.read_intakes().await }

    pub async fn exchanges_by_contact(&self, contact: &str) -> Result<Vec<Exchange>> {
        let contact = contact.trim();
        Ok(self.read_exchanges().await?.into_iter().filter(|e| e.contact == contact).collect())
    }

    /// First sale placed from `contact`, with the sizes of its variant that
    /// are still in stock.
    pub async fn find_order_by_contact(&self, contact: &str) -> Result<OrderLookup> {
        let contact = contact.trim();
        let (position, sale) = self
            .read_sales()
            .await?
            .into_iter()
            .enumerate()
            .find(|(_, s)| !contact.is_empty() && s.contact == contact)
            .ok_or_else(|| InventoryError::NotFound(format!("order for contact {contact}")))?;

        let products = self.ledger.products().await?;
        let row = if sale.variant.is_model_only() {
            find_by_model(&products, &sale.variant.model)
        } else {
            find_variant_row(&products, &sale.variant.key())
        };
        let available_sizes = row.and_then(|r| products.get(r)).map(ProductVariant::available_sizes).unwrap_or_default();
        Ok(OrderLookup { sale: Positioned { position, record: sale }, available_sizes })
    }

    /// Stock per variant. When a tuple appears on several rows only the
    /// first one is reported, the same row every mutation targets.
    pub async fn inventory_snapshot(&self) -> Result<Vec<StockLevel>> {
        let products = self.ledger.products().await?;
        Ok(products
            .iter()
            .enumerate()
            .filter(|(i, p)| !p.variant.model.is_empty() && find_variant_row(&products, &p.key()) == Some(*i))
            .map(|(_, p)| StockLevel { variant: p.variant.clone(), stock: p.stock_levels().clone(), total: p.total() })
            .collect())
    }

    /// Distinct models in sheet order.
    pub async fn available_models(&self) -> Result<Vec<String>> {
        let mut models: Vec<String> = Vec::new();
        for product in self.ledger.products().await? {
            let model = product.variant.model;
            if !model.is_empty() && !models.contains(&model) { models.push(model); }
        }
        Ok(models)
    }
}
