//! Product registration and stock receipt

use std::collections::BTreeMap;

use tracing::info;
use validator::Validate;

use super::{check, field, InventoryService, PRODUCT_FIELDS};
use crate::clock::Clock;
use crate::domain::aggregates::sale::format_timestamp;
use crate::domain::aggregates::{Intake, ProductVariant};
use crate::domain::value_objects::{parse_count, Size, VariantFields};
use crate::store::SheetStore;
use crate::{FormData, InventoryError, Result};

pub const DEFAULT_CATEGORY: &str = "Zapatillas";

#[derive(Debug, Validate)]
struct ProductForm {
    #[validate(length(min = 1, message = "model is required"))]
    model: String,
}

/// Whether the receipt topped up an existing row or created one.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Receipt {
    Merged { product: ProductVariant, intake: Intake },
    Created { product: ProductVariant, intake: Intake },
}

impl Receipt {
    pub fn product(&self) -> &ProductVariant {
        match self { Self::Merged { product, .. } | Self::Created { product, .. } => product }
    }
}

impl<S: SheetStore, C: Clock> InventoryService<S, C> {
    /// Per-size quantities from `talla_<size>` fields; at least one must be positive.
    fn received(&self, form: &FormData) -> Result<BTreeMap<Size, u32>> {
        let received: BTreeMap<Size, u32> =
            self.codec().sizes().iter().map(|size| (size, parse_count(field(form, &format!("talla_{size}"))))).collect();
        if received.values().all(|q| *q == 0) {
            return Err(InventoryError::validation("enter a quantity for at least one size", form));
        }
        Ok(received)
    }

    fn new_product(&self, variant: VariantFields, received: &BTreeMap<Size, u32>, form: &FormData) -> ProductVariant {
        let mut product = ProductVariant::new(self.clock.now().timestamp_millis().to_string(), variant, self.codec().sizes())
            .with_stock(received.iter().map(|(s, q)| (*s, *q)));
        product.category = match field(form, "categoria") { "" => DEFAULT_CATEGORY.to_string(), c => c.to_string() };
        product.price = field(form, "precio").into();
        product.description = field(form, "descripcion").into();
        product
    }

    /// Appends a new variant row with its opening stock.
    pub async fn register_product(&self, form: &FormData) -> Result<ProductVariant> {
        check(&ProductForm { model: field(form, "modelo").into() }, form)?;
        let received = self.received(form)?;
        let variant = self.variant_field(form, PRODUCT_FIELDS);
        let product = self.new_product(variant, &received, form);
        self.ledger.append(&product).await?;
        info!(id = %product.id, variant = %product.key(), total = product.total(), "product registered");
        Ok(product)
    }

    /// Rewrites category, price and description of product `id`. Only keys
    /// present in the form change; stock and total are left as they are.
    pub async fn update_product(&self, id: &str, form: &FormData) -> Result<ProductVariant> {
        let (position, mut product) = self.ledger.by_id(id).await?;
        let mut changed = false;
        for (key, slot) in [("categoria", &mut product.category), ("precio", &mut product.price), ("descripcion", &mut product.description)] {
            if form.contains_key(key) {
                *slot = field(form, key).to_string();
                changed = true;
            }
        }
        if !changed {
            return Err(InventoryError::validation("nothing to update: send categoria, precio or descripcion", form));
        }
        self.ledger.write(position, &product).await?;
        info!(id = %product.id, variant = %product.key(), "product updated");
        Ok(product)
    }

    /// Books a supplier delivery: tops up the matching variant, or creates it
    /// when no row has the exact tuple, and logs the intake either way.
    pub async fn receive_stock(&self, form: &FormData) -> Result<Receipt> {
        let variant = self.variant_field(form, PRODUCT_FIELDS);
        self.require_variant(&variant, form)?;
        let received = self.received(form)?;
        let intake = Intake {
            timestamp: format_timestamp(self.clock.now()),
            variant: variant.clone(),
            received,
            notes: field(form, "observaciones").into(),
        };

        let receipt = match self.ledger.locate(&variant).await? {
            Some(_) => Receipt::Merged { product: self.ledger.adjust(&variant, &intake.deltas()).await?, intake },
            None => {
                let product = self.new_product(variant, &intake.received, form);
                self.ledger.append(&product).await?;
                Receipt::Created { product, intake }
            }
        };
        match &receipt {
            Receipt::Merged { intake, .. } | Receipt::Created { intake, .. } => self.append_intake(intake).await?,
        }
        info!(variant = %receipt.product().key(), total = receipt.product().total(), "stock received");
        Ok(receipt)
    }
}
