//! Sale registration and status changes.
//!
//! Stock leaves the shelf exactly once per sale: when delivery is paid, either
//! at registration or on the later unpaid→paid update. Once the sale row is
//! persisted a failed stock write is logged and left for manual correction.

use tracing::{debug, info, warn};
use validator::Validate;

use super::{check, field, InventoryService, Positioned, Registration, PRODUCT_FIELDS};
use crate::clock::Clock;
use crate::domain::aggregates::sale::{format_timestamp, parse_paid};
use crate::domain::aggregates::{Address, Sale, ShipmentStatus};
use crate::store::SheetStore;
use crate::{FormData, InventoryError, Result};

#[derive(Debug, Validate)]
struct SaleForm {
    #[validate(length(min = 1, message = "model is required"))]
    model: String,
    #[validate(length(min = 1, message = "size is required"))]
    size: String,
    #[validate(length(min = 1, message = "street type, street name, number, city and contact are required"))]
    street_type: String,
    #[validate(length(min = 1, message = "street type, street name, number, city and contact are required"))]
    street_name: String,
    #[validate(length(min = 1, message = "street type, street name, number, city and contact are required"))]
    number: String,
    #[validate(length(min = 1, message = "street type, street name, number, city and contact are required"))]
    city: String,
    #[validate(length(min = 1, message = "street type, street name, number, city and contact are required"))]
    contact: String,
}

impl SaleForm {
    fn from_form(form: &FormData) -> Self {
        Self {
            model: field(form, "modelo").into(),
            size: field(form, "talla").into(),
            street_type: field(form, "tipoVia").into(),
            street_name: field(form, "nombreVia").into(),
            number: field(form, "numero").into(),
            city: field(form, "ciudad").into(),
            contact: field(form, "whatsapp").into(),
        }
    }
}

impl<S: SheetStore, C: Clock> InventoryService<S, C> {
    /// Records a sale. A paid sale must find the units on hand before anything
    /// is written; an unpaid one is recorded with no stock effect.
    pub async fn register_sale(&self, form: &FormData) -> Result<Registration<Positioned<Sale>>> {
        let input = SaleForm::from_form(form);
        check(&input, form)?;
        let variant = self.variant_field(form, PRODUCT_FIELDS);
        self.require_variant(&variant, form)?;
        let size = self.size_field(form, "talla")?;
        let quantity = self.quantity_field(form, "cantidad", None)?;
        let paid = parse_paid(field(form, "deliveryPagado"));

        let now = self.clock.now();
        let sale = Sale {
            timestamp: format_timestamp(now),
            variant,
            size,
            quantity,
            address: Address {
                street_type: input.street_type,
                street_name: input.street_name,
                number: input.number,
                interior: field(form, "interior").into(),
                city: input.city,
                reference: field(form, "referencia").into(),
                full: String::new(),
            }
            .composed(),
            contact: input.contact,
            delivery_paid: paid,
            status: ShipmentStatus::PendingShipment,
            notes: field(form, "observaciones").into(),
        };

        let sales = self.read_sales().await?;
        if self.config.guard.is_duplicate(&sales, &sale, now) {
            debug!(contact = %sale.contact, variant = %sale.variant.key(), "duplicate sale submission ignored");
            return Ok(Registration::AlreadyRegistered);
        }

        self.ledger.require(&sale.variant).await?;
        if paid {
            self.ledger.check_available(&sale.variant, size, quantity).await?;
        }

        self.append_sale(&sale).await?;
        let position = sales.len();
        info!(position, contact = %sale.contact, variant = %sale.variant.key(), %size, quantity, paid, "sale registered");

        if paid {
            self.decrement_after_write(&sale).await;
        }
        Ok(Registration::Created(Positioned { position, record: sale }))
    }

    /// Updates shipment status and/or marks delivery as paid. Only the
    /// unpaid→paid transition moves stock; asking to unmark payment is ignored.
    pub async fn update_sale_status(&self, position: usize, form: &FormData) -> Result<Positioned<Sale>> {
        let sales = self.read_sales().await?;
        let sale = sales.get(position).ok_or_else(|| InventoryError::NotFound(format!("sale at position {position}")))?;

        let mut updated = match field(form, "estado") {
            "" => sale.clone(),
            raw => sale.with_status(
                ShipmentStatus::parse(raw).ok_or_else(|| InventoryError::validation(format!("unknown shipment status `{raw}`"), form))?,
            ),
        };

        let pays = match field(form, "deliveryPagado") {
            "" => false,
            raw => parse_paid(raw),
        };
        let transition = match (pays, updated.pay_delivery()) {
            (true, Some(paid)) => {
                self.ledger.check_available(&paid.variant, paid.size, paid.quantity).await?;
                updated = paid;
                true
            }
            _ => false,
        };

        self.write_sale(position, &updated).await?;
        info!(position, status = updated.status.label(), paid = updated.delivery_paid, "sale updated");

        if transition {
            self.decrement_after_write(&updated).await;
        }
        Ok(Positioned { position, record: updated })
    }

    async fn decrement_after_write(&self, sale: &Sale) {
        if let Err(err) = self.ledger.decrement_checked(&sale.variant, sale.size, sale.quantity).await {
            warn!(error = %err, variant = %sale.variant.key(), size = %sale.size, quantity = sale.quantity, "sale recorded but stock was not decremented");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::domain::value_objects::Size;
    use chrono::Duration;

    #[tokio::test]
    async fn test_paid_sale_decrements_once() {
        let h = Harness::new().await;
        let negro = h.stock("Negro", [0, 0, 2, 0, 0, 0]).await;
        let created = h.service.register_sale(&sale_form("Negro", "37", "1", true, "999")).await.unwrap();
        let sale = created.created().unwrap();
        assert_eq!(sale.position, 0);
        assert!(sale.record.delivery_paid);
        assert_eq!(sale.record.address.full, "Av. Arequipa 123, Miraflores");
        assert_eq!(h.product(&negro).await.stock(Size::new(37)), 1);

        let again = h.service.update_sale_status(0, &form(&[("deliveryPagado", "true")])).await.unwrap();
        assert!(again.record.delivery_paid);
        assert_eq!(h.product(&negro).await.stock(Size::new(37)), 1);
    }

    #[tokio::test]
    async fn test_unpaid_sale_has_no_stock_effect_until_paid() {
        let h = Harness::new().await;
        let negro = h.stock("Negro", [0, 0, 2, 0, 0, 0]).await;
        h.service.register_sale(&sale_form("Negro", "37", "2", false, "999")).await.unwrap();
        assert_eq!(h.product(&negro).await.total(), 2);

        let shipped = h.service.update_sale_status(0, &form(&[("estado", "Enviado")])).await.unwrap();
        assert_eq!(shipped.record.status, ShipmentStatus::Shipped);
        assert_eq!(h.product(&negro).await.total(), 2);

        let paid = h.service.update_sale_status(0, &form(&[("deliveryPagado", "Sí")])).await.unwrap();
        assert!(paid.record.delivery_paid);
        assert_eq!(paid.record.status, ShipmentStatus::Shipped);
        assert_eq!(h.product(&negro).await.total(), 0);

        h.service.update_sale_status(0, &form(&[("deliveryPagado", "true")])).await.unwrap();
        assert_eq!(h.product(&negro).await.total(), 0);
    }

    #[tokio::test]
    async fn test_unmarking_payment_is_ignored() {
        let h = Harness::new().await;
        h.stock("Negro", [0, 0, 2, 0, 0, 0]).await;
        h.service.register_sale(&sale_form("Negro", "37", "1", true, "999")).await.unwrap();
        let updated = h.service.update_sale_status(0, &form(&[("deliveryPagado", "false")])).await.unwrap();
        assert!(updated.record.delivery_paid);
    }

    #[tokio::test]
    async fn test_insufficient_stock_leaves_store_untouched() {
        let h = Harness::new().await;
        h.stock("Negro", [0, 0, 1, 0, 0, 0]).await;
        let sales_before = h.store.rows(&h.sheets().sales).await;
        let products_before = h.store.rows(&h.sheets().products).await;

        let err = h.service.register_sale(&sale_form("Negro", "37", "2", true, "999")).await.unwrap_err();
        assert_eq!(err, InventoryError::InsufficientStock { size: Size::new(37), requested: 2, available: 1 });
        assert_eq!(h.store.rows(&h.sheets().sales).await, sales_before);
        assert_eq!(h.store.rows(&h.sheets().products).await, products_before);
    }

    #[tokio::test]
    async fn test_payment_update_checks_stock_before_writing() {
        let h = Harness::new().await;
        h.stock("Negro", [0, 0, 1, 0, 0, 0]).await;
        h.service.register_sale(&sale_form("Negro", "37", "3", false, "999")).await.unwrap();
        let before = h.store.rows(&h.sheets().sales).await;
        let err = h.service.update_sale_status(0, &form(&[("deliveryPagado", "true")])).await.unwrap_err();
        assert!(matches!(err, InventoryError::InsufficientStock { .. }));
        assert_eq!(h.store.rows(&h.sheets().sales).await, before);
    }

    #[tokio::test]
    async fn test_duplicate_window() {
        let h = Harness::new().await;
        let negro = h.stock("Negro", [0, 0, 5, 0, 0, 0]).await;
        let submitted = sale_form("Negro", "37", "1", true, "999");

        assert!(matches!(h.service.register_sale(&submitted).await.unwrap(), Registration::Created(_)));
        h.clock.advance(Duration::seconds(2));
        assert_eq!(h.service.register_sale(&submitted).await.unwrap(), Registration::AlreadyRegistered);
        assert_eq!(h.row_count(&h.sheets().sales).await, 2);
        assert_eq!(h.product(&negro).await.stock(Size::new(37)), 4);

        h.clock.advance(Duration::seconds(6));
        assert!(matches!(h.service.register_sale(&submitted).await.unwrap(), Registration::Created(_)));
        assert_eq!(h.product(&negro).await.stock(Size::new(37)), 3);
    }

    #[tokio::test]
    async fn test_validation_echoes_form() {
        let h = Harness::new().await;
        let mut submitted = sale_form("Negro", "37", "1", true, "");
        submitted.insert("extra".into(), "kept".into());
        match h.service.register_sale(&submitted).await.unwrap_err() {
            InventoryError::Validation { reason, form } => {
                assert!(reason.contains("contact"), "{reason}");
                assert_eq!(form, submitted);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let err = h.service.register_sale(&sale_form("Negro", "37", "0", true, "999")).await.unwrap_err();
        assert!(matches!(err, InventoryError::Validation { reason, .. } if reason == "quantity must be at least 1"));
    }

    #[tokio::test]
    async fn test_size_outside_range_is_rejected() {
        let h = Harness::new().await;
        h.stock("Negro", [1; 6]).await;
        let err = h.service.register_sale(&sale_form("Negro", "41", "1", true, "999")).await.unwrap_err();
        assert!(matches!(err, InventoryError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_unknown_variant_is_not_found() {
        let h = Harness::new().await;
        h.stock("Negro", [1; 6]).await;
        let err = h.service.register_sale(&sale_form("Rojo", "37", "1", true, "999")).await.unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(_)));
        assert_eq!(h.row_count(&h.sheets().sales).await, 1);
    }

    #[tokio::test]
    async fn test_stock_write_failure_keeps_sale() {
        let h = Harness::new().await;
        let negro = h.stock("Negro", [0, 0, 2, 0, 0, 0]).await;
        h.store.fail_writes(&h.sheets().products, true).await;
        let created = h.service.register_sale(&sale_form("Negro", "37", "1", true, "999")).await.unwrap();
        assert!(matches!(created, Registration::Created(_)));
        assert_eq!(h.row_count(&h.sheets().sales).await, 2);
        assert_eq!(h.product(&negro).await.stock(Size::new(37)), 2);
    }

    #[tokio::test]
    async fn test_unknown_position_is_not_found() {
        let h = Harness::new().await;
        let err = h.service.update_sale_status(3, &form(&[("estado", "Enviado")])).await.unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_unknown_status_is_rejected() {
        let h = Harness::new().await;
        h.stock("Negro", [1; 6]).await;
        h.service.register_sale(&sale_form("Negro", "37", "1", false, "999")).await.unwrap();
        let err = h.service.update_sale_status(0, &form(&[("estado", "Perdido")])).await.unwrap_err();
        assert!(matches!(err, InventoryError::Validation { .. }));
    }
}
