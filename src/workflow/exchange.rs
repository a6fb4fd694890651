//! Exchange registration and completion.
//!
//! Registering an exchange writes three things and moves no stock: the
//! exchange row (pending), a note on the originating sale, and a paid sale for
//! the incoming pair. Stock moves once, when the exchange is marked done.

use tracing::{debug, info, warn};
use validator::Validate;

use super::{check, field, InventoryService, Positioned, Registration};
use crate::clock::Clock;
use crate::domain::aggregates::exchange::exchange_id;
use crate::domain::aggregates::sale::format_timestamp;
use crate::domain::aggregates::{Exchange, ExchangeStatus, Sale, ShipmentStatus};
use crate::domain::value_objects::VariantFields;
use crate::store::SheetStore;
use crate::{FormData, InventoryError, Result};

#[derive(Debug, Validate)]
struct ExchangeForm {
    #[validate(length(min = 1, message = "date is required"))]
    date: String,
    #[validate(length(min = 1, message = "original model is required"))]
    origin_model: String,
    #[validate(length(min = 1, message = "outgoing size is required"))]
    origin_size: String,
    #[validate(length(min = 1, message = "incoming size is required"))]
    destination_size: String,
    #[validate(length(min = 1, message = "contact is required"))]
    contact: String,
}

impl ExchangeForm {
    fn from_form(form: &FormData) -> Self {
        Self {
            date: field(form, "fecha").into(),
            origin_model: field(form, "modeloOriginal").into(),
            origin_size: field(form, "tallaSale").into(),
            destination_size: field(form, "tallaEntra").into(),
            contact: field(form, "whatsapp").into(),
        }
    }
}

/// Blank destination parts default to the origin's: a plain size change
/// only names the incoming size.
fn destination_from(form: &FormData, origin: &VariantFields) -> VariantFields {
    let or = |key: &str, fallback: &str| match field(form, key) { "" => fallback.to_string(), v => v.to_string() };
    VariantFields {
        model: or("modeloNuevo", &origin.model),
        color: or("colorNuevo", &origin.color),
        brand: or("marcaNuevo", &origin.brand),
        heel: or("tacoNuevo", &origin.heel),
    }
}

pub fn exchange_note(id: &str) -> String { format!("Cambio {id}") }

pub const DEFAULT_REASON: &str = "Cambio de talla";

impl<S: SheetStore, C: Clock> InventoryService<S, C> {
    pub async fn register_exchange(&self, form: &FormData) -> Result<Registration<Exchange>> {
        let input = ExchangeForm::from_form(form);
        check(&input, form)?;
        let origin = self.variant_field(form, ["modeloOriginal", "colorOriginal", "marcaOriginal", "tacoOriginal"]);
        let destination = self.codec().stored_variant(&destination_from(form, &origin));
        let origin_size = self.size_field(form, "tallaSale")?;
        let destination_size = self.size_field(form, "tallaEntra")?;
        let quantity = self.quantity_field(form, "cantidad", Some(1))?;

        let now = self.clock.now();
        let exchange = Exchange {
            id: exchange_id(now),
            date: input.date,
            origin,
            origin_size,
            destination,
            destination_size,
            quantity,
            reason: match field(form, "motivo") { "" => DEFAULT_REASON.to_string(), r => r.to_string() },
            client: field(form, "cliente").into(),
            contact: input.contact,
            notes: field(form, "observaciones").into(),
            status: ExchangeStatus::Pending,
        };

        let exchanges = self.read_exchanges().await?;
        if self.config.guard.is_duplicate(&exchanges, &exchange, now) {
            debug!(contact = %exchange.contact, origin = %exchange.origin.key(), "duplicate exchange submission ignored");
            return Ok(Registration::AlreadyRegistered);
        }

        let sales = self.read_sales().await?;
        let origin_key = exchange.origin.key();
        let (sale_position, origin_sale) = sales
            .iter()
            .enumerate()
            .find(|(_, s)| s.contact.trim() == exchange.contact && s.variant.key() == origin_key && s.size == origin_size)
            .ok_or_else(|| InventoryError::NotFound(format!("sale of {origin_key} size {origin_size} for contact {}", exchange.contact)))?;

        let (_, target) = self.ledger.require(&exchange.destination).await?;
        let available = target.stock(destination_size);
        if available < quantity {
            return Err(InventoryError::validation(
                format!("size {destination_size} of {} has {available} units, {quantity} needed", exchange.destination.key()),
                form,
            ));
        }

        self.append_exchange(&exchange).await?;
        info!(id = %exchange.id, contact = %exchange.contact, "exchange registered");

        let note = exchange_note(&exchange.id);
        self.write_sale(sale_position, &origin_sale.annotated(&note)).await?;

        // The incoming pair is sold as already paid; stock for it moves on
        // completion of the exchange, not through the sale.
        let derived = Sale {
            timestamp: format_timestamp(now),
            variant: exchange.destination.clone(),
            size: destination_size,
            quantity,
            address: origin_sale.address.clone(),
            contact: exchange.contact.clone(),
            delivery_paid: true,
            status: ShipmentStatus::PendingShipment,
            notes: note,
        };
        self.append_sale(&derived).await?;
        info!(id = %exchange.id, position = sales.len(), "exchange sale recorded");

        Ok(Registration::Created(exchange))
    }

    /// Sets the status of exchange `id`. The pending→done transition returns
    /// the outgoing pair to stock and takes the incoming pair out.
    pub async fn update_exchange_status(&self, id: &str, status: &str) -> Result<Positioned<Exchange>> {
        let target = ExchangeStatus::parse(status)
            .ok_or_else(|| InventoryError::validation(format!("unknown exchange status `{status}`"), &FormData::from([("estado".into(), status.into())])))?;
        let exchanges = self.read_exchanges().await?;
        let (position, exchange) = exchanges
            .iter()
            .enumerate()
            .find(|(_, e)| e.id == id.trim())
            .ok_or_else(|| InventoryError::NotFound(format!("exchange {id}")))?;

        let updated = exchange.with_status(target);
        self.write_exchange(position, &updated).await?;
        info!(id = %updated.id, status = target.label(), "exchange status updated");

        if exchange.realizes(target) {
            self.apply_exchange_stock(exchange).await;
        }
        Ok(Positioned { position, record: updated })
    }

    async fn apply_exchange_stock(&self, exchange: &Exchange) {
        let [(origin, origin_size, back), (destination, destination_size, out)] = exchange.stock_movements();
        let moves: Vec<(&VariantFields, Vec<_>)> = if origin.key() == destination.key() {
            vec![(origin, vec![(origin_size, back), (destination_size, out)])]
        } else {
            vec![(origin, vec![(origin_size, back)]), (destination, vec![(destination_size, out)])]
        };
        for (variant, deltas) in moves {
            if !self.codec().identifies(variant) {
                warn!(id = %exchange.id, variant = %variant.key(), "exchange completed but its variant is incomplete, stock was not adjusted");
                continue;
            }
            if let Err(err) = self.ledger.adjust(variant, &deltas).await {
                warn!(error = %err, id = %exchange.id, variant = %variant.key(), "exchange completed but stock was not adjusted");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::testing::*;
    use super::*;
    use crate::codec::SchemaVersion;
    use crate::domain::value_objects::Size;

    fn exchange_form(contact: &str, out_size: &str, in_size: &str) -> FormData {
        form(&[
            ("fecha", "2025-02-03"), ("modeloOriginal", "Boston"), ("colorOriginal", "Negro"), ("marcaOriginal", "Amora"),
            ("tacoOriginal", "Bajo"), ("tallaSale", out_size), ("tallaEntra", in_size), ("motivo", "Talla"),
            ("cliente", "Ana"), ("whatsapp", contact),
        ])
    }

    async fn with_sale(h: &Harness, stock: [u32; 6]) -> VariantFields {
        let negro = h.stock("Negro", stock).await;
        h.service.register_sale(&sale_form("Negro", "37", "1", true, "999")).await.unwrap();
        negro
    }

    #[tokio::test]
    async fn test_register_writes_three_records_without_stock_moves() {
        let h = Harness::new().await;
        let negro = with_sale(&h, [0, 0, 1, 2, 0, 0]).await;
        let before = h.product(&negro).await;

        let exchange = h.service.register_exchange(&exchange_form("999", "37", "38")).await.unwrap().created().unwrap();
        assert_eq!(exchange.status, ExchangeStatus::Pending);
        assert_eq!(exchange.destination, negro);
        assert_eq!(exchange.quantity, 1);
        assert_eq!(h.product(&negro).await, before);

        let sales = h.service.list_sales().await.unwrap();
        assert_eq!(sales.len(), 2);
        assert_eq!(sales[0].record.notes, exchange_note(&exchange.id));
        let derived = &sales[1].record;
        assert!(derived.delivery_paid);
        assert_eq!(derived.size, Size::new(38));
        assert_eq!(derived.address, sales[0].record.address);
        assert_eq!(derived.status, ShipmentStatus::PendingShipment);
    }

    #[tokio::test]
    async fn test_derived_sale_never_decrements() {
        let h = Harness::new().await;
        let negro = with_sale(&h, [0, 0, 1, 2, 0, 0]).await;
        h.service.register_exchange(&exchange_form("999", "37", "38")).await.unwrap();
        h.service.update_sale_status(1, &form(&[("deliveryPagado", "true"), ("estado", "Enviado")])).await.unwrap();
        assert_eq!(h.product(&negro).await.stock(Size::new(38)), 2);
    }

    #[tokio::test]
    async fn test_done_adjusts_stock_exactly_once() {
        let h = Harness::new().await;
        let negro = with_sale(&h, [0, 0, 1, 2, 0, 0]).await;
        let id = h.service.register_exchange(&exchange_form("999", "37", "38")).await.unwrap().created().unwrap().id;

        let done = h.service.update_exchange_status(&id, "realizado").await.unwrap();
        assert_eq!(done.record.status, ExchangeStatus::Done);
        let product = h.product(&negro).await;
        assert_eq!(product.stock(Size::new(37)), 1);
        assert_eq!(product.stock(Size::new(38)), 1);

        h.service.update_exchange_status(&id, "realizado").await.unwrap();
        assert_eq!(h.product(&negro).await, product);
    }

    #[tokio::test]
    async fn test_done_moves_stock_between_variants() {
        let h = Harness::new().await;
        let negro = with_sale(&h, [0, 0, 1, 0, 0, 0]).await;
        let rojo = h.stock("Rojo", [0, 0, 3, 0, 0, 0]).await;
        let mut submitted = exchange_form("999", "37", "37");
        submitted.insert("colorNuevo".into(), "Rojo".into());
        let id = h.service.register_exchange(&submitted).await.unwrap().created().unwrap().id;

        h.service.update_exchange_status(&id, "done").await.unwrap();
        assert_eq!(h.product(&negro).await.stock(Size::new(37)), 1);
        assert_eq!(h.product(&rojo).await.stock(Size::new(37)), 2);
    }

    #[tokio::test]
    async fn test_zero_destination_stock_fails_before_any_write() {
        let h = Harness::new().await;
        with_sale(&h, [0, 0, 1, 0, 0, 0]).await;
        let sales = h.store.rows(&h.sheets().sales).await;
        let exchanges = h.store.rows(&h.sheets().exchanges).await;

        let err = h.service.register_exchange(&exchange_form("999", "37", "39")).await.unwrap_err();
        assert!(matches!(err, InventoryError::Validation { .. }));
        assert_eq!(h.store.rows(&h.sheets().sales).await, sales);
        assert_eq!(h.store.rows(&h.sheets().exchanges).await, exchanges);
    }

    #[tokio::test]
    async fn test_missing_origin_sale_is_not_found() {
        let h = Harness::new().await;
        with_sale(&h, [0, 0, 1, 1, 0, 0]).await;
        let err = h.service.register_exchange(&exchange_form("111", "37", "38")).await.unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(_)));
        let err = h.service.register_exchange(&exchange_form("999", "36", "38")).await.unwrap_err();
        assert!(matches!(err, InventoryError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_exchange_is_suppressed() {
        let h = Harness::new().await;
        with_sale(&h, [0, 0, 1, 2, 0, 0]).await;
        assert!(matches!(h.service.register_exchange(&exchange_form("999", "37", "38")).await.unwrap(), Registration::Created(_)));
        h.clock.advance(chrono::Duration::seconds(1));
        assert_eq!(h.service.register_exchange(&exchange_form("999", "37", "38")).await.unwrap(), Registration::AlreadyRegistered);
        assert_eq!(h.service.list_exchanges().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_stock_failure_on_completion_is_swallowed() {
        let h = Harness::new().await;
        let negro = with_sale(&h, [0, 0, 1, 2, 0, 0]).await;
        let id = h.service.register_exchange(&exchange_form("999", "37", "38")).await.unwrap().created().unwrap().id;
        h.store.fail_writes(&h.sheets().products, true).await;

        let done = h.service.update_exchange_status(&id, "realizado").await.unwrap();
        assert_eq!(done.record.status, ExchangeStatus::Done);
        assert_eq!(h.product(&negro).await.stock(Size::new(38)), 2);
    }

    #[tokio::test]
    async fn test_status_errors() {
        let h = Harness::new().await;
        assert!(matches!(h.service.update_exchange_status("42", "realizado").await.unwrap_err(), InventoryError::NotFound(_)));
        assert!(matches!(h.service.update_exchange_status("42", "perdido").await.unwrap_err(), InventoryError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_done_clamps_sold_out_incoming_size() {
        let h = Harness::new().await;
        let negro = with_sale(&h, [0, 0, 1, 1, 0, 0]).await;
        let id = h.service.register_exchange(&exchange_form("999", "37", "38")).await.unwrap().created().unwrap().id;
        h.service.register_sale(&sale_form("Negro", "38", "1", true, "888")).await.unwrap();
        assert_eq!(h.product(&negro).await.stock(Size::new(38)), 0);

        h.service.update_exchange_status(&id, "realizado").await.unwrap();
        let product = h.product(&negro).await;
        assert_eq!(product.stock(Size::new(37)), 1);
        assert_eq!(product.stock(Size::new(38)), 0);
        assert_eq!(product.total(), 1);
    }

    #[tokio::test]
    async fn test_colored_exchange_moves_only_its_color() {
        let h = Harness::with_schema(SchemaVersion::Colored).await;
        let negro = h.stock("Negro", [0, 0, 5, 5, 0, 0]).await;
        let rojo = h.stock("Rojo", [0, 0, 5, 5, 0, 0]).await;
        h.service.register_sale(&sale_form("Rojo", "37", "1", true, "999")).await.unwrap();

        let mut submitted = exchange_form("999", "37", "38");
        submitted.insert("colorOriginal".into(), "Rojo".into());
        let exchange = h.service.register_exchange(&submitted).await.unwrap().created().unwrap();
        let stored = &h.service.list_exchanges().await.unwrap()[0];
        assert_eq!(stored.origin, rojo);
        assert_eq!(stored.destination, rojo);

        h.service.update_exchange_status(&exchange.id, "realizado").await.unwrap();
        let rojo_now = h.product(&rojo).await;
        assert_eq!((rojo_now.stock(Size::new(37)), rojo_now.stock(Size::new(38))), (5, 4));
        let negro_now = h.product(&negro).await;
        assert_eq!((negro_now.stock(Size::new(37)), negro_now.stock(Size::new(38))), (5, 5));
    }

    #[tokio::test]
    async fn test_legacy_exchange_matches_on_model() {
        let h = Harness::with_schema(SchemaVersion::Legacy).await;
        let boston = h.stock("Negro", [0, 0, 1, 1, 0, 0]).await;
        assert!(boston.is_model_only());
        h.service.register_sale(&sale_form("Negro", "37", "1", true, "999")).await.unwrap();
        let id = h.service.register_exchange(&exchange_form("999", "37", "38")).await.unwrap().created().unwrap().id;

        let done = h.service.update_exchange_status(&id, "realizado").await.unwrap();
        assert_eq!(done.record.quantity, 1);
        let product = h.product(&boston).await;
        assert_eq!((product.stock(Size::new(37)), product.stock(Size::new(38))), (1, 0));
    }

    #[tokio::test]
    async fn test_blank_reason_defaults_to_size_change() {
        let h = Harness::new().await;
        with_sale(&h, [0, 0, 1, 1, 0, 0]).await;
        let mut submitted = exchange_form("999", "37", "38");
        submitted.remove("motivo");
        let exchange = h.service.register_exchange(&submitted).await.unwrap().created().unwrap();
        assert_eq!(exchange.reason, DEFAULT_REASON);
        assert_eq!(h.service.list_exchanges().await.unwrap()[0].reason, DEFAULT_REASON);
    }

    #[tokio::test]
    async fn test_annotation_keeps_custom_sale_status() {
        let h = Harness::new().await;
        with_sale(&h, [0, 0, 1, 1, 0, 0]).await;
        let returned = h.service.list_sales().await.unwrap()[0].record.with_status(ShipmentStatus::Other("Devuelto".into()));
        h.service.write_sale(0, &returned).await.unwrap();

        let exchange = h.service.register_exchange(&exchange_form("999", "37", "38")).await.unwrap().created().unwrap();
        let origin = &h.service.list_sales().await.unwrap()[0].record;
        assert_eq!(origin.status, ShipmentStatus::Other("Devuelto".into()));
        assert_eq!(origin.notes, exchange_note(&exchange.id));
    }

    #[test]
    fn test_blank_destination_defaults_to_origin() {
        let origin = VariantFields::new("Boston", "Negro", "Amora", "Bajo");
        let destination = destination_from(&form(&[("colorNuevo", "Rojo")]), &origin);
        assert_eq!(destination, VariantFields::new("Boston", "Rojo", "Amora", "Bajo"));
    }
}
