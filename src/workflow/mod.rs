//! Sale, exchange and intake workflows.
//!
//! Each call is one sequential read-validate-write cycle against the store.
//! Records are decoded, transformed with pure functions and written back at
//! their exact row; a record that was already appended is never retracted.

use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use validator::{Validate, ValidationErrors};

use crate::clock::{Clock, SystemClock};
use crate::codec::{Codec, SchemaVersion};
use crate::config::EngineConfig;
use crate::domain::aggregates::{Exchange, Intake, Sale};
use crate::domain::value_objects::{parse_int, Size, VariantFields};
use crate::ledger::{sheet_row, StockLedger};
use crate::store::{A1Range, Row, SheetStore};
use crate::{FormData, InventoryError, Result};

pub mod exchange;
pub mod intake;
pub mod queries;
pub mod sale;

/// Outcome of a create operation. A repeated submission inside the duplicate
/// window is reported as already registered instead of failing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "record", rename_all = "snake_case")]
pub enum Registration<T> {
    Created(T),
    AlreadyRegistered,
}

impl<T> Registration<T> {
    pub fn created(self) -> Option<T> {
        match self { Self::Created(record) => Some(record), Self::AlreadyRegistered => None }
    }
}

/// A record together with its 0-based position among the data rows.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Positioned<T> {
    pub position: usize,
    #[serde(flatten)]
    pub record: T,
}

/// Form keys of the variant tuple on sale, product and intake forms.
const PRODUCT_FIELDS: [&str; 4] = ["modelo", "color", "marca", "taco"];

pub struct InventoryService<S, C = SystemClock> {
    store: Arc<S>,
    clock: C,
    config: EngineConfig,
    ledger: StockLedger<S>,
}

impl<S: SheetStore, C: Clock> InventoryService<S, C> {
    pub fn new(store: Arc<S>, clock: C, config: EngineConfig) -> Self {
        let ledger = StockLedger::new(store.clone(), config.sheets.products.clone(), config.codec);
        Self { store, clock, config, ledger }
    }

    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn ledger(&self) -> &StockLedger<S> { &self.ledger }
    fn codec(&self) -> &Codec { &self.config.codec }

    /// Writes the header row into every sheet that is still empty.
    pub async fn ensure_headers(&self) -> Result<()> {
        let codec = self.codec();
        let sheets = &self.config.sheets;
        for (sheet, header) in [
            (&sheets.products, codec.product_header()),
            (&sheets.sales, codec.sale_header()),
            (&sheets.exchanges, codec.exchange_header()),
            (&sheets.intakes, codec.intake_header()),
        ] {
            let width = header.len();
            if self.store.read_range(sheet, A1Range::row(1, width)).await?.is_empty() {
                self.store.write_range(sheet, A1Range::row(1, width), vec![header]).await?;
                info!(sheet = %sheet, "header row written");
            }
        }
        Ok(())
    }

    async fn read_rows(&self, sheet: &str, width: usize) -> Result<Vec<Row>> {
        let mut rows = self.store.read_range(sheet, A1Range::columns(width)).await?;
        if !rows.is_empty() { rows.remove(0); }
        Ok(rows)
    }

    async fn read_sales(&self) -> Result<Vec<Sale>> {
        let rows = self.read_rows(&self.config.sheets.sales, self.codec().sale_width()).await?;
        Ok(rows.iter().map(|r| self.codec().decode_sale(r)).collect())
    }

    async fn read_exchanges(&self) -> Result<Vec<Exchange>> {
        let rows = self.read_rows(&self.config.sheets.exchanges, self.codec().exchange_width()).await?;
        Ok(rows.iter().map(|r| self.codec().decode_exchange(r)).collect())
    }

    async fn read_intakes(&self) -> Result<Vec<Intake>> {
        let rows = self.read_rows(&self.config.sheets.intakes, self.codec().intake_width()).await?;
        Ok(rows.iter().map(|r| self.codec().decode_intake(r)).collect())
    }

    async fn append_sale(&self, sale: &Sale) -> Result<()> {
        self.store.append_rows(&self.config.sheets.sales, vec![self.codec().encode_sale(sale)]).await?;
        Ok(())
    }

    async fn write_sale(&self, position: usize, sale: &Sale) -> Result<()> {
        let range = A1Range::row(sheet_row(position), self.codec().sale_width());
        self.store.write_range(&self.config.sheets.sales, range, vec![self.codec().encode_sale(sale)]).await?;
        Ok(())
    }

    async fn append_exchange(&self, exchange: &Exchange) -> Result<()> {
        self.store.append_rows(&self.config.sheets.exchanges, vec![self.codec().encode_exchange(exchange)]).await?;
        Ok(())
    }

    async fn write_exchange(&self, position: usize, exchange: &Exchange) -> Result<()> {
        let range = A1Range::row(sheet_row(position), self.codec().exchange_width());
        self.store.write_range(&self.config.sheets.exchanges, range, vec![self.codec().encode_exchange(exchange)]).await?;
        Ok(())
    }

    async fn append_intake(&self, intake: &Intake) -> Result<()> {
        self.store.append_rows(&self.config.sheets.intakes, vec![self.codec().encode_intake(intake)]).await?;
        Ok(())
    }

    /// Parses a size field against the configured size set.
    fn size_field(&self, form: &FormData, key: &str) -> Result<Size> {
        let sizes = self.codec().sizes();
        sizes.parse(field(form, key)).ok_or_else(|| {
            InventoryError::validation(format!("{key} must be a size between {} and {}", sizes.min(), sizes.max()), form)
        })
    }

    /// Quantity of at least one unit; `default` applies when the field is blank.
    fn quantity_field(&self, form: &FormData, key: &str, default: Option<u32>) -> Result<u32> {
        let raw = field(form, key);
        if let (true, Some(quantity)) = (raw.is_empty(), default) {
            return Ok(quantity);
        }
        u32::try_from(parse_int(raw))
            .ok()
            .filter(|q| *q >= 1)
            .ok_or_else(|| InventoryError::validation("quantity must be at least 1", form))
    }

    /// Variant from four form fields, cut down to the columns the configured
    /// layout stores.
    fn variant_field(&self, form: &FormData, [model, color, brand, heel]: [&str; 4]) -> VariantFields {
        self.codec().stored_variant(&VariantFields::new(field(form, model), field(form, color), field(form, brand), field(form, heel)))
    }

    /// The variant columns the configured layout stores must all be filled in.
    fn require_variant(&self, variant: &VariantFields, form: &FormData) -> Result<()> {
        if self.codec().identifies(variant) {
            return Ok(());
        }
        let reason = match self.codec().version() {
            SchemaVersion::Legacy => "model is required",
            SchemaVersion::Colored => "model and color are required",
            SchemaVersion::Current => "model, color, brand and heel are required",
        };
        Err(InventoryError::validation(reason, form))
    }
}

/// Trimmed value of `key`, empty when absent.
pub fn field<'a>(form: &'a FormData, key: &str) -> &'a str {
    form.get(key).map_or("", |v| v.trim())
}

pub(crate) fn check<T: Validate>(input: &T, form: &FormData) -> Result<()> {
    input.validate().map_err(|errors| InventoryError::validation(reason(&errors), form))
}

fn reason(errors: &ValidationErrors) -> String {
    let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
    fields.sort_by_key(|(name, _)| *name);
    let mut messages: Vec<String> = Vec::new();
    for (name, errs) in fields {
        for err in errs {
            let message = err.message.as_ref().map_or_else(|| format!("{name} is invalid"), |m| m.to_string());
            if !messages.contains(&message) { messages.push(message); }
        }
    }
    messages.join("; ")
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;

    #[tokio::test]
    async fn test_ensure_headers_is_idempotent() {
        let h = Harness::new().await;
        h.service.ensure_headers().await.unwrap();
        for sheet in [&h.sheets().products, &h.sheets().sales, &h.sheets().exchanges, &h.sheets().intakes] {
            assert_eq!(h.row_count(sheet).await, 1, "{sheet}");
        }
    }

    #[test]
    fn test_field_trims_and_defaults() {
        let f = form(&[("modelo", "  Boston ")]);
        assert_eq!(field(&f, "modelo"), "Boston");
        assert_eq!(field(&f, "color"), "");
    }

    #[test]
    fn test_registration_serializes_with_status() {
        let created = serde_json::to_value(Registration::Created(1)).unwrap();
        assert_eq!(created, serde_json::json!({"status": "created", "record": 1}));
        let duplicate = serde_json::to_value(Registration::<u32>::AlreadyRegistered).unwrap();
        assert_eq!(duplicate, serde_json::json!({"status": "already_registered"}));
    }
}
