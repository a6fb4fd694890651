//! Positional row codec.
//!
//! Sheets have no named columns; every record type is mapped by a fixed
//! offset table. The sheets went through three layouts as color, brand and
//! heel were added, so each table exists once per [`SchemaVersion`]. Size
//! columns form one contiguous block sized by the configured [`SizeRange`];
//! the columns after that block are located relative to its end.

use std::collections::BTreeMap;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::domain::aggregates::sale::{paid_label, parse_paid};
use crate::domain::aggregates::{Address, Exchange, ExchangeStatus, Intake, ProductVariant, Sale, ShipmentStatus};
use crate::domain::value_objects::{parse_count, parse_int, Size, SizeRange, VariantFields};
use crate::store::Row;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaVersion {
    /// Model only; sizes, no color/brand/heel.
    Legacy,
    /// Model and color.
    Colored,
    /// Model, color, brand and heel. The canonical layout for new sheets.
    #[default]
    Current,
}

impl FromStr for SchemaVersion {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "v1" => Ok(Self::Legacy),
            "colored" | "v2" => Ok(Self::Colored),
            "current" | "v3" => Ok(Self::Current),
            other => Err(format!("unknown schema version `{other}`")),
        }
    }
}

/// Where the variant tuple lives in a row. Missing columns decode as empty.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VariantColumns { pub model: usize, pub color: Option<usize>, pub brand: Option<usize>, pub heel: Option<usize> }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProductLayout { pub id: usize, pub variant: VariantColumns, pub category: usize, pub sizes_start: usize }

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SaleLayout {
    pub timestamp: usize, pub variant: VariantColumns, pub size: usize, pub quantity: usize,
    pub street_type: usize, pub street_name: usize, pub number: usize, pub interior: usize,
    pub city: usize, pub reference: usize, pub full_address: usize, pub contact: usize,
    pub paid: usize, pub status: usize, pub notes: usize, pub width: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ExchangeLayout {
    pub id: usize, pub date: usize, pub origin: VariantColumns, pub origin_size: usize,
    pub destination: VariantColumns, pub destination_size: usize, pub quantity: Option<usize>,
    pub reason: usize, pub client: usize, pub contact: usize, pub notes: usize, pub status: usize, pub width: usize,
}

pub const PRODUCT_LEGACY: ProductLayout = ProductLayout { id: 0, variant: MODEL_ONLY_AT_1, category: 2, sizes_start: 3 };
pub const PRODUCT_COLORED: ProductLayout = ProductLayout { id: 0, variant: COLORED_AT_1, category: 3, sizes_start: 4 };
pub const PRODUCT_CURRENT: ProductLayout = ProductLayout { id: 0, variant: FULL_AT_1, category: 5, sizes_start: 6 };

const MODEL_ONLY_AT_1: VariantColumns = VariantColumns { model: 1, color: None, brand: None, heel: None };
const COLORED_AT_1: VariantColumns = VariantColumns { model: 1, color: Some(2), brand: None, heel: None };
const FULL_AT_1: VariantColumns = VariantColumns { model: 1, color: Some(2), brand: Some(3), heel: Some(4) };

pub const SALE_LEGACY: SaleLayout = SaleLayout {
    timestamp: 0, variant: MODEL_ONLY_AT_1, size: 2, quantity: 3, street_type: 4, street_name: 5, number: 6, interior: 7,
    city: 8, reference: 9, full_address: 10, contact: 11, paid: 12, status: 13, notes: 14, width: 15,
};
pub const SALE_COLORED: SaleLayout = SaleLayout {
    timestamp: 0, variant: COLORED_AT_1, size: 3, quantity: 4, street_type: 5, street_name: 6, number: 7, interior: 8,
    city: 9, reference: 10, full_address: 11, contact: 12, paid: 13, status: 14, notes: 15, width: 16,
};
pub const SALE_CURRENT: SaleLayout = SaleLayout {
    timestamp: 0, variant: FULL_AT_1, size: 5, quantity: 6, street_type: 7, street_name: 8, number: 9, interior: 10,
    city: 11, reference: 12, full_address: 13, contact: 14, paid: 15, status: 16, notes: 17, width: 18,
};

pub const EXCHANGE_LEGACY: ExchangeLayout = ExchangeLayout {
    id: 0, date: 1, origin: VariantColumns { model: 2, color: None, brand: None, heel: None }, origin_size: 3,
    destination: VariantColumns { model: 4, color: None, brand: None, heel: None }, destination_size: 5, quantity: None,
    reason: 6, client: 7, contact: 8, notes: 9, status: 10, width: 11,
};
pub const EXCHANGE_COLORED: ExchangeLayout = ExchangeLayout {
    id: 0, date: 1, origin: VariantColumns { model: 2, color: Some(3), brand: None, heel: None }, origin_size: 4,
    destination: VariantColumns { model: 5, color: Some(6), brand: None, heel: None }, destination_size: 7,
    quantity: Some(8), reason: 9, client: 10, contact: 11, notes: 12, status: 13, width: 14,
};
pub const EXCHANGE_CURRENT: ExchangeLayout = ExchangeLayout {
    id: 0, date: 1, origin: VariantColumns { model: 2, color: Some(3), brand: Some(4), heel: Some(5) }, origin_size: 6,
    destination: VariantColumns { model: 7, color: Some(8), brand: Some(9), heel: Some(10) }, destination_size: 11,
    quantity: Some(12), reason: 13, client: 14, contact: 15, notes: 16, status: 17, width: 18,
};

/// Intake sheet: `timestamp, model, color, brand, heel, sizes…, total, notes`.
const INTAKE_SIZES_START: usize = 5;

/// Codec for one deployment: a schema version plus the size set.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Codec { version: SchemaVersion, sizes: SizeRange }

impl Default for Codec {
    fn default() -> Self { Self::new(SchemaVersion::default(), SizeRange::default()) }
}

fn cell(row: &Row, index: usize) -> &str { row.get(index).map_or("", |c| c.trim()) }
fn opt_cell(row: &Row, index: Option<usize>) -> &str { index.map_or("", |i| cell(row, i)) }
fn put(row: &mut Row, index: usize, value: impl Into<String>) {
    if row.len() <= index { row.resize(index + 1, String::new()); }
    row[index] = value.into();
}
fn put_opt(row: &mut Row, index: Option<usize>, value: &str) { if let Some(i) = index { put(row, i, value); } }
fn parse_size(raw: &str) -> Size { Size::new(u16::try_from(parse_int(raw).max(0)).unwrap_or(0)) }

fn decode_variant(row: &Row, cols: &VariantColumns) -> VariantFields {
    VariantFields::new(cell(row, cols.model), opt_cell(row, cols.color), opt_cell(row, cols.brand), opt_cell(row, cols.heel))
}

fn encode_variant(row: &mut Row, cols: &VariantColumns, v: &VariantFields) {
    put(row, cols.model, v.model.as_str());
    put_opt(row, cols.color, &v.color);
    put_opt(row, cols.brand, &v.brand);
    put_opt(row, cols.heel, &v.heel);
}

impl Codec {
    pub const fn new(version: SchemaVersion, sizes: SizeRange) -> Self { Self { version, sizes } }
    pub const fn version(&self) -> SchemaVersion { self.version }
    pub const fn sizes(&self) -> &SizeRange { &self.sizes }

    pub const fn product_layout(&self) -> &'static ProductLayout {
        match self.version { SchemaVersion::Legacy => &PRODUCT_LEGACY, SchemaVersion::Colored => &PRODUCT_COLORED, SchemaVersion::Current => &PRODUCT_CURRENT }
    }
    pub const fn sale_layout(&self) -> &'static SaleLayout {
        match self.version { SchemaVersion::Legacy => &SALE_LEGACY, SchemaVersion::Colored => &SALE_COLORED, SchemaVersion::Current => &SALE_CURRENT }
    }
    pub const fn exchange_layout(&self) -> &'static ExchangeLayout {
        match self.version { SchemaVersion::Legacy => &EXCHANGE_LEGACY, SchemaVersion::Colored => &EXCHANGE_COLORED, SchemaVersion::Current => &EXCHANGE_CURRENT }
    }

    /// `variant` reduced to the parts the product sheet stores, so a form
    /// that fills in brand or heel still matches a colored row.
    pub fn stored_variant(&self, variant: &VariantFields) -> VariantFields {
        let cols = &self.product_layout().variant;
        let keep = |col: Option<usize>, value: &str| if col.is_some() { value.to_string() } else { String::new() };
        VariantFields {
            model: variant.model.clone(),
            color: keep(cols.color, &variant.color),
            brand: keep(cols.brand, &variant.brand),
            heel: keep(cols.heel, &variant.heel),
        }
    }

    /// Whether every part the product sheet stores is filled in.
    pub fn identifies(&self, variant: &VariantFields) -> bool {
        let cols = &self.product_layout().variant;
        let filled = |col: Option<usize>, value: &str| col.is_none() || !value.is_empty();
        !variant.model.is_empty() && filled(cols.color, &variant.color) && filled(cols.brand, &variant.brand) && filled(cols.heel, &variant.heel)
    }

    fn total_col(&self) -> usize { self.product_layout().sizes_start + self.sizes.len() }
    pub fn product_width(&self) -> usize { self.total_col() + 3 }
    pub fn sale_width(&self) -> usize { self.sale_layout().width }
    pub fn exchange_width(&self) -> usize { self.exchange_layout().width }
    pub fn intake_width(&self) -> usize { INTAKE_SIZES_START + self.sizes.len() + 2 }

    pub fn decode_product(&self, row: &Row) -> ProductVariant {
        let l = self.product_layout();
        let counts: Vec<(Size, u32)> = self.sizes.iter().enumerate().map(|(i, s)| (s, parse_count(cell(row, l.sizes_start + i)))).collect();
        let mut product = ProductVariant::new(cell(row, l.id), decode_variant(row, &l.variant), &self.sizes).with_stock(counts);
        product.category = cell(row, l.category).to_string();
        product.price = cell(row, self.total_col() + 1).to_string();
        product.description = cell(row, self.total_col() + 2).to_string();
        product
    }

    pub fn encode_product(&self, p: &ProductVariant) -> Row {
        let l = self.product_layout();
        let mut row = vec![String::new(); self.product_width()];
        put(&mut row, l.id, p.id.as_str());
        encode_variant(&mut row, &l.variant, &p.variant);
        put(&mut row, l.category, p.category.as_str());
        for (i, size) in self.sizes.iter().enumerate() {
            put(&mut row, l.sizes_start + i, p.stock(size).to_string());
        }
        put(&mut row, self.total_col(), p.total().to_string());
        put(&mut row, self.total_col() + 1, p.price.as_str());
        put(&mut row, self.total_col() + 2, p.description.as_str());
        row
    }

    pub fn decode_sale(&self, row: &Row) -> Sale {
        let l = self.sale_layout();
        Sale {
            timestamp: cell(row, l.timestamp).to_string(),
            variant: decode_variant(row, &l.variant),
            size: parse_size(cell(row, l.size)),
            quantity: parse_count(cell(row, l.quantity)),
            address: Address {
                street_type: cell(row, l.street_type).into(), street_name: cell(row, l.street_name).into(),
                number: cell(row, l.number).into(), interior: cell(row, l.interior).into(), city: cell(row, l.city).into(),
                reference: cell(row, l.reference).into(), full: cell(row, l.full_address).into(),
            },
            contact: cell(row, l.contact).to_string(),
            delivery_paid: parse_paid(cell(row, l.paid)),
            status: ShipmentStatus::from_cell(cell(row, l.status)),
            notes: cell(row, l.notes).to_string(),
        }
    }

    pub fn encode_sale(&self, s: &Sale) -> Row {
        let l = self.sale_layout();
        let mut row = vec![String::new(); l.width];
        put(&mut row, l.timestamp, s.timestamp.as_str());
        encode_variant(&mut row, &l.variant, &s.variant);
        put(&mut row, l.size, s.size.to_string());
        put(&mut row, l.quantity, s.quantity.to_string());
        put(&mut row, l.street_type, s.address.street_type.as_str());
        put(&mut row, l.street_name, s.address.street_name.as_str());
        put(&mut row, l.number, s.address.number.as_str());
        put(&mut row, l.interior, s.address.interior.as_str());
        put(&mut row, l.city, s.address.city.as_str());
        put(&mut row, l.reference, s.address.reference.as_str());
        put(&mut row, l.full_address, s.address.full.as_str());
        put(&mut row, l.contact, s.contact.as_str());
        put(&mut row, l.paid, paid_label(s.delivery_paid));
        put(&mut row, l.status, s.status.label());
        put(&mut row, l.notes, s.notes.as_str());
        row
    }

    pub fn decode_exchange(&self, row: &Row) -> Exchange {
        let l = self.exchange_layout();
        Exchange {
            id: cell(row, l.id).to_string(),
            date: cell(row, l.date).to_string(),
            origin: decode_variant(row, &l.origin),
            origin_size: parse_size(cell(row, l.origin_size)),
            destination: decode_variant(row, &l.destination),
            destination_size: parse_size(cell(row, l.destination_size)),
            // Legacy exchanges always moved a single pair.
            quantity: l.quantity.map_or(1, |i| parse_count(cell(row, i))),
            reason: cell(row, l.reason).to_string(),
            client: cell(row, l.client).to_string(),
            contact: cell(row, l.contact).to_string(),
            notes: cell(row, l.notes).to_string(),
            status: ExchangeStatus::parse(cell(row, l.status)).unwrap_or_default(),
        }
    }

    pub fn encode_exchange(&self, e: &Exchange) -> Row {
        let l = self.exchange_layout();
        let mut row = vec![String::new(); l.width];
        put(&mut row, l.id, e.id.as_str());
        put(&mut row, l.date, e.date.as_str());
        encode_variant(&mut row, &l.origin, &e.origin);
        put(&mut row, l.origin_size, e.origin_size.to_string());
        encode_variant(&mut row, &l.destination, &e.destination);
        put(&mut row, l.destination_size, e.destination_size.to_string());
        if let Some(i) = l.quantity { put(&mut row, i, e.quantity.to_string()); }
        put(&mut row, l.reason, e.reason.as_str());
        put(&mut row, l.client, e.client.as_str());
        put(&mut row, l.contact, e.contact.as_str());
        put(&mut row, l.notes, e.notes.as_str());
        put(&mut row, l.status, e.status.label());
        row
    }

    pub fn decode_intake(&self, row: &Row) -> Intake {
        let received: BTreeMap<Size, u32> =
            self.sizes.iter().enumerate().map(|(i, s)| (s, parse_count(cell(row, INTAKE_SIZES_START + i)))).collect();
        Intake {
            timestamp: cell(row, 0).to_string(),
            variant: decode_variant(row, &FULL_AT_1),
            received,
            notes: cell(row, INTAKE_SIZES_START + self.sizes.len() + 1).to_string(),
        }
    }

    pub fn encode_intake(&self, intake: &Intake) -> Row {
        let mut row = vec![String::new(); self.intake_width()];
        put(&mut row, 0, intake.timestamp.as_str());
        encode_variant(&mut row, &FULL_AT_1, &intake.variant);
        for (i, size) in self.sizes.iter().enumerate() {
            put(&mut row, INTAKE_SIZES_START + i, intake.received.get(&size).copied().unwrap_or(0).to_string());
        }
        put(&mut row, INTAKE_SIZES_START + self.sizes.len(), intake.total().to_string());
        put(&mut row, INTAKE_SIZES_START + self.sizes.len() + 1, intake.notes.as_str());
        row
    }

    /// Header rows for freshly created sheets.
    pub fn product_header(&self) -> Row {
        let l = self.product_layout();
        let mut row = vec![String::new(); self.product_width()];
        put(&mut row, l.id, "id");
        encode_variant(&mut row, &l.variant, &VariantFields::new("modelo", "color", "marca", "taco"));
        put(&mut row, l.category, "categoria");
        for (i, size) in self.sizes.iter().enumerate() { put(&mut row, l.sizes_start + i, size.to_string()); }
        put(&mut row, self.total_col(), "total");
        put(&mut row, self.total_col() + 1, "precio");
        put(&mut row, self.total_col() + 2, "descripcion");
        row
    }

    pub fn sale_header(&self) -> Row {
        let l = self.sale_layout();
        let mut row = vec![String::new(); l.width];
        for (i, name) in [
            (l.timestamp, "fecha"), (l.size, "talla"), (l.quantity, "cantidad"), (l.street_type, "tipoVia"),
            (l.street_name, "nombreVia"), (l.number, "numero"), (l.interior, "interior"), (l.city, "ciudad"),
            (l.reference, "referencia"), (l.full_address, "direccion"), (l.contact, "whatsapp"),
            (l.paid, "deliveryPagado"), (l.status, "estado"), (l.notes, "observaciones"),
        ] {
            put(&mut row, i, name);
        }
        encode_variant(&mut row, &l.variant, &VariantFields::new("modelo", "color", "marca", "taco"));
        row
    }

    pub fn exchange_header(&self) -> Row {
        let l = self.exchange_layout();
        let mut row = vec![String::new(); l.width];
        for (i, name) in [
            (l.id, "id"), (l.date, "fecha"), (l.origin_size, "tallaSale"), (l.destination_size, "tallaEntra"),
            (l.reason, "motivo"), (l.client, "cliente"), (l.contact, "whatsapp"), (l.notes, "observaciones"), (l.status, "estado"),
        ] {
            put(&mut row, i, name);
        }
        if let Some(i) = l.quantity { put(&mut row, i, "cantidad"); }
        encode_variant(&mut row, &l.origin, &VariantFields::new("modeloOriginal", "colorOriginal", "marcaOriginal", "tacoOriginal"));
        encode_variant(&mut row, &l.destination, &VariantFields::new("modeloNuevo", "colorNuevo", "marcaNuevo", "tacoNuevo"));
        row
    }

    pub fn intake_header(&self) -> Row {
        let mut row = vec![String::new(); self.intake_width()];
        put(&mut row, 0, "fecha");
        encode_variant(&mut row, &FULL_AT_1, &VariantFields::new("modelo", "color", "marca", "taco"));
        for (i, size) in self.sizes.iter().enumerate() { put(&mut row, INTAKE_SIZES_START + i, size.to_string()); }
        put(&mut row, INTAKE_SIZES_START + self.sizes.len(), "total");
        put(&mut row, INTAKE_SIZES_START + self.sizes.len() + 1, "observaciones");
        row
    }
}
