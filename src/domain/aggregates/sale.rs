//! Sale Aggregate

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Size, VariantFields};

/// Cell format of the sale timestamp column.
pub const TIMESTAMP_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub timestamp: String,
    pub variant: VariantFields,
    pub size: Size,
    pub quantity: u32,
    pub address: Address,
    pub contact: String,
    pub delivery_paid: bool,
    pub status: ShipmentStatus,
    pub notes: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street_type: String,
    pub street_name: String,
    pub number: String,
    pub interior: String,
    pub city: String,
    pub reference: String,
    pub full: String,
}

impl Address {
    /// Fills `full` from the parts, e.g. `Av. Arequipa 123 Int. 4, Miraflores`.
    pub fn composed(mut self) -> Self {
        let interior = if self.interior.is_empty() { String::new() } else { format!(" Int. {}", self.interior) };
        self.full = format!("{} {} {}{}, {}", self.street_type, self.street_name, self.number, interior, self.city);
        self
    }
}

/// Shipment progress. Labels typed into the sheet by hand that match none of
/// the known ones are kept verbatim in `Other` and written back unchanged.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShipmentStatus { #[default] PendingShipment, Shipped, Delivered, Other(String) }

impl ShipmentStatus {
    pub fn label(&self) -> &str {
        match self {
            Self::PendingShipment => "Pendiente de envío",
            Self::Shipped => "Enviado",
            Self::Delivered => "Entregado",
            Self::Other(label) => label,
        }
    }

    pub fn from_cell(raw: &str) -> Self { Self::parse(raw).unwrap_or_else(|| Self::Other(raw.trim().to_string())) }

    /// Accepts the sheet labels and the API names. Blank cells read as pending.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "pendiente de envío" | "pendiente de envio" | "pendiente" | "pending_shipment" | "pending" => Some(Self::PendingShipment),
            "enviado" | "shipped" => Some(Self::Shipped),
            "entregado" | "delivered" => Some(Self::Delivered),
            _ => None,
        }
    }
}

pub fn paid_label(paid: bool) -> &'static str { if paid { "Sí" } else { "No" } }

pub fn parse_paid(raw: &str) -> bool {
    matches!(raw.trim().to_lowercase().as_str(), "sí" | "si" | "true" | "yes" | "1" | "on")
}

impl Sale {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        NaiveDateTime::parse_from_str(self.timestamp.trim(), TIMESTAMP_FORMAT).ok().map(|t| t.and_utc())
    }

    /// Returns the paid sale when this is the unpaid→paid transition, `None`
    /// when delivery was already paid. There is no way back to unpaid.
    pub fn pay_delivery(&self) -> Option<Self> {
        if self.delivery_paid { return None; }
        Some(Self { delivery_paid: true, ..self.clone() })
    }

    pub fn with_status(&self, status: ShipmentStatus) -> Self { Self { status, ..self.clone() } }

    pub fn annotated(&self, note: &str) -> Self {
        let notes = if self.notes.trim().is_empty() { note.to_string() } else { format!("{} | {}", self.notes, note) };
        Self { notes, ..self.clone() }
    }
}

pub fn format_timestamp(at: DateTime<Utc>) -> String { at.format(TIMESTAMP_FORMAT).to_string() }
