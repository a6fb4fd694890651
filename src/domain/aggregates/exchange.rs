//! Exchange Aggregate

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Size, VariantFields};

/// A size (or model) exchange. The customer returns `origin` at
/// `origin_size` and receives `destination` at `destination_size`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub id: String,
    pub date: String,
    pub origin: VariantFields,
    pub origin_size: Size,
    pub destination: VariantFields,
    pub destination_size: Size,
    pub quantity: u32,
    pub reason: String,
    pub client: String,
    pub contact: String,
    pub notes: String,
    pub status: ExchangeStatus,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeStatus { #[default] Pending, Done }

impl ExchangeStatus {
    pub fn label(&self) -> &'static str { match self { Self::Pending => "pendiente", Self::Done => "realizado" } }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "" | "pendiente" | "pending" => Some(Self::Pending),
            "realizado" | "done" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Exchange ids are the creation instant in epoch milliseconds.
pub fn exchange_id(at: DateTime<Utc>) -> String { at.timestamp_millis().to_string() }

impl Exchange {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.id.trim().parse::<i64>().ok().and_then(DateTime::<Utc>::from_timestamp_millis)
    }

    pub fn with_status(&self, status: ExchangeStatus) -> Self { Self { status, ..self.clone() } }

    /// True only for the pending→done transition, the one moment stock moves.
    pub fn realizes(&self, target: ExchangeStatus) -> bool {
        target == ExchangeStatus::Done && self.status != ExchangeStatus::Done
    }

    /// Stock deltas for realizing the exchange: the outgoing pair returns to
    /// stock, the incoming pair leaves it.
    pub fn stock_movements(&self) -> [(&VariantFields, Size, i64); 2] {
        let qty = i64::from(self.quantity);
        [(&self.origin, self.origin_size, qty), (&self.destination, self.destination_size, -qty)]
    }
}
