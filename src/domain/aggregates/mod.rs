//! Aggregates module
pub mod product;
pub mod sale;
pub mod exchange;
pub mod intake;

pub use product::{ProductVariant, StockError};
pub use sale::{Sale, Address, ShipmentStatus};
pub use exchange::{Exchange, ExchangeStatus};
pub use intake::Intake;
