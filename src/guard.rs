//! Double-submission guard.
//!
//! A retried form post or a double click arrives a moment after the first
//! one. Before appending, the workflows look at the last few rows of the
//! target sheet and drop the write when an equal record was created within a
//! short window. Legitimate repeat orders outside the window go through.

use chrono::{DateTime, Duration, Utc};

use crate::domain::aggregates::{Exchange, Sale};
use crate::domain::value_objects::{Size, VariantFields};

pub trait GuardedRecord {
    type Key: PartialEq;
    fn created_at(&self) -> Option<DateTime<Utc>>;
    fn comparison_key(&self) -> Self::Key;
}

/// Sales compare on variant, size, quantity and contact, case-sensitively.
impl GuardedRecord for Sale {
    type Key = (VariantFields, Size, u32, String);
    fn created_at(&self) -> Option<DateTime<Utc>> { Sale::created_at(self) }
    fn comparison_key(&self) -> Self::Key { (self.variant.clone(), self.size, self.quantity, self.contact.clone()) }
}

/// Exchanges compare on the outgoing pair, the incoming size and contact.
impl GuardedRecord for Exchange {
    type Key = (VariantFields, Size, Size, String);
    fn created_at(&self) -> Option<DateTime<Utc>> { Exchange::created_at(self) }
    fn comparison_key(&self) -> Self::Key { (self.origin.clone(), self.origin_size, self.destination_size, self.contact.clone()) }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DuplicateGuard { window: Duration, tail: usize }

impl Default for DuplicateGuard {
    fn default() -> Self { Self { window: Duration::seconds(5), tail: 5 } }
}

impl DuplicateGuard {
    pub fn new(window: Duration, tail: usize) -> Self { Self { window, tail } }
    pub fn window(&self) -> Duration { self.window }
    pub fn tail(&self) -> usize { self.tail }

    /// Scans only the last `tail` records of `recent` (sheet order). Records
    /// without a readable creation time never count as duplicates.
    pub fn is_duplicate<R: GuardedRecord>(&self, recent: &[R], candidate: &R, now: DateTime<Utc>) -> bool {
        let start = recent.len().saturating_sub(self.tail);
        let key = candidate.comparison_key();
        recent[start..].iter().any(|record| {
            let fresh = record.created_at().is_some_and(|at| {
                let age = now.signed_duration_since(at);
                age <= self.window && age >= -self.window
            });
            fresh && record.comparison_key() == key
        })
    }
}
