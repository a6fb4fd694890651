//! Stock intake record: one delivery of goods from a supplier

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::domain::value_objects::{Size, VariantFields};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intake {
    pub timestamp: String,
    pub variant: VariantFields,
    pub received: BTreeMap<Size, u32>,
    pub notes: String,
}

impl Intake {
    pub fn total(&self) -> u64 { self.received.values().map(|q| u64::from(*q)).sum() }

    pub fn deltas(&self) -> Vec<(Size, i64)> {
        self.received.iter().filter(|(_, q)| **q > 0).map(|(s, q)| (*s, i64::from(*q))).collect()
    }
}
