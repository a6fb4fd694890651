//! Value Objects for the inventory domain

use serde::{Deserialize, Serialize};
use std::fmt;

/// Shoe size as it appears in the size columns of the product sheet
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Size(u16);

impl Size {
    pub const fn new(value: u16) -> Self { Self(value) }
    pub const fn value(&self) -> u16 { self.0 }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.0) }
}

/// The enumerable set of sizes the store keeps stock columns for.
///
/// Column layout, validation and totals all follow this range, so widening it
/// means adding size columns to the product sheet.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SizeRange { min: u16, max: u16 }

impl SizeRange {
    pub fn new(min: u16, max: u16) -> Result<Self, SizeRangeError> {
        if min > max { return Err(SizeRangeError::Inverted { min, max }); }
        Ok(Self { min, max })
    }
    pub const fn min(&self) -> Size { Size(self.min) }
    pub const fn max(&self) -> Size { Size(self.max) }
    pub fn len(&self) -> usize { usize::from(self.max - self.min) + 1 }
    pub fn is_empty(&self) -> bool { false }
    pub fn contains(&self, size: Size) -> bool { (self.min..=self.max).contains(&size.0) }
    pub fn iter(&self) -> impl Iterator<Item = Size> { (self.min..=self.max).map(Size) }

    /// Offset of `size` inside the size block, if it belongs to the range.
    pub fn index_of(&self, size: Size) -> Option<usize> {
        self.contains(size).then(|| usize::from(size.0 - self.min))
    }

    /// Parses a submitted size and checks it against the range.
    pub fn parse(&self, raw: &str) -> Option<Size> {
        let value = u16::try_from(parse_int(raw)).ok()?;
        let size = Size(value);
        self.contains(size).then_some(size)
    }
}

impl Default for SizeRange { fn default() -> Self { Self { min: 35, max: 40 } } }

#[derive(Debug, Clone, PartialEq, Eq)] pub enum SizeRangeError { Inverted { min: u16, max: u16 } }
impl std::error::Error for SizeRangeError {}
impl fmt::Display for SizeRangeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self { Self::Inverted { min, max } => write!(f, "size range {min}..{max} is inverted") }
    }
}

/// Variant attributes exactly as a user typed them.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariantFields {
    pub model: String,
    pub color: String,
    pub brand: String,
    pub heel: String,
}

impl VariantFields {
    pub fn new(model: &str, color: &str, brand: &str, heel: &str) -> Self {
        Self { model: model.trim().to_string(), color: color.trim().to_string(), brand: brand.trim().to_string(), heel: heel.trim().to_string() }
    }

    pub fn key(&self) -> VariantKey { VariantKey::new(&self.model, &self.color, &self.brand, &self.heel) }

    /// Rows written before color, brand and heel columns existed carry only a model.
    pub fn is_model_only(&self) -> bool { self.color.is_empty() && self.brand.is_empty() && self.heel.is_empty() }
}

/// Case-normalized identity of a variant; two rows are the same variant only
/// when all four parts are equal after normalization.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct VariantKey { model: String, color: String, brand: String, heel: String }

impl VariantKey {
    pub fn new(model: &str, color: &str, brand: &str, heel: &str) -> Self {
        Self { model: normalize(model), color: normalize(color), brand: normalize(brand), heel: normalize(heel) }
    }
    pub fn model(&self) -> &str { &self.model }
    pub fn color(&self) -> &str { &self.color }
    pub fn brand(&self) -> &str { &self.brand }
    pub fn heel(&self) -> &str { &self.heel }
}

impl fmt::Display for VariantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / {} / {}", self.model, self.color, self.brand, self.heel)
    }
}

pub fn normalize(value: &str) -> String { value.trim().to_uppercase() }

/// `parseInt`-style integer parsing: optional sign followed by the leading
/// digits; anything else yields 0. Spreadsheet cells are often blank or
/// carry trailing text, and those must read as zero rather than fail.
pub fn parse_int(raw: &str) -> i64 {
    let s = raw.trim_start();
    let (negative, digits) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let end = digits.find(|c: char| !c.is_ascii_digit()).unwrap_or(digits.len());
    let value = digits[..end].parse::<i64>().unwrap_or(0);
    if negative { -value } else { value }
}

/// Stock counts never go below zero.
pub fn parse_count(raw: &str) -> u32 { u32::try_from(parse_int(raw).max(0)).unwrap_or(u32::MAX) }
