//! A1 notation helpers

use std::fmt;

/// A rectangular A1 range without a sheet prefix: either whole columns
/// (`A:R`) or a bounded block (`A5:R5`). Rows and columns are 1-based.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum A1Range {
    Columns { first: usize, last: usize },
    Block { first_col: usize, first_row: usize, last_col: usize, last_row: usize },
}

impl A1Range {
    /// Every row of the first `width` columns.
    pub fn columns(width: usize) -> Self { Self::Columns { first: 1, last: width.max(1) } }

    /// A single full-width row.
    pub fn row(row: usize, width: usize) -> Self {
        Self::Block { first_col: 1, first_row: row, last_col: width.max(1), last_row: row }
    }

    pub fn first_col(&self) -> usize {
        match self { Self::Columns { first, .. } => *first, Self::Block { first_col, .. } => *first_col }
    }

    pub fn last_col(&self) -> usize {
        match self { Self::Columns { last, .. } => *last, Self::Block { last_col, .. } => *last_col }
    }
}

impl fmt::Display for A1Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Columns { first, last } => write!(f, "{}:{}", column_name(*first), column_name(*last)),
            Self::Block { first_col, first_row, last_col, last_row } => {
                write!(f, "{}{}:{}{}", column_name(*first_col), first_row, column_name(*last_col), last_row)
            }
        }
    }
}

/// 1 → `A`, 26 → `Z`, 27 → `AA`.
pub fn column_name(mut index: usize) -> String {
    let mut name = Vec::new();
    while index > 0 {
        let rem = (index - 1) % 26;
        name.push(b'A' + rem as u8);
        index = (index - 1) / 26;
    }
    name.reverse();
    String::from_utf8(name).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names() {
        assert_eq!(column_name(1), "A");
        assert_eq!(column_name(18), "R");
        assert_eq!(column_name(27), "AA");
        assert_eq!(column_name(703), "AAA");
    }

    #[test]
    fn test_display() {
        assert_eq!(A1Range::columns(18).to_string(), "A:R");
        assert_eq!(A1Range::row(5, 18).to_string(), "A5:R5");
        assert_eq!(A1Range::columns(0).to_string(), "A:A");
        assert_eq!(A1Range::row(2, 18).last_col(), 18);
    }
}
