//! Cell reference parsing and formatting.
//!
//! Provides bidirectional conversion between spreadsheet-style cell references
//! (e.g., "A1", "B2", "AA100") and zero-indexed row/column coordinates.
//! Column letters use bijective base-26: `Z` is followed by `AA`, no letter
//! stands for zero.
//!
//! # Examples
//!
//! ```
//! use nexus_engine::engine::CellRef;
//!
//! let cell = CellRef::from_str("B3").unwrap();
//! assert_eq!(cell.col, 1);
//! assert_eq!(cell.row, 2);
//! assert_eq!(cell.to_string(), "B3");
//! ```

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

/// A reference to a cell by row and column indices (0-indexed).
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    pub fn new(col: usize, row: usize) -> CellRef {
        CellRef { row, col }
    }

    /// Parse a cell reference from spreadsheet notation (e.g., "A1", "b2", "AA10").
    /// Returns None if the input is invalid.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(name: &str) -> Option<CellRef> {
        parse_cell_reference(name)
    }

    /// Convert column index to spreadsheet-style letters (0 -> A, 25 -> Z, 26 -> AA).
    pub fn col_to_letters(col: usize) -> String {
        column_index_to_letters(col)
    }
}

impl std::str::FromStr for CellRef {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cell_reference(s).ok_or_else(|| format!("Invalid cell reference: {}", s))
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", column_index_to_letters(self.col), self.row + 1)
    }
}

fn cell_ref_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?<letters>[A-Z]+)(?<numbers>[0-9]+)$")
            .expect("cell reference regex must compile")
    })
}

/// Convert a zero-based column index to its letter form.
pub fn column_index_to_letters(index: usize) -> String {
    let mut letters = Vec::new();
    let mut n = index as u128 + 1;
    while n > 0 {
        n -= 1;
        letters.push(b'A' + (n % 26) as u8);
        n /= 26;
    }
    letters.iter().rev().map(|&b| b as char).collect()
}

/// Convert uppercase column letters back to a zero-based index.
///
/// Returns None for empty input, characters outside `A`-`Z`, or indices that
/// overflow `usize`.
pub fn letters_to_column_index(letters: &str) -> Option<usize> {
    if letters.is_empty() {
        return None;
    }
    let mut acc = 0usize;
    for b in letters.bytes() {
        if !b.is_ascii_uppercase() {
            return None;
        }
        let digit = (b - b'A') as usize + 1;
        acc = acc.checked_mul(26)?.checked_add(digit)?;
    }
    acc.checked_sub(1)
}

/// Parse a reference like `"B12"` (case-insensitive) into a coordinate.
///
/// Row numbers are 1-based in the string form; `A0` is invalid.
pub fn parse_cell_reference(reference: &str) -> Option<CellRef> {
    let upper = reference.to_ascii_uppercase();
    let caps = cell_ref_re().captures(&upper)?;
    let col = letters_to_column_index(&caps["letters"])?;
    let row = caps["numbers"].parse::<usize>().ok()?.checked_sub(1)?;
    Some(CellRef::new(col, row))
}

/// A rectangular region given by two corner references.
///
/// Corners may be given in any order; bounds are normalised independently
/// per axis.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RangeRef {
    pub start: CellRef,
    pub end: CellRef,
}

impl RangeRef {
    pub fn new(start: CellRef, end: CellRef) -> RangeRef {
        RangeRef { start, end }
    }

    pub fn min_row(&self) -> usize {
        self.start.row.min(self.end.row)
    }

    pub fn max_row(&self) -> usize {
        self.start.row.max(self.end.row)
    }

    pub fn min_col(&self) -> usize {
        self.start.col.min(self.end.col)
    }

    pub fn max_col(&self) -> usize {
        self.start.col.max(self.end.col)
    }

    pub fn height(&self) -> usize {
        self.max_row() - self.min_row() + 1
    }

    pub fn width(&self) -> usize {
        self.max_col() - self.min_col() + 1
    }

    /// Top-left corner after normalisation.
    pub fn top_left(&self) -> CellRef {
        CellRef::new(self.min_col(), self.min_row())
    }

    pub fn contains(&self, at: CellRef) -> bool {
        (self.min_row()..=self.max_row()).contains(&at.row)
            && (self.min_col()..=self.max_col()).contains(&at.col)
    }

    /// Coordinates in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = CellRef> + use<> {
        let (min_col, max_col) = (self.min_col(), self.max_col());
        (self.min_row()..=self.max_row())
            .flat_map(move |row| (min_col..=max_col).map(move |col| CellRef::new(col, row)))
    }
}

impl fmt::Display for RangeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start, self.end)
    }
}

/// Parse a cell range like "A1:B5". Both corners must be valid references.
pub fn parse_range(range: &str) -> Option<RangeRef> {
    let (start, end) = range.split_once(':')?;
    let start = parse_cell_reference(start.trim())?;
    let end = parse_cell_reference(end.trim())?;
    Some(RangeRef::new(start, end))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_a1_overflow_returns_none() {
        let huge = format!("{}1", "Z".repeat(40));
        assert!(CellRef::from_str(&huge).is_none());
    }

    #[test]
    fn test_col_to_letters_handles_max_usize() {
        let letters = CellRef::col_to_letters(usize::MAX);
        assert!(!letters.is_empty());
        assert!(letters.chars().all(|c| c.is_ascii_uppercase()));
    }

    #[test]
    fn test_column_letters_spot_values() {
        assert_eq!(column_index_to_letters(0), "A");
        assert_eq!(column_index_to_letters(25), "Z");
        assert_eq!(column_index_to_letters(26), "AA");
        assert_eq!(column_index_to_letters(51), "AZ");
        assert_eq!(column_index_to_letters(52), "BA");
        assert_eq!(column_index_to_letters(701), "ZZ");
        assert_eq!(column_index_to_letters(702), "AAA");
    }

    #[test]
    fn test_letters_to_column_index_rejects_garbage() {
        assert_eq!(letters_to_column_index(""), None);
        assert_eq!(letters_to_column_index("a"), None);
        assert_eq!(letters_to_column_index("A1"), None);
        assert_eq!(letters_to_column_index("AAA"), Some(702));
    }

    #[test]
    fn test_columns_round_trip_through_aaa() {
        for i in 0..=17_575usize {
            assert_eq!(letters_to_column_index(&column_index_to_letters(i)), Some(i));
        }
    }

    #[test]
    fn test_parse_range_normalises_corners() {
        let range = parse_range("C5:A1").unwrap();
        assert_eq!(range.min_row(), 0);
        assert_eq!(range.max_row(), 4);
        assert_eq!(range.min_col(), 0);
        assert_eq!(range.max_col(), 2);
        assert_eq!(range.top_left(), CellRef::new(0, 0));
        assert_eq!(range.cells().count(), 15);
    }

    #[test]
    fn test_parse_range_invalid() {
        assert!(parse_range("A1").is_none());
        assert!(parse_range("A1:").is_none());
        assert!(parse_range("A1:1B").is_none());
    }

    proptest! {
        #[test]
        fn prop_reference_round_trip(row in 0usize..1_000_000, col in 0usize..=17_575) {
            let reference = format!("{}{}", column_index_to_letters(col), row + 1);
            prop_assert_eq!(parse_cell_reference(&reference), Some(CellRef::new(col, row)));
        }

        #[test]
        fn prop_display_parses_back(row in 0usize..100_000, col in 0usize..100_000) {
            let cell = CellRef::new(col, row);
            prop_assert_eq!(CellRef::from_str(&cell.to_string()), Some(cell));
        }
    }
}
