//! Cell data structures for the spreadsheet grid.
//!
//! This module provides the core data types for representing cells:
//! - [`CellValue`] - The raw stored content of a cell (empty, number, or text)
//! - [`Row`] - A row keyed by column name
//! - [`CellSource`] - Read-only coordinate lookup used by the evaluator
//! - [`SheetView`] - A [`CellSource`] over borrowed rows and column names
//! - [`ShadowRow`] - A [`CellSource`] with one row copied and overridable

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::cell_ref::CellRef;
use super::format::format_number;

/// Leading character that marks a formula.
pub const FORMULA_MARKER: char = '=';

/// The raw content stored in a cell.
///
/// Formulas are stored as text including the leading `=`; evaluated values are
/// never written back here.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    #[default]
    Empty,
    Number(f64),
    Text(String),
}

impl CellValue {
    /// Parse user input into a cell value.
    /// - Empty string -> Empty
    /// - Valid finite number -> Number
    /// - Otherwise (formulas included) -> Text, untrimmed
    pub fn from_input(input: &str) -> CellValue {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return CellValue::Empty;
        }
        if !trimmed.starts_with(FORMULA_MARKER) {
            if let Ok(n) = trimmed.parse::<f64>() {
                if n.is_finite() {
                    return CellValue::Number(n);
                }
            }
        }
        CellValue::Text(input.to_string())
    }

    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            CellValue::Number(_) => false,
        }
    }

    /// True if the stored text begins with the formula marker.
    pub fn is_formula(&self) -> bool {
        matches!(self, CellValue::Text(s) if s.starts_with(FORMULA_MARKER))
    }

    /// The formula body without the marker, if this is a formula.
    pub fn formula_body(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => s.strip_prefix(FORMULA_MARKER),
            _ => None,
        }
    }

    /// Numeric coercion. Text is trimmed and parsed; anything that is not a
    /// finite number (formulas included) yields None.
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            CellValue::Empty => return None,
            CellValue::Number(n) => *n,
            CellValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Lenient coercion used by ranges, criteria and bare references: text
    /// yields its leading number, so `"5kg"` reads as 5. Formulas and text
    /// without a leading number yield None.
    pub fn leading_number(&self) -> Option<f64> {
        let n = match self {
            CellValue::Empty => return None,
            CellValue::Number(n) => *n,
            CellValue::Text(s) => parse_leading_number(s)?,
        };
        n.is_finite().then_some(n)
    }

    /// The stored content as text, the form used for criteria and lookups.
    pub fn raw_text(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Number(n) => format_number(*n),
            CellValue::Text(s) => s.clone(),
        }
    }
}

/// Parse the longest numeric prefix of `text` after leading whitespace:
/// an optional sign, digits with at most one decimal point, and an optional
/// exponent. Returns None when no digits lead the text.
pub fn parse_leading_number(text: &str) -> Option<f64> {
    let text = text.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    let mut digits = 0;
    let mut seen_point = false;
    while let Some(&b) = bytes.get(end) {
        match b {
            b'0'..=b'9' => digits += 1,
            b'.' if !seen_point => seen_point = true,
            _ => break,
        }
        end += 1;
    }
    if digits == 0 {
        return None;
    }
    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+' | b'-')) {
            exp_end += 1;
        }
        let exp_digits = bytes[exp_end..].iter().take_while(|b| b.is_ascii_digit()).count();
        if exp_digits > 0 {
            end = exp_end + exp_digits;
        }
    }
    text[..end].parse().ok()
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

/// A grid row, keyed by column name.
pub type Row = HashMap<String, CellValue>;

/// Read-only access to cells by numeric coordinate.
///
/// Column index `i` always means the `i`-th column name of the grid being
/// read, never a letter-named column.
pub trait CellSource {
    fn row_count(&self) -> usize;
    fn col_count(&self) -> usize;
    fn cell(&self, at: CellRef) -> Option<&CellValue>;

    fn in_bounds(&self, at: CellRef) -> bool {
        at.row < self.row_count() && at.col < self.col_count()
    }
}

/// Borrowed rows plus their ordered column names.
#[derive(Clone, Copy, Debug)]
pub struct SheetView<'a> {
    pub rows: &'a [Row],
    pub columns: &'a [String],
}

impl<'a> SheetView<'a> {
    pub fn new(rows: &'a [Row], columns: &'a [String]) -> Self {
        SheetView { rows, columns }
    }

    /// Column name for a numeric column index.
    pub fn column_key(&self, col: usize) -> Option<&'a str> {
        self.columns.get(col).map(String::as_str)
    }
}

impl CellSource for SheetView<'_> {
    fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn col_count(&self) -> usize {
        self.columns.len()
    }

    fn cell(&self, at: CellRef) -> Option<&CellValue> {
        let key = self.columns.get(at.col)?;
        self.rows.get(at.row)?.get(key)
    }
}

/// A view where one row is a private copy that can be edited; every other row
/// is read from the underlying sheet.
#[derive(Clone, Debug)]
pub struct ShadowRow<'a> {
    view: SheetView<'a>,
    row_index: usize,
    row: Row,
}

impl<'a> ShadowRow<'a> {
    /// Copy `row_index` out of `view`. Returns None if the row does not exist.
    pub fn new(view: SheetView<'a>, row_index: usize) -> Option<Self> {
        let row = view.rows.get(row_index)?.clone();
        Some(ShadowRow {
            view,
            row_index,
            row,
        })
    }

    /// Override a cell in the shadowed row. Returns false if `col` is not a
    /// column of the sheet.
    pub fn set(&mut self, col: usize, value: CellValue) -> bool {
        let Some(key) = self.view.column_key(col) else {
            return false;
        };
        self.row.insert(key.to_string(), value);
        true
    }
}

impl CellSource for ShadowRow<'_> {
    fn row_count(&self) -> usize {
        self.view.row_count()
    }

    fn col_count(&self) -> usize {
        self.view.col_count()
    }

    fn cell(&self, at: CellRef) -> Option<&CellValue> {
        if at.row == self.row_index {
            let key = self.view.columns.get(at.col)?;
            self.row.get(key)
        } else {
            self.view.cell(at)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid() -> (Vec<Row>, Vec<String>) {
        let columns = vec!["Name".to_string(), "Qty".to_string()];
        let rows = vec![
            Row::from([
                ("Name".to_string(), CellValue::from("apple")),
                ("Qty".to_string(), CellValue::Number(3.0)),
            ]),
            Row::from([
                ("Name".to_string(), CellValue::from("pear")),
                ("Qty".to_string(), CellValue::from(" 4.5 ")),
            ]),
        ];
        (rows, columns)
    }

    #[test]
    fn test_from_input_classification() {
        assert_eq!(CellValue::from_input("  "), CellValue::Empty);
        assert_eq!(CellValue::from_input("12.5"), CellValue::Number(12.5));
        assert_eq!(CellValue::from_input("=A1"), CellValue::from("=A1"));
        assert_eq!(CellValue::from_input("inf"), CellValue::from("inf"));
        assert_eq!(CellValue::from_input("hello"), CellValue::from("hello"));
    }

    #[test]
    fn test_as_number() {
        assert_eq!(CellValue::Number(2.0).as_number(), Some(2.0));
        assert_eq!(CellValue::from(" 7 ").as_number(), Some(7.0));
        assert_eq!(CellValue::from("=A1").as_number(), None);
        assert_eq!(CellValue::from("NaN").as_number(), None);
        assert_eq!(CellValue::Empty.as_number(), None);
        assert_eq!(CellValue::from("5kg").as_number(), None);
    }

    #[test]
    fn test_leading_number() {
        assert_eq!(CellValue::from("5kg").leading_number(), Some(5.0));
        assert_eq!(CellValue::from("  -2.5e2 units").leading_number(), Some(-250.0));
        assert_eq!(CellValue::from("3e").leading_number(), Some(3.0));
        assert_eq!(CellValue::from(".5.5").leading_number(), Some(0.5));
        assert_eq!(CellValue::from("12,000").leading_number(), Some(12.0));
        assert_eq!(CellValue::from("kg5").leading_number(), None);
        assert_eq!(CellValue::from("-.").leading_number(), None);
        assert_eq!(CellValue::from("=5").leading_number(), None);
        assert_eq!(CellValue::from("1e999").leading_number(), None);
        assert_eq!(CellValue::Number(4.0).leading_number(), Some(4.0));
        assert_eq!(CellValue::Empty.leading_number(), None);
    }

    #[test]
    fn test_sheet_view_lookup_by_column_index() {
        let (rows, columns) = grid();
        let view = SheetView::new(&rows, &columns);
        assert_eq!(view.cell(CellRef::new(1, 0)), Some(&CellValue::Number(3.0)));
        assert_eq!(view.cell(CellRef::new(0, 1)), Some(&CellValue::from("pear")));
        assert_eq!(view.cell(CellRef::new(2, 0)), None);
        assert_eq!(view.cell(CellRef::new(0, 2)), None);
        assert!(!view.in_bounds(CellRef::new(2, 0)));
    }

    #[test]
    fn test_shadow_row_overrides_without_touching_source() {
        let (rows, columns) = grid();
        let view = SheetView::new(&rows, &columns);
        let mut shadow = ShadowRow::new(view, 1).unwrap();
        assert!(shadow.set(1, CellValue::Number(9.0)));
        assert!(!shadow.set(5, CellValue::Number(9.0)));

        assert_eq!(shadow.cell(CellRef::new(1, 1)), Some(&CellValue::Number(9.0)));
        assert_eq!(shadow.cell(CellRef::new(1, 0)), Some(&CellValue::Number(3.0)));
        assert_eq!(rows[1]["Qty"], CellValue::from(" 4.5 "));
    }

    #[test]
    fn test_cell_value_serde_is_untagged() {
        let values = vec![
            CellValue::Empty,
            CellValue::Number(1.5),
            CellValue::from("=SUM(A1:A2)"),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[null,1.5,"=SUM(A1:A2)"]"#);
        let back: Vec<CellValue> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, values);
    }
}
