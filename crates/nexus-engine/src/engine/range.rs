//! Range resolution: numeric values in a rectangle and conditional sums.
//!
//! Ranges are forgiving: an unparseable range yields no values, coordinates
//! outside the grid are skipped, and cells without a leading number are left
//! out entirely (they do not count towards `COUNT` or `AVERAGE`).

use super::cell::{CellSource, CellValue, parse_leading_number};
use super::cell_ref::{CellRef, RangeRef, parse_range};
use super::error::FormulaError;

/// Numeric values in `range` ("A1:B10"), row-major. Invalid ranges yield an
/// empty vector.
pub fn values_in_range<S: CellSource + ?Sized>(range: &str, source: &S) -> Vec<f64> {
    match parse_range(range) {
        Some(range) => values_in(&range, source),
        None => Vec::new(),
    }
}

/// Numeric values in an already-parsed range, row-major.
pub fn values_in<S: CellSource + ?Sized>(range: &RangeRef, source: &S) -> Vec<f64> {
    cells_in_bounds(range, source)
        .filter_map(|at| source.cell(at).and_then(CellValue::leading_number))
        .collect()
}

/// Coordinates of `range` that fall inside the grid, row-major.
pub fn cells_in_bounds<'s, S: CellSource + ?Sized>(
    range: &RangeRef,
    source: &'s S,
) -> impl Iterator<Item = CellRef> + use<'s, S> {
    let rows = clamp_axis(range.min_row(), range.max_row(), source.row_count());
    let cols = clamp_axis(range.min_col(), range.max_col(), source.col_count());
    rows.flat_map(move |row| cols.clone().map(move |col| CellRef::new(col, row)))
}

fn clamp_axis(min: usize, max: usize, len: usize) -> std::ops::Range<usize> {
    if min >= len {
        return 0..0;
    }
    min..max.min(len - 1) + 1
}

/// A `SUMIF`-style condition.
#[derive(Clone, Debug, PartialEq)]
pub enum Criterion {
    Greater(f64),
    GreaterEq(f64),
    Less(f64),
    LessEq(f64),
    /// `=text` or bare text: exact match against the raw cell text.
    Equals(String),
}

impl Criterion {
    /// Parse a condition such as `">5"`, `"<=10"`, `"=done"` or `"done"`.
    ///
    /// Thresholds that are not numbers make every comparison false.
    pub fn parse(condition: &str) -> Criterion {
        let condition = condition.trim();
        if let Some(rest) = condition.strip_prefix(">=") {
            Criterion::GreaterEq(threshold(rest))
        } else if let Some(rest) = condition.strip_prefix("<=") {
            Criterion::LessEq(threshold(rest))
        } else if let Some(rest) = condition.strip_prefix('>') {
            Criterion::Greater(threshold(rest))
        } else if let Some(rest) = condition.strip_prefix('<') {
            Criterion::Less(threshold(rest))
        } else if let Some(rest) = condition.strip_prefix('=') {
            Criterion::Equals(rest.to_string())
        } else {
            Criterion::Equals(condition.to_string())
        }
    }

    pub fn matches(&self, cell: Option<&CellValue>) -> bool {
        let number = || cell.and_then(CellValue::leading_number);
        match self {
            Criterion::Greater(t) => number().is_some_and(|n| n > *t),
            Criterion::GreaterEq(t) => number().is_some_and(|n| n >= *t),
            Criterion::Less(t) => number().is_some_and(|n| n < *t),
            Criterion::LessEq(t) => number().is_some_and(|n| n <= *t),
            Criterion::Equals(text) => cell.map(CellValue::raw_text).unwrap_or_default() == *text,
        }
    }
}

fn threshold(text: &str) -> f64 {
    parse_leading_number(text).unwrap_or(f64::NAN)
}

/// Sum the cells of `sum` (or of `condition` when absent) whose counterpart at
/// the same relative offset in `condition` satisfies `criterion`.
///
/// Both ranges must have the same shape. Sum cells that do not coerce to a
/// number contribute 0.
pub fn sum_if<S: CellSource + ?Sized>(
    condition: &RangeRef,
    criterion: &Criterion,
    sum: Option<&RangeRef>,
    source: &S,
) -> Result<f64, FormulaError> {
    let sum = sum.unwrap_or(condition);
    if sum.height() != condition.height() || sum.width() != condition.width() {
        return Err(FormulaError::RangeMismatch);
    }

    let cond_origin = condition.top_left();
    let sum_origin = sum.top_left();
    let mut total = 0.0;
    for at in cells_in_bounds(condition, source) {
        if !criterion.matches(source.cell(at)) {
            continue;
        }
        let target = CellRef::new(
            sum_origin.col + (at.col - cond_origin.col),
            sum_origin.row + (at.row - cond_origin.row),
        );
        total += source
            .cell(target)
            .and_then(CellValue::leading_number)
            .unwrap_or(0.0);
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cell::{Row, SheetView};

    fn sheet(columns: &[&str], data: &[&[CellValue]]) -> (Vec<Row>, Vec<String>) {
        let columns: Vec<String> = columns.iter().map(|c| c.to_string()).collect();
        let rows = data
            .iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values.iter().cloned())
                    .collect::<Row>()
            })
            .collect();
        (rows, columns)
    }

    #[test]
    fn test_values_in_range_skips_blank_and_text() {
        let (rows, columns) = sheet(
            &["A"],
            &[
                &[CellValue::Number(5.0)],
                &[CellValue::Empty],
                &[CellValue::from("7")],
                &[CellValue::from("seven")],
            ],
        );
        let view = SheetView::new(&rows, &columns);
        assert_eq!(values_in_range("A1:A4", &view), vec![5.0, 7.0]);
    }

    #[test]
    fn test_values_in_range_reads_leading_numbers() {
        let (rows, columns) = sheet(
            &["A"],
            &[&[CellValue::from("5kg")], &[CellValue::Number(2.0)], &[CellValue::from("=A1")]],
        );
        let view = SheetView::new(&rows, &columns);
        assert_eq!(values_in_range("A1:A3", &view), vec![5.0, 2.0]);
        assert!(Criterion::parse(">4").matches(Some(&CellValue::from("5kg"))));
    }

    #[test]
    fn test_values_in_range_out_of_bounds_and_reversed() {
        let (rows, columns) = sheet(
            &["A", "B"],
            &[
                &[CellValue::Number(1.0), CellValue::Number(2.0)],
                &[CellValue::Number(3.0), CellValue::Number(4.0)],
            ],
        );
        let view = SheetView::new(&rows, &columns);
        assert_eq!(values_in_range("Z99:A1", &view), vec![1.0, 2.0, 3.0, 4.0]);
        assert_eq!(values_in_range("C3:D9", &view), Vec::<f64>::new());
        assert_eq!(values_in_range("A1:A1048576", &view), vec![1.0, 3.0]);
    }

    #[test]
    fn test_values_in_range_invalid_is_empty() {
        let (rows, columns) = sheet(&["A"], &[&[CellValue::Number(1.0)]]);
        let view = SheetView::new(&rows, &columns);
        assert!(values_in_range("A1", &view).is_empty());
        assert!(values_in_range("1A:A1", &view).is_empty());
    }

    #[test]
    fn test_criterion_parse() {
        assert_eq!(Criterion::parse(">=5"), Criterion::GreaterEq(5.0));
        assert_eq!(Criterion::parse("<= 10"), Criterion::LessEq(10.0));
        assert_eq!(Criterion::parse(">1"), Criterion::Greater(1.0));
        assert_eq!(Criterion::parse("<1"), Criterion::Less(1.0));
        assert_eq!(Criterion::parse("=done"), Criterion::Equals("done".into()));
        assert_eq!(Criterion::parse("done"), Criterion::Equals("done".into()));
    }

    #[test]
    fn test_criterion_matches() {
        assert!(Criterion::parse(">5").matches(Some(&CellValue::Number(6.0))));
        assert!(!Criterion::parse(">5").matches(Some(&CellValue::from("abc"))));
        assert!(!Criterion::parse(">abc").matches(Some(&CellValue::Number(6.0))));
        assert!(Criterion::parse("5").matches(Some(&CellValue::Number(5.0))));
        assert!(Criterion::parse("").matches(None));
    }

    #[test]
    fn test_sum_if_with_separate_sum_range() {
        let (rows, columns) = sheet(
            &["A", "B"],
            &[
                &[CellValue::Number(1.0), CellValue::Number(10.0)],
                &[CellValue::Number(6.0), CellValue::Number(20.0)],
                &[CellValue::Number(8.0), CellValue::from("n/a")],
            ],
        );
        let view = SheetView::new(&rows, &columns);
        let cond = parse_range("A1:A3").unwrap();
        let sum = parse_range("B1:B3").unwrap();
        let total = sum_if(&cond, &Criterion::parse(">5"), Some(&sum), &view).unwrap();
        assert_eq!(total, 20.0);

        let total = sum_if(&cond, &Criterion::parse(">5"), None, &view).unwrap();
        assert_eq!(total, 14.0);
    }

    #[test]
    fn test_sum_if_rejects_mismatched_shapes() {
        let (rows, columns) = sheet(&["A", "B"], &[&[CellValue::Number(1.0), CellValue::Empty]]);
        let view = SheetView::new(&rows, &columns);
        let cond = parse_range("A1:A3").unwrap();
        let sum = parse_range("B1:B2").unwrap();
        assert_eq!(
            sum_if(&cond, &Criterion::parse(">0"), Some(&sum), &view),
            Err(FormulaError::RangeMismatch)
        );
    }
}
