//! Built-in spreadsheet functions and their metadata.
//!
//! Conventions:
//! - Spreadsheet-facing built-in names are ALL CAPS (e.g. `SUM`, `AVG`).
//! - If you add a new built-in, add a [`Builtin`] variant, list it in
//!   `BUILTINS`, and dispatch it in `engine::eval`.

use crate::engine::{CellError, CellRef, CellSource, CellValue, RangeRef};

/// Functions that reduce every numeric value of their arguments.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Aggregate {
    Sum,
    Average,
    Min,
    Max,
    Count,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Builtin {
    Aggregate(Aggregate),
    SumIf,
    VLookup,
    Index,
    Match,
}

pub struct BuiltinInfo {
    pub sheet_name: &'static str,
    pub builtin: Builtin,
    pub description: &'static str,
}

pub const BUILTINS: &[BuiltinInfo] = &[
    BuiltinInfo {
        sheet_name: "SUM",
        builtin: Builtin::Aggregate(Aggregate::Sum),
        description: "Sum of numeric values",
    },
    BuiltinInfo {
        sheet_name: "AVG",
        builtin: Builtin::Aggregate(Aggregate::Average),
        description: "Average of numeric values",
    },
    BuiltinInfo {
        sheet_name: "AVERAGE",
        builtin: Builtin::Aggregate(Aggregate::Average),
        description: "Average of numeric values",
    },
    BuiltinInfo {
        sheet_name: "MIN",
        builtin: Builtin::Aggregate(Aggregate::Min),
        description: "Minimum numeric value",
    },
    BuiltinInfo {
        sheet_name: "MAX",
        builtin: Builtin::Aggregate(Aggregate::Max),
        description: "Maximum numeric value",
    },
    BuiltinInfo {
        sheet_name: "COUNT",
        builtin: Builtin::Aggregate(Aggregate::Count),
        description: "Count of numeric values",
    },
    BuiltinInfo {
        sheet_name: "SUMIF",
        builtin: Builtin::SumIf,
        description: "Sum values whose condition cell matches a criterion",
    },
    BuiltinInfo {
        sheet_name: "VLOOKUP",
        builtin: Builtin::VLookup,
        description: "Find a row by its first column and return another column",
    },
    BuiltinInfo {
        sheet_name: "INDEX",
        builtin: Builtin::Index,
        description: "Value at a 1-based row/column offset inside a range",
    },
    BuiltinInfo {
        sheet_name: "MATCH",
        builtin: Builtin::Match,
        description: "1-based position of a value in a range's first column",
    },
];

impl Builtin {
    pub fn from_name(name: &str) -> Option<Builtin> {
        BUILTINS
            .iter()
            .find(|b| b.sheet_name == name)
            .map(|b| b.builtin)
    }

    pub fn sheet_name(self) -> &'static str {
        BUILTINS
            .iter()
            .find(|b| b.builtin == self)
            .map(|b| b.sheet_name)
            .unwrap_or("?")
    }
}

/// Reduce collected numeric values. Empty input gives 0 for every aggregate.
pub fn aggregate(kind: Aggregate, values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    match kind {
        Aggregate::Sum => values.iter().sum(),
        Aggregate::Average => values.iter().sum::<f64>() / values.len() as f64,
        Aggregate::Min => values.iter().copied().fold(f64::INFINITY, f64::min),
        Aggregate::Max => values.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        Aggregate::Count => values.len() as f64,
    }
}

fn matches_key<S: CellSource + ?Sized>(source: &S, at: CellRef, key: &str) -> bool {
    source.cell(at).map(CellValue::raw_text).unwrap_or_default() == key
}

fn first_column_rows<S: CellSource + ?Sized>(
    range: &RangeRef,
    source: &S,
) -> impl Iterator<Item = CellRef> {
    let col = range.min_col();
    let last = range.max_row().min(source.row_count().saturating_sub(1));
    let rows = if range.min_row() < source.row_count() {
        range.min_row()..last + 1
    } else {
        0..0
    };
    rows.map(move |row| CellRef::new(col, row))
}

/// `VLOOKUP`: location of the value `col_index` columns into `table` on the
/// first row whose first-column text equals `key`.
pub fn vlookup<S: CellSource + ?Sized>(
    key: &str,
    table: &RangeRef,
    col_index: usize,
    source: &S,
) -> Result<CellRef, CellError> {
    if col_index == 0 {
        return Err(CellError::Ref);
    }
    let hit = first_column_rows(table, source)
        .find(|at| matches_key(source, *at, key))
        .ok_or(CellError::NotAvailable)?;
    let col = table
        .min_col()
        .checked_add(col_index - 1)
        .ok_or(CellError::Ref)?;
    let target = CellRef::new(col, hit.row);
    if source.in_bounds(target) {
        Ok(target)
    } else {
        Err(CellError::Ref)
    }
}

/// `INDEX`: location at a 1-based offset from the range's top-left corner.
pub fn index<S: CellSource + ?Sized>(
    range: &RangeRef,
    row_num: usize,
    col_num: usize,
    source: &S,
) -> Result<CellRef, CellError> {
    if row_num == 0 || col_num == 0 || row_num > range.height() || col_num > range.width() {
        return Err(CellError::Ref);
    }
    let origin = range.top_left();
    let target = CellRef::new(origin.col + col_num - 1, origin.row + row_num - 1);
    if source.in_bounds(target) {
        Ok(target)
    } else {
        Err(CellError::Ref)
    }
}

/// `MATCH`: 1-based position of `key` in the range's first column. Match type
/// `-1` returns the last exact match, `0` and `1` the first.
pub fn match_position<S: CellSource + ?Sized>(
    key: &str,
    range: &RangeRef,
    match_type: i64,
    source: &S,
) -> Result<usize, CellError> {
    let origin_row = range.min_row();
    let mut hits = first_column_rows(range, source).filter(|at| matches_key(source, *at, key));
    let hit = if match_type == -1 {
        hits.last()
    } else {
        hits.next()
    };
    hit.map(|at| at.row - origin_row + 1)
        .ok_or(CellError::NotAvailable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{Row, SheetView, parse_range};

    fn fruit() -> (Vec<Row>, Vec<String>) {
        let columns = vec!["Fruit".to_string(), "Price".to_string()];
        let rows = [("apple", 1.5), ("pear", 2.0), ("apple", 3.0)]
            .iter()
            .map(|(name, price)| {
                Row::from([
                    ("Fruit".to_string(), CellValue::from(*name)),
                    ("Price".to_string(), CellValue::Number(*price)),
                ])
            })
            .collect();
        (rows, columns)
    }

    #[test]
    fn test_from_name() {
        let average = Some(Builtin::Aggregate(Aggregate::Average));
        assert_eq!(Builtin::from_name("AVG"), average);
        assert_eq!(Builtin::from_name("AVERAGE"), average);
        assert_eq!(Builtin::from_name("sum"), None);
        assert_eq!(Builtin::SumIf.sheet_name(), "SUMIF");
    }

    #[test]
    fn test_every_builtin_is_described() {
        for info in BUILTINS {
            assert!(!info.description.is_empty(), "{}", info.sheet_name);
            assert_eq!(Builtin::from_name(info.sheet_name), Some(info.builtin));
        }
    }

    #[test]
    fn test_aggregate() {
        let values = [1.0, 2.0, 3.0];
        assert_eq!(aggregate(Aggregate::Sum, &values), 6.0);
        assert_eq!(aggregate(Aggregate::Average, &values), 2.0);
        assert_eq!(aggregate(Aggregate::Min, &values), 1.0);
        assert_eq!(aggregate(Aggregate::Max, &values), 3.0);
        assert_eq!(aggregate(Aggregate::Count, &values), 3.0);
        assert_eq!(aggregate(Aggregate::Max, &[]), 0.0);
    }

    #[test]
    fn test_vlookup() {
        let (rows, columns) = fruit();
        let view = SheetView::new(&rows, &columns);
        let table = parse_range("A1:B3").unwrap();
        assert_eq!(vlookup("pear", &table, 2, &view), Ok(CellRef::new(1, 1)));
        assert_eq!(vlookup("plum", &table, 2, &view), Err(CellError::NotAvailable));
        assert_eq!(vlookup("pear", &table, 3, &view), Err(CellError::Ref));
        assert_eq!(vlookup("pear", &table, usize::MAX, &view), Err(CellError::Ref));
    }

    #[test]
    fn test_index() {
        let (rows, columns) = fruit();
        let view = SheetView::new(&rows, &columns);
        let range = parse_range("A2:B3").unwrap();
        assert_eq!(index(&range, 2, 2, &view), Ok(CellRef::new(1, 2)));
        assert_eq!(index(&range, 3, 1, &view), Err(CellError::Ref));
        assert_eq!(index(&range, 0, 1, &view), Err(CellError::Ref));
    }

    #[test]
    fn test_match_position() {
        let (rows, columns) = fruit();
        let view = SheetView::new(&rows, &columns);
        let range = parse_range("A1:A3").unwrap();
        assert_eq!(match_position("apple", &range, 1, &view), Ok(1));
        assert_eq!(match_position("apple", &range, -1, &view), Ok(3));
        assert_eq!(match_position("kiwi", &range, 0, &view), Err(CellError::NotAvailable));
    }
}
