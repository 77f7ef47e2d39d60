//! Aggregates over a selection and per-column numeric extents.

use super::Sheet;
use nexus_engine::engine::{CellValue, EvalValue, RangeRef, cells_in_bounds};

/// Status-bar statistics for a rectangular selection.
///
/// `count` includes every non-blank evaluated value (text and errors too);
/// the numeric fields are None when the selection holds no numbers.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SelectionStats {
    pub count: usize,
    pub sum: Option<f64>,
    pub avg: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Smallest and largest literal number stored in a column.
#[derive(Clone, Debug, PartialEq)]
pub struct ColumnExtent {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

fn round2(n: f64) -> f64 {
    (n * 100.0 + 0.5).floor() / 100.0
}

impl Sheet {
    /// Evaluate every in-bounds cell of `range` and summarise the results.
    pub fn selection_stats(&self, range: &RangeRef) -> SelectionStats {
        let view = self.view();
        let mut count = 0;
        let mut numbers = Vec::new();
        for at in cells_in_bounds(range, &view) {
            let value = self.evaluate(at);
            if value.is_blank() {
                continue;
            }
            count += 1;
            if let Some(n) = numeric(&value) {
                numbers.push(n);
            }
        }

        if numbers.is_empty() {
            return SelectionStats {
                count,
                ..SelectionStats::default()
            };
        }
        let sum: f64 = numbers.iter().sum();
        SelectionStats {
            count,
            sum: Some(round2(sum)),
            avg: Some(round2(sum / numbers.len() as f64)),
            min: numbers.iter().copied().reduce(f64::min),
            max: numbers.iter().copied().reduce(f64::max),
        }
    }

    /// Min/max of the raw numeric values in each column, in column order.
    /// Formulas are not evaluated; columns without numbers are left out.
    pub fn column_extents(&self) -> Vec<ColumnExtent> {
        self.columns
            .iter()
            .filter_map(|column| {
                let mut values = self
                    .rows
                    .iter()
                    .filter_map(|row| row.get(column).and_then(CellValue::as_number));
                let first = values.next()?;
                let (min, max) = values.fold((first, first), |(lo, hi), n| (lo.min(n), hi.max(n)));
                Some(ColumnExtent {
                    column: column.clone(),
                    min,
                    max,
                })
            })
            .collect()
    }
}

fn numeric(value: &EvalValue) -> Option<f64> {
    match value {
        EvalValue::Error(_) => None,
        other => other.as_number(),
    }
}
