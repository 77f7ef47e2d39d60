//! Spreadsheet engine API.
//!
//! This module provides the computation engine for the spreadsheet:
//!
//! - [`CellValue`], [`Row`], [`CellSource`] - Data structures for cell storage
//! - [`CellRef`], [`RangeRef`] - Cell reference parsing (A1 notation <-> row/col indices)
//! - [`values_in_range`], [`sum_if`] - Range resolution
//! - [`parse`] - Formula tokenizer and parser producing an [`Expr`] tree
//! - [`evaluate_cell_value`] - Evaluate a raw cell value to an [`EvalValue`]
//! - [`goal_seek`] - Secant-method solver over a formula cell
//! - [`format_value`] - Format values for display

mod cell;
mod cell_ref;
mod error;
mod eval;
mod format;
mod goal_seek;
mod parser;
mod range;

pub use cell::{
    CellSource, CellValue, FORMULA_MARKER, Row, ShadowRow, SheetView, parse_leading_number,
};
pub use cell_ref::{
    CellRef, RangeRef, column_index_to_letters, letters_to_column_index, parse_cell_reference,
    parse_range,
};
pub use error::FormulaError;
pub use eval::{
    CellError, EvalValue, RawValueResolver, ReferenceResolver, classify_literal,
    evaluate_cell_value, evaluate_with, evaluate_with_resolver, round4,
};
pub use format::{format_number, format_value};
pub use goal_seek::{GoalSeekError, GoalSeekResult, SolverSettings, goal_seek, goal_seek_with};
pub use parser::{Expr, MAX_DEPTH, MAX_OPERATORS, Op, parse, referenced_cells, references_cell};
pub use range::{Criterion, cells_in_bounds, sum_if, values_in, values_in_range};
