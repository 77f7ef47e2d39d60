use crate::error::{NexusError, Result};
use nexus_engine::engine::{
    CellRef, CellSource, CellValue, EvalValue, Expr, Row, SheetView, column_index_to_letters,
    evaluate_with, parse, parse_cell_reference, referenced_cells, references_cell,
};
use serde::{Deserialize, Serialize};

/// A named grid of columns and rows.
///
/// Invariant: every row has exactly one entry per column name. Edit
/// operations in this crate maintain it; call [`Sheet::normalize`] after
/// building a sheet by hand or deserializing one.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
    /// Watched references, upper-cased, in insertion order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watched_cells: Vec<String>,
}

impl Sheet {
    /// Create an empty sheet (no rows) with the given column names.
    pub fn new<I, S>(name: impl Into<String>, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Sheet {
            name: name.into(),
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
            watched_cells: Vec::new(),
        }
    }

    /// Create a sheet whose columns are named `A`, `B`, ... like their letters.
    pub fn with_letter_columns(name: impl Into<String>, count: usize) -> Self {
        Sheet::new(name, (0..count).map(column_index_to_letters))
    }

    pub fn view(&self) -> SheetView<'_> {
        SheetView::new(&self.rows, &self.columns)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn col_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Parse a reference and check it lies inside the sheet.
    pub fn resolve(&self, reference: &str) -> Result<CellRef> {
        let at = parse_cell_reference(reference.trim())
            .ok_or_else(|| NexusError::InvalidReference(reference.to_string()))?;
        if !self.view().in_bounds(at) {
            return Err(NexusError::OutOfBounds(at));
        }
        Ok(at)
    }

    /// Raw content of a cell, None if outside the sheet.
    pub fn get_cell(&self, at: CellRef) -> Option<&CellValue> {
        let key = self.columns.get(at.col)?;
        self.rows.get(at.row)?.get(key)
    }

    /// Raw content of a cell by reference string.
    pub fn cell_at(&self, reference: &str) -> Result<&CellValue> {
        let at = self.resolve(reference)?;
        self.get_cell(at).ok_or(NexusError::OutOfBounds(at))
    }

    /// Evaluated value of the cell at `at`. Cells outside the sheet evaluate
    /// like empty cells.
    pub fn evaluate(&self, at: CellRef) -> EvalValue {
        match self.get_cell(at) {
            Some(raw) => evaluate_with(raw, &self.view()),
            None => EvalValue::Null,
        }
    }

    pub fn evaluate_ref(&self, reference: &str) -> Result<EvalValue> {
        let at = self.resolve(reference)?;
        Ok(self.evaluate(at))
    }

    /// Evaluate free-standing cell content (a literal or `=formula`) as if it
    /// were typed into a cell of this sheet.
    pub fn evaluate_input(&self, input: &str) -> EvalValue {
        evaluate_with(&CellValue::from_input(input), &self.view())
    }

    /// Cells the formula at `at` reads directly, ranges expanded and clipped
    /// to the sheet. Empty for literals and formulas that do not parse.
    pub fn precedents(&self, at: CellRef) -> Vec<CellRef> {
        self.parsed_formula(at)
            .map(|expr| referenced_cells(&expr, &self.view()))
            .unwrap_or_default()
    }

    /// True if the formula at `at` reads `cell`, directly or inside a range.
    pub fn reads_cell(&self, at: CellRef, cell: CellRef) -> bool {
        self.parsed_formula(at)
            .is_some_and(|expr| references_cell(&expr, cell))
    }

    fn parsed_formula(&self, at: CellRef) -> Option<Expr> {
        let body = self.get_cell(at)?.formula_body()?;
        parse(&body.trim().to_uppercase()).ok()
    }

    /// A row with an empty value for every column.
    pub(crate) fn blank_row(&self) -> Row {
        self.columns
            .iter()
            .map(|c| (c.clone(), CellValue::Empty))
            .collect()
    }
}
