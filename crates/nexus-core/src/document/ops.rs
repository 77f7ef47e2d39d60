use super::Sheet;
use crate::error::{NexusError, Result};
use nexus_engine::engine::{
    CellRef, CellValue, RangeRef, SolverSettings, cells_in_bounds, goal_seek_with,
};

const NEW_COLUMN_NAME: &str = "New Column";

impl Sheet {
    /// Append a blank row, returning its index.
    pub fn add_row(&mut self) -> usize {
        let row = self.blank_row();
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Insert a blank row so that it ends up at `index`.
    pub fn insert_row(&mut self, index: usize) -> Result<()> {
        if index > self.rows.len() {
            return Err(NexusError::RowOutOfBounds(index));
        }
        let row = self.blank_row();
        self.rows.insert(index, row);
        Ok(())
    }

    pub fn delete_row(&mut self, index: usize) -> Result<()> {
        if index >= self.rows.len() {
            return Err(NexusError::RowOutOfBounds(index));
        }
        self.rows.remove(index);
        Ok(())
    }

    /// Append a named column, back-filling every row with an empty value.
    pub fn add_column(&mut self, name: impl Into<String>) -> Result<usize> {
        let name = name.into();
        self.check_new_column_name(&name)?;
        self.columns.push(name.clone());
        for row in &mut self.rows {
            row.insert(name.clone(), CellValue::Empty);
        }
        Ok(self.columns.len() - 1)
    }

    /// Insert a column with a generated name right after `after` (or at the
    /// end when `after` is past the last column). Returns the new name.
    pub fn insert_column(&mut self, after: usize) -> String {
        let mut name = NEW_COLUMN_NAME.to_string();
        let mut counter = 1;
        while self.column_index(&name).is_some() {
            name = format!("{} {}", NEW_COLUMN_NAME, counter);
            counter += 1;
        }

        let index = (after + 1).min(self.columns.len());
        self.columns.insert(index, name.clone());
        for row in &mut self.rows {
            row.insert(name.clone(), CellValue::Empty);
        }
        name
    }

    /// Rename a column, re-keying every row.
    pub fn rename_column(&mut self, old: &str, new: &str) -> Result<()> {
        let index = self
            .column_index(old)
            .ok_or_else(|| NexusError::UnknownColumn(old.to_string()))?;
        if old == new {
            return Ok(());
        }
        self.check_new_column_name(new)?;
        self.columns[index] = new.to_string();
        for row in &mut self.rows {
            let value = row.remove(old).unwrap_or_default();
            row.insert(new.to_string(), value);
        }
        Ok(())
    }

    pub fn delete_column(&mut self, name: &str) -> Result<()> {
        let index = self
            .column_index(name)
            .ok_or_else(|| NexusError::UnknownColumn(name.to_string()))?;
        self.columns.remove(index);
        for row in &mut self.rows {
            row.remove(name);
        }
        Ok(())
    }

    fn check_new_column_name(&self, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(NexusError::BlankColumnName);
        }
        if self.column_index(name).is_some() {
            return Err(NexusError::DuplicateColumn(name.to_string()));
        }
        Ok(())
    }

    /// Store a raw value in a cell.
    pub fn set_cell(&mut self, at: CellRef, value: CellValue) -> Result<()> {
        let key = self
            .columns
            .get(at.col)
            .ok_or(NexusError::OutOfBounds(at))?;
        let row = self.rows.get_mut(at.row).ok_or(NexusError::OutOfBounds(at))?;
        row.insert(key.clone(), value);
        Ok(())
    }

    pub fn set_cell_ref(&mut self, reference: &str, value: CellValue) -> Result<CellRef> {
        let at = self.resolve(reference)?;
        self.set_cell(at, value)?;
        Ok(at)
    }

    /// Store user input (`"12"`, `"=A1*2"`, `"text"`) in a cell.
    pub fn set_input(&mut self, reference: &str, input: &str) -> Result<CellRef> {
        self.set_cell_ref(reference, CellValue::from_input(input))
    }

    /// Empty every in-bounds cell of `range`.
    pub fn clear_range(&mut self, range: &RangeRef) {
        let cells: Vec<CellRef> = cells_in_bounds(range, &self.view()).collect();
        for at in cells {
            // In bounds by construction.
            let _ = self.set_cell(at, CellValue::Empty);
        }
    }

    /// Run goal seek against this sheet and, on success only, write the
    /// solved number into the changing cell. Returns the solved value.
    pub fn goal_seek(
        &mut self,
        target_ref: &str,
        target_value: f64,
        changing_ref: &str,
        settings: &SolverSettings,
    ) -> Result<f64> {
        if let (Ok(target), Ok(changing)) = (self.resolve(target_ref), self.resolve(changing_ref)) {
            if !self.reads_cell(target, changing) {
                log::warn!(
                    "{} does not reference {} directly; goal seek may not converge",
                    target,
                    changing
                );
            }
        }

        let solved = goal_seek_with(
            settings,
            target_ref,
            target_value,
            changing_ref,
            &self.rows,
            &self.columns,
        )
        .into_result()?;
        self.set_cell_ref(changing_ref, CellValue::Number(solved))?;
        Ok(solved)
    }

    /// Restore the row/column key invariant: add missing keys as empty and
    /// drop keys that are not columns.
    pub fn normalize(&mut self) {
        let columns = &self.columns;
        for row in &mut self.rows {
            row.retain(|key, _| columns.contains(key));
            for column in columns {
                row.entry(column.clone()).or_default();
            }
        }
    }
}
