//! Watch list: references whose values are tracked while editing.

use super::Sheet;
use nexus_engine::engine::{CellError, CellValue, EvalValue};

/// One row of the watch window.
#[derive(Clone, Debug, PartialEq)]
pub struct WatchEntry {
    pub reference: String,
    /// Evaluated value, `#REF!` when the reference is invalid or off-sheet
    pub value: EvalValue,
    /// Formula text when the watched cell holds a formula
    pub formula: Option<String>,
}

impl Sheet {
    /// Start watching `reference`. Returns false if it was already watched.
    pub fn add_watch(&mut self, reference: &str) -> bool {
        let reference = reference.trim().to_uppercase();
        if reference.is_empty() || self.watched_cells.contains(&reference) {
            return false;
        }
        self.watched_cells.push(reference);
        true
    }

    /// Stop watching `reference`. Returns false if it was not watched.
    pub fn remove_watch(&mut self, reference: &str) -> bool {
        let reference = reference.trim().to_uppercase();
        let before = self.watched_cells.len();
        self.watched_cells.retain(|w| *w != reference);
        self.watched_cells.len() != before
    }

    pub fn watch_entries(&self) -> Vec<WatchEntry> {
        self.watched_cells
            .iter()
            .map(|reference| self.watch_entry(reference))
            .collect()
    }

    fn watch_entry(&self, reference: &str) -> WatchEntry {
        let (value, formula) = match self.resolve(reference) {
            Ok(at) => {
                let formula = self
                    .get_cell(at)
                    .filter(|raw| raw.is_formula())
                    .map(CellValue::raw_text);
                (self.evaluate(at), formula)
            }
            Err(_) => (EvalValue::Error(CellError::Ref), None),
        };
        WatchEntry {
            reference: reference.to_string(),
            value,
            formula,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_watch_is_ordered_and_deduplicated() {
        let mut sheet = Sheet::new("S", ["A"]);
        assert!(sheet.add_watch("b2"));
        assert!(sheet.add_watch("A1"));
        assert!(!sheet.add_watch(" B2 "));
        assert!(!sheet.add_watch(""));
        assert_eq!(sheet.watched_cells, vec!["B2", "A1"]);

        assert!(sheet.remove_watch("b2"));
        assert!(!sheet.remove_watch("B2"));
        assert_eq!(sheet.watched_cells, vec!["A1"]);
    }

    #[test]
    fn test_watch_entries() {
        let mut sheet = Sheet::new("S", ["A", "B"]);
        sheet.add_row();
        sheet.set_input("A1", "4").unwrap();
        sheet.set_input("B1", "=A1*3").unwrap();
        for reference in ["B1", "A1", "C1", "NOPE"] {
            sheet.add_watch(reference);
        }

        let entries = sheet.watch_entries();
        assert_eq!(
            entries[0],
            WatchEntry {
                reference: "B1".into(),
                value: EvalValue::Number(12.0),
                formula: Some("=A1*3".into()),
            }
        );
        assert_eq!(entries[1].value, EvalValue::Number(4.0));
        assert_eq!(entries[1].formula, None);
        assert_eq!(entries[2].value, EvalValue::Error(CellError::Ref));
        assert_eq!(entries[3].value.to_string(), "#REF!");
    }
}
