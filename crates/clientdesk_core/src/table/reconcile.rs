//! Bulk edit reconciliation over a header-indexed table.
//!
//! # Responsibility
//! - Apply a sparse `(row, column) -> value` edit set to an in-memory table.
//! - Report edits that could not be applied without aborting the batch.
//!
//! # Invariants
//! - Only cells named by the edit set change.
//! - Unknown columns and out-of-range rows are skipped, never fatal.
//! - Callers persist the result with a single write.

use super::grid::{physical_row, Grid, HeaderIndex};
use super::TableError;
use crate::model::client::RowIndex;
use std::collections::BTreeMap;

/// Edits keyed by data row index, then column name.
pub type PendingEdits = BTreeMap<RowIndex, BTreeMap<String, String>>;

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Cells overwritten in the in-memory copy.
    pub applied: usize,
    /// `(row_index, column)` pairs naming a column absent from the header.
    pub skipped_columns: Vec<(RowIndex, String)>,
    /// Row indices past the last data row.
    pub skipped_rows: Vec<RowIndex>,
}

impl ReconcileReport {
    pub fn skipped(&self) -> usize {
        self.skipped_columns.len() + self.skipped_rows.len()
    }
}

/// Overwrites one data cell addressed by row index and column name.
///
/// # Errors
/// - `TableError::ColumnNotFound` when `column` is absent from the header.
/// - `TableError::RowOutOfRange` when `row_index` has no data row.
pub fn apply_cell_edit(
    grid: &mut Grid,
    index: &HeaderIndex,
    row_index: RowIndex,
    column: &str,
    value: &str,
) -> Result<(), TableError> {
    let data_rows = grid.data_len();
    if row_index >= data_rows {
        return Err(TableError::RowOutOfRange {
            row_index,
            data_rows,
        });
    }
    let offset = index.resolve(column)?;
    grid.set_cell(physical_row(row_index), offset, value);
    Ok(())
}

/// Applies every edit in `edits` to `grid`.
///
/// The header is resolved once up front; the header row itself is never
/// addressable because data row `0` maps to physical row `1`.
pub fn apply_edits(grid: &mut Grid, edits: &PendingEdits) -> ReconcileReport {
    let index = grid.header_index();
    let mut report = ReconcileReport::default();

    for (&row_index, columns) in edits {
        for (column, value) in columns {
            match apply_cell_edit(grid, &index, row_index, column, value) {
                Ok(()) => report.applied += 1,
                Err(TableError::ColumnNotFound(name)) => {
                    report.skipped_columns.push((row_index, name));
                }
                Err(TableError::RowOutOfRange { .. }) => {
                    if report.skipped_rows.last() != Some(&row_index) {
                        report.skipped_rows.push(row_index);
                    }
                }
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::{apply_edits, PendingEdits};
    use crate::table::Grid;
    use std::collections::BTreeMap;

    fn grid(rows: &[&[&str]]) -> Grid {
        Grid::new(
            rows.iter()
                .map(|row| row.iter().map(|cell| (*cell).to_string()).collect())
                .collect(),
        )
    }

    fn edit(row: usize, column: &str, value: &str) -> PendingEdits {
        let mut columns = BTreeMap::new();
        columns.insert(column.to_string(), value.to_string());
        let mut edits = PendingEdits::new();
        edits.insert(row, columns);
        edits
    }

    #[test]
    fn row_zero_is_first_data_row() {
        let mut table = grid(&[&["Name"], &["A"], &["B"], &["C"]]);
        let report = apply_edits(&mut table, &edit(0, "Name", "Z"));
        assert_eq!(report.applied, 1);
        assert_eq!(table, grid(&[&["Name"], &["Z"], &["B"], &["C"]]));
    }

    #[test]
    fn out_of_range_row_is_reported_once() {
        let mut table = grid(&[&["Name", "Email"], &["A", "a@x"]]);
        let mut edits = edit(5, "Name", "Z");
        edits
            .get_mut(&5)
            .expect("row 5 present")
            .insert("Email".to_string(), "z@x".to_string());
        let before = table.clone();
        let report = apply_edits(&mut table, &edits);
        assert_eq!(report.skipped_rows, vec![5]);
        assert_eq!(report.applied, 0);
        assert_eq!(table, before);
    }

    #[test]
    fn empty_header_skips_every_column() {
        let mut table = Grid::default();
        let report = apply_edits(&mut table, &edit(0, "Name", "Z"));
        assert_eq!(report.skipped(), 1);
        assert!(table.is_empty());
    }
}
