//! Header-indexed tables and bulk edit reconciliation.
//!
//! # Responsibility
//! - Map column names to physical offsets through the header row.
//! - Apply sparse edit sets to an in-memory copy of a persisted table.
//!
//! # Invariants
//! - Physical row 0 is the header; data row `i` lives at physical row `i + 1`.
//! - Reconciliation never touches cells outside the edit set.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod grid;
pub mod reconcile;

pub use grid::{physical_row, Grid, HeaderIndex, HEADER_ROWS};
pub use reconcile::{apply_cell_edit, apply_edits, PendingEdits, ReconcileReport};

/// Lookup failures on a header-indexed table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableError {
    /// Header row has no column with this name.
    ColumnNotFound(String),
    /// Data row index is past the last data row.
    RowOutOfRange { row_index: usize, data_rows: usize },
}

impl Display for TableError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ColumnNotFound(name) => write!(f, "column not found: `{name}`"),
            Self::RowOutOfRange {
                row_index,
                data_rows,
            } => write!(
                f,
                "row index {row_index} out of range (table has {data_rows} data rows)"
            ),
        }
    }
}

impl Error for TableError {}
