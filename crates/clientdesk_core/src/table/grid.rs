//! Two-dimensional string table with a header row.

use super::TableError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Number of physical rows occupied by the header.
pub const HEADER_ROWS: usize = 1;

/// Physical row for a 0-based data row index.
pub fn physical_row(row_index: usize) -> usize {
    row_index + HEADER_ROWS
}

/// Raw table as persisted: row 0 is the header, the rest are data rows.
///
/// Rows may be ragged; remote stores commonly trim trailing empty cells.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Grid {
    rows: Vec<Vec<String>>,
}

impl Grid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows }
    }

    pub fn with_header(header: Vec<String>) -> Self {
        Self { rows: vec![header] }
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Vec<String>> {
        self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Header row, or an empty slice for an empty table.
    pub fn header(&self) -> &[String] {
        self.rows.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn header_index(&self) -> HeaderIndex {
        HeaderIndex::from_header(self.header())
    }

    /// Number of data rows beneath the header.
    pub fn data_len(&self) -> usize {
        self.rows.len().saturating_sub(HEADER_ROWS)
    }

    pub fn data_rows(&self) -> &[Vec<String>] {
        self.rows.get(HEADER_ROWS..).unwrap_or(&[])
    }

    pub fn data_row(&self, row_index: usize) -> Option<&[String]> {
        self.rows.get(physical_row(row_index)).map(Vec::as_slice)
    }

    /// Data rows as header-keyed maps.
    ///
    /// Short rows are padded with `""`; cells beyond the header are ignored.
    /// Blank header names are skipped and duplicates keep the first column.
    pub fn records(&self) -> Vec<BTreeMap<String, String>> {
        let index = self.header_index();
        self.data_rows()
            .iter()
            .map(|row| {
                index
                    .columns()
                    .map(|(name, offset)| {
                        let value = row.get(offset).cloned().unwrap_or_default();
                        (name.to_string(), value)
                    })
                    .collect()
            })
            .collect()
    }

    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Overwrites one physical cell, padding the row (and table) as needed.
    pub fn set_cell(&mut self, row: usize, col: usize, value: impl Into<String>) {
        if self.rows.len() <= row {
            self.rows.resize_with(row + 1, Vec::new);
        }
        let cells = &mut self.rows[row];
        if cells.len() <= col {
            cells.resize(col + 1, String::new());
        }
        cells[col] = value.into();
    }
}

/// Column name to physical offset mapping for one header row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderIndex {
    positions: HashMap<String, usize>,
    ordered: Vec<(String, usize)>,
}

impl HeaderIndex {
    pub fn from_header(header: &[String]) -> Self {
        let mut index = Self::default();
        for (offset, name) in header.iter().enumerate() {
            if name.trim().is_empty() || index.positions.contains_key(name) {
                continue;
            }
            index.positions.insert(name.clone(), offset);
            index.ordered.push((name.clone(), offset));
        }
        index
    }

    /// Physical offset of `column_name`.
    ///
    /// # Errors
    /// - `TableError::ColumnNotFound` when the header has no such name.
    pub fn resolve(&self, column_name: &str) -> Result<usize, TableError> {
        self.positions
            .get(column_name)
            .copied()
            .ok_or_else(|| TableError::ColumnNotFound(column_name.to_string()))
    }

    pub fn contains(&self, column_name: &str) -> bool {
        self.positions.contains_key(column_name)
    }

    /// Resolvable columns in header order.
    pub fn columns(&self) -> impl Iterator<Item = (&str, usize)> {
        self.ordered
            .iter()
            .map(|(name, offset)| (name.as_str(), *offset))
    }

    pub fn len(&self) -> usize {
        self.ordered.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ordered.is_empty()
    }
}
