//! SQLite file layout for the local table-store backend.
//!
//! A workbook is two tables:
//! - `sheets(name, created_at)` lists worksheets; a sheet exists once it has
//!   a row here, even with no cells.
//! - `cells(sheet, row_idx, col_idx, value)` stores written cells sparsely,
//!   keyed by 0-based physical position. Row 0 is the header.
//!
//! Deleting a sheet cascades to its cells. `SqliteTableStore` rebuilds a
//! grid from the cells and pads gaps with empty strings.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - No cell is read or written before migrations succeed.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "table store schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
