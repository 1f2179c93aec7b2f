//! Tabular store boundary and its backends.
//!
//! # Responsibility
//! - Define the read-all / write-all contract the record store relies on.
//! - Provide Google Sheets, SQLite and in-memory implementations.
//!
//! # Invariants
//! - Named sub-tables that do not exist fail with `StoreError::NotFound`.
//! - `write_grid` overwrites only the rectangle covered by the grid.
//! - No backend retries a failed call.

use crate::config::BackendConfig;
use crate::db::DbError;
use crate::table::Grid;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

pub mod google;
mod google_auth;
pub mod memory;
pub mod sqlite;

pub use google::{GoogleSheetsStore, SpreadsheetLocator};
pub use google_auth::ServiceAccountKey;
pub use memory::{MemoryTableStore, StoreStats};
pub use sqlite::SqliteTableStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure talking to a table store.
#[derive(Debug)]
pub enum StoreError {
    /// Named sheet (or spreadsheet) does not exist.
    NotFound(String),
    /// Sheet creation raced with an existing sheet of the same name.
    AlreadyExists(String),
    /// Network, quota or backend failure.
    Unavailable(String),
    /// Credentials were rejected or could not be used.
    Auth(String),
    /// Backend answered with a payload this client cannot interpret.
    InvalidResponse(String),
    /// Local SQLite backend failure.
    Db(DbError),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(name) => write!(f, "sheet not found: {name}"),
            Self::AlreadyExists(name) => write!(f, "sheet already exists: {name}"),
            Self::Unavailable(message) => write!(f, "table store unavailable: {message}"),
            Self::Auth(message) => write!(f, "table store authentication failed: {message}"),
            Self::InvalidResponse(message) => {
                write!(f, "invalid table store response: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// 0-based physical cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRef {
    pub row: usize,
    pub col: usize,
}

impl CellRef {
    /// Top-left cell (`A1`).
    pub const ORIGIN: CellRef = CellRef { row: 0, col: 0 };

    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// A1 notation, e.g. `CellRef::new(1, 27)` is `AB2`.
    pub fn to_a1(self) -> String {
        format!("{}{}", column_letters(self.col), self.row + 1)
    }
}

fn column_letters(col: usize) -> String {
    let mut letters = Vec::new();
    let mut remaining = col + 1;
    while remaining > 0 {
        let rem = (remaining - 1) % 26;
        letters.push(char::from(b'A' + rem as u8));
        remaining = (remaining - 1) / 26;
    }
    letters.iter().rev().collect()
}

/// Remote tabular store reachable through whole-sheet primitives.
pub trait TableStore: Send + Sync {
    /// Short backend label used in logs and health output.
    fn backend_name(&self) -> &'static str;

    fn has_sheet(&self, name: &str) -> StoreResult<bool>;

    /// Creates a sheet whose first row is `header`.
    fn create_sheet(&self, name: &str, header: &[String]) -> StoreResult<()>;

    /// Reads the whole sheet, header included.
    fn read_grid(&self, name: &str) -> StoreResult<Grid>;

    /// Overwrites the rectangle starting at `origin` with `grid`.
    fn write_grid(&self, name: &str, origin: CellRef, grid: &Grid) -> StoreResult<()>;

    /// Appends one row after the last non-empty row.
    fn append_row(&self, name: &str, values: &[String]) -> StoreResult<()>;

    /// Removes every cell of the sheet, keeping the sheet itself.
    fn clear_sheet(&self, name: &str) -> StoreResult<()>;

    fn header(&self, name: &str) -> StoreResult<Vec<String>> {
        Ok(self.read_grid(name)?.header().to_vec())
    }

    fn all_records(&self, name: &str) -> StoreResult<Vec<BTreeMap<String, String>>> {
        Ok(self.read_grid(name)?.records())
    }
}

/// Opens the backend selected by configuration.
///
/// # Errors
/// - Credential, network or database failures from the chosen backend.
pub fn open_store(config: &BackendConfig) -> StoreResult<Arc<dyn TableStore>> {
    match config {
        BackendConfig::Google {
            credentials,
            spreadsheet,
        } => {
            let key = ServiceAccountKey::load(credentials)?;
            let store = GoogleSheetsStore::connect(key, spreadsheet.clone())?;
            Ok(Arc::new(store))
        }
        BackendConfig::Sqlite { path } => Ok(Arc::new(SqliteTableStore::open(path)?)),
        BackendConfig::Memory => Ok(Arc::new(MemoryTableStore::new())),
    }
}
