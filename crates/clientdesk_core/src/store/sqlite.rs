//! SQLite-backed table store for local development and offline use.
//!
//! # Responsibility
//! - Persist sheets as sparse `(sheet, row, col) -> value` cells.
//! - Mirror the remote store's whole-sheet primitives.
//!
//! # Invariants
//! - Every cell belongs to a registered sheet (foreign key).
//! - Multi-cell writes commit atomically.

use super::{CellRef, StoreError, StoreResult, TableStore};
use crate::db::{open_db, open_db_in_memory};
use crate::table::Grid;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, Transaction};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

pub struct SqliteTableStore {
    conn: Mutex<Connection>,
}

impl SqliteTableStore {
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        Ok(Self::from_connection(open_db(path)?))
    }

    pub fn open_in_memory() -> StoreResult<Self> {
        Ok(Self::from_connection(open_db_in_memory()?))
    }

    /// Wraps a connection that already has migrations applied.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Mutex::new(conn),
        }
    }

    fn conn(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Unavailable("sqlite store lock poisoned".to_string()))
    }
}

impl TableStore for SqliteTableStore {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    fn has_sheet(&self, name: &str) -> StoreResult<bool> {
        let conn = self.conn()?;
        sheet_exists(&conn, name)
    }

    fn create_sheet(&self, name: &str, header: &[String]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        match tx.execute("INSERT INTO sheets (name) VALUES (?1);", [name]) {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::AlreadyExists(name.to_string()));
            }
            Err(err) => return Err(err.into()),
        }
        upsert_row(&tx, name, 0, 0, header)?;
        tx.commit()?;
        Ok(())
    }

    fn read_grid(&self, name: &str) -> StoreResult<Grid> {
        let conn = self.conn()?;
        require_sheet(&conn, name)?;

        let mut stmt = conn.prepare(
            "SELECT row_idx, col_idx, value
             FROM cells
             WHERE sheet = ?1
             ORDER BY row_idx ASC, col_idx ASC;",
        )?;
        let mut rows = stmt.query([name])?;
        let mut grid = Grid::default();
        while let Some(row) = rows.next()? {
            let row_idx: i64 = row.get(0)?;
            let col_idx: i64 = row.get(1)?;
            let value: String = row.get(2)?;
            let (Ok(row_idx), Ok(col_idx)) = (usize::try_from(row_idx), usize::try_from(col_idx))
            else {
                return Err(StoreError::InvalidResponse(format!(
                    "negative cell address ({row_idx}, {col_idx}) in sheet `{name}`"
                )));
            };
            grid.set_cell(row_idx, col_idx, value);
        }
        Ok(grid)
    }

    fn write_grid(&self, name: &str, origin: CellRef, grid: &Grid) -> StoreResult<()> {
        let mut conn = self.conn()?;
        require_sheet(&conn, name)?;
        let tx = conn.transaction()?;
        for (row_offset, row) in grid.rows().iter().enumerate() {
            upsert_row(&tx, name, origin.row + row_offset, origin.col, row)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn append_row(&self, name: &str, values: &[String]) -> StoreResult<()> {
        let mut conn = self.conn()?;
        require_sheet(&conn, name)?;
        let tx = conn.transaction()?;
        let next_row: i64 = tx.query_row(
            "SELECT COALESCE(MAX(row_idx) + 1, 0) FROM cells WHERE sheet = ?1;",
            [name],
            |row| row.get(0),
        )?;
        upsert_row(&tx, name, to_index(next_row)?, 0, values)?;
        tx.commit()?;
        Ok(())
    }

    fn clear_sheet(&self, name: &str) -> StoreResult<()> {
        let conn = self.conn()?;
        require_sheet(&conn, name)?;
        conn.execute("DELETE FROM cells WHERE sheet = ?1;", [name])?;
        Ok(())
    }
}

fn sheet_exists(conn: &Connection, name: &str) -> StoreResult<bool> {
    let found = conn
        .query_row("SELECT 1 FROM sheets WHERE name = ?1;", [name], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn require_sheet(conn: &Connection, name: &str) -> StoreResult<()> {
    if sheet_exists(conn, name)? {
        Ok(())
    } else {
        Err(StoreError::NotFound(name.to_string()))
    }
}

fn upsert_row(
    tx: &Transaction<'_>,
    sheet: &str,
    row: usize,
    first_col: usize,
    values: &[String],
) -> StoreResult<()> {
    let mut stmt = tx.prepare_cached(
        "INSERT INTO cells (sheet, row_idx, col_idx, value)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT (sheet, row_idx, col_idx) DO UPDATE SET value = excluded.value;",
    )?;
    let row = to_sql_index(row)?;
    for (offset, value) in values.iter().enumerate() {
        let col = to_sql_index(first_col + offset)?;
        stmt.execute(params![sheet, row, col, value.as_str()])?;
    }
    Ok(())
}

fn to_sql_index(value: usize) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidResponse(format!("cell index {value} exceeds i64")))
}

fn to_index(value: i64) -> StoreResult<usize> {
    usize::try_from(value)
        .map_err(|_| StoreError::InvalidResponse(format!("invalid row index {value}")))
}

#[cfg(test)]
mod tests {
    use super::SqliteTableStore;
    use crate::store::{CellRef, StoreError, TableStore};
    use crate::table::Grid;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn create_append_and_read_back() {
        let store = SqliteTableStore::open_in_memory().expect("open store");
        store
            .create_sheet("Clients", &strings(&["Name", "Email"]))
            .expect("create sheet");
        store
            .append_row("Clients", &strings(&["A", "a@x"]))
            .expect("append");
        store.append_row("Clients", &strings(&["B"])).expect("append");

        let grid = store.read_grid("Clients").expect("read");
        assert_eq!(
            grid.rows(),
            &[
                strings(&["Name", "Email"]),
                strings(&["A", "a@x"]),
                strings(&["B"]),
            ]
        );
    }

    #[test]
    fn write_grid_upserts_from_origin() {
        let store = SqliteTableStore::open_in_memory().expect("open store");
        store
            .create_sheet("S", &strings(&["a", "b"]))
            .expect("create sheet");
        store
            .write_grid("S", CellRef::new(1, 1), &Grid::new(vec![strings(&["x", "y"])]))
            .expect("write");
        let grid = store.read_grid("S").expect("read");
        assert_eq!(grid.rows()[1], strings(&["", "x", "y"]));
    }

    #[test]
    fn clear_keeps_sheet_and_unknown_sheet_is_not_found() {
        let store = SqliteTableStore::open_in_memory().expect("open store");
        store.create_sheet("S", &strings(&["a"])).expect("create");
        store.clear_sheet("S").expect("clear");
        assert!(store.read_grid("S").expect("read").is_empty());
        assert!(matches!(
            store.read_grid("missing"),
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            store.create_sheet("S", &strings(&["a"])),
            Err(StoreError::AlreadyExists(_))
        ));
    }
}
