//! In-process table store with call accounting.
//!
//! Used by tests and by the `memory` backend for demos. Every primitive
//! bumps a counter so callers can assert how many round trips an operation
//! would cost against a remote store.

use super::{CellRef, StoreError, StoreResult, TableStore};
use crate::table::Grid;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// Snapshot of primitive call counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
    pub reads: usize,
    pub writes: usize,
    pub appends: usize,
    pub clears: usize,
    pub creates: usize,
}

#[derive(Debug, Default)]
pub struct MemoryTableStore {
    sheets: Mutex<BTreeMap<String, Grid>>,
    reads: AtomicUsize,
    writes: AtomicUsize,
    appends: AtomicUsize,
    clears: AtomicUsize,
    creates: AtomicUsize,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a sheet without counting it as a call.
    pub fn with_sheet(self, name: impl Into<String>, grid: Grid) -> Self {
        if let Ok(mut sheets) = self.sheets.lock() {
            sheets.insert(name.into(), grid);
        }
        self
    }

    /// Current content of a sheet, without counting it as a read.
    pub fn snapshot(&self, name: &str) -> Option<Grid> {
        self.sheets.lock().ok()?.get(name).cloned()
    }

    pub fn stats(&self) -> StoreStats {
        StoreStats {
            reads: self.reads.load(Ordering::SeqCst),
            writes: self.writes.load(Ordering::SeqCst),
            appends: self.appends.load(Ordering::SeqCst),
            clears: self.clears.load(Ordering::SeqCst),
            creates: self.creates.load(Ordering::SeqCst),
        }
    }

    pub fn reset_stats(&self) {
        for counter in [
            &self.reads,
            &self.writes,
            &self.appends,
            &self.clears,
            &self.creates,
        ] {
            counter.store(0, Ordering::SeqCst);
        }
    }

    fn sheets(&self) -> StoreResult<MutexGuard<'_, BTreeMap<String, Grid>>> {
        self.sheets
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))
    }
}

impl TableStore for MemoryTableStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    fn has_sheet(&self, name: &str) -> StoreResult<bool> {
        Ok(self.sheets()?.contains_key(name))
    }

    fn create_sheet(&self, name: &str, header: &[String]) -> StoreResult<()> {
        self.creates.fetch_add(1, Ordering::SeqCst);
        let mut sheets = self.sheets()?;
        if sheets.contains_key(name) {
            return Err(StoreError::AlreadyExists(name.to_string()));
        }
        sheets.insert(name.to_string(), Grid::with_header(header.to_vec()));
        Ok(())
    }

    fn read_grid(&self, name: &str) -> StoreResult<Grid> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.sheets()?
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    fn write_grid(&self, name: &str, origin: CellRef, grid: &Grid) -> StoreResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut sheets = self.sheets()?;
        let target = sheets
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        for (row_offset, row) in grid.rows().iter().enumerate() {
            for (col_offset, value) in row.iter().enumerate() {
                target.set_cell(
                    origin.row + row_offset,
                    origin.col + col_offset,
                    value.as_str(),
                );
            }
        }
        Ok(())
    }

    fn append_row(&self, name: &str, values: &[String]) -> StoreResult<()> {
        self.appends.fetch_add(1, Ordering::SeqCst);
        let mut sheets = self.sheets()?;
        let target = sheets
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        target.push_row(values.to_vec());
        Ok(())
    }

    fn clear_sheet(&self, name: &str) -> StoreResult<()> {
        self.clears.fetch_add(1, Ordering::SeqCst);
        let mut sheets = self.sheets()?;
        let target = sheets
            .get_mut(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        *target = Grid::default();
        Ok(())
    }
}
