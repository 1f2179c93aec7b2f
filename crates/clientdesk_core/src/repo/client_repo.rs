//! Client sheet repository.
//!
//! # Invariants
//! - `apply_edits` performs one read and one write regardless of edit count.
//! - Edits are applied to an in-memory copy; a failed read leaves the sheet
//!   untouched.

use super::RepoResult;
use crate::model::client::ClientRecord;
use crate::store::{CellRef, TableStore};
use crate::table::{apply_edits, PendingEdits, ReconcileReport};
use log::{info, warn};
use std::sync::Arc;

/// Persistence contract for client rows.
pub trait ClientRepository {
    fn list_clients(&self) -> RepoResult<Vec<ClientRecord>>;
    fn append_client(&self, row: &[String]) -> RepoResult<()>;
    fn apply_edits(&self, edits: &PendingEdits) -> RepoResult<ReconcileReport>;
}

/// Client repository backed by one sheet of a `TableStore`.
pub struct SheetClientRepository {
    store: Arc<dyn TableStore>,
    sheet: String,
}

impl SheetClientRepository {
    pub fn new(store: Arc<dyn TableStore>, sheet: impl Into<String>) -> Self {
        Self {
            store,
            sheet: sheet.into(),
        }
    }

    pub fn sheet(&self) -> &str {
        &self.sheet
    }
}

impl ClientRepository for SheetClientRepository {
    fn list_clients(&self) -> RepoResult<Vec<ClientRecord>> {
        let grid = self.store.read_grid(&self.sheet)?;
        Ok(grid
            .records()
            .into_iter()
            .enumerate()
            .map(|(row_index, values)| ClientRecord::new(row_index, values))
            .collect())
    }

    fn append_client(&self, row: &[String]) -> RepoResult<()> {
        self.store.append_row(&self.sheet, row)?;
        Ok(())
    }

    fn apply_edits(&self, edits: &PendingEdits) -> RepoResult<ReconcileReport> {
        let mut grid = self.store.read_grid(&self.sheet)?;
        let report = apply_edits(&mut grid, edits);
        if report.skipped() > 0 {
            warn!(
                "event=client_save module=repo status=warn skipped_columns={} skipped_rows={}",
                report.skipped_columns.len(),
                report.skipped_rows.len()
            );
        }
        self.store.write_grid(&self.sheet, CellRef::ORIGIN, &grid)?;
        info!(
            "event=client_save module=repo status=ok rows={} applied={}",
            edits.len(),
            report.applied
        );
        Ok(report)
    }
}
