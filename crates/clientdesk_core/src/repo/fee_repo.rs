//! Fee settings and custom fee override repository.
//!
//! # Responsibility
//! - Read/write the fee schedule (`Service | Amount`) sheet.
//! - Read/write the custom override (`Service | Client | Amount`) sheet.
//! - Bootstrap either sheet on first use.
//!
//! # Invariants
//! - Saves replace the sheet wholesale: header plus one row per entry.
//! - Rows with a blank service or unparsable amount are skipped on read.
//! - Saves reject blank or padded names and non-finite amounts before any
//!   store call, so whatever is saved loads back unchanged.

use super::{RepoError, RepoResult};
use crate::model::fee::{format_amount, parse_amount, CustomFee, CustomFeeTable, FeeSchedule};
use crate::store::{CellRef, StoreError, TableStore};
use crate::table::{Grid, HeaderIndex};
use log::{info, warn};
use std::sync::Arc;

pub const SERVICE_HEADER: &str = "Service";
pub const CLIENT_HEADER: &str = "Client";
pub const AMOUNT_HEADER: &str = "Amount";

/// Persistence contract for fee settings.
pub trait FeeRepository {
    fn load_fee_schedule(&self) -> RepoResult<FeeSchedule>;
    fn store_fee_schedule(&self, schedule: &FeeSchedule) -> RepoResult<()>;
    fn load_custom_fees(&self) -> RepoResult<CustomFeeTable>;
    fn store_custom_fees(&self, table: &CustomFeeTable) -> RepoResult<()>;
}

pub struct SheetFeeRepository {
    store: Arc<dyn TableStore>,
    settings_sheet: String,
    custom_fee_sheet: String,
    defaults: FeeSchedule,
}

impl SheetFeeRepository {
    /// `defaults` seeds the settings sheet when it does not exist yet.
    pub fn new(
        store: Arc<dyn TableStore>,
        settings_sheet: impl Into<String>,
        custom_fee_sheet: impl Into<String>,
        defaults: FeeSchedule,
    ) -> Self {
        Self {
            store,
            settings_sheet: settings_sheet.into(),
            custom_fee_sheet: custom_fee_sheet.into(),
            defaults,
        }
    }

    /// Reads `sheet`, creating it from `seed` first when it is missing.
    fn read_or_bootstrap(&self, sheet: &str, seed: &Grid) -> RepoResult<Grid> {
        match self.store.read_grid(sheet) {
            Ok(grid) => Ok(grid),
            Err(StoreError::NotFound(_)) => {
                self.store.create_sheet(sheet, seed.header())?;
                if seed.data_len() > 0 {
                    let rows = seed.data_rows().to_vec();
                    self.store
                        .write_grid(sheet, CellRef::new(1, 0), &Grid::new(rows))?;
                }
                info!(
                    "event=sheet_bootstrap module=repo status=ok sheet={} seeded_rows={}",
                    sheet,
                    seed.data_len()
                );
                Ok(self.store.read_grid(sheet)?)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Clears `sheet` and writes `grid` from `A1`, creating the sheet if needed.
    fn replace_sheet(&self, sheet: &str, grid: &Grid) -> RepoResult<()> {
        match self.store.clear_sheet(sheet) {
            Ok(()) => {}
            Err(StoreError::NotFound(_)) => self.store.create_sheet(sheet, grid.header())?,
            Err(err) => return Err(err.into()),
        }
        self.store.write_grid(sheet, CellRef::ORIGIN, grid)?;
        Ok(())
    }
}

impl FeeRepository for SheetFeeRepository {
    fn load_fee_schedule(&self) -> RepoResult<FeeSchedule> {
        let grid = self.read_or_bootstrap(&self.settings_sheet, &schedule_grid(&self.defaults))?;
        parse_schedule(&grid, &self.settings_sheet)
    }

    fn store_fee_schedule(&self, schedule: &FeeSchedule) -> RepoResult<()> {
        for (service, amount) in schedule.iter() {
            check_name(service, SERVICE_HEADER)?;
            check_amount(service, amount)?;
        }
        self.replace_sheet(&self.settings_sheet, &schedule_grid(schedule))?;
        info!(
            "event=fee_schedule_save module=repo status=ok entries={}",
            schedule.len()
        );
        Ok(())
    }

    fn load_custom_fees(&self) -> RepoResult<CustomFeeTable> {
        let grid = self.read_or_bootstrap(
            &self.custom_fee_sheet,
            &custom_fee_grid(&CustomFeeTable::new()),
        )?;
        parse_custom_fees(&grid, &self.custom_fee_sheet)
    }

    fn store_custom_fees(&self, table: &CustomFeeTable) -> RepoResult<()> {
        for fee in table.entries() {
            check_name(&fee.service, SERVICE_HEADER)?;
            check_name(&fee.client, CLIENT_HEADER)?;
            check_amount(&fee.service, fee.amount)?;
        }
        self.replace_sheet(&self.custom_fee_sheet, &custom_fee_grid(table))?;
        info!(
            "event=custom_fee_save module=repo status=ok entries={}",
            table.len()
        );
        Ok(())
    }
}

fn header(names: &[&str]) -> Vec<String> {
    names.iter().map(|name| (*name).to_string()).collect()
}

/// Settings sheet layout for `schedule`, entries sorted by service.
pub fn schedule_grid(schedule: &FeeSchedule) -> Grid {
    let mut grid = Grid::with_header(header(&[SERVICE_HEADER, AMOUNT_HEADER]));
    for (service, amount) in schedule.iter() {
        grid.push_row(vec![service.to_string(), format_amount(amount)]);
    }
    grid
}

/// Custom fee sheet layout for `table`.
pub fn custom_fee_grid(table: &CustomFeeTable) -> Grid {
    let mut grid = Grid::with_header(header(&[SERVICE_HEADER, CLIENT_HEADER, AMOUNT_HEADER]));
    for fee in table.entries() {
        grid.push_row(vec![fee.service, fee.client, format_amount(fee.amount)]);
    }
    grid
}

/// Names must survive the trimmed read path unchanged.
fn check_name(value: &str, column: &str) -> RepoResult<()> {
    if value.trim().is_empty() {
        return Err(RepoError::InvalidData(format!("blank `{column}` value")));
    }
    if value.trim() != value {
        return Err(RepoError::InvalidData(format!(
            "`{column}` value `{value}` has surrounding whitespace"
        )));
    }
    Ok(())
}

fn check_amount(service: &str, amount: f64) -> RepoResult<()> {
    if amount.is_finite() {
        Ok(())
    } else {
        Err(RepoError::InvalidData(format!(
            "amount for `{service}` is not a finite number"
        )))
    }
}

fn require_column(index: &HeaderIndex, column: &str, sheet: &str) -> RepoResult<usize> {
    index.resolve(column).map_err(|_| {
        RepoError::InvalidData(format!("sheet `{sheet}` has no `{column}` column"))
    })
}

fn cell(row: &[String], offset: usize) -> &str {
    row.get(offset).map(|value| value.trim()).unwrap_or("")
}

fn parse_schedule(grid: &Grid, sheet: &str) -> RepoResult<FeeSchedule> {
    let index = grid.header_index();
    let service_col = require_column(&index, SERVICE_HEADER, sheet)?;
    let amount_col = require_column(&index, AMOUNT_HEADER, sheet)?;

    let mut schedule = FeeSchedule::new();
    for (row_index, row) in grid.data_rows().iter().enumerate() {
        let service = cell(row, service_col);
        if service.is_empty() {
            continue;
        }
        match parse_amount(cell(row, amount_col)) {
            Some(amount) => schedule.insert(service, amount),
            None => warn!(
                "event=fee_row_skipped module=repo status=warn sheet={} row_index={} reason=invalid_amount",
                sheet, row_index
            ),
        }
    }
    Ok(schedule)
}

fn parse_custom_fees(grid: &Grid, sheet: &str) -> RepoResult<CustomFeeTable> {
    let index = grid.header_index();
    let service_col = require_column(&index, SERVICE_HEADER, sheet)?;
    let client_col = require_column(&index, CLIENT_HEADER, sheet)?;
    let amount_col = require_column(&index, AMOUNT_HEADER, sheet)?;

    let mut fees = Vec::new();
    for (row_index, row) in grid.data_rows().iter().enumerate() {
        let service = cell(row, service_col);
        let client = cell(row, client_col);
        if service.is_empty() || client.is_empty() {
            continue;
        }
        match parse_amount(cell(row, amount_col)) {
            Some(amount) => fees.push(CustomFee {
                service: service.to_string(),
                client: client.to_string(),
                amount,
            }),
            None => warn!(
                "event=custom_fee_row_skipped module=repo status=warn sheet={} row_index={} reason=invalid_amount",
                sheet, row_index
            ),
        }
    }
    Ok(fees.into_iter().collect())
}

#[cfg(test)]
mod tests {
    use super::{check_amount, check_name, parse_schedule, schedule_grid};
    use crate::model::fee::FeeSchedule;
    use crate::repo::RepoError;
    use crate::table::Grid;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_string()).collect()
    }

    #[test]
    fn schedule_grid_roundtrips_through_parser() {
        let mut schedule = FeeSchedule::new();
        schedule.insert("Base Fee", 26_000.0);
        schedule.insert("Foreign Fees", 1_250.5);
        let parsed = parse_schedule(&schedule_grid(&schedule), "Settings").expect("parse");
        assert_eq!(parsed, schedule);
    }

    #[test]
    fn parse_schedule_skips_blank_and_invalid_rows() {
        let grid = Grid::new(vec![
            strings(&["Service", "Amount"]),
            strings(&["", "5"]),
            strings(&["Documents", "n/a"]),
            strings(&["National ID", "1,500"]),
        ]);
        let parsed = parse_schedule(&grid, "Settings").expect("parse");
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed.get("National ID"), Some(1_500.0));
    }

    #[test]
    fn names_must_be_non_blank_and_trimmed() {
        assert!(check_name("Documents", "Service").is_ok());
        assert!(matches!(check_name("", "Service"), Err(RepoError::InvalidData(_))));
        assert!(matches!(check_name("  ", "Client"), Err(RepoError::InvalidData(_))));
        assert!(matches!(
            check_name("Documents ", "Service"),
            Err(RepoError::InvalidData(_))
        ));
        assert!(check_amount("Documents", 0.0).is_ok());
        assert!(check_amount("Documents", f64::NAN).is_err());
    }

    #[test]
    fn parse_schedule_requires_header_columns() {
        let grid = Grid::new(vec![strings(&["Service"])]);
        assert!(matches!(
            parse_schedule(&grid, "Settings"),
            Err(RepoError::InvalidData(_))
        ));
    }
}
