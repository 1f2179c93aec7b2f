//! Client use-case service.
//!
//! # Responsibility
//! - List client rows and names for rendering and pickers.
//! - Validate and append new clients.
//! - Persist bulk edits through the repository's single-write path.
//! - Derive balances from a fee schedule and overrides.
//!
//! # Invariants
//! - New rows carry today's local date in `YYYY-MM-DD` form.
//! - Client names are not required to be unique.

use super::finance::{compute_balance, ClientBalance};
use super::ServiceResult;
use crate::model::client::{ClientRecord, ClientSchema, NewClient};
use crate::model::fee::{CustomFeeTable, FeeSchedule};
use crate::repo::client_repo::ClientRepository;
use crate::table::{PendingEdits, ReconcileReport};
use chrono::NaiveDate;
use log::info;

const START_DATE_FORMAT: &str = "%Y-%m-%d";

pub struct ClientService<R: ClientRepository> {
    repo: R,
    schema: ClientSchema,
}

impl<R: ClientRepository> ClientService<R> {
    pub fn new(repo: R, schema: ClientSchema) -> Self {
        Self { repo, schema }
    }

    pub fn schema(&self) -> &ClientSchema {
        &self.schema
    }

    pub fn list_clients(&self) -> ServiceResult<Vec<ClientRecord>> {
        Ok(self.repo.list_clients()?)
    }

    /// Non-empty client names in row order.
    pub fn client_names(&self) -> ServiceResult<Vec<String>> {
        Ok(self
            .list_clients()?
            .iter()
            .map(|record| record.name().trim())
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Appends `client` with today's local date as its start date.
    pub fn create_client(&self, client: &NewClient) -> ServiceResult<()> {
        self.create_client_on(client, chrono::Local::now().date_naive())
    }

    /// Appends `client` with an explicit start date.
    pub fn create_client_on(&self, client: &NewClient, start_date: NaiveDate) -> ServiceResult<()> {
        client.validate()?;
        let date = start_date.format(START_DATE_FORMAT).to_string();
        let row = client.to_row(&self.schema, &date);
        self.repo.append_client(&row)?;
        info!(
            "event=client_create module=service status=ok cells={} start_date={}",
            row.len(),
            date
        );
        Ok(())
    }

    /// Applies `edits` with one read and one write of the client sheet.
    pub fn save_edits(&self, edits: &PendingEdits) -> ServiceResult<ReconcileReport> {
        Ok(self.repo.apply_edits(edits)?)
    }

    pub fn balances(
        &self,
        schedule: &FeeSchedule,
        custom: &CustomFeeTable,
    ) -> ServiceResult<Vec<ClientBalance>> {
        Ok(self
            .list_clients()?
            .iter()
            .map(|record| compute_balance(record, &self.schema, schedule, custom))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::ClientService;
    use crate::model::client::{ClientSchema, NewClient};
    use crate::repo::client_repo::SheetClientRepository;
    use crate::service::ServiceError;
    use crate::store::{MemoryTableStore, TableStore};
    use crate::table::Grid;
    use chrono::NaiveDate;
    use std::sync::Arc;

    fn service_with(store: Arc<MemoryTableStore>) -> ClientService<SheetClientRepository> {
        let shared: Arc<dyn TableStore> = store;
        ClientService::new(
            SheetClientRepository::new(shared, "Sheet1"),
            ClientSchema::default(),
        )
    }

    #[test]
    fn create_client_appends_dated_row() {
        let schema = ClientSchema::default();
        let store = Arc::new(
            MemoryTableStore::new().with_sheet("Sheet1", Grid::with_header(schema.header())),
        );
        let service = service_with(store.clone());
        let date = NaiveDate::from_ymd_opt(2026, 3, 7).expect("valid date");

        service
            .create_client_on(&NewClient::new("Omar"), date)
            .expect("create client");

        let grid = store.snapshot("Sheet1").expect("sheet exists");
        let row = grid.data_row(0).expect("appended row");
        assert_eq!(row.len(), schema.width());
        assert!(row.contains(&"2026-03-07".to_string()));
        assert_eq!(store.stats().appends, 1);
    }

    #[test]
    fn create_client_rejects_blank_name_without_store_calls() {
        let store = Arc::new(MemoryTableStore::new());
        let service = service_with(store.clone());
        let err = service
            .create_client(&NewClient::new(" "))
            .expect_err("blank name");
        assert!(matches!(err, ServiceError::Validation(_)));
        assert_eq!(store.stats().appends, 0);
    }

    #[test]
    fn client_names_skip_blank_rows() {
        let store = Arc::new(MemoryTableStore::new().with_sheet(
            "Sheet1",
            Grid::new(vec![
                vec!["Name".to_string()],
                vec!["Ali".to_string()],
                vec![" ".to_string()],
                vec!["Mona".to_string()],
            ]),
        ));
        let names = service_with(store).client_names().expect("names");
        assert_eq!(names, vec!["Ali".to_string(), "Mona".to_string()]);
    }
}
