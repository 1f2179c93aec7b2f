//! Request-level orchestration behind the HTTP surface.
//!
//! # Responsibility
//! - Gate mutating requests on the shared admin secret.
//! - Combine client edits, fee schedule and override saves into one request.
//! - Assemble the read model for the index page and the health probe.
//!
//! # Invariants
//! - An unauthorized request performs no store calls.
//! - Client edits are persisted before fees; a failed client write skips
//!   the fee writes.

use super::access::AccessGate;
use super::client_service::ClientService;
use super::fee_service::FeeService;
use super::finance::{compute_balance, ClientBalance};
use super::{ServiceError, ServiceResult};
use crate::config::{AppConfig, SheetNames};
use crate::model::client::{ClientRecord, ClientSchema, NewClient};
use crate::model::fee::{CustomFee, CustomFeeTable, FeeSchedule};
use crate::repo::client_repo::SheetClientRepository;
use crate::repo::fee_repo::SheetFeeRepository;
use crate::store::{open_store, StoreResult, TableStore};
use crate::table::{PendingEdits, ReconcileReport};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Body of a bulk save request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaveRequest {
    #[serde(default)]
    pub password: String,
    /// Edits keyed by data row index (JSON object keys are decimal strings).
    #[serde(default)]
    pub updates: PendingEdits,
    #[serde(default)]
    pub fees: Option<FeeSchedule>,
    #[serde(default, rename = "customFees")]
    pub custom_fees: Option<Vec<CustomFee>>,
}

/// Body of an add-client request.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddClientRequest {
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub uni: String,
    #[serde(default)]
    pub phone: String,
}

impl AddClientRequest {
    pub fn to_new_client(&self) -> NewClient {
        NewClient {
            name: self.name.clone(),
            email: self.email.clone(),
            institution: self.uni.clone(),
            phone: self.phone.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveOutcome {
    pub report: ReconcileReport,
    pub fees_saved: bool,
    pub custom_fees_saved: bool,
}

/// Everything the index page renders.
#[derive(Debug, Clone, Serialize)]
pub struct DeskOverview {
    pub schema: ClientSchema,
    pub clients: Vec<ClientRecord>,
    pub fees: FeeSchedule,
    pub custom_fees: Vec<CustomFee>,
    pub balances: Vec<ClientBalance>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    pub backend: &'static str,
    pub store_reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

pub struct DeskService {
    store: Arc<dyn TableStore>,
    client_sheet: String,
    clients: ClientService<SheetClientRepository>,
    fees: FeeService<SheetFeeRepository>,
    gate: AccessGate,
}

impl DeskService {
    pub fn new(
        store: Arc<dyn TableStore>,
        sheets: &SheetNames,
        schema: ClientSchema,
        gate: AccessGate,
    ) -> Self {
        let fee_repo = SheetFeeRepository::new(
            Arc::clone(&store),
            sheets.settings.clone(),
            sheets.custom_fees.clone(),
            FeeSchedule::defaults_for(&schema),
        );
        let client_repo = SheetClientRepository::new(Arc::clone(&store), sheets.clients.clone());
        Self {
            client_sheet: sheets.clients.clone(),
            store,
            clients: ClientService::new(client_repo, schema),
            fees: FeeService::new(fee_repo),
            gate,
        }
    }

    /// Opens the configured backend and makes sure the client sheet exists.
    ///
    /// Blocking; async callers must run it off the reactor.
    pub fn open(config: &AppConfig) -> StoreResult<Self> {
        let store = open_store(&config.backend)?;
        let desk = Self::new(
            store,
            &config.sheets,
            ClientSchema::default(),
            AccessGate::new(config.admin_secret()),
        );
        desk.ensure_client_sheet()?;
        Ok(desk)
    }

    /// Creates the client sheet with the schema header when it is missing.
    pub fn ensure_client_sheet(&self) -> StoreResult<()> {
        if self.store.has_sheet(&self.client_sheet)? {
            return Ok(());
        }
        self.store
            .create_sheet(&self.client_sheet, &self.clients.schema().header())?;
        info!(
            "event=sheet_bootstrap module=service status=ok sheet={}",
            self.client_sheet
        );
        Ok(())
    }

    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    pub fn schema(&self) -> &ClientSchema {
        self.clients.schema()
    }

    pub fn clients(&self) -> &ClientService<SheetClientRepository> {
        &self.clients
    }

    pub fn fees(&self) -> &FeeService<SheetFeeRepository> {
        &self.fees
    }

    pub fn verify_password(&self, password: &str) -> bool {
        self.gate.verify(password)
    }

    fn authorize(&self, password: &str, action: &str) -> ServiceResult<()> {
        if self.gate.verify(password) {
            return Ok(());
        }
        warn!(
            "event=auth_rejected module=service status=warn action={}",
            action
        );
        Err(ServiceError::Unauthorized)
    }

    /// Applies a bulk save: client edits, then fees, then overrides.
    pub fn save(&self, request: &SaveRequest) -> ServiceResult<SaveOutcome> {
        self.authorize(&request.password, "save")?;

        let report = self.clients.save_edits(&request.updates)?;
        if let Some(schedule) = &request.fees {
            self.fees.save_fees(schedule)?;
        }
        if let Some(custom) = &request.custom_fees {
            let table: CustomFeeTable = custom.iter().cloned().collect();
            self.fees.save_custom_fees(&table)?;
        }

        let outcome = SaveOutcome {
            report,
            fees_saved: request.fees.is_some(),
            custom_fees_saved: request.custom_fees.is_some(),
        };
        info!(
            "event=desk_save module=service status=ok applied={} skipped={} fees_saved={} custom_fees_saved={}",
            outcome.report.applied,
            outcome.report.skipped(),
            outcome.fees_saved,
            outcome.custom_fees_saved
        );
        Ok(outcome)
    }

    pub fn add_client(&self, request: &AddClientRequest) -> ServiceResult<()> {
        self.authorize(&request.password, "add_client")?;
        self.clients.create_client(&request.to_new_client())
    }

    pub fn client_names(&self) -> ServiceResult<Vec<String>> {
        self.clients.client_names()
    }

    pub fn fee_schedule(&self) -> ServiceResult<FeeSchedule> {
        self.fees.load_fees()
    }

    pub fn custom_fees(&self) -> ServiceResult<Vec<CustomFee>> {
        Ok(self.fees.load_custom_fees()?.entries())
    }

    /// Reads clients, fees and overrides once and derives balances.
    pub fn overview(&self) -> ServiceResult<DeskOverview> {
        let clients = self.clients.list_clients()?;
        let fees = self.fees.load_fees()?;
        let custom = self.fees.load_custom_fees()?;
        let balances = clients
            .iter()
            .map(|record| compute_balance(record, self.schema(), &fees, &custom))
            .collect();
        Ok(DeskOverview {
            schema: self.schema().clone(),
            clients,
            fees,
            custom_fees: custom.entries(),
            balances,
        })
    }

    /// Probes the store with one client sheet read.
    pub fn health(&self) -> HealthReport {
        let backend = self.store.backend_name();
        match self.clients.list_clients() {
            Ok(clients) => HealthReport {
                backend,
                store_reachable: true,
                client_count: Some(clients.len()),
                message: None,
            },
            Err(err) => {
                warn!(
                    "event=health_check module=service status=error backend={} error={}",
                    backend, err
                );
                HealthReport {
                    backend,
                    store_reachable: false,
                    client_count: None,
                    message: Some(err.to_string()),
                }
            }
        }
    }
}
