//! Core domain logic for ClientDesk.
//! This crate is the single source of truth for record, fee and access rules.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;
pub mod table;

pub use config::{AppConfig, BackendConfig, ConfigError, SheetNames};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::client::{ClientRecord, ClientSchema, ClientValidationError, NewClient};
pub use model::fee::{CustomFee, CustomFeeTable, FeeSchedule};
pub use model::tick::{TickKind, TickState};
pub use repo::{RepoError, RepoResult};
pub use service::access::AccessGate;
pub use service::desk::{
    AddClientRequest, DeskOverview, DeskService, HealthReport, SaveOutcome, SaveRequest,
};
pub use service::finance::ClientBalance;
pub use service::{ServiceError, ServiceResult};
pub use store::{open_store, MemoryTableStore, StoreError, StoreResult, TableStore};
pub use table::{Grid, PendingEdits, ReconcileReport};

/// Minimal liveness API for probes.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
