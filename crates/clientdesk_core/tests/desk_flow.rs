use clientdesk_core::config::AppConfig;
use clientdesk_core::{
    AccessGate, AddClientRequest, ClientSchema, DeskService, Grid, MemoryTableStore, SaveRequest,
    ServiceError, SheetNames, TableStore,
};
use std::collections::HashMap;
use std::sync::Arc;

const SECRET: &str = "Desk-Secret";

fn desk_over(store: &Arc<MemoryTableStore>) -> DeskService {
    let shared: Arc<dyn TableStore> = store.clone();
    let desk = DeskService::new(
        shared,
        &SheetNames::default(),
        ClientSchema::default(),
        AccessGate::new(SECRET),
    );
    desk.ensure_client_sheet().unwrap();
    desk
}

fn add_request(password: &str, name: &str) -> AddClientRequest {
    AddClientRequest {
        password: password.to_string(),
        name: name.to_string(),
        uni: "Alexandria".to_string(),
        ..AddClientRequest::default()
    }
}

#[test]
fn ensure_client_sheet_creates_schema_header_once() {
    let store = Arc::new(MemoryTableStore::new());
    let desk = desk_over(&store);
    desk.ensure_client_sheet().unwrap();

    assert_eq!(store.stats().creates, 1);
    assert_eq!(
        store.snapshot("Sheet1").unwrap().header(),
        ClientSchema::default().header().as_slice()
    );
}

#[test]
fn wrong_or_empty_password_is_rejected_without_store_calls() {
    let store = Arc::new(MemoryTableStore::new());
    let desk = desk_over(&store);
    store.reset_stats();

    for password in ["", "desk-secret", "Desk-Secret "] {
        let err = desk.add_client(&add_request(password, "X")).unwrap_err();
        assert!(matches!(err, ServiceError::Unauthorized));
        assert_eq!(err.to_string(), "Wrong password");

        let save = SaveRequest {
            password: password.to_string(),
            ..SaveRequest::default()
        };
        assert!(matches!(desk.save(&save), Err(ServiceError::Unauthorized)));
    }

    assert_eq!(store.stats(), Default::default());
    assert!(desk.verify_password(SECRET));
    assert!(!desk.verify_password("desk-secret"));
}

#[test]
fn save_request_parses_frontend_payload() {
    let request: SaveRequest = serde_json::from_value(serde_json::json!({
        "password": SECRET,
        "updates": {
            "0": {"Documents": "TRUE", "Notes": "EXTRA:150"},
            "1": {"Foreign Fees": "PAID"}
        },
        "fees": {"Base Fee": 26000, "Documents": 500.5},
        "customFees": [{"service": "Foreign Fees", "client": "B", "amount": 900}]
    }))
    .unwrap();

    assert_eq!(request.updates.len(), 2);
    assert_eq!(request.updates[&1]["Foreign Fees"], "PAID");
    assert_eq!(request.fees.as_ref().unwrap().get("Documents"), Some(500.5));
    assert_eq!(request.custom_fees.as_ref().unwrap().len(), 1);
}

#[test]
fn full_save_updates_clients_fees_and_overrides() {
    let store = Arc::new(MemoryTableStore::new());
    let desk = desk_over(&store);
    desk.add_client(&add_request(SECRET, "A")).unwrap();
    desk.add_client(&add_request(SECRET, "B")).unwrap();

    let request: SaveRequest = serde_json::from_value(serde_json::json!({
        "password": SECRET,
        "updates": {
            "0": {"Documents": "TRUE", "Notes": "EXTRA:150", "Received Amount": "1000"},
            "1": {"Foreign Fees": "PAID", "Unknown": "x"}
        },
        "fees": {"Base Fee": 20000, "Documents": 500, "Foreign Fees": 800},
        "customFees": [{"service": "Foreign Fees", "client": "B", "amount": 900}]
    }))
    .unwrap();
    let outcome = desk.save(&request).unwrap();

    assert_eq!(outcome.report.applied, 4);
    assert_eq!(outcome.report.skipped_columns, vec![(1, "Unknown".to_string())]);
    assert!(outcome.fees_saved && outcome.custom_fees_saved);

    let overview = desk.overview().unwrap();
    assert_eq!(overview.clients.len(), 2);
    assert_eq!(overview.fees.base_fee(), 20_000.0);
    assert_eq!(overview.custom_fees.len(), 1);

    let first = &overview.balances[0];
    assert_eq!(first.total_required, 20_000.0 + 500.0 + 150.0);
    assert_eq!(first.remaining, 20_650.0 - 1_000.0);
    let second = &overview.balances[1];
    assert_eq!(second.total_required, 20_000.0 + 900.0);
}

#[test]
fn save_without_fees_leaves_settings_untouched() {
    let store = Arc::new(MemoryTableStore::new());
    let desk = desk_over(&store);
    desk.add_client(&add_request(SECRET, "A")).unwrap();
    store.reset_stats();

    let outcome = desk
        .save(&SaveRequest {
            password: SECRET.to_string(),
            ..SaveRequest::default()
        })
        .unwrap();

    assert!(!outcome.fees_saved);
    let stats = store.stats();
    assert_eq!((stats.reads, stats.writes, stats.clears), (1, 1, 0));
    assert!(store.snapshot("Settings").is_none());
}

#[test]
fn add_client_maps_request_fields() {
    let store = Arc::new(MemoryTableStore::new());
    let desk = desk_over(&store);
    desk.add_client(&AddClientRequest {
        password: SECRET.to_string(),
        name: "Salma".to_string(),
        email: "s@x".to_string(),
        uni: "Ain Shams".to_string(),
        phone: "011".to_string(),
    })
    .unwrap();

    let record = &desk.clients().list_clients().unwrap()[0];
    assert_eq!(record.get("Email"), "s@x");
    assert_eq!(record.get("University"), "Ain Shams");
    assert_eq!(record.get("Phone"), "011");
    assert_eq!(desk.client_names().unwrap(), vec!["Salma"]);
}

#[test]
fn health_reports_reachability() {
    let store = Arc::new(MemoryTableStore::new());
    let desk = desk_over(&store);
    desk.add_client(&add_request(SECRET, "A")).unwrap();

    let report = desk.health();
    assert!(report.store_reachable);
    assert_eq!(report.client_count, Some(1));
    assert_eq!(report.backend, "memory");

    let empty: Arc<dyn TableStore> = Arc::new(MemoryTableStore::new());
    let detached = DeskService::new(
        empty,
        &SheetNames::default(),
        ClientSchema::default(),
        AccessGate::new(SECRET),
    );
    let report = detached.health();
    assert!(!report.store_reachable);
    assert!(report.message.unwrap().contains("Sheet1"));
}

#[test]
fn open_bootstraps_memory_backend_from_config() {
    let vars: HashMap<&str, &str> = [
        ("CLIENTDESK_BACKEND", "memory"),
        ("CLIENTDESK_ADMIN_SECRET", SECRET),
        ("CLIENTDESK_CLIENT_SHEET", "Clients"),
    ]
    .into_iter()
    .collect();
    let config =
        AppConfig::from_lookup(|var| vars.get(var).map(|value| (*value).to_string())).unwrap();

    let desk = DeskService::open(&config).unwrap();
    assert!(desk.verify_password(SECRET));
    assert_eq!(desk.health().client_count, Some(0));
}

#[test]
fn seeded_sheet_is_served_as_is() {
    let grid = Grid::new(vec![
        vec!["Name".to_string(), "Documents".to_string()],
        vec!["Old".to_string(), "TRUE".to_string()],
    ]);
    let store = Arc::new(MemoryTableStore::new().with_sheet("Sheet1", grid.clone()));
    let desk = desk_over(&store);

    assert_eq!(desk.client_names().unwrap(), vec!["Old"]);
    assert_eq!(store.snapshot("Sheet1").unwrap(), grid);
}
