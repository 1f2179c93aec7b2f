//! Per-client balance derivation.
//!
//! # Invariants
//! - A tick column contributes its fee only when `Paid` or `Completed`.
//! - A custom override for `(column, client name)` replaces the schedule fee.
//! - Only the first `EXTRA:<n>` annotation in notes is counted.
//! - `remaining = total_required - received`; unparsable received is `0`.

use crate::model::client::{ClientRecord, ClientSchema, NOTES_COLUMN, RECEIVED_AMOUNT_COLUMN};
use crate::model::fee::{parse_amount, CustomFeeTable, FeeSchedule};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

static EXTRA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"EXTRA:(-?\d+(?:\.\d+)?)").expect("valid extra regex"));

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClientBalance {
    pub row_index: usize,
    pub name: String,
    pub base_fee: f64,
    /// Sum of fees for billable tick columns.
    pub services: f64,
    /// Amount taken from an `EXTRA:<n>` note annotation.
    pub extra: f64,
    pub total_required: f64,
    pub received: f64,
    pub remaining: f64,
}

impl ClientBalance {
    pub fn is_settled(&self) -> bool {
        self.remaining <= 0.0
    }
}

/// Amount of the first `EXTRA:<n>` annotation in `notes`, or `0`.
pub fn extra_from_notes(notes: &str) -> f64 {
    EXTRA_RE
        .captures(notes)
        .and_then(|captures| captures.get(1))
        .and_then(|amount| amount.as_str().parse::<f64>().ok())
        .unwrap_or(0.0)
}

/// Fee owed for `service` by `client`.
pub fn effective_fee(
    service: &str,
    client: &str,
    schedule: &FeeSchedule,
    custom: &CustomFeeTable,
) -> f64 {
    custom
        .get(service, client)
        .unwrap_or_else(|| schedule.amount_for(service))
}

pub fn compute_balance(
    record: &ClientRecord,
    schema: &ClientSchema,
    schedule: &FeeSchedule,
    custom: &CustomFeeTable,
) -> ClientBalance {
    let name = record.name().trim();
    let services = schema
        .tick_columns()
        .iter()
        .filter(|column| record.tick_state(column).is_billable())
        .map(|column| effective_fee(&column.name, name, schedule, custom))
        .sum::<f64>();
    let extra = extra_from_notes(record.get(NOTES_COLUMN));
    let base_fee = schedule.base_fee();
    let total_required = base_fee + services + extra;
    let received = parse_amount(record.get(RECEIVED_AMOUNT_COLUMN)).unwrap_or(0.0);

    ClientBalance {
        row_index: record.row_index,
        name: name.to_string(),
        base_fee,
        services,
        extra,
        total_required,
        received,
        remaining: total_required - received,
    }
}

#[cfg(test)]
mod tests {
    use super::{compute_balance, extra_from_notes};
    use crate::model::client::{ClientRecord, ClientSchema};
    use crate::model::fee::{CustomFeeTable, FeeSchedule};
    use std::collections::BTreeMap;

    fn record(cells: &[(&str, &str)]) -> ClientRecord {
        let values: BTreeMap<String, String> = cells
            .iter()
            .map(|(column, value)| ((*column).to_string(), (*value).to_string()))
            .collect();
        ClientRecord::new(0, values)
    }

    #[test]
    fn extra_takes_first_annotation_only() {
        assert_eq!(extra_from_notes("call back EXTRA:500 then EXTRA:900"), 500.0);
        assert_eq!(extra_from_notes("refund EXTRA:-250"), -250.0);
        assert_eq!(extra_from_notes("extra:100"), 0.0);
        assert_eq!(extra_from_notes(""), 0.0);
    }

    #[test]
    fn balance_counts_billable_ticks_overrides_and_extra() {
        let schema = ClientSchema::default();
        let mut schedule = FeeSchedule::defaults_for(&schema);
        schedule.insert("Documents", 300.0);
        schedule.insert("Foreign Fees", 1_000.0);
        schedule.insert("National ID", 50.0);
        let mut custom = CustomFeeTable::new();
        custom.insert("Foreign Fees", "Huda", 1_500.0);

        let balance = compute_balance(
            &record(&[
                ("Name", "Huda"),
                ("Documents", "TRUE"),
                ("Foreign Fees", "PAID"),
                ("National ID", "FALSE"),
                ("Notes", "EXTRA:200"),
                ("Received Amount", "10,000"),
            ]),
            &schema,
            &schedule,
            &custom,
        );

        assert_eq!(balance.services, 1_800.0);
        assert_eq!(balance.extra, 200.0);
        assert_eq!(balance.total_required, 26_000.0 + 1_800.0 + 200.0);
        assert_eq!(balance.remaining, 28_000.0 - 10_000.0);
        assert!(!balance.is_settled());
    }

    #[test]
    fn paid_in_normal_column_is_not_billed() {
        let schema = ClientSchema::default();
        let mut schedule = FeeSchedule::new();
        schedule.insert("Documents", 300.0);
        let balance = compute_balance(
            &record(&[("Name", "A"), ("Documents", "PAID"), ("Received Amount", "x")]),
            &schema,
            &schedule,
            &CustomFeeTable::new(),
        );
        assert_eq!(balance.services, 0.0);
        assert_eq!(balance.received, 0.0);
    }
}
