//! Fee schedule and per-client fee overrides.
//!
//! # Invariants
//! - Amounts are finite numbers.
//! - A custom override is keyed by `(service, client name)`; at most one
//!   amount exists per key.

use crate::model::client::ClientSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Schedule entry holding the fixed base fee every client owes.
pub const BASE_FEE_SERVICE: &str = "Base Fee";
pub const DEFAULT_BASE_FEE: f64 = 26_000.0;

/// Mapping from service name to amount.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeeSchedule(BTreeMap<String, f64>);

impl FeeSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed schedule used when the settings sheet does not exist yet.
    ///
    /// Contains the base fee plus a zero amount for every tick column.
    pub fn defaults_for(schema: &ClientSchema) -> Self {
        let mut schedule = Self::new();
        schedule.insert(BASE_FEE_SERVICE, DEFAULT_BASE_FEE);
        for column in schema.tick_columns() {
            schedule.insert(column.name.clone(), 0.0);
        }
        schedule
    }

    pub fn insert(&mut self, service: impl Into<String>, amount: f64) {
        self.0.insert(service.into(), amount);
    }

    pub fn get(&self, service: &str) -> Option<f64> {
        self.0.get(service).copied()
    }

    /// Amount for `service`, or `0` when unset.
    pub fn amount_for(&self, service: &str) -> f64 {
        self.get(service).unwrap_or(0.0)
    }

    pub fn base_fee(&self) -> f64 {
        self.get(BASE_FEE_SERVICE).unwrap_or(DEFAULT_BASE_FEE)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(service, amount)| (service.as_str(), *amount))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for FeeSchedule {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// One per-client fee override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomFee {
    pub service: String,
    pub client: String,
    pub amount: f64,
}

/// Per-client overrides keyed by `(service, client name)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomFeeTable(BTreeMap<(String, String), f64>);

impl CustomFeeTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces the override for `(service, client)`.
    pub fn insert(&mut self, service: impl Into<String>, client: impl Into<String>, amount: f64) {
        self.0.insert((service.into(), client.into()), amount);
    }

    pub fn get(&self, service: &str, client: &str) -> Option<f64> {
        self.0
            .get(&(service.to_string(), client.to_string()))
            .copied()
    }

    /// Entries sorted by service, then client.
    pub fn entries(&self) -> Vec<CustomFee> {
        self.0
            .iter()
            .map(|((service, client), amount)| CustomFee {
                service: service.clone(),
                client: client.clone(),
                amount: *amount,
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<CustomFee> for CustomFeeTable {
    fn from_iter<T: IntoIterator<Item = CustomFee>>(iter: T) -> Self {
        let mut table = Self::new();
        for fee in iter {
            table.insert(fee.service, fee.client, fee.amount);
        }
        table
    }
}

/// Parses an amount cell, accepting thousands separators.
///
/// Returns `None` for empty, non-numeric or non-finite text.
pub fn parse_amount(value: &str) -> Option<f64> {
    let cleaned: String = value
        .trim()
        .chars()
        .filter(|ch| *ch != ',' && !ch.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|amount| amount.is_finite())
}

/// Formats an amount for a sheet cell; whole numbers have no fraction.
pub fn format_amount(amount: f64) -> String {
    amount.to_string()
}
