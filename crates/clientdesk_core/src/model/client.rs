//! Client record model and sheet column schema.
//!
//! # Responsibility
//! - Declare the fixed column layout of the client sheet.
//! - Provide a typed view over one header-keyed sheet row.
//! - Validate and shape new client rows before they are appended.
//!
//! # Invariants
//! - Static columns precede tick columns in the declared header order.
//! - A new row has exactly `static_columns + tick_columns` cells.
//! - Every tick cell of a new row is `FALSE`.

use crate::model::tick::{TickKind, TickState};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// 0-based index over data rows (the header is not counted).
pub type RowIndex = usize;

pub const NAME_COLUMN: &str = "Name";
pub const EMAIL_COLUMN: &str = "Email";
pub const UNIVERSITY_COLUMN: &str = "University";
pub const ADDRESS_COLUMN: &str = "Address";
pub const PHONE_COLUMN: &str = "Phone";
pub const START_DATE_COLUMN: &str = "Start Date";
pub const NOTES_COLUMN: &str = "Notes";
pub const RECEIVED_AMOUNT_COLUMN: &str = "Received Amount";

const DEFAULT_STATIC_COLUMNS: &[&str] = &[
    NAME_COLUMN,
    EMAIL_COLUMN,
    UNIVERSITY_COLUMN,
    ADDRESS_COLUMN,
    PHONE_COLUMN,
    START_DATE_COLUMN,
    NOTES_COLUMN,
    RECEIVED_AMOUNT_COLUMN,
];

const DEFAULT_TICK_COLUMNS: &[(&str, TickKind)] = &[
    ("Secondary Cert", TickKind::Normal),
    ("Bachelor Cert", TickKind::Normal),
    ("Master Cert", TickKind::Normal),
    ("Equivalency Cert", TickKind::Staged),
    ("Internship Cert", TickKind::Normal),
    ("Documents", TickKind::Normal),
    ("National ID", TickKind::Normal),
    ("Power of Attorney", TickKind::Normal),
    ("Preliminary Accept", TickKind::Normal),
    ("Data Completion", TickKind::Normal),
    ("Foreign Fees", TickKind::Staged),
    ("Final Selection", TickKind::Staged),
];

/// One step-completion column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickColumn {
    pub name: String,
    pub kind: TickKind,
}

/// Column layout of the client sheet, fixed at deploy time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientSchema {
    static_columns: Vec<String>,
    tick_columns: Vec<TickColumn>,
}

impl ClientSchema {
    pub fn new(static_columns: Vec<String>, tick_columns: Vec<TickColumn>) -> Self {
        Self {
            static_columns,
            tick_columns,
        }
    }

    pub fn static_columns(&self) -> &[String] {
        &self.static_columns
    }

    pub fn tick_columns(&self) -> &[TickColumn] {
        &self.tick_columns
    }

    /// Looks up a tick column by exact name.
    pub fn tick_column(&self, name: &str) -> Option<&TickColumn> {
        self.tick_columns.iter().find(|column| column.name == name)
    }

    /// Full header in declared order: static columns, then tick columns.
    pub fn header(&self) -> Vec<String> {
        self.static_columns
            .iter()
            .cloned()
            .chain(self.tick_columns.iter().map(|column| column.name.clone()))
            .collect()
    }

    /// Number of cells in a fully populated row.
    pub fn width(&self) -> usize {
        self.static_columns.len() + self.tick_columns.len()
    }
}

impl Default for ClientSchema {
    fn default() -> Self {
        Self::new(
            DEFAULT_STATIC_COLUMNS
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
            DEFAULT_TICK_COLUMNS
                .iter()
                .map(|(name, kind)| TickColumn {
                    name: (*name).to_string(),
                    kind: *kind,
                })
                .collect(),
        )
    }
}

/// One client row read from the sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientRecord {
    /// Position among data rows; the only identity a record has.
    pub row_index: RowIndex,
    /// Header-keyed cell values.
    pub values: BTreeMap<String, String>,
}

impl ClientRecord {
    pub fn new(row_index: RowIndex, values: BTreeMap<String, String>) -> Self {
        Self { row_index, values }
    }

    /// Cell text for `column`, or `""` when the column is absent.
    pub fn get(&self, column: &str) -> &str {
        self.values.get(column).map(String::as_str).unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.get(NAME_COLUMN)
    }

    pub fn tick_state(&self, column: &TickColumn) -> TickState {
        TickState::from_cell(self.get(column.name.as_str()), column.kind)
    }
}

/// Validation failure for new client input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientValidationError {
    EmptyName,
}

impl Display for ClientValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyName => write!(f, "client name cannot be empty"),
        }
    }
}

impl Error for ClientValidationError {}

/// Input for appending a new client row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NewClient {
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub phone: String,
}

impl NewClient {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Rejects input whose name is empty after trimming.
    pub fn validate(&self) -> Result<(), ClientValidationError> {
        if self.name.trim().is_empty() {
            return Err(ClientValidationError::EmptyName);
        }
        Ok(())
    }

    /// Builds the full row in schema order.
    ///
    /// Unknown static columns are left empty; every tick column is `FALSE`.
    pub fn to_row(&self, schema: &ClientSchema, start_date: &str) -> Vec<String> {
        let mut row = Vec::with_capacity(schema.width());
        for column in schema.static_columns() {
            let value = match column.as_str() {
                NAME_COLUMN => self.name.trim(),
                EMAIL_COLUMN => self.email.trim(),
                UNIVERSITY_COLUMN => self.institution.trim(),
                PHONE_COLUMN => self.phone.trim(),
                START_DATE_COLUMN => start_date,
                _ => "",
            };
            row.push(value.to_string());
        }
        row.extend(
            schema
                .tick_columns()
                .iter()
                .map(|_| TickState::NotStarted.as_cell().to_string()),
        );
        row
    }
}
