//! Step-completion tick states.
//!
//! # Responsibility
//! - Encode/decode tick cells stored as plain text in the client sheet.
//! - Model staged columns as an explicit three-state value.
//!
//! # Invariants
//! - `Normal` columns only ever hold `NotStarted` or `Completed`.
//! - Unknown or empty cell text decodes as `NotStarted`.

use serde::{Deserialize, Serialize};

/// Cell text for a step that has not started.
pub const CELL_FALSE: &str = "FALSE";
/// Cell text for a staged step whose fee is paid but work is not complete.
pub const CELL_PAID: &str = "PAID";
/// Cell text for a completed step.
pub const CELL_TRUE: &str = "TRUE";

/// Shape of a tick column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickKind {
    /// Single boolean checkbox.
    Normal,
    /// Two-phase step: fee paid, then completed.
    Staged,
}

/// Completion state of one step for one client.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickState {
    #[default]
    NotStarted,
    Paid,
    Completed,
}

impl TickState {
    /// Stable cell text written back to the sheet.
    pub fn as_cell(self) -> &'static str {
        match self {
            Self::NotStarted => CELL_FALSE,
            Self::Paid => CELL_PAID,
            Self::Completed => CELL_TRUE,
        }
    }

    /// Decodes a tick cell for a column of the given kind.
    ///
    /// Decoding is case-insensitive. `PAID` in a `Normal` column is treated
    /// as `NotStarted`, since the column cannot represent it.
    pub fn from_cell(value: &str, kind: TickKind) -> Self {
        match value.trim().to_ascii_uppercase().as_str() {
            CELL_TRUE => Self::Completed,
            CELL_PAID if kind == TickKind::Staged => Self::Paid,
            _ => Self::NotStarted,
        }
    }

    /// Next state in the edit-mode toggle cycle.
    ///
    /// - `Normal`: `NotStarted <-> Completed`.
    /// - `Staged`: `NotStarted -> Paid -> Completed -> NotStarted`.
    pub fn next(self, kind: TickKind) -> Self {
        match (kind, self) {
            (TickKind::Normal, Self::Completed) => Self::NotStarted,
            (TickKind::Normal, _) => Self::Completed,
            (TickKind::Staged, Self::NotStarted) => Self::Paid,
            (TickKind::Staged, Self::Paid) => Self::Completed,
            (TickKind::Staged, Self::Completed) => Self::NotStarted,
        }
    }

    /// Whether the step's fee counts toward the client's required total.
    pub fn is_billable(self) -> bool {
        !matches!(self, Self::NotStarted)
    }
}

#[cfg(test)]
mod tests {
    use super::{TickKind, TickState};

    #[test]
    fn decode_is_case_insensitive_and_lenient() {
        assert_eq!(
            TickState::from_cell(" true ", TickKind::Normal),
            TickState::Completed
        );
        assert_eq!(
            TickState::from_cell("paid", TickKind::Staged),
            TickState::Paid
        );
        assert_eq!(TickState::from_cell("", TickKind::Staged), TickState::NotStarted);
        assert_eq!(
            TickState::from_cell("maybe", TickKind::Normal),
            TickState::NotStarted
        );
    }

    #[test]
    fn normal_columns_cannot_hold_paid() {
        assert_eq!(
            TickState::from_cell("PAID", TickKind::Normal),
            TickState::NotStarted
        );
        assert_eq!(
            TickState::Paid.next(TickKind::Normal),
            TickState::Completed
        );
    }

    #[test]
    fn staged_cycle_visits_all_states() {
        let mut state = TickState::NotStarted;
        let mut seen = Vec::new();
        for _ in 0..3 {
            state = state.next(TickKind::Staged);
            seen.push(state.as_cell());
        }
        assert_eq!(seen, vec!["PAID", "TRUE", "FALSE"]);
    }
}
