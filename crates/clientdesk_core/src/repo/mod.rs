//! Repository layer over the table store.
//!
//! # Responsibility
//! - Translate between sheets and typed client/fee models.
//! - Keep the one-read/one-write shape of bulk operations inside one place.
//!
//! # Invariants
//! - A bulk client save costs exactly one `read_grid` and one `write_grid`.
//! - Repositories never retry store calls.

use crate::store::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod client_repo;
pub mod fee_repo;

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Store(StoreError),
    /// Sheet content cannot be interpreted (e.g. missing required header).
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid sheet data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::InvalidData(_) => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}
