//! Domain model for client records and fee settings.
//!
//! # Responsibility
//! - Define the row-oriented client record and its column schema.
//! - Define fee schedule and per-client fee override shapes.
//!
//! # Invariants
//! - Client records are identified by 0-based data row index only.
//! - Tick cells are always encoded as `FALSE`, `PAID` or `TRUE`.

pub mod client;
pub mod fee;
pub mod tick;
