//! HTTP surface for ClientDesk.
//!
//! # Responsibility
//! - Expose the desk service over JSON and HTML routes.
//! - Keep blocking store calls off the async reactor.
//!
//! # Invariants
//! - Mutating routes always answer `200` with a `{status, message?}` body.
//! - Read routes answer `500` with a JSON message when the store fails.

pub mod handlers;
pub mod render;
pub mod routes;

use clientdesk_core::DeskService;
use std::sync::Arc;

pub use routes::routes;

/// Desk service shared by every request.
pub type SharedDesk = Arc<DeskService>;
