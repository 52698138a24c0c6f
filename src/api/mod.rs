//! HTTP request layer. Validates input, calls the triage service and
//! serializes results. Holds no decision logic of its own.

pub mod routes;

pub use routes::{AppState, mail_routes};
