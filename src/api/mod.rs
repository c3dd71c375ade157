//! HTTP API for the lead form.

pub mod routes;

pub use routes::{AppState, lead_routes};
