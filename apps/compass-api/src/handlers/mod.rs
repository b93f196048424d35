//! HTTP handlers for the Legal Compass API

use axum::Json;
use serde_json::{json, Value};

pub mod admin;
pub mod auth;
pub mod cases;
pub mod functions;
pub mod lawyers;
pub mod leads;
pub mod messages;
pub mod templates;

/// Health check endpoint
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "compass-api",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
