//! Legal Compass API server
//!
//! REST endpoints for the legal services marketplace:
//! - Case intake and lifecycle
//! - Lead browsing and acceptance for verified attorneys
//! - Case chat, lawyer directory, reviews and document templates
//! - Realtime change feeds over Server-Sent Events
//! - Email, payment webhooks and streamed AI legal research

pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod handlers;
pub mod models;
pub mod notify;
pub mod realtime;
pub mod routes;
pub mod state;
pub mod stripe;


pub use config::Config;
pub use routes::build_router;
pub use state::AppState;
