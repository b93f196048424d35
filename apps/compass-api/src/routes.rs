//! Router assembly
//!
//! Rate limiting is layered on in `main` because it needs the peer address,
//! which in-process test clients do not provide.

use std::sync::Arc;

use axum::{
    routing::{get, patch, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers::{self, admin, auth, cases, functions, lawyers, leads, messages, templates};
use crate::realtime;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Auth
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/me", get(auth::me))
        // Cases
        .route("/api/cases", post(cases::create_case).get(cases::list_cases))
        .route("/api/cases/:id", get(cases::get_case))
        .route("/api/cases/:id/status", patch(cases::update_status))
        .route(
            "/api/cases/:id/messages",
            get(messages::list_messages).post(messages::send_message),
        )
        .route("/api/cases/:id/messages/read", post(messages::mark_read))
        // Leads
        .route("/api/leads", get(leads::list_leads))
        .route("/api/leads/:case_id/accept", post(leads::accept_lead))
        .route("/api/purchases", get(leads::list_purchases))
        // Lawyers
        .route("/api/lawyers", get(lawyers::list_lawyers))
        .route("/api/lawyers/me", put(lawyers::upsert_my_profile))
        .route("/api/lawyers/:id", get(lawyers::get_lawyer))
        .route("/api/lawyers/:id/reviews", post(lawyers::create_review))
        // Templates
        .route(
            "/api/templates",
            get(templates::list_templates).post(templates::create_template),
        )
        .route("/api/templates/:id", get(templates::get_template))
        .route("/api/templates/:id/generate", post(templates::generate))
        // Admin
        .route("/api/admin/lawyers/:id/verify", post(admin::verify_lawyer))
        // Realtime
        .route("/realtime/:table", get(realtime::subscribe))
        // Functions
        .route("/functions/send-email", post(functions::send_email))
        .route("/functions/stripe-webhook", post(functions::stripe_webhook))
        .route("/functions/legal-research", post(functions::legal_research))
        .route("/functions/check-subscription", get(functions::check_subscription))
        .route("/functions/create-checkout", post(functions::create_checkout))
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
