//! Secret-holding endpoints: email, payments and AI research
//!
//! These run server-side because each one needs a credential the browser
//! must never see.

use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use email_proxy::{EmailError, SendEmailRequest, SendEmailResponse};
use marketplace_core::quotas::{self, TierLimits};
use research_stream::{ResearchRequest, Role as TurnRole};
use serde_json::{json, Value};
use shared_crypto::verify_webhook_signature;
use shared_types::{ChangeEvent, ChangeKind, LeadPurchase, PaymentStatus, Table, Tier};
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::gateway::GatewayMessage;
use crate::handlers::leads::leads_used_this_month;
use crate::handlers::templates::templates_used;
use crate::models::{DbLeadPurchase, SubscriptionStatus};
use crate::state::AppState;
use crate::stripe::{
    tier_for_subscription_status, CheckoutSession, StripeEvent, StripeSubscription,
    SubscriptionCheckout, KIND_LEAD_PURCHASE, KIND_SUBSCRIPTION,
};

const STRIPE_SIGNATURE: &str = "stripe-signature";

const RESEARCH_SYSTEM_PROMPT: &str = "You are Legal Compass, a legal research assistant for people \
in the United States. Explain the law in plain language, name the jurisdiction your answer \
depends on, cite statutes or cases where you can, and point out when the user should speak \
with a licensed attorney. You provide legal information, not legal advice.";

// ============================================================
// Email
// ============================================================

/// `POST /functions/send-email`
pub async fn send_email(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<SendEmailRequest>,
) -> ApiResult<Json<SendEmailResponse>> {
    let sender = state
        .email
        .as_ref()
        .ok_or(ApiError::NotConfigured("Email"))?;

    let recipients = req.to.len();
    let response = sender.send(req).await.map_err(|e| match e {
        EmailError::Validation(v) => ApiError::InvalidRequest(v.to_string()),
        e if e.is_quota() => ApiError::RateLimited(e.to_string()),
        e => ApiError::Upstream(e.to_string()),
    })?;

    info!(user = %user.id, id = %response.id, recipients, "Email sent");
    Ok(Json(response))
}

// ============================================================
// Stripe
// ============================================================

/// `POST /functions/stripe-webhook`
pub async fn stripe_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let secret = state
        .config
        .stripe_webhook_secret
        .as_deref()
        .filter(|s| !s.is_empty())
        .ok_or(ApiError::NotConfigured("Stripe webhook"))?;

    let signature = headers
        .get(STRIPE_SIGNATURE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ApiError::InvalidRequest("Missing Stripe-Signature header".to_string()))?;

    verify_webhook_signature(&body, signature, secret, Utc::now().timestamp()).map_err(|e| {
        warn!(error = %e, "Rejected webhook delivery");
        ApiError::InvalidRequest("Invalid webhook signature".to_string())
    })?;

    let event: StripeEvent = serde_json::from_slice(&body)
        .map_err(|e| ApiError::InvalidRequest(format!("Malformed event: {}", e)))?;
    info!(event = %event.id, kind = %event.event_type, "Stripe webhook received");

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSession = serde_json::from_value(event.data.object)
                .map_err(|e| ApiError::InvalidRequest(format!("Malformed session: {}", e)))?;
            checkout_completed(&state, &session).await?;
        }
        "checkout.session.expired" | "checkout.session.async_payment_failed" => {
            let session: CheckoutSession = serde_json::from_value(event.data.object)
                .map_err(|e| ApiError::InvalidRequest(format!("Malformed session: {}", e)))?;
            if let Some(purchase_id) = lead_purchase_id(&session.metadata) {
                set_payment_status(&state, purchase_id, PaymentStatus::Failed).await?;
            }
        }
        "customer.subscription.updated" | "customer.subscription.deleted" => {
            let sub: StripeSubscription = serde_json::from_value(event.data.object)
                .map_err(|e| ApiError::InvalidRequest(format!("Malformed subscription: {}", e)))?;
            let tier = if event.event_type == "customer.subscription.deleted" {
                Tier::Free
            } else {
                tier_for_subscription_status(&sub.status)
            };
            set_tier_for_customer(&state, &sub.customer, tier).await?;
            info!(subscription = %sub.id, status = %sub.status, tier = %tier, "Subscription changed");
        }
        "invoice.payment_failed" => {
            let object = &event.data.object;
            warn!(
                invoice = object["id"].as_str().unwrap_or_default(),
                customer = object["customer"].as_str().unwrap_or_default(),
                "Invoice payment failed"
            );
            if let Some(purchase_id) = object["metadata"]["purchase_id"].as_str() {
                set_payment_status(&state, purchase_id, PaymentStatus::Failed).await?;
            }
        }
        other => debug!(kind = other, "Ignoring webhook event"),
    }

    Ok(Json(json!({ "received": true })))
}

fn lead_purchase_id(metadata: &std::collections::HashMap<String, String>) -> Option<&str> {
    (metadata.get("kind").map(String::as_str) == Some(KIND_LEAD_PURCHASE))
        .then(|| metadata.get("purchase_id").map(String::as_str))
        .flatten()
}

async fn checkout_completed(state: &Arc<AppState>, session: &CheckoutSession) -> ApiResult<()> {
    match session.metadata.get("kind").map(String::as_str) {
        Some(KIND_LEAD_PURCHASE) => {
            if let Some(purchase_id) = lead_purchase_id(&session.metadata) {
                set_payment_status(state, purchase_id, PaymentStatus::Paid).await?;
            }
        }
        Some(KIND_SUBSCRIPTION) => {
            let Some(user_id) = session.metadata.get("user_id") else {
                warn!(session = %session.id, "Subscription checkout without user_id");
                return Ok(());
            };
            sqlx::query(
                r#"
                UPDATE profiles
                SET tier = 'pro', stripe_customer_id = COALESCE(?, stripe_customer_id), updated_at = ?
                WHERE id = ?
                "#,
            )
            .bind(session.customer.as_deref())
            .bind(Utc::now())
            .bind(user_id)
            .execute(&state.db)
            .await?;
            info!(user = %user_id, "Upgraded to pro");
        }
        other => debug!(session = %session.id, kind = ?other, "Checkout without known kind"),
    }
    Ok(())
}

async fn set_payment_status(
    state: &Arc<AppState>,
    purchase_id: &str,
    status: PaymentStatus,
) -> ApiResult<()> {
    let result = sqlx::query(
        "UPDATE lead_purchases SET payment_status = ?, updated_at = ? WHERE id = ?",
    )
    .bind(status.as_str())
    .bind(Utc::now())
    .bind(purchase_id)
    .execute(&state.db)
    .await?;
    if result.rows_affected() == 0 {
        warn!(purchase = purchase_id, "Webhook for unknown lead purchase");
        return Ok(());
    }

    let row: Option<DbLeadPurchase> = sqlx::query_as("SELECT * FROM lead_purchases WHERE id = ?")
        .bind(purchase_id)
        .fetch_optional(&state.db)
        .await?;
    if let Some(row) = row {
        let purchase = LeadPurchase::try_from(row)?;
        info!(purchase = %purchase.id, status = %purchase.payment_status, "Lead payment updated");
        state.realtime.publish(ChangeEvent::new(
            Table::LeadPurchases,
            ChangeKind::Update,
            Some(&purchase.case_id),
            &purchase,
        ));
    }
    Ok(())
}

async fn set_tier_for_customer(state: &Arc<AppState>, customer: &str, tier: Tier) -> ApiResult<()> {
    let result =
        sqlx::query("UPDATE profiles SET tier = ?, updated_at = ? WHERE stripe_customer_id = ?")
            .bind(tier.as_str())
            .bind(Utc::now())
            .bind(customer)
            .execute(&state.db)
            .await?;
    if result.rows_affected() == 0 {
        warn!(customer, "Subscription event for unknown customer");
    }
    Ok(())
}

/// `POST /functions/create-checkout`
pub async fn create_checkout(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Value>> {
    let stripe = state.stripe.as_ref().ok_or(ApiError::NotConfigured("Stripe"))?;
    let price_id = state
        .config
        .stripe_pro_price_id
        .as_deref()
        .filter(|p| !p.is_empty())
        .ok_or(ApiError::NotConfigured("Pro plan pricing"))?;

    if user.tier == Tier::Pro {
        return Err(ApiError::Conflict(
            "You are already on the pro plan".to_string(),
        ));
    }

    let session = stripe
        .create_subscription_checkout(&SubscriptionCheckout {
            user_id: &user.id,
            email: &user.email,
            customer_id: user.stripe_customer_id.as_deref(),
            price_id,
            success_url: state.config.app_url("/billing?checkout=success"),
            cancel_url: state.config.app_url("/billing?checkout=cancelled"),
        })
        .await
        .map_err(|e| ApiError::Upstream(e.to_string()))?;

    info!(user = %user.id, session = %session.id, "Subscription checkout created");
    Ok(Json(json!({
        "session_id": session.id,
        "url": session.url,
    })))
}

/// `GET /functions/check-subscription`
pub async fn check_subscription(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<SubscriptionStatus>> {
    let limits = TierLimits::for_tier(user.tier);
    let leads_used = leads_used_this_month(&state.db, &user.id, Utc::now()).await?;
    let templates_used = templates_used(&state.db, &user.id).await?;

    Ok(Json(SubscriptionStatus {
        tier: user.tier,
        subscribed: user.tier == Tier::Pro,
        leads_used,
        leads_limit: limits.monthly_leads,
        templates_used,
        templates_limit: limits.templates,
        research_remaining: quotas::remaining(limits.research_queries, user.research_queries_used),
    }))
}

// ============================================================
// AI research
// ============================================================

fn gateway_messages(req: &ResearchRequest) -> Vec<GatewayMessage> {
    let mut messages = vec![GatewayMessage::new("system", RESEARCH_SYSTEM_PROMPT)];

    if !req.files.is_empty() {
        let listing = req
            .files
            .iter()
            .map(|f| format!("- {} ({})", f.name, f.url))
            .collect::<Vec<_>>()
            .join("\n");
        messages.push(GatewayMessage::new(
            "system",
            format!("The user has shared these documents:\n{}", listing),
        ));
    }

    messages.extend(req.messages.iter().map(|turn| {
        let role = match turn.role {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
        };
        GatewayMessage::new(role, turn.content.clone())
    }));
    messages
}

/// Count a research query before calling the gateway
///
/// The trial limit is enforced by the UPDATE itself.
async fn reserve_research_query(db: &SqlitePool, user: &AuthUser) -> ApiResult<()> {
    let limit = TierLimits::for_tier(user.tier).research_queries;
    let reserved = sqlx::query(
        r#"
        UPDATE profiles SET research_queries_used = research_queries_used + 1, updated_at = ?
        WHERE id = ? AND (? IS NULL OR research_queries_used < ?)
        "#,
    )
    .bind(Utc::now())
    .bind(&user.id)
    .bind(limit.map(i64::from))
    .bind(limit.map(i64::from))
    .execute(db)
    .await?;
    if reserved.rows_affected() == 0 {
        return Err(quotas::QuotaError::TrialExhausted.into());
    }
    Ok(())
}

/// Give back a reserved query the gateway never answered
async fn refund_research_query(db: &SqlitePool, user_id: &str) -> ApiResult<()> {
    sqlx::query(
        r#"
        UPDATE profiles SET research_queries_used = MAX(research_queries_used - 1, 0), updated_at = ?
        WHERE id = ?
        "#,
    )
    .bind(Utc::now())
    .bind(user_id)
    .execute(db)
    .await?;
    Ok(())
}

/// `POST /functions/legal-research`
pub async fn legal_research(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<ResearchRequest>,
) -> ApiResult<Response> {
    if req.messages.iter().all(|m| m.content.trim().is_empty()) {
        return Err(ApiError::InvalidRequest(
            "At least one message is required".to_string(),
        ));
    }
    let gateway = state
        .gateway
        .clone()
        .ok_or(ApiError::NotConfigured("AI research"))?;

    quotas::check_research_trial(user.tier, user.research_queries_used)?;
    reserve_research_query(&state.db, &user).await?;

    let stream = match gateway.stream_chat(gateway_messages(&req)).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(user = %user.id, error = %e, "AI gateway request failed");
            refund_research_query(&state.db, &user.id).await?;
            return Err(ApiError::Upstream(e.to_string()));
        }
    };

    info!(
        user = %user.id,
        turns = req.messages.len(),
        files = req.files.len(),
        "Streaming legal research"
    );

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_stream::{ConversationTurn, FileReference};

    #[test]
    fn test_gateway_messages_prepend_system_prompt() {
        let req = ResearchRequest {
            messages: vec![
                ConversationTurn::user("Is a verbal lease binding?"),
                ConversationTurn::assistant("Often, for short terms."),
            ],
            files: vec![],
        };
        let messages = gateway_messages(&req);
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1], GatewayMessage::new("user", "Is a verbal lease binding?"));
        assert_eq!(messages[2].role, "assistant");
    }

    #[test]
    fn test_gateway_messages_list_files() {
        let req = ResearchRequest {
            messages: vec![ConversationTurn::user("Summarize my lease")],
            files: vec![FileReference {
                name: "lease.pdf".to_string(),
                url: "https://files.example.com/lease.pdf".to_string(),
                content_type: None,
            }],
        };
        let messages = gateway_messages(&req);
        assert_eq!(messages.len(), 3);
        assert!(messages[1].content.contains("lease.pdf"));
    }

    #[test]
    fn test_lead_purchase_id_requires_kind() {
        let mut metadata = std::collections::HashMap::new();
        metadata.insert("purchase_id".to_string(), "p-1".to_string());
        assert_eq!(lead_purchase_id(&metadata), None);

        metadata.insert("kind".to_string(), KIND_LEAD_PURCHASE.to_string());
        assert_eq!(lead_purchase_id(&metadata), Some("p-1"));
    }
}
