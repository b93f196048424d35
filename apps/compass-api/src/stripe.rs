//! Stripe REST client and webhook payloads
//!
//! Only the handful of fields the marketplace needs are modeled; the rest
//! of each object is ignored.

use serde::Deserialize;
use shared_types::Tier;
use std::collections::HashMap;
use thiserror::Error;
use tracing::debug;

const STRIPE_API_BASE: &str = "https://api.stripe.com/v1";

/// `metadata.kind` on checkout sessions created for a single lead
pub const KIND_LEAD_PURCHASE: &str = "lead_purchase";
/// `metadata.kind` on checkout sessions created for the pro plan
pub const KIND_SUBSCRIPTION: &str = "subscription";

#[derive(Debug, Error)]
pub enum StripeError {
    #[error("Stripe API error: {0}")]
    Api(String),

    #[error("Stripe request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Stripe Checkout Session (subset of fields we need)
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetails {
    message: String,
}

/// One-off payment for an accepted lead
pub struct LeadCheckout<'a> {
    pub purchase_id: &'a str,
    pub case_id: &'a str,
    pub attorney_email: &'a str,
    pub amount_cents: i64,
    pub success_url: String,
    pub cancel_url: String,
}

/// Pro plan subscription for a user
pub struct SubscriptionCheckout<'a> {
    pub user_id: &'a str,
    pub email: &'a str,
    pub customer_id: Option<&'a str>,
    pub price_id: &'a str,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Clone)]
pub struct StripeClient {
    http: reqwest::Client,
    secret_key: String,
    api_base: String,
}

impl StripeClient {
    pub fn new(secret_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            secret_key: secret_key.to_string(),
            api_base: STRIPE_API_BASE.to_string(),
        }
    }

    pub fn with_api_base(mut self, base: impl Into<String>) -> Self {
        self.api_base = base.into();
        self
    }

    async fn create_session(&self, form: &[(String, String)]) -> Result<CheckoutSession, StripeError> {
        let response = self
            .http
            .post(format!("{}/checkout/sessions", self.api_base))
            .bearer_auth(&self.secret_key)
            .form(form)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("HTTP {}", status.as_u16()));
            return Err(StripeError::Api(message));
        }

        let session: CheckoutSession =
            serde_json::from_str(&text).map_err(|e| StripeError::Api(e.to_string()))?;
        debug!(session = %session.id, "Created checkout session");
        Ok(session)
    }

    pub async fn create_lead_checkout(
        &self,
        lead: &LeadCheckout<'_>,
    ) -> Result<CheckoutSession, StripeError> {
        self.create_session(&lead_checkout_form(lead)).await
    }

    pub async fn create_subscription_checkout(
        &self,
        sub: &SubscriptionCheckout<'_>,
    ) -> Result<CheckoutSession, StripeError> {
        self.create_session(&subscription_checkout_form(sub)).await
    }
}

fn pair(key: &str, value: impl Into<String>) -> (String, String) {
    (key.to_string(), value.into())
}

fn lead_checkout_form(lead: &LeadCheckout<'_>) -> Vec<(String, String)> {
    vec![
        pair("mode", "payment"),
        pair("customer_email", lead.attorney_email),
        pair("client_reference_id", lead.purchase_id),
        pair("success_url", lead.success_url.clone()),
        pair("cancel_url", lead.cancel_url.clone()),
        pair("line_items[0][quantity]", "1"),
        pair("line_items[0][price_data][currency]", "usd"),
        pair("line_items[0][price_data][unit_amount]", lead.amount_cents.to_string()),
        pair("line_items[0][price_data][product_data][name]", "Legal Compass lead"),
        pair("metadata[kind]", KIND_LEAD_PURCHASE),
        pair("metadata[purchase_id]", lead.purchase_id),
        pair("metadata[case_id]", lead.case_id),
    ]
}

fn subscription_checkout_form(sub: &SubscriptionCheckout<'_>) -> Vec<(String, String)> {
    let mut form = vec![
        pair("mode", "subscription"),
        pair("client_reference_id", sub.user_id),
        pair("success_url", sub.success_url.clone()),
        pair("cancel_url", sub.cancel_url.clone()),
        pair("line_items[0][price]", sub.price_id),
        pair("line_items[0][quantity]", "1"),
        pair("metadata[kind]", KIND_SUBSCRIPTION),
        pair("metadata[user_id]", sub.user_id),
        pair("subscription_data[metadata][user_id]", sub.user_id),
    ];
    match sub.customer_id {
        Some(customer) => form.push(pair("customer", customer)),
        None => form.push(pair("customer_email", sub.email)),
    }
    form
}

// ============================================================
// Webhook payloads
// ============================================================

/// Stripe Webhook Event
#[derive(Debug, Deserialize)]
pub struct StripeEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Stripe Subscription from webhook
#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    pub customer: String,
}

/// Tier implied by a subscription status
pub fn tier_for_subscription_status(status: &str) -> Tier {
    match status {
        "active" | "trialing" => Tier::Pro,
        _ => Tier::Free,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn form_value<'a>(form: &'a [(String, String)], key: &str) -> Option<&'a str> {
        form.iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_lead_checkout_form() {
        let form = lead_checkout_form(&LeadCheckout {
            purchase_id: "p-1",
            case_id: "c-1",
            attorney_email: "ada@example.com",
            amount_cents: 4900,
            success_url: "https://app/success".to_string(),
            cancel_url: "https://app/cancel".to_string(),
        });
        assert_eq!(form_value(&form, "mode"), Some("payment"));
        assert_eq!(form_value(&form, "metadata[kind]"), Some("lead_purchase"));
        assert_eq!(form_value(&form, "metadata[purchase_id]"), Some("p-1"));
        assert_eq!(
            form_value(&form, "line_items[0][price_data][unit_amount]"),
            Some("4900")
        );
    }

    #[test]
    fn test_subscription_form_prefers_existing_customer() {
        let mut sub = SubscriptionCheckout {
            user_id: "u-1",
            email: "sam@example.com",
            customer_id: Some("cus_123"),
            price_id: "price_pro",
            success_url: String::new(),
            cancel_url: String::new(),
        };
        let form = subscription_checkout_form(&sub);
        assert_eq!(form_value(&form, "customer"), Some("cus_123"));
        assert_eq!(form_value(&form, "customer_email"), None);

        sub.customer_id = None;
        let form = subscription_checkout_form(&sub);
        assert_eq!(form_value(&form, "customer_email"), Some("sam@example.com"));
        assert_eq!(form_value(&form, "metadata[kind]"), Some("subscription"));
    }

    #[test]
    fn test_subscription_status_to_tier() {
        assert_eq!(tier_for_subscription_status("active"), Tier::Pro);
        assert_eq!(tier_for_subscription_status("trialing"), Tier::Pro);
        assert_eq!(tier_for_subscription_status("past_due"), Tier::Free);
        assert_eq!(tier_for_subscription_status("canceled"), Tier::Free);
    }

    #[test]
    fn test_event_parsing() {
        let event: StripeEvent = serde_json::from_str(
            r#"{"id":"evt_1","type":"checkout.session.completed","data":{"object":{"id":"cs_1","metadata":{"kind":"lead_purchase"}}}}"#,
        )
        .unwrap();
        assert_eq!(event.event_type, "checkout.session.completed");
        let session: CheckoutSession = serde_json::from_value(event.data.object).unwrap();
        assert_eq!(session.metadata.get("kind").map(String::as_str), Some("lead_purchase"));
    }
}
