//! Resend delivery
//!
//! Every send passes request validation, a per-second throttle and the
//! global day/month quota before the provider is contacted.

use std::num::NonZeroU32;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::quota::{QuotaCheck, SendQuota};
use crate::types::{EmailTag, SendEmailRequest, SendEmailResponse, ValidationError};
use crate::EmailProxyConfig;

/// Resend API endpoint
pub const RESEND_API_URL: &str = "https://api.resend.com/emails";

#[derive(Debug, Error)]
pub enum EmailError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Daily email limit reached ({limit}/day)")]
    DailyQuota { limit: u32 },

    #[error("Monthly email limit reached ({limit}/month)")]
    MonthlyQuota { limit: u32 },

    #[error("Too many emails per second")]
    Throttled,

    #[error("Email provider rejected the request ({status}): {message}")]
    Provider { status: u16, message: String },

    #[error("Failed to reach email provider: {0}")]
    Transport(String),
}

impl EmailError {
    /// Whether the caller exceeded an allowance rather than sent bad input
    pub fn is_quota(&self) -> bool {
        matches!(
            self,
            EmailError::DailyQuota { .. } | EmailError::MonthlyQuota { .. } | EmailError::Throttled
        )
    }
}

/// Anything that can deliver a [`SendEmailRequest`]
#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, request: SendEmailRequest) -> Result<SendEmailResponse, EmailError>;

    /// Address used when a request leaves `from` empty
    fn default_from(&self) -> &str;
}

#[derive(Debug, Serialize)]
struct ResendPayload<'a> {
    from: &'a str,
    to: &'a [String],
    subject: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    html: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_to: Option<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tags: &'a Vec<EmailTag>,
}

#[derive(Debug, Deserialize)]
struct ResendSuccess {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ResendFailure {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

fn provider_message(status: u16, body: &str) -> String {
    let detail = serde_json::from_str::<ResendFailure>(body)
        .ok()
        .and_then(|e| e.message.or(e.name))
        .unwrap_or_else(|| format!("HTTP {}", status));

    match status {
        401 => "Email service authentication failed.".to_string(),
        403 => "Email service access denied.".to_string(),
        422 => format!("Invalid email request: {}", detail),
        429 => "Email rate limit exceeded. Please try again later.".to_string(),
        500..=599 => "Email service temporarily unavailable.".to_string(),
        _ => detail,
    }
}

/// Resend-backed sender shared across request handlers
pub struct ResendSender {
    client: reqwest::Client,
    api_key: String,
    default_from: String,
    endpoint: String,
    throttle: DefaultDirectRateLimiter,
    quota: Arc<Mutex<SendQuota>>,
}

impl ResendSender {
    /// Build a sender, or `None` when no API key is configured
    pub fn from_config(config: &EmailProxyConfig) -> Option<Self> {
        let api_key = config.api_key.clone()?;
        let per_second = NonZeroU32::new(config.rate_limit_per_second.max(1))?;
        Some(Self {
            client: reqwest::Client::new(),
            api_key,
            default_from: config.default_from.clone(),
            endpoint: RESEND_API_URL.to_string(),
            throttle: RateLimiter::direct(Quota::per_second(per_second)),
            quota: Arc::new(Mutex::new(SendQuota::new(
                config.daily_limit,
                config.monthly_limit,
            ))),
        })
    }

    /// Point the client at another Resend-compatible endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    /// Remaining (daily, monthly) sends
    pub async fn remaining(&self) -> (u32, u32) {
        self.quota.lock().await.remaining(Utc::now())
    }

    async fn reserve(&self) -> Result<(), EmailError> {
        let check = self.quota.lock().await.try_reserve(Utc::now());
        match check {
            QuotaCheck::Allowed {
                daily_warning,
                monthly_warning,
            } => {
                if daily_warning {
                    warn!("Email daily quota above 80%");
                }
                if monthly_warning {
                    warn!("Email monthly quota above 80%");
                }
                Ok(())
            }
            QuotaCheck::DailyExceeded {
                limit,
                remaining_month,
            } => {
                warn!(limit, remaining_month, "Email daily quota exhausted");
                Err(EmailError::DailyQuota { limit })
            }
            QuotaCheck::MonthlyExceeded { limit } => {
                warn!(limit, "Email monthly quota exhausted");
                Err(EmailError::MonthlyQuota { limit })
            }
        }
    }
}

#[async_trait]
impl EmailSender for ResendSender {
    async fn send(&self, mut request: SendEmailRequest) -> Result<SendEmailResponse, EmailError> {
        if request.from.trim().is_empty() {
            request.from = self.default_from.clone();
        }
        request.validate()?;

        if self.throttle.check().is_err() {
            return Err(EmailError::Throttled);
        }
        self.reserve().await?;

        let payload = ResendPayload {
            from: &request.from,
            to: &request.to,
            subject: &request.subject,
            html: request.html.as_deref(),
            text: request.text.as_deref(),
            reply_to: request.reply_to.as_deref(),
            tags: &request.tags,
        };

        let result = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.quota.lock().await.release();
                warn!(error = %e, "Resend request failed");
                return Err(EmailError::Transport(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let body = response.text().await.unwrap_or_default();

        if !(200..300).contains(&status) {
            self.quota.lock().await.release();
            warn!(status, body = %body, "Resend rejected email");
            return Err(EmailError::Provider {
                status,
                message: provider_message(status, &body),
            });
        }

        let id = match serde_json::from_str::<ResendSuccess>(&body) {
            Ok(success) => success.id,
            Err(e) => {
                // Accepted by the provider even if the body is unexpected
                warn!(error = %e, "Unparseable Resend response");
                "resend:unknown".to_string()
            }
        };
        info!(id = %id, recipients = request.to.len(), "Email sent");

        Ok(SendEmailResponse {
            id,
            queued_at: Utc::now(),
        })
    }

    fn default_from(&self) -> &str {
        &self.default_from
    }
}
