//! Database rows and request/response bodies

use std::str::FromStr;

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{
    Attachment, CaseStatus, ChatMessage, DocumentTemplate, LawyerProfile, LeadPurchase, LegalCase,
    PaymentStatus, Review, Role, Tier, Urgency, UserPublic, UsState,
};
use sqlx::{FromRow, SqlitePool};

use crate::error::ApiError;

fn parse<T>(value: &str) -> Result<T, ApiError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ApiError::Internal(anyhow!("corrupt row value: {}", e)))
}

fn parse_json<T: serde::de::DeserializeOwned>(value: &str) -> Result<T, ApiError> {
    serde_json::from_str(value).map_err(|e| ApiError::Internal(e.into()))
}

// ============================================================
// Rows
// ============================================================

#[derive(Debug, Clone, FromRow)]
pub struct DbProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub tier: String,
    pub password_hash: String,
    pub stripe_customer_id: Option<String>,
    pub research_queries_used: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbProfile {
    pub async fn find(db: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM profiles WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn find_by_email(db: &SqlitePool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM profiles WHERE email = ?")
            .bind(email.trim().to_lowercase())
            .fetch_optional(db)
            .await
    }

    pub fn to_public(&self) -> Result<UserPublic, ApiError> {
        Ok(UserPublic {
            id: self.id.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            role: parse::<Role>(&self.role)?,
            tier: parse::<Tier>(&self.tier)?,
            created_at: self.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbCase {
    pub id: String,
    pub client_id: String,
    pub topic: String,
    pub state: String,
    pub urgency: String,
    pub description: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbCase {
    pub async fn find(db: &SqlitePool, id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM cases WHERE id = ?")
            .bind(id)
            .fetch_optional(db)
            .await
    }
}

impl TryFrom<DbCase> for LegalCase {
    type Error = ApiError;

    fn try_from(row: DbCase) -> Result<Self, Self::Error> {
        Ok(LegalCase {
            state: parse::<UsState>(&row.state)?,
            urgency: parse::<Urgency>(&row.urgency)?,
            status: parse::<CaseStatus>(&row.status)?,
            id: row.id,
            client_id: row.client_id,
            topic: row.topic,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbLeadPurchase {
    pub id: String,
    pub case_id: String,
    pub attorney_id: String,
    pub payment_status: String,
    pub amount_cents: i64,
    pub stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DbLeadPurchase {
    pub async fn for_case(db: &SqlitePool, case_id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as("SELECT * FROM lead_purchases WHERE case_id = ?")
            .bind(case_id)
            .fetch_optional(db)
            .await
    }
}

impl TryFrom<DbLeadPurchase> for LeadPurchase {
    type Error = ApiError;

    fn try_from(row: DbLeadPurchase) -> Result<Self, Self::Error> {
        Ok(LeadPurchase {
            payment_status: parse::<PaymentStatus>(&row.payment_status)?,
            id: row.id,
            case_id: row.case_id,
            attorney_id: row.attorney_id,
            amount_cents: row.amount_cents,
            stripe_session_id: row.stripe_session_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbMessage {
    pub id: String,
    pub case_id: String,
    pub sender_id: String,
    pub content: String,
    pub attachments: String,
    pub read_by_recipient: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbMessage> for ChatMessage {
    type Error = ApiError;

    fn try_from(row: DbMessage) -> Result<Self, Self::Error> {
        Ok(ChatMessage {
            attachments: parse_json::<Vec<Attachment>>(&row.attachments)?,
            id: row.id,
            case_id: row.case_id,
            sender_id: row.sender_id,
            content: row.content,
            read_by_recipient: row.read_by_recipient,
            created_at: row.created_at,
        })
    }
}

/// Lawyer profile joined with the owner's display name
#[derive(Debug, Clone, FromRow)]
pub struct DbLawyer {
    pub user_id: String,
    pub full_name: String,
    pub bar_number: String,
    pub licensed_states: String,
    pub practice_areas: String,
    pub years_experience: i64,
    pub bio: String,
    pub hourly_rate_cents: Option<i64>,
    pub verified: bool,
    pub rating_avg: f64,
    pub rating_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub const LAWYER_SELECT: &str = r#"
    SELECT lp.user_id, p.full_name, lp.bar_number, lp.licensed_states, lp.practice_areas,
           lp.years_experience, lp.bio, lp.hourly_rate_cents, lp.verified, lp.rating_avg,
           lp.rating_count, lp.created_at, lp.updated_at
    FROM lawyer_profiles lp
    JOIN profiles p ON p.id = lp.user_id
"#;

impl DbLawyer {
    pub async fn find(db: &SqlitePool, user_id: &str) -> Result<Option<Self>, sqlx::Error> {
        sqlx::query_as(&format!("{} WHERE lp.user_id = ?", LAWYER_SELECT))
            .bind(user_id)
            .fetch_optional(db)
            .await
    }
}

impl TryFrom<DbLawyer> for LawyerProfile {
    type Error = ApiError;

    fn try_from(row: DbLawyer) -> Result<Self, Self::Error> {
        Ok(LawyerProfile {
            licensed_states: parse_json(&row.licensed_states)?,
            practice_areas: parse_json(&row.practice_areas)?,
            years_experience: row.years_experience.max(0) as u32,
            rating_count: row.rating_count.max(0) as u32,
            user_id: row.user_id,
            full_name: row.full_name,
            bar_number: row.bar_number,
            bio: row.bio,
            hourly_rate_cents: row.hourly_rate_cents,
            verified: row.verified,
            rating_avg: row.rating_avg,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbTemplate {
    pub id: String,
    pub title: String,
    pub category: String,
    pub state: Option<String>,
    pub description: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<DbTemplate> for DocumentTemplate {
    type Error = ApiError;

    fn try_from(row: DbTemplate) -> Result<Self, Self::Error> {
        Ok(DocumentTemplate {
            state: row.state.as_deref().map(parse::<UsState>).transpose()?,
            id: row.id,
            title: row.title,
            category: row.category,
            description: row.description,
            body: row.body,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DbReview {
    pub id: String,
    pub attorney_id: String,
    pub client_id: String,
    pub case_id: String,
    pub rating: i64,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<DbReview> for Review {
    fn from(row: DbReview) -> Self {
        Review {
            id: row.id,
            attorney_id: row.attorney_id,
            client_id: row.client_id,
            case_id: row.case_id,
            rating: row.rating.clamp(1, 5) as u8,
            comment: row.comment,
            created_at: row.created_at,
        }
    }
}

// ============================================================
// Request bodies
// ============================================================

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(default)]
    pub role: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct LeadFilter {
    pub state: Option<String>,
    pub topic: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LawyerFilter {
    pub state: Option<String>,
    pub practice_area: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LawyerProfileRequest {
    pub bar_number: String,
    pub licensed_states: Vec<String>,
    pub practice_areas: Vec<String>,
    #[serde(default)]
    pub years_experience: u32,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub hourly_rate_cents: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub case_id: String,
    pub rating: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TemplateFilter {
    pub category: Option<String>,
    pub state: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default)]
    pub fields: std::collections::HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateTemplateRequest {
    pub title: String,
    pub category: String,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub description: String,
    pub body: String,
}

// ============================================================
// Response bodies
// ============================================================

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserPublic,
}

/// What an attorney sees before accepting a lead
#[derive(Debug, Serialize)]
pub struct LeadPreview {
    pub id: String,
    pub topic: String,
    pub state: UsState,
    pub urgency: Urgency,
    pub preview: String,
    pub created_at: DateTime<Utc>,
}

/// Characters of the description shown in a lead preview
pub const PREVIEW_CHARS: usize = 160;

impl From<&LegalCase> for LeadPreview {
    fn from(case: &LegalCase) -> Self {
        Self {
            id: case.id.clone(),
            topic: case.topic.clone(),
            state: case.state,
            urgency: case.urgency,
            preview: case.preview(PREVIEW_CHARS),
            created_at: case.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AcceptLeadResponse {
    pub purchase: LeadPurchase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checkout_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TemplateSummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub state: Option<UsState>,
    pub description: String,
    pub fields: Vec<String>,
}

impl From<&DocumentTemplate> for TemplateSummary {
    fn from(t: &DocumentTemplate) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            category: t.category.clone(),
            state: t.state,
            description: t.description.clone(),
            fields: marketplace_core::templates::placeholders(&t.body),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GeneratedDocument {
    pub template_id: String,
    pub title: String,
    pub document: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionStatus {
    pub tier: Tier,
    pub subscribed: bool,
    pub leads_used: u32,
    pub leads_limit: u32,
    pub templates_used: u32,
    pub templates_limit: Option<u32>,
    /// `None` when unlimited
    pub research_remaining: Option<u32>,
}
