//! Plain relational records shared by the API server and the rule crates.
//!
//! Enums are stored as lowercase TEXT columns, so each one carries a
//! `Display`/`FromStr` pair that matches its serde representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::jurisdiction::UsState;

/// Failure to parse a stored enum value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! text_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Client,
    Attorney,
    Admin,
}

text_enum!(Role, "role", {
    Client => "client",
    Attorney => "attorney",
    Admin => "admin",
});

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    #[default]
    Free,
    Pro,
}

text_enum!(Tier, "tier", {
    Free => "free",
    Pro => "pro",
});

/// Lifecycle of a submitted case
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Open,
    Accepted,
    InProgress,
    Closed,
}

text_enum!(CaseStatus, "case status", {
    Open => "open",
    Accepted => "accepted",
    InProgress => "in_progress",
    Closed => "closed",
});

/// How soon the client needs help
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
    Emergency,
}

text_enum!(Urgency, "urgency", {
    Low => "low",
    Medium => "medium",
    High => "high",
    Emergency => "emergency",
});

/// Payment state of a lead purchase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    /// Covered by the attorney's subscription, no checkout needed
    Included,
}

text_enum!(PaymentStatus, "payment status", {
    Pending => "pending",
    Paid => "paid",
    Failed => "failed",
    Included => "included",
});

/// Profile fields safe to return to any authenticated caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserPublic {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub tier: Tier,
    pub created_at: DateTime<Utc>,
}

/// A legal case submitted by a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegalCase {
    pub id: String,
    pub client_id: String,
    pub topic: String,
    pub state: UsState,
    pub urgency: Urgency,
    pub description: String,
    pub status: CaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LegalCase {
    /// Short description shown to attorneys browsing leads
    pub fn preview(&self, max_chars: usize) -> String {
        let trimmed = self.description.trim();
        if trimmed.chars().count() <= max_chars {
            return trimmed.to_string();
        }
        let cut: String = trimmed.chars().take(max_chars).collect();
        format!("{}...", cut.trim_end())
    }
}

/// Links an attorney to a case they accepted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadPurchase {
    pub id: String,
    pub case_id: String,
    pub attorney_id: String,
    pub payment_status: PaymentStatus,
    pub amount_cents: i64,
    pub stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A file attached to a chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub size_bytes: u64,
    #[serde(default)]
    pub content_type: Option<String>,
}

/// Chat message between a client and the attorney on a case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub case_id: String,
    pub sender_id: String,
    pub content: String,
    pub attachments: Vec<Attachment>,
    pub read_by_recipient: bool,
    pub created_at: DateTime<Utc>,
}

/// Credentials and ratings of an attorney
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LawyerProfile {
    pub user_id: String,
    pub full_name: String,
    pub bar_number: String,
    pub licensed_states: Vec<UsState>,
    pub practice_areas: Vec<String>,
    pub years_experience: u32,
    pub bio: String,
    pub hourly_rate_cents: Option<i64>,
    pub verified: bool,
    pub rating_avg: f64,
    pub rating_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LawyerProfile {
    pub fn is_licensed_in(&self, state: UsState) -> bool {
        self.licensed_states.contains(&state)
    }

    pub fn practices(&self, area: &str) -> bool {
        self.practice_areas
            .iter()
            .any(|a| a.eq_ignore_ascii_case(area))
    }
}

/// Client review of an attorney
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub attorney_id: String,
    pub client_id: String,
    pub case_id: String,
    pub rating: u8,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fill-in-the-blanks legal document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentTemplate {
    pub id: String,
    pub title: String,
    pub category: String,
    pub state: Option<UsState>,
    pub description: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
}
