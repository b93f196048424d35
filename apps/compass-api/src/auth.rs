//! Bearer-token authentication
//!
//! The token only identifies the user; role and tier are read from the
//! profile row on every request so upgrades and verification apply at once.

use std::sync::Arc;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use chrono::{DateTime, Utc};
use shared_crypto::{extract_bearer_token, validate_access_token};
use shared_types::{Role, Tier, UserPublic};

use crate::error::ApiError;
use crate::models::DbProfile;
use crate::state::AppState;

/// The authenticated caller
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub tier: Tier,
    pub research_queries_used: u32,
    pub stripe_customer_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl AuthUser {
    pub fn require(&self, role: Role) -> Result<(), ApiError> {
        if self.role == role || self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden(format!(
                "This action requires a {} account",
                role
            )))
        }
    }

    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(ApiError::Forbidden("Admin access required".to_string()))
        }
    }
}

impl TryFrom<DbProfile> for AuthUser {
    type Error = ApiError;

    fn try_from(row: DbProfile) -> Result<Self, Self::Error> {
        let public = row.to_public()?;
        Ok(Self {
            id: public.id,
            email: public.email,
            full_name: public.full_name,
            role: public.role,
            tier: public.tier,
            research_queries_used: row.research_queries_used.max(0) as u32,
            stripe_customer_id: row.stripe_customer_id,
            created_at: public.created_at,
        })
    }
}

/// `access_token` query parameter, for EventSource clients that cannot set headers
fn query_token(parts: &Parts) -> Option<String> {
    parts.uri.query()?.split('&').find_map(|pair| {
        pair.strip_prefix("access_token=")
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let token = extract_bearer_token(header)
            .map(str::to_string)
            .or_else(|| query_token(parts))
            .ok_or(ApiError::Unauthorized)?;

        let claims = validate_access_token(&token, &state.config.jwt_secret).map_err(|e| {
            tracing::debug!(error = %e, "Rejected access token");
            ApiError::Unauthorized
        })?;

        let profile = DbProfile::find(&state.db, &claims.sub)
            .await?
            .ok_or(ApiError::Unauthorized)?;

        AuthUser::try_from(profile)
    }
}

impl From<&AuthUser> for UserPublic {
    fn from(user: &AuthUser) -> Self {
        UserPublic {
            id: user.id.clone(),
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
            tier: user.tier,
            created_at: user.created_at,
        }
    }
}
