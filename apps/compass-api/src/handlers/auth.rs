//! Registration, login and the current profile

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use chrono::Utc;
use email_proxy::EmailTemplate;
use marketplace_core::patterns::is_valid_email;
use shared_crypto::{
    generate_access_token, hash_password, validate_password_strength, verify_password,
};
use shared_types::{Role, Tier, UserPublic};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{conflict_on_unique, ApiError, ApiResult};
use crate::models::{AuthResponse, DbProfile, LoginRequest, RegisterRequest};
use crate::notify::spawn_email;
use crate::state::AppState;

const MAX_NAME_CHARS: usize = 120;

fn issue_token(state: &AppState, user: &UserPublic) -> ApiResult<String> {
    generate_access_token(
        &user.id,
        &user.email,
        user.role.as_str(),
        &state.config.jwt_secret,
    )
    .map_err(|e| ApiError::Internal(e.into()))
}

/// `POST /auth/register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<AuthResponse>)> {
    let email = req.email.trim().to_lowercase();
    if !is_valid_email(&email) {
        return Err(ApiError::InvalidRequest("Invalid email address".to_string()));
    }

    let full_name = req.full_name.trim();
    if full_name.is_empty() || full_name.chars().count() > MAX_NAME_CHARS {
        return Err(ApiError::InvalidRequest(
            "Full name is required (max 120 characters)".to_string(),
        ));
    }

    validate_password_strength(&req.password)
        .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;

    let role = match req.role.as_deref().map(str::trim) {
        None | Some("") => Role::Client,
        Some(raw) => raw
            .parse::<Role>()
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?,
    };
    if role == Role::Admin {
        return Err(ApiError::Forbidden(
            "Admin accounts cannot be self-registered".to_string(),
        ));
    }

    let password_hash =
        hash_password(&req.password).map_err(|e| ApiError::Internal(e.into()))?;
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();

    sqlx::query(
        r#"
        INSERT INTO profiles (id, email, full_name, role, tier, password_hash, created_at, updated_at)
        VALUES (?, ?, ?, ?, 'free', ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&email)
    .bind(full_name)
    .bind(role.as_str())
    .bind(&password_hash)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await
    .map_err(conflict_on_unique("An account with this email already exists"))?;

    let user = UserPublic {
        id,
        email,
        full_name: full_name.to_string(),
        role,
        tier: Tier::Free,
        created_at: now,
    };
    let token = issue_token(&state, &user)?;

    info!(user = %user.id, role = %user.role, "Registered account");

    spawn_email(
        &state,
        EmailTemplate::Welcome {
            name: user.full_name.clone(),
            email: user.email.clone(),
            dashboard_url: state.config.app_url("/dashboard"),
        },
    );

    Ok((StatusCode::CREATED, Json(AuthResponse { token, user })))
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<AuthResponse>> {
    let profile = DbProfile::find_by_email(&state.db, &req.email)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

    if !verify_password(&req.password, &profile.password_hash) {
        info!(user = %profile.id, "Failed login");
        return Err(ApiError::InvalidCredentials);
    }

    let user = profile.to_public()?;
    let token = issue_token(&state, &user)?;
    Ok(Json(AuthResponse { token, user }))
}

/// `GET /auth/me`
pub async fn me(user: AuthUser) -> Json<UserPublic> {
    Json(UserPublic::from(&user))
}
