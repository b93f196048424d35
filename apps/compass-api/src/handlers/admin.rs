//! Admin moderation

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use email_proxy::EmailTemplate;
use shared_types::{ChangeEvent, ChangeKind, LawyerProfile, Table};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{DbLawyer, DbProfile};
use crate::notify::spawn_email;
use crate::state::AppState;

/// `POST /api/admin/lawyers/:id/verify`
pub async fn verify_lawyer(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<LawyerProfile>> {
    user.require_admin()?;

    let result = sqlx::query(
        "UPDATE lawyer_profiles SET verified = 1, updated_at = ? WHERE user_id = ? AND verified = 0",
    )
    .bind(Utc::now())
    .bind(&id)
    .execute(&state.db)
    .await?;

    let lawyer: LawyerProfile = DbLawyer::find(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("Lawyer"))?
        .try_into()?;

    // Already verified: nothing changed, nobody to notify
    if result.rows_affected() == 0 {
        return Ok(Json(lawyer));
    }

    info!(attorney = %id, admin = %user.id, "Lawyer verified");
    state.realtime.publish(ChangeEvent::new(
        Table::LawyerProfiles,
        ChangeKind::Update,
        None,
        &lawyer,
    ));

    if let Some(profile) = DbProfile::find(&state.db, &id).await? {
        spawn_email(
            &state,
            EmailTemplate::AttorneyVerified {
                attorney_name: profile.full_name,
                attorney_email: profile.email,
                leads_url: state.config.app_url("/leads"),
            },
        );
    }

    Ok(Json(lawyer))
}
