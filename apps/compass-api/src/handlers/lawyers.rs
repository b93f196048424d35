//! Attorney directory, profiles and reviews

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use marketplace_core::{patterns::BAR_NUMBER, ratings};
use shared_types::{
    CaseStatus, ChangeEvent, ChangeKind, LawyerProfile, Review, Role, Table, UsState,
};
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{conflict_on_unique, ApiError, ApiResult};
use crate::handlers::cases::load_case;
use crate::models::{
    DbLawyer, DbLeadPurchase, LawyerFilter, LawyerProfileRequest, ReviewRequest, LAWYER_SELECT,
};
use crate::state::AppState;

const MAX_BIO_CHARS: usize = 4000;
const MAX_PRACTICE_AREAS: usize = 20;
const MAX_COMMENT_CHARS: usize = 2000;

/// `GET /api/lawyers`
pub async fn list_lawyers(
    State(state): State<Arc<AppState>>,
    _user: AuthUser,
    Query(filter): Query<LawyerFilter>,
) -> ApiResult<Json<Vec<LawyerProfile>>> {
    let licensed_in = match filter.state.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(
            UsState::from_code(code)
                .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown state: {}", code)))?,
        ),
    };
    let area = filter
        .practice_area
        .as_deref()
        .map(str::trim)
        .filter(|a| !a.is_empty());

    let rows: Vec<DbLawyer> =
        sqlx::query_as(&format!("{} WHERE lp.verified = 1", LAWYER_SELECT))
            .fetch_all(&state.db)
            .await?;

    let mut lawyers = Vec::with_capacity(rows.len());
    for row in rows {
        let lawyer = LawyerProfile::try_from(row)?;
        if licensed_in.is_some_and(|s| !lawyer.is_licensed_in(s)) {
            continue;
        }
        if area.is_some_and(|a| !lawyer.practices(a)) {
            continue;
        }
        lawyers.push(lawyer);
    }

    lawyers.sort_by(|a, b| {
        b.rating_avg
            .total_cmp(&a.rating_avg)
            .then(b.rating_count.cmp(&a.rating_count))
    });
    Ok(Json(lawyers))
}

/// `GET /api/lawyers/:id`
pub async fn get_lawyer(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<LawyerProfile>> {
    let lawyer: LawyerProfile = DbLawyer::find(&state.db, &id)
        .await?
        .ok_or(ApiError::NotFound("Lawyer"))?
        .try_into()?;

    // Unverified profiles are only visible to their owner and admins
    if !lawyer.verified && lawyer.user_id != user.id && user.role != Role::Admin {
        return Err(ApiError::NotFound("Lawyer"));
    }
    Ok(Json(lawyer))
}

/// `PUT /api/lawyers/me`
pub async fn upsert_my_profile(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(req): Json<LawyerProfileRequest>,
) -> ApiResult<Json<LawyerProfile>> {
    if user.role != Role::Attorney {
        return Err(ApiError::Forbidden(
            "Only attorneys have lawyer profiles".to_string(),
        ));
    }

    let bar_number = req.bar_number.trim().to_uppercase();
    if !BAR_NUMBER.is_match(&bar_number) {
        return Err(ApiError::InvalidRequest("Invalid bar number".to_string()));
    }

    if req.licensed_states.is_empty() {
        return Err(ApiError::InvalidRequest(
            "At least one licensed state is required".to_string(),
        ));
    }
    let mut states = req
        .licensed_states
        .iter()
        .map(|code| {
            UsState::from_code(code)
                .ok_or_else(|| ApiError::InvalidRequest(format!("Unknown state: {}", code)))
        })
        .collect::<ApiResult<Vec<_>>>()?;
    states.sort();
    states.dedup();

    let mut areas: Vec<String> = Vec::new();
    for area in req.practice_areas.iter().map(|a| a.trim()) {
        if !area.is_empty() && !areas.iter().any(|a| a.eq_ignore_ascii_case(area)) {
            areas.push(area.to_string());
        }
    }
    if areas.is_empty() || areas.len() > MAX_PRACTICE_AREAS {
        return Err(ApiError::InvalidRequest(format!(
            "Between 1 and {} practice areas are required",
            MAX_PRACTICE_AREAS
        )));
    }

    let bio = req.bio.trim();
    if bio.chars().count() > MAX_BIO_CHARS {
        return Err(ApiError::InvalidRequest(format!(
            "Bio exceeds {} characters",
            MAX_BIO_CHARS
        )));
    }
    if req.hourly_rate_cents.is_some_and(|r| r < 0) {
        return Err(ApiError::InvalidRequest(
            "Hourly rate cannot be negative".to_string(),
        ));
    }

    let states_json = serde_json::to_string(&states).map_err(|e| ApiError::Internal(e.into()))?;
    let areas_json = serde_json::to_string(&areas).map_err(|e| ApiError::Internal(e.into()))?;
    let now = Utc::now();

    // A new bar number needs fresh verification
    sqlx::query(
        r#"
        INSERT INTO lawyer_profiles
            (user_id, bar_number, licensed_states, practice_areas, years_experience, bio,
             hourly_rate_cents, verified, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        ON CONFLICT(user_id) DO UPDATE SET
            verified = CASE WHEN lawyer_profiles.bar_number = excluded.bar_number
                            THEN lawyer_profiles.verified ELSE 0 END,
            bar_number = excluded.bar_number,
            licensed_states = excluded.licensed_states,
            practice_areas = excluded.practice_areas,
            years_experience = excluded.years_experience,
            bio = excluded.bio,
            hourly_rate_cents = excluded.hourly_rate_cents,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&user.id)
    .bind(&bar_number)
    .bind(&states_json)
    .bind(&areas_json)
    .bind(i64::from(req.years_experience))
    .bind(bio)
    .bind(req.hourly_rate_cents)
    .bind(now)
    .bind(now)
    .execute(&state.db)
    .await?;

    let lawyer: LawyerProfile = DbLawyer::find(&state.db, &user.id)
        .await?
        .ok_or(ApiError::NotFound("Lawyer"))?
        .try_into()?;

    info!(attorney = %user.id, verified = lawyer.verified, "Lawyer profile saved");
    state.realtime.publish(ChangeEvent::new(
        Table::LawyerProfiles,
        ChangeKind::Update,
        None,
        &lawyer,
    ));

    Ok(Json(lawyer))
}

/// `POST /api/lawyers/:id/reviews`
pub async fn create_review(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(attorney_id): Path<String>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<(StatusCode, Json<Review>)> {
    if user.role != Role::Client {
        return Err(ApiError::Forbidden(
            "Only clients can leave reviews".to_string(),
        ));
    }
    let rating =
        ratings::validate_rating(req.rating).map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
    let comment = req
        .comment
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string);
    if comment
        .as_ref()
        .is_some_and(|c| c.chars().count() > MAX_COMMENT_CHARS)
    {
        return Err(ApiError::InvalidRequest(format!(
            "Comment exceeds {} characters",
            MAX_COMMENT_CHARS
        )));
    }

    let case = load_case(&state.db, &req.case_id).await?;
    if case.client_id != user.id {
        return Err(ApiError::Forbidden(
            "You can only review attorneys on your own cases".to_string(),
        ));
    }
    let purchase = DbLeadPurchase::for_case(&state.db, &case.id).await?;
    if purchase.as_ref().map(|p| p.attorney_id.as_str()) != Some(attorney_id.as_str()) {
        return Err(ApiError::Forbidden(
            "This attorney did not handle the case".to_string(),
        ));
    }
    if case.status == CaseStatus::Open {
        return Err(ApiError::InvalidRequest(
            "The case has not been accepted yet".to_string(),
        ));
    }

    let lawyer = DbLawyer::find(&state.db, &attorney_id)
        .await?
        .ok_or(ApiError::NotFound("Lawyer"))?;

    let review = Review {
        id: Uuid::new_v4().to_string(),
        attorney_id: attorney_id.clone(),
        client_id: user.id.clone(),
        case_id: case.id.clone(),
        rating,
        comment,
        created_at: Utc::now(),
    };
    let (avg, count) = ratings::apply_rating(
        lawyer.rating_avg,
        lawyer.rating_count.max(0) as u32,
        rating,
    );

    let mut tx = state.db.begin().await?;
    sqlx::query(
        r#"
        INSERT INTO reviews (id, attorney_id, client_id, case_id, rating, comment, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&review.id)
    .bind(&review.attorney_id)
    .bind(&review.client_id)
    .bind(&review.case_id)
    .bind(i64::from(review.rating))
    .bind(&review.comment)
    .bind(review.created_at)
    .execute(&mut *tx)
    .await
    .map_err(conflict_on_unique("You have already reviewed this case"))?;

    sqlx::query(
        "UPDATE lawyer_profiles SET rating_avg = ?, rating_count = ?, updated_at = ? WHERE user_id = ?",
    )
    .bind(avg)
    .bind(i64::from(count))
    .bind(review.created_at)
    .bind(&attorney_id)
    .execute(&mut *tx)
    .await?;
    tx.commit().await?;

    info!(attorney = %attorney_id, rating, avg, "Review recorded");
    Ok((StatusCode::CREATED, Json(review)))
}
