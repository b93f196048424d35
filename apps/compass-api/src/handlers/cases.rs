//! Case intake, listing and status changes

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use marketplace_core::{transition, validate_case, Actor, CaseIntake};
use shared_types::{CaseStatus, ChangeEvent, ChangeKind, LegalCase, Role, Table};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::models::{DbCase, DbLeadPurchase, StatusUpdateRequest};
use crate::state::AppState;

/// How the caller relates to a case
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseAccess {
    Client,
    /// Holds the lead purchase
    Attorney,
    Admin,
    None,
}

impl CaseAccess {
    /// Messaging is limited to the two parties
    pub fn is_party(self) -> bool {
        matches!(self, CaseAccess::Client | CaseAccess::Attorney)
    }
}

pub async fn load_case(db: &SqlitePool, id: &str) -> ApiResult<LegalCase> {
    DbCase::find(db, id)
        .await?
        .ok_or(ApiError::NotFound("Case"))?
        .try_into()
}

/// Resolve the caller's relation to `case`, returning the purchasing attorney if any
pub async fn case_access(
    db: &SqlitePool,
    case: &LegalCase,
    user: &AuthUser,
) -> ApiResult<(CaseAccess, Option<String>)> {
    let attorney_id = DbLeadPurchase::for_case(db, &case.id)
        .await?
        .map(|p| p.attorney_id);

    let access = if case.client_id == user.id {
        CaseAccess::Client
    } else if attorney_id.as_deref() == Some(user.id.as_str()) {
        CaseAccess::Attorney
    } else if user.role == Role::Admin {
        CaseAccess::Admin
    } else {
        CaseAccess::None
    };
    Ok((access, attorney_id))
}

/// `POST /api/cases`
pub async fn create_case(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Json(intake): Json<CaseIntake>,
) -> ApiResult<(StatusCode, Json<LegalCase>)> {
    if user.role != Role::Client {
        return Err(ApiError::Forbidden(
            "Only clients can submit cases".to_string(),
        ));
    }

    let valid = validate_case(&intake).map_err(ApiError::Validation)?;
    let now = Utc::now();
    let case = LegalCase {
        id: Uuid::new_v4().to_string(),
        client_id: user.id.clone(),
        topic: valid.topic,
        state: valid.state,
        urgency: valid.urgency,
        description: valid.description,
        status: CaseStatus::Open,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO cases (id, client_id, topic, state, urgency, description, status, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&case.id)
    .bind(&case.client_id)
    .bind(&case.topic)
    .bind(case.state.code())
    .bind(case.urgency.as_str())
    .bind(&case.description)
    .bind(case.status.as_str())
    .bind(case.created_at)
    .bind(case.updated_at)
    .execute(&state.db)
    .await?;

    info!(case = %case.id, state = %case.state, urgency = %case.urgency, "Case submitted");
    state.realtime.publish(ChangeEvent::new(
        Table::Cases,
        ChangeKind::Insert,
        Some(&case.id),
        &case,
    ));

    Ok((StatusCode::CREATED, Json(case)))
}

/// `GET /api/cases`
pub async fn list_cases(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
) -> ApiResult<Json<Vec<LegalCase>>> {
    let rows: Vec<DbCase> = match user.role {
        Role::Client => {
            sqlx::query_as("SELECT * FROM cases WHERE client_id = ? ORDER BY created_at DESC")
                .bind(&user.id)
                .fetch_all(&state.db)
                .await?
        }
        Role::Attorney => {
            sqlx::query_as(
                r#"
                SELECT c.* FROM cases c
                JOIN lead_purchases lp ON lp.case_id = c.id
                WHERE lp.attorney_id = ?
                ORDER BY c.created_at DESC
                "#,
            )
            .bind(&user.id)
            .fetch_all(&state.db)
            .await?
        }
        Role::Admin => {
            sqlx::query_as("SELECT * FROM cases ORDER BY created_at DESC")
                .fetch_all(&state.db)
                .await?
        }
    };

    let cases = rows
        .into_iter()
        .map(LegalCase::try_from)
        .collect::<ApiResult<Vec<_>>>()?;
    Ok(Json(cases))
}

/// `GET /api/cases/:id`
pub async fn get_case(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
) -> ApiResult<Json<LegalCase>> {
    let case = load_case(&state.db, &id).await?;
    let (access, _) = case_access(&state.db, &case, &user).await?;
    if access == CaseAccess::None {
        return Err(ApiError::Forbidden(
            "You do not have access to this case".to_string(),
        ));
    }
    Ok(Json(case))
}

/// `PATCH /api/cases/:id/status`
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    user: AuthUser,
    Path(id): Path<String>,
    Json(req): Json<StatusUpdateRequest>,
) -> ApiResult<Json<LegalCase>> {
    let target: CaseStatus = req
        .status
        .trim()
        .parse()
        .map_err(|e: shared_types::ParseEnumError| ApiError::InvalidRequest(e.to_string()))?;

    let mut case = load_case(&state.db, &id).await?;
    let (access, _) = case_access(&state.db, &case, &user).await?;
    let actor = match access {
        CaseAccess::Client => Actor::Client,
        CaseAccess::Attorney => Actor::Attorney,
        CaseAccess::Admin => Actor::Admin,
        CaseAccess::None => {
            return Err(ApiError::Forbidden(
                "You do not have access to this case".to_string(),
            ))
        }
    };

    let from = case.status;
    case.status = transition(from, target, actor)?;
    case.updated_at = Utc::now();

    sqlx::query("UPDATE cases SET status = ?, updated_at = ? WHERE id = ?")
        .bind(case.status.as_str())
        .bind(case.updated_at)
        .bind(&case.id)
        .execute(&state.db)
        .await?;

    info!(case = %case.id, from = %from, to = %case.status, by = %user.id, "Case status changed");
    state.realtime.publish(ChangeEvent::new(
        Table::Cases,
        ChangeKind::Update,
        Some(&case.id),
        &case,
    ));

    Ok(Json(case))
}
